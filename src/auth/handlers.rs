//! Authentication handlers for login and logout.

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::db as auth_db;
use super::password;
use crate::config::SESSION_DURATION_HOURS;
use crate::db::try_lock;
use crate::filters;
use crate::session::{generate_session_id, removal_cookie, session_cookie, SESSION_COOKIE_NAME};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub username: String,
    pub version: &'static str,
}

impl LoginTemplate {
    fn with_error(username: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            username: username.to_string(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /login - Show login page
pub async fn login_page() -> Html<String> {
    let template = LoginTemplate {
        error: None,
        username: String::new(),
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(template.render().unwrap_or_default())
}

/// POST /login - Process login
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let username = form.username.trim();
    let render_error = |jar: CookieJar, error: &str| {
        let template = LoginTemplate::with_error(username, error);
        (jar, Html(template.render().unwrap_or_default())).into_response()
    };

    // Validate input
    if username.is_empty() || form.password.is_empty() {
        return render_error(jar, "Usuario y contraseña son obligatorios.");
    }

    let conn = match try_lock(&state.db) {
        Ok(conn) => conn,
        Err(_) => return render_error(jar, "Error de base de datos."),
    };

    // Look up user; accounts with an unusable password cannot log in
    let (user_id, stored_hash) = match auth_db::get_user_by_username(&conn, username) {
        Ok(Some((id, Some(hash)))) => (id, hash),
        Ok(_) => return render_error(jar, "Usuario o contraseña incorrectos."),
        Err(e) => {
            tracing::error!("Login lookup failed: {}", e);
            return render_error(jar, "Error de base de datos.");
        }
    };

    if !password::verify_password(&form.password, &stored_hash) {
        tracing::info!("Failed login for '{}'", username);
        return render_error(jar, "Usuario o contraseña incorrectos.");
    }

    // Update last login time (log but don't fail on error)
    if let Err(e) = auth_db::update_last_login(&conn, user_id) {
        tracing::warn!("Failed to update last login for user {}: {}", user_id, e);
    }

    let session_id = generate_session_id();
    if let Err(e) = auth_db::create_session(&conn, user_id, &session_id, SESSION_DURATION_HOURS) {
        tracing::error!("Failed to create session: {}", e);
        return render_error(jar, "No se pudo iniciar la sesión.");
    }
    drop(conn);

    tracing::info!("User '{}' logged in", username);
    (jar.add(session_cookie(session_id)), Redirect::to("/socios/")).into_response()
}

/// POST /logout - Delete the session and clear the cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        match try_lock(&state.db) {
            Ok(conn) => {
                if let Err(e) = auth_db::delete_session(&conn, cookie.value()) {
                    tracing::warn!("Failed to delete session during logout: {}", e);
                }
            }
            Err(e) => tracing::warn!("Logout without session cleanup: {}", e),
        }
    }

    (jar.remove(removal_cookie()), Redirect::to("/login"))
}
