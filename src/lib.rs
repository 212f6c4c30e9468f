pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod filters;
pub mod forms;
pub mod handlers;
pub mod notice;
pub mod paths;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

use axum::{routing::get, routing::post, Router};
use rusqlite::Connection;
use tower_http::{services::ServeDir, trace::TraceLayer};

use config::Config;
use db::LogOnError;
use state::AppState;

/// All routes of the member module, bound to `state`
pub fn app(state: AppState) -> Router {
  Router::new()
    .route("/", get(handlers::index))
    // Auth
    .route("/login", get(auth::login_page).post(auth::login_submit))
    .route("/logout", post(auth::logout))
    // Members
    .route("/socios/", get(handlers::lista_socios))
    .route("/socios/nuevo/", get(handlers::crear_socio_form).post(handlers::crear_socio))
    .route("/socios/{id}/", get(handlers::detalle_socio))
    .route("/socios/{id}/editar/", get(handlers::editar_socio_form).post(handlers::editar_socio))
    .route("/socios/{id}/eliminar/", post(handlers::eliminar_socio))
    // Subscriptions
    .route(
      "/socios/{socio_id}/suscripciones/nueva/",
      get(handlers::crear_suscripcion_form).post(handlers::crear_suscripcion),
    )
    .route("/socios/suscripciones/pendientes/", get(handlers::suscripciones_pendientes))
    .route(
      "/socios/suscripciones/rapida/",
      get(handlers::suscripcion_rapida_get).post(handlers::crear_suscripcion_rapida),
    )
    .nest_service("/static", ServeDir::new(paths::STATIC_DIR))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// One-time startup work on a migrated database: seed the catalog,
/// make sure the configured staff account exists and purge stale sessions.
/// Failures are logged; the server still starts.
pub fn startup(conn: &Connection, config: &Config) {
  db::seed_catalog(conn, &config.seed_branches, &config.seed_plans).log_warn("Failed to seed catalog");

  if let Some((username, password)) = &config.admin {
    auth::db::ensure_staff_user(conn, username, password).log_warn("Failed to create admin user");
  }

  if let Some(removed) = auth::db::cleanup_expired_sessions(conn).log_warn("Failed to clean up sessions") {
    if removed > 0 {
      tracing::debug!("Removed {} expired sessions", removed);
    }
  }
}
