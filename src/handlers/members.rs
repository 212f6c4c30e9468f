//! Member ("socio") pages: list, detail, create, edit and delete.

use askama::Template;
use axum::{
  extract::{Path, Query, State},
  response::{IntoResponse, Redirect, Response},
  Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Local;
use serde::Deserialize;

use super::{not_found, render_page, server_error};
use crate::auth::AuthContext;
use crate::db::{self, MemberWriteError};
use crate::domain::{Branch, Member, MemberStatus, Plan, Subscription};
use crate::filters;
use crate::forms::{FormErrors, MemberForm};
use crate::notice::{deleted_name_cookie, take_deleted_name, Flash, Notice, NoticeQuery};
use crate::state::AppState;

const DUPLICATE_MEMBER: &str = "El socio ya se encuentra registrado.";
const FIX_ERRORS: &str = "Revisá los datos marcados en el formulario.";

fn member_statuses() -> Vec<&'static str> {
  MemberStatus::ALL.iter().map(|s| s.as_str()).collect()
}

// ==================== List ====================

#[derive(Template)]
#[template(path = "socios/lista.html")]
pub struct ListTemplate {
  pub username: String,
  pub members: Vec<Member>,
  pub apellido: String,
  pub flash: Option<Flash>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
  #[serde(default)]
  pub apellido: String,
}

/// GET /socios/ - All members, optionally filtered by last name
pub async fn lista_socios(
  auth: AuthContext,
  State(state): State<AppState>,
  jar: CookieJar,
  Query(query): Query<ListQuery>,
  Query(notice): Query<NoticeQuery>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("List members", e),
  };

  let apellido = query.apellido.trim().to_string();
  let filter = (!apellido.is_empty()).then_some(apellido.as_str());
  let members = match db::list_members(&conn, filter) {
    Ok(members) => members,
    Err(e) => return server_error("List members", e),
  };

  let (jar, deleted_name) = take_deleted_name(jar);
  let page = render_page(&ListTemplate {
    username: auth.username,
    members,
    apellido,
    flash: notice.flash(deleted_name.as_deref()),
  });
  (jar, page).into_response()
}

// ==================== Detail ====================

#[derive(Template)]
#[template(path = "socios/detalle.html")]
pub struct DetailTemplate {
  pub username: String,
  pub member: Member,
  pub subscriptions: Vec<Subscription>,
  /// Active plans for the quick subscription form
  pub plans: Vec<Plan>,
  /// The member has a subscription in force today
  pub has_active: bool,
  pub flash: Option<Flash>,
}

/// GET /socios/{id}/ - Member detail with subscriptions
pub async fn detalle_socio(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Query(notice): Query<NoticeQuery>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Member detail", e),
  };

  let member = match db::get_member(&conn, id) {
    Ok(Some(member)) => member,
    Ok(None) => return not_found(),
    Err(e) => return server_error("Member detail", e),
  };

  let today = Local::now().date_naive();
  let loaded = db::get_member_subscriptions(&conn, id).and_then(|subs| {
    let plans = db::get_active_plans(&conn)?;
    let has_active = db::has_active_subscription(&conn, id, today)?;
    Ok((subs, plans, has_active))
  });
  let (subscriptions, plans, has_active) = match loaded {
    Ok(loaded) => loaded,
    Err(e) => return server_error("Member detail", e),
  };

  render_page(&DetailTemplate {
    username: auth.username,
    member,
    subscriptions,
    plans,
    has_active,
    flash: notice.flash(None),
  })
}

// ==================== Create ====================

#[derive(Template)]
#[template(path = "socios/socio_form.html")]
pub struct CreateTemplate {
  pub username: String,
  pub form: MemberForm,
  pub errors: FormErrors,
  pub branches: Vec<Branch>,
  pub statuses: Vec<&'static str>,
  pub flash: Option<Flash>,
}

/// GET /socios/nuevo/ - Empty member form
pub async fn crear_socio_form(auth: AuthContext, State(state): State<AppState>) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("New member form", e),
  };
  let branches = match db::get_all_branches(&conn) {
    Ok(branches) => branches,
    Err(e) => return server_error("New member form", e),
  };

  render_page(&CreateTemplate {
    username: auth.username,
    form: MemberForm::default(),
    errors: FormErrors::new(),
    branches,
    statuses: member_statuses(),
    flash: None,
  })
}

/// POST /socios/nuevo/ - Create the user account and member
pub async fn crear_socio(
  auth: AuthContext,
  State(state): State<AppState>,
  Form(form): Form<MemberForm>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Create member", e),
  };
  let branches = match db::get_all_branches(&conn) {
    Ok(branches) => branches,
    Err(e) => return server_error("Create member", e),
  };

  let (errors, message) = match form.validate(&branches) {
    Ok(data) => match db::create_member(&conn, &data) {
      Ok(member_id) => {
        tracing::info!(member_id, dni = %data.dni, by = %auth.username, "Member created");
        return Redirect::to(&format!("/socios/{}/?created=1", member_id)).into_response();
      }
      Err(MemberWriteError::DuplicateDni) => {
        let mut errors = FormErrors::new();
        errors.add("dni", DUPLICATE_MEMBER);
        (errors, DUPLICATE_MEMBER)
      }
      Err(MemberWriteError::Db(e)) => return server_error("Create member", e),
    },
    Err(errors) => (errors, FIX_ERRORS),
  };

  render_page(&CreateTemplate {
    username: auth.username,
    form,
    errors,
    branches,
    statuses: member_statuses(),
    flash: Some(Flash::error(message)),
  })
}

// ==================== Edit ====================

#[derive(Template)]
#[template(path = "socios/editar.html")]
pub struct EditTemplate {
  pub username: String,
  pub member: Member,
  pub form: MemberForm,
  pub errors: FormErrors,
  pub branches: Vec<Branch>,
  pub statuses: Vec<&'static str>,
  pub flash: Option<Flash>,
}

/// GET /socios/{id}/editar/ - Member form prefilled from the member and its user
pub async fn editar_socio_form(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Edit member form", e),
  };
  let member = match db::get_member(&conn, id) {
    Ok(Some(member)) => member,
    Ok(None) => return not_found(),
    Err(e) => return server_error("Edit member form", e),
  };
  let branches = match db::get_all_branches(&conn) {
    Ok(branches) => branches,
    Err(e) => return server_error("Edit member form", e),
  };

  render_page(&EditTemplate {
    username: auth.username,
    form: MemberForm::from_member(&member),
    member,
    errors: FormErrors::new(),
    branches,
    statuses: member_statuses(),
    flash: None,
  })
}

/// POST /socios/{id}/editar/ - Update member and user account
pub async fn editar_socio(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Form(form): Form<MemberForm>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Edit member", e),
  };
  let member = match db::get_member(&conn, id) {
    Ok(Some(member)) => member,
    Ok(None) => return not_found(),
    Err(e) => return server_error("Edit member", e),
  };
  let branches = match db::get_all_branches(&conn) {
    Ok(branches) => branches,
    Err(e) => return server_error("Edit member", e),
  };

  let (errors, message) = match form.validate(&branches) {
    Ok(data) => match db::update_member(&conn, id, &data) {
      Ok(true) => {
        tracing::info!(member_id = id, by = %auth.username, "Member updated");
        return Redirect::to(&Notice::MemberUpdated.redirect_target(&format!("/socios/{}/", id)))
          .into_response();
      }
      Ok(false) => return not_found(),
      Err(MemberWriteError::DuplicateDni) => {
        let mut errors = FormErrors::new();
        errors.add("dni", DUPLICATE_MEMBER);
        (errors, DUPLICATE_MEMBER)
      }
      Err(MemberWriteError::Db(e)) => return server_error("Edit member", e),
    },
    Err(errors) => (errors, FIX_ERRORS),
  };

  render_page(&EditTemplate {
    username: auth.username,
    member,
    form,
    errors,
    branches,
    statuses: member_statuses(),
    flash: Some(Flash::error(message)),
  })
}

// ==================== Delete ====================

/// POST /socios/{id}/eliminar/ - Delete the member's user account (cascades to member and subscriptions)
pub async fn eliminar_socio(
  auth: AuthContext,
  State(state): State<AppState>,
  jar: CookieJar,
  Path(id): Path<i64>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Delete member", e),
  };

  match db::delete_member(&conn, id) {
    Ok(Some(name)) => {
      tracing::info!(member_id = id, by = %auth.username, "Member deleted");
      (
        jar.add(deleted_name_cookie(&name)),
        Redirect::to(&Notice::MemberDeleted.redirect_target("/socios/")),
      )
        .into_response()
    }
    Ok(None) => not_found(),
    Err(e) => server_error("Delete member", e),
  }
}
