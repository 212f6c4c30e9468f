pub mod members;
pub mod subscriptions;

use askama::Template;
use axum::{
  http::StatusCode,
  response::{Html, IntoResponse, Redirect, Response},
};

use crate::db::LogOnError;

pub use members::{crear_socio, crear_socio_form, detalle_socio, editar_socio, editar_socio_form, eliminar_socio, lista_socios};
pub use subscriptions::{
  crear_suscripcion, crear_suscripcion_form, crear_suscripcion_rapida, suscripcion_rapida_get,
  suscripciones_pendientes,
};

/// GET / - The member list is the home page
pub async fn index() -> Redirect {
  Redirect::to("/socios/")
}

/// Render a template into an HTML response
pub(crate) fn render_page<T: Template>(template: &T) -> Response {
  Html(template.render().log_warn_default("Template render failed")).into_response()
}

/// Log a database failure and answer 500
pub(crate) fn server_error(context: &str, e: impl std::fmt::Display) -> Response {
  tracing::error!("{}: {}", context, e);
  (StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor").into_response()
}

pub(crate) fn not_found() -> Response {
  (StatusCode::NOT_FOUND, Html("<h1>No encontrado</h1>")).into_response()
}
