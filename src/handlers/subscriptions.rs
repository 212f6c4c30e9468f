//! Subscription pages: full form, pending list and the quick flow from the member detail page.

use askama::Template;
use axum::{
  extract::{Path, Query, State},
  response::{IntoResponse, Redirect, Response},
  Form,
};
use chrono::Local;
use serde::Deserialize;

use super::{not_found, render_page, server_error};
use crate::auth::AuthContext;
use crate::db;
use crate::domain::{Member, Plan, Subscription, SubscriptionStatus};
use crate::filters;
use crate::forms::{quick_subscribe, FormErrors, QuickOutcome, QuickSubscriptionForm, SubscriptionForm};
use crate::notice::{Flash, Notice};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "socios/form_suscripcion.html")]
pub struct SubscriptionFormTemplate {
  pub username: String,
  /// Member the form was opened for (URL segment)
  pub socio_id: i64,
  pub to_pagos: bool,
  pub form: SubscriptionForm,
  pub errors: FormErrors,
  pub members: Vec<Member>,
  pub plans: Vec<Plan>,
  pub statuses: Vec<&'static str>,
  pub flash: Option<Flash>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
  pub to_pagos: Option<String>,
}

impl SubscriptionQuery {
  fn to_payments(&self) -> bool {
    self.to_pagos.as_deref() == Some("1")
  }
}

fn subscription_statuses() -> Vec<&'static str> {
  SubscriptionStatus::ALL.iter().map(|s| s.as_str()).collect()
}

/// GET /socios/{socio_id}/suscripciones/nueva/ - Subscription form preset to the member
pub async fn crear_suscripcion_form(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(socio_id): Path<i64>,
  Query(query): Query<SubscriptionQuery>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Subscription form", e),
  };

  match db::member_exists(&conn, socio_id) {
    Ok(true) => {}
    Ok(false) => return not_found(),
    Err(e) => return server_error("Subscription form", e),
  }

  let (members, plans) = match db::list_members(&conn, None).and_then(|m| Ok((m, db::get_active_plans(&conn)?))) {
    Ok(loaded) => loaded,
    Err(e) => return server_error("Subscription form", e),
  };

  render_page(&SubscriptionFormTemplate {
    username: auth.username,
    socio_id,
    to_pagos: query.to_payments(),
    form: SubscriptionForm::for_member(Some(socio_id)),
    errors: FormErrors::new(),
    members,
    plans,
    statuses: subscription_statuses(),
    flash: None,
  })
}

/// POST /socios/{socio_id}/suscripciones/nueva/ - Validate and create a subscription.
/// With `?to_pagos=1` continues to the payment module.
pub async fn crear_suscripcion(
  auth: AuthContext,
  State(state): State<AppState>,
  Path(socio_id): Path<i64>,
  Query(query): Query<SubscriptionQuery>,
  Form(form): Form<SubscriptionForm>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Create subscription", e),
  };

  let errors = match form.validate(&conn) {
    Ok(Ok(new_sub)) => {
      let subscription_id = match db::create_subscription(&conn, &new_sub) {
        Ok(id) => id,
        Err(e) => return server_error("Create subscription", e),
      };
      tracing::info!(
        subscription_id,
        member_id = new_sub.member_id,
        status = new_sub.status.as_str(),
        by = %auth.username,
        "Subscription created"
      );

      let target = if query.to_payments() {
        state.config.payment_url(subscription_id)
      } else {
        Notice::SubscriptionCreated.redirect_target(&format!("/socios/{}/", new_sub.member_id))
      };
      return Redirect::to(&target).into_response();
    }
    Ok(Err(errors)) => errors,
    Err(e) => return server_error("Create subscription", e),
  };

  let (members, plans) = match db::list_members(&conn, None).and_then(|m| Ok((m, db::get_active_plans(&conn)?))) {
    Ok(loaded) => loaded,
    Err(e) => return server_error("Create subscription", e),
  };

  render_page(&SubscriptionFormTemplate {
    username: auth.username,
    socio_id,
    to_pagos: query.to_payments(),
    form,
    errors,
    members,
    plans,
    statuses: subscription_statuses(),
    flash: Some(Flash::error("Revisá los datos marcados en el formulario.")),
  })
}

#[derive(Template)]
#[template(path = "socios/suscripciones_pendientes.html")]
pub struct PendingTemplate {
  pub username: String,
  pub rows: Vec<PendingRow>,
}

pub struct PendingRow {
  pub subscription: Subscription,
  /// Payment module link for this subscription
  pub payment_url: String,
}

/// GET /socios/suscripciones/pendientes/ - Subscriptions awaiting payment
pub async fn suscripciones_pendientes(auth: AuthContext, State(state): State<AppState>) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Pending subscriptions", e),
  };
  let subscriptions = match db::get_pending_subscriptions(&conn) {
    Ok(subs) => subs,
    Err(e) => return server_error("Pending subscriptions", e),
  };

  let rows = subscriptions
    .into_iter()
    .map(|subscription| PendingRow {
      payment_url: state.config.payment_url(subscription.id),
      subscription,
    })
    .collect();

  render_page(&PendingTemplate {
    username: auth.username,
    rows,
  })
}

/// GET /socios/suscripciones/rapida/ - Only POST creates; anything else goes back to the list
pub async fn suscripcion_rapida_get(_auth: AuthContext) -> Redirect {
  Redirect::to("/socios/")
}

/// POST /socios/suscripciones/rapida/ - Create a Pendiente subscription and continue to payment
pub async fn crear_suscripcion_rapida(
  auth: AuthContext,
  State(state): State<AppState>,
  Form(form): Form<QuickSubscriptionForm>,
) -> Response {
  let conn = match db::try_lock(&state.db) {
    Ok(conn) => conn,
    Err(e) => return server_error("Quick subscription", e),
  };

  let today = Local::now().date_naive();
  let outcome = match quick_subscribe(&conn, &form, today) {
    Ok(outcome) => outcome,
    Err(e) => return server_error("Quick subscription", e),
  };

  let target = match outcome {
    QuickOutcome::Created {
      member_id,
      subscription_id,
    } => {
      tracing::info!(subscription_id, member_id, by = %auth.username, "Quick subscription created");
      state.config.payment_url(subscription_id)
    }
    QuickOutcome::InvalidMember(Some(member_id)) => {
      Notice::InvalidMember.redirect_target(&format!("/socios/{}/", member_id))
    }
    QuickOutcome::InvalidMember(None) => Notice::InvalidMember.redirect_target("/socios/"),
    QuickOutcome::InvalidPlan { member_id } => {
      Notice::InvalidPlan.redirect_target(&format!("/socios/{}/", member_id))
    }
    QuickOutcome::AlreadyActive { member_id } => {
      tracing::info!(member_id, "Quick subscription refused: already active");
      Notice::AlreadyActive.redirect_target(&format!("/socios/{}/", member_id))
    }
  };

  Redirect::to(&target).into_response()
}
