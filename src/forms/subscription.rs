use std::borrow::Borrow;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::{parse_id, FormErrors, REQUIRED};
use crate::db::{self, NewSubscription};
use crate::domain::{Money, SubscriptionStatus};

/// Full subscription form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionForm {
  #[serde(default)]
  pub socio: String,
  #[serde(default)]
  pub plan: String,
  #[serde(default)]
  pub fecha_inicio: String,
  #[serde(default)]
  pub fecha_fin: String,
  #[serde(default)]
  pub monto: String,
  #[serde(default)]
  pub estado: String,
  /// Checkbox: present ("on") when checked
  #[serde(default)]
  pub auto_renovacion: Option<String>,
}

fn parse_optional_date(errors: &mut FormErrors, field: &'static str, raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    Ok(date) => Some(date),
    Err(_) => {
      errors.add(field, "Introduzca una fecha válida.");
      None
    }
  }
}

impl SubscriptionForm {
  /// Initial form for a member, defaulting to a pending subscription
  pub fn for_member(member_id: Option<i64>) -> Self {
    Self {
      socio: member_id.map(|id| id.to_string()).unwrap_or_default(),
      estado: SubscriptionStatus::Pending.as_str().to_string(),
      ..Self::default()
    }
  }

  /// Validate against the database: member and plan must exist, and a
  /// Vigente subscription may not overlap another Vigente one of the same member.
  pub fn validate(&self, conn: &Connection) -> rusqlite::Result<Result<NewSubscription, FormErrors>> {
    let mut errors = FormErrors::new();

    let member_id = match parse_id(&self.socio) {
      Some(id) if db::member_exists(conn, id)? => Some(id),
      _ => {
        errors.add(
          "socio",
          if self.socio.trim().is_empty() { REQUIRED } else { "Seleccioná un socio válido." },
        );
        None
      }
    };

    let plan = match parse_id(&self.plan) {
      Some(id) => db::get_plan(conn, id)?,
      None => None,
    };
    if plan.is_none() {
      errors.add(
        "plan",
        if self.plan.trim().is_empty() { REQUIRED } else { "Seleccioná un plan válido." },
      );
    }

    let start_date = parse_optional_date(&mut errors, "fecha_inicio", &self.fecha_inicio);
    let end_date = parse_optional_date(&mut errors, "fecha_fin", &self.fecha_fin);
    if let (Some(start), Some(end)) = (start_date, end_date) {
      if end < start {
        errors.add("fecha_fin", "La fecha de fin no puede ser anterior a la de inicio.");
      }
    }

    let amount = if self.monto.trim().is_empty() {
      plan.as_ref().map(|p| p.price)
    } else {
      Money::parse(&self.monto)
        .map_err(|e| errors.add("monto", e.message()))
        .ok()
    };

    let status = SubscriptionStatus::from_str(self.estado.trim());
    if status.is_none() {
      errors.add(
        "estado",
        if self.estado.trim().is_empty() { REQUIRED } else { "Seleccioná un estado válido." },
      );
    }

    if let (Some(member_id), Some(SubscriptionStatus::Current)) = (member_id, status) {
      if errors.is_empty() && db::has_overlapping_current(conn, member_id, start_date, end_date)? {
        errors.add(
          "estado",
          "El socio ya tiene una suscripción vigente en ese período.",
        );
      }
    }

    Ok(match (member_id, plan, amount, status) {
      (Some(member_id), Some(plan), Some(amount), Some(status)) if errors.is_empty() => {
        Ok(NewSubscription {
          member_id,
          plan_id: plan.id,
          start_date,
          end_date,
          amount,
          status,
          auto_renew: self.auto_renew(),
        })
      }
      _ => Err(errors),
    })
  }

  pub fn auto_renew(&self) -> bool {
    self.auto_renovacion.as_deref().is_some_and(|v| !v.is_empty() && v != "off")
  }

  pub fn is_member(&self, member_id: impl Borrow<i64>) -> bool {
    parse_id(&self.socio) == Some(*member_id.borrow())
  }

  pub fn is_plan(&self, plan_id: impl Borrow<i64>) -> bool {
    parse_id(&self.plan) == Some(*plan_id.borrow())
  }

  pub fn is_status(&self, status: &str) -> bool {
    self.estado.trim() == status
  }
}

/// Quick subscription posted from the member detail page
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuickSubscriptionForm {
  #[serde(default)]
  pub socio_id: String,
  #[serde(default)]
  pub plan_id: String,
  #[serde(default)]
  pub monto: String,
}

/// Result of a quick subscription attempt
#[derive(Debug, Clone, PartialEq)]
pub enum QuickOutcome {
  /// Member ID missing or unknown; carries the parsed ID if there was one
  InvalidMember(Option<i64>),
  InvalidPlan { member_id: i64 },
  /// The member already has a subscription in force today
  AlreadyActive { member_id: i64 },
  Created { member_id: i64, subscription_id: i64 },
}

/// Create a Pendiente subscription unless the member already has one in force on `today`.
/// A blank or unparsable amount falls back to the plan price.
pub fn quick_subscribe(
  conn: &Connection,
  form: &QuickSubscriptionForm,
  today: NaiveDate,
) -> rusqlite::Result<QuickOutcome> {
  let parsed_member = parse_id(&form.socio_id);
  let member_id = match parsed_member {
    Some(id) if db::member_exists(conn, id)? => id,
    _ => return Ok(QuickOutcome::InvalidMember(parsed_member)),
  };

  let plan = match parse_id(&form.plan_id) {
    Some(id) => db::get_plan(conn, id)?,
    None => None,
  };
  let Some(plan) = plan else {
    return Ok(QuickOutcome::InvalidPlan { member_id });
  };

  let amount = if form.monto.trim().is_empty() {
    plan.price
  } else {
    Money::parse(&form.monto).unwrap_or(plan.price)
  };

  if db::has_active_subscription(conn, member_id, today)? {
    return Ok(QuickOutcome::AlreadyActive { member_id });
  }

  let subscription_id = db::create_subscription(
    conn,
    &NewSubscription {
      member_id,
      plan_id: plan.id,
      start_date: None,
      end_date: None,
      amount,
      status: SubscriptionStatus::Pending,
      auto_renew: false,
    },
  )?;

  Ok(QuickOutcome::Created {
    member_id,
    subscription_id,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{add_member, seed_catalog, test_conn};

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn form(member_id: i64, plan_id: i64) -> SubscriptionForm {
    SubscriptionForm {
      socio: member_id.to_string(),
      plan: plan_id.to_string(),
      fecha_inicio: "2025-03-01".into(),
      fecha_fin: "2025-03-31".into(),
      monto: "1500".into(),
      estado: "Vigente".into(),
      auto_renovacion: Some("on".into()),
    }
  }

  fn quick(member: &str, plan: &str, monto: &str) -> QuickSubscriptionForm {
    QuickSubscriptionForm {
      socio_id: member.into(),
      plan_id: plan.into(),
      monto: monto.into(),
    }
  }

  #[test]
  fn test_valid_subscription_form() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");

    let sub = form(member, plan_id).validate(&conn).unwrap().unwrap();
    assert_eq!(sub.member_id, member);
    assert_eq!(sub.amount, Money::from_cents(150000));
    assert_eq!(sub.status, SubscriptionStatus::Current);
    assert!(sub.auto_renew);
  }

  #[test]
  fn test_selection_helpers_accept_references() {
    let form = form(7, 2);
    assert!(form.is_member(7));
    assert!(form.is_member(&7));
    assert!(!form.is_member(&8));
    assert!(form.is_plan(&2));
    assert!(!form.is_plan(3));
    assert!(form.is_status("Vigente"));
  }

  #[test]
  fn test_blank_amount_defaults_to_plan_price() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");

    let mut f = form(member, plan_id);
    f.monto = " ".into();
    f.auto_renovacion = None;
    let sub = f.validate(&conn).unwrap().unwrap();
    assert_eq!(sub.amount, Money::from_cents(150000));
    assert!(!sub.auto_renew);
  }

  #[test]
  fn test_form_errors() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");

    let mut f = form(member, plan_id);
    f.socio = "999".into();
    f.plan = "abc".into();
    f.fecha_inicio = "2025-04-01".into();
    f.monto = "-3".into();
    f.estado = "Pagada".into();
    let errors = f.validate(&conn).unwrap().unwrap_err();
    for field in ["socio", "plan", "fecha_fin", "monto", "estado"] {
      assert!(errors.has(field), "missing error for {}", field);
    }
  }

  #[test]
  fn test_overlapping_current_rejected() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    let first = form(member, plan_id).validate(&conn).unwrap().unwrap();
    db::create_subscription(&conn, &first).unwrap();

    let errors = form(member, plan_id).validate(&conn).unwrap().unwrap_err();
    assert!(errors.has("estado"));

    // A pending one over the same period is fine
    let mut pending = form(member, plan_id);
    pending.estado = "Pendiente".into();
    assert!(pending.validate(&conn).unwrap().is_ok());

    // So is a current one for the following month
    let mut next = form(member, plan_id);
    next.fecha_inicio = "2025-04-01".into();
    next.fecha_fin = "2025-04-30".into();
    assert!(next.validate(&conn).unwrap().is_ok());
  }

  #[test]
  fn test_quick_creates_pending_with_plan_price() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");

    let outcome = quick_subscribe(&conn, &quick(&member.to_string(), &plan_id.to_string(), ""), date("2025-03-15")).unwrap();
    let QuickOutcome::Created { subscription_id, member_id } = outcome.clone() else {
      panic!("expected Created, got {:?}", outcome);
    };
    assert_eq!(member_id, member);

    let sub = db::get_subscription(&conn, subscription_id).unwrap().unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Pending);
    assert_eq!(sub.amount, Money::from_cents(150000));
    assert!(sub.start_date.is_none());
  }

  #[test]
  fn test_quick_amount_override_and_fallback() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    let today = date("2025-03-15");

    let amount_of = |monto: &str| {
      match quick_subscribe(&conn, &quick(&member.to_string(), &plan_id.to_string(), monto), today).unwrap() {
        QuickOutcome::Created { subscription_id, .. } => {
          db::get_subscription(&conn, subscription_id).unwrap().unwrap().amount
        }
        other => panic!("expected Created, got {:?}", other),
      }
    };

    assert_eq!(amount_of("999.90"), Money::from_cents(99990));
    assert_eq!(amount_of("mucho"), Money::from_cents(150000));
  }

  #[test]
  fn test_quick_rejects_when_active_today() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    let current = form(member, plan_id).validate(&conn).unwrap().unwrap();
    db::create_subscription(&conn, &current).unwrap();

    let f = quick(&member.to_string(), &plan_id.to_string(), "");
    assert_eq!(
      quick_subscribe(&conn, &f, date("2025-03-15")).unwrap(),
      QuickOutcome::AlreadyActive { member_id: member }
    );
    assert_eq!(db::get_member_subscriptions(&conn, member).unwrap().len(), 1);

    // Once it has lapsed a new one can be created
    assert!(matches!(
      quick_subscribe(&conn, &f, date("2025-04-01")).unwrap(),
      QuickOutcome::Created { .. }
    ));
  }

  #[test]
  fn test_quick_invalid_ids() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    let today = date("2025-03-15");

    assert_eq!(
      quick_subscribe(&conn, &quick("", &plan_id.to_string(), ""), today).unwrap(),
      QuickOutcome::InvalidMember(None)
    );
    assert_eq!(
      quick_subscribe(&conn, &quick("404", &plan_id.to_string(), ""), today).unwrap(),
      QuickOutcome::InvalidMember(Some(404))
    );
    assert_eq!(
      quick_subscribe(&conn, &quick(&member.to_string(), "x", ""), today).unwrap(),
      QuickOutcome::InvalidPlan { member_id: member }
    );
    assert_eq!(
      quick_subscribe(&conn, &quick(&member.to_string(), "77", ""), today).unwrap(),
      QuickOutcome::InvalidPlan { member_id: member }
    );
  }
}
