use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
  /// Created, waiting for payment
  Pending,
  /// Paid and in force between its start and end dates
  Current,
  Expired,
  Cancelled,
}

impl SubscriptionStatus {
  pub const ALL: [SubscriptionStatus; 4] =
    [Self::Pending, Self::Current, Self::Expired, Self::Cancelled];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "Pendiente" => Some(Self::Pending),
      "Vigente" => Some(Self::Current),
      "Vencida" => Some(Self::Expired),
      "Cancelada" => Some(Self::Cancelled),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "Pendiente",
      Self::Current => "Vigente",
      Self::Expired => "Vencida",
      Self::Cancelled => "Cancelada",
    }
  }
}

#[derive(Debug, Clone)]
pub struct Branch {
  pub id: i64,
  pub name: String,
}

#[derive(Debug, Clone)]
pub struct Plan {
  pub id: i64,
  pub name: String,
  pub price: Money,
  pub duration_days: i64,
  pub active: bool,
}

/// A subscription joined with its plan and member names.
#[derive(Debug, Clone)]
pub struct Subscription {
  pub id: i64,
  pub member_id: i64,
  pub member_name: String,
  pub member_dni: String,
  pub plan_id: i64,
  pub plan_name: String,
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
  pub amount: Money,
  pub status: SubscriptionStatus,
  pub auto_renew: bool,
}

impl Subscription {
  pub fn status_label(&self) -> &'static str {
    self.status.as_str()
  }

  pub fn start_label(&self) -> String {
    format_date(self.start_date)
  }

  pub fn end_label(&self) -> String {
    format_date(self.end_date)
  }
}

/// `dd/mm/yyyy`, or a dash when unset
pub fn format_date(date: Option<NaiveDate>) -> String {
  date
    .map(|d| d.format("%d/%m/%Y").to_string())
    .unwrap_or_else(|| "—".to_string())
}

/// Inclusive date ranges overlap. An open bound extends to infinity on that side.
pub fn ranges_overlap(
  a: (Option<NaiveDate>, Option<NaiveDate>),
  b: (Option<NaiveDate>, Option<NaiveDate>),
) -> bool {
  let starts_before_b_ends = match (a.0, b.1) {
    (Some(a_start), Some(b_end)) => a_start <= b_end,
    _ => true,
  };
  let b_starts_before_a_ends = match (b.0, a.1) {
    (Some(b_start), Some(a_end)) => b_start <= a_end,
    _ => true,
  };
  starts_before_b_ends && b_starts_before_a_ends
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn sub(status: SubscriptionStatus, start: Option<&str>, end: Option<&str>) -> Subscription {
    Subscription {
      id: 1,
      member_id: 1,
      member_name: "Ana Pérez".into(),
      member_dni: "30111222".into(),
      plan_id: 1,
      plan_name: "Mensual".into(),
      start_date: start.map(date),
      end_date: end.map(date),
      amount: Money::from_cents(100),
      status,
      auto_renew: false,
    }
  }

  #[test]
  fn test_ranges_overlap() {
    let r = |a: &str, b: &str| (Some(date(a)), Some(date(b)));
    assert!(ranges_overlap(r("2025-01-01", "2025-01-31"), r("2025-01-31", "2025-02-28")));
    assert!(!ranges_overlap(r("2025-01-01", "2025-01-30"), r("2025-01-31", "2025-02-28")));
    assert!(ranges_overlap((None, None), r("2025-01-01", "2025-01-02")));
    assert!(!ranges_overlap((Some(date("2025-03-01")), None), r("2025-01-01", "2025-02-01")));
  }

  #[test]
  fn test_format_date() {
    assert_eq!(format_date(Some(date("2025-03-05"))), "05/03/2025");
    assert_eq!(format_date(None), "—");
  }

  #[test]
  fn test_labels() {
    let pending = sub(SubscriptionStatus::Pending, None, Some("2025-03-31"));
    assert_eq!(pending.status_label(), "Pendiente");
    assert_eq!(pending.start_label(), "—");
    assert_eq!(pending.end_label(), "31/03/2025");
  }
}
