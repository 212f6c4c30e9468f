//! Subscription ("suscripción") persistence and the active-subscription rules.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::fold_for_search;
use crate::domain::subscription::ranges_overlap;
use crate::domain::{Money, Subscription, SubscriptionStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct NewSubscription {
  pub member_id: i64,
  pub plan_id: i64,
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
  pub amount: Money,
  pub status: SubscriptionStatus,
  pub auto_renew: bool,
}

const SUBSCRIPTION_SELECT: &str = r#"
  SELECT s.id, s.member_id, u.first_name, u.last_name, u.username, m.dni,
         s.plan_id, p.name, s.start_date, s.end_date, s.amount_cents, s.status, s.auto_renew
  FROM subscriptions s
  JOIN members m ON m.id = s.member_id
  JOIN users u ON u.id = m.user_id
  JOIN plans p ON p.id = s.plan_id
"#;

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
  value.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
  date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn row_to_subscription(row: &rusqlite::Row) -> Result<Subscription> {
  let first_name: String = row.get(2)?;
  let last_name: String = row.get(3)?;
  let username: String = row.get(4)?;
  let full_name = format!("{} {}", first_name, last_name).trim().to_string();
  let status: String = row.get(11)?;

  Ok(Subscription {
    id: row.get(0)?,
    member_id: row.get(1)?,
    member_name: if full_name.is_empty() { username } else { full_name },
    member_dni: row.get(5)?,
    plan_id: row.get(6)?,
    plan_name: row.get(7)?,
    start_date: parse_date(row.get(8)?),
    end_date: parse_date(row.get(9)?),
    amount: Money::from_cents(row.get(10)?),
    status: SubscriptionStatus::from_str(&status).unwrap_or(SubscriptionStatus::Pending),
    auto_renew: row.get(12)?,
  })
}

/// Insert a subscription, returns its ID
pub fn create_subscription(conn: &Connection, sub: &NewSubscription) -> Result<i64> {
  conn.execute(
    r#"INSERT INTO subscriptions
         (member_id, plan_id, start_date, end_date, amount_cents, status, auto_renew, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
    params![
      sub.member_id,
      sub.plan_id,
      format_date(sub.start_date),
      format_date(sub.end_date),
      sub.amount.cents(),
      sub.status.as_str(),
      sub.auto_renew,
      Utc::now().to_rfc3339(),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_subscription(conn: &Connection, subscription_id: i64) -> Result<Option<Subscription>> {
  conn
    .query_row(
      &format!("{} WHERE s.id = ?1", SUBSCRIPTION_SELECT),
      params![subscription_id],
      row_to_subscription,
    )
    .optional()
}

/// A member's subscriptions, latest end date first (undated ones last)
pub fn get_member_subscriptions(conn: &Connection, member_id: i64) -> Result<Vec<Subscription>> {
  let mut stmt = conn.prepare(&format!(
    "{} WHERE s.member_id = ?1 ORDER BY s.end_date IS NULL, s.end_date DESC, s.id DESC",
    SUBSCRIPTION_SELECT
  ))?;
  let subs = stmt
    .query_map(params![member_id], row_to_subscription)?
    .collect::<Result<Vec<_>>>()?;
  Ok(subs)
}

/// All subscriptions awaiting payment, ordered by member last name then first name
/// (accent-insensitive, like the member list)
pub fn get_pending_subscriptions(conn: &Connection) -> Result<Vec<Subscription>> {
  let mut stmt = conn.prepare(&format!("{} WHERE s.status = ?1 ORDER BY s.id", SUBSCRIPTION_SELECT))?;
  let mut keyed = stmt
    .query_map(params![SubscriptionStatus::Pending.as_str()], |row| {
      let last: String = row.get(3)?;
      let first: String = row.get(2)?;
      Ok((fold_for_search(&last), fold_for_search(&first), row_to_subscription(row)?))
    })?
    .collect::<Result<Vec<_>>>()?;
  keyed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

  Ok(keyed.into_iter().map(|(_, _, sub)| sub).collect())
}

/// Whether the member has a Vigente subscription covering `day`
pub fn has_active_subscription(conn: &Connection, member_id: i64, day: NaiveDate) -> Result<bool> {
  let day = day.format(DATE_FORMAT).to_string();
  conn.query_row(
    r#"SELECT EXISTS(
         SELECT 1 FROM subscriptions
         WHERE member_id = ?1 AND status = ?2
           AND start_date IS NOT NULL AND end_date IS NOT NULL
           AND start_date <= ?3 AND end_date >= ?3
       )"#,
    params![member_id, SubscriptionStatus::Current.as_str(), day],
    |row| row.get(0),
  )
}

/// Whether a Vigente subscription of the member overlaps `[start, end]`.
/// Open bounds on either side extend indefinitely.
pub fn has_overlapping_current(
  conn: &Connection,
  member_id: i64,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
) -> Result<bool> {
  let mut stmt = conn.prepare(
    "SELECT start_date, end_date FROM subscriptions WHERE member_id = ?1 AND status = ?2",
  )?;
  let ranges = stmt
    .query_map(params![member_id, SubscriptionStatus::Current.as_str()], |row| {
      Ok((parse_date(row.get(0)?), parse_date(row.get(1)?)))
    })?
    .collect::<Result<Vec<_>>>()?;

  Ok(ranges.into_iter().any(|range| ranges_overlap(range, (start, end))))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{add_member, seed_catalog, test_conn};

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
  }

  fn new_sub(
    member_id: i64,
    plan_id: i64,
    status: SubscriptionStatus,
    start: Option<&str>,
    end: Option<&str>,
  ) -> NewSubscription {
    NewSubscription {
      member_id,
      plan_id,
      start_date: start.map(date),
      end_date: end.map(date),
      amount: Money::from_cents(150000),
      status,
      auto_renew: false,
    }
  }

  #[test]
  fn test_active_subscription_window() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    create_subscription(
      &conn,
      &new_sub(member, plan_id, SubscriptionStatus::Current, Some("2025-03-01"), Some("2025-03-31")),
    )
    .unwrap();

    assert!(has_active_subscription(&conn, member, date("2025-03-01")).unwrap());
    assert!(has_active_subscription(&conn, member, date("2025-03-31")).unwrap());
    assert!(!has_active_subscription(&conn, member, date("2025-04-01")).unwrap());
    assert!(!has_active_subscription(&conn, member, date("2025-02-28")).unwrap());
  }

  #[test]
  fn test_pending_does_not_count_as_active() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    create_subscription(
      &conn,
      &new_sub(member, plan_id, SubscriptionStatus::Pending, Some("2025-03-01"), Some("2025-03-31")),
    )
    .unwrap();

    assert!(!has_active_subscription(&conn, member, date("2025-03-15")).unwrap());
  }

  #[test]
  fn test_overlap_only_against_current() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    create_subscription(
      &conn,
      &new_sub(member, plan_id, SubscriptionStatus::Current, Some("2025-03-01"), Some("2025-03-31")),
    )
    .unwrap();
    create_subscription(
      &conn,
      &new_sub(member, plan_id, SubscriptionStatus::Cancelled, Some("2025-05-01"), Some("2025-05-31")),
    )
    .unwrap();

    let overlaps = |s: &str, e: &str| has_overlapping_current(&conn, member, Some(date(s)), Some(date(e))).unwrap();
    assert!(overlaps("2025-03-31", "2025-04-30"));
    assert!(!overlaps("2025-04-01", "2025-04-30"));
    assert!(!overlaps("2025-05-10", "2025-05-20"));
  }

  #[test]
  fn test_member_subscriptions_order() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let member = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    let old = create_subscription(
      &conn,
      &new_sub(member, plan_id, SubscriptionStatus::Expired, Some("2025-01-01"), Some("2025-01-31")),
    )
    .unwrap();
    let undated = create_subscription(&conn, &new_sub(member, plan_id, SubscriptionStatus::Pending, None, None)).unwrap();
    let recent = create_subscription(
      &conn,
      &new_sub(member, plan_id, SubscriptionStatus::Current, Some("2025-02-01"), Some("2025-02-28")),
    )
    .unwrap();

    let ids: Vec<i64> = get_member_subscriptions(&conn, member).unwrap().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![recent, old, undated]);
  }

  #[test]
  fn test_pending_list_sorted_by_member_name() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let zapata = add_member(&conn, branch_id, "30000001", "Ana", "Zapata");
    let alvarez_b = add_member(&conn, branch_id, "30000002", "Bruno", "Alvarez");
    let alvarez_a = add_member(&conn, branch_id, "30000003", "Ana", "Alvarez");
    for member in [zapata, alvarez_b, alvarez_a] {
      create_subscription(&conn, &new_sub(member, plan_id, SubscriptionStatus::Pending, None, None)).unwrap();
    }
    create_subscription(&conn, &new_sub(zapata, plan_id, SubscriptionStatus::Cancelled, None, None)).unwrap();

    let pending = get_pending_subscriptions(&conn).unwrap();
    let members: Vec<i64> = pending.iter().map(|s| s.member_id).collect();
    assert_eq!(members, vec![alvarez_a, alvarez_b, zapata]);
    assert_eq!(pending[0].member_name, "Ana Alvarez");
    assert_eq!(pending[0].plan_name, "Mensual");
  }

  #[test]
  fn test_pending_list_ignores_accents_when_sorting() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let zapata = add_member(&conn, branch_id, "30000001", "Ana", "Zapata");
    let alvarez = add_member(&conn, branch_id, "30000002", "Ana", "Álvarez");
    let perez = add_member(&conn, branch_id, "30000003", "Ana", "pérez");
    for member in [zapata, alvarez, perez] {
      create_subscription(&conn, &new_sub(member, plan_id, SubscriptionStatus::Pending, None, None)).unwrap();
    }

    let names: Vec<String> = get_pending_subscriptions(&conn)
      .unwrap()
      .into_iter()
      .map(|s| s.member_name)
      .collect();
    assert_eq!(names, vec!["Ana Álvarez", "Ana pérez", "Ana Zapata"]);
  }
}
