//! Member ("socio") persistence. Every member owns a user account whose
//! username is the member's DNI.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::fold_for_search;
use crate::domain::{Dni, Member, MemberStatus};

/// Validated member fields for create and update
#[derive(Debug, Clone)]
pub struct MemberData {
  pub dni: Dni,
  pub branch_id: i64,
  pub status: MemberStatus,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
}

/// Failure writing a member
#[derive(Debug)]
pub enum MemberWriteError {
  /// The DNI is already used as a username or by another member
  DuplicateDni,
  Db(rusqlite::Error),
}

impl std::fmt::Display for MemberWriteError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::DuplicateDni => write!(f, "DNI already registered"),
      Self::Db(e) => write!(f, "Database error: {}", e),
    }
  }
}

impl std::error::Error for MemberWriteError {}

impl From<rusqlite::Error> for MemberWriteError {
  fn from(e: rusqlite::Error) -> Self {
    if is_unique_violation(&e) {
      Self::DuplicateDni
    } else {
      Self::Db(e)
    }
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

const MEMBER_SELECT: &str = r#"
  SELECT m.id, m.user_id, m.dni, u.username, u.first_name, u.last_name, u.email,
         m.branch_id, b.name, m.status, m.created_at
  FROM members m
  JOIN users u ON u.id = m.user_id
  JOIN branches b ON b.id = m.branch_id
"#;

fn row_to_member(row: &rusqlite::Row) -> Result<Member> {
  let status: String = row.get(9)?;
  Ok(Member {
    id: row.get(0)?,
    user_id: row.get(1)?,
    dni: row.get(2)?,
    username: row.get(3)?,
    first_name: row.get(4)?,
    last_name: row.get(5)?,
    email: row.get(6)?,
    branch_id: row.get(7)?,
    branch_name: row.get(8)?,
    status: MemberStatus::from_str(&status).unwrap_or(MemberStatus::Inactive),
    created_at: row.get(10)?,
  })
}

/// Whether `dni` is taken by a username or a member other than `exclude_member`
pub fn dni_taken(conn: &Connection, dni: &str, exclude_member: Option<i64>) -> Result<bool> {
  let exclude = exclude_member.unwrap_or(-1);
  conn.query_row(
    r#"SELECT
         EXISTS(SELECT 1 FROM members WHERE dni = ?1 AND id != ?2)
         OR EXISTS(
           SELECT 1 FROM users u
           WHERE u.username = ?1
             AND u.id NOT IN (SELECT user_id FROM members WHERE id = ?2)
         )"#,
    params![dni, exclude],
    |row| row.get(0),
  )
}

/// Create the user account (username = DNI, unusable password) and the member
/// in one transaction. Returns the member ID.
pub fn create_member(conn: &Connection, data: &MemberData) -> std::result::Result<i64, MemberWriteError> {
  if dni_taken(conn, data.dni.as_str(), None)? {
    return Err(MemberWriteError::DuplicateDni);
  }

  let now = Utc::now().to_rfc3339();
  let tx = conn.unchecked_transaction()?;
  tx.execute(
    r#"INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff, created_at)
       VALUES (?1, ?2, ?3, ?4, NULL, 0, ?5)"#,
    params![data.dni.as_str(), data.email, data.first_name, data.last_name, now],
  )?;
  let user_id = tx.last_insert_rowid();

  tx.execute(
    r#"INSERT INTO members (user_id, dni, branch_id, status, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5)"#,
    params![user_id, data.dni.as_str(), data.branch_id, data.status.as_str(), now],
  )?;
  let member_id = tx.last_insert_rowid();
  tx.commit()?;

  Ok(member_id)
}

/// Update member fields and the linked user's names, email and username (kept equal to the DNI).
/// Returns false if the member does not exist.
pub fn update_member(
  conn: &Connection,
  member_id: i64,
  data: &MemberData,
) -> std::result::Result<bool, MemberWriteError> {
  let user_id: Option<i64> = conn
    .query_row(
      "SELECT user_id FROM members WHERE id = ?1",
      params![member_id],
      |row| row.get(0),
    )
    .optional()?;
  let Some(user_id) = user_id else {
    return Ok(false);
  };

  if dni_taken(conn, data.dni.as_str(), Some(member_id))? {
    return Err(MemberWriteError::DuplicateDni);
  }

  let tx = conn.unchecked_transaction()?;
  tx.execute(
    "UPDATE members SET dni = ?1, branch_id = ?2, status = ?3 WHERE id = ?4",
    params![data.dni.as_str(), data.branch_id, data.status.as_str(), member_id],
  )?;
  tx.execute(
    "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, email = ?4 WHERE id = ?5",
    params![data.dni.as_str(), data.first_name, data.last_name, data.email, user_id],
  )?;
  tx.commit()?;

  Ok(true)
}

pub fn get_member(conn: &Connection, member_id: i64) -> Result<Option<Member>> {
  conn
    .query_row(
      &format!("{} WHERE m.id = ?1", MEMBER_SELECT),
      params![member_id],
      row_to_member,
    )
    .optional()
}

pub fn member_exists(conn: &Connection, member_id: i64) -> Result<bool> {
  conn.query_row(
    "SELECT COUNT(*) > 0 FROM members WHERE id = ?1",
    params![member_id],
    |row| row.get(0),
  )
}

/// All members ordered by last name, first name. `last_name_filter` keeps
/// members whose last name contains the term, ignoring case and accents.
pub fn list_members(conn: &Connection, last_name_filter: Option<&str>) -> Result<Vec<Member>> {
  let mut stmt = conn.prepare(&format!("{} ORDER BY m.id", MEMBER_SELECT))?;
  let members = stmt.query_map([], row_to_member)?.collect::<Result<Vec<_>>>()?;

  // SQLite's NOCASE only folds ASCII, so order on folded names here
  let needle = last_name_filter.map(fold_for_search).filter(|n| !n.is_empty());
  let mut keyed: Vec<(String, String, Member)> = members
    .into_iter()
    .map(|m| (fold_for_search(&m.last_name), fold_for_search(&m.first_name), m))
    .filter(|(last, _, _)| needle.as_ref().is_none_or(|n| last.contains(n.as_str())))
    .collect();
  keyed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

  Ok(keyed.into_iter().map(|(_, _, m)| m).collect())
}

/// Delete a member by deleting its user account. The member row and its
/// subscriptions go with it through ON DELETE CASCADE.
/// Returns the member's display name, or None if it did not exist.
pub fn delete_member(conn: &Connection, member_id: i64) -> Result<Option<String>> {
  let Some(member) = get_member(conn, member_id)? else {
    return Ok(None);
  };

  conn.execute("DELETE FROM users WHERE id = ?1", params![member.user_id])?;
  Ok(Some(member.display_name()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{create_subscription, NewSubscription};
  use crate::domain::{Money, SubscriptionStatus};
  use crate::testing::{add_member, seed_catalog, test_conn};

  fn data(dni: &str, branch_id: i64) -> MemberData {
    MemberData {
      dni: Dni::parse(dni).unwrap(),
      branch_id,
      status: MemberStatus::Active,
      first_name: "Ana".into(),
      last_name: "Pérez".into(),
      email: "ana@example.com".into(),
    }
  }

  fn count(conn: &Connection, table: &str) -> i64 {
    conn
      .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
      .unwrap()
  }

  #[test]
  fn test_create_member_creates_user_without_password() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    let id = create_member(&conn, &data("30111222", branch_id)).unwrap();

    let member = get_member(&conn, id).unwrap().unwrap();
    assert_eq!(member.username, "30111222");
    assert_eq!(member.branch_name, "Centro");
    assert_eq!(member.full_name(), "Ana Pérez");

    let hash: Option<String> = conn
      .query_row("SELECT password_hash FROM users WHERE id = ?1", [member.user_id], |row| row.get(0))
      .unwrap();
    assert!(hash.is_none());
  }

  #[test]
  fn test_duplicate_dni_rejected() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    create_member(&conn, &data("30111222", branch_id)).unwrap();

    let err = create_member(&conn, &data("30111222", branch_id)).unwrap_err();
    assert!(matches!(err, MemberWriteError::DuplicateDni));
    assert_eq!(count(&conn, "users"), 1);
  }

  #[test]
  fn test_update_member_syncs_user() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    let id = create_member(&conn, &data("30111222", branch_id)).unwrap();

    let mut changed = data("30111223", branch_id);
    changed.first_name = "Ana María".into();
    changed.email = "anamaria@example.com".into();
    changed.status = MemberStatus::Suspended;
    assert!(update_member(&conn, id, &changed).unwrap());

    let member = get_member(&conn, id).unwrap().unwrap();
    assert_eq!(member.dni, "30111223");
    assert_eq!(member.username, "30111223");
    assert_eq!(member.first_name, "Ana María");
    assert_eq!(member.email, "anamaria@example.com");
    assert_eq!(member.status, MemberStatus::Suspended);
  }

  #[test]
  fn test_update_keeping_own_dni_is_allowed() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    let id = create_member(&conn, &data("30111222", branch_id)).unwrap();
    assert!(update_member(&conn, id, &data("30111222", branch_id)).unwrap());
  }

  #[test]
  fn test_update_to_other_members_dni_rejected() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    create_member(&conn, &data("30111222", branch_id)).unwrap();
    let other = create_member(&conn, &data("40111222", branch_id)).unwrap();

    let err = update_member(&conn, other, &data("30111222", branch_id)).unwrap_err();
    assert!(matches!(err, MemberWriteError::DuplicateDni));
  }

  #[test]
  fn test_update_missing_member() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    assert!(!update_member(&conn, 99, &data("30111222", branch_id)).unwrap());
  }

  #[test]
  fn test_delete_member_cascades_to_user_and_subscriptions() {
    let conn = test_conn();
    let (branch_id, plan_id) = seed_catalog(&conn);
    let id = add_member(&conn, branch_id, "30111222", "Ana", "Pérez");
    create_subscription(
      &conn,
      &NewSubscription {
        member_id: id,
        plan_id,
        start_date: None,
        end_date: None,
        amount: Money::from_cents(100),
        status: SubscriptionStatus::Pending,
        auto_renew: false,
      },
    )
    .unwrap();

    assert_eq!(delete_member(&conn, id).unwrap().as_deref(), Some("Ana Pérez"));
    assert_eq!(count(&conn, "users"), 0);
    assert_eq!(count(&conn, "members"), 0);
    assert_eq!(count(&conn, "subscriptions"), 0);
    assert_eq!(delete_member(&conn, id).unwrap(), None);
  }

  #[test]
  fn test_list_filters_by_last_name_ignoring_case_and_accents() {
    let conn = test_conn();
    let (branch_id, _) = seed_catalog(&conn);
    add_member(&conn, branch_id, "30000001", "Ana", "Pérez");
    add_member(&conn, branch_id, "30000002", "Luis", "Gómez");
    add_member(&conn, branch_id, "30000003", "Juan", "Perezoso");

    let last_names = |filter: Option<&str>| -> Vec<String> {
      list_members(&conn, filter)
        .unwrap()
        .into_iter()
        .map(|m| m.last_name)
        .collect()
    };

    assert_eq!(last_names(None), vec!["Gómez", "Pérez", "Perezoso"]);
    assert_eq!(last_names(Some("PEREZ")), vec!["Pérez", "Perezoso"]);
    assert_eq!(last_names(Some("  gom ")), vec!["Gómez"]);
    assert_eq!(last_names(Some("   ")).len(), 3);
    assert!(last_names(Some("zzz")).is_empty());
  }
}
