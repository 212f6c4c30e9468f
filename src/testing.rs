//! Test utilities for database setup.
//!
//! Reuses the authoritative schema initialization so unit tests never
//! carry their own copy of the schema.

use rusqlite::Connection;

use crate::db::{self, MemberData};
use crate::domain::{Dni, MemberStatus, Money};

/// In-memory connection with foreign keys on and all migrations applied.
pub fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    db::configure_connection(&conn).expect("configure connection");
    db::run_migrations(&conn).expect("run migrations");
    conn
}

/// Baseline catalog: returns (branch_id, plan_id) for a "Centro" branch and a "Mensual" plan.
pub fn seed_catalog(conn: &Connection) -> (i64, i64) {
    let branch_id = db::create_branch(conn, "Centro").expect("create branch");
    let plan_id = db::create_plan(conn, "Mensual", Money::from_cents(150000), 30, true)
        .expect("create plan");
    (branch_id, plan_id)
}

/// Create a member with the given DNI and last name in `branch_id`.
pub fn add_member(conn: &Connection, branch_id: i64, dni: &str, first: &str, last: &str) -> i64 {
    let member = MemberData {
        dni: Dni::parse(dni).expect("valid dni"),
        branch_id,
        status: MemberStatus::Active,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", dni),
    };
    db::create_member(conn, &member).expect("create member")
}
