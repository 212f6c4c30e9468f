//! Branches ("sucursales") and plans: the reference data behind the select inputs.

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{Branch, Money, Plan};

pub fn create_branch(conn: &Connection, name: &str) -> Result<i64> {
  conn.execute("INSERT INTO branches (name) VALUES (?1)", params![name])?;
  Ok(conn.last_insert_rowid())
}

pub fn get_all_branches(conn: &Connection) -> Result<Vec<Branch>> {
  let mut stmt = conn.prepare("SELECT id, name FROM branches ORDER BY name")?;
  let branches = stmt
    .query_map([], |row| {
      Ok(Branch {
        id: row.get(0)?,
        name: row.get(1)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(branches)
}

pub fn create_plan(
  conn: &Connection,
  name: &str,
  price: Money,
  duration_days: i64,
  active: bool,
) -> Result<i64> {
  conn.execute(
    "INSERT INTO plans (name, price_cents, duration_days, active) VALUES (?1, ?2, ?3, ?4)",
    params![name, price.cents(), duration_days, active],
  )?;
  Ok(conn.last_insert_rowid())
}

fn row_to_plan(row: &rusqlite::Row) -> Result<Plan> {
  Ok(Plan {
    id: row.get(0)?,
    name: row.get(1)?,
    price: Money::from_cents(row.get(2)?),
    duration_days: row.get(3)?,
    active: row.get(4)?,
  })
}

pub fn get_plan(conn: &Connection, plan_id: i64) -> Result<Option<Plan>> {
  conn
    .query_row(
      "SELECT id, name, price_cents, duration_days, active FROM plans WHERE id = ?1",
      params![plan_id],
      row_to_plan,
    )
    .optional()
}

/// Plans offered for new subscriptions, ordered by name
pub fn get_active_plans(conn: &Connection) -> Result<Vec<Plan>> {
  let mut stmt = conn.prepare(
    "SELECT id, name, price_cents, duration_days, active FROM plans WHERE active = 1 ORDER BY name",
  )?;
  let plans = stmt.query_map([], row_to_plan)?.collect::<Result<Vec<_>>>()?;
  Ok(plans)
}

/// Plan entry for startup seeding
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSeed {
  pub name: String,
  pub price: Money,
  pub duration_days: i64,
}

/// Seed branches and plans, each only if its table is empty (idempotent)
pub fn seed_catalog(conn: &Connection, branches: &[String], plans: &[PlanSeed]) -> Result<()> {
  let branch_count: i64 = conn.query_row("SELECT COUNT(*) FROM branches", [], |row| row.get(0))?;
  if branch_count == 0 && !branches.is_empty() {
    for name in branches {
      create_branch(conn, name)?;
    }
    tracing::info!("Seeded {} branches", branches.len());
  }

  let plan_count: i64 = conn.query_row("SELECT COUNT(*) FROM plans", [], |row| row.get(0))?;
  if plan_count == 0 && !plans.is_empty() {
    for plan in plans {
      create_plan(conn, &plan.name, plan.price, plan.duration_days, true)?;
    }
    tracing::info!("Seeded {} plans", plans.len());
  }

  Ok(())
}
