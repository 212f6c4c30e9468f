//! User and session operations.
//!
//! Tables are created by `crate::db::schema`. Member accounts are created
//! with a NULL `password_hash` (unusable password) and cannot log in until
//! a password is set for them; staff accounts carry an Argon2 hash.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::password;

/// Session owner as seen by the auth extractor
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
}

// ==================== User Operations ====================

/// Create a user, returns the user ID. `password_hash = None` gives an unusable password.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: Option<&str>,
    is_staff: bool,
) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (username, password_hash, is_staff, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, password_hash, is_staff, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user ID and password hash for login. The hash is None for unusable passwords.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<(i64, Option<String>)>> {
    conn.query_row(
        "SELECT id, password_hash FROM users WHERE username = ?1",
        params![username],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Check if username exists
pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Update user's last login time
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

/// Create the configured staff account if it does not exist yet.
/// Returns true when a user was created.
pub fn ensure_staff_user(conn: &Connection, username: &str, plain_password: &str) -> Result<bool> {
    if username_exists(conn, username)? {
        return Ok(false);
    }
    let hash = password::hash_password(plain_password)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.to_string().into()))?;
    create_user(conn, username, Some(&hash), true)?;
    tracing::info!("Created staff user '{}'", username);
    Ok(true)
}

// ==================== Session Operations ====================

/// Create a new session
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
    duration_hours: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![session_id, user_id, now.to_rfc3339(), expires_at.to_rfc3339()],
    )?;
    Ok(())
}

/// Get the user for a session, None if the session is unknown or expired
pub fn get_session_user(conn: &Connection, session_id: &str) -> Result<Option<SessionUser>> {
    let now = Utc::now().to_rfc3339();
    conn.query_row(
        r#"SELECT u.id, u.username, u.is_staff
           FROM sessions s
           JOIN users u ON s.user_id = u.id
           WHERE s.id = ?1 AND s.expires_at > ?2"#,
        params![session_id, now],
        |row| {
            Ok(SessionUser {
                user_id: row.get(0)?,
                username: row.get(1)?,
                is_staff: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Delete expired sessions, returns how many were removed
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
}
