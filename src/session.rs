//! Session cookie helpers.

use axum_extra::extract::cookie::Cookie;
use rand::{distr::Alphanumeric, Rng};

use crate::config;

pub const SESSION_COOKIE_NAME: &str = "socios_session";

/// Length of generated session IDs
const SESSION_ID_LEN: usize = 40;

/// Generate a new random session ID
pub fn generate_session_id() -> String {
  rand::rng()
    .sample_iter(&Alphanumeric)
    .take(SESSION_ID_LEN)
    .map(char::from)
    .collect()
}

/// HttpOnly session cookie valid for the configured session duration
pub fn session_cookie(session_id: String) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE_NAME, session_id))
    .path("/")
    .http_only(true)
    .secure(false) // Set to true in production with HTTPS
    .max_age(time::Duration::hours(config::SESSION_DURATION_HOURS))
    .build()
}

/// Cookie used to clear the session on logout
pub fn removal_cookie() -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE_NAME, ""))
    .path("/")
    .max_age(time::Duration::seconds(0))
    .build()
}
