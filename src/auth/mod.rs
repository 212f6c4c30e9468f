//! Staff authentication: users, sessions and the login-required extractor.

pub mod db;
pub mod handlers;
pub mod middleware;
pub mod password;

pub use handlers::*;
pub use middleware::AuthContext;
