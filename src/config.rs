//! Application configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) > default.

use serde::Deserialize;
use std::path::PathBuf;

use crate::db::PlanSeed;
use crate::domain::Money;
use crate::paths;

// ==================== File Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<DatabaseConfig>,
    server: Option<ServerConfig>,
    payments: Option<PaymentsConfig>,
    admin: Option<AdminConfig>,
    seed: Option<SeedConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PaymentsConfig {
    create_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminConfig {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SeedConfig {
    #[serde(default)]
    branches: Vec<String>,
    #[serde(default)]
    plans: Vec<PlanSeedConfig>,
}

#[derive(Debug, Deserialize)]
struct PlanSeedConfig {
    name: String,
    /// Decimal price as a string, e.g. "15000.00"
    price: String,
    #[serde(default = "default_plan_days")]
    duration_days: i64,
}

fn default_plan_days() -> i64 {
    30
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default server port
pub const SERVER_PORT: u16 = 3000;

/// Default payment module route for a new payment
pub const DEFAULT_PAYMENTS_CREATE_URL: &str = "/pagos/crear/";

// ==================== Session Configuration ====================

/// Session duration in hours (12h, one working day)
pub const SESSION_DURATION_HOURS: i64 = 12;

/// Resolved application settings
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    /// Where the payment module creates a payment; gets `?suscripcion=<id>` appended
    pub payments_create_url: String,
    /// Staff account created on startup when missing
    pub admin: Option<(String, String)>,
    pub seed_branches: Vec<String>,
    pub seed_plans: Vec<PlanSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(paths::db_path()),
            port: SERVER_PORT,
            payments_create_url: DEFAULT_PAYMENTS_CREATE_URL.to_string(),
            admin: None,
            seed_branches: Vec::new(),
            seed_plans: Vec::new(),
        }
    }
}

impl Config {
    /// Load config.toml (if present) and the environment
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file_contents = std::fs::read_to_string("config.toml").ok();
        Self::resolve(file_contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Resolve settings from optional config.toml contents and an env lookup
    pub fn resolve(file_contents: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let file = match file_contents.map(toml::from_str::<FileConfig>) {
            Some(Ok(file)) => file,
            Some(Err(e)) => {
                tracing::warn!("Ignoring invalid config.toml: {}", e);
                FileConfig::default()
            }
            None => FileConfig::default(),
        };
        let defaults = Self::default();

        let database_path = file
            .database
            .and_then(|d| d.path)
            .or_else(|| env("DATABASE_PATH"))
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let port = file
            .server
            .and_then(|s| s.port)
            .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(defaults.port);

        let payments_create_url = file
            .payments
            .and_then(|p| p.create_url)
            .or_else(|| env("PAYMENTS_CREATE_URL"))
            .unwrap_or(defaults.payments_create_url);

        let (file_admin_user, file_admin_pass) = match file.admin {
            Some(a) => (a.username, a.password),
            None => (None, None),
        };
        let admin = match (
            file_admin_user.or_else(|| env("ADMIN_USERNAME")),
            file_admin_pass.or_else(|| env("ADMIN_PASSWORD")),
        ) {
            (Some(user), Some(pass)) if !user.trim().is_empty() && !pass.is_empty() => {
                Some((user.trim().to_string(), pass))
            }
            _ => None,
        };

        let seed = file.seed.unwrap_or_default();
        let seed_plans = seed
            .plans
            .into_iter()
            .filter_map(|p| match Money::parse(&p.price) {
                Ok(price) => Some(PlanSeed {
                    name: p.name,
                    price,
                    duration_days: p.duration_days,
                }),
                Err(e) => {
                    tracing::warn!("Skipping seed plan '{}': {}", p.name, e.message());
                    None
                }
            })
            .collect();

        Self {
            database_path,
            port,
            payments_create_url,
            admin,
            seed_branches: seed.branches,
            seed_plans,
        }
    }

    /// Full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", SERVER_ADDR, self.port)
    }

    /// Payment module URL for paying `subscription_id`
    pub fn payment_url(&self, subscription_id: i64) -> String {
        let sep = if self.payments_create_url.contains('?') { '&' } else { '?' };
        format!("{}{}suscripcion={}", self.payments_create_url, sep, subscription_id)
    }
}
