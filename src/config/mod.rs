//! Configuration module for Pulse
//!
//! Everything is environment-driven (a `.env` file is honored when present):
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `PORT` | listen port | 8080 |
//! | `DB_PATH` | store location | `./data/sentry.db` |
//! | `JWT_SECRET` | signing key for dashboard sessions | insecure default |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | seeded initial user | unset, skip |

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_PATH: &str = "./data/sentry.db";
const DEFAULT_JWT_SECRET: &str = "default-secret-do-not-use-in-production";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Build the configuration from the process environment
    pub fn from_env() -> Self {
        Self {
            port: env_var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_path: env_var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            jwt_secret: env_var("JWT_SECRET").unwrap_or_else(|| {
                tracing::warn!("JWT_SECRET not set, using an insecure default");
                DEFAULT_JWT_SECRET.to_string()
            }),
            admin_email: env_var("ADMIN_EMAIL"),
            admin_password: env_var("ADMIN_PASSWORD"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: DEFAULT_DB_PATH.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin_email: None,
            admin_password: None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
