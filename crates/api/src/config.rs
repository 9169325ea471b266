//! Server configuration from environment variables.

/// Runtime configuration.
///
/// - `HOST` / `PORT` — bind address (defaults `0.0.0.0:3000`)
/// - `DATABASE_URL` — PostgreSQL connection string; when unset or blank
///   the server runs on the in-memory store
/// - `DB_MAX_CONNECTIONS` — pool size for the PostgreSQL backend
/// - `RUST_LOG` — tracing filter directive (default `info`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    /// suitable for local runs.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parsed("PORT", 3000),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env_parsed("DB_MAX_CONNECTIONS", 10),
            log_level: env_or("RUST_LOG", "info"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            db_max_connections: 10,
            log_level: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
