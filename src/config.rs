//! Environment-driven settings: connection string, schema selection, pool sizing.

use crate::error::Error;
use std::time::Duration;

/// Runtime settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Ordered list of schemas to introspect and expose. Schemas not listed
    /// are invisible to the generated API.
    pub schemas: Vec<String>,
    pub pool: PoolSettings,
    pub bind_addr: String,
}

#[derive(Clone, Debug)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Ping each connection before handing it out.
    pub test_before_acquire: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            test_before_acquire: true,
        }
    }
}

impl Settings {
    /// Read settings from the environment:
    /// `DATABASE_URL`, `PGFORGE_SCHEMAS` (comma-separated, ordered),
    /// `PGFORGE_MAX_CONNECTIONS`, `PGFORGE_ACQUIRE_TIMEOUT_SECS`,
    /// `PGFORGE_BIND_ADDR`.
    pub fn from_env() -> Result<Self, Error> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/postgres".into());
        let schemas = parse_schema_list(
            &std::env::var("PGFORGE_SCHEMAS").unwrap_or_else(|_| "public".into()),
        );
        if schemas.is_empty() {
            return Err(Error::BadRequest("PGFORGE_SCHEMAS must list at least one schema".into()));
        }
        let mut pool = PoolSettings::default();
        if let Ok(v) = std::env::var("PGFORGE_MAX_CONNECTIONS") {
            pool.max_connections = v
                .parse()
                .map_err(|_| Error::BadRequest(format!("PGFORGE_MAX_CONNECTIONS: invalid value '{v}'")))?;
        }
        if let Ok(v) = std::env::var("PGFORGE_ACQUIRE_TIMEOUT_SECS") {
            let secs: u64 = v
                .parse()
                .map_err(|_| Error::BadRequest(format!("PGFORGE_ACQUIRE_TIMEOUT_SECS: invalid value '{v}'")))?;
            pool.acquire_timeout = Duration::from_secs(secs);
        }
        let bind_addr =
            std::env::var("PGFORGE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        Ok(Self {
            database_url,
            schemas,
            pool,
            bind_addr,
        })
    }
}

/// Split a comma-separated schema list, trimming blanks and keeping order.
/// Duplicates are dropped (first occurrence wins).
pub fn parse_schema_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let name = part.trim();
        if name.is_empty() || out.iter().any(|s| s == name) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}
