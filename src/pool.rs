//! Connection pool setup: bounded size, wait-with-timeout acquire, pre-use
//! health check. The pool is the only mutable shared resource in the request
//! path; handlers take one connection per request and release it on every
//! exit path via the transaction guard.

use crate::config::PoolSettings;
use crate::error::Error;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect eagerly. Fails with `Error::Connection` when the database is
/// unreachable or authentication fails, which is fatal at startup.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool, Error> {
    options(settings)
        .connect(database_url)
        .await
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Build a pool that does not dial until first use. Lets tests construct
/// application state and exercise routing without a live server.
pub fn connect_lazy(database_url: &str, settings: &PoolSettings) -> Result<PgPool, Error> {
    options(settings)
        .connect_lazy(database_url)
        .map_err(|e| Error::Connection(e.to_string()))
}

fn options(settings: &PoolSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .test_before_acquire(settings.test_before_acquire)
}
