//! Pharmacy management API server: points pgforge at the pharmacy database,
//! selects the schemas to expose, and serves the generated routers.

use pgforge::{AppState, Introspector, PgIntrospector, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pgforge=info,pharmacy_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let pool = pgforge::connect(&settings.database_url, &settings.pool).await?;

    let introspector = PgIntrospector::new(pool.clone());
    let catalog = introspector.introspect(&settings.schemas).await?;
    let tables = catalog.tables().count();
    for degraded in &catalog.degraded {
        tracing::warn!(
            schema = %degraded.schema,
            table = %degraded.table,
            reason = %degraded.reason,
            "table excluded from the generated API"
        );
    }
    tracing::info!(
        engine = introspector.engine(),
        schemas = settings.schemas.len(),
        tables,
        enums = catalog.enums.len(),
        "introspection complete"
    );

    let state = AppState::new(pool, catalog, settings.schemas.clone());
    let app = pgforge::build(state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
