//! Read-only handlers over the introspected catalog, plus the explicit
//! re-introspection trigger. The snapshot is cached for the process
//! lifetime; only the trigger replaces it.

use crate::catalog;
use crate::error::Error;
use crate::state::{AppState, Snapshot};
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

/// GET /metadata: the full catalog snapshot.
pub async fn get_metadata(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.snapshot();
    Json(serde_json::to_value(&snapshot.catalog).unwrap_or(Value::Null))
}

/// GET /metadata/{schema}: one schema's slice of the catalog.
pub async fn get_schema(
    State(state): State<AppState>,
    Path(schema): Path<String>,
) -> Result<Json<Value>, Error> {
    let snapshot = state.snapshot();
    let descriptor = snapshot
        .catalog
        .schema(&schema)
        .ok_or(Error::NotFound(schema))?;
    Ok(Json(serde_json::to_value(descriptor).unwrap_or(Value::Null)))
}

/// GET /enums: every enumerated type with its allowed values.
pub async fn get_enums(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.snapshot();
    Json(serde_json::to_value(&snapshot.catalog.enums).unwrap_or(Value::Null))
}

/// POST /metadata/refresh: re-run introspection and swap the snapshot.
/// The registered route set is fixed at startup; refresh updates the
/// catalog and models served to existing routes.
pub async fn refresh(State(state): State<AppState>) -> Result<Json<Value>, Error> {
    let catalog = catalog::introspect(&state.pool, &state.schemas).await?;
    let tables = catalog.tables().count();
    let degraded = catalog.degraded.len();
    state.replace_snapshot(Snapshot::from_catalog(catalog));
    tracing::info!(tables, degraded, "catalog refreshed");
    Ok(Json(serde_json::json!({
        "refreshed": true,
        "tables": tables,
        "degraded": degraded,
    })))
}
