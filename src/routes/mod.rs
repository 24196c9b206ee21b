//! Route generation. `build` is invoked once during startup, after
//! introspection completes and before the server accepts connections; it
//! returns the full router for the host application to mount. Mutation
//! routes for views are never registered, so a mutation request on a
//! view-backed path falls through to the not-found handler (404, not 403).

mod common;
pub use common::common_routes;

use crate::error::Error;
use crate::handlers::{crud, metadata};
use crate::state::{AppState, TableKey};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use serde_json::Value;
use std::collections::HashMap;
use tower_http::trace::TraceLayer;

async fn no_such_route() -> Error {
    Error::NotFound("no such route".into())
}

/// Build the application router from the current snapshot: one CRUD route
/// set per table, read-only routes per view, plus the metadata, enum and
/// common routers.
pub fn build(state: AppState) -> Router {
    let snapshot = state.snapshot();
    let mut api = Router::new();

    let mut keys: Vec<&TableKey> = snapshot.bindings.keys().collect();
    keys.sort();
    for key in keys {
        let binding = &snapshot.bindings[key];
        let collection_path = format!("/{}/{}", key.0, key.1);
        api = api.route(
            &collection_path,
            collection_router(key.clone(), binding.table.is_view),
        );
        if binding.pk.is_some() {
            let item_path = format!("/{}/{}/:id", key.0, key.1);
            api = api.route(&item_path, item_router(key.clone()));
        }
        tracing::debug!(
            schema = %key.0,
            table = %key.1,
            view = binding.table.is_view,
            "registered routes"
        );
    }

    api.merge(metadata_routes())
        .merge(common_routes())
        .fallback(no_such_route)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn metadata_routes() -> Router<AppState> {
    Router::new()
        .route("/metadata", get(metadata::get_metadata))
        .route("/metadata/refresh", post(metadata::refresh))
        .route("/metadata/:schema", get(metadata::get_schema))
        .route("/enums", get(metadata::get_enums))
}

/// GET (read-many) and, for tables only, POST (create). Views get a method
/// fallback so a mutation attempt reads as a missing route.
fn collection_router(key: TableKey, is_view: bool) -> MethodRouter<AppState> {
    let list_key = key.clone();
    let m = get(
        move |State(state): State<AppState>, Query(params): Query<HashMap<String, String>>| {
            let key = list_key.clone();
            async move { crud::read_many(state, key, params).await }
        },
    );
    if is_view {
        return m.fallback(no_such_route);
    }
    m.post(
        move |State(state): State<AppState>, Json(body): Json<Value>| {
            let key = key.clone();
            async move { crud::create(state, key, body).await }
        },
    )
}

/// GET (read-one), PUT (update), DELETE. Only registered for relations with
/// a primary key, which rules views out at generation time.
fn item_router(key: TableKey) -> MethodRouter<AppState> {
    let read_key = key.clone();
    let update_key = key.clone();
    get(
        move |State(state): State<AppState>, Path(id): Path<String>| {
            let key = read_key.clone();
            async move { crud::read_one(state, key, id).await }
        },
    )
    .put(
        move |State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<Value>| {
            let key = update_key.clone();
            async move { crud::update(state, key, id, body).await }
        },
    )
    .delete(
        move |State(state): State<AppState>, Path(id): Path<String>| {
            let key = key.clone();
            async move { crud::delete(state, key, id).await }
        },
    )
}
