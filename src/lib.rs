//! pgforge: schema-introspected REST backend library for PostgreSQL.
//!
//! Point it at a database, list the schemas to expose, and it introspects the
//! catalog, synthesizes a typed model per table, and builds an axum router
//! with a uniform CRUD surface plus metadata/enum read APIs.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod pool;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use catalog::{introspect, Introspector, PgIntrospector, SchemaCatalog};
pub use config::{PoolSettings, Settings};
pub use error::Error;
pub use pool::{connect, connect_lazy};
pub use routes::build;
pub use service::CrudService;
pub use state::{AppState, Snapshot};
