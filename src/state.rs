//! Shared application state. The catalog/model snapshot is immutable and
//! read-shared; it is only replaced wholesale by the explicit
//! re-introspection trigger, so request handlers never lock for writing.

use crate::catalog::{SchemaCatalog, TableDescriptor};
use crate::model::{self, SemanticType, SynthesisMode, SynthesizedModel};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Identifies one bound table: (schema, table).
pub type TableKey = (String, String);

/// Primary-key column used by the id-addressed routes, with the semantic
/// type that drives id parsing.
#[derive(Clone, Debug)]
pub struct PkSpec {
    pub column: String,
    pub semantic: SemanticType,
}

/// One table's synthesized models paired with its descriptor. Built once
/// per introspection pass and registered with the router; never mutated
/// after registration.
#[derive(Clone, Debug)]
pub struct TableBinding {
    pub table: TableDescriptor,
    pub read: SynthesizedModel,
    pub write: SynthesizedModel,
    pub pk: Option<PkSpec>,
}

/// Immutable catalog + bindings produced by one introspection pass.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub catalog: SchemaCatalog,
    pub bindings: HashMap<TableKey, Arc<TableBinding>>,
}

impl Snapshot {
    /// Synthesize models for every table in the catalog. Explicitly invoked
    /// during startup (and on refresh), never as an import side effect.
    pub fn from_catalog(catalog: SchemaCatalog) -> Self {
        let mut bindings = HashMap::new();
        for table in catalog.tables() {
            let read = model::synthesize(table, &catalog, SynthesisMode::Read);
            let write = model::synthesize(table, &catalog, SynthesisMode::Write);
            let pk = pk_spec(table, &read);
            bindings.insert(
                (table.schema.clone(), table.name.clone()),
                Arc::new(TableBinding {
                    table: table.clone(),
                    read,
                    write,
                    pk,
                }),
            );
        }
        Snapshot { catalog, bindings }
    }

    pub fn binding(&self, key: &TableKey) -> Option<Arc<TableBinding>> {
        self.bindings.get(key).cloned()
    }
}

/// Single-column primary keys drive the id routes. Composite keys fall back
/// to the first declared column; keyless relations (views) get none.
fn pk_spec(table: &TableDescriptor, read: &SynthesizedModel) -> Option<PkSpec> {
    let column = table.pk_columns.first()?.clone();
    let semantic = read
        .field(&column)
        .map(|f| f.semantic.clone())
        .unwrap_or(SemanticType::Opaque);
    Some(PkSpec { column, semantic })
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Replaced atomically by the explicit refresh trigger.
    pub snapshot: Arc<RwLock<Arc<Snapshot>>>,
    /// Configured schema selection, kept for re-introspection.
    pub schemas: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(pool: PgPool, catalog: SchemaCatalog, schemas: Vec<String>) -> Self {
        let snapshot = Snapshot::from_catalog(catalog);
        AppState {
            pool,
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            schemas: Arc::new(schemas),
        }
    }

    /// Cheap clone of the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace_snapshot(&self, snapshot: Snapshot) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
    }
}
