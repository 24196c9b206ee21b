//! Database introspection: builds a [`SchemaCatalog`] from the live system
//! catalog, one pass at startup (or on an explicit refresh trigger).
//!
//! A malformed table degrades that table only: it is logged, recorded in the
//! catalog's `degraded` list, and skipped, so one bad table never prevents
//! the rest of the schema from being exposed.

mod queries;
mod types;

pub use types::{
    ColumnDescriptor, DegradedTable, EnumDescriptor, ForeignKeyRef, SchemaCatalog,
    SchemaDescriptor, TableDescriptor,
};

use crate::error::Error;
use queries::{RawColumn, RawEnumType, RawForeignKey, RawPrimaryKey};
use sqlx::PgPool;
use std::collections::HashSet;

/// Introspection seam, implemented per database engine.
#[async_trait::async_trait]
pub trait Introspector {
    fn engine(&self) -> &'static str;

    /// Produce a catalog limited to the given schemas, in the given order.
    async fn introspect(&self, schemas: &[String]) -> Result<SchemaCatalog, Error>;
}

#[derive(Clone)]
pub struct PgIntrospector {
    pool: PgPool,
}

impl PgIntrospector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Introspector for PgIntrospector {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn introspect(&self, schemas: &[String]) -> Result<SchemaCatalog, Error> {
        introspect(&self.pool, schemas).await
    }
}

/// Introspect the selected schemas. Issues read-only catalog queries only.
pub async fn introspect(pool: &PgPool, schemas: &[String]) -> Result<SchemaCatalog, Error> {
    let mut catalog = SchemaCatalog::default();

    for schema_name in schemas {
        let relations = queries::list_relations(pool, schema_name).await?;
        let mut tables = Vec::with_capacity(relations.len());

        for rel in relations {
            let described = describe_table(pool, schema_name, &rel.name, &rel.relkind).await;
            match described {
                Ok(table) => tables.push(table),
                Err(reason) => {
                    tracing::warn!(
                        schema = %schema_name,
                        table = %rel.name,
                        %reason,
                        "skipping table: introspection degraded"
                    );
                    catalog.degraded.push(DegradedTable {
                        schema: schema_name.clone(),
                        table: rel.name,
                        reason,
                    });
                }
            }
        }

        catalog.schemas.push(SchemaDescriptor {
            name: schema_name.clone(),
            tables,
        });
    }

    let raw_enums = queries::list_enums(pool).await?;
    catalog.enums = select_enums(raw_enums, schemas, &catalog);
    Ok(catalog)
}

async fn describe_table(
    pool: &PgPool,
    schema: &str,
    table: &str,
    relkind: &str,
) -> Result<TableDescriptor, String> {
    let columns = queries::list_columns(pool, schema, table)
        .await
        .map_err(|e| format!("columns: {e}"))?;
    let pk = queries::get_primary_key(pool, schema, table)
        .await
        .map_err(|e| format!("primary key: {e}"))?;
    let fks = queries::list_foreign_keys(pool, schema, table)
        .await
        .map_err(|e| format!("foreign keys: {e}"))?;
    build_table(schema, table, relkind, columns, pk, fks)
}

/// Assemble one descriptor from raw catalog rows. Pure, so the invariants
/// are checkable without a database.
fn build_table(
    schema: &str,
    table: &str,
    relkind: &str,
    raw_columns: Vec<RawColumn>,
    pk: Option<RawPrimaryKey>,
    fks: Vec<RawForeignKey>,
) -> Result<TableDescriptor, String> {
    if raw_columns.is_empty() {
        return Err("no readable columns".into());
    }
    let columns: Vec<ColumnDescriptor> = raw_columns
        .into_iter()
        .map(|c| ColumnDescriptor {
            name: c.name,
            data_type: c.data_type,
            udt_schema: c.udt_schema,
            udt_name: c.udt_name,
            nullable: c.is_nullable,
            default: c.default,
            is_identity: c.is_identity,
            is_enum: c.is_enum,
            char_max_length: c.char_max_length,
        })
        .collect();

    let pk_columns = pk.map(|p| p.columns).unwrap_or_default();
    let known: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    for pk_col in &pk_columns {
        if !known.contains(pk_col.as_str()) {
            return Err(format!("primary-key column '{pk_col}' not among table columns"));
        }
    }

    Ok(TableDescriptor {
        schema: schema.to_string(),
        name: table.to_string(),
        is_view: matches!(relkind, "v" | "m"),
        columns,
        pk_columns,
        foreign_keys: fks
            .into_iter()
            .map(|fk| ForeignKeyRef {
                name: fk.name,
                columns: fk.columns,
                referenced_schema: fk.referenced_schema,
                referenced_table: fk.referenced_table,
                referenced_columns: fk.referenced_columns,
            })
            .collect(),
    })
}

/// Keep enums that live in a selected schema, plus enums referenced
/// cross-schema by a selected column.
fn select_enums(
    raw: Vec<RawEnumType>,
    schemas: &[String],
    catalog: &SchemaCatalog,
) -> Vec<EnumDescriptor> {
    let selected: HashSet<&str> = schemas.iter().map(String::as_str).collect();
    let referenced: HashSet<(String, String)> = catalog
        .tables()
        .flat_map(|t| t.columns.iter())
        .filter(|c| c.is_enum)
        .map(|c| (c.udt_schema.clone(), c.udt_name.clone()))
        .collect();

    raw.into_iter()
        .filter(|e| {
            selected.contains(e.schema.as_str())
                || referenced.contains(&(e.schema.clone(), e.name.clone()))
        })
        .map(|e| EnumDescriptor {
            schema: e.schema,
            name: e.name,
            labels: e.labels,
        })
        .collect()
}
