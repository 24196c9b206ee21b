//! In-memory description of the introspected database. Built once per
//! introspection pass, immutable afterwards, shared read-only by the model
//! synthesizer and the metadata/enum routers.

use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize)]
pub struct SchemaCatalog {
    /// Schemas in the configured selection order.
    pub schemas: Vec<SchemaDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    /// Tables skipped during introspection, with the reason. Partial success
    /// is acceptable; nothing is silently dropped.
    pub degraded: Vec<DegradedTable>,
}

impl SchemaCatalog {
    pub fn schema(&self, name: &str) -> Option<&SchemaDescriptor> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// All tables and views across schemas, in catalog order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.schemas.iter().flat_map(|s| s.tables.iter())
    }

    pub fn enum_labels(&self, schema: &str, name: &str) -> Option<&[String]> {
        self.enums
            .iter()
            .find(|e| e.schema == schema && e.name == name)
            .map(|e| e.labels.as_slice())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub tables: Vec<TableDescriptor>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    /// Views (and materialized views) are read-only: no mutation routes are
    /// generated for them.
    pub is_view: bool,
    pub columns: Vec<ColumnDescriptor>,
    pub pk_columns: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Formatted type, e.g. `character varying(120)`.
    pub data_type: String,
    pub udt_schema: String,
    /// Underlying type name, e.g. `int4`, `varchar`, or a custom enum name.
    pub udt_name: String,
    pub nullable: bool,
    /// Default expression when present, e.g. `nextval('drug_id_seq'::regclass)`.
    pub default: Option<String>,
    pub is_identity: bool,
    pub is_enum: bool,
    pub char_max_length: Option<i32>,
}

impl ColumnDescriptor {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Identity columns and sequence-backed defaults (serial/bigserial) are
    /// assigned by the server and excluded from mutation payloads.
    pub fn is_server_generated(&self) -> bool {
        self.is_identity
            || self
                .default
                .as_deref()
                .map(|d| d.starts_with("nextval("))
                .unwrap_or(false)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ForeignKeyRef {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnumDescriptor {
    pub schema: String,
    pub name: String,
    /// Allowed labels in declaration order.
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DegradedTable {
    pub schema: String,
    pub table: String,
    pub reason: String,
}
