//! Synthesized record shapes. One model per table and mode, built at
//! startup and cached in the state snapshot until re-introspection.

/// Closed set of semantic column types. Each variant carries exactly one
/// validation rule and one serialization rule; database type names that map
/// to none of them fall back to `Opaque` (text) rather than failing lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Float,
    /// Arbitrary-precision numeric, carried as a string over the wire.
    Numeric,
    Text,
    Boolean,
    Timestamp,
    Date,
    Uuid,
    Json,
    /// Reference to a database-defined enumerated type.
    EnumRef { schema: String, name: String },
    /// Unknown underlying type, treated as text end to end.
    Opaque,
}

impl SemanticType {
    /// Postgres type to cast bound parameters to, for variants bound as
    /// text. `None` means the native binary binding is already correct.
    pub fn pg_cast(&self) -> Option<String> {
        match self {
            SemanticType::Numeric => Some("numeric".into()),
            SemanticType::Timestamp => Some("timestamptz".into()),
            SemanticType::Date => Some("date".into()),
            SemanticType::Uuid => Some("uuid".into()),
            SemanticType::Json => Some("jsonb".into()),
            SemanticType::EnumRef { schema, name } => Some(format!("{schema}.{name}")),
            _ => None,
        }
    }

    /// Whether the column must be read back as text (`col::text`) so rows
    /// serialize to JSON without a native binding.
    pub fn selects_as_text(&self) -> bool {
        matches!(
            self,
            SemanticType::Numeric | SemanticType::EnumRef { .. } | SemanticType::Opaque
        )
    }
}

/// Per-field validation rules derived from the column definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldRules {
    pub required: bool,
    pub max_length: Option<i32>,
    /// Allowed values, populated for enum-referencing fields.
    pub allowed: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub semantic: SemanticType,
    /// Underlying type name, used to pick the decode width when reading rows.
    pub udt: String,
    pub nullable: bool,
    pub has_default: bool,
    pub server_generated: bool,
    pub rules: FieldRules,
}

impl FieldSpec {
    pub fn pg_cast(&self) -> Option<String> {
        // timestamp-without-timezone columns keep their own cast
        if self.semantic == SemanticType::Timestamp && self.udt == "timestamp" {
            return Some("timestamp".into());
        }
        self.semantic.pg_cast()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Mutation payloads: server-generated columns excluded.
    Write,
    /// Query results: all columns included.
    Read,
}

#[derive(Clone, Debug)]
pub struct SynthesizedModel {
    pub schema: String,
    pub table: String,
    pub mode: SynthesisMode,
    pub fields: Vec<FieldSpec>,
}

impl SynthesizedModel {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
