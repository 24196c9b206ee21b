//! Table descriptor -> synthesized model. Unknown column types degrade to
//! an opaque text field (logged) instead of failing the whole table.

use crate::catalog::{ColumnDescriptor, SchemaCatalog, TableDescriptor};
use crate::error::Error;
use crate::model::types::{FieldRules, FieldSpec, SemanticType, SynthesisMode, SynthesizedModel};

/// Map an underlying Postgres type to its semantic variant. Fails with
/// `Error::TypeMapping` for types outside the closed set; callers decide the
/// fallback policy.
pub fn semantic_type(column: &ColumnDescriptor) -> Result<SemanticType, Error> {
    if column.is_enum {
        return Ok(SemanticType::EnumRef {
            schema: column.udt_schema.clone(),
            name: column.udt_name.clone(),
        });
    }
    match column.udt_name.as_str() {
        "int2" | "int4" | "int8" => Ok(SemanticType::Integer),
        "float4" | "float8" => Ok(SemanticType::Float),
        "numeric" => Ok(SemanticType::Numeric),
        "text" | "varchar" | "bpchar" | "name" => Ok(SemanticType::Text),
        "bool" => Ok(SemanticType::Boolean),
        "timestamp" | "timestamptz" => Ok(SemanticType::Timestamp),
        "date" => Ok(SemanticType::Date),
        "uuid" => Ok(SemanticType::Uuid),
        "json" | "jsonb" => Ok(SemanticType::Json),
        other => Err(Error::TypeMapping(other.to_string())),
    }
}

fn semantic_or_opaque(table: &TableDescriptor, column: &ColumnDescriptor) -> SemanticType {
    match semantic_type(column) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(
                schema = %table.schema,
                table = %table.name,
                column = %column.name,
                cause = %e,
                "falling back to opaque text representation"
            );
            SemanticType::Opaque
        }
    }
}

/// Synthesize the model for one table in the given mode. Write mode drops
/// server-generated columns (identity, sequence-backed defaults) so clients
/// never supply them; read mode keeps every column for serialization.
pub fn synthesize(
    table: &TableDescriptor,
    catalog: &SchemaCatalog,
    mode: SynthesisMode,
) -> SynthesizedModel {
    let fields = table
        .columns
        .iter()
        .filter(|c| mode == SynthesisMode::Read || !c.is_server_generated())
        .map(|c| {
            let semantic = semantic_or_opaque(table, c);
            let allowed = match &semantic {
                SemanticType::EnumRef { schema, name } => catalog
                    .enum_labels(schema, name)
                    .map(|labels| labels.to_vec()),
                _ => None,
            };
            FieldSpec {
                name: c.name.clone(),
                udt: c.udt_name.clone(),
                nullable: c.nullable,
                has_default: c.has_default(),
                server_generated: c.is_server_generated(),
                rules: FieldRules {
                    required: mode == SynthesisMode::Write && !c.nullable && !c.has_default(),
                    max_length: c.char_max_length,
                    allowed,
                },
                semantic,
            }
        })
        .collect();

    SynthesizedModel {
        schema: table.schema.clone(),
        table: table.name.clone(),
        mode,
        fields,
    }
}
