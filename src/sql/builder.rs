//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from synthesized
//! models. Identifiers are quoted; values bind as `$n`, with an explicit
//! Postgres cast where the parameter is carried as text (timestamps, uuids,
//! enums, numerics).

use crate::model::SynthesizedModel;
use serde_json::{Map, Value};

/// Quote an identifier for PostgreSQL (identifiers come from the catalog).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn keyword(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// SELECT list from the read model: enum, numeric and opaque columns are
/// read back as `col::text` so every row serializes to JSON.
fn select_column_list(read: &SynthesizedModel) -> String {
    read.fields
        .iter()
        .map(|f| {
            let q = quoted(&f.name);
            if f.semantic.selects_as_text() {
                format!("{q}::text AS {q}")
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholder(read: &SynthesizedModel, column: &str, n: usize) -> String {
    read.field(column)
        .and_then(|f| f.pg_cast())
        .map(|t| format!("${n}::{t}"))
        .unwrap_or_else(|| format!("${n}"))
}

/// SELECT one row by primary key (single-column keys).
pub fn select_by_pk(read: &SynthesizedModel, pk_column: &str, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&read.schema, &read.table);
    let cols = select_column_list(read);
    let n = q.push_param(id.clone());
    let ph = placeholder(read, pk_column, n);
    q.sql = format!("SELECT {cols} FROM {table} WHERE {} = {ph}", quoted(pk_column));
    q
}

/// SELECT a page of rows: equality filters (pre-validated by the caller),
/// optional sort column/direction, bounded LIMIT/OFFSET. Ordering is the
/// sort column first when given, then the primary key ascending so pages
/// are disjoint and contiguous between unmodified calls.
pub fn select_list(
    read: &SynthesizedModel,
    filters: &[(String, Value)],
    sort: Option<(&str, SortDir)>,
    pk_column: Option<&str>,
    limit: u32,
    offset: u32,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&read.schema, &read.table);

    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if read.field(col).is_none() {
            continue;
        }
        let n = q.push_param(val.clone());
        let ph = placeholder(read, col, n);
        where_parts.push(format!("{} = {ph}", quoted(col)));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let mut order_keys: Vec<String> = Vec::new();
    if let Some((col, dir)) = sort {
        order_keys.push(format!("{} {}", quoted(col), dir.keyword()));
    }
    match pk_column {
        Some(pk) if sort.map(|(c, _)| c != pk).unwrap_or(true) => {
            order_keys.push(quoted(pk));
        }
        // keyless relations (views) still need a stable page order
        None if sort.is_none() => {
            if let Some(first) = read.fields.first() {
                order_keys.push(quoted(&first.name));
            }
        }
        _ => {}
    }
    let order_clause = if order_keys.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", order_keys.join(", "))
    };

    let cols = select_column_list(read);
    q.sql = format!(
        "SELECT {cols} FROM {table}{where_clause}{order_clause} LIMIT {limit} OFFSET {offset}"
    );
    q
}

/// INSERT from the write model: skips fields with a database default when
/// the body omits them (so the default applies); RETURNING the read list.
pub fn insert(write: &SynthesizedModel, read: &SynthesizedModel, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&write.schema, &write.table);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in &write.fields {
        let val = body.get(&f.name).cloned();
        if val.is_none() && f.has_default {
            continue;
        }
        let n = q.push_param(val.unwrap_or(Value::Null));
        let ph = f
            .pg_cast()
            .map(|t| format!("${n}::{t}"))
            .unwrap_or_else(|| format!("${n}"));
        cols.push(quoted(&f.name));
        placeholders.push(ph);
    }
    let returning = select_column_list(read);
    if cols.is_empty() {
        q.sql = format!("INSERT INTO {table} DEFAULT VALUES RETURNING {returning}");
        return q;
    }
    q.sql = format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING {returning}",
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by primary key: SET only the supplied fields (pre-validated).
/// An empty payload degenerates to a SELECT of the current row.
pub fn update(
    write: &SynthesizedModel,
    read: &SynthesizedModel,
    pk_column: &str,
    id: &Value,
    body: &Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&write.schema, &write.table);
    let mut sets = Vec::new();
    for f in &write.fields {
        if f.name == pk_column {
            continue;
        }
        let Some(v) = body.get(&f.name) else { continue };
        let n = q.push_param(v.clone());
        let rhs = f
            .pg_cast()
            .map(|t| format!("${n}::{t}"))
            .unwrap_or_else(|| format!("${n}"));
        sets.push(format!("{} = {rhs}", quoted(&f.name)));
    }
    let returning = select_column_list(read);
    if sets.is_empty() {
        return select_by_pk(read, pk_column, id);
    }
    let id_n = q.push_param(id.clone());
    let id_ph = placeholder(read, pk_column, id_n);
    q.sql = format!(
        "UPDATE {table} SET {} WHERE {} = {id_ph} RETURNING {returning}",
        sets.join(", "),
        quoted(pk_column)
    );
    q
}

/// DELETE by primary key, RETURNING the read list so the caller can tell a
/// removed row from a miss.
pub fn delete(read: &SynthesizedModel, pk_column: &str, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&read.schema, &read.table);
    let returning = select_column_list(read);
    let n = q.push_param(id.clone());
    let ph = placeholder(read, pk_column, n);
    q.sql = format!(
        "DELETE FROM {table} WHERE {} = {ph} RETURNING {returning}",
        quoted(pk_column)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldRules, FieldSpec, SemanticType, SynthesisMode};
    use serde_json::json;

    fn field(name: &str, semantic: SemanticType, udt: &str) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            semantic,
            udt: udt.to_string(),
            nullable: true,
            has_default: false,
            server_generated: false,
            rules: FieldRules::default(),
        }
    }

    fn read_model() -> SynthesizedModel {
        SynthesizedModel {
            schema: "pharma".into(),
            table: "drug".into(),
            mode: SynthesisMode::Read,
            fields: vec![
                field("id", SemanticType::Integer, "int4"),
                field("name", SemanticType::Text, "varchar"),
                field(
                    "type",
                    SemanticType::EnumRef {
                        schema: "pharma".into(),
                        name: "drug_type".into(),
                    },
                    "drug_type",
                ),
            ],
        }
    }

    fn write_model() -> SynthesizedModel {
        let mut m = read_model();
        m.mode = SynthesisMode::Write;
        m.fields.retain(|f| f.name != "id");
        m
    }

    #[test]
    fn select_by_pk_binds_one_param() {
        let q = select_by_pk(&read_model(), "id", &json!(1));
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"type\"::text AS \"type\" FROM \"pharma\".\"drug\" WHERE \"id\" = $1"
        );
        assert_eq!(q.params, vec![json!(1)]);
    }

    #[test]
    fn list_orders_by_pk_and_bounds_page() {
        let q = select_list(&read_model(), &[], None, Some("id"), 100, 0);
        assert!(q.sql.ends_with("ORDER BY \"id\" LIMIT 100 OFFSET 0"), "{}", q.sql);
        assert!(q.params.is_empty());
    }

    #[test]
    fn list_filters_bind_in_order_with_casts() {
        let filters = vec![
            ("type".to_string(), json!("OTC")),
            ("name".to_string(), json!("Aspirin")),
        ];
        let q = select_list(&read_model(), &filters, None, Some("id"), 1, 0);
        assert!(
            q.sql.contains("WHERE \"type\" = $1::pharma.drug_type AND \"name\" = $2"),
            "{}",
            q.sql
        );
        assert_eq!(q.params, vec![json!("OTC"), json!("Aspirin")]);
    }

    #[test]
    fn list_sort_precedes_pk_tie_break() {
        let q = select_list(&read_model(), &[], Some(("name", SortDir::Desc)), Some("id"), 10, 20);
        assert!(
            q.sql.contains("ORDER BY \"name\" DESC, \"id\" LIMIT 10 OFFSET 20"),
            "{}",
            q.sql
        );
    }

    #[test]
    fn insert_skips_defaulted_absent_columns() {
        let mut write = write_model();
        write.fields[1].has_default = true; // type
        let body = json!({"name": "Aspirin"});
        let q = insert(&write, &read_model(), body.as_object().unwrap());
        assert_eq!(
            q.sql,
            "INSERT INTO \"pharma\".\"drug\" (\"name\") VALUES ($1) RETURNING \"id\", \"name\", \"type\"::text AS \"type\""
        );
        assert_eq!(q.params, vec![json!("Aspirin")]);
    }

    #[test]
    fn insert_casts_enum_values() {
        let body = json!({"name": "Aspirin", "type": "OTC"});
        let q = insert(&write_model(), &read_model(), body.as_object().unwrap());
        assert!(q.sql.contains("VALUES ($1, $2::pharma.drug_type)"), "{}", q.sql);
    }

    #[test]
    fn update_sets_only_supplied_fields() {
        let body = json!({"name": "Ibuprofen"});
        let q = update(&write_model(), &read_model(), "id", &json!(7), body.as_object().unwrap());
        assert_eq!(
            q.sql,
            "UPDATE \"pharma\".\"drug\" SET \"name\" = $1 WHERE \"id\" = $2 RETURNING \"id\", \"name\", \"type\"::text AS \"type\""
        );
        assert_eq!(q.params, vec![json!("Ibuprofen"), json!(7)]);
    }

    #[test]
    fn empty_update_degenerates_to_select() {
        let body = json!({});
        let q = update(&write_model(), &read_model(), "id", &json!(7), body.as_object().unwrap());
        assert!(q.sql.starts_with("SELECT"), "{}", q.sql);
        assert_eq!(q.params, vec![json!(7)]);
    }

    #[test]
    fn delete_returns_row_for_miss_detection() {
        let q = delete(&read_model(), "id", &json!(1));
        assert!(q.sql.starts_with("DELETE FROM \"pharma\".\"drug\" WHERE \"id\" = $1 RETURNING"));
        assert_eq!(q.params, vec![json!(1)]);
    }

    #[test]
    fn keyless_view_pages_order_by_first_column() {
        let mut read = read_model();
        read.table = "stock_view".into();
        let q = select_list(&read, &[], None, None, 50, 0);
        assert!(q.sql.contains("ORDER BY \"id\" LIMIT 50"), "{}", q.sql);
    }
}
