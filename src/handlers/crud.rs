//! Table CRUD handlers: create, read-one, read-many, update, delete.
//! Each handler is bound to one table at route-generation time; it resolves
//! the table's current binding from the snapshot, validates the request
//! fully before touching the database, then runs one transaction.

use crate::error::Error;
use crate::model::{FieldSpec, SemanticType};
use crate::service::{CrudService, PayloadValidator};
use crate::sql::SortDir;
use crate::state::{AppState, PkSpec, TableBinding, TableKey};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn binding(state: &AppState, key: &TableKey) -> Result<Arc<TableBinding>, Error> {
    state
        .snapshot()
        .binding(key)
        .ok_or_else(|| Error::NotFound(format!("{}.{}", key.0, key.1)))
}

fn object_body(value: Value) -> Result<Map<String, Value>, Error> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(Error::BadRequest("body must be a JSON object".into())),
    }
}

/// Parse a path id according to the primary key's semantic type.
fn parse_id(id_str: &str, pk: &PkSpec) -> Result<Value, Error> {
    Ok(match &pk.semantic {
        SemanticType::Integer => {
            let n: i64 = id_str
                .parse()
                .map_err(|_| Error::BadRequest(format!("invalid id '{id_str}'")))?;
            Value::Number(n.into())
        }
        SemanticType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str)
                .map_err(|_| Error::BadRequest(format!("invalid uuid '{id_str}'")))?;
            Value::String(u.to_string())
        }
        _ => Value::String(id_str.to_string()),
    })
}

/// Coerce a query-string filter value by the column's semantic type.
fn coerce_filter(f: &FieldSpec, raw: &str) -> Result<Value, Error> {
    match &f.semantic {
        SemanticType::Integer => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| Error::Validation(format!("{} filter must be an integer", f.name))),
        SemanticType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .ok_or_else(|| Error::Validation(format!("{} filter must be a number", f.name))),
        SemanticType::Boolean => match raw {
            _ if raw.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            _ if raw.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(Error::Validation(format!("{} filter must be true or false", f.name))),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

#[derive(Debug)]
struct ListQuery {
    filters: Vec<(String, Value)>,
    sort: Option<String>,
    dir: SortDir,
    limit: Option<u32>,
    offset: Option<u32>,
}

/// Parse read-many query parameters. Unknown filter columns, unknown sort
/// columns and malformed values are rejected, never silently ignored.
fn parse_list_query(
    binding: &TableBinding,
    params: &HashMap<String, String>,
) -> Result<ListQuery, Error> {
    let mut out = ListQuery {
        filters: Vec::new(),
        sort: None,
        dir: SortDir::Asc,
        limit: None,
        offset: None,
    };
    for (k, v) in params {
        match k.as_str() {
            "limit" => {
                out.limit = Some(
                    v.parse()
                        .map_err(|_| Error::Validation(format!("limit must be an integer, got '{v}'")))?,
                );
            }
            "offset" => {
                out.offset = Some(
                    v.parse()
                        .map_err(|_| Error::Validation(format!("offset must be an integer, got '{v}'")))?,
                );
            }
            "sort" => {
                if binding.read.field(v).is_none() {
                    return Err(Error::Validation(format!("unknown sort column '{v}'")));
                }
                out.sort = Some(v.clone());
            }
            "order" => {
                out.dir = match v.as_str() {
                    "asc" => SortDir::Asc,
                    "desc" => SortDir::Desc,
                    other => {
                        return Err(Error::Validation(format!(
                            "order must be 'asc' or 'desc', got '{other}'"
                        )))
                    }
                };
            }
            _ => {
                let Some(field) = binding.read.field(k) else {
                    return Err(Error::Validation(format!("unknown filter column '{k}'")));
                };
                out.filters.push((k.clone(), coerce_filter(field, v)?));
            }
        }
    }
    Ok(out)
}

pub async fn create(
    state: AppState,
    key: TableKey,
    body: Value,
) -> Result<(StatusCode, Json<Value>), Error> {
    let binding = binding(&state, &key)?;
    let body = object_body(body)?;
    PayloadValidator::validate_full(&body, &binding.write)?;
    let row = CrudService::create(&state.pool, &binding.write, &binding.read, &body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn read_one(
    state: AppState,
    key: TableKey,
    id_str: String,
) -> Result<Json<Value>, Error> {
    let binding = binding(&state, &key)?;
    let pk = binding
        .pk
        .as_ref()
        .ok_or_else(|| Error::NotFound(format!("{}.{} has no primary key", key.0, key.1)))?;
    let id = parse_id(&id_str, pk)?;
    let row = CrudService::read_one(&state.pool, &binding.read, &pk.column, &id)
        .await?
        .ok_or(Error::NotFound(id_str))?;
    Ok(Json(row))
}

pub async fn read_many(
    state: AppState,
    key: TableKey,
    params: HashMap<String, String>,
) -> Result<Json<Value>, Error> {
    let binding = binding(&state, &key)?;
    let query = parse_list_query(&binding, &params)?;
    let pk_column = binding.pk.as_ref().map(|p| p.column.as_str());
    let sort = query.sort.as_deref().map(|c| (c, query.dir));
    let rows = CrudService::list(
        &state.pool,
        &binding.read,
        &query.filters,
        sort,
        pk_column,
        query.limit,
        query.offset,
    )
    .await?;
    Ok(Json(Value::Array(rows)))
}

pub async fn update(
    state: AppState,
    key: TableKey,
    id_str: String,
    body: Value,
) -> Result<Json<Value>, Error> {
    let binding = binding(&state, &key)?;
    let pk = binding
        .pk
        .as_ref()
        .ok_or_else(|| Error::NotFound(format!("{}.{} has no primary key", key.0, key.1)))?;
    let id = parse_id(&id_str, pk)?;
    let body = object_body(body)?;
    PayloadValidator::validate_partial(&body, &binding.write)?;
    let row = CrudService::update(&state.pool, &binding.write, &binding.read, &pk.column, &id, &body)
        .await?
        .ok_or(Error::NotFound(id_str))?;
    Ok(Json(row))
}

pub async fn delete(
    state: AppState,
    key: TableKey,
    id_str: String,
) -> Result<Json<Value>, Error> {
    let binding = binding(&state, &key)?;
    let pk = binding
        .pk
        .as_ref()
        .ok_or_else(|| Error::NotFound(format!("{}.{} has no primary key", key.0, key.1)))?;
    let id = parse_id(&id_str, pk)?;
    let removed = CrudService::delete(&state.pool, &binding.read, &pk.column, &id).await?;
    if removed.is_none() {
        return Err(Error::NotFound(id_str));
    }
    Ok(Json(serde_json::json!({ "deleted": 1 })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldRules, SynthesisMode, SynthesizedModel};
    use crate::catalog::TableDescriptor;

    fn spec(name: &str, semantic: SemanticType) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            udt: String::new(),
            nullable: true,
            has_default: false,
            server_generated: false,
            rules: FieldRules::default(),
            semantic,
        }
    }

    fn test_binding() -> TableBinding {
        let read = SynthesizedModel {
            schema: "pharma".into(),
            table: "drug".into(),
            mode: SynthesisMode::Read,
            fields: vec![
                spec("id", SemanticType::Integer),
                spec("name", SemanticType::Text),
                spec("in_stock", SemanticType::Boolean),
            ],
        };
        TableBinding {
            table: TableDescriptor {
                schema: "pharma".into(),
                name: "drug".into(),
                is_view: false,
                columns: Vec::new(),
                pk_columns: vec!["id".into()],
                foreign_keys: Vec::new(),
            },
            write: read.clone(),
            pk: Some(PkSpec {
                column: "id".into(),
                semantic: SemanticType::Integer,
            }),
            read,
        }
    }

    #[test]
    fn unknown_filter_column_is_rejected() {
        let params = HashMap::from([("potency".to_string(), "9".to_string())]);
        let err = parse_list_query(&test_binding(), &params).unwrap_err();
        assert!(matches!(err, Error::Validation(m) if m.contains("unknown filter column")));
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        let params = HashMap::from([("sort".to_string(), "potency".to_string())]);
        let err = parse_list_query(&test_binding(), &params).unwrap_err();
        assert!(matches!(err, Error::Validation(m) if m.contains("unknown sort column")));
    }

    #[test]
    fn malformed_limit_and_order_are_rejected() {
        let params = HashMap::from([("limit".to_string(), "abc".to_string())]);
        assert!(parse_list_query(&test_binding(), &params).is_err());
        let params = HashMap::from([("order".to_string(), "sideways".to_string())]);
        assert!(parse_list_query(&test_binding(), &params).is_err());
    }

    #[test]
    fn filters_coerce_by_semantic_type() {
        let params = HashMap::from([
            ("id".to_string(), "7".to_string()),
            ("in_stock".to_string(), "true".to_string()),
        ]);
        let query = parse_list_query(&test_binding(), &params).unwrap();
        let by_name: HashMap<_, _> = query.filters.iter().cloned().collect();
        assert_eq!(by_name["id"], serde_json::json!(7));
        assert_eq!(by_name["in_stock"], Value::Bool(true));
    }

    #[test]
    fn integer_ids_parse_and_reject_garbage() {
        let pk = PkSpec {
            column: "id".into(),
            semantic: SemanticType::Integer,
        };
        assert_eq!(parse_id("12", &pk).unwrap(), serde_json::json!(12));
        assert!(matches!(parse_id("abc", &pk), Err(Error::BadRequest(_))));
    }
}
