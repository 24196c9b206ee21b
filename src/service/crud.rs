//! Generic CRUD execution against PostgreSQL. Every operation runs in one
//! transaction per request: the guard commits on success and rolls back on
//! drop, so an aborted request never leaves a partial write pending and the
//! pooled connection is released on every exit path.

use crate::error::Error;
use crate::model::{FieldSpec, SemanticType, SynthesizedModel};
use crate::sql::{self, QueryBuf, SortDir, SqlParam};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

pub struct CrudService;

impl CrudService {
    /// List rows with equality filters (pre-validated), optional sort,
    /// limit (default 100, max 1000) and offset (default 0).
    pub async fn list(
        pool: &PgPool,
        read: &SynthesizedModel,
        filters: &[(String, Value)],
        sort: Option<(&str, SortDir)>,
        pk_column: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = offset.unwrap_or(0);
        let q = sql::select_list(read, filters, sort, pk_column, limit, offset);
        let mut tx = pool.begin().await?;
        let rows = fetch_all(&mut tx, &q).await?;
        tx.commit().await?;
        Ok(rows.iter().map(|r| row_to_json(r, read)).collect())
    }

    /// Fetch one row by primary key.
    pub async fn read_one(
        pool: &PgPool,
        read: &SynthesizedModel,
        pk_column: &str,
        id: &Value,
    ) -> Result<Option<Value>, Error> {
        let q = sql::select_by_pk(read, pk_column, id);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut tx, &q).await?;
        tx.commit().await?;
        Ok(row.map(|r| row_to_json(&r, read)))
    }

    /// Insert one row; returns the created row serialized through the read
    /// model (server-assigned defaults included).
    pub async fn create(
        pool: &PgPool,
        write: &SynthesizedModel,
        read: &SynthesizedModel,
        body: &Map<String, Value>,
    ) -> Result<Value, Error> {
        let q = sql::insert(write, read, body);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut tx, &q).await?;
        tx.commit().await?;
        let row = row.ok_or(Error::Db(sqlx::Error::RowNotFound))?;
        Ok(row_to_json(&row, read))
    }

    /// Partial update by primary key. Returns the updated row, or `None`
    /// when no row matches.
    pub async fn update(
        pool: &PgPool,
        write: &SynthesizedModel,
        read: &SynthesizedModel,
        pk_column: &str,
        id: &Value,
        body: &Map<String, Value>,
    ) -> Result<Option<Value>, Error> {
        let q = sql::update(write, read, pk_column, id, body);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut tx, &q).await?;
        tx.commit().await?;
        Ok(row.map(|r| row_to_json(&r, read)))
    }

    /// Delete by primary key. Returns the removed row, or `None` when no
    /// row matches (so a retry reports not-found again, never another kind).
    pub async fn delete(
        pool: &PgPool,
        read: &SynthesizedModel,
        pk_column: &str,
        id: &Value,
    ) -> Result<Option<Value>, Error> {
        let q = sql::delete(read, pk_column, id);
        let mut tx = pool.begin().await?;
        let row = fetch_optional(&mut tx, &q).await?;
        tx.commit().await?;
        Ok(row.map(|r| row_to_json(&r, read)))
    }
}

async fn fetch_optional(tx: &mut sqlx::PgConnection, q: &QueryBuf) -> Result<Option<PgRow>, Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(SqlParam::from_json(p));
    }
    Ok(query.fetch_optional(&mut *tx).await?)
}

async fn fetch_all(tx: &mut sqlx::PgConnection, q: &QueryBuf) -> Result<Vec<PgRow>, Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(SqlParam::from_json(p));
    }
    Ok(query.fetch_all(&mut *tx).await?)
}

/// Serialize one row through the read model: each semantic variant has
/// exactly one decode rule.
pub fn row_to_json(row: &PgRow, read: &SynthesizedModel) -> Value {
    let mut map = Map::new();
    for f in &read.fields {
        map.insert(f.name.clone(), cell_to_value(row, f));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, f: &FieldSpec) -> Value {
    let name = f.name.as_str();
    let decoded: Result<Option<Value>, sqlx::Error> = match &f.semantic {
        SemanticType::Integer => match f.udt.as_str() {
            "int2" => row
                .try_get::<Option<i16>, _>(name)
                .map(|v| v.map(|n| Value::Number(n.into()))),
            "int4" => row
                .try_get::<Option<i32>, _>(name)
                .map(|v| v.map(|n| Value::Number(n.into()))),
            _ => row
                .try_get::<Option<i64>, _>(name)
                .map(|v| v.map(|n| Value::Number(n.into()))),
        },
        SemanticType::Float => match f.udt.as_str() {
            "float4" => row.try_get::<Option<f32>, _>(name).map(|v| {
                v.and_then(|n| serde_json::Number::from_f64(f64::from(n)).map(Value::Number))
            }),
            _ => row.try_get::<Option<f64>, _>(name).map(|v| {
                v.and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            }),
        },
        SemanticType::Boolean => row
            .try_get::<Option<bool>, _>(name)
            .map(|v| v.map(Value::Bool)),
        SemanticType::Timestamp => match f.udt.as_str() {
            "timestamp" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)
                .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))),
            _ => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)
                .map(|v| v.map(|d| Value::String(d.to_rfc3339()))),
        },
        SemanticType::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(name)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))),
        SemanticType::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(name)
            .map(|v| v.map(|u| Value::String(u.to_string()))),
        SemanticType::Json => row.try_get::<Option<Value>, _>(name),
        // numeric, enum and opaque columns are selected as ::text
        SemanticType::Text
        | SemanticType::Numeric
        | SemanticType::EnumRef { .. }
        | SemanticType::Opaque => row
            .try_get::<Option<String>, _>(name)
            .map(|v| v.map(Value::String)),
    };
    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(e) => {
            tracing::warn!(column = %name, error = %e, "cell decode failed, serializing as null");
            Value::Null
        }
    }
}
