//! Convert `serde_json::Value` into parameters sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// One bound query parameter. Strings stay text; the SQL builder adds a
/// cast (`$n::timestamptz`, `$n::uuid`, enum types) where the column needs
/// a non-text type.
#[derive(Clone, Debug)]
pub enum SqlParam {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Json(Value),
}

impl SqlParam {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlParam::I64(i)
                } else {
                    SqlParam::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SqlParam::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlParam::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for SqlParam {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqlParam::Null => IsNull::Yes,
            SqlParam::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            SqlParam::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlParam::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlParam::Text(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            SqlParam::Json(v) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            SqlParam::Null | SqlParam::Text(_) => PgTypeInfo::with_name("TEXT"),
            SqlParam::Bool(_) => PgTypeInfo::with_name("BOOL"),
            SqlParam::I64(_) => PgTypeInfo::with_name("INT8"),
            SqlParam::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            SqlParam::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for SqlParam {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_pick_the_matching_variant() {
        assert!(matches!(SqlParam::from_json(&Value::Null), SqlParam::Null));
        assert!(matches!(SqlParam::from_json(&json!(true)), SqlParam::Bool(true)));
        assert!(matches!(SqlParam::from_json(&json!(42)), SqlParam::I64(42)));
        assert!(matches!(SqlParam::from_json(&json!(1.5)), SqlParam::F64(_)));
        assert!(matches!(SqlParam::from_json(&json!("x")), SqlParam::Text(_)));
        assert!(matches!(SqlParam::from_json(&json!({"a": 1})), SqlParam::Json(_)));
    }
}
