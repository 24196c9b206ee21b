//! Payload validation against synthesized model rules. Each semantic
//! variant has exactly one shape check; rule violations surface as
//! `Error::Validation` and are never retried.

use crate::error::Error;
use crate::model::{FieldSpec, SemanticType, SynthesizedModel};
use serde_json::{Map, Value};

pub struct PayloadValidator;

impl PayloadValidator {
    /// Validate a creation payload: unknown fields rejected, required
    /// fields present, every supplied value checked against its rule.
    pub fn validate_full(body: &Map<String, Value>, model: &SynthesizedModel) -> Result<(), Error> {
        reject_unknown_fields(body, model)?;
        for f in &model.fields {
            let val = body.get(&f.name);
            if f.rules.required && matches!(val, None | Some(Value::Null)) {
                return Err(Error::Validation(format!("{} is required", f.name)));
            }
            if let Some(v) = val {
                check_field(f, v)?;
            }
        }
        Ok(())
    }

    /// Validate a partial update: only the supplied fields are checked;
    /// required is not enforced for missing fields.
    pub fn validate_partial(body: &Map<String, Value>, model: &SynthesizedModel) -> Result<(), Error> {
        reject_unknown_fields(body, model)?;
        for (name, v) in body {
            if let Some(f) = model.field(name) {
                check_field(f, v)?;
            }
        }
        Ok(())
    }
}

fn reject_unknown_fields(body: &Map<String, Value>, model: &SynthesizedModel) -> Result<(), Error> {
    for key in body.keys() {
        if model.field(key).is_none() {
            return Err(Error::Validation(format!(
                "unknown field '{}' for {}.{}",
                key, model.schema, model.table
            )));
        }
    }
    Ok(())
}

fn check_field(f: &FieldSpec, v: &Value) -> Result<(), Error> {
    if v.is_null() {
        if f.nullable {
            return Ok(());
        }
        return Err(Error::Validation(format!("{} must not be null", f.name)));
    }
    match &f.semantic {
        SemanticType::Integer => {
            if v.as_i64().is_none() {
                return Err(Error::Validation(format!("{} must be an integer", f.name)));
            }
        }
        SemanticType::Float => {
            if !v.is_number() {
                return Err(Error::Validation(format!("{} must be a number", f.name)));
            }
        }
        SemanticType::Numeric => {
            let ok = v.is_number() || v.as_str().map(|s| s.parse::<f64>().is_ok()).unwrap_or(false);
            if !ok {
                return Err(Error::Validation(format!("{} must be numeric", f.name)));
            }
        }
        SemanticType::Text | SemanticType::Opaque => {
            let Some(s) = v.as_str() else {
                return Err(Error::Validation(format!("{} must be a string", f.name)));
            };
            if let Some(max) = f.rules.max_length {
                if s.chars().count() > max as usize {
                    return Err(Error::Validation(format!(
                        "{} must be at most {} characters",
                        f.name, max
                    )));
                }
            }
        }
        SemanticType::Boolean => {
            if !v.is_boolean() {
                return Err(Error::Validation(format!("{} must be a boolean", f.name)));
            }
        }
        SemanticType::Timestamp => {
            let ok = v.as_str().map(is_timestamp).unwrap_or(false);
            if !ok {
                return Err(Error::Validation(format!("{} must be a timestamp", f.name)));
            }
        }
        SemanticType::Date => {
            let ok = v
                .as_str()
                .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .unwrap_or(false);
            if !ok {
                return Err(Error::Validation(format!("{} must be a date (YYYY-MM-DD)", f.name)));
            }
        }
        SemanticType::Uuid => {
            let ok = v
                .as_str()
                .map(|s| uuid::Uuid::parse_str(s).is_ok())
                .unwrap_or(false);
            if !ok {
                return Err(Error::Validation(format!("{} must be a UUID", f.name)));
            }
        }
        SemanticType::Json => {}
        SemanticType::EnumRef { .. } => {
            let Some(s) = v.as_str() else {
                return Err(Error::Validation(format!("{} must be a string", f.name)));
            };
            if let Some(allowed) = &f.rules.allowed {
                if !allowed.iter().any(|a| a == s) {
                    return Err(Error::Validation(format!(
                        "{} must be one of: {:?}",
                        f.name,
                        allowed.iter().take(5).collect::<Vec<_>>()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn is_timestamp(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}
