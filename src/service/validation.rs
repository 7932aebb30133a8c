//! Batch validation from per-column rules, run before any write.

use crate::config::{ColumnInfo, ColumnType, Operation, ResourceDescriptor};
use crate::envelope::{is_zero, Record};
use crate::error::AppError;
use serde_json::Value;

pub struct BatchValidator;

impl BatchValidator {
    /// Envelope must be non-empty; then every record is checked. Stops at the first failure.
    pub fn validate_batch(entity: &ResourceDescriptor, records: &[Record], op: Operation) -> Result<(), AppError> {
        if records.is_empty() {
            return Err(AppError::Validation(format!("{} must not be empty", entity.collection)));
        }
        for (i, record) in records.iter().enumerate() {
            Self::validate_record(entity, record, op).map_err(|e| e.at_item(&entity.collection, i))?;
        }
        Ok(())
    }

    /// Required fields must be non-zero; updates also need the lookup key to match on.
    pub fn validate_record(entity: &ResourceDescriptor, record: &Record, op: Operation) -> Result<(), AppError> {
        let key = entity.key_column();
        for col in &entity.columns {
            let val = record.get(&col.json_name).unwrap_or(&Value::Null);
            let needs_value = col.validation.required || (op == Operation::Update && col.name == key.name);
            if needs_value && is_zero(val, col.ty) {
                return Err(AppError::Validation(format!("{} is required", col.json_name)));
            }
            validate_field(col, val)?;
        }
        Ok(())
    }
}

fn validate_field(col: &ColumnInfo, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let name = &col.json_name;
    let rule = &col.validation;
    if let Some(s) = v.as_str().filter(|_| col.ty == ColumnType::Text) {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    name, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    name, min
                )));
            }
        }
        if let Some(re) = &col.pattern {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", name)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                name,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}
