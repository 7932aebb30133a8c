//! Collection envelopes: `{"<collection>": [record, ...]}` and `{"ids": [...]}`.
//!
//! Decoding normalizes each record against the resource's columns so that the
//! echoed response and the persisted row see the same values.

use crate::config::{ColumnInfo, ColumnType, ResourceDescriptor};
use crate::error::AppError;
use crate::sql::params::parse_timestamp;
use serde::Serialize;
use serde_json::{Map, Value};

/// One row of a resource, keyed by wire field name in column order.
pub type Record = Map<String, Value>;

/// Wire value of the zero timestamp.
pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00Z";

/// Identifier set carried by a DELETE body and echoed back.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IdList {
    pub ids: Vec<Value>,
}

pub fn zero_value(ty: ColumnType) -> Value {
    match ty {
        ColumnType::Int => Value::from(0),
        ColumnType::Text => Value::String(String::new()),
        ColumnType::Bool => Value::Bool(false),
        ColumnType::Timestamp => Value::String(ZERO_TIMESTAMP.into()),
    }
}

/// Whether a value counts as "not supplied" for a required check.
pub fn is_zero(v: &Value, ty: ColumnType) -> bool {
    match (v, ty) {
        (Value::Null, _) => true,
        (Value::Number(n), ColumnType::Int) => n.as_i64() == Some(0),
        (Value::String(s), ColumnType::Text) => s.is_empty(),
        (Value::Bool(b), ColumnType::Bool) => !*b,
        (Value::String(s), ColumnType::Timestamp) => s == ZERO_TIMESTAMP,
        _ => false,
    }
}

fn check_type(v: Value, col: &ColumnInfo) -> Result<Value, String> {
    let ok = match (&v, col.ty) {
        (Value::Null, _) => true,
        (Value::Number(n), ColumnType::Int) => n.as_i64().is_some(),
        (Value::String(_), ColumnType::Text) => true,
        (Value::Bool(_), ColumnType::Bool) => true,
        (Value::String(s), ColumnType::Timestamp) => parse_timestamp(s).is_some(),
        _ => false,
    };
    if ok {
        Ok(v)
    } else {
        Err(format!("{}: expected {}, got {}", col.json_name, col.ty.as_str(), v))
    }
}

fn take_field(obj: &mut Map<String, Value>, name: &str) -> Option<Value> {
    if let Some(v) = obj.remove(name) {
        return Some(v);
    }
    let folded = obj.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()?;
    obj.remove(&folded)
}

/// Shape one decoded JSON object into a record: every column present, typed, unknown fields dropped.
pub fn normalize_record(entity: &ResourceDescriptor, mut obj: Map<String, Value>) -> Result<Record, String> {
    let mut record = Record::new();
    for col in &entity.columns {
        let v = match take_field(&mut obj, &col.json_name) {
            Some(v) => check_type(v, col)?,
            None => Value::Null,
        };
        let v = if v.is_null() && !col.nullable && !col.has_default {
            zero_value(col.ty)
        } else {
            v
        };
        record.insert(col.json_name.clone(), v);
    }
    Ok(record)
}

fn parse_object(body: &[u8]) -> Result<Option<Map<String, Value>>, AppError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON: {}", e)))?;
    match value {
        Value::Object(m) => Ok(Some(m)),
        Value::Null => Ok(None),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Decode `{"<collection>": [...]}`. An absent or null collection decodes as empty.
pub fn decode_envelope(entity: &ResourceDescriptor, body: &[u8]) -> Result<Vec<Record>, AppError> {
    let Some(mut obj) = parse_object(body)? else {
        return Ok(Vec::new());
    };
    let items = match take_field(&mut obj, &entity.collection) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(AppError::BadRequest(format!("{} must be an array", entity.collection)));
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(m) => normalize_record(entity, m)
                .map_err(|e| AppError::BadRequest(format!("{}[{}].{}", entity.collection, i, e))),
            _ => Err(AppError::BadRequest(format!("{}[{}] must be an object", entity.collection, i))),
        })
        .collect()
}

pub fn encode_envelope(entity: &ResourceDescriptor, records: &[Record]) -> Result<Vec<u8>, AppError> {
    let mut body = Map::new();
    body.insert(
        entity.collection.clone(),
        Value::Array(records.iter().cloned().map(Value::Object).collect()),
    );
    serde_json::to_vec(&body).map_err(|e| AppError::Serialization(e.to_string()))
}

/// Decode `{"ids": [...]}`, each id typed by the lookup column. An absent or null list is empty.
pub fn decode_ids(entity: &ResourceDescriptor, body: &[u8]) -> Result<IdList, AppError> {
    let Some(mut obj) = parse_object(body)? else {
        return Ok(IdList::default());
    };
    let raw = match take_field(&mut obj, "ids") {
        None | Some(Value::Null) => return Ok(IdList::default()),
        Some(Value::Array(ids)) => ids,
        Some(_) => return Err(AppError::BadRequest("ids must be an array".into())),
    };
    let key = entity.key_column();
    let ids = raw
        .into_iter()
        .enumerate()
        .map(|(i, id)| match check_type(id, key) {
            Ok(Value::Null) => Err(AppError::BadRequest(format!("ids[{}] must not be null", i))),
            Ok(v) => Ok(v),
            Err(e) => Err(AppError::BadRequest(format!("ids[{}]: {}", i, e))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(IdList { ids })
}

pub fn encode_ids(ids: &IdList) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(ids).map_err(|e| AppError::Serialization(e.to_string()))
}
