//! Convert wire values into types sqlx can bind, typed by the target column.

use crate::config::{ColumnInfo, ColumnType};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    /// Typed NULL so the server still sees the column's parameter type.
    Null(ColumnType),
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl BindValue {
    pub fn from_json(v: &Value, col: &ColumnInfo) -> Result<Self, AppError> {
        let mismatch = || {
            AppError::DataAccess(format!(
                "{}: expected {}, got {}",
                col.name,
                col.ty.as_str(),
                v
            ))
        };
        if v.is_null() {
            return Ok(BindValue::Null(col.ty));
        }
        Ok(match col.ty {
            ColumnType::Int => BindValue::Int(v.as_i64().ok_or_else(mismatch)?),
            ColumnType::Text => BindValue::Text(v.as_str().ok_or_else(mismatch)?.to_string()),
            ColumnType::Bool => BindValue::Bool(v.as_bool().ok_or_else(mismatch)?),
            ColumnType::Timestamp => {
                let s = v.as_str().ok_or_else(mismatch)?;
                BindValue::Timestamp(parse_timestamp(s).ok_or_else(mismatch)?)
            }
        })
    }

    /// Identifier taken from a query string, coerced to the lookup column's type.
    pub fn from_query_str(s: &str, col: &ColumnInfo) -> Result<Self, AppError> {
        let invalid = || {
            AppError::DataAccess(format!(
                "invalid input for {} column {}: '{}'",
                col.ty.as_str(),
                col.name,
                s
            ))
        };
        Ok(match col.ty {
            ColumnType::Int => BindValue::Int(s.trim().parse().map_err(|_| invalid())?),
            ColumnType::Text => BindValue::Text(s.to_string()),
            ColumnType::Bool => BindValue::Bool(s.trim().parse().map_err(|_| invalid())?),
            ColumnType::Timestamp => BindValue::Timestamp(parse_timestamp(s).ok_or_else(invalid)?),
        })
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn type_info_for(ty: ColumnType) -> PgTypeInfo {
    match ty {
        ColumnType::Int => <i64 as Type<Postgres>>::type_info(),
        ColumnType::Text => <String as Type<Postgres>>::type_info(),
        ColumnType::Bool => <bool as Type<Postgres>>::type_info(),
        ColumnType::Timestamp => <DateTime<Utc> as Type<Postgres>>::type_info(),
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            BindValue::Null(_) => Ok(IsNull::Yes),
            BindValue::Int(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            BindValue::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            BindValue::Null(ty) => type_info_for(*ty),
            BindValue::Int(_) => type_info_for(ColumnType::Int),
            BindValue::Text(_) => type_info_for(ColumnType::Text),
            BindValue::Bool(_) => type_info_for(ColumnType::Bool),
            BindValue::Timestamp(_) => type_info_for(ColumnType::Timestamp),
        })
    }
}

impl Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationRule;
    use serde_json::json;

    fn col(ty: ColumnType) -> ColumnInfo {
        ColumnInfo {
            name: "entry_id".into(),
            json_name: "entry_id".into(),
            ty,
            nullable: true,
            generated: false,
            has_default: false,
            validation: ValidationRule::default(),
            pattern: None,
        }
    }

    #[test]
    fn json_values_follow_column_type() {
        assert_eq!(BindValue::from_json(&json!(5), &col(ColumnType::Int)).unwrap(), BindValue::Int(5));
        assert_eq!(
            BindValue::from_json(&json!(null), &col(ColumnType::Int)).unwrap(),
            BindValue::Null(ColumnType::Int)
        );
        assert!(BindValue::from_json(&json!("5"), &col(ColumnType::Int)).is_err());
        let ts = BindValue::from_json(&json!("2024-01-02T03:04:05Z"), &col(ColumnType::Timestamp)).unwrap();
        assert!(matches!(ts, BindValue::Timestamp(_)));
    }

    #[test]
    fn malformed_identifier_is_data_access_error() {
        let err = BindValue::from_query_str("abc", &col(ColumnType::Int)).unwrap_err();
        assert!(matches!(err, AppError::DataAccess(_)));
        assert_eq!(BindValue::from_query_str(" 7", &col(ColumnType::Int)).unwrap(), BindValue::Int(7));
    }
}
