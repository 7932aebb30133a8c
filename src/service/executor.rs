//! Database seam: run built statements and decode rows into records.

use crate::config::{ColumnInfo, ColumnType, ResourceDescriptor};
use crate::envelope::Record;
use crate::error::AppError;
use crate::sql::{Dialect, PgDialect, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};

#[async_trait]
pub trait QueryExecutor: Send {
    /// Placeholder syntax statements for this executor are rebound to.
    fn dialect(&self) -> &dyn Dialect;

    async fn fetch_all(&mut self, entity: &ResourceDescriptor, q: &QueryBuf) -> Result<Vec<Record>, AppError>;

    /// Returns rows affected.
    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, AppError>;
}

#[async_trait]
impl QueryExecutor for PgConnection {
    fn dialect(&self) -> &dyn Dialect {
        &PgDialect
    }

    async fn fetch_all(&mut self, entity: &ResourceDescriptor, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&mut *self).await?;
        rows.iter().map(|r| row_to_record(entity, r)).collect()
    }

    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let done = query.execute(&mut *self).await?;
        Ok(done.rows_affected())
    }
}

fn row_to_record(entity: &ResourceDescriptor, row: &PgRow) -> Result<Record, AppError> {
    let mut record = Record::new();
    for col in &entity.columns {
        record.insert(col.json_name.clone(), cell_to_value(entity, row, col)?);
    }
    Ok(record)
}

fn cell_to_value(entity: &ResourceDescriptor, row: &PgRow, col: &ColumnInfo) -> Result<Value, AppError> {
    let name = col.name.as_str();
    match col.ty {
        ColumnType::Int => {
            if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
                return Ok(v.map(Value::from).unwrap_or(Value::Null));
            }
            if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
                return Ok(v.map(Value::from).unwrap_or(Value::Null));
            }
            if let Ok(v) = row.try_get::<Option<i16>, _>(name) {
                return Ok(v.map(Value::from).unwrap_or(Value::Null));
            }
        }
        ColumnType::Text => {
            if let Ok(v) = row.try_get::<Option<String>, _>(name) {
                return Ok(v.map(Value::String).unwrap_or(Value::Null));
            }
        }
        ColumnType::Bool => {
            if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
                return Ok(v.map(Value::Bool).unwrap_or(Value::Null));
            }
        }
        ColumnType::Timestamp => {
            if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(name) {
                return Ok(v.map(timestamp_value).unwrap_or(Value::Null));
            }
            if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(name) {
                return Ok(v.map(|d| timestamp_value(d.and_utc())).unwrap_or(Value::Null));
            }
        }
    }
    Err(AppError::DataAccess(format!(
        "column {}.{} cannot be read as {}",
        entity.table,
        name,
        col.ty.as_str()
    )))
}

pub fn timestamp_value(d: DateTime<Utc>) -> Value {
    Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}
