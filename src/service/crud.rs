//! Collection-resource engine: identifier-scoped reads and deletes, per-item batch writes.

use crate::config::{ColumnInfo, ResourceDescriptor};
use crate::envelope::Record;
use crate::error::AppError;
use crate::service::executor::QueryExecutor;
use crate::sql::{insert, update, BindValue, Dialect, QueryBuf, QueryTemplate};
use serde_json::Value;

type BuildStatement = fn(&ResourceDescriptor, &Record, &dyn Dialect) -> Result<QueryBuf, AppError>;

pub struct CrudService;

impl CrudService {
    /// Rows matching the identifier set; all rows when it is empty. Ordered by the lookup key.
    pub async fn list<E>(db: &mut E, entity: &ResourceDescriptor, ids: &[BindValue]) -> Result<Vec<Record>, AppError>
    where
        E: QueryExecutor + ?Sized,
    {
        let Some(q) = QueryTemplate::select(entity).resolve(ids, db.dialect())? else {
            return Ok(Vec::new());
        };
        db.fetch_all(entity, &q).await
    }

    /// Insert each record with its own statement.
    pub async fn create_batch<E>(db: &mut E, entity: &ResourceDescriptor, records: &[Record]) -> Result<u64, AppError>
    where
        E: QueryExecutor + ?Sized,
    {
        Self::persist_batch(db, entity, records, insert, "insert").await
    }

    /// Update each record matched by its lookup key. A record matching no row is not an error.
    pub async fn update_batch<E>(db: &mut E, entity: &ResourceDescriptor, records: &[Record]) -> Result<u64, AppError>
    where
        E: QueryExecutor + ?Sized,
    {
        Self::persist_batch(db, entity, records, update, "update").await
    }

    /// Delete rows matching the identifier set. An empty set deletes nothing and skips the database.
    pub async fn delete<E>(db: &mut E, entity: &ResourceDescriptor, ids: &[BindValue]) -> Result<u64, AppError>
    where
        E: QueryExecutor + ?Sized,
    {
        let Some(q) = QueryTemplate::delete(entity).resolve(ids, db.dialect())? else {
            return Ok(0);
        };
        db.execute(&q).await
    }

    /// One statement per record, in order, no transaction. The first failure aborts the rest;
    /// records before it stay applied.
    async fn persist_batch<E>(
        db: &mut E,
        entity: &ResourceDescriptor,
        records: &[Record],
        build: BuildStatement,
        op: &'static str,
    ) -> Result<u64, AppError>
    where
        E: QueryExecutor + ?Sized,
    {
        let mut affected = 0;
        for (i, record) in records.iter().enumerate() {
            let built = build(entity, record, db.dialect());
            let result = match built {
                Ok(q) => db.execute(&q).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(n) => affected += n,
                Err(e) => {
                    tracing::error!(resource = %entity.name, op, item = i, error = %e, "batch write failed");
                    return Err(e.at_item(&entity.collection, i));
                }
            }
        }
        tracing::debug!(resource = %entity.name, op, items = records.len(), affected, "batch applied");
        Ok(affected)
    }
}

/// Coerce raw identifier strings (query string values) to the lookup column's type.
pub fn parse_identifiers(key: &ColumnInfo, raw: &[String]) -> Result<Vec<BindValue>, AppError> {
    raw.iter().map(|s| BindValue::from_query_str(s, key)).collect()
}

/// Bind values for identifiers already typed by the envelope codec.
pub fn bind_identifiers(key: &ColumnInfo, ids: &[Value]) -> Result<Vec<BindValue>, AppError> {
    ids.iter().map(|v| BindValue::from_json(v, key)).collect()
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingExecutor;
    use super::*;
    use crate::config::{builtin_catalog, resolve, ResourceRegistry};
    use crate::envelope::decode_envelope;
    use serde_json::json;

    fn registry() -> ResourceRegistry {
        resolve(&builtin_catalog().unwrap()).unwrap()
    }

    fn bwhs(entity: &ResourceDescriptor, ids: &[i64]) -> Vec<Record> {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| json!({"entry_id": id, "bust": 80, "waist": 60, "hip": 85}))
            .collect();
        decode_envelope(entity, &serde_json::to_vec(&json!({ "bwhs": items })).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn list_shapes_query_by_cardinality() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let mut db = RecordingExecutor::default();

        CrudService::list(&mut db, bwh, &[]).await.unwrap();
        CrudService::list(&mut db, bwh, &[BindValue::Int(5)]).await.unwrap();
        CrudService::list(&mut db, bwh, &[BindValue::Int(1), BindValue::Int(2), BindValue::Int(3)])
            .await
            .unwrap();

        assert!(!db.statements[0].sql.contains("WHERE"));
        assert!(db.statements[1].sql.contains("WHERE \"entry_id\" = $1"));
        assert!(db.statements[2].sql.contains("WHERE \"entry_id\" IN ($1, $2, $3)"));
        assert_eq!(db.statements[2].params.len(), 3);
    }

    #[tokio::test]
    async fn create_batch_writes_one_statement_per_item() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let mut db = RecordingExecutor::default();
        let affected = CrudService::create_batch(&mut db, bwh, &bwhs(bwh, &[1, 2, 3])).await.unwrap();
        assert_eq!(affected, 3);
        assert_eq!(db.statements.len(), 3);
        assert!(db.statements.iter().all(|q| q.sql.starts_with("INSERT INTO \"bwh\"")));
        assert_eq!(db.statements[2].params[0], BindValue::Int(3));
    }

    #[tokio::test]
    async fn batch_stops_at_first_failure() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let mut db = RecordingExecutor {
            fail_on_execute: Some(1),
            ..Default::default()
        };
        let err = CrudService::create_batch(&mut db, bwh, &bwhs(bwh, &[1, 2, 3])).await.unwrap_err();
        assert!(err.to_string().contains("bwhs[1]"));
        // first item applied, third never attempted
        assert_eq!(db.statements.len(), 1);
    }

    #[tokio::test]
    async fn update_batch_is_repeatable() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let batch = bwhs(bwh, &[4]);
        let mut db = RecordingExecutor::default();
        CrudService::update_batch(&mut db, bwh, &batch).await.unwrap();
        CrudService::update_batch(&mut db, bwh, &batch).await.unwrap();
        assert_eq!(db.statements[0], db.statements[1]);
        assert!(db.statements[0].sql.ends_with("WHERE \"entry_id\" = $6"));
    }

    #[tokio::test]
    async fn delete_with_no_ids_skips_database() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let mut db = RecordingExecutor::default();
        assert_eq!(CrudService::delete(&mut db, bwh, &[]).await.unwrap(), 0);
        assert!(db.statements.is_empty());

        CrudService::delete(&mut db, bwh, &[BindValue::Int(7)]).await.unwrap();
        assert_eq!(db.statements[0].sql, "DELETE FROM \"bwh\" WHERE \"entry_id\" = $1");
        assert_eq!(db.statements[0].params, vec![BindValue::Int(7)]);
    }

    #[test]
    fn identifiers_are_coerced_to_key_type() {
        let reg = registry();
        let key = reg.by_name("link").unwrap().key_column();
        assert_eq!(
            parse_identifiers(key, &["1".into(), "2".into()]).unwrap(),
            vec![BindValue::Int(1), BindValue::Int(2)]
        );
        assert!(matches!(parse_identifiers(key, &["x".into()]), Err(AppError::DataAccess(_))));
        assert_eq!(bind_identifiers(key, &[json!(9)]).unwrap(), vec![BindValue::Int(9)]);
    }
}
