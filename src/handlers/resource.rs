//! Collection resource handlers: GET, POST, PUT, DELETE on `/api/v1/:resource`.
//!
//! Each handler has one exit path: the first error ends the request and is
//! rendered once by `AppError::into_response`. Everything up to validation
//! runs before a connection is taken from the pool.

use crate::config::{Operation, ResourceDescriptor};
use crate::envelope::{decode_envelope, decode_ids, encode_envelope, encode_ids, IdList, Record};
use crate::error::AppError;
use crate::response::json_ok;
use crate::service::{bind_identifiers, parse_identifiers, BatchValidator, CrudService, QueryExecutor};
use crate::sql::BindValue;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Path, Query, State,
    },
    response::Response,
};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;
type RequestBody = Result<Bytes, BytesRejection>;

fn resource_for<'a>(state: &'a AppState, name: &str, op: Operation) -> Result<&'a ResourceDescriptor, AppError> {
    let entity = state
        .registry
        .by_name(name)
        .ok_or_else(|| AppError::NotFound(format!("resource {}", name)))?;
    if !entity.allows(op) {
        return Err(AppError::MethodNotAllowed);
    }
    Ok(entity)
}

/// Per-request connection; returned to the pool when dropped, whichever way the handler exits.
async fn acquire(state: &AppState) -> Result<PoolConnection<Postgres>, AppError> {
    state
        .pool
        .acquire()
        .await
        .map_err(|e| AppError::DataAccess(format!("acquire connection: {}", e)))
}

fn logged(resource: &str, op: &'static str, e: AppError) -> AppError {
    if e.status().is_server_error() {
        tracing::error!(resource, op, error = %e, "request failed");
    } else {
        tracing::warn!(resource, op, error = %e, "request rejected");
    }
    e
}

/// GET: `?<key>=<id>` repeated zero, one or many times.
pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: QueryPairs,
) -> Result<Response, AppError> {
    list_request(&state, &resource, query)
        .await
        .map(json_ok)
        .map_err(|e| logged(&resource, "select", e))
}

async fn list_request(state: &AppState, resource: &str, query: QueryPairs) -> Result<Vec<u8>, AppError> {
    let entity = resource_for(state, resource, Operation::Read)?;
    let Query(params) = query?;
    let ids = lookup_ids(entity, params)?;
    let mut conn = acquire(state).await?;
    list_rows(&mut *conn, entity, &ids).await
}

/// Identifier values for the lookup column; other query parameters are ignored.
fn lookup_ids(entity: &ResourceDescriptor, params: Vec<(String, String)>) -> Result<Vec<BindValue>, AppError> {
    let key = entity.key_column();
    let raw: Vec<String> = params
        .into_iter()
        .filter(|(k, _)| *k == key.name)
        .map(|(_, v)| v)
        .collect();
    parse_identifiers(key, &raw)
}

pub(crate) async fn list_rows<E>(
    db: &mut E,
    entity: &ResourceDescriptor,
    ids: &[BindValue],
) -> Result<Vec<u8>, AppError>
where
    E: QueryExecutor + ?Sized,
{
    let rows = CrudService::list(db, entity, ids).await?;
    encode_envelope(entity, &rows)
}

/// POST: validate the whole envelope, insert item by item, echo the input.
pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: RequestBody,
) -> Result<Response, AppError> {
    write_request(&state, &resource, body, Operation::Create)
        .await
        .map(json_ok)
        .map_err(|e| logged(&resource, "insert", e))
}

/// PUT: validate, update each item by its lookup key, echo the input.
pub async fn update(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: RequestBody,
) -> Result<Response, AppError> {
    write_request(&state, &resource, body, Operation::Update)
        .await
        .map(json_ok)
        .map_err(|e| logged(&resource, "update", e))
}

async fn write_request(
    state: &AppState,
    resource: &str,
    body: RequestBody,
    op: Operation,
) -> Result<Vec<u8>, AppError> {
    let entity = resource_for(state, resource, op)?;
    let records = checked_batch(entity, &body?, op)?;
    let mut conn = acquire(state).await?;
    write_records(&mut *conn, entity, &records, op).await
}

/// Decode and validate a write body; nothing is persisted unless every item passes.
fn checked_batch(entity: &ResourceDescriptor, body: &[u8], op: Operation) -> Result<Vec<Record>, AppError> {
    let records = decode_envelope(entity, body)?;
    BatchValidator::validate_batch(entity, &records, op)?;
    Ok(records)
}

pub(crate) async fn write_records<E>(
    db: &mut E,
    entity: &ResourceDescriptor,
    records: &[Record],
    op: Operation,
) -> Result<Vec<u8>, AppError>
where
    E: QueryExecutor + ?Sized,
{
    let affected = match op {
        Operation::Update => CrudService::update_batch(db, entity, records).await?,
        _ => CrudService::create_batch(db, entity, records).await?,
    };
    tracing::info!(resource = %entity.name, items = records.len(), affected, "batch written");
    encode_envelope(entity, records)
}

/// DELETE: body `{"ids": [...]}`; an empty list is echoed without touching the database.
pub async fn delete(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: RequestBody,
) -> Result<Response, AppError> {
    delete_request(&state, &resource, body)
        .await
        .map(json_ok)
        .map_err(|e| logged(&resource, "delete", e))
}

async fn delete_request(state: &AppState, resource: &str, body: RequestBody) -> Result<Vec<u8>, AppError> {
    let entity = resource_for(state, resource, Operation::Delete)?;
    let ids = decode_ids(entity, &body?)?;
    if ids.ids.is_empty() {
        return encode_ids(&ids);
    }
    let mut conn = acquire(state).await?;
    delete_ids(&mut *conn, entity, &ids).await
}

pub(crate) async fn delete_ids<E>(db: &mut E, entity: &ResourceDescriptor, ids: &IdList) -> Result<Vec<u8>, AppError>
where
    E: QueryExecutor + ?Sized,
{
    let binds = bind_identifiers(entity.key_column(), &ids.ids)?;
    let affected = CrudService::delete(db, entity, &binds).await?;
    tracing::info!(resource = %entity.name, ids = ids.ids.len(), affected, "rows deleted");
    encode_ids(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_catalog, resolve, ResourceRegistry};
    use crate::service::crud::testing::RecordingExecutor;
    use serde_json::{json, Value};

    fn registry() -> ResourceRegistry {
        resolve(&builtin_catalog().unwrap()).unwrap()
    }

    fn parsed(body: Vec<u8>) -> Value {
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn get_wraps_rows_in_collection() {
        let reg = registry();
        let eyes = reg.by_name("eyescolor").unwrap();
        let row = json!({"EntryID": 1, "ColorID": 4});
        let mut db = RecordingExecutor {
            rows: vec![row.as_object().unwrap().clone()],
            ..Default::default()
        };
        let ids = lookup_ids(eyes, vec![("entry_id".into(), "1".into()), ("other".into(), "9".into())]).unwrap();
        let body = list_rows(&mut db, eyes, &ids).await.unwrap();
        assert_eq!(parsed(body), json!({"eyecolors": [{"EntryID": 1, "ColorID": 4}]}));
        assert_eq!(db.statements[0].params, vec![BindValue::Int(1)]);
    }

    #[tokio::test]
    async fn get_with_no_rows_is_empty_collection() {
        let reg = registry();
        let link = reg.by_name("link").unwrap();
        let mut db = RecordingExecutor::default();
        let body = list_rows(&mut db, link, &[]).await.unwrap();
        assert_eq!(parsed(body), json!({"links": []}));
    }

    #[tokio::test]
    async fn post_echoes_normalized_envelope() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let input = json!({"bwhs": [{"entry_id": 3, "bust": 82, "waist": 57, "hip": 84}]});
        let records = checked_batch(bwh, &serde_json::to_vec(&input).unwrap(), Operation::Create).unwrap();
        let mut db = RecordingExecutor::default();
        let body = write_records(&mut db, bwh, &records, Operation::Create).await.unwrap();
        assert_eq!(
            parsed(body),
            json!({"bwhs": [{"entry_id": 3, "bust": 82, "waist": 57, "hip": 84, "height": null, "weight": null}]})
        );
        assert_eq!(db.statements.len(), 1);
        assert!(db.statements[0].sql.starts_with("INSERT INTO \"bwh\""));
    }

    #[tokio::test]
    async fn put_updates_each_item_and_echoes() {
        let reg = registry();
        let hairstyle = reg.by_name("hairstyle").unwrap();
        let input = json!({"hair_styles": [{"EntryID": 1, "StyleID": 2}, {"EntryID": 2, "StyleID": 3}]});
        let records = checked_batch(hairstyle, &serde_json::to_vec(&input).unwrap(), Operation::Update).unwrap();
        let mut db = RecordingExecutor::default();
        let body = write_records(&mut db, hairstyle, &records, Operation::Update).await.unwrap();
        assert_eq!(parsed(body), input);
        assert_eq!(db.statements.len(), 2);
        assert!(db.statements.iter().all(|q| q.sql.starts_with("UPDATE \"hairstyle\"")));
    }

    #[test]
    fn invalid_batch_never_reaches_writes() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let err = checked_batch(bwh, br#"{"bwhs": [{"entry_id": 1}]}"#, Operation::Create).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_echoes_single_id() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let ids = decode_ids(bwh, br#"{"ids": [7]}"#).unwrap();
        let mut db = RecordingExecutor::default();
        let body = delete_ids(&mut db, bwh, &ids).await.unwrap();
        assert_eq!(parsed(body), json!({"ids": [7]}));
        assert_eq!(db.statements[0].sql, "DELETE FROM \"bwh\" WHERE \"entry_id\" = $1");
    }

    #[tokio::test]
    async fn delete_echoes_many_ids() {
        let reg = registry();
        let link = reg.by_name("link").unwrap();
        let ids = decode_ids(link, br#"{"ids": [1, 2, 3]}"#).unwrap();
        let mut db = RecordingExecutor::default();
        let body = delete_ids(&mut db, link, &ids).await.unwrap();
        assert_eq!(parsed(body), json!({"ids": [1, 2, 3]}));
        assert_eq!(db.statements.len(), 1);
        assert_eq!(db.statements[0].sql, "DELETE FROM \"link\" WHERE \"id\" IN ($1, $2, $3)");
    }
}
