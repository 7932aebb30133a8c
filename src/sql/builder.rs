//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a resource descriptor.
//!
//! Reads and deletes are scoped by an identifier set. The shape of the predicate
//! depends on how many identifiers were supplied: none matches every row, one
//! becomes `key = $1`, several become `key IN ($1, ..., $n)`.

use crate::config::ResourceDescriptor;
use crate::envelope::Record;
use crate::error::{AppError, ConfigError};
use crate::sql::dialect::{expand_in, rebind, Dialect, IN_MARKER};
use crate::sql::params::BindValue;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from the validated catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

/// How many identifiers scope an operation.
#[derive(Debug, PartialEq)]
pub enum Cardinality<'a> {
    Unfiltered,
    One(&'a BindValue),
    Many(&'a [BindValue]),
}

impl<'a> Cardinality<'a> {
    pub fn of(ids: &'a [BindValue]) -> Self {
        match ids {
            [] => Cardinality::Unfiltered,
            [one] => Cardinality::One(one),
            many => Cardinality::Many(many),
        }
    }
}

/// A statement with one set-membership predicate on the lookup column.
#[derive(Clone, Debug)]
pub struct QueryTemplate {
    head: String,
    column: String,
    tail: String,
    /// Whether an empty identifier set means "every row" (SELECT) or "nothing to do" (DELETE).
    unfiltered: bool,
}

impl QueryTemplate {
    pub fn new(head: impl Into<String>, column: &str, tail: impl Into<String>, unfiltered: bool) -> Self {
        QueryTemplate {
            head: head.into(),
            column: quoted(column),
            tail: tail.into(),
            unfiltered,
        }
    }

    /// SELECT every column, ordered by the lookup key.
    pub fn select(entity: &ResourceDescriptor) -> Self {
        let key = &entity.key_column().name;
        Self::new(
            format!("SELECT {} FROM {}", select_column_list(entity), quoted(&entity.table)),
            key,
            format!(" ORDER BY {}", quoted(key)),
            true,
        )
    }

    pub fn delete(entity: &ResourceDescriptor) -> Self {
        Self::new(
            format!("DELETE FROM {}", quoted(&entity.table)),
            &entity.key_column().name,
            "",
            false,
        )
    }

    /// The template as written, membership marker included.
    pub fn membership_sql(&self) -> String {
        format!("{} WHERE {} {}{}", self.head, self.column, IN_MARKER, self.tail)
    }

    /// Produce the statement for this identifier set, or `None` when there is nothing to run.
    pub fn resolve(&self, ids: &[BindValue], dialect: &dyn Dialect) -> Result<Option<QueryBuf>, ConfigError> {
        let q = match Cardinality::of(ids) {
            Cardinality::Unfiltered if !self.unfiltered => return Ok(None),
            Cardinality::Unfiltered => QueryBuf {
                sql: format!("{}{}", self.head, self.tail),
                params: Vec::new(),
            },
            Cardinality::One(id) => {
                let sql = format!("{} WHERE {} = ?{}", self.head, self.column, self.tail);
                QueryBuf {
                    sql: rebind(dialect, &sql),
                    params: vec![id.clone()],
                }
            }
            Cardinality::Many(ids) => {
                let sql = expand_in(&self.membership_sql(), ids.len())?;
                QueryBuf {
                    sql: rebind(dialect, &sql),
                    params: ids.to_vec(),
                }
            }
        };
        Ok(Some(q))
    }
}

fn select_column_list(entity: &ResourceDescriptor) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn field<'r>(record: &'r Record, json_name: &str) -> &'r Value {
    record.get(json_name).unwrap_or(&Value::Null)
}

/// INSERT of one record: every non-generated column, except defaulted columns left empty.
pub fn insert(entity: &ResourceDescriptor, record: &Record, dialect: &dyn Dialect) -> Result<QueryBuf, AppError> {
    let mut cols = Vec::new();
    let mut params = Vec::new();
    for c in entity.columns.iter().filter(|c| c.is_writable()) {
        let val = field(record, &c.json_name);
        if val.is_null() && c.has_default {
            continue;
        }
        cols.push(quoted(&c.name));
        params.push(BindValue::from_json(val, c)?);
    }
    let placeholders = vec!["?"; cols.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(&entity.table),
        cols.join(", "),
        placeholders
    );
    Ok(QueryBuf {
        sql: rebind(dialect, &sql),
        params,
    })
}

/// UPDATE of one record matched by its lookup key: sets every other writable column.
pub fn update(entity: &ResourceDescriptor, record: &Record, dialect: &dyn Dialect) -> Result<QueryBuf, AppError> {
    let key = entity.key_column();
    let mut sets = Vec::new();
    let mut params = Vec::new();
    for c in entity.columns.iter().filter(|c| c.is_writable() && c.name != key.name) {
        let val = field(record, &c.json_name);
        if val.is_null() && c.has_default && !c.nullable {
            continue;
        }
        sets.push(format!("{} = ?", quoted(&c.name)));
        params.push(BindValue::from_json(val, c)?);
    }
    if sets.is_empty() {
        return Err(AppError::Config(ConfigError::Template(format!(
            "{}: no updatable columns",
            entity.name
        ))));
    }
    params.push(BindValue::from_json(field(record, &key.json_name), key)?);
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quoted(&entity.table),
        sets.join(", "),
        quoted(&key.name)
    );
    Ok(QueryBuf {
        sql: rebind(dialect, &sql),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_catalog, resolve, ColumnType, ResourceRegistry};
    use crate::sql::dialect::PgDialect;
    use serde_json::json;

    fn registry() -> ResourceRegistry {
        resolve(&builtin_catalog().unwrap()).unwrap()
    }

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn cardinality_follows_identifier_count() {
        let ids = [BindValue::Int(1), BindValue::Int(2)];
        assert_eq!(Cardinality::of(&ids[..0]), Cardinality::Unfiltered);
        assert_eq!(Cardinality::of(&ids[..1]), Cardinality::One(&ids[0]));
        assert_eq!(Cardinality::of(&ids), Cardinality::Many(&ids));
    }

    #[test]
    fn select_without_identifiers_matches_all() {
        let reg = registry();
        let q = QueryTemplate::select(reg.by_name("bwh").unwrap())
            .resolve(&[], &PgDialect)
            .unwrap()
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"entry_id\", \"bust\", \"waist\", \"hip\", \"height\", \"weight\" FROM \"bwh\" ORDER BY \"entry_id\""
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn select_with_one_identifier_uses_equality() {
        let reg = registry();
        let q = QueryTemplate::select(reg.by_name("bwh").unwrap())
            .resolve(&[BindValue::Int(5)], &PgDialect)
            .unwrap()
            .unwrap();
        assert!(q.sql.ends_with("FROM \"bwh\" WHERE \"entry_id\" = $1 ORDER BY \"entry_id\""));
        assert!(!q.sql.contains(" IN "));
        assert_eq!(q.params, vec![BindValue::Int(5)]);
    }

    #[test]
    fn select_with_many_identifiers_expands_set() {
        let reg = registry();
        let ids = vec![BindValue::Int(1), BindValue::Int(2), BindValue::Int(3)];
        let q = QueryTemplate::select(reg.by_name("link").unwrap())
            .resolve(&ids, &PgDialect)
            .unwrap()
            .unwrap();
        assert!(q.sql.contains("WHERE \"id\" IN ($1, $2, $3) ORDER BY \"id\""));
        assert_eq!(q.params.len(), ids.len());
    }

    #[test]
    fn delete_without_identifiers_is_noop() {
        let reg = registry();
        let template = QueryTemplate::delete(reg.by_name("bwh").unwrap());
        assert_eq!(template.resolve(&[], &PgDialect).unwrap(), None);

        let q = template.resolve(&[BindValue::Int(7)], &PgDialect).unwrap().unwrap();
        assert_eq!(q.sql, "DELETE FROM \"bwh\" WHERE \"entry_id\" = $1");

        let q = template
            .resolve(&[BindValue::Int(7), BindValue::Int(8)], &PgDialect)
            .unwrap()
            .unwrap();
        assert_eq!(q.sql, "DELETE FROM \"bwh\" WHERE \"entry_id\" IN ($1, $2)");
    }

    #[test]
    fn insert_skips_generated_and_empty_defaults() {
        let reg = registry();
        let entry = reg.by_name("entry").unwrap();
        let r = record(json!({
            "id": 99, "source_id": 1, "name": "a", "image": "i", "content": "c", "created_at": null
        }));
        let q = insert(entry, &r, &PgDialect).unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO \"entry\" (\"source_id\", \"name\", \"image\", \"content\") VALUES ($1, $2, $3, $4)"
        );
        assert_eq!(q.params.len(), 4);
    }

    #[test]
    fn insert_binds_typed_nulls() {
        let reg = registry();
        let bwh = reg.by_name("bwh").unwrap();
        let r = record(json!({
            "entry_id": 1, "bust": 80, "waist": 60, "hip": 85, "height": null, "weight": null
        }));
        let q = insert(bwh, &r, &PgDialect).unwrap();
        assert_eq!(q.params.len(), 6);
        assert_eq!(q.params[4], BindValue::Null(ColumnType::Int));
    }

    #[test]
    fn update_matches_on_lookup_key() {
        let reg = registry();
        let eyes = reg.by_name("eyescolor").unwrap();
        let r = record(json!({"EntryID": 3, "ColorID": 4}));
        let q = update(eyes, &r, &PgDialect).unwrap();
        assert_eq!(q.sql, "UPDATE \"eyecolor\" SET \"color_id\" = $1 WHERE \"entry_id\" = $2");
        assert_eq!(q.params, vec![BindValue::Int(4), BindValue::Int(3)]);

        let link = reg.by_name("link").unwrap();
        let r = record(json!({
            "ID": 9, "EntryID": 1, "Type": "web", "URL": "https://x", "Nsfw": false, "Darkness": true
        }));
        let q = update(link, &r, &PgDialect).unwrap();
        assert!(q.sql.starts_with("UPDATE \"link\" SET \"entry_id\" = $1, \"type\" = $2"));
        assert!(q.sql.ends_with("WHERE \"id\" = $6"));
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }
}
