//! Catalog validation: identifier safety, key references and uniqueness.

use crate::config::{CatalogConfig, Operation};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(kind: &str, s: &str) -> Result<(), ConfigError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("invalid {} identifier: '{}'", kind, s)))
    }
}

pub fn validate(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.resources.is_empty() {
        return Err(ConfigError::Validation("at least one resource required".into()));
    }

    let mut names = HashSet::new();
    for r in &catalog.resources {
        check_identifier("resource", &r.name)?;
        check_identifier("table", &r.table)?;
        if r.collection.is_empty() {
            return Err(ConfigError::Validation(format!("{}: collection key must not be empty", r.name)));
        }
        if !names.insert(r.name.as_str()) {
            return Err(ConfigError::DuplicateResource(r.name.clone()));
        }
        if r.columns.is_empty() {
            return Err(ConfigError::Validation(format!("{}: at least one column required", r.name)));
        }

        let mut column_names = HashSet::new();
        let mut json_names = HashSet::new();
        for c in &r.columns {
            check_identifier("column", &c.name)?;
            if !column_names.insert(c.name.as_str()) {
                return Err(ConfigError::Validation(format!("{}: duplicate column {}", r.name, c.name)));
            }
            let json = c.json.as_deref().unwrap_or(&c.name);
            if !json_names.insert(json.to_ascii_lowercase()) {
                return Err(ConfigError::Validation(format!("{}: duplicate json field {}", r.name, json)));
            }
            if let Some(pattern) = &c.validation.pattern {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("{}.{}: invalid pattern: {}", r.name, c.name, e))
                })?;
            }
        }
        if !column_names.contains(r.key.as_str()) {
            return Err(ConfigError::InvalidKey {
                resource: r.name.clone(),
                column: r.key.clone(),
            });
        }
        for op in &r.operations {
            if Operation::parse(op).is_none() {
                return Err(ConfigError::Validation(format!("{}: unknown operation '{}'", r.name, op)));
            }
        }
    }

    Ok(())
}
