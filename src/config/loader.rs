//! Load the resource catalog (built-in or from a JSON file) and resolve it into descriptors.

use crate::config::resolved::{ColumnInfo, Operation, ResourceDescriptor, ResourceRegistry};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use regex::Regex;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../resources/catalog.json");

/// Build the registry from a catalog (validates first).
pub fn resolve(catalog: &CatalogConfig) -> Result<ResourceRegistry, ConfigError> {
    validate(catalog)?;

    let mut resources = Vec::with_capacity(catalog.resources.len());
    for r in &catalog.resources {
        let columns = r
            .columns
            .iter()
            .map(|c| {
                let pattern = c
                    .validation
                    .pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| ConfigError::Validation(format!("{}.{}: {}", r.name, c.name, e)))?;
                Ok(ColumnInfo {
                    name: c.name.clone(),
                    json_name: c.json.clone().unwrap_or_else(|| c.name.clone()),
                    ty: c.type_,
                    nullable: c.nullable,
                    generated: c.generated,
                    has_default: c.has_default,
                    validation: c.validation.clone(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let key_index = columns
            .iter()
            .position(|c| c.name == r.key)
            .ok_or_else(|| ConfigError::InvalidKey {
                resource: r.name.clone(),
                column: r.key.clone(),
            })?;
        let operations = r.operations.iter().filter_map(|o| Operation::parse(o)).collect();
        resources.push(ResourceDescriptor {
            name: r.name.clone(),
            table: r.table.clone(),
            collection: r.collection.clone(),
            key_index,
            columns,
            operations,
        });
    }

    Ok(ResourceRegistry::new(resources))
}

pub fn parse_catalog(json: &str) -> Result<CatalogConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// The catalog shipped with the crate: one resource per character attribute table.
pub fn builtin_catalog() -> Result<CatalogConfig, ConfigError> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Read a catalog file, e.g. from `RESOURCES_PATH`.
pub async fn load_catalog_from_path(path: impl AsRef<Path>) -> Result<CatalogConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_catalog(&raw)
}
