//! Raw catalog types matching the resource JSON (one object per table).

use serde::{Deserialize, Serialize};

/// Scalar type of a persisted column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Text,
    Bool,
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "integer",
            ColumnType::Text => "string",
            ColumnType::Bool => "boolean",
            ColumnType::Timestamp => "timestamp",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Value must be present and not the zero value of its type.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// Wire field name; defaults to the column name.
    #[serde(default)]
    pub json: Option<String>,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    /// Database-assigned (serial); never written by INSERT or UPDATE.
    #[serde(default)]
    pub generated: bool,
    /// Omitted from INSERT when the request carries no value.
    #[serde(default)]
    pub has_default: bool,
    #[serde(flatten)]
    pub validation: ValidationRule,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Route segment under /api/v1.
    pub name: String,
    pub table: String,
    /// Envelope array key, e.g. "bwhs".
    pub collection: String,
    /// Lookup column for GET filters, PUT matching and DELETE ids.
    pub key: String,
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    pub columns: Vec<ColumnConfig>,
}

fn default_operations() -> Vec<String> {
    ["read", "create", "update", "delete"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// The whole catalog file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub resources: Vec<ResourceConfig>,
}
