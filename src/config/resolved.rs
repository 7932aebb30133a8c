//! Resolved resource model: catalog validated and flattened for runtime use.

use crate::config::{ColumnType, ValidationRule};
use regex::Regex;
use std::collections::HashMap;

/// HTTP-facing operation a resource may allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Operation::Read),
            "create" => Some(Operation::Create),
            "update" => Some(Operation::Update),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub json_name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub generated: bool,
    pub has_default: bool,
    pub validation: ValidationRule,
    /// Compiled `validation.pattern`.
    pub pattern: Option<Regex>,
}

impl ColumnInfo {
    /// Written by INSERT (subject to `has_default`) and by UPDATE unless it is the key.
    pub fn is_writable(&self) -> bool {
        !self.generated
    }
}

/// Static per-table metadata; immutable after startup.
#[derive(Clone, Debug)]
pub struct ResourceDescriptor {
    pub name: String,
    pub table: String,
    pub collection: String,
    /// Index of the lookup column in `columns`.
    pub key_index: usize,
    pub columns: Vec<ColumnInfo>,
    pub operations: Vec<Operation>,
}

impl ResourceDescriptor {
    pub fn key_column(&self) -> &ColumnInfo {
        &self.columns[self.key_index]
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResourceRegistry {
    pub resources: Vec<ResourceDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ResourceRegistry {
    pub fn new(resources: Vec<ResourceDescriptor>) -> Self {
        let by_name = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        ResourceRegistry { resources, by_name }
    }

    pub fn by_name(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.by_name.get(name).map(|&i| &self.resources[i])
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
