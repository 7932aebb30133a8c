//! Shared application state for all routes.

use crate::config::ResourceRegistry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Resource descriptors; immutable after startup.
    pub registry: Arc<ResourceRegistry>,
}

impl AppState {
    pub fn new(pool: PgPool, registry: ResourceRegistry) -> Self {
        AppState {
            pool,
            registry: Arc::new(registry),
        }
    }
}
