//! Character attribute database served as JSON collection resources.
//!
//! Every resource is a [`config::ResourceDescriptor`] resolved from the catalog; one engine
//! handles reads, batch writes and deletes for all of them.

pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{builtin_catalog, load_catalog_from_path, parse_catalog, resolve, ResourceRegistry, Settings};
pub use error::{AppError, ConfigError};
pub use routes::{app, common_routes, common_routes_with_ready, resource_routes};
pub use service::{BatchValidator, CrudService, QueryExecutor};
pub use state::AppState;
