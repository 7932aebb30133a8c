//! Generic collection-resource engine over the database seam.

pub(crate) mod crud;
pub mod executor;
mod validation;
pub use crud::{bind_identifiers, parse_identifiers, CrudService};
pub use executor::QueryExecutor;
pub use validation::BatchValidator;
