//! Safe SQL builder: identifiers from the catalog only, values as parameters.

mod builder;
pub mod dialect;
pub mod params;
pub use builder::*;
pub use dialect::{Dialect, PgDialect};
pub use params::*;
