//! HTTP handlers for the collection resources.

pub mod resource;
pub use resource::*;
