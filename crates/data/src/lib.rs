//! Catalog and config loading for the pack engine.

pub mod load;
pub mod schema;

pub use load::*;
pub use schema::*;
