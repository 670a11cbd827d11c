//! Data structures consumed by the query engine: case and pedigree, variant
//! records and query settings.

pub mod case;
pub mod data;
pub mod settings;
