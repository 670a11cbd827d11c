//! Code for sequence variants.

pub mod query;
