//! Repository layer: entity-scoped database operations.

mod records;

pub use records::*;
