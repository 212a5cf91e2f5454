//! Repository layer: table-scoped database operations.
//!
//! All public functions are re-exported here.

mod slot;

pub use slot::*;
