//! Instance writes: the thing manager and the batch inserter.

/// Resolves batches of instance declarations.
pub mod inserter;
/// Validated instance writes.
pub mod thing_manager;

pub use inserter::{Bindings, Inserter};
pub use thing_manager::ThingManager;
