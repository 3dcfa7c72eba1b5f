//! Storage trait definitions for TypeGraph.
//!
//! These traits define the abstract interface for storage backends.
//! The in-memory backend in [`memory`] is the reference implementation.

/// In-memory backends.
pub mod memory;
mod traits;

pub use memory::{InMemorySchemaStore, InMemoryStores, InMemoryThingStore};
pub use traits::{OwnsEdge, PlaysEdge, RolePlayer, SchemaStore, StorageError, ThingStore};
