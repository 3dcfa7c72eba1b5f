//! # TypeGraph - write-path core of a typed graph store
//!
//! TypeGraph turns schema declarations and data-insertion statements into
//! mutations of a type graph and an instance graph, enforcing the structural
//! invariants the storage layer does not know about: single-inheritance
//! acyclic hierarchies, value-kind consistency, role-player legality and
//! rule indexing.
//!
//! ## Core Concepts
//!
//! - **TypeNode**: a schema type (entity, relation, attribute or role) in a single-inheritance hierarchy
//! - **Definer**: applies a batch of type declarations, in any order, plus rules
//! - **RuleIndexer**: maintains the condition/conclusion edges from rules to types
//! - **Inserter**: resolves a batch of instance declarations into instances and edges
//!
//! ## Usage
//!
//! ```rust
//! use typegraph::pattern::ThingVariable;
//! use typegraph::{Bindings, GraphEngine, TypeDeclaration, ValueKind};
//!
//! let engine = GraphEngine::in_memory();
//! engine.define_schema(
//!     &[
//!         TypeDeclaration::new("person").sub("entity").owns("name"),
//!         TypeDeclaration::new("name").sub("attribute").value_kind(ValueKind::String),
//!     ],
//!     &[],
//! )?;
//!
//! let bindings = engine.insert_data(
//!     &[
//!         ThingVariable::named("p").isa("person").has(ThingVariable::named("n")),
//!         ThingVariable::named("n").isa("name").value("Alice"),
//!     ],
//!     &Bindings::new(),
//! )?;
//! assert_eq!(bindings.len(), 2);
//! # Ok::<(), typegraph::GraphError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Shared model
/// Type, rule and instance model.
pub mod concept;
/// Engine configuration.
pub mod config;
/// Error types.
pub mod error;
/// Declarations handed to the write path.
pub mod pattern;
/// Value kinds and literals.
pub mod value;

// Schema and instance writes
/// The engine facade.
pub mod engine;
/// Schema writes: type manager, definer and rule indexer.
pub mod schema;
/// Storage traits and in-memory backends.
pub mod storage;
/// Instance writes: thing manager and inserter.
pub mod write;

pub use concept::{
    Label, Root, RuleId, RuleIndexKind, RuleNode, Thing, ThingId, TypeId, TypeKind, TypeNode,
    TypeStatus,
};
pub use config::EngineConfig;
pub use engine::GraphEngine;
pub use error::{GraphError, GraphResult, ReadError, SchemaError, ThingWriteError};
pub use pattern::{RuleDeclaration, TypeConstraint, TypeDeclaration};
pub use schema::{Definer, RuleIndex, RuleIndexer, TypeManager};
pub use storage::{InMemorySchemaStore, InMemoryStores, InMemoryThingStore, SchemaStore, StorageError, ThingStore};
pub use value::{Value, ValueKind};
pub use write::{Bindings, Inserter, ThingManager};
