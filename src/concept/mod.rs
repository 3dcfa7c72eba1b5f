//! The shared graph model: labels, type nodes, rule nodes and instances.

/// Supertype and subtype walks over a schema store.
pub mod hierarchy;
mod label;
mod rule;
mod thing;
mod type_node;

pub use hierarchy::{direct_supertype, Subtypes, Supertypes};
pub use label::Label;
pub use rule::{RuleId, RuleIndexKind, RuleNode};
pub use thing::{Thing, ThingId};
pub use type_node::{Root, TypeId, TypeKind, TypeNode, TypeStatus};
