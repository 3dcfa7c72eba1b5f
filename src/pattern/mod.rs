//! Already-parsed declarations and patterns.
//!
//! This is the representation handed over by the query layer. Nothing here
//! parses surface syntax; the write path only walks these structures.

mod registry;
mod schema;
mod thing;

pub use registry::{
    RegisteredConstraint, RegisteredPlayer, RegisteredVariable, ThingRegistry, VarIndex,
};
pub use schema::{RuleDeclaration, TypeConstraint, TypeDeclaration};
pub use thing::{
    Conjunction, Negation, Reference, RolePlayer, ThingConstraint, ThingVariable, TypeRef,
};

pub(crate) use thing::{scope_role, type_labels};
