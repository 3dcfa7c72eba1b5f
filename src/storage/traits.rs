//! Abstract storage traits for TypeGraph.
//!
//! The write-path core never stores anything itself; it drives a schema
//! store (types, constraint edges, rules and their index edges) and a thing
//! store (instances, `has` edges, role players). Both are expected to give
//! snapshot-per-transaction semantics through `begin`/`commit`/`rollback`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::concept::{Label, RuleId, RuleIndexKind, RuleNode, Thing, ThingId, TypeId, TypeNode};

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Type not found.
    #[error("Type not found: {0}")]
    TypeNotFound(TypeId),

    /// Rule not found.
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    /// Thing not found.
    #[error("Thing not found: {0}")]
    ThingNotFound(ThingId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Transaction misuse (e.g. commit without begin).
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// An `owns` edge from a thing type to an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnsEdge {
    /// Owned attribute type.
    pub attribute: TypeId,
    /// Ownership as a key.
    pub is_key: bool,
    /// Inherited ownership hidden by this one.
    pub overridden: Option<TypeId>,
}

/// A `plays` edge from a thing type to a role type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaysEdge {
    /// Played role type.
    pub role: TypeId,
    /// Inherited play hidden by this one.
    pub overridden: Option<TypeId>,
}

/// A role-player edge of a relation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RolePlayer {
    /// Role played.
    pub role: TypeId,
    /// Player instance.
    pub player: ThingId,
}

/// Storage trait for the type graph and rules.
///
/// # Invariants expected of implementations
/// - Labels are unique per scope: `create_type` rejects a duplicate label.
/// - A type has at most one outgoing `sub` edge; `set_sub` replaces it.
/// - Index edges form a set per (rule, kind).
pub trait SchemaStore: Send + Sync {
    /// Insert a new type. Returns `DuplicateKey` if the id or label exists.
    fn create_type(&self, node: TypeNode) -> Result<(), StorageError>;

    /// Get a type by ID.
    fn get_type(&self, id: TypeId) -> Result<Option<TypeNode>, StorageError>;

    /// Get a type by (scoped) label.
    fn get_type_by_label(&self, label: &Label) -> Result<Option<TypeNode>, StorageError>;

    /// Replace a stored type, re-indexing its label if it changed.
    fn update_type(&self, node: TypeNode) -> Result<(), StorageError>;

    /// All types, in no particular order.
    fn list_types(&self) -> Result<Vec<TypeNode>, StorageError>;

    /// Point the `sub` edge of `sub` at `sup`, replacing any previous one.
    fn set_sub(&self, sub: TypeId, sup: TypeId) -> Result<(), StorageError>;

    /// The target of the outgoing `sub` edge, if any.
    fn get_sub(&self, id: TypeId) -> Result<Option<TypeId>, StorageError>;

    /// Sources of incoming `sub` edges (direct subtypes).
    fn get_direct_subtypes(&self, id: TypeId) -> Result<Vec<TypeId>, StorageError>;

    /// Add a `relates` edge (idempotent).
    fn put_relates(&self, relation: TypeId, role: TypeId) -> Result<(), StorageError>;

    /// Declared (non-inherited) roles of a relation type.
    fn get_relates(&self, relation: TypeId) -> Result<Vec<TypeId>, StorageError>;

    /// Add or replace the `owns` edge towards `edge.attribute`.
    fn put_owns(&self, owner: TypeId, edge: OwnsEdge) -> Result<(), StorageError>;

    /// Declared (non-inherited) ownerships.
    fn get_owns(&self, owner: TypeId) -> Result<Vec<OwnsEdge>, StorageError>;

    /// Add or replace the `plays` edge towards `edge.role`.
    fn put_plays(&self, player: TypeId, edge: PlaysEdge) -> Result<(), StorageError>;

    /// Declared (non-inherited) plays.
    fn get_plays(&self, player: TypeId) -> Result<Vec<PlaysEdge>, StorageError>;

    /// Insert a new rule. Returns `DuplicateKey` if the id or label exists.
    fn create_rule(&self, rule: RuleNode) -> Result<(), StorageError>;

    /// Replace a stored rule's label or patterns. Index edges are untouched.
    fn update_rule(&self, rule: RuleNode) -> Result<(), StorageError>;

    /// Get a rule by ID.
    fn get_rule(&self, id: RuleId) -> Result<Option<RuleNode>, StorageError>;

    /// Get a rule by label.
    fn get_rule_by_label(&self, label: &str) -> Result<Option<RuleNode>, StorageError>;

    /// Delete a rule together with all of its index edges.
    fn delete_rule(&self, id: RuleId) -> Result<(), StorageError>;

    /// Add an index edge (idempotent).
    fn put_rule_edge(
        &self,
        rule: RuleId,
        kind: RuleIndexKind,
        target: TypeId,
    ) -> Result<(), StorageError>;

    /// Remove every index edge of `kind` from `rule`.
    fn delete_rule_edges(&self, rule: RuleId, kind: RuleIndexKind) -> Result<(), StorageError>;

    /// Targets of the index edges of `kind` from `rule`.
    fn get_rule_edges(&self, rule: RuleId, kind: RuleIndexKind)
        -> Result<Vec<TypeId>, StorageError>;

    /// Rules holding an index edge of `kind` towards `target`.
    fn get_rules_for_type(
        &self,
        target: TypeId,
        kind: RuleIndexKind,
    ) -> Result<Vec<RuleId>, StorageError>;

    /// Open a transaction: later writes are undone by `rollback`.
    fn begin(&self) -> Result<(), StorageError>;

    /// Make the transaction's writes permanent; buffered types become committed.
    fn commit(&self) -> Result<(), StorageError>;

    /// Discard every write since `begin`.
    fn rollback(&self) -> Result<(), StorageError>;
}

/// Storage trait for instances.
pub trait ThingStore: Send + Sync {
    /// Insert a new instance. Returns `DuplicateKey` if the id exists.
    fn insert(&self, thing: Thing) -> Result<(), StorageError>;

    /// Get an instance by ID.
    fn get(&self, id: ThingId) -> Result<Option<Thing>, StorageError>;

    /// All instances whose type is exactly `type_id`.
    fn find_by_type(&self, type_id: TypeId) -> Result<Vec<Thing>, StorageError>;

    /// Add a `has` edge (idempotent).
    fn put_has(&self, owner: ThingId, attribute: ThingId) -> Result<(), StorageError>;

    /// Attributes owned by `owner`.
    fn get_has(&self, owner: ThingId) -> Result<Vec<ThingId>, StorageError>;

    /// Add a role player. Relations hold a multiset of players.
    fn add_player(&self, relation: ThingId, player: RolePlayer) -> Result<(), StorageError>;

    /// Role players of a relation, in insertion order.
    fn get_players(&self, relation: ThingId) -> Result<Vec<RolePlayer>, StorageError>;

    /// Open a transaction: later writes are undone by `rollback`.
    fn begin(&self) -> Result<(), StorageError>;

    /// Make the transaction's writes permanent.
    fn commit(&self) -> Result<(), StorageError>;

    /// Discard every write since `begin`.
    fn rollback(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure traits are object-safe
    fn _assert_schema_store_object_safe(_: &dyn SchemaStore) {}
    fn _assert_thing_store_object_safe(_: &dyn ThingStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::TypeNotFound(TypeId::new());
        assert!(err.to_string().contains("Type not found"));

        let err = StorageError::Transaction("no open transaction".to_string());
        assert!(err.to_string().contains("no open transaction"));
    }
}
