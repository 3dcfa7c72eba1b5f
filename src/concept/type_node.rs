//! Type nodes of the schema graph.
//!
//! Kind is an explicit tag on every node, so every dispatch over kinds is an
//! exhaustive match. Roots are ordinary nodes flagged `is_root`; the guard
//! against mutating them lives in `TypeManager`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Label;
use crate::value::ValueKind;

/// Stable identifier of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(Uuid);

impl TypeId {
    /// Creates a new random type ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Entity types.
    Entity,
    /// Relation types.
    Relation,
    /// Attribute types.
    Attribute,
    /// Role types, scoped by their relation.
    Role,
}

impl TypeKind {
    /// Returns true for the kinds that can have instances (entity, relation, attribute).
    #[must_use]
    pub const fn is_thing(&self) -> bool {
        !matches!(self, Self::Role)
    }

    /// The root of this kind's hierarchy.
    #[must_use]
    pub const fn root(&self) -> Root {
        match self {
            Self::Entity => Root::Entity,
            Self::Relation => Root::Relation,
            Self::Attribute => Root::Attribute,
            Self::Role => Root::Role,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "entity"),
            Self::Relation => write!(f, "relation"),
            Self::Attribute => write!(f, "attribute"),
            Self::Role => write!(f, "role"),
        }
    }
}

/// Commit status of a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeStatus {
    /// Created or modified in the current transaction.
    #[default]
    Buffered,
    /// Visible to every later transaction.
    Committed,
}

/// The four root types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    /// The `entity` root.
    Entity,
    /// The `relation` root.
    Relation,
    /// The `attribute` root.
    Attribute,
    /// The `relation:role` root.
    Role,
}

impl Root {
    /// All roots, in seeding order.
    pub const ALL: [Self; 4] = [Self::Entity, Self::Relation, Self::Attribute, Self::Role];

    /// The root's label. The root role is scoped by the root relation.
    #[must_use]
    pub fn label(&self) -> Label {
        match self {
            Self::Entity => Label::new("entity"),
            Self::Relation => Label::new("relation"),
            Self::Attribute => Label::new("attribute"),
            Self::Role => Label::scoped("role", "relation"),
        }
    }

    /// The kind rooted here.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Entity => TypeKind::Entity,
            Self::Relation => TypeKind::Relation,
            Self::Attribute => TypeKind::Attribute,
            Self::Role => TypeKind::Role,
        }
    }

    /// Looks up the root carrying `label`.
    #[must_use]
    pub fn from_label(label: &Label) -> Option<Self> {
        Self::ALL.into_iter().find(|root| root.label() == *label)
    }
}

/// A schema element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeNode {
    /// Stable identifier.
    pub id: TypeId,
    /// Label, scoped for roles.
    pub label: Label,
    /// Kind of the type.
    pub kind: TypeKind,
    /// True for the four built-in roots.
    pub is_root: bool,
    /// Abstract types cannot be instantiated.
    pub is_abstract: bool,
    /// Present only on attribute types; absent on the attribute root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_kind: Option<ValueKind>,
    /// Present only on string attribute types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Whether the defining transaction has committed.
    pub status: TypeStatus,
}

impl TypeNode {
    /// Creates a new buffered, concrete, non-root type.
    #[must_use]
    pub fn new(label: Label, kind: TypeKind) -> Self {
        Self {
            id: TypeId::new(),
            label,
            kind,
            is_root: false,
            is_abstract: false,
            value_kind: None,
            regex: None,
            status: TypeStatus::Buffered,
        }
    }

    /// Creates an attribute type with the given value kind.
    #[must_use]
    pub fn attribute(label: Label, value_kind: ValueKind) -> Self {
        let mut node = Self::new(label, TypeKind::Attribute);
        node.value_kind = Some(value_kind);
        node
    }

    /// Creates a committed, abstract root node.
    #[must_use]
    pub fn root(root: Root) -> Self {
        Self {
            id: TypeId::new(),
            label: root.label(),
            kind: root.kind(),
            is_root: true,
            is_abstract: true,
            value_kind: None,
            regex: None,
            status: TypeStatus::Committed,
        }
    }

    /// Returns true if instances of this type may be created.
    #[must_use]
    pub const fn is_instantiable(&self) -> bool {
        self.kind.is_thing() && !self.is_root && !self.is_abstract
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_labels_round_trip() {
        for root in Root::ALL {
            assert_eq!(Root::from_label(&root.label()), Some(root));
            assert_eq!(root.kind().root(), root);
        }
        assert_eq!(Root::Role.label().to_string(), "relation:role");
        assert_eq!(Root::from_label(&Label::new("person")), None);
    }

    #[test]
    fn test_new_type_is_buffered_and_concrete() {
        let node = TypeNode::new(Label::new("person"), TypeKind::Entity);
        assert_eq!(node.status, TypeStatus::Buffered);
        assert!(!node.is_root);
        assert!(node.is_instantiable());
    }

    #[test]
    fn test_roots_are_not_instantiable() {
        for root in Root::ALL {
            let node = TypeNode::root(root);
            assert!(node.is_root);
            assert!(!node.is_instantiable());
            assert_eq!(node.status, TypeStatus::Committed);
        }
    }

    #[test]
    fn test_role_kind_is_not_a_thing() {
        assert!(!TypeKind::Role.is_thing());
        let role = TypeNode::new(Label::scoped("employee", "employment"), TypeKind::Role);
        assert!(!role.is_instantiable());
    }
}
