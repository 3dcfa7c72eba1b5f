//! Error types for TypeGraph.
//!
//! All errors in TypeGraph are strongly typed using thiserror.
//! Schema writes, instance writes and reads each have their own enum so
//! callers can match on the exact failure; `GraphError` wraps them all.

use thiserror::Error;

use crate::concept::{Label, ThingId};
use crate::storage::StorageError;
use crate::value::ValueKind;

/// Errors raised while mutating the type graph (define, rules, type setters).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Cyclic type hierarchy detected: {}", chain.join(" -> "))]
    CyclicHierarchy {
        chain: Vec<String>,
    },

    #[error("Type '{label}' declares more than one supertype")]
    TooManySupertypes {
        label: String,
    },

    #[error("Type '{label}' cannot be its own supertype")]
    SelfSupertype {
        label: String,
    },

    #[error("Type '{label}' cannot sub '{supertype}': {reason}")]
    InvalidSubKind {
        label: String,
        supertype: String,
        reason: String,
    },

    #[error("Attribute type '{label}' has no value kind and cannot inherit one")]
    ValueKindMissing {
        label: String,
    },

    #[error("Value kind '{value_kind}' of attribute type '{label}' cannot be modified after creation")]
    ValueKindModified {
        label: String,
        value_kind: ValueKind,
    },

    #[error("Value kind is only allowed on attribute types, but '{label}' is not one")]
    ValueKindNotOnAttribute {
        label: String,
    },

    #[error("Role type '{label}' can only be defined through the 'relates' of its relation type")]
    RoleDefinedOutsideRelation {
        label: Label,
    },

    #[error("Root type '{label}' cannot be mutated")]
    RootMutation {
        label: Label,
    },

    #[error("Regex can only be set on string attribute types, but '{label}' is not one")]
    RegexOnNonString {
        label: String,
    },

    #[error("Invalid regex '{regex}' on '{label}': {reason}")]
    InvalidRegex {
        label: String,
        regex: String,
        reason: String,
    },

    #[error("'{overridden}' is not inherited by '{label}' and cannot be overridden")]
    OverriddenNotInherited {
        label: Label,
        overridden: Label,
    },

    #[error("Invalid rule '{label}': {reason}")]
    InvalidRule {
        label: String,
        reason: String,
    },

    #[error("Type hierarchy above '{label}' exceeds the maximum depth of {max_depth}")]
    HierarchyTooDeep {
        label: Label,
        max_depth: usize,
    },
}

/// Errors raised while inserting instances.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThingWriteError {
    #[error("Reference '{reference}' is already bound and its IID cannot be reasserted as '{iid}'")]
    IidReassertion {
        reference: String,
        iid: ThingId,
    },

    #[error("Reference '{reference}' is already bound and its type cannot be reasserted as '{label}'")]
    IsaReassertion {
        reference: String,
        label: Label,
    },

    #[error("Reference '{reference}' cannot have both IID '{iid}' and type '{label}'")]
    IsaIidConflict {
        reference: String,
        iid: ThingId,
        label: Label,
    },

    #[error("Constraint '{constraint}' is not accepted in an insertion")]
    UnacceptedConstraint {
        constraint: String,
    },

    #[error("Reference '{reference}' has no type to be inserted with")]
    IsaMissing {
        reference: String,
    },

    #[error("Reference '{reference}' declares more than one type")]
    TooManyIsa {
        reference: String,
    },

    #[error("Reference '{reference}' refers to a type variable; only labelled types can be written")]
    TypeVariable {
        reference: String,
    },

    #[error("Attribute '{reference}' of type '{label}' is missing a value")]
    ValueMissing {
        reference: String,
        label: Label,
    },

    #[error("Attribute '{reference}' of type '{label}' has more than one value")]
    TooManyValues {
        reference: String,
        label: Label,
    },

    #[error("Value of kind '{actual}' cannot be put into attribute type '{label}' of kind '{expected}'")]
    ValueKindMismatch {
        label: Label,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("Value '{value}' does not match regex '{regex}' of attribute type '{label}'")]
    RegexViolation {
        label: Label,
        value: String,
        regex: String,
    },

    #[error("Relation '{reference}' is missing a relation constraint")]
    RelationConstraintMissing {
        reference: String,
    },

    #[error("Relation '{reference}' has more than one relation constraint")]
    TooManyRelationConstraints {
        reference: String,
    },

    #[error("No role type could be inferred for player '{reference}'")]
    RoleTypeMissing {
        reference: String,
    },

    #[error("Role type of player '{reference}' is ambiguous: {}", candidates.join(", "))]
    RoleTypeAmbiguous {
        reference: String,
        candidates: Vec<String>,
    },

    #[error("Cannot create an instance of abstract type '{label}'")]
    IllegalAbstractWrite {
        label: Label,
    },

    #[error("Type '{label}' has not been committed and cannot be instantiated yet")]
    UncommittedType {
        label: Label,
    },

    #[error("Instances of '{owner}' cannot own attributes of '{attribute}'")]
    IllegalOwnership {
        owner: Label,
        attribute: Label,
    },

    #[error("Role '{role}' cannot be played by '{player}' in relation '{relation}'")]
    IllegalRolePlayer {
        relation: Label,
        role: Label,
        player: Label,
    },
}

/// Errors raised by lookups.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("Type not found: {label}")]
    TypeNotFound {
        label: Label,
    },

    #[error("Thing not found: {iid}")]
    ThingNotFound {
        iid: ThingId,
    },

    #[error("Rule not found: {label}")]
    RuleNotFound {
        label: String,
    },

    #[error("Type '{label}' is a {actual} type, expected a {expected} type")]
    InvalidTypeCast {
        label: Label,
        expected: String,
        actual: String,
    },
}

/// Top-level error type for TypeGraph.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Write error: {0}")]
    Write(#[from] ThingWriteError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl GraphError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a schema error.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns true if this is an instance write error.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    /// Returns true if this is a read error.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::Read(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns the schema error, if any.
    #[must_use]
    pub const fn as_schema(&self) -> Option<&SchemaError> {
        match self {
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the write error, if any.
    #[must_use]
    pub const fn as_write(&self) -> Option<&ThingWriteError> {
        match self {
            Self::Write(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the read error, if any.
    #[must_use]
    pub const fn as_read(&self) -> Option<&ReadError> {
        match self {
            Self::Read(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for TypeGraph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_hierarchy_message_lists_chain() {
        let err = SchemaError::CyclicHierarchy {
            chain: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("a -> b -> c -> a"));
    }

    #[test]
    fn test_role_scope_message_uses_scoped_label() {
        let err = SchemaError::RoleDefinedOutsideRelation {
            label: Label::scoped("employee", "employment"),
        };
        assert!(err.to_string().contains("employment:employee"));
    }

    #[test]
    fn test_ambiguous_role_lists_candidates() {
        let err = ThingWriteError::RoleTypeAmbiguous {
            reference: "$x".to_string(),
            candidates: vec!["employment:employee".into(), "employment:employer".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("$x"));
        assert!(msg.contains("employment:employer"));
    }

    #[test]
    fn test_graph_error_from_schema() {
        let err: GraphError = SchemaError::TooManySupertypes {
            label: "person".to_string(),
        }
        .into();
        assert!(err.is_schema());
        assert!(!err.is_write());
        assert!(matches!(
            err.as_schema(),
            Some(SchemaError::TooManySupertypes { .. })
        ));
    }

    #[test]
    fn test_graph_error_from_write_and_read() {
        let err: GraphError = ThingWriteError::IsaMissing {
            reference: "$x".to_string(),
        }
        .into();
        assert!(err.is_write());

        let err: GraphError = ReadError::TypeNotFound {
            label: Label::new("person"),
        }
        .into();
        assert!(err.is_read());
        assert!(err.to_string().contains("person"));
    }

    #[test]
    fn test_graph_error_internal_and_config() {
        let err = GraphError::internal("unexpected state");
        assert!(err.to_string().contains("unexpected state"));

        let err = GraphError::config("max_batch_size must be > 0");
        assert!(err.to_string().contains("max_batch_size"));
    }
}
