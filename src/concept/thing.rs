//! Instances (things) of the data graph.

use std::fmt;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TypeId;
use crate::value::Value;

/// Opaque instance identifier (IID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThingId(Uuid);

impl ThingId {
    /// Creates a new random instance ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an instance ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Deterministic ID of the attribute holding `value` under `type_id`.
    ///
    /// Attributes are identified by their type and value, so putting the
    /// same value twice yields the same instance.
    #[must_use]
    pub fn for_attribute(type_id: TypeId, value: &Value) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"typegraph.attribute.v1");
        hasher.update(type_id.as_uuid().as_bytes());
        hasher.update(&value.identity_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ThingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0.simple())
    }
}

impl From<Uuid> for ThingId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A data-graph instance conforming to a type node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    /// Instance identifier.
    pub id: ThingId,
    /// Exact type of the instance.
    pub type_id: TypeId,
    /// True if produced by reasoning rather than explicit insertion.
    #[serde(default)]
    pub inferred: bool,
    /// Present only on attribute instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Thing {
    /// Creates a new entity or relation instance.
    #[must_use]
    pub fn new(type_id: TypeId) -> Self {
        Self {
            id: ThingId::new(),
            type_id,
            inferred: false,
            value: None,
        }
    }

    /// Creates an attribute instance with its derived identity.
    #[must_use]
    pub fn attribute(type_id: TypeId, value: Value) -> Self {
        Self {
            id: ThingId::for_attribute(type_id, &value),
            type_id,
            inferred: false,
            value: Some(value),
        }
    }

    /// Returns true if this instance is an attribute.
    #[must_use]
    pub const fn is_attribute(&self) -> bool {
        self.value.is_some()
    }
}
