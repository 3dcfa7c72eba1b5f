//! Rule nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pattern::{Conjunction, ThingVariable};

/// Unique identifier for a rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(Uuid);

impl RuleId {
    /// Creates a new random rule ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three kinds of index edges from a rule to the types it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleIndexKind {
    /// Types referenced by non-negated parts of `when`.
    ConditionPositive,
    /// Types referenced inside negations of `when`.
    ConditionNegative,
    /// Types produced by executing `then`.
    Conclusion,
}

impl RuleIndexKind {
    /// Every index kind, in write order.
    pub const ALL: [Self; 3] = [
        Self::ConditionPositive,
        Self::ConditionNegative,
        Self::Conclusion,
    ];
}

impl fmt::Display for RuleIndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionPositive => write!(f, "condition-positive"),
            Self::ConditionNegative => write!(f, "condition-negative"),
            Self::Conclusion => write!(f, "conclusion"),
        }
    }
}

/// A named conditional inference.
///
/// The patterns are stored as given; the type references they contain are
/// indexed separately as edges (see `RuleIndexer`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleNode {
    /// Stable identifier.
    pub id: RuleId,
    /// Unique rule label.
    pub label: String,
    /// Condition pattern.
    pub when: Conjunction,
    /// Concluded instance pattern.
    pub then: ThingVariable,
}

impl RuleNode {
    /// Creates a new rule node.
    #[must_use]
    pub fn new(label: impl Into<String>, when: Conjunction, then: ThingVariable) -> Self {
        Self {
            id: RuleId::new(),
            label: label.into(),
            when,
            then,
        }
    }
}
