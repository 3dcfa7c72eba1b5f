//! Instance declarations and rule patterns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::concept::{Label, ThingId};
use crate::value::Value;

/// How a thing variable is referred to.
///
/// Named references are shared across a batch; every anonymous occurrence
/// denotes a distinct instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// A named reference such as `$p`.
    Named(String),
    /// An unnamed occurrence.
    Anonymous,
}

impl Reference {
    /// Creates a named reference. A leading `$` is stripped.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix('$') {
            Some(stripped) => Self::Named(stripped.to_string()),
            None => Self::Named(name),
        }
    }

    /// Returns true for anonymous references.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// The name, for named references.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Anonymous => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "${name}"),
            Self::Anonymous => write!(f, "$_"),
        }
    }
}

/// A reference to a type: either a label or a type variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// A type label.
    Label(Label),
    /// A type variable.
    Variable(String),
}

impl TypeRef {
    /// The label, if this is a labelled reference.
    #[must_use]
    pub const fn label(&self) -> Option<&Label> {
        match self {
            Self::Label(label) => Some(label),
            Self::Variable(_) => None,
        }
    }
}

impl From<Label> for TypeRef {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl From<&str> for TypeRef {
    fn from(label: &str) -> Self {
        Self::Label(Label::from(label))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}"),
            Self::Variable(name) => write!(f, "${name}"),
        }
    }
}

/// One slot of a relation shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePlayer {
    /// Explicit role; inferred from the player's type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TypeRef>,
    /// The player variable.
    pub player: ThingVariable,
}

impl RolePlayer {
    /// A slot whose role is inferred.
    #[must_use]
    pub const fn new(player: ThingVariable) -> Self {
        Self { role: None, player }
    }

    /// A slot with an explicit role.
    #[must_use]
    pub fn with_role(role: impl Into<TypeRef>, player: ThingVariable) -> Self {
        Self {
            role: Some(role.into()),
            player,
        }
    }
}

/// One constraint of a thing variable.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThingConstraint {
    /// Bind to an existing instance.
    Iid { iid: ThingId },
    /// Type of the instance.
    Isa { type_ref: TypeRef },
    /// Value of an attribute instance.
    Value { value: Value },
    /// Role players of a relation instance.
    Relation { players: Vec<RolePlayer> },
    /// Owned attribute.
    Has { attribute: ThingVariable },
    /// Co-reference with another variable.
    Is { other: Reference },
}

impl ThingConstraint {
    /// Short keyword used in error messages.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Iid { .. } => "iid",
            Self::Isa { .. } => "isa",
            Self::Value { .. } => "value",
            Self::Relation { .. } => "relation",
            Self::Has { .. } => "has",
            Self::Is { .. } => "is",
        }
    }
}

/// A thing variable: a reference plus the constraints declared on it.
///
/// Nested variables (players, owned attributes) are declared inline.
///
/// # Examples
///
/// ```
/// use typegraph::pattern::ThingVariable;
///
/// let alice = ThingVariable::named("p")
///     .isa("person")
///     .has(ThingVariable::anonymous().isa("name").value("Alice"));
/// assert_eq!(alice.constraints.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingVariable {
    /// The referenced instance.
    pub reference: Reference,
    /// Constraints on the instance.
    #[serde(default)]
    pub constraints: Vec<ThingConstraint>,
}

impl ThingVariable {
    /// A variable named `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            reference: Reference::named(name),
            constraints: Vec::new(),
        }
    }

    /// An anonymous variable.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            reference: Reference::Anonymous,
            constraints: Vec::new(),
        }
    }

    /// Appends a constraint.
    #[must_use]
    pub fn with(mut self, constraint: ThingConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Bind to the instance with IID `iid`.
    #[must_use]
    pub fn iid(self, iid: ThingId) -> Self {
        self.with(ThingConstraint::Iid { iid })
    }

    /// Constrain the type.
    #[must_use]
    pub fn isa(self, type_ref: impl Into<TypeRef>) -> Self {
        self.with(ThingConstraint::Isa {
            type_ref: type_ref.into(),
        })
    }

    /// Constrain the attribute value.
    #[must_use]
    pub fn value(self, value: impl Into<Value>) -> Self {
        self.with(ThingConstraint::Value {
            value: value.into(),
        })
    }

    /// Add a relation shape.
    #[must_use]
    pub fn relation(self, players: Vec<RolePlayer>) -> Self {
        self.with(ThingConstraint::Relation { players })
    }

    /// Own `attribute`.
    #[must_use]
    pub fn has(self, attribute: Self) -> Self {
        self.with(ThingConstraint::Has { attribute })
    }

    /// Declare equality with the reference `other`.
    #[must_use]
    pub fn is(self, other: impl Into<String>) -> Self {
        self.with(ThingConstraint::Is {
            other: Reference::named(other),
        })
    }

    /// The first labelled `isa` of this variable.
    #[must_use]
    pub fn isa_label(&self) -> Option<&Label> {
        self.constraints.iter().find_map(|c| match c {
            ThingConstraint::Isa { type_ref } => type_ref.label(),
            _ => None,
        })
    }
}

/// A negated disjunction of conjunctions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Negation {
    /// Alternatives, each a conjunction.
    pub disjunction: Vec<Conjunction>,
}

impl Negation {
    /// Creates a negation.
    #[must_use]
    pub const fn new(disjunction: Vec<Conjunction>) -> Self {
        Self { disjunction }
    }
}

/// A conjunction of thing variables and negations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Conjunction {
    /// Positive variables.
    #[serde(default)]
    pub variables: Vec<ThingVariable>,
    /// Negated sub-patterns.
    #[serde(default)]
    pub negations: Vec<Negation>,
}

impl Conjunction {
    /// Creates a conjunction without negations.
    #[must_use]
    pub const fn new(variables: Vec<ThingVariable>) -> Self {
        Self {
            variables,
            negations: Vec::new(),
        }
    }

    /// Add a negated sub-pattern.
    #[must_use]
    pub fn not(mut self, negation: Negation) -> Self {
        self.negations.push(negation);
        self
    }
}

/// Collects every labelled type reference reachable from `variable`.
///
/// Unscoped role labels in a relation shape are scoped by the variable's
/// `isa` label when it has one.
pub(crate) fn type_labels(variable: &ThingVariable, out: &mut Vec<Label>) {
    let mut pending = vec![variable];
    while let Some(var) = pending.pop() {
        let owner = var.isa_label();
        for constraint in &var.constraints {
            match constraint {
                ThingConstraint::Isa { type_ref } => {
                    if let Some(label) = type_ref.label() {
                        out.push(label.clone());
                    }
                }
                ThingConstraint::Relation { players } => {
                    for slot in players {
                        if let Some(role) = slot.role.as_ref().and_then(TypeRef::label) {
                            out.push(scope_role(role, owner));
                        }
                        pending.push(&slot.player);
                    }
                }
                ThingConstraint::Has { attribute } => pending.push(attribute),
                ThingConstraint::Iid { .. }
                | ThingConstraint::Value { .. }
                | ThingConstraint::Is { .. } => {}
            }
        }
    }
}

/// Scopes an unscoped role label by its relation label.
pub(crate) fn scope_role(role: &Label, relation: Option<&Label>) -> Label {
    match relation {
        Some(relation) if !role.is_scoped() => role.with_scope(relation.name()),
        _ => role.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_strips_dollar() {
        assert_eq!(Reference::named("$x"), Reference::named("x"));
        assert_eq!(Reference::named("x").to_string(), "$x");
        assert!(Reference::Anonymous.is_anonymous());
    }

    #[test]
    fn test_type_labels_scopes_roles_by_owner() {
        let var = ThingVariable::anonymous()
            .isa("employment")
            .relation(vec![
                RolePlayer::with_role("employee", ThingVariable::named("x").isa("person")),
                RolePlayer::new(ThingVariable::named("y")),
            ]);
        let mut labels = Vec::new();
        type_labels(&var, &mut labels);
        assert!(labels.contains(&Label::new("employment")));
        assert!(labels.contains(&Label::scoped("employee", "employment")));
        assert!(labels.contains(&Label::new("person")));
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_type_labels_skip_type_variables() {
        let var = ThingVariable::named("x")
            .with(ThingConstraint::Isa {
                type_ref: TypeRef::Variable("t".to_string()),
            })
            .has(ThingVariable::anonymous().isa("name"));
        let mut labels = Vec::new();
        type_labels(&var, &mut labels);
        assert_eq!(labels, vec![Label::new("name")]);
    }

    #[test]
    fn test_constraint_keyword() {
        let c = ThingConstraint::Is {
            other: Reference::named("y"),
        };
        assert_eq!(c.keyword(), "is");
    }
}
