//! Type and rule declarations consumed by the definer.

use serde::{Deserialize, Serialize};

use crate::concept::Label;
use crate::pattern::{Conjunction, ThingVariable};
use crate::value::ValueKind;

/// One constraint of a type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeConstraint {
    /// `sub <label>`
    Sub {
        supertype: Label,
    },
    /// `value <kind>`
    ValueKind {
        value_kind: ValueKind,
    },
    /// `abstract`
    Abstract,
    /// `regex <pattern>`
    Regex {
        regex: String,
    },
    /// `relates <role> [as <overridden>]`; role names are unscoped here.
    Relates {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overridden: Option<String>,
    },
    /// `owns <attribute> [as <overridden>] [@key]`
    Owns {
        attribute: Label,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overridden: Option<Label>,
        #[serde(default)]
        is_key: bool,
    },
    /// `plays <relation:role> [as <relation:role>]`; labels are scoped.
    Plays {
        role: Label,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overridden: Option<Label>,
    },
}

/// A declaration of one type: a label plus the constraints to apply to it.
///
/// # Examples
///
/// ```
/// use typegraph::{TypeDeclaration, ValueKind};
///
/// let name = TypeDeclaration::new("name")
///     .sub("attribute")
///     .value_kind(ValueKind::String);
/// assert_eq!(name.sub_labels().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Type being declared.
    pub label: Label,
    /// Constraints, in declaration order.
    #[serde(default)]
    pub constraints: Vec<TypeConstraint>,
}

impl TypeDeclaration {
    /// Creates a declaration with no constraints.
    #[must_use]
    pub fn new(label: impl Into<Label>) -> Self {
        Self {
            label: label.into(),
            constraints: Vec::new(),
        }
    }

    /// Appends a constraint.
    #[must_use]
    pub fn with(mut self, constraint: TypeConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Declare the supertype.
    #[must_use]
    pub fn sub(self, supertype: impl Into<Label>) -> Self {
        self.with(TypeConstraint::Sub {
            supertype: supertype.into(),
        })
    }

    /// Declare the value kind of an attribute type.
    #[must_use]
    pub fn value_kind(self, value_kind: ValueKind) -> Self {
        self.with(TypeConstraint::ValueKind { value_kind })
    }

    /// Mark the type abstract.
    #[must_use]
    pub fn set_abstract(self) -> Self {
        self.with(TypeConstraint::Abstract)
    }

    /// Constrain string values by `regex`.
    #[must_use]
    pub fn regex(self, regex: impl Into<String>) -> Self {
        self.with(TypeConstraint::Regex {
            regex: regex.into(),
        })
    }

    /// Relate a role, scoped by this relation.
    #[must_use]
    pub fn relates(self, role: impl Into<String>) -> Self {
        self.with(TypeConstraint::Relates {
            role: role.into(),
            overridden: None,
        })
    }

    /// Relate `role`, overriding the inherited role `overridden`.
    #[must_use]
    pub fn relates_as(self, role: impl Into<String>, overridden: impl Into<String>) -> Self {
        self.with(TypeConstraint::Relates {
            role: role.into(),
            overridden: Some(overridden.into()),
        })
    }

    /// Let instances own `attribute`.
    #[must_use]
    pub fn owns(self, attribute: impl Into<Label>) -> Self {
        self.with(TypeConstraint::Owns {
            attribute: attribute.into(),
            overridden: None,
            is_key: false,
        })
    }

    /// Let instances own `attribute` as a key.
    #[must_use]
    pub fn owns_key(self, attribute: impl Into<Label>) -> Self {
        self.with(TypeConstraint::Owns {
            attribute: attribute.into(),
            overridden: None,
            is_key: true,
        })
    }

    /// Own `attribute`, overriding the inherited ownership of `overridden`.
    #[must_use]
    pub fn owns_as(self, attribute: impl Into<Label>, overridden: impl Into<Label>) -> Self {
        self.with(TypeConstraint::Owns {
            attribute: attribute.into(),
            overridden: Some(overridden.into()),
            is_key: false,
        })
    }

    /// Let instances play `role`.
    #[must_use]
    pub fn plays(self, role: impl Into<Label>) -> Self {
        self.with(TypeConstraint::Plays {
            role: role.into(),
            overridden: None,
        })
    }

    /// Play `role`, overriding the inherited play of `overridden`.
    #[must_use]
    pub fn plays_as(self, role: impl Into<Label>, overridden: impl Into<Label>) -> Self {
        self.with(TypeConstraint::Plays {
            role: role.into(),
            overridden: Some(overridden.into()),
        })
    }

    /// Labels named by `sub` constraints.
    pub fn sub_labels(&self) -> impl Iterator<Item = &Label> {
        self.constraints.iter().filter_map(|c| match c {
            TypeConstraint::Sub { supertype } => Some(supertype),
            _ => None,
        })
    }

    /// The supertype label if exactly one `sub` constraint is present.
    #[must_use]
    pub fn single_sub(&self) -> Option<&Label> {
        let mut subs = self.sub_labels();
        match (subs.next(), subs.next()) {
            (Some(sup), None) => Some(sup),
            _ => None,
        }
    }

    /// The declared value kind, if any. The first one wins.
    #[must_use]
    pub fn declared_value_kind(&self) -> Option<ValueKind> {
        self.constraints.iter().find_map(|c| match c {
            TypeConstraint::ValueKind { value_kind } => Some(*value_kind),
            _ => None,
        })
    }

    /// Returns true if an `abstract` constraint is present.
    #[must_use]
    pub fn declares_abstract(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, TypeConstraint::Abstract))
    }

    /// The declared regex, if any.
    #[must_use]
    pub fn declared_regex(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            TypeConstraint::Regex { regex } => Some(regex.as_str()),
            _ => None,
        })
    }
}

/// A named rule: when `when` matches, `then` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDeclaration {
    /// Unique rule label.
    pub label: String,
    /// Condition pattern.
    pub when: Conjunction,
    /// Concluded instance pattern.
    pub then: ThingVariable,
}

impl RuleDeclaration {
    /// Creates a rule declaration.
    #[must_use]
    pub fn new(label: impl Into<String>, when: Conjunction, then: ThingVariable) -> Self {
        Self {
            label: label.into(),
            when,
            then,
        }
    }
}
