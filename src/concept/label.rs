//! Type labels.
//!
//! Unscoped labels share one namespace. Role labels are scoped by the label
//! of the relation type that relates them, so `employment:employee` and
//! `marriage:employee` are different types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A type label with an optional scope.
///
/// # Examples
///
/// ```
/// use typegraph::Label;
///
/// let role = Label::scoped("employee", "employment");
/// assert_eq!(role.to_string(), "employment:employee");
/// assert!(Label::new("person").scope().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

impl Label {
    /// Creates an unscoped label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    /// Creates a label scoped by a relation type label.
    #[must_use]
    pub fn scoped(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Some(scope.into()),
        }
    }

    /// The unscoped part of the label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope, present only for role labels.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Returns true if this label is scoped.
    #[must_use]
    pub const fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Returns a copy of this label with its name replaced, keeping the scope.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: self.scope.clone(),
        }
    }

    /// Returns a copy of this label with its scope replaced.
    #[must_use]
    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            scope: Some(scope.into()),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{scope}:{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Label {
    /// Parses `scope:name` into a scoped label, anything else into an unscoped one.
    fn from(s: &str) -> Self {
        match s.split_once(':') {
            Some((scope, name)) => Self::scoped(name, scope),
            None => Self::new(s),
        }
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_display() {
        assert_eq!(Label::scoped("wife", "marriage").to_string(), "marriage:wife");
        assert_eq!(Label::new("person").to_string(), "person");
    }

    #[test]
    fn test_from_str_splits_scope() {
        let label = Label::from("employment:employee");
        assert_eq!(label.name(), "employee");
        assert_eq!(label.scope(), Some("employment"));
        assert_eq!(Label::from("name"), Label::new("name"));
    }

    #[test]
    fn test_namespaces_are_distinct() {
        assert_ne!(Label::new("employee"), Label::scoped("employee", "employment"));
        assert_ne!(
            Label::scoped("employee", "employment"),
            Label::scoped("employee", "contract")
        );
    }

    #[test]
    fn test_with_name_keeps_scope() {
        let renamed = Label::scoped("employee", "employment").with_name("staff");
        assert_eq!(renamed, Label::scoped("staff", "employment"));
    }
}
