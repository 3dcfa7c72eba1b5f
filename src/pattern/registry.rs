//! Flattening of nested thing variables.
//!
//! Instance declarations arrive as trees: a `has` or a role-player slot
//! declares its variable inline. The registry turns a batch of such trees
//! into a flat table where nested variables are replaced by indices, and
//! where every occurrence of the same named reference shares one entry with
//! the union of its constraints. Each anonymous occurrence gets its own entry.

use std::collections::HashMap;

use crate::concept::ThingId;
use crate::pattern::{Reference, ThingConstraint, ThingVariable, TypeRef};
use crate::value::Value;

/// Index of a variable in a [`ThingRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarIndex(usize);

/// A role-player slot whose player has been registered.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredPlayer {
    /// Declared role, if any.
    pub role: Option<TypeRef>,
    /// Player variable.
    pub player: VarIndex,
}

/// A constraint whose nested variables have been registered.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisteredConstraint {
    /// Instance IID.
    Iid(ThingId),
    /// Instance type.
    Isa(TypeRef),
    /// Attribute value.
    Value(Value),
    /// Role players of one relation shape.
    Relation(Vec<RegisteredPlayer>),
    /// Owned attribute variable.
    Has(VarIndex),
    /// Equality with another reference.
    Is(Reference),
}

/// A variable with the merged constraints of all its occurrences.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredVariable {
    /// Reference shared by all merged occurrences.
    pub reference: Reference,
    /// Merged constraints, repeats of identity constraints collapsed.
    pub constraints: Vec<RegisteredConstraint>,
}

impl RegisteredVariable {
    fn new(reference: Reference) -> Self {
        Self {
            reference,
            constraints: Vec::new(),
        }
    }

    /// The first IID constraint, if any.
    #[must_use]
    pub fn iid(&self) -> Option<ThingId> {
        self.constraints.iter().find_map(|c| match c {
            RegisteredConstraint::Iid(iid) => Some(*iid),
            _ => None,
        })
    }

    /// Every `isa` constraint.
    #[must_use]
    pub fn isa(&self) -> Vec<&TypeRef> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                RegisteredConstraint::Isa(type_ref) => Some(type_ref),
                _ => None,
            })
            .collect()
    }

    /// Every value literal.
    #[must_use]
    pub fn values(&self) -> Vec<&Value> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                RegisteredConstraint::Value(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Every relation shape.
    #[must_use]
    pub fn relations(&self) -> Vec<&[RegisteredPlayer]> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                RegisteredConstraint::Relation(players) => Some(players.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Every owned attribute variable.
    #[must_use]
    pub fn has(&self) -> Vec<VarIndex> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                RegisteredConstraint::Has(index) => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Returns true if any `is` constraint is present.
    #[must_use]
    pub fn has_is(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, RegisteredConstraint::Is(_)))
    }
}

/// Flat table of the variables of one batch.
#[derive(Debug, Clone, Default)]
pub struct ThingRegistry {
    variables: Vec<RegisteredVariable>,
    by_name: HashMap<String, VarIndex>,
    top_level: Vec<VarIndex>,
}

impl ThingRegistry {
    /// Registers every variable of `variables`, including nested ones.
    #[must_use]
    pub fn from_variables(variables: &[ThingVariable]) -> Self {
        let mut registry = Self::default();
        for variable in variables {
            let index = registry.register(variable);
            if !registry.top_level.contains(&index) {
                registry.top_level.push(index);
            }
        }
        registry
    }

    fn slot(&mut self, reference: &Reference) -> VarIndex {
        if let Reference::Named(name) = reference {
            if let Some(index) = self.by_name.get(name) {
                return *index;
            }
        }
        let index = VarIndex(self.variables.len());
        self.variables.push(RegisteredVariable::new(reference.clone()));
        if let Reference::Named(name) = reference {
            self.by_name.insert(name.clone(), index);
        }
        index
    }

    fn register(&mut self, variable: &ThingVariable) -> VarIndex {
        let root = self.slot(&variable.reference);
        let mut pending = vec![(root, variable)];
        while let Some((index, var)) = pending.pop() {
            for constraint in &var.constraints {
                let registered = match constraint {
                    ThingConstraint::Iid { iid } => RegisteredConstraint::Iid(*iid),
                    ThingConstraint::Isa { type_ref } => RegisteredConstraint::Isa(type_ref.clone()),
                    ThingConstraint::Value { value } => RegisteredConstraint::Value(value.clone()),
                    ThingConstraint::Is { other } => RegisteredConstraint::Is(other.clone()),
                    ThingConstraint::Has { attribute } => {
                        let child = self.slot(&attribute.reference);
                        pending.push((child, attribute));
                        RegisteredConstraint::Has(child)
                    }
                    ThingConstraint::Relation { players } => {
                        let mut slots = Vec::with_capacity(players.len());
                        for slot in players {
                            let child = self.slot(&slot.player.reference);
                            pending.push((child, &slot.player));
                            slots.push(RegisteredPlayer {
                                role: slot.role.clone(),
                                player: child,
                            });
                        }
                        RegisteredConstraint::Relation(slots)
                    }
                };
                let constraints = &mut self.variables[index.0].constraints;
                let repeated = matches!(
                    registered,
                    RegisteredConstraint::Iid(_)
                        | RegisteredConstraint::Isa(_)
                        | RegisteredConstraint::Value(_)
                        | RegisteredConstraint::Is(_)
                ) && constraints.contains(&registered);
                if !repeated {
                    constraints.push(registered);
                }
            }
        }
        root
    }

    /// The variable at `index`. Indices are only handed out by this registry.
    #[must_use]
    pub fn get(&self, index: VarIndex) -> &RegisteredVariable {
        &self.variables[index.0]
    }

    /// Number of registered variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns true if nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables to resolve, in order: the top-level ones plus every named
    /// nested one. Anonymous nested variables are reached through their parent.
    #[must_use]
    pub fn execution_order(&self) -> Vec<VarIndex> {
        (0..self.variables.len())
            .map(VarIndex)
            .filter(|index| {
                self.top_level.contains(index) || !self.variables[index.0].reference.is_anonymous()
            })
            .collect()
    }
}
