//! Data insertion: resolves a batch of instance declarations into instances.
//!
//! A batch is flattened by [`ThingRegistry`] and then driven by an explicit
//! task stack. Resolving a variable creates (or looks up) its instance and
//! memoizes it immediately; role players and owned attributes are resolved
//! as follow-up tasks and attached once their own instance exists. Named
//! references share one registry entry, so they resolve once per batch;
//! every anonymous occurrence has its own entry and yields its own instance.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::concept::{Label, Thing, ThingId, TypeKind, TypeNode};
use crate::config::EngineConfig;
use crate::error::{GraphError, GraphResult, ReadError, ThingWriteError};
use crate::pattern::{
    scope_role, RegisteredPlayer, RegisteredVariable, ThingRegistry, ThingVariable, TypeRef,
    VarIndex,
};
use crate::value::{Value, ValueKind};

use super::ThingManager;

/// Reference name to instance IID.
///
/// Names are stored without the leading `$`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, ThingId>);

impl Bindings {
    /// Creates an empty binding map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `iid`, returning the previous binding.
    pub fn insert(&mut self, name: impl Into<String>, iid: ThingId) -> Option<ThingId> {
        let name = name.into();
        let name = match name.strip_prefix('$') {
            Some(stripped) => stripped.to_string(),
            None => name,
        };
        self.0.insert(name, iid)
    }

    /// Instance bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ThingId> {
        self.0.get(name.strip_prefix('$').unwrap_or(name)).copied()
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ThingId)> {
        self.0.iter().map(|(name, iid)| (name.as_str(), *iid))
    }
}

impl<S: Into<String>> FromIterator<(S, ThingId)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, ThingId)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (name, iid) in iter {
            bindings.insert(name, iid);
        }
        bindings
    }
}

enum Task {
    Resolve(VarIndex),
    AttachPlayer { relation: VarIndex, slot: usize },
    AttachHas { owner: VarIndex, attribute: VarIndex },
}

/// Inserts one batch of instance declarations.
pub struct Inserter<'a> {
    things: &'a ThingManager<'a>,
    config: &'a EngineConfig,
    registry: ThingRegistry,
    existing: &'a Bindings,
    inserted: HashMap<VarIndex, Thing>,
}

impl<'a> Inserter<'a> {
    /// Prepares a batch against `existing` bindings.
    #[must_use]
    pub fn new(
        things: &'a ThingManager<'a>,
        config: &'a EngineConfig,
        variables: &[ThingVariable],
        existing: &'a Bindings,
    ) -> Self {
        Self {
            things,
            config,
            registry: ThingRegistry::from_variables(variables),
            existing,
            inserted: HashMap::new(),
        }
    }

    /// Resolve every declaration and return the full binding map: the
    /// existing bindings plus every named reference resolved here.
    #[instrument(name = "inserter.execute", skip_all)]
    pub fn execute(mut self) -> GraphResult<Bindings> {
        self.config.check_batch_size(self.registry.len())?;
        debug!(
            variables = self.registry.len(),
            existing = self.existing.len(),
            "inserting batch"
        );

        for index in self.registry.execution_order() {
            self.run(index)?;
        }

        let mut bindings = self.existing.clone();
        for (index, thing) in &self.inserted {
            if let Some(name) = self.registry.get(*index).reference.name() {
                bindings.insert(name, thing.id);
            }
        }
        debug!(bindings = bindings.len(), "batch inserted");
        Ok(bindings)
    }

    fn run(&mut self, start: VarIndex) -> GraphResult<()> {
        let mut tasks = vec![Task::Resolve(start)];
        while let Some(task) = tasks.pop() {
            match task {
                Task::Resolve(index) => {
                    if self.inserted.contains_key(&index) {
                        continue;
                    }
                    let thing = self.resolve(index)?;
                    self.inserted.insert(index, thing);
                    self.schedule_edges(index, &mut tasks);
                }
                Task::AttachPlayer { relation, slot } => self.attach_player(relation, slot)?,
                Task::AttachHas { owner, attribute } => {
                    let owner = self.resolved(owner)?;
                    let attribute = self.resolved(attribute)?;
                    self.things.set_has(owner, attribute)?;
                }
            }
        }
        Ok(())
    }

    /// Queue the edges of `index` so each dependency resolves right before
    /// the edge that needs it. Players attach before owned attributes.
    fn schedule_edges(&self, index: VarIndex, tasks: &mut Vec<Task>) {
        let variable = self.registry.get(index);
        for attribute in variable.has().into_iter().rev() {
            tasks.push(Task::AttachHas {
                owner: index,
                attribute,
            });
            tasks.push(Task::Resolve(attribute));
        }
        if let Some(players) = variable.relations().first() {
            for (slot, player) in players.iter().enumerate().rev() {
                tasks.push(Task::AttachPlayer {
                    relation: index,
                    slot,
                });
                tasks.push(Task::Resolve(player.player));
            }
        }
    }

    fn resolved(&self, index: VarIndex) -> GraphResult<&Thing> {
        self.inserted
            .get(&index)
            .ok_or_else(|| GraphError::internal("variable attached before it was resolved"))
    }

    fn existing_binding(&self, variable: &RegisteredVariable) -> Option<ThingId> {
        variable
            .reference
            .name()
            .and_then(|name| self.existing.get(name))
    }

    #[instrument(name = "inserter.insert", skip_all, fields(reference = %self.registry.get(index).reference))]
    fn resolve(&self, index: VarIndex) -> GraphResult<Thing> {
        let variable = self.registry.get(index);
        let reference = variable.reference.to_string();
        let bound = self.existing_binding(variable);

        if let Some(iid) = bound {
            if variable.constraints.is_empty() {
                trace!("reusing existing binding");
                return self.things.expect_thing(iid);
            }
        }
        self.validate(variable, bound)?;
        if variable.relations().len() > 1 {
            return Err(ThingWriteError::TooManyRelationConstraints { reference }.into());
        }

        let thing = if let Some(iid) = bound {
            self.things.expect_thing(iid)?
        } else if let Some(iid) = variable.iid() {
            self.things.expect_thing(iid)?
        } else {
            return self.insert_isa(variable);
        };
        if !variable.relations().is_empty() {
            let node = self.things.thing_type(&thing)?;
            if node.kind != TypeKind::Relation {
                return Err(ReadError::InvalidTypeCast {
                    label: node.label,
                    expected: TypeKind::Relation.to_string(),
                    actual: node.kind.to_string(),
                }
                .into());
            }
        }
        Ok(thing)
    }

    fn validate(&self, variable: &RegisteredVariable, bound: Option<ThingId>) -> GraphResult<()> {
        let reference = variable.reference.to_string();
        let isa = variable.isa();
        if bound.is_some() {
            if let Some(iid) = variable.iid() {
                return Err(ThingWriteError::IidReassertion { reference, iid }.into());
            }
            if let Some(type_ref) = isa.first() {
                return Err(ThingWriteError::IsaReassertion {
                    reference,
                    label: type_ref_label(type_ref),
                }
                .into());
            }
        }
        if let (Some(iid), Some(type_ref)) = (variable.iid(), isa.first()) {
            return Err(ThingWriteError::IsaIidConflict {
                reference,
                iid,
                label: type_ref_label(type_ref),
            }
            .into());
        }
        if variable.has_is() {
            return Err(ThingWriteError::UnacceptedConstraint {
                constraint: "is".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn insert_isa(&self, variable: &RegisteredVariable) -> GraphResult<Thing> {
        let reference = variable.reference.to_string();
        let isa = variable.isa();
        let type_ref = match isa.as_slice() {
            [] => return Err(ThingWriteError::IsaMissing { reference }.into()),
            [type_ref] => *type_ref,
            _ => return Err(ThingWriteError::TooManyIsa { reference }.into()),
        };
        let label = match type_ref {
            TypeRef::Label(label) => label,
            TypeRef::Variable(_) => return Err(ThingWriteError::TypeVariable { reference }.into()),
        };
        let node = self.things.types().expect_type(label)?;
        if node.kind.is_thing() && !node.is_instantiable() {
            return Err(ThingWriteError::IllegalAbstractWrite { label: node.label }.into());
        }

        match node.kind {
            TypeKind::Entity => self.things.create_entity(&node),
            TypeKind::Attribute => self.insert_attribute(&node, variable),
            TypeKind::Relation => {
                if variable.relations().is_empty() {
                    return Err(ThingWriteError::RelationConstraintMissing { reference }.into());
                }
                self.things.create_relation(&node)
            }
            TypeKind::Role => Err(ReadError::InvalidTypeCast {
                label: node.label,
                expected: "thing".to_string(),
                actual: TypeKind::Role.to_string(),
            }
            .into()),
        }
    }

    fn insert_attribute(&self, node: &TypeNode, variable: &RegisteredVariable) -> GraphResult<Thing> {
        let value = match variable.values().as_slice() {
            [] => {
                return Err(ThingWriteError::ValueMissing {
                    reference: variable.reference.to_string(),
                    label: node.label.clone(),
                }
                .into())
            }
            [value] => *value,
            _ => {
                return Err(ThingWriteError::TooManyValues {
                    reference: variable.reference.to_string(),
                    label: node.label.clone(),
                }
                .into())
            }
        };
        let mismatch = |expected: ValueKind| -> GraphError {
            ThingWriteError::ValueKindMismatch {
                label: node.label.clone(),
                expected,
                actual: value.kind(),
            }
            .into()
        };
        let Some(value_kind) = node.value_kind else {
            return Err(ThingWriteError::IllegalAbstractWrite {
                label: node.label.clone(),
            }
            .into());
        };
        match (value_kind, value) {
            (ValueKind::Boolean, Value::Boolean(v)) => self.things.put_boolean(node, *v),
            (ValueKind::Long, Value::Long(v)) => self.things.put_long(node, *v),
            (ValueKind::Double, Value::Double(v)) => self.things.put_double(node, *v),
            (ValueKind::String, Value::String(v)) => self.things.put_string(node, v.as_str()),
            (ValueKind::DateTime, Value::DateTime(v)) => self.things.put_datetime(node, *v),
            (expected, _) => Err(mismatch(expected)),
        }
    }

    fn attach_player(&self, relation: VarIndex, slot: usize) -> GraphResult<()> {
        let variable = self.registry.get(relation);
        let RegisteredPlayer { role, player } = variable
            .relations()
            .first()
            .and_then(|players| players.get(slot))
            .cloned()
            .ok_or_else(|| GraphError::internal("role player slot out of range"))?;
        let relation_thing = self.resolved(relation)?;
        let player_thing = self.resolved(player)?;
        let relation_type = self.things.thing_type(relation_thing)?;
        let player_reference = self.registry.get(player).reference.to_string();

        let role = match role {
            Some(TypeRef::Label(label)) => {
                let scoped = scope_role(&label, Some(&relation_type.label));
                self.things.types().expect_role(&scoped)?
            }
            Some(TypeRef::Variable(_)) => {
                return Err(ThingWriteError::TypeVariable {
                    reference: player_reference,
                }
                .into())
            }
            None => self.infer_role(&relation_type, player_thing, player_reference)?,
        };
        self.things.add_player(relation_thing, &role, player_thing)
    }

    /// The single role of `relation_type` that the player's type can play.
    fn infer_role(
        &self,
        relation_type: &TypeNode,
        player: &Thing,
        reference: String,
    ) -> GraphResult<TypeNode> {
        let types = self.things.types();
        let player_type = self.things.thing_type(player)?;
        let playable = types.get_plays(&player_type)?;
        let mut candidates: Vec<TypeNode> = types
            .get_relates(relation_type)?
            .into_iter()
            .filter(|role| playable.contains(&role.id))
            .collect();
        match candidates.len() {
            0 => Err(ThingWriteError::RoleTypeMissing { reference }.into()),
            1 => {
                let role = candidates.remove(0);
                trace!(role = %role.label, player = %reference, "inferred role");
                Ok(role)
            }
            _ => Err(ThingWriteError::RoleTypeAmbiguous {
                reference,
                candidates: candidates.iter().map(|r| r.label.to_string()).collect(),
            }
            .into()),
        }
    }
}

fn type_ref_label(type_ref: &TypeRef) -> Label {
    match type_ref {
        TypeRef::Label(label) => label.clone(),
        TypeRef::Variable(name) => Label::new(format!("${name}")),
    }
}
