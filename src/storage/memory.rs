//! In-memory storage backend.
//!
//! This module provides thread-safe in-memory implementations of the storage traits.
//! It is intended for embedded usage, tests, and as a reference implementation.
//!
//! Transactions are implemented by snapshotting the whole state on `begin`
//! and restoring it on `rollback`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::concept::{
    Label, Root, RuleId, RuleIndexKind, RuleNode, Thing, ThingId, TypeId, TypeNode, TypeStatus,
};
use crate::storage::traits::{
    OwnsEdge, PlaysEdge, RolePlayer, SchemaStore, StorageError, ThingStore,
};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug, Clone, Default)]
struct SchemaState {
    types: HashMap<TypeId, TypeNode>,
    by_label: HashMap<Label, TypeId>,
    sub: HashMap<TypeId, TypeId>,
    subtypes: HashMap<TypeId, BTreeSet<TypeId>>,
    relates: HashMap<TypeId, Vec<TypeId>>,
    owns: HashMap<TypeId, Vec<OwnsEdge>>,
    plays: HashMap<TypeId, Vec<PlaysEdge>>,
    rules: HashMap<RuleId, RuleNode>,
    rules_by_label: HashMap<String, RuleId>,
    rule_edges: HashMap<(RuleId, RuleIndexKind), BTreeSet<TypeId>>,
    rule_edges_in: HashMap<(TypeId, RuleIndexKind), BTreeSet<RuleId>>,
}

impl SchemaState {
    fn seeded() -> Self {
        let mut state = Self::default();
        for root in Root::ALL {
            let node = TypeNode::root(root);
            state.by_label.insert(node.label.clone(), node.id);
            state.types.insert(node.id, node);
        }
        // The root relation relates the root role.
        let relation = state.by_label.get(&Root::Relation.label()).copied();
        let role = state.by_label.get(&Root::Role.label()).copied();
        if let (Some(relation), Some(role)) = (relation, role) {
            state.relates.entry(relation).or_default().push(role);
        }
        state
    }

    fn ensure_type(&self, id: TypeId) -> Result<(), StorageError> {
        if self.types.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::TypeNotFound(id))
        }
    }

    fn remove_rule_edges(&mut self, rule: RuleId, kind: RuleIndexKind) {
        let Some(targets) = self.rule_edges.remove(&(rule, kind)) else {
            return;
        };
        for target in targets {
            if let Some(rules) = self.rule_edges_in.get_mut(&(target, kind)) {
                rules.remove(&rule);
                if rules.is_empty() {
                    self.rule_edges_in.remove(&(target, kind));
                }
            }
        }
    }
}

/// Thread-safe in-memory schema store, seeded with the four root types.
#[derive(Debug)]
pub struct InMemorySchemaStore {
    state: RwLock<SchemaState>,
    checkpoint: RwLock<Option<SchemaState>>,
}

impl InMemorySchemaStore {
    /// Create a new store holding only the root types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SchemaState::seeded()),
            checkpoint: RwLock::new(None),
        }
    }
}

impl Default for InMemorySchemaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn create_type(&self, node: TypeNode) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("type.create"))?;
        if state.types.contains_key(&node.id) {
            return Err(StorageError::DuplicateKey(node.id.to_string()));
        }
        if state.by_label.contains_key(&node.label) {
            return Err(StorageError::DuplicateKey(node.label.to_string()));
        }
        state.by_label.insert(node.label.clone(), node.id);
        state.types.insert(node.id, node);
        Ok(())
    }

    fn get_type(&self, id: TypeId) -> Result<Option<TypeNode>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("type.get"))?;
        Ok(state.types.get(&id).cloned())
    }

    fn get_type_by_label(&self, label: &Label) -> Result<Option<TypeNode>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("type.get_by_label"))?;
        Ok(state
            .by_label
            .get(label)
            .and_then(|id| state.types.get(id))
            .cloned())
    }

    fn update_type(&self, node: TypeNode) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("type.update"))?;
        let prev_label = state
            .types
            .get(&node.id)
            .map(|prev| prev.label.clone())
            .ok_or(StorageError::TypeNotFound(node.id))?;

        if prev_label != node.label {
            if state.by_label.contains_key(&node.label) {
                return Err(StorageError::DuplicateKey(node.label.to_string()));
            }
            state.by_label.remove(&prev_label);
            state.by_label.insert(node.label.clone(), node.id);
        }
        state.types.insert(node.id, node);
        Ok(())
    }

    fn list_types(&self) -> Result<Vec<TypeNode>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("type.list"))?;
        Ok(state.types.values().cloned().collect())
    }

    fn set_sub(&self, sub: TypeId, sup: TypeId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("type.set_sub"))?;
        state.ensure_type(sub)?;
        state.ensure_type(sup)?;
        if let Some(prev) = state.sub.insert(sub, sup) {
            if let Some(children) = state.subtypes.get_mut(&prev) {
                children.remove(&sub);
            }
        }
        state.subtypes.entry(sup).or_default().insert(sub);
        Ok(())
    }

    fn get_sub(&self, id: TypeId) -> Result<Option<TypeId>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("type.get_sub"))?;
        Ok(state.sub.get(&id).copied())
    }

    fn get_direct_subtypes(&self, id: TypeId) -> Result<Vec<TypeId>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("type.get_direct_subtypes"))?;
        Ok(state
            .subtypes
            .get(&id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default())
    }

    fn put_relates(&self, relation: TypeId, role: TypeId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("type.put_relates"))?;
        state.ensure_type(relation)?;
        state.ensure_type(role)?;
        let roles = state.relates.entry(relation).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
        Ok(())
    }

    fn get_relates(&self, relation: TypeId) -> Result<Vec<TypeId>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("type.get_relates"))?;
        Ok(state.relates.get(&relation).cloned().unwrap_or_default())
    }

    fn put_owns(&self, owner: TypeId, edge: OwnsEdge) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("type.put_owns"))?;
        state.ensure_type(owner)?;
        state.ensure_type(edge.attribute)?;
        let edges = state.owns.entry(owner).or_default();
        edges.retain(|e| e.attribute != edge.attribute);
        edges.push(edge);
        Ok(())
    }

    fn get_owns(&self, owner: TypeId) -> Result<Vec<OwnsEdge>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("type.get_owns"))?;
        Ok(state.owns.get(&owner).cloned().unwrap_or_default())
    }

    fn put_plays(&self, player: TypeId, edge: PlaysEdge) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("type.put_plays"))?;
        state.ensure_type(player)?;
        state.ensure_type(edge.role)?;
        let edges = state.plays.entry(player).or_default();
        edges.retain(|e| e.role != edge.role);
        edges.push(edge);
        Ok(())
    }

    fn get_plays(&self, player: TypeId) -> Result<Vec<PlaysEdge>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("type.get_plays"))?;
        Ok(state.plays.get(&player).cloned().unwrap_or_default())
    }

    fn create_rule(&self, rule: RuleNode) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("rule.create"))?;
        if state.rules.contains_key(&rule.id) {
            return Err(StorageError::DuplicateKey(rule.id.to_string()));
        }
        if state.rules_by_label.contains_key(&rule.label) {
            return Err(StorageError::DuplicateKey(rule.label.clone()));
        }
        state.rules_by_label.insert(rule.label.clone(), rule.id);
        state.rules.insert(rule.id, rule);
        Ok(())
    }

    fn update_rule(&self, rule: RuleNode) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("rule.update"))?;
        let prev_label = state
            .rules
            .get(&rule.id)
            .map(|prev| prev.label.clone())
            .ok_or(StorageError::RuleNotFound(rule.id))?;

        if prev_label != rule.label {
            if state.rules_by_label.contains_key(&rule.label) {
                return Err(StorageError::DuplicateKey(rule.label.clone()));
            }
            state.rules_by_label.remove(&prev_label);
            state.rules_by_label.insert(rule.label.clone(), rule.id);
        }
        state.rules.insert(rule.id, rule);
        Ok(())
    }

    fn get_rule(&self, id: RuleId) -> Result<Option<RuleNode>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("rule.get"))?;
        Ok(state.rules.get(&id).cloned())
    }

    fn get_rule_by_label(&self, label: &str) -> Result<Option<RuleNode>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("rule.get_by_label"))?;
        Ok(state
            .rules_by_label
            .get(label)
            .and_then(|id| state.rules.get(id))
            .cloned())
    }

    fn delete_rule(&self, id: RuleId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("rule.delete"))?;
        let prev = state
            .rules
            .remove(&id)
            .ok_or(StorageError::RuleNotFound(id))?;
        state.rules_by_label.remove(&prev.label);
        for kind in RuleIndexKind::ALL {
            state.remove_rule_edges(id, kind);
        }
        Ok(())
    }

    fn put_rule_edge(
        &self,
        rule: RuleId,
        kind: RuleIndexKind,
        target: TypeId,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("rule.put_edge"))?;
        if !state.rules.contains_key(&rule) {
            return Err(StorageError::RuleNotFound(rule));
        }
        state.ensure_type(target)?;
        state
            .rule_edges
            .entry((rule, kind))
            .or_default()
            .insert(target);
        state
            .rule_edges_in
            .entry((target, kind))
            .or_default()
            .insert(rule);
        Ok(())
    }

    fn delete_rule_edges(&self, rule: RuleId, kind: RuleIndexKind) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("rule.delete_edges"))?;
        state.remove_rule_edges(rule, kind);
        Ok(())
    }

    fn get_rule_edges(
        &self,
        rule: RuleId,
        kind: RuleIndexKind,
    ) -> Result<Vec<TypeId>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("rule.get_edges"))?;
        Ok(state
            .rule_edges
            .get(&(rule, kind))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default())
    }

    fn get_rules_for_type(
        &self,
        target: TypeId,
        kind: RuleIndexKind,
    ) -> Result<Vec<RuleId>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("rule.get_rules_for_type"))?;
        Ok(state
            .rule_edges_in
            .get(&(target, kind))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default())
    }

    fn begin(&self) -> Result<(), StorageError> {
        let state = self.state.read().map_err(|_| lock_err("schema.begin"))?;
        let mut checkpoint = self
            .checkpoint
            .write()
            .map_err(|_| lock_err("schema.begin"))?;
        if checkpoint.is_some() {
            return Err(StorageError::Transaction(
                "schema transaction already open".to_string(),
            ));
        }
        *checkpoint = Some(state.clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let mut checkpoint = self
            .checkpoint
            .write()
            .map_err(|_| lock_err("schema.commit"))?;
        if checkpoint.take().is_none() {
            return Err(StorageError::Transaction(
                "no open schema transaction to commit".to_string(),
            ));
        }
        let mut state = self.state.write().map_err(|_| lock_err("schema.commit"))?;
        for node in state.types.values_mut() {
            node.status = TypeStatus::Committed;
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), StorageError> {
        let mut checkpoint = self
            .checkpoint
            .write()
            .map_err(|_| lock_err("schema.rollback"))?;
        let Some(saved) = checkpoint.take() else {
            return Err(StorageError::Transaction(
                "no open schema transaction to roll back".to_string(),
            ));
        };
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("schema.rollback"))?;
        *state = saved;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct ThingState {
    by_id: HashMap<ThingId, Thing>,
    by_type: HashMap<TypeId, Vec<ThingId>>,
    has: HashMap<ThingId, Vec<ThingId>>,
    players: HashMap<ThingId, Vec<RolePlayer>>,
}

/// Thread-safe in-memory thing store.
#[derive(Debug, Default)]
pub struct InMemoryThingStore {
    state: RwLock<ThingState>,
    checkpoint: RwLock<Option<ThingState>>,
}

impl InMemoryThingStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThingStore for InMemoryThingStore {
    fn insert(&self, thing: Thing) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("thing.insert"))?;
        if state.by_id.contains_key(&thing.id) {
            return Err(StorageError::DuplicateKey(thing.id.to_string()));
        }
        state.by_type.entry(thing.type_id).or_default().push(thing.id);
        state.by_id.insert(thing.id, thing);
        Ok(())
    }

    fn get(&self, id: ThingId) -> Result<Option<Thing>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("thing.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn find_by_type(&self, type_id: TypeId) -> Result<Vec<Thing>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("thing.find_by_type"))?;
        let Some(ids) = state.by_type.get(&type_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect())
    }

    fn put_has(&self, owner: ThingId, attribute: ThingId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("thing.put_has"))?;
        if !state.by_id.contains_key(&owner) {
            return Err(StorageError::ThingNotFound(owner));
        }
        if !state.by_id.contains_key(&attribute) {
            return Err(StorageError::ThingNotFound(attribute));
        }
        let owned = state.has.entry(owner).or_default();
        if !owned.contains(&attribute) {
            owned.push(attribute);
        }
        Ok(())
    }

    fn get_has(&self, owner: ThingId) -> Result<Vec<ThingId>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("thing.get_has"))?;
        Ok(state.has.get(&owner).cloned().unwrap_or_default())
    }

    fn add_player(&self, relation: ThingId, player: RolePlayer) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("thing.add_player"))?;
        if !state.by_id.contains_key(&relation) {
            return Err(StorageError::ThingNotFound(relation));
        }
        if !state.by_id.contains_key(&player.player) {
            return Err(StorageError::ThingNotFound(player.player));
        }
        state.players.entry(relation).or_default().push(player);
        Ok(())
    }

    fn get_players(&self, relation: ThingId) -> Result<Vec<RolePlayer>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("thing.get_players"))?;
        Ok(state.players.get(&relation).cloned().unwrap_or_default())
    }

    fn begin(&self) -> Result<(), StorageError> {
        let state = self.state.read().map_err(|_| lock_err("thing.begin"))?;
        let mut checkpoint = self
            .checkpoint
            .write()
            .map_err(|_| lock_err("thing.begin"))?;
        if checkpoint.is_some() {
            return Err(StorageError::Transaction(
                "data transaction already open".to_string(),
            ));
        }
        *checkpoint = Some(state.clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), StorageError> {
        let mut checkpoint = self
            .checkpoint
            .write()
            .map_err(|_| lock_err("thing.commit"))?;
        if checkpoint.take().is_none() {
            return Err(StorageError::Transaction(
                "no open data transaction to commit".to_string(),
            ));
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), StorageError> {
        let mut checkpoint = self
            .checkpoint
            .write()
            .map_err(|_| lock_err("thing.rollback"))?;
        let Some(saved) = checkpoint.take() else {
            return Err(StorageError::Transaction(
                "no open data transaction to roll back".to_string(),
            ));
        };
        let mut state = self.state.write().map_err(|_| lock_err("thing.rollback"))?;
        *state = saved;
        Ok(())
    }
}

/// Convenience bundle of in-memory stores.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    /// Schema store.
    pub schema: Arc<InMemorySchemaStore>,
    /// Thing store.
    pub things: Arc<InMemoryThingStore>,
}

impl InMemoryStores {
    /// Create a new bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
