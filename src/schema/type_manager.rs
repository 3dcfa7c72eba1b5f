//! Typed read and mutation API over a [`SchemaStore`].
//!
//! Every structural mutation goes through here, so the root guard is a
//! single check at the top of each setter.

use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, RwLock};

use regex::Regex;
use tracing::debug;

use crate::concept::{
    direct_supertype, Label, Root, RuleId, RuleIndexKind, RuleNode, Subtypes, Supertypes, TypeId,
    TypeKind, TypeNode,
};
use crate::config::EngineConfig;
use crate::error::{GraphError, GraphResult, ReadError, SchemaError};
use crate::storage::{OwnsEdge, PlaysEdge, SchemaStore, StorageError};
use crate::value::ValueKind;

const REGEX_CACHE_MAX: usize = 1024;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

/// Compiles `pattern`, reusing a process-wide cache.
pub(crate) fn cached_regex(label: &Label, pattern: &str) -> GraphResult<Regex> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    {
        let guard = cache
            .read()
            .map_err(|_| GraphError::internal("regex cache lock poisoned"))?;
        if let Some(re) = guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let compiled = Regex::new(pattern).map_err(|e| SchemaError::InvalidRegex {
        label: label.to_string(),
        regex: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut guard = cache
        .write()
        .map_err(|_| GraphError::internal("regex cache lock poisoned"))?;

    if guard.len() >= REGEX_CACHE_MAX {
        guard.clear();
    }

    guard
        .entry(pattern.to_string())
        .or_insert_with(|| compiled.clone());
    Ok(compiled)
}

fn type_not_found(label: &Label) -> GraphError {
    ReadError::TypeNotFound {
        label: label.clone(),
    }
    .into()
}

/// Schema access for one batch.
pub struct TypeManager<'a> {
    store: &'a dyn SchemaStore,
    config: &'a EngineConfig,
}

impl<'a> TypeManager<'a> {
    /// Create a manager over `store`.
    #[must_use]
    pub fn new(store: &'a dyn SchemaStore, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &'a dyn SchemaStore {
        self.store
    }

    // ---- lookups -------------------------------------------------------

    /// Get a type by label.
    pub fn get_type(&self, label: &Label) -> GraphResult<Option<TypeNode>> {
        Ok(self.store.get_type_by_label(label)?)
    }

    /// Get a type by label, failing with `TypeNotFound`.
    pub fn expect_type(&self, label: &Label) -> GraphResult<TypeNode> {
        self.get_type(label)?.ok_or_else(|| type_not_found(label))
    }

    /// Get a type by id. A dangling id is a storage fault.
    pub fn get_by_id(&self, id: TypeId) -> GraphResult<TypeNode> {
        Ok(self
            .store
            .get_type(id)?
            .ok_or(StorageError::TypeNotFound(id))?)
    }

    /// The root of the given kind.
    pub fn root(&self, root: Root) -> GraphResult<TypeNode> {
        self.expect_type(&root.label())
    }

    /// Get a type by label and require it to be of `kind`.
    pub fn get_type_of_kind(&self, label: &Label, kind: TypeKind) -> GraphResult<Option<TypeNode>> {
        match self.get_type(label)? {
            Some(node) => {
                expect_kind(&node, kind)?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Get a role by its scoped label: the relation named by the scope must
    /// relate (possibly through inheritance) a role with that name.
    pub fn expect_role(&self, label: &Label) -> GraphResult<TypeNode> {
        let Some(scope) = label.scope() else {
            return Err(type_not_found(label));
        };
        let relation = self
            .get_type_of_kind(&Label::new(scope), TypeKind::Relation)?
            .ok_or_else(|| type_not_found(label))?;
        self.get_relates_by_name(&relation, label.name())?
            .ok_or_else(|| type_not_found(label))
    }

    // ---- creation ------------------------------------------------------

    /// Create-or-fetch an entity type below the entity root.
    pub fn put_entity_type(&self, label: &Label) -> GraphResult<TypeNode> {
        self.put_thing_type(label, TypeKind::Entity, None)
    }

    /// Create-or-fetch a relation type below the relation root.
    pub fn put_relation_type(&self, label: &Label) -> GraphResult<TypeNode> {
        self.put_thing_type(label, TypeKind::Relation, None)
    }

    /// Create-or-fetch an attribute type below the attribute root.
    ///
    /// Fetching an existing attribute type with another value kind fails.
    pub fn put_attribute_type(&self, label: &Label, value_kind: ValueKind) -> GraphResult<TypeNode> {
        self.put_thing_type(label, TypeKind::Attribute, Some(value_kind))
    }

    fn put_thing_type(
        &self,
        label: &Label,
        kind: TypeKind,
        value_kind: Option<ValueKind>,
    ) -> GraphResult<TypeNode> {
        if let Some(existing) = self.get_type_of_kind(label, kind)? {
            if let (Some(declared), Some(current)) = (value_kind, existing.value_kind) {
                if declared != current {
                    return Err(SchemaError::ValueKindModified {
                        label: label.to_string(),
                        value_kind: current,
                    }
                    .into());
                }
            }
            return Ok(existing);
        }

        let mut node = TypeNode::new(label.clone(), kind);
        node.value_kind = value_kind;
        let root = self.root(kind.root())?;
        self.store.create_type(node.clone())?;
        self.store.set_sub(node.id, root.id)?;
        debug!(label = %label, kind = %kind, "created type");
        Ok(node)
    }

    // ---- navigation ----------------------------------------------------

    /// The direct supertype of the same kind, if any.
    pub fn supertype(&self, node: &TypeNode) -> GraphResult<Option<TypeNode>> {
        direct_supertype(self.store, node)
    }

    /// Lazy walk from `node` (inclusive) up to its root.
    #[must_use]
    pub fn supertypes(&self, node: &TypeNode) -> Supertypes<'a> {
        Supertypes::new(self.store, node.clone(), self.config.max_hierarchy_depth)
    }

    /// Lazy walk over `node` and all of its subtypes.
    #[must_use]
    pub fn subtypes(&self, node: &TypeNode) -> Subtypes<'a> {
        Subtypes::new(self.store, node.id)
    }

    // ---- mutation ------------------------------------------------------

    fn ensure_not_root(node: &TypeNode) -> GraphResult<()> {
        if node.is_root {
            return Err(SchemaError::RootMutation {
                label: node.label.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Re-parent `node` below `sup`.
    pub fn set_supertype(&self, node: &TypeNode, sup: &TypeNode) -> GraphResult<()> {
        Self::ensure_not_root(node)?;
        if node.id == sup.id {
            return Err(SchemaError::SelfSupertype {
                label: node.label.to_string(),
            }
            .into());
        }
        if sup.kind == TypeKind::Role || node.kind != sup.kind {
            return Err(SchemaError::InvalidSubKind {
                label: node.label.to_string(),
                supertype: sup.label.to_string(),
                reason: format!("a {} type cannot sub a {} type", node.kind, sup.kind),
            }
            .into());
        }
        if node.kind == TypeKind::Attribute && !sup.is_root && node.value_kind != sup.value_kind {
            return Err(SchemaError::InvalidSubKind {
                label: node.label.to_string(),
                supertype: sup.label.to_string(),
                reason: "value kinds differ".to_string(),
            }
            .into());
        }

        let mut chain = vec![node.label.to_string()];
        for ancestor in self.supertypes(sup) {
            let ancestor = ancestor?;
            chain.push(ancestor.label.to_string());
            if ancestor.id == node.id {
                return Err(SchemaError::CyclicHierarchy { chain }.into());
            }
        }

        self.store.set_sub(node.id, sup.id)?;
        debug!(label = %node.label, supertype = %sup.label, "set supertype");
        Ok(())
    }

    /// Mark `node` abstract.
    pub fn set_abstract(&self, node: &TypeNode) -> GraphResult<TypeNode> {
        self.update_abstract(node, true)
    }

    /// Mark `node` concrete.
    pub fn unset_abstract(&self, node: &TypeNode) -> GraphResult<TypeNode> {
        self.update_abstract(node, false)
    }

    fn update_abstract(&self, node: &TypeNode, is_abstract: bool) -> GraphResult<TypeNode> {
        Self::ensure_not_root(node)?;
        let mut updated = self.get_by_id(node.id)?;
        updated.is_abstract = is_abstract;
        self.store.update_type(updated.clone())?;
        Ok(updated)
    }

    /// Rename `node`, keeping its scope. Roles declared by a relation are
    /// re-scoped under the new relation label.
    pub fn set_label(&self, node: &TypeNode, name: &str) -> GraphResult<TypeNode> {
        Self::ensure_not_root(node)?;
        let mut updated = self.get_by_id(node.id)?;
        updated.label = updated.label.with_name(name);
        self.store.update_type(updated.clone())?;

        if updated.kind == TypeKind::Relation {
            for role_id in self.store.get_relates(updated.id)? {
                let mut role = self.get_by_id(role_id)?;
                role.label = role.label.with_scope(name);
                self.store.update_type(role)?;
            }
        }
        Ok(updated)
    }

    /// Set the regex of a string attribute type.
    pub fn set_regex(&self, node: &TypeNode, regex: &str) -> GraphResult<TypeNode> {
        Self::ensure_not_root(node)?;
        if node.kind != TypeKind::Attribute || !node.value_kind.is_some_and(|vk| vk.is_string()) {
            return Err(SchemaError::RegexOnNonString {
                label: node.label.to_string(),
            }
            .into());
        }
        cached_regex(&node.label, regex)?;
        let mut updated = self.get_by_id(node.id)?;
        updated.regex = Some(regex.to_string());
        self.store.update_type(updated.clone())?;
        Ok(updated)
    }

    /// Regexes that constrain values of `node`: its own and its supertypes'.
    pub fn regexes(&self, node: &TypeNode) -> GraphResult<Vec<String>> {
        let mut out = Vec::new();
        for ancestor in self.supertypes(node) {
            if let Some(regex) = ancestor?.regex {
                out.push(regex);
            }
        }
        Ok(out)
    }

    // ---- relates -------------------------------------------------------

    /// Create-or-fetch the role `role_name` of `relation`, optionally
    /// overriding the inherited role `overridden`.
    pub fn set_relates(
        &self,
        relation: &TypeNode,
        role_name: &str,
        overridden: Option<&str>,
    ) -> GraphResult<TypeNode> {
        Self::ensure_not_root(relation)?;
        expect_kind(relation, TypeKind::Relation)?;
        let label = Label::scoped(role_name, relation.label.name());

        let sup = match overridden {
            Some(name) => self.inherited_role(relation, name)?.ok_or_else(|| {
                SchemaError::OverriddenNotInherited {
                    label: label.clone(),
                    overridden: Label::scoped(name, relation.label.name()),
                }
            })?,
            None => self.root(Root::Role)?,
        };

        let role = match self.get_type_of_kind(&label, TypeKind::Role)? {
            Some(role) => role,
            None => {
                let role = TypeNode::new(label.clone(), TypeKind::Role);
                self.store.create_type(role.clone())?;
                debug!(label = %label, "created role type");
                role
            }
        };
        self.store.put_relates(relation.id, role.id)?;
        self.store.set_sub(role.id, sup.id)?;
        Ok(role)
    }

    fn inherited_role(&self, relation: &TypeNode, name: &str) -> GraphResult<Option<TypeNode>> {
        match self.supertype(relation)? {
            Some(sup) => self.get_relates_by_name(&sup, name),
            None => Ok(None),
        }
    }

    /// Roles of `relation`: declared ones plus inherited ones that are not overridden.
    pub fn get_relates(&self, relation: &TypeNode) -> GraphResult<Vec<TypeNode>> {
        expect_kind(relation, TypeKind::Relation)?;
        let mut hidden = HashSet::new();
        let mut out = Vec::new();
        for owner in self.supertypes(relation) {
            for role_id in self.store.get_relates(owner?.id)? {
                // An overridden role still hides what it overrides.
                if let Some(sup) = self.store.get_sub(role_id)? {
                    hidden.insert(sup);
                }
                if !hidden.insert(role_id) {
                    continue;
                }
                out.push(self.get_by_id(role_id)?);
            }
        }
        Ok(out)
    }

    /// The role of `relation` (declared or inherited) named `name`.
    pub fn get_relates_by_name(
        &self,
        relation: &TypeNode,
        name: &str,
    ) -> GraphResult<Option<TypeNode>> {
        Ok(self
            .get_relates(relation)?
            .into_iter()
            .find(|role| role.label.name() == name))
    }

    // ---- owns ----------------------------------------------------------

    /// Let instances of `owner` own instances of `attribute`.
    pub fn set_owns(
        &self,
        owner: &TypeNode,
        attribute: &TypeNode,
        overridden: Option<&TypeNode>,
        is_key: bool,
    ) -> GraphResult<()> {
        Self::ensure_not_root(owner)?;
        expect_thing_kind(owner)?;
        expect_kind(attribute, TypeKind::Attribute)?;

        if let Some(overridden) = overridden {
            expect_kind(overridden, TypeKind::Attribute)?;
            let inherited = match self.supertype(owner)? {
                Some(sup) => self.get_owns(&sup)?,
                None => Vec::new(),
            };
            if !inherited.iter().any(|e| e.attribute == overridden.id) {
                return Err(SchemaError::OverriddenNotInherited {
                    label: owner.label.clone(),
                    overridden: overridden.label.clone(),
                }
                .into());
            }
        }

        self.store.put_owns(
            owner.id,
            OwnsEdge {
                attribute: attribute.id,
                is_key,
                overridden: overridden.map(|o| o.id),
            },
        )?;
        debug!(owner = %owner.label, attribute = %attribute.label, is_key, "set owns");
        Ok(())
    }

    /// Ownerships of `owner`: declared plus inherited, minus overridden.
    pub fn get_owns(&self, owner: &TypeNode) -> GraphResult<Vec<OwnsEdge>> {
        let mut hidden = HashSet::new();
        let mut out = Vec::new();
        for ancestor in self.supertypes(owner) {
            for edge in self.store.get_owns(ancestor?.id)? {
                if !hidden.insert(edge.attribute) {
                    continue;
                }
                if let Some(overridden) = edge.overridden {
                    hidden.insert(overridden);
                }
                out.push(edge);
            }
        }
        Ok(out)
    }

    // ---- plays ---------------------------------------------------------

    /// Let instances of `player` play `role`.
    pub fn set_plays(
        &self,
        player: &TypeNode,
        role: &TypeNode,
        overridden: Option<&TypeNode>,
    ) -> GraphResult<()> {
        Self::ensure_not_root(player)?;
        expect_thing_kind(player)?;
        expect_kind(role, TypeKind::Role)?;

        if let Some(overridden) = overridden {
            expect_kind(overridden, TypeKind::Role)?;
            let inherited = match self.supertype(player)? {
                Some(sup) => self.get_plays(&sup)?,
                None => Vec::new(),
            };
            if !inherited.contains(&overridden.id) {
                return Err(SchemaError::OverriddenNotInherited {
                    label: player.label.clone(),
                    overridden: overridden.label.clone(),
                }
                .into());
            }
        }

        self.store.put_plays(
            player.id,
            PlaysEdge {
                role: role.id,
                overridden: overridden.map(|o| o.id),
            },
        )?;
        debug!(player = %player.label, role = %role.label, "set plays");
        Ok(())
    }

    /// Roles `player` can play: declared plus inherited, minus overridden.
    pub fn get_plays(&self, player: &TypeNode) -> GraphResult<Vec<TypeId>> {
        let mut hidden = HashSet::new();
        let mut out = Vec::new();
        for ancestor in self.supertypes(player) {
            for edge in self.store.get_plays(ancestor?.id)? {
                if !hidden.insert(edge.role) {
                    continue;
                }
                if let Some(overridden) = edge.overridden {
                    hidden.insert(overridden);
                }
                out.push(edge.role);
            }
        }
        Ok(out)
    }

    // ---- rules ---------------------------------------------------------

    /// Get a rule by label.
    pub fn get_rule(&self, label: &str) -> GraphResult<Option<RuleNode>> {
        Ok(self.store.get_rule_by_label(label)?)
    }

    /// Get a rule by label, failing with `RuleNotFound`.
    pub fn expect_rule(&self, label: &str) -> GraphResult<RuleNode> {
        self.get_rule(label)?.ok_or_else(|| {
            ReadError::RuleNotFound {
                label: label.to_string(),
            }
            .into()
        })
    }

    /// Rules holding an index edge of `kind` towards `node`.
    pub fn rules_for(&self, node: &TypeNode, kind: RuleIndexKind) -> GraphResult<Vec<RuleNode>> {
        let ids = self.store.get_rules_for_type(node.id, kind)?;
        ids.into_iter()
            .map(|id| -> GraphResult<RuleNode> {
                Ok(self
                    .store
                    .get_rule(id)?
                    .ok_or(StorageError::RuleNotFound(id))?)
            })
            .collect()
    }

    /// Rules whose positive conditions reference `node`.
    pub fn positive_condition_rules(&self, node: &TypeNode) -> GraphResult<Vec<RuleNode>> {
        self.rules_for(node, RuleIndexKind::ConditionPositive)
    }

    /// Rules whose negated conditions reference `node`.
    pub fn negative_condition_rules(&self, node: &TypeNode) -> GraphResult<Vec<RuleNode>> {
        self.rules_for(node, RuleIndexKind::ConditionNegative)
    }

    /// Rules that conclude instances of `node`.
    pub fn concluding_rules(&self, node: &TypeNode) -> GraphResult<Vec<RuleNode>> {
        self.rules_for(node, RuleIndexKind::Conclusion)
    }

    /// Types a rule's index edges of `kind` point at.
    pub fn rule_types(&self, rule: RuleId, kind: RuleIndexKind) -> GraphResult<Vec<TypeNode>> {
        self.store
            .get_rule_edges(rule, kind)?
            .into_iter()
            .map(|id| self.get_by_id(id))
            .collect()
    }
}

fn expect_kind(node: &TypeNode, kind: TypeKind) -> GraphResult<()> {
    if node.kind != kind {
        return Err(ReadError::InvalidTypeCast {
            label: node.label.clone(),
            expected: kind.to_string(),
            actual: node.kind.to_string(),
        }
        .into());
    }
    Ok(())
}

fn expect_thing_kind(node: &TypeNode) -> GraphResult<()> {
    if !node.kind.is_thing() {
        return Err(ReadError::InvalidTypeCast {
            label: node.label.clone(),
            expected: "thing".to_string(),
            actual: node.kind.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::InMemorySchemaStore;

    fn setup() -> (InMemorySchemaStore, EngineConfig) {
        (InMemorySchemaStore::new(), EngineConfig::default())
    }

    fn root_mutation(err: &GraphError) -> bool {
        matches!(err.as_schema(), Some(SchemaError::RootMutation { .. }))
    }

    #[test]
    fn put_types_are_create_or_fetch() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let a = types.put_entity_type(&Label::new("person")).unwrap();
        let b = types.put_entity_type(&Label::new("person")).unwrap();
        assert_eq!(a.id, b.id);
        let sup = types.supertype(&a).unwrap().unwrap();
        assert_eq!(sup.label, Root::Entity.label());
    }

    #[test]
    fn put_type_of_other_kind_is_a_cast_error() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        types.put_entity_type(&Label::new("person")).unwrap();
        let err = types.put_relation_type(&Label::new("person")).unwrap_err();
        assert!(matches!(
            err.as_read(),
            Some(ReadError::InvalidTypeCast { .. })
        ));
    }

    #[test]
    fn put_attribute_type_rejects_other_value_kind() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        types
            .put_attribute_type(&Label::new("age"), ValueKind::Long)
            .unwrap();
        let err = types
            .put_attribute_type(&Label::new("age"), ValueKind::String)
            .unwrap_err();
        assert!(matches!(
            err.as_schema(),
            Some(SchemaError::ValueKindModified { .. })
        ));
    }

    #[test]
    fn roots_reject_every_structural_mutation() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let entity = types.root(Root::Entity).unwrap();
        let relation = types.root(Root::Relation).unwrap();
        let name = types
            .put_attribute_type(&Label::new("name"), ValueKind::String)
            .unwrap();
        let role = types.root(Root::Role).unwrap();

        assert!(root_mutation(&types.set_abstract(&entity).unwrap_err()));
        assert!(root_mutation(&types.unset_abstract(&entity).unwrap_err()));
        assert!(root_mutation(&types.set_label(&entity, "thing").unwrap_err()));
        assert!(root_mutation(&types.set_supertype(&entity, &relation).unwrap_err()));
        assert!(root_mutation(&types.set_owns(&entity, &name, None, false).unwrap_err()));
        assert!(root_mutation(&types.set_plays(&entity, &role, None).unwrap_err()));

        let after = types.root(Root::Entity).unwrap();
        assert_eq!(after, entity);
        assert!(types.get_owns(&entity).unwrap().is_empty());
    }

    #[test]
    fn set_supertype_checks_self_kind_and_cycles() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let animal = types.put_entity_type(&Label::new("animal")).unwrap();
        let dog = types.put_entity_type(&Label::new("dog")).unwrap();
        let rel = types.put_relation_type(&Label::new("owning")).unwrap();

        let err = types.set_supertype(&dog, &dog).unwrap_err();
        assert!(matches!(err.as_schema(), Some(SchemaError::SelfSupertype { .. })));

        let err = types.set_supertype(&dog, &rel).unwrap_err();
        assert!(matches!(err.as_schema(), Some(SchemaError::InvalidSubKind { .. })));

        types.set_supertype(&dog, &animal).unwrap();
        let err = types.set_supertype(&animal, &dog).unwrap_err();
        match err.as_schema() {
            Some(SchemaError::CyclicHierarchy { chain }) => {
                assert_eq!(chain, &vec!["animal", "dog", "animal"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn attribute_subtypes_must_share_value_kind() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let name = types
            .put_attribute_type(&Label::new("name"), ValueKind::String)
            .unwrap();
        let age = types
            .put_attribute_type(&Label::new("age"), ValueKind::Long)
            .unwrap();
        let err = types.set_supertype(&age, &name).unwrap_err();
        assert!(matches!(err.as_schema(), Some(SchemaError::InvalidSubKind { .. })));
    }

    #[test]
    fn relates_inherits_and_overrides() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let employment = types.put_relation_type(&Label::new("employment")).unwrap();
        types.set_relates(&employment, "employee", None).unwrap();
        types.set_relates(&employment, "employer", None).unwrap();

        let names = |node: &TypeNode| -> Vec<String> {
            let mut names: Vec<String> = types
                .get_relates(node)
                .unwrap()
                .into_iter()
                .map(|r| r.label.to_string())
                .collect();
            names.sort();
            names
        };
        assert_eq!(
            names(&employment),
            vec!["employment:employee", "employment:employer"]
        );

        let contract = types.put_relation_type(&Label::new("contract")).unwrap();
        types.set_supertype(&contract, &employment).unwrap();
        types
            .set_relates(&contract, "contractor", Some("employee"))
            .unwrap();
        assert_eq!(
            names(&contract),
            vec!["contract:contractor", "employment:employer"]
        );

        let err = types
            .set_relates(&contract, "x", Some("missing"))
            .unwrap_err();
        assert!(matches!(
            err.as_schema(),
            Some(SchemaError::OverriddenNotInherited { .. })
        ));
    }

    #[test]
    fn relation_without_roles_inherits_root_role() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let rel = types.put_relation_type(&Label::new("friendship")).unwrap();
        let roles = types.get_relates(&rel).unwrap();
        assert_eq!(roles.len(), 1);
        assert!(roles[0].is_root);
    }

    #[test]
    fn set_label_rescopes_roles() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let employment = types.put_relation_type(&Label::new("employment")).unwrap();
        types.set_relates(&employment, "employee", None).unwrap();
        types.set_label(&employment, "job").unwrap();
        assert!(types
            .get_type(&Label::scoped("employee", "job"))
            .unwrap()
            .is_some());
        assert!(types
            .get_type(&Label::scoped("employee", "employment"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn owns_and_plays_are_inherited_minus_overridden() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let person = types.put_entity_type(&Label::new("person")).unwrap();
        let student = types.put_entity_type(&Label::new("student")).unwrap();
        types.set_supertype(&student, &person).unwrap();
        let id = types
            .put_attribute_type(&Label::new("id"), ValueKind::String)
            .unwrap();
        let student_id = types
            .put_attribute_type(&Label::new("student-id"), ValueKind::String)
            .unwrap();
        types.set_supertype(&student_id, &id).unwrap();

        types.set_owns(&person, &id, None, true).unwrap();
        types
            .set_owns(&student, &student_id, Some(&id), true)
            .unwrap();
        let owned: Vec<TypeId> = types
            .get_owns(&student)
            .unwrap()
            .into_iter()
            .map(|e| e.attribute)
            .collect();
        assert_eq!(owned, vec![student_id.id]);
        assert_eq!(types.get_owns(&person).unwrap().len(), 1);

        let employment = types.put_relation_type(&Label::new("employment")).unwrap();
        let employee = types.set_relates(&employment, "employee", None).unwrap();
        types.set_plays(&person, &employee, None).unwrap();
        assert_eq!(types.get_plays(&student).unwrap(), vec![employee.id]);
    }

    #[test]
    fn owns_override_must_be_inherited() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let person = types.put_entity_type(&Label::new("person")).unwrap();
        let name = types
            .put_attribute_type(&Label::new("name"), ValueKind::String)
            .unwrap();
        let nick = types
            .put_attribute_type(&Label::new("nick"), ValueKind::String)
            .unwrap();
        let err = types.set_owns(&person, &nick, Some(&name), false).unwrap_err();
        assert!(matches!(
            err.as_schema(),
            Some(SchemaError::OverriddenNotInherited { .. })
        ));
    }

    #[test]
    fn regex_only_on_string_attributes() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let age = types
            .put_attribute_type(&Label::new("age"), ValueKind::Long)
            .unwrap();
        let err = types.set_regex(&age, "[0-9]+").unwrap_err();
        assert!(matches!(err.as_schema(), Some(SchemaError::RegexOnNonString { .. })));

        let email = types
            .put_attribute_type(&Label::new("email"), ValueKind::String)
            .unwrap();
        let err = types.set_regex(&email, "(").unwrap_err();
        assert!(matches!(err.as_schema(), Some(SchemaError::InvalidRegex { .. })));

        let email = types.set_regex(&email, ".+@.+").unwrap();
        assert_eq!(types.regexes(&email).unwrap(), vec![".+@.+".to_string()]);
    }

    #[test]
    fn expect_role_resolves_through_scope() {
        let (store, config) = setup();
        let types = TypeManager::new(&store, &config);
        let employment = types.put_relation_type(&Label::new("employment")).unwrap();
        let employee = types.set_relates(&employment, "employee", None).unwrap();
        let found = types
            .expect_role(&Label::scoped("employee", "employment"))
            .unwrap();
        assert_eq!(found.id, employee.id);

        let err = types.expect_role(&Label::new("employee")).unwrap_err();
        assert!(matches!(err.as_read(), Some(ReadError::TypeNotFound { .. })));
    }
}
