//! Schema definition: applies a batch of type and rule declarations.
//!
//! Declarations may reference each other in any order. Resolution runs in
//! two passes over the batch:
//!
//! 1. every declared type is resolved (created or fetched, attached below its
//!    supertype, marked abstract, given a regex and its roles). Supertypes are
//!    resolved first by walking the `sub` chain with an explicit stack;
//! 2. `owns` and `plays` are applied, supertypes before subtypes, so that
//!    overrides always see the inherited constraint they override.
//!
//! Each label is resolved at most once per batch.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, trace};

use crate::concept::{Label, TypeKind, TypeNode};
use crate::config::EngineConfig;
use crate::error::{GraphError, GraphResult, ReadError, SchemaError};
use crate::pattern::{RuleDeclaration, TypeConstraint, TypeDeclaration};
use crate::schema::{RuleIndexer, TypeManager};

fn type_not_found(label: &Label) -> GraphError {
    ReadError::TypeNotFound {
        label: label.clone(),
    }
    .into()
}

/// Applies one batch of declarations.
pub struct Definer<'a> {
    types: &'a TypeManager<'a>,
    config: &'a EngineConfig,
    declarations: Vec<TypeDeclaration>,
    by_label: HashMap<Label, usize>,
    rules: &'a [RuleDeclaration],
    batch_size: usize,
    visited: HashSet<Label>,
    defined: Vec<Label>,
}

impl<'a> Definer<'a> {
    /// Prepare a batch. Declarations of the same label are merged.
    #[must_use]
    pub fn new(
        types: &'a TypeManager<'a>,
        config: &'a EngineConfig,
        declarations: &[TypeDeclaration],
        rules: &'a [RuleDeclaration],
    ) -> Self {
        let mut merged: Vec<TypeDeclaration> = Vec::new();
        let mut by_label = HashMap::new();
        for declaration in declarations {
            match by_label.get(&declaration.label) {
                Some(&index) => {
                    let target: &mut TypeDeclaration = &mut merged[index];
                    for constraint in &declaration.constraints {
                        if !target.constraints.contains(constraint) {
                            target.constraints.push(constraint.clone());
                        }
                    }
                }
                None => {
                    by_label.insert(declaration.label.clone(), merged.len());
                    merged.push(declaration.clone());
                }
            }
        }
        Self {
            types,
            config,
            declarations: merged,
            by_label,
            rules,
            batch_size: declarations.len() + rules.len(),
            visited: HashSet::new(),
            defined: Vec::new(),
        }
    }

    /// Apply the batch. The first error aborts it.
    #[instrument(name = "definer.execute", skip_all)]
    pub fn execute(mut self) -> GraphResult<()> {
        self.config.check_batch_size(self.batch_size)?;
        debug!(
            types = self.declarations.len(),
            rules = self.rules.len(),
            "defining schema batch"
        );
        self.check_acyclic()?;

        for index in 0..self.declarations.len() {
            let label = self.declarations[index].label.clone();
            self.define(&label)?;
        }

        let defined = std::mem::take(&mut self.defined);
        for label in &defined {
            self.define_owns_and_plays(label)?;
        }

        let indexer = RuleIndexer::new(self.types, self.config);
        for rule in self.rules {
            indexer.put_rule(rule)?;
        }
        Ok(())
    }

    fn declaration(&self, label: &Label) -> TypeDeclaration {
        self.by_label
            .get(label)
            .map_or_else(|| TypeDeclaration::new(label.clone()), |&i| self.declarations[i].clone())
    }

    /// Follows every declared `sub` chain before anything is written.
    fn check_acyclic(&self) -> GraphResult<()> {
        let mut checked = HashSet::new();
        for declaration in &self.declarations {
            if !checked.insert(&declaration.label) {
                continue;
            }
            let mut chain = vec![declaration.label.to_string()];
            let mut seen = HashSet::from([&declaration.label]);
            let mut current = declaration;
            while let Some(sup) = current.single_sub() {
                chain.push(sup.to_string());
                if !seen.insert(sup) {
                    return Err(SchemaError::CyclicHierarchy { chain }.into());
                }
                match self.by_label.get(sup) {
                    Some(&index) => current = &self.declarations[index],
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Resolve `label`, resolving its supertypes first.
    ///
    /// Returns `None` for role labels: roles only come into existence
    /// through the `relates` of their relation.
    fn define(&mut self, label: &Label) -> GraphResult<Option<TypeNode>> {
        if label.is_scoped() {
            if !self.declaration(label).constraints.is_empty() {
                return Err(SchemaError::RoleDefinedOutsideRelation {
                    label: label.clone(),
                }
                .into());
            }
            return Ok(None);
        }
        if self.visited.contains(label) {
            trace!(label = %label, "already defined");
            return self.types.get_type(label);
        }

        let mut stack = vec![label.clone()];
        loop {
            let Some(top) = stack.last() else { break };
            match self.declaration(top).single_sub() {
                Some(sup) if !sup.is_scoped() && !self.visited.contains(sup) => {
                    stack.push(sup.clone());
                }
                _ => break,
            }
        }
        while let Some(next) = stack.pop() {
            self.define_type(&next)?;
        }
        self.types.get_type(label)
    }

    /// Resolve one type whose supertype is already resolved.
    #[instrument(name = "definer.define", skip_all, fields(label = %label))]
    fn define_type(&mut self, label: &Label) -> GraphResult<()> {
        if !self.visited.insert(label.clone()) {
            return Ok(());
        }
        let declaration = self.declaration(label);
        let existing = self.types.get_type(label)?;
        let value_kind = declaration.declared_value_kind();

        let mut subs = declaration.sub_labels();
        let mut node = match (subs.next(), subs.next()) {
            (Some(sup), None) => self.define_sub(label, existing, sup, &declaration)?,
            (Some(_), Some(_)) => {
                return Err(SchemaError::TooManySupertypes {
                    label: label.to_string(),
                }
                .into());
            }
            (None, _) => match (existing, value_kind) {
                (Some(node), Some(declared)) => {
                    return Err(SchemaError::ValueKindModified {
                        label: label.to_string(),
                        value_kind: node.value_kind.unwrap_or(declared),
                    }
                    .into());
                }
                (Some(node), None) => node,
                (None, _) => return Err(type_not_found(label)),
            },
        };

        if value_kind.is_some() && node.kind != TypeKind::Attribute {
            return Err(SchemaError::ValueKindNotOnAttribute {
                label: label.to_string(),
            }
            .into());
        }
        if declaration.declares_abstract() {
            node = self.types.set_abstract(&node)?;
        }
        if let Some(regex) = declaration.declared_regex() {
            node = self.types.set_regex(&node, regex)?;
        }
        for constraint in &declaration.constraints {
            if let TypeConstraint::Relates { role, overridden } = constraint {
                let role_node = self.types.set_relates(&node, role, overridden.as_deref())?;
                self.visited.insert(role_node.label);
                if let Some(overridden) = overridden {
                    self.visited
                        .insert(Label::scoped(overridden.as_str(), node.label.name()));
                }
            }
        }

        debug!(label = %label, kind = %node.kind, "defined type");
        self.defined.push(label.clone());
        Ok(())
    }

    fn define_sub(
        &self,
        label: &Label,
        existing: Option<TypeNode>,
        sup_label: &Label,
        declaration: &TypeDeclaration,
    ) -> GraphResult<TypeNode> {
        let sup = self.types.expect_type(sup_label)?;
        if let Some(existing) = &existing {
            if existing.kind != sup.kind {
                return Err(SchemaError::InvalidSubKind {
                    label: label.to_string(),
                    supertype: sup.label.to_string(),
                    reason: format!("'{label}' is already a {} type", existing.kind),
                }
                .into());
            }
        }

        let node = match sup.kind {
            TypeKind::Entity => self.types.put_entity_type(label)?,
            TypeKind::Relation => self.types.put_relation_type(label)?,
            TypeKind::Attribute => {
                let inherited = if sup.is_root { None } else { sup.value_kind };
                let value_kind = declaration
                    .declared_value_kind()
                    .or(inherited)
                    .ok_or_else(|| SchemaError::ValueKindMissing {
                        label: label.to_string(),
                    })?;
                self.types.put_attribute_type(label, value_kind)?
            }
            TypeKind::Role => {
                return Err(SchemaError::InvalidSubKind {
                    label: label.to_string(),
                    supertype: sup.label.to_string(),
                    reason: "role types can only be defined through relates".to_string(),
                }
                .into());
            }
        };
        self.types.set_supertype(&node, &sup)?;
        Ok(node)
    }

    fn define_owns_and_plays(&mut self, label: &Label) -> GraphResult<()> {
        let declaration = self.declaration(label);
        let node = self.types.expect_type(label)?;

        for constraint in &declaration.constraints {
            match constraint {
                TypeConstraint::Owns {
                    attribute,
                    overridden,
                    is_key,
                } => {
                    let attribute = self.define(attribute)?.ok_or_else(|| type_not_found(attribute))?;
                    let overridden = match overridden {
                        Some(o) => Some(self.define(o)?.ok_or_else(|| type_not_found(o))?),
                        None => None,
                    };
                    self.types
                        .set_owns(&node, &attribute, overridden.as_ref(), *is_key)?;
                }
                TypeConstraint::Plays { role, overridden } => {
                    let role = self.role(role)?;
                    let overridden = match overridden {
                        Some(o) => Some(self.role(o)?),
                        None => None,
                    };
                    self.types.set_plays(&node, &role, overridden.as_ref())?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve the relation named by a role label's scope, then the role.
    /// The role itself must already exist.
    fn role(&mut self, label: &Label) -> GraphResult<TypeNode> {
        let scope = label.scope().ok_or_else(|| type_not_found(label))?;
        self.define(&Label::new(scope))?;
        self.types.expect_role(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::concept::{Root, TypeStatus};
    use crate::storage::InMemorySchemaStore;
    use crate::value::ValueKind;

    fn define(store: &InMemorySchemaStore, declarations: &[TypeDeclaration]) -> GraphResult<()> {
        let config = EngineConfig::default();
        let types = TypeManager::new(store, &config);
        Definer::new(&types, &config, declarations, &[]).execute()
    }

    fn get(store: &InMemorySchemaStore, label: &str) -> Option<TypeNode> {
        let config = EngineConfig::default();
        TypeManager::new(store, &config)
            .get_type(&Label::from(label))
            .unwrap()
    }

    fn schema_err(result: GraphResult<()>) -> SchemaError {
        result.unwrap_err().as_schema().cloned().expect("schema error")
    }

    #[test]
    fn forward_references_resolve_in_any_order() {
        let store = InMemorySchemaStore::new();
        define(
            &store,
            &[
                TypeDeclaration::new("full-name").sub("name"),
                TypeDeclaration::new("person").owns("full-name").sub("entity"),
                TypeDeclaration::new("name")
                    .sub("attribute")
                    .value_kind(ValueKind::String),
            ],
        )
        .unwrap();

        let full_name = get(&store, "full-name").unwrap();
        assert_eq!(full_name.value_kind, Some(ValueKind::String));
        assert_eq!(full_name.status, TypeStatus::Buffered);
        assert!(get(&store, "person").is_some());
    }

    #[test]
    fn cycle_is_rejected_before_any_write() {
        let store = InMemorySchemaStore::new();
        let err = schema_err(define(
            &store,
            &[
                TypeDeclaration::new("a").sub("b"),
                TypeDeclaration::new("b").sub("c"),
                TypeDeclaration::new("c").sub("a"),
            ],
        ));
        assert_eq!(
            err,
            SchemaError::CyclicHierarchy {
                chain: vec!["a".into(), "b".into(), "c".into(), "a".into()],
            }
        );
        assert!(get(&store, "a").is_none());
        assert!(get(&store, "b").is_none());
        assert!(get(&store, "c").is_none());
    }

    #[test]
    fn self_sub_is_a_cycle() {
        let store = InMemorySchemaStore::new();
        let err = schema_err(define(&store, &[TypeDeclaration::new("a").sub("a")]));
        assert!(matches!(err, SchemaError::CyclicHierarchy { .. }));
    }

    #[test]
    fn too_many_supertypes() {
        let store = InMemorySchemaStore::new();
        let err = schema_err(define(
            &store,
            &[TypeDeclaration::new("person").sub("entity").sub("relation")],
        ));
        assert!(matches!(err, SchemaError::TooManySupertypes { .. }));
    }

    #[test]
    fn value_kind_rules() {
        let store = InMemorySchemaStore::new();
        let err = schema_err(define(&store, &[TypeDeclaration::new("name").sub("attribute")]));
        assert!(matches!(err, SchemaError::ValueKindMissing { .. }));

        let err = schema_err(define(
            &store,
            &[TypeDeclaration::new("person")
                .sub("entity")
                .value_kind(ValueKind::Long)],
        ));
        assert!(matches!(err, SchemaError::ValueKindNotOnAttribute { .. }));

        let store = InMemorySchemaStore::new();
        define(
            &store,
            &[TypeDeclaration::new("age")
                .sub("attribute")
                .value_kind(ValueKind::Long)],
        )
        .unwrap();
        let err = schema_err(define(
            &store,
            &[TypeDeclaration::new("age").value_kind(ValueKind::String)],
        ));
        assert!(matches!(err, SchemaError::ValueKindModified { .. }));
    }

    #[test]
    fn unknown_type_without_sub_is_not_found() {
        let store = InMemorySchemaStore::new();
        let err = define(&store, &[TypeDeclaration::new("ghost").set_abstract()]).unwrap_err();
        assert!(matches!(err.as_read(), Some(ReadError::TypeNotFound { .. })));
    }

    #[test]
    fn role_declared_outside_relation() {
        let store = InMemorySchemaStore::new();
        let err = schema_err(define(
            &store,
            &[TypeDeclaration::new("employment:employee").set_abstract()],
        ));
        assert!(matches!(err, SchemaError::RoleDefinedOutsideRelation { .. }));

        // A bare scoped declaration is a no-op.
        define(&store, &[TypeDeclaration::new("employment:employee")]).unwrap();
    }

    #[test]
    fn relates_and_plays_across_declarations() {
        let store = InMemorySchemaStore::new();
        define(
            &store,
            &[
                TypeDeclaration::new("person")
                    .sub("entity")
                    .plays("employment:employee"),
                TypeDeclaration::new("company")
                    .sub("entity")
                    .plays("employment:employer"),
                TypeDeclaration::new("employment")
                    .sub("relation")
                    .relates("employee")
                    .relates("employer"),
            ],
        )
        .unwrap();

        let config = EngineConfig::default();
        let types = TypeManager::new(&store, &config);
        let person = types.expect_type(&Label::new("person")).unwrap();
        let employee = types
            .expect_type(&Label::scoped("employee", "employment"))
            .unwrap();
        assert_eq!(types.get_plays(&person).unwrap(), vec![employee.id]);
    }

    #[test]
    fn plays_unknown_role_fails() {
        let store = InMemorySchemaStore::new();
        let err = define(
            &store,
            &[
                TypeDeclaration::new("employment").sub("relation").relates("employee"),
                TypeDeclaration::new("person")
                    .sub("entity")
                    .plays("employment:boss"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err.as_read(), Some(ReadError::TypeNotFound { .. })));
    }

    #[test]
    fn owns_override_sees_supertype_declared_later() {
        let store = InMemorySchemaStore::new();
        define(
            &store,
            &[
                TypeDeclaration::new("student")
                    .sub("person")
                    .owns_as("student-id", "id"),
                TypeDeclaration::new("student-id").sub("id"),
                TypeDeclaration::new("person").sub("entity").owns_key("id"),
                TypeDeclaration::new("id")
                    .sub("attribute")
                    .value_kind(ValueKind::String),
            ],
        )
        .unwrap();

        let config = EngineConfig::default();
        let types = TypeManager::new(&store, &config);
        let student = types.expect_type(&Label::new("student")).unwrap();
        let owned = types.get_owns(&student).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(
            owned[0].attribute,
            types.expect_type(&Label::new("student-id")).unwrap().id
        );
    }

    #[test]
    fn root_types_cannot_be_redefined() {
        let store = InMemorySchemaStore::new();
        let err = schema_err(define(&store, &[TypeDeclaration::new("entity").set_abstract()]));
        assert!(matches!(err, SchemaError::RootMutation { .. }));

        let err = schema_err(define(
            &store,
            &[
                TypeDeclaration::new("name")
                    .sub("attribute")
                    .value_kind(ValueKind::String),
                TypeDeclaration::new("entity").owns("name"),
            ],
        ));
        assert!(matches!(err, SchemaError::RootMutation { .. }));
        let entity = get(&store, "entity").unwrap();
        assert_eq!(entity.label, Root::Entity.label());
    }

    #[test]
    fn redefining_existing_type_moves_it() {
        let store = InMemorySchemaStore::new();
        define(
            &store,
            &[
                TypeDeclaration::new("animal").sub("entity"),
                TypeDeclaration::new("dog").sub("entity"),
            ],
        )
        .unwrap();
        define(&store, &[TypeDeclaration::new("dog").sub("animal")]).unwrap();

        let config = EngineConfig::default();
        let types = TypeManager::new(&store, &config);
        let dog = types.expect_type(&Label::new("dog")).unwrap();
        assert_eq!(
            types.supertype(&dog).unwrap().unwrap().label,
            Label::new("animal")
        );

        let err = schema_err(define(&store, &[TypeDeclaration::new("dog").sub("relation")]));
        assert!(matches!(err, SchemaError::InvalidSubKind { .. }));
    }

    #[test]
    fn batch_size_is_limited() {
        let store = InMemorySchemaStore::new();
        let mut config = EngineConfig::default();
        config.max_batch_size = 1;
        let types = TypeManager::new(&store, &config);
        let declarations = [
            TypeDeclaration::new("a").sub("entity"),
            TypeDeclaration::new("b").sub("entity"),
        ];
        let err = Definer::new(&types, &config, &declarations, &[])
            .execute()
            .unwrap_err();
        assert!(matches!(err, GraphError::Config { .. }));
    }
}
