//! Engine facade.
//!
//! `GraphEngine` owns the two stores and brackets every batch in a store
//! transaction: the batch runs to completion and commits, or the first error
//! rolls the store back so no partial write is visible.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::concept::{Label, RuleIndexKind, RuleNode, Thing, ThingId, TypeNode};
use crate::config::EngineConfig;
use crate::error::GraphResult;
use crate::pattern::{RuleDeclaration, ThingVariable, TypeDeclaration};
use crate::schema::{Definer, RuleIndex, RuleIndexer, TypeManager};
use crate::storage::{InMemoryStores, OwnsEdge, SchemaStore, ThingStore};
use crate::write::{Bindings, Inserter, ThingManager};

/// Write-path engine over a schema store and a thing store.
#[derive(Clone)]
pub struct GraphEngine {
    schema: Arc<dyn SchemaStore>,
    things: Arc<dyn ThingStore>,
    config: EngineConfig,
}

impl GraphEngine {
    /// Create an engine over the given stores.
    pub fn new(
        schema: Arc<dyn SchemaStore>,
        things: Arc<dyn ThingStore>,
        config: EngineConfig,
    ) -> GraphResult<Self> {
        config.validate()?;
        Ok(Self {
            schema,
            things,
            config,
        })
    }

    /// Create an engine over fresh in-memory stores with the default config.
    #[must_use]
    pub fn in_memory() -> Self {
        let stores = InMemoryStores::new();
        Self {
            schema: stores.schema,
            things: stores.things,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine over fresh in-memory stores.
    pub fn in_memory_with_config(config: EngineConfig) -> GraphResult<Self> {
        let stores = InMemoryStores::new();
        Self::new(stores.schema, stores.things, config)
    }

    /// Get a reference to the schema store.
    pub fn schema_store(&self) -> &Arc<dyn SchemaStore> {
        &self.schema
    }

    /// Get a reference to the thing store.
    pub fn thing_store(&self) -> &Arc<dyn ThingStore> {
        &self.things
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn type_manager(&self) -> TypeManager<'_> {
        TypeManager::new(self.schema.as_ref(), &self.config)
    }

    fn in_schema_transaction<T>(
        &self,
        f: impl FnOnce(&TypeManager<'_>) -> GraphResult<T>,
    ) -> GraphResult<T> {
        self.schema.begin()?;
        let types = self.type_manager();
        match f(&types) {
            Ok(value) => {
                self.schema.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.schema.rollback() {
                    warn!(error = %rollback, "schema rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Apply a batch of type declarations and rules.
    ///
    /// Declarations may reference each other in any order. On error nothing
    /// of the batch is kept.
    #[instrument(name = "engine.define_schema", skip_all, fields(types = declarations.len(), rules = rules.len()))]
    pub fn define_schema(
        &self,
        declarations: &[TypeDeclaration],
        rules: &[RuleDeclaration],
    ) -> GraphResult<()> {
        self.in_schema_transaction(|types| {
            Definer::new(types, &self.config, declarations, rules).execute()
        })?;
        debug!("schema committed");
        Ok(())
    }

    /// Insert a batch of instance declarations.
    ///
    /// `existing` holds instances resolved by a preceding read. Returns the
    /// merged binding map. On error nothing of the batch is kept.
    #[instrument(name = "engine.insert_data", skip_all, fields(variables = variables.len()))]
    pub fn insert_data(
        &self,
        variables: &[ThingVariable],
        existing: &Bindings,
    ) -> GraphResult<Bindings> {
        self.things.begin()?;
        let types = self.type_manager();
        let things = ThingManager::new(&types, self.things.as_ref(), &self.config);
        match Inserter::new(&things, &self.config, variables, existing).execute() {
            Ok(bindings) => {
                self.things.commit()?;
                debug!(bindings = bindings.len(), "data committed");
                Ok(bindings)
            }
            Err(e) => {
                if let Err(rollback) = self.things.rollback() {
                    warn!(error = %rollback, "data rollback failed");
                }
                Err(e)
            }
        }
    }

    // ---- rules ---------------------------------------------------------

    /// Create or replace a rule and index it.
    pub fn put_rule(&self, declaration: &RuleDeclaration) -> GraphResult<RuleNode> {
        self.in_schema_transaction(|types| {
            RuleIndexer::new(types, &self.config).put_rule(declaration)
        })
    }

    /// Recompute the index edges of a stored rule against the current schema.
    pub fn reindex_rule(&self, label: &str) -> GraphResult<RuleIndex> {
        self.in_schema_transaction(|types| {
            let rule = types.expect_rule(label)?;
            RuleIndexer::new(types, &self.config).index(&rule)
        })
    }

    /// Delete a rule together with its index edges.
    pub fn delete_rule(&self, label: &str) -> GraphResult<()> {
        self.in_schema_transaction(|types| RuleIndexer::new(types, &self.config).delete_rule(label))
    }

    /// Relabel a rule, keeping its patterns and index edges.
    pub fn rename_rule(&self, label: &str, new_label: &str) -> GraphResult<RuleNode> {
        self.in_schema_transaction(|types| {
            RuleIndexer::new(types, &self.config).rename_rule(label, new_label)
        })
    }

    /// Rule labelled `label`, if any.
    pub fn get_rule(&self, label: &str) -> GraphResult<Option<RuleNode>> {
        self.type_manager().get_rule(label)
    }

    /// Rules whose `when` references `label` outside any negation.
    pub fn positive_condition_rules(&self, label: &Label) -> GraphResult<Vec<RuleNode>> {
        self.rules_for(label, RuleIndexKind::ConditionPositive)
    }

    /// Rules whose `when` references `label` inside a negation.
    pub fn negative_condition_rules(&self, label: &Label) -> GraphResult<Vec<RuleNode>> {
        self.rules_for(label, RuleIndexKind::ConditionNegative)
    }

    /// Rules whose `then` can produce instances of `label`.
    pub fn concluding_rules(&self, label: &Label) -> GraphResult<Vec<RuleNode>> {
        self.rules_for(label, RuleIndexKind::Conclusion)
    }

    fn rules_for(&self, label: &Label, kind: RuleIndexKind) -> GraphResult<Vec<RuleNode>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types.rules_for(&node, kind)
    }

    /// Types a rule is indexed against for `kind`.
    pub fn rule_types(&self, label: &str, kind: RuleIndexKind) -> GraphResult<Vec<TypeNode>> {
        let types = self.type_manager();
        let rule = types.expect_rule(label)?;
        types.rule_types(rule.id, kind)
    }

    // ---- types ---------------------------------------------------------

    /// Type labelled `label`, if any.
    pub fn get_type(&self, label: &Label) -> GraphResult<Option<TypeNode>> {
        self.type_manager().get_type(label)
    }

    /// Direct supertype of `label`, `None` for roots.
    pub fn supertype(&self, label: &Label) -> GraphResult<Option<TypeNode>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types.supertype(&node)
    }

    /// `label` followed by all of its supertypes, nearest first.
    pub fn supertypes(&self, label: &Label) -> GraphResult<Vec<TypeNode>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types.supertypes(&node).collect()
    }

    /// `label` and all of its transitive subtypes.
    pub fn subtypes(&self, label: &Label) -> GraphResult<Vec<TypeNode>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types.subtypes(&node).collect()
    }

    /// Returns true if the type labelled `label` is abstract.
    pub fn is_abstract(&self, label: &Label) -> GraphResult<bool> {
        Ok(self.type_manager().expect_type(label)?.is_abstract)
    }

    /// Roles of a relation type, inherited ones included.
    pub fn get_relates(&self, label: &Label) -> GraphResult<Vec<TypeNode>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types.get_relates(&node)
    }

    /// Ownerships of a thing type, inherited ones included.
    pub fn get_owns(&self, label: &Label) -> GraphResult<Vec<OwnsEdge>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types.get_owns(&node)
    }

    /// Roles a thing type can play, inherited ones included.
    pub fn get_plays(&self, label: &Label) -> GraphResult<Vec<TypeNode>> {
        let types = self.type_manager();
        let node = types.expect_type(label)?;
        types
            .get_plays(&node)?
            .into_iter()
            .map(|id| types.get_by_id(id))
            .collect()
    }

    // ---- things --------------------------------------------------------

    /// Instance with IID `iid`, if any.
    pub fn get_thing(&self, iid: ThingId) -> GraphResult<Option<Thing>> {
        Ok(self.things.get(iid)?)
    }

    /// Attributes owned by the instance `iid`.
    pub fn get_has(&self, iid: ThingId) -> GraphResult<Vec<Thing>> {
        let types = self.type_manager();
        let things = ThingManager::new(&types, self.things.as_ref(), &self.config);
        let owner = things.expect_thing(iid)?;
        things.get_has(&owner)
    }

    /// Role players of the relation `iid`.
    pub fn get_players(&self, iid: ThingId) -> GraphResult<Vec<(TypeNode, Thing)>> {
        let types = self.type_manager();
        let things = ThingManager::new(&types, self.things.as_ref(), &self.config);
        let relation = things.expect_thing(iid)?;
        things.get_players(&relation)
    }

    /// Instances whose type is exactly `label`.
    pub fn instances(&self, label: &Label) -> GraphResult<Vec<Thing>> {
        let node = self.type_manager().expect_type(label)?;
        Ok(self.things.find_by_type(node.id)?)
    }
}
