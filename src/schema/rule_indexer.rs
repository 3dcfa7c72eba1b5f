//! Rule storage and indexing.
//!
//! A rule's patterns are decomposed into three sets of direct edges towards
//! the types they reference, so reasoners can find relevant rules by type
//! without re-reading patterns. The edge sets are derived data: they are
//! always recomputed in full, never patched.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::concept::{Label, RuleIndexKind, RuleNode, TypeId, TypeKind};
use crate::config::EngineConfig;
use crate::error::{GraphResult, ReadError, SchemaError};
use crate::pattern::{
    scope_role, type_labels, Conjunction, Negation, RuleDeclaration, ThingConstraint,
    ThingVariable, TypeRef,
};
use crate::schema::TypeManager;

/// The three edge sets of one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleIndex {
    /// Types in the positive conditions.
    pub positive: BTreeSet<TypeId>,
    /// Types in negated conditions.
    pub negative: BTreeSet<TypeId>,
    /// Types in the conclusion.
    pub conclusion: BTreeSet<TypeId>,
}

impl RuleIndex {
    /// The edge set of `kind`.
    #[must_use]
    pub const fn edges(&self, kind: RuleIndexKind) -> &BTreeSet<TypeId> {
        match kind {
            RuleIndexKind::ConditionPositive => &self.positive,
            RuleIndexKind::ConditionNegative => &self.negative,
            RuleIndexKind::Conclusion => &self.conclusion,
        }
    }
}

/// Creates, re-indexes and deletes rules.
pub struct RuleIndexer<'a> {
    types: &'a TypeManager<'a>,
    config: &'a EngineConfig,
}

impl<'a> RuleIndexer<'a> {
    /// Creates an indexer over `types`.
    #[must_use]
    pub fn new(types: &'a TypeManager<'a>, config: &'a EngineConfig) -> Self {
        Self { types, config }
    }

    /// Create the rule, or replace the patterns of an existing rule with
    /// the same label, and index it.
    ///
    /// Every label is resolved before anything is written, so a failure
    /// leaves both the rule and its edges untouched.
    #[instrument(name = "rule_indexer.index", skip_all, fields(rule = %declaration.label))]
    pub fn put_rule(&self, declaration: &RuleDeclaration) -> GraphResult<RuleNode> {
        let index = self.compute(&declaration.when, &declaration.then)?;
        let store = self.types.store();

        let rule = match store.get_rule_by_label(&declaration.label)? {
            Some(mut existing) => {
                existing.when = declaration.when.clone();
                existing.then = declaration.then.clone();
                store.update_rule(existing.clone())?;
                existing
            }
            None => {
                let rule = RuleNode::new(
                    declaration.label.clone(),
                    declaration.when.clone(),
                    declaration.then.clone(),
                );
                store.create_rule(rule.clone())?;
                rule
            }
        };
        self.write(&rule, &index)?;
        self.validate(&rule)?;
        Ok(rule)
    }

    /// Recompute the edges of a stored rule from its current patterns.
    #[instrument(name = "rule_indexer.index", skip_all, fields(rule = %rule.label))]
    pub fn index(&self, rule: &RuleNode) -> GraphResult<RuleIndex> {
        let index = self.compute(&rule.when, &rule.then)?;
        self.write(rule, &index)?;
        self.validate(rule)?;
        Ok(index)
    }

    /// Delete the rule labelled `label` together with its edges.
    pub fn delete_rule(&self, label: &str) -> GraphResult<()> {
        let rule = self.types.expect_rule(label)?;
        self.types.store().delete_rule(rule.id)?;
        debug!(rule = %label, "deleted rule");
        Ok(())
    }

    /// Relabel a rule. Its patterns and index edges are unchanged.
    pub fn rename_rule(&self, label: &str, new_label: &str) -> GraphResult<RuleNode> {
        let mut rule = self.types.expect_rule(label)?;
        rule.label = new_label.to_string();
        self.types.store().update_rule(rule.clone())?;
        debug!(rule = %label, new_label, "renamed rule");
        Ok(rule)
    }

    /// Satisfiability checks on rule patterns. None are enforced yet; this is
    /// the hook where they belong.
    pub fn validate(&self, _rule: &RuleNode) -> GraphResult<()> {
        Ok(())
    }

    fn write(&self, rule: &RuleNode, index: &RuleIndex) -> GraphResult<()> {
        let store = self.types.store();
        for kind in RuleIndexKind::ALL {
            store.delete_rule_edges(rule.id, kind)?;
            for target in index.edges(kind) {
                store.put_rule_edge(rule.id, kind, *target)?;
            }
        }
        debug!(
            rule = %rule.label,
            positive = index.positive.len(),
            negative = index.negative.len(),
            conclusion = index.conclusion.len(),
            "indexed rule"
        );
        Ok(())
    }

    /// Resolve every label referenced by `when` and `then` without writing anything.
    pub fn compute(&self, when: &Conjunction, then: &ThingVariable) -> GraphResult<RuleIndex> {
        let mut index = RuleIndex::default();
        self.conditions(&when.variables, &mut index.positive)?;

        let mut pending: Vec<(&Negation, usize)> = when.negations.iter().map(|n| (n, 1)).collect();
        while let Some((negation, depth)) = pending.pop() {
            for conjunction in &negation.disjunction {
                self.conditions(&conjunction.variables, &mut index.negative)?;
                if self.config.index_nested_negations {
                    pending.extend(conjunction.negations.iter().map(|n| (n, depth + 1)));
                }
            }
        }

        self.conclusions(then, &mut index.conclusion)?;
        Ok(index)
    }

    fn conditions(&self, variables: &[ThingVariable], out: &mut BTreeSet<TypeId>) -> GraphResult<()> {
        let mut labels = Vec::new();
        for variable in variables {
            type_labels(variable, &mut labels);
        }
        for label in labels {
            if let Some(scope) = label.scope() {
                let relation = self.types.expect_type(&Label::new(scope))?;
                let role = self.types.expect_role(&label)?;
                out.insert(relation.id);
                out.insert(role.id);
            } else {
                out.insert(self.types.expect_type(&label)?.id);
            }
        }
        Ok(())
    }

    fn conclusions(&self, then: &ThingVariable, out: &mut BTreeSet<TypeId>) -> GraphResult<()> {
        let mut pending = vec![then];
        while let Some(var) = pending.pop() {
            for constraint in &var.constraints {
                match constraint {
                    ThingConstraint::Isa { type_ref } => {
                        if let Some(label) = type_ref.label() {
                            out.insert(self.types.expect_type(label)?.id);
                        }
                    }
                    ThingConstraint::Has { attribute } => pending.push(attribute),
                    ThingConstraint::Relation { players } => {
                        let Some(relation_label) = var.isa_label() else {
                            return Err(SchemaError::InvalidRule {
                                label: var.reference.to_string(),
                                reason: "a concluded relation must name its relation type".to_string(),
                            }
                            .into());
                        };
                        let relation = self
                            .types
                            .get_type_of_kind(relation_label, TypeKind::Relation)?
                            .ok_or_else(|| ReadError::TypeNotFound {
                                label: relation_label.clone(),
                            })?;
                        for slot in players {
                            if let Some(role) = slot.role.as_ref().and_then(TypeRef::label) {
                                let resolved = self
                                    .types
                                    .get_relates_by_name(&relation, role.name())?
                                    .ok_or_else(|| ReadError::TypeNotFound {
                                        label: scope_role(role, Some(relation_label)),
                                    })?;
                                out.insert(resolved.id);
                            }
                            pending.push(&slot.player);
                        }
                    }
                    ThingConstraint::Iid { .. }
                    | ThingConstraint::Value { .. }
                    | ThingConstraint::Is { .. } => {}
                }
            }
        }
        Ok(())
    }
}
