//! Supertype and subtype navigation.
//!
//! Both walks are lazy and single-use: each call to `next` reads one node
//! (and its edges) from the store. Neither caches anything, so a second walk
//! re-reads the graph.

use crate::concept::{TypeId, TypeNode};
use crate::error::{GraphResult, SchemaError};
use crate::storage::{SchemaStore, StorageError};

/// The direct supertype of `node`, if it has one of the same kind.
///
/// Roots have no `sub` edge, so this returns `None` for them.
pub fn direct_supertype(store: &dyn SchemaStore, node: &TypeNode) -> GraphResult<Option<TypeNode>> {
    let Some(sup_id) = store.get_sub(node.id)? else {
        return Ok(None);
    };
    let sup = store
        .get_type(sup_id)?
        .ok_or(StorageError::TypeNotFound(sup_id))?;
    Ok((sup.kind == node.kind).then_some(sup))
}

/// Lazy walk from a type up to the root of its kind, starting with the type itself.
///
/// The walk stops with `SchemaError::HierarchyTooDeep` once more than
/// `max_depth` supertypes have been produced.
pub struct Supertypes<'a> {
    store: &'a dyn SchemaStore,
    next: Option<TypeNode>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Supertypes<'a> {
    /// Start a walk at `start`.
    #[must_use]
    pub fn new(store: &'a dyn SchemaStore, start: TypeNode, max_depth: usize) -> Self {
        Self {
            store,
            next: Some(start),
            depth: 0,
            max_depth,
        }
    }
}

impl Iterator for Supertypes<'_> {
    type Item = GraphResult<TypeNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if self.depth > self.max_depth {
            return Some(Err(SchemaError::HierarchyTooDeep {
                label: current.label,
                max_depth: self.max_depth,
            }
            .into()));
        }
        self.depth += 1;
        match direct_supertype(self.store, &current) {
            Ok(sup) => {
                self.next = sup;
                Some(Ok(current))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Lazy walk over a type and all of its transitive subtypes.
///
/// Order is depth-first but not significant; only membership is.
pub struct Subtypes<'a> {
    store: &'a dyn SchemaStore,
    pending: Vec<TypeId>,
}

impl<'a> Subtypes<'a> {
    /// Start a walk at `start`.
    #[must_use]
    pub fn new(store: &'a dyn SchemaStore, start: TypeId) -> Self {
        Self {
            store,
            pending: vec![start],
        }
    }

    fn visit(&mut self, id: TypeId) -> GraphResult<TypeNode> {
        let node = self
            .store
            .get_type(id)?
            .ok_or(StorageError::TypeNotFound(id))?;
        let children = self.store.get_direct_subtypes(id)?;
        self.pending.extend(children);
        Ok(node)
    }
}

impl Iterator for Subtypes<'_> {
    type Item = GraphResult<TypeNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.pending.pop()?;
        let result = self.visit(id);
        if result.is_err() {
            self.pending.clear();
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use crate::concept::{Label, Root, TypeKind};
    use crate::storage::InMemorySchemaStore;

    fn chain(store: &InMemorySchemaStore, labels: &[&str]) -> Vec<TypeNode> {
        let mut parent = store.get_type_by_label(&Root::Entity.label()).unwrap().unwrap();
        let mut out = Vec::new();
        for label in labels {
            let node = TypeNode::new(Label::new(*label), TypeKind::Entity);
            store.create_type(node.clone()).unwrap();
            store.set_sub(node.id, parent.id).unwrap();
            parent = node.clone();
            out.push(node);
        }
        out
    }

    #[test]
    fn supertypes_walk_to_root_inclusive() {
        let store = InMemorySchemaStore::new();
        let nodes = chain(&store, &["animal", "mammal", "dog"]);
        let labels: Vec<String> = Supertypes::new(&store, nodes[2].clone(), 16)
            .map(|n| n.unwrap().label.to_string())
            .collect();
        assert_eq!(labels, vec!["dog", "mammal", "animal", "entity"]);
    }

    #[test]
    fn direct_supertype_of_root_is_none() {
        let store = InMemorySchemaStore::new();
        let root = store.get_type_by_label(&Root::Entity.label()).unwrap().unwrap();
        assert!(direct_supertype(&store, &root).unwrap().is_none());
    }

    #[test]
    fn supertypes_stop_at_max_depth() {
        let store = InMemorySchemaStore::new();
        let nodes = chain(&store, &["a", "b", "c", "d"]);
        let results: Vec<_> = Supertypes::new(&store, nodes[3].clone(), 1).collect();
        assert_eq!(results.len(), 3);
        assert!(results[..2].iter().all(Result::is_ok));
        let err = results[2].as_ref().unwrap_err();
        assert!(matches!(
            err.as_schema(),
            Some(SchemaError::HierarchyTooDeep { max_depth: 1, .. })
        ));
    }

    #[test]
    fn subtypes_include_self_and_all_descendants() {
        let store = InMemorySchemaStore::new();
        let nodes = chain(&store, &["animal", "mammal", "dog"]);
        let cat = TypeNode::new(Label::new("cat"), TypeKind::Entity);
        store.create_type(cat.clone()).unwrap();
        store.set_sub(cat.id, nodes[1].id).unwrap();

        let found: HashSet<String> = Subtypes::new(&store, nodes[0].id)
            .map(|n| n.unwrap().label.to_string())
            .collect();
        let expected: HashSet<String> = ["animal", "mammal", "dog", "cat"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn subtypes_of_missing_type_errors_once() {
        let store = InMemorySchemaStore::new();
        let mut walk = Subtypes::new(&store, TypeId::new());
        assert!(walk.next().unwrap().is_err());
        assert!(walk.next().is_none());
    }
}
