//! Instance creation and edge attachment.
//!
//! Every write checks the schema first: the type must be concrete (and,
//! when configured, committed), attribute values must have the type's value
//! kind and match its regexes, and `has` / role-player edges must be allowed
//! by `owns` / `relates` / `plays`.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::concept::{Thing, ThingId, TypeKind, TypeNode, TypeStatus};
use crate::config::EngineConfig;
use crate::error::{GraphResult, ReadError, ThingWriteError};
use crate::schema::type_manager::cached_regex;
use crate::schema::TypeManager;
use crate::storage::{RolePlayer, ThingStore};
use crate::value::Value;

/// Instance access for one batch.
pub struct ThingManager<'a> {
    types: &'a TypeManager<'a>,
    things: &'a dyn ThingStore,
    config: &'a EngineConfig,
}

impl<'a> ThingManager<'a> {
    /// Creates a manager over `types` and `things`.
    #[must_use]
    pub fn new(
        types: &'a TypeManager<'a>,
        things: &'a dyn ThingStore,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            types,
            things,
            config,
        }
    }

    /// The schema this manager writes against.
    #[must_use]
    pub fn types(&self) -> &'a TypeManager<'a> {
        self.types
    }

    /// Get an instance by IID.
    pub fn get_thing(&self, iid: ThingId) -> GraphResult<Option<Thing>> {
        Ok(self.things.get(iid)?)
    }

    /// Get an instance by IID, failing with `ThingNotFound`.
    pub fn expect_thing(&self, iid: ThingId) -> GraphResult<Thing> {
        self.get_thing(iid)?
            .ok_or_else(|| ReadError::ThingNotFound { iid }.into())
    }

    /// The type of `thing`.
    pub fn thing_type(&self, thing: &Thing) -> GraphResult<TypeNode> {
        self.types.get_by_id(thing.type_id)
    }

    fn validate_instantiable(&self, node: &TypeNode, kind: TypeKind) -> GraphResult<()> {
        if node.kind != kind {
            return Err(ReadError::InvalidTypeCast {
                label: node.label.clone(),
                expected: kind.to_string(),
                actual: node.kind.to_string(),
            }
            .into());
        }
        if self.config.require_committed_types && node.status == TypeStatus::Buffered {
            return Err(ThingWriteError::UncommittedType {
                label: node.label.clone(),
            }
            .into());
        }
        if !node.is_instantiable() {
            return Err(ThingWriteError::IllegalAbstractWrite {
                label: node.label.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Create a new entity of `node`.
    pub fn create_entity(&self, node: &TypeNode) -> GraphResult<Thing> {
        self.validate_instantiable(node, TypeKind::Entity)?;
        let thing = Thing::new(node.id);
        self.things.insert(thing.clone())?;
        debug!(iid = %thing.id, label = %node.label, "created entity");
        Ok(thing)
    }

    /// Create a new relation of `node`, without players.
    pub fn create_relation(&self, node: &TypeNode) -> GraphResult<Thing> {
        self.validate_instantiable(node, TypeKind::Relation)?;
        let thing = Thing::new(node.id);
        self.things.insert(thing.clone())?;
        debug!(iid = %thing.id, label = %node.label, "created relation");
        Ok(thing)
    }

    /// Get-or-create the attribute of `node` holding `value`.
    ///
    /// Attribute identity is derived from (type, value), so putting the same
    /// value twice returns the same instance.
    pub fn put_attribute(&self, node: &TypeNode, value: Value) -> GraphResult<Thing> {
        self.validate_instantiable(node, TypeKind::Attribute)?;
        let expected = node
            .value_kind
            .ok_or_else(|| ThingWriteError::IllegalAbstractWrite {
                label: node.label.clone(),
            })?;
        if value.kind() != expected {
            return Err(ThingWriteError::ValueKindMismatch {
                label: node.label.clone(),
                expected,
                actual: value.kind(),
            }
            .into());
        }
        if let Some(text) = value.as_string() {
            for regex in self.types.regexes(node)? {
                if !cached_regex(&node.label, &regex)?.is_match(text) {
                    return Err(ThingWriteError::RegexViolation {
                        label: node.label.clone(),
                        value: text.to_string(),
                        regex,
                    }
                    .into());
                }
            }
        }

        let iid = ThingId::for_attribute(node.id, &value);
        if let Some(existing) = self.things.get(iid)? {
            return Ok(existing);
        }
        let thing = Thing::attribute(node.id, value);
        self.things.insert(thing.clone())?;
        debug!(iid = %thing.id, label = %node.label, "created attribute");
        Ok(thing)
    }

    /// Put a boolean attribute.
    pub fn put_boolean(&self, node: &TypeNode, value: bool) -> GraphResult<Thing> {
        self.put_attribute(node, Value::Boolean(value))
    }

    /// Put a long attribute.
    pub fn put_long(&self, node: &TypeNode, value: i64) -> GraphResult<Thing> {
        self.put_attribute(node, Value::Long(value))
    }

    /// Put a double attribute.
    pub fn put_double(&self, node: &TypeNode, value: f64) -> GraphResult<Thing> {
        self.put_attribute(node, Value::Double(value))
    }

    /// Put a string attribute.
    pub fn put_string(&self, node: &TypeNode, value: impl Into<String>) -> GraphResult<Thing> {
        self.put_attribute(node, Value::String(value.into()))
    }

    /// Put a datetime attribute.
    pub fn put_datetime(&self, node: &TypeNode, value: NaiveDateTime) -> GraphResult<Thing> {
        self.put_attribute(node, Value::DateTime(value))
    }

    /// Attach `attribute` to `owner`.
    pub fn set_has(&self, owner: &Thing, attribute: &Thing) -> GraphResult<()> {
        let owner_type = self.thing_type(owner)?;
        let attribute_type = self.thing_type(attribute)?;
        let allowed = attribute_type.kind == TypeKind::Attribute
            && self
                .types
                .get_owns(&owner_type)?
                .iter()
                .any(|edge| edge.attribute == attribute_type.id);
        if !allowed {
            return Err(ThingWriteError::IllegalOwnership {
                owner: owner_type.label,
                attribute: attribute_type.label,
            }
            .into());
        }
        self.things.put_has(owner.id, attribute.id)?;
        Ok(())
    }

    /// Attach `player` to `relation` under `role`.
    pub fn add_player(&self, relation: &Thing, role: &TypeNode, player: &Thing) -> GraphResult<()> {
        let relation_type = self.thing_type(relation)?;
        let player_type = self.thing_type(player)?;
        let related = relation_type.kind == TypeKind::Relation
            && self
                .types
                .get_relates(&relation_type)?
                .iter()
                .any(|r| r.id == role.id);
        let playable = related && self.types.get_plays(&player_type)?.contains(&role.id);
        if !playable {
            return Err(ThingWriteError::IllegalRolePlayer {
                relation: relation_type.label,
                role: role.label.clone(),
                player: player_type.label,
            }
            .into());
        }
        self.things.add_player(
            relation.id,
            RolePlayer {
                role: role.id,
                player: player.id,
            },
        )?;
        debug!(relation = %relation.id, role = %role.label, player = %player.id, "added role player");
        Ok(())
    }

    /// Attributes owned by `owner`.
    pub fn get_has(&self, owner: &Thing) -> GraphResult<Vec<Thing>> {
        self.things
            .get_has(owner.id)?
            .into_iter()
            .map(|iid| self.expect_thing(iid))
            .collect()
    }

    /// Role players of `relation` as (role, player) pairs.
    pub fn get_players(&self, relation: &Thing) -> GraphResult<Vec<(TypeNode, Thing)>> {
        self.things
            .get_players(relation.id)?
            .into_iter()
            .map(|edge| Ok((self.types.get_by_id(edge.role)?, self.expect_thing(edge.player)?)))
            .collect()
    }

    /// Instances whose type is exactly `node`.
    pub fn instances(&self, node: &TypeNode) -> GraphResult<Vec<Thing>> {
        Ok(self.things.find_by_type(node.id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::concept::Label;
    use crate::storage::{InMemorySchemaStore, InMemoryThingStore, SchemaStore};
    use crate::value::ValueKind;

    struct Fixture {
        schema: InMemorySchemaStore,
        things: InMemoryThingStore,
        config: EngineConfig,
    }

    impl Fixture {
        /// person owns name, plays employment:employee; company plays employer.
        fn new() -> Self {
            let schema = InMemorySchemaStore::new();
            let config = EngineConfig::default();
            schema.begin().unwrap();
            {
                let types = TypeManager::new(&schema, &config);
                let person = types.put_entity_type(&Label::new("person")).unwrap();
                let company = types.put_entity_type(&Label::new("company")).unwrap();
                let name = types
                    .put_attribute_type(&Label::new("name"), ValueKind::String)
                    .unwrap();
                types.set_regex(&name, "^[A-Z].*").unwrap();
                types
                    .put_attribute_type(&Label::new("age"), ValueKind::Long)
                    .unwrap();
                types.set_owns(&person, &name, None, false).unwrap();
                let employment = types.put_relation_type(&Label::new("employment")).unwrap();
                let employee = types.set_relates(&employment, "employee", None).unwrap();
                let employer = types.set_relates(&employment, "employer", None).unwrap();
                types.set_plays(&person, &employee, None).unwrap();
                types.set_plays(&company, &employer, None).unwrap();
                let shape = types.put_entity_type(&Label::new("shape")).unwrap();
                types.set_abstract(&shape).unwrap();
            }
            schema.commit().unwrap();
            Self {
                schema,
                things: InMemoryThingStore::new(),
                config,
            }
        }
    }

    fn ty(types: &TypeManager<'_>, label: &str) -> TypeNode {
        types.expect_type(&Label::from(label)).unwrap()
    }

    #[test]
    fn attribute_put_is_idempotent() {
        let f = Fixture::new();
        let types = TypeManager::new(&f.schema, &f.config);
        let things = ThingManager::new(&types, &f.things, &f.config);
        let name = ty(&types, "name");
        let a = things.put_string(&name, "Alice").unwrap();
        let b = things.put_string(&name, "Alice").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(things.instances(&name).unwrap().len(), 1);
    }

    #[test]
    fn attribute_put_checks_kind_and_regex() {
        let f = Fixture::new();
        let types = TypeManager::new(&f.schema, &f.config);
        let things = ThingManager::new(&types, &f.things, &f.config);
        let name = ty(&types, "name");
        let age = ty(&types, "age");

        let err = things.put_long(&name, 3).unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::ValueKindMismatch { .. })
        ));
        let err = things.put_string(&name, "alice").unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::RegexViolation { .. })
        ));
        let forty_two = things.put_long(&age, 42).unwrap();
        assert_eq!(forty_two.value, Some(Value::Long(42)));
    }

    #[test]
    fn abstract_root_and_buffered_types_reject_instances() {
        let f = Fixture::new();
        let types = TypeManager::new(&f.schema, &f.config);
        let things = ThingManager::new(&types, &f.things, &f.config);

        let err = things.create_entity(&ty(&types, "shape")).unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::IllegalAbstractWrite { .. })
        ));
        let err = things.create_entity(&ty(&types, "entity")).unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::IllegalAbstractWrite { .. })
        ));

        let robot = types.put_entity_type(&Label::new("robot")).unwrap();
        let err = things.create_entity(&robot).unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::UncommittedType { .. })
        ));

        let mut lenient = f.config;
        lenient.require_committed_types = false;
        let things = ThingManager::new(&types, &f.things, &lenient);
        things.create_entity(&robot).unwrap();
    }

    #[test]
    fn has_requires_ownership() {
        let f = Fixture::new();
        let types = TypeManager::new(&f.schema, &f.config);
        let things = ThingManager::new(&types, &f.things, &f.config);
        let alice = things.create_entity(&ty(&types, "person")).unwrap();
        let acme = things.create_entity(&ty(&types, "company")).unwrap();
        let name = things.put_string(&ty(&types, "name"), "Alice").unwrap();

        things.set_has(&alice, &name).unwrap();
        assert_eq!(things.get_has(&alice).unwrap(), vec![name.clone()]);

        let err = things.set_has(&acme, &name).unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::IllegalOwnership { .. })
        ));
    }

    #[test]
    fn role_players_must_be_related_and_playable() {
        let f = Fixture::new();
        let types = TypeManager::new(&f.schema, &f.config);
        let things = ThingManager::new(&types, &f.things, &f.config);
        let alice = things.create_entity(&ty(&types, "person")).unwrap();
        let job = things.create_relation(&ty(&types, "employment")).unwrap();
        let employee = ty(&types, "employment:employee");
        let employer = ty(&types, "employment:employer");

        things.add_player(&job, &employee, &alice).unwrap();
        let players = things.get_players(&job).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].0.id, employee.id);
        assert_eq!(players[0].1.id, alice.id);

        let err = things.add_player(&job, &employer, &alice).unwrap_err();
        assert!(matches!(
            err.as_write(),
            Some(ThingWriteError::IllegalRolePlayer { .. })
        ));
    }

    #[test]
    fn missing_thing_is_a_read_error() {
        let f = Fixture::new();
        let types = TypeManager::new(&f.schema, &f.config);
        let things = ThingManager::new(&types, &f.things, &f.config);
        let err = things.expect_thing(ThingId::new()).unwrap_err();
        assert!(matches!(err.as_read(), Some(ReadError::ThingNotFound { .. })));
    }
}
