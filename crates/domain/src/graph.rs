//! The entity graph: id-keyed registries for actors, items and activities.
//!
//! Parents are referenced by id and resolved on demand. Each entry keeps the
//! raw source record it was built from, so every pass can rebuild the typed
//! record from scratch.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;
use serde_json::Value;

use crate::entities::{Activity, Actor, Item};
use crate::error::{DomainError, FieldFailure, SchemaError};
use crate::ids::{ActivityId, ActorId, ItemId};
use crate::migration::transform_legacy;
use crate::roll_data::RollData;

/// A typed record and the raw source it was built from.
#[derive(Debug, Clone)]
pub struct Record<T> {
    source: Value,
    data: T,
}

impl<T> Record<T> {
    pub fn source(&self) -> &Value {
        &self.source
    }

    pub fn data(&self) -> &T {
        &self.data
    }
}

#[derive(Debug, Clone)]
struct Registry<K, T> {
    order: Vec<K>,
    records: HashMap<K, Record<T>>,
}

impl<K, T> Default for Registry<K, T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash, T> Registry<K, T> {
    fn insert(&mut self, id: K, source: Value, data: T) {
        if self.records.insert(id, Record { source, data }).is_none() {
            self.order.push(id);
        }
    }

    fn get(&self, id: &K) -> Option<&Record<T>> {
        self.records.get(id)
    }

    fn get_mut(&mut self, id: &K) -> Option<&mut Record<T>> {
        self.records.get_mut(id)
    }

    fn remove(&mut self, id: &K) -> Option<Record<T>> {
        let record = self.records.remove(id)?;
        self.order.retain(|k| k != id);
        Some(record)
    }

    fn ids(&self) -> Vec<K> {
        self.order.clone()
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| &r.data))
    }
}

/// Actors own items; items own activities.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    actors: Registry<ActorId, Actor>,
    items: Registry<ItemId, Item>,
    activities: Registry<ActivityId, Activity>,
}

/// Outcome of rebuilding one record from its source.
pub type Rebuilt = Result<(), SchemaError>;

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -- insertion ---------------------------------------------------------

    /// Store an actor record. Invalid fields are kept at their defaults and
    /// reported again by the next base pass.
    pub fn insert_actor(&mut self, raw: Value) -> Result<ActorId, SchemaError> {
        let id = ActorId::new();
        let (actor, _) = Actor::from_source_lenient(id, &raw)?;
        self.actors.insert(id, raw, actor);
        Ok(id)
    }

    /// Store an item under `actor` (or unowned with `None`).
    pub fn insert_item(&mut self, actor: Option<ActorId>, raw: Value) -> Result<ItemId, DomainError> {
        if let Some(actor_id) = actor {
            if self.actors.get(&actor_id).is_none() {
                return Err(DomainError::not_found("Actor", actor_id.to_string()));
            }
        }
        let id = ItemId::new();
        let (item, _) = Item::from_source_lenient(id, actor, &raw)?;
        self.items.insert(id, raw, item);
        if let Some(record) = actor.and_then(|a| self.actors.get_mut(&a)) {
            record.data.items.push(id);
        }
        Ok(id)
    }

    pub fn insert_activity(
        &mut self,
        item: Option<ItemId>,
        raw: Value,
    ) -> Result<ActivityId, DomainError> {
        if let Some(item_id) = item {
            if self.items.get(&item_id).is_none() {
                return Err(DomainError::not_found("Item", item_id.to_string()));
            }
        }
        let id = ActivityId::new();
        let (activity, _) = Activity::from_source_lenient(id, item, &raw)?;
        self.activities.insert(id, raw, activity);
        if let Some(record) = item.and_then(|i| self.items.get_mut(&i)) {
            record.data.activities.push(id);
        }
        Ok(id)
    }

    /// Migrate a legacy flat item and store the resulting item and
    /// activity. Nothing is stored when migration fails.
    pub fn insert_legacy_item(
        &mut self,
        actor: Option<ActorId>,
        legacy: &Value,
    ) -> Result<(ItemId, Option<ActivityId>), DomainError> {
        let migrated = transform_legacy(legacy)?;
        let item_id = self.insert_item(actor, migrated.item)?;
        let activity_id = match migrated.activity {
            Some(activity) => match self.insert_activity(Some(item_id), activity) {
                Ok(id) => Some(id),
                Err(e) => {
                    self.remove_item(item_id);
                    return Err(e);
                }
            },
            None => None,
        };
        Ok((item_id, activity_id))
    }

    /// Remove an actor. Its items keep their back-reference and report a
    /// missing parent on the next pass.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Value> {
        self.actors.remove(&id).map(|r| r.source)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<Value> {
        let record = self.items.remove(&id)?;
        if let Some(actor) = record.data.actor.and_then(|a| self.actors.get_mut(&a)) {
            actor.data.items.retain(|i| *i != id);
        }
        Some(record.source)
    }

    pub fn remove_activity(&mut self, id: ActivityId) -> Option<Value> {
        let record = self.activities.remove(&id)?;
        if let Some(item) = record.data.item.and_then(|i| self.items.get_mut(&i)) {
            item.data.activities.retain(|a| *a != id);
        }
        Some(record.source)
    }

    // -- lookup ------------------------------------------------------------

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id).map(Record::data)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id).map(Record::data)
    }

    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.get(&id).map(Record::data)
    }

    pub fn actor_source(&self, id: ActorId) -> Option<&Value> {
        self.actors.get(&id).map(Record::source)
    }

    pub fn item_source(&self, id: ItemId) -> Option<&Value> {
        self.items.get(&id).map(Record::source)
    }

    pub fn activity_source(&self, id: ActivityId) -> Option<&Value> {
        self.activities.get(&id).map(Record::source)
    }

    /// Ids in insertion order.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.ids()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.ids()
    }

    pub fn activity_ids(&self) -> Vec<ActivityId> {
        self.activities.ids()
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    // -- preparation access --------------------------------------------------

    /// Rebuild the typed actor from its source. On failure the lenient
    /// rebuild is kept and the error returned.
    pub fn rebuild_actor(&mut self, id: ActorId) -> Option<Rebuilt> {
        let record = self.actors.get_mut(&id)?;
        let (result, rebuilt) = rebuild(
            || Actor::from_source(id, &record.source),
            || Actor::from_source_lenient(id, &record.source),
        );
        if let Some(mut actor) = rebuilt {
            actor.items = std::mem::take(&mut record.data.items);
            record.data = actor;
        }
        Some(result)
    }

    pub fn rebuild_item(&mut self, id: ItemId) -> Option<Rebuilt> {
        let record = self.items.get_mut(&id)?;
        let actor = record.data.actor;
        let (result, rebuilt) = rebuild(
            || Item::from_source(id, actor, &record.source),
            || Item::from_source_lenient(id, actor, &record.source),
        );
        if let Some(mut item) = rebuilt {
            item.activities = std::mem::take(&mut record.data.activities);
            record.data = item;
        }
        Some(result)
    }

    pub fn rebuild_activity(&mut self, id: ActivityId) -> Option<Rebuilt> {
        let record = self.activities.get_mut(&id)?;
        let item = record.data.item;
        let (result, rebuilt) = rebuild(
            || Activity::from_source(id, item, &record.source),
            || Activity::from_source_lenient(id, item, &record.source),
        );
        if let Some(activity) = rebuilt {
            record.data = activity;
        }
        Some(result)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id).map(|r| &mut r.data)
    }

    /// The item and its owning actor. The actor is `None` for unowned
    /// items and for items whose actor is gone.
    pub fn item_with_actor_mut(&mut self, id: ItemId) -> Option<(&mut Item, Option<&Actor>)> {
        let item = &mut self.items.get_mut(&id)?.data;
        let actor = item.actor.and_then(|a| self.actors.get(&a)).map(Record::data);
        Some((item, actor))
    }

    /// The activity with its item and the item's actor.
    pub fn activity_with_parents_mut(
        &mut self,
        id: ActivityId,
    ) -> Option<(&mut Activity, Option<&Item>, Option<&Actor>)> {
        let activity = &mut self.activities.get_mut(&id)?.data;
        let item = activity.item.and_then(|i| self.items.get(&i)).map(Record::data);
        let actor = item
            .and_then(|i| i.actor)
            .and_then(|a| self.actors.get(&a))
            .map(Record::data);
        Some((activity, item, actor))
    }

    /// Whether the item's owner reference resolves (or is unset).
    pub fn item_parent_present(&self, id: ItemId) -> bool {
        self.item(id)
            .and_then(|item| item.actor)
            .map_or(true, |actor| self.actors.get(&actor).is_some())
    }

    pub fn activity_parent_present(&self, id: ActivityId) -> bool {
        self.activity(id)
            .and_then(|activity| activity.item)
            .map_or(true, |item| self.items.get(&item).is_some())
    }

    /// Flattened numeric snapshot of every actor and item.
    pub fn roll_data(&self) -> RollData {
        let mut data = RollData::new();
        for actor in self.actors() {
            data.insert_actor(actor.id, actor.roll_values());
        }
        for item in self.items() {
            data.insert_item(item.id, item.roll_values());
        }
        data
    }

    // -- export --------------------------------------------------------------

    /// The prepared actor as a record (source fields plus derived values).
    pub fn export_actor(&self, id: ActorId) -> Option<Value> {
        self.actor(id).and_then(export)
    }

    pub fn export_item(&self, id: ItemId) -> Option<Value> {
        self.item(id).and_then(export)
    }

    pub fn export_activity(&self, id: ActivityId) -> Option<Value> {
        self.activity(id).and_then(export)
    }
}

fn export<T: Serialize>(record: &T) -> Option<Value> {
    serde_json::to_value(record).ok()
}

/// Strict first; on failure fall back to the lenient decode so the entity
/// keeps default values for the fields that failed. `None` leaves the
/// previous record in place.
fn rebuild<T>(
    strict: impl FnOnce() -> Result<T, SchemaError>,
    lenient: impl FnOnce() -> Result<(T, Vec<FieldFailure>), SchemaError>,
) -> (Rebuilt, Option<T>) {
    match strict() {
        Ok(data) => (Ok(()), Some(data)),
        Err(err) => (Err(err), lenient().ok().map(|(data, _)| data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph() -> (EntityGraph, ActorId, ItemId, ActivityId) {
        let mut graph = EntityGraph::new();
        let actor = graph
            .insert_actor(json!({ "name": "Hero", "abilities": { "str": { "value": 14 } } }))
            .unwrap();
        let item = graph
            .insert_item(Some(actor), json!({ "name": "Club", "type": "weapon" }))
            .unwrap();
        let activity = graph
            .insert_activity(Some(item), json!({ "type": "attack" }))
            .unwrap();
        (graph, actor, item, activity)
    }

    #[test]
    fn test_back_references_and_child_lists() {
        let (graph, actor, item, activity) = graph();
        assert_eq!(graph.actor(actor).unwrap().items, vec![item]);
        assert_eq!(graph.item(item).unwrap().actor, Some(actor));
        assert_eq!(graph.item(item).unwrap().activities, vec![activity]);
        assert_eq!(graph.activity(activity).unwrap().item, Some(item));
    }

    #[test]
    fn test_insert_requires_existing_parent() {
        let mut graph = EntityGraph::new();
        let err = graph.insert_item(Some(ActorId::new()), json!({})).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity_type: "Actor", .. }));
        assert!(graph.insert_item(None, json!({})).is_ok());
    }

    #[test]
    fn test_rebuild_preserves_links_and_resets_derived() {
        let (mut graph, actor, item, activity) = graph();
        graph.actor_mut(actor).unwrap().derived.proficiency = Some(9);
        assert_eq!(graph.rebuild_actor(actor), Some(Ok(())));
        assert_eq!(graph.actor(actor).unwrap().derived.proficiency, None);
        assert_eq!(graph.actor(actor).unwrap().items, vec![item]);

        assert_eq!(graph.rebuild_item(item), Some(Ok(())));
        assert_eq!(graph.item(item).unwrap().activities, vec![activity]);
        assert_eq!(graph.rebuild_activity(activity), Some(Ok(())));
        assert_eq!(graph.activity(activity).unwrap().item, Some(item));
    }

    #[test]
    fn test_rebuild_failure_keeps_defaults() {
        let mut graph = EntityGraph::new();
        let actor = graph
            .insert_actor(json!({ "name": "Broken", "level": "high" }))
            .unwrap();
        let err = graph.rebuild_actor(actor).unwrap().unwrap_err();
        assert_eq!(err.first_path(), Some("level"));
        let rebuilt = graph.actor(actor).unwrap();
        assert_eq!(rebuilt.name, "Broken");
        assert_eq!(rebuilt.level, 1);
    }

    #[test]
    fn test_out_of_range_integers_fall_back_per_field() {
        let mut graph = EntityGraph::new();
        let actor = graph
            .insert_actor(json!({ "name": "Giant", "abilities": { "str": { "value": 3_000_000_000_i64 } } }))
            .unwrap();
        assert_eq!(graph.actor(actor).unwrap().abilities["str"].value, 10);
        let err = graph.rebuild_actor(actor).unwrap().unwrap_err();
        assert_eq!(err.first_path(), Some("abilities.str.value"));
        assert_eq!(graph.actor(actor).unwrap().name, "Giant");

        let activity = graph
            .insert_activity(
                None,
                json!({ "type": "attack", "attack": { "bonus": "2", "critical": { "threshold": 5_000_000_000_i64 } } }),
            )
            .unwrap();
        let err = graph.rebuild_activity(activity).unwrap().unwrap_err();
        assert_eq!(err.first_path(), Some("attack.critical.threshold"));
    }

    #[test]
    fn test_removed_parent_is_detected() {
        let (mut graph, actor, item, activity) = graph();
        assert!(graph.item_parent_present(item));
        graph.remove_actor(actor);
        assert!(!graph.item_parent_present(item));
        let (_, owner) = graph.item_with_actor_mut(item).unwrap();
        assert!(owner.is_none());

        graph.remove_item(item);
        assert!(!graph.activity_parent_present(activity));
    }

    #[test]
    fn test_parents_resolve_for_activity() {
        let (mut graph, actor, item, activity) = graph();
        let (_, owner_item, owner_actor) = graph.activity_with_parents_mut(activity).unwrap();
        assert_eq!(owner_item.map(|i| i.id), Some(item));
        assert_eq!(owner_actor.map(|a| a.id), Some(actor));
    }

    #[test]
    fn test_ids_keep_insertion_order() {
        let mut graph = EntityGraph::new();
        let ids: Vec<ActorId> = (0..4)
            .map(|n| graph.insert_actor(json!({ "name": format!("a{n}") })).unwrap())
            .collect();
        assert_eq!(graph.actor_ids(), ids);
        graph.remove_actor(ids[1]);
        assert_eq!(graph.actor_ids(), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_legacy_insert() {
        let mut graph = EntityGraph::new();
        let actor = graph.insert_actor(json!({})).unwrap();
        let (item, activity) = graph
            .insert_legacy_item(
                Some(actor),
                &json!({
                    "name": "Dagger",
                    "type": "weapon",
                    "actionType": "mwak",
                    "damage": { "parts": [["1d4 + @mod", "piercing"]] }
                }),
            )
            .unwrap();
        let activity = activity.unwrap();
        assert!(graph.item(item).unwrap().damage.base.is_some());
        assert_eq!(graph.item(item).unwrap().activities, vec![activity]);

        let err = graph
            .insert_legacy_item(Some(actor), &json!({ "type": "weapon", "actionType": "save" }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Migration(_)));
        assert_eq!(graph.item_ids(), vec![item]);

        let err = graph
            .insert_legacy_item(
                Some(actor),
                &json!({ "type": "weapon", "actionType": "mwak", "critical": { "threshold": 5_000_000_000_i64 } }),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Migration(_)));
        assert_eq!(graph.item_ids(), vec![item]);
        assert_eq!(graph.actor(actor).unwrap().items, vec![item]);
    }

    #[test]
    fn test_export_includes_source_fields() {
        let (graph, actor, _, _) = graph();
        let exported = graph.export_actor(actor).unwrap();
        assert_eq!(exported["name"], "Hero");
        assert_eq!(exported["abilities"]["str"]["value"], 14);
    }
}
