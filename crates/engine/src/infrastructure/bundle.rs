//! JSON bundles: a whole entity graph in one document.
//!
//! ```json
//! {
//!   "actors": [
//!     { "name": "Hero", "items": [
//!       { "name": "Club", "type": "weapon", "activities": [{ "type": "attack" }] },
//!       { "legacy": true, "name": "Dagger", "actionType": "mwak" }
//!     ] }
//!   ],
//!   "items": []
//! }
//! ```
//!
//! Top-level `items` are unowned. Items flagged `legacy` go through the
//! legacy migration first. A record that cannot be inserted is skipped
//! together with its children and listed in [`LoadedBundle::rejected`].

use armory_domain::{ActorId, DomainError, EntityGraph, ItemId};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

const ITEMS: &str = "items";
const ACTIVITIES: &str = "activities";
const LEGACY: &str = "legacy";

/// A bundle record left out of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    /// Location in the bundle, e.g. `actors[0].items[1]`.
    pub path: String,
    pub error_kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct LoadedBundle {
    pub actors: Vec<ActorId>,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadedBundle {
    fn reject(&mut self, path: String, error: DomainError) {
        warn!(path = %path, error_kind = error.kind(), error = %error, "Skipping bundle record");
        self.rejected.push(RejectedRecord {
            path,
            error_kind: error.kind(),
            message: error.to_string(),
        });
    }
}

/// Insert every record of `bundle`. Fails only when the document itself is
/// malformed; bad records are skipped.
pub fn load_bundle(graph: &mut EntityGraph, bundle: &Value) -> Result<LoadedBundle, DomainError> {
    let bundle = bundle
        .as_object()
        .ok_or_else(|| DomainError::validation("bundle must be an object"))?;
    let actors = records(bundle, "actors")?;
    let items = records(bundle, ITEMS)?;

    let mut loaded = LoadedBundle::default();
    for (i, raw) in actors.iter().enumerate() {
        let path = format!("actors[{i}]");
        let inserted = split(raw, ITEMS).and_then(|(record, children)| {
            let actor = graph.insert_actor(record)?;
            Ok((actor, children))
        });
        match inserted {
            Ok((actor, children)) => {
                for (j, item) in children.iter().enumerate() {
                    load_item(graph, Some(actor), item, format!("{path}.{ITEMS}[{j}]"), &mut loaded);
                }
                loaded.actors.push(actor);
            }
            Err(e) => loaded.reject(path, e),
        }
    }
    for (i, item) in items.iter().enumerate() {
        load_item(graph, None, item, format!("{ITEMS}[{i}]"), &mut loaded);
    }
    Ok(loaded)
}

fn load_item(
    graph: &mut EntityGraph,
    actor: Option<ActorId>,
    raw: &Value,
    path: String,
    loaded: &mut LoadedBundle,
) -> Option<ItemId> {
    if raw.get(LEGACY).and_then(Value::as_bool).unwrap_or(false) {
        return match graph.insert_legacy_item(actor, raw) {
            Ok((item, _)) => Some(item),
            Err(e) => {
                loaded.reject(path, e);
                None
            }
        };
    }
    let inserted = split(raw, ACTIVITIES).and_then(|(record, activities)| {
        let item = graph.insert_item(actor, record)?;
        Ok((item, activities))
    });
    let (item, activities) = match inserted {
        Ok(inserted) => inserted,
        Err(e) => {
            loaded.reject(path, e);
            return None;
        }
    };
    for (k, activity) in activities.into_iter().enumerate() {
        let inserted = if activity.is_object() {
            graph.insert_activity(Some(item), activity).map(drop)
        } else {
            Err(not_an_object())
        };
        if let Err(e) = inserted {
            loaded.reject(format!("{path}.{ACTIVITIES}[{k}]"), e);
        }
    }
    Some(item)
}

fn records<'a>(bundle: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], DomainError> {
    match bundle.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(records)) => Ok(records),
        Some(_) => Err(DomainError::validation(format!("`{key}` must be a list"))),
    }
}

/// Separate the embedded child list from the record itself.
fn split(raw: &Value, key: &str) -> Result<(Value, Vec<Value>), DomainError> {
    let mut record = raw.as_object().cloned().ok_or_else(not_an_object)?;
    let children = match record.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(children)) => children,
        Some(_) => return Err(DomainError::validation(format!("`{key}` must be a list"))),
    };
    Ok((Value::Object(record), children))
}

fn not_an_object() -> DomainError {
    DomainError::validation("every bundle record must be an object")
}

/// The prepared graph in the same nested layout.
pub fn export_bundle(graph: &EntityGraph) -> Value {
    let actors = graph
        .actors()
        .filter_map(|actor| {
            let mut record = graph.export_actor(actor.id)?;
            let items = actor.items.iter().filter_map(|id| export_item(graph, *id)).collect();
            record.as_object_mut()?.insert(ITEMS.into(), Value::Array(items));
            Some(record)
        })
        .collect();
    let unowned = graph
        .items()
        .filter(|item| item.actor.is_none())
        .filter_map(|item| export_item(graph, item.id))
        .collect();

    let mut bundle = Map::new();
    bundle.insert("actors".into(), Value::Array(actors));
    bundle.insert(ITEMS.into(), Value::Array(unowned));
    Value::Object(bundle)
}

fn export_item(graph: &EntityGraph, id: ItemId) -> Option<Value> {
    let item = graph.item(id)?;
    let mut record = graph.export_item(id)?;
    let activities = item
        .activities
        .iter()
        .filter_map(|activity| graph.export_activity(*activity))
        .collect();
    record.as_object_mut()?.insert(ACTIVITIES.into(), Value::Array(activities));
    Some(record)
}
