//! Roll data: a flattened, read-only numeric view of the entity graph
//! that formulas are evaluated against.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, ItemId};

/// Resolves `@path` references in formulas.
pub trait RollLookup {
    fn lookup(&self, path: &str) -> Option<f64>;
}

/// Dotted path → number, e.g. `abilities.str.mod → 3`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollValues(BTreeMap<String, f64>);

impl RollValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: f64) {
        self.0.insert(path.into(), value);
    }

    pub fn get(&self, path: &str) -> Option<f64> {
        self.0.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl RollLookup for RollValues {
    fn lookup(&self, path: &str) -> Option<f64> {
        self.get(path)
    }
}

/// Snapshot for a whole graph. Built once per final pass and shared by
/// every final-phase computation in that pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollData {
    actors: HashMap<ActorId, RollValues>,
    items: HashMap<ItemId, RollValues>,
}

impl RollData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_actor(&mut self, id: ActorId, values: RollValues) {
        self.actors.insert(id, values);
    }

    pub fn insert_item(&mut self, id: ItemId, values: RollValues) {
        self.items.insert(id, values);
    }

    pub fn actor(&self, id: ActorId) -> Option<&RollValues> {
        self.actors.get(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&RollValues> {
        self.items.get(&id)
    }

    /// The view an activity formula sees: actor values at the top level,
    /// item values under `item.`.
    pub fn scope(&self, actor: Option<ActorId>, item: Option<ItemId>) -> RollScope<'_> {
        RollScope {
            actor: actor.and_then(|id| self.actors.get(&id)),
            item: item.and_then(|id| self.items.get(&id)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RollScope<'a> {
    actor: Option<&'a RollValues>,
    item: Option<&'a RollValues>,
}

impl RollLookup for RollScope<'_> {
    fn lookup(&self, path: &str) -> Option<f64> {
        match path.strip_prefix("item.") {
            Some(rest) => self.item.and_then(|values| values.get(rest)),
            None => self.actor.and_then(|values| values.get(path)),
        }
    }
}

/// Values bound while composing one roll (`mod`, `prof`, `magicalBonus`),
/// consulted before the shared snapshot.
#[derive(Debug, Clone)]
pub struct RollContext<'a> {
    bound: RollValues,
    scope: RollScope<'a>,
}

impl<'a> RollContext<'a> {
    pub fn new(scope: RollScope<'a>) -> Self {
        Self {
            bound: RollValues::new(),
            scope,
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: f64) {
        self.bound.set(name, value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.lookup(name)
    }

    /// Only the values bound on this context.
    pub fn bound(&self) -> &RollValues {
        &self.bound
    }
}

impl RollLookup for RollContext<'_> {
    fn lookup(&self, path: &str) -> Option<f64> {
        self.bound.get(path).or_else(|| self.scope.lookup(path))
    }
}
