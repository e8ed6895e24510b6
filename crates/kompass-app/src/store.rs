// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::events::StoreEvent;
use crate::ids::{ItemId, ParentId, SubscriptionId};
use crate::model::{Item, ItemFlag, ItemGroups, ItemQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    Cycle { at: ItemId },
    DanglingParent { item: ItemId, parent: ItemId },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { at } => write!(f, "parent chain loops back to item {at}"),
            Self::DanglingParent { item, parent } => {
                write!(f, "item {item} references missing parent {parent}")
            }
        }
    }
}

impl std::error::Error for HierarchyError {}

pub type StoreListener = Box<dyn FnMut(&StoreEvent)>;

/// Flat, parent-indexed collection of curriculum items.
///
/// `query` is a linear scan in insertion order. The only index is the
/// id → position map, which is rebuilt on `load` and never changes between
/// loads because items are never added or removed individually.
#[derive(Default)]
pub struct ItemStore {
    items: Vec<Item>,
    positions: HashMap<ItemId, usize>,
    listeners: Vec<(SubscriptionId, StoreListener)>,
    next_subscription: u64,
    outbox: Vec<StoreEvent>,
}

impl fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStore")
            .field("items", &self.items.len())
            .field("listeners", &self.listeners.len())
            .field("pending_events", &self.outbox.len())
            .finish()
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: &ItemGroups) -> Self {
        let mut store = Self::new();
        store.load(groups);
        store
    }

    /// Replaces every item with the contents of `groups`.
    pub fn load(&mut self, groups: &ItemGroups) {
        let parents_with_children = groups
            .iter()
            .filter(|group| !group.items.is_empty())
            .map(|group| group.parent.as_key())
            .collect::<HashSet<_>>();

        self.items.clear();
        self.positions.clear();
        for group in groups.iter() {
            for input in &group.items {
                if self.positions.contains_key(&input.id) {
                    warn!(id = %input.id, parent = %group.parent, "duplicate item id; keeping first");
                    continue;
                }
                let has_children = parents_with_children.contains(input.id.as_str());
                self.positions.insert(input.id.clone(), self.items.len());
                self.items
                    .push(Item::from_input(input, group.parent.clone(), has_children));
            }
        }

        debug!(items = self.items.len(), "item store loaded");
        self.emit(StoreEvent::Reset {
            items: self.items.len(),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.positions.get(id).map(|&index| &self.items[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn query(&self, query: &ItemQuery) -> Vec<&Item> {
        self.items.iter().filter(|item| query.matches(item)).collect()
    }

    pub fn query_ids(&self, query: &ItemQuery) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| query.matches(item))
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn children(&self, parent: &ParentId) -> Vec<&Item> {
        self.query(&ItemQuery {
            parent: Some(parent.clone()),
            ..ItemQuery::default()
        })
    }

    pub fn active_ids(&self) -> Vec<ItemId> {
        self.query_ids(&ItemQuery::all().active(true))
    }

    /// Sets one flag and notifies listeners if the value changed. Unknown ids
    /// are ignored.
    pub fn set_flag(&mut self, id: &ItemId, flag: ItemFlag, value: bool) -> bool {
        let changed = self.set_flag_silent(id, flag, value);
        if changed {
            self.emit(StoreEvent::FlagChanged {
                id: id.clone(),
                flag,
                value,
            });
        }
        changed
    }

    pub(crate) fn set_flag_silent(&mut self, id: &ItemId, flag: ItemFlag, value: bool) -> bool {
        let Some(&index) = self.positions.get(id) else {
            return false;
        };
        let slot = self.items[index].flag_mut(flag);
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    /// Clears `flag` on every item matching `scope` and sends one batched
    /// notification for the lot.
    pub fn clear_flag(&mut self, flag: ItemFlag, scope: &ItemQuery) -> Vec<ItemId> {
        let targets = self.query_ids(&scope.clone().flag(flag, true));
        for id in &targets {
            self.set_flag_silent(id, flag, false);
        }
        if !targets.is_empty() {
            debug!(flag = flag.as_str(), cleared = targets.len(), "flag cleared");
            self.emit(StoreEvent::FlagBatch {
                flag,
                ids: targets.clone(),
            });
        }
        targets
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId::new(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Drains notifications emitted since the last call.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn emit(&mut self, event: StoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
        self.outbox.push(event);
    }

    /// Ancestors of `id`, nearest first, ending at the root-level item. An
    /// unknown id has no ancestors.
    pub fn ancestors(&self, id: &ItemId) -> Result<Vec<ItemId>, HierarchyError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id.clone()]);
        let Some(mut current) = self.get(id) else {
            return Ok(chain);
        };

        while let ParentId::Item(parent_id) = &current.parent {
            let Some(parent) = self.get(parent_id) else {
                return Err(HierarchyError::DanglingParent {
                    item: current.id.clone(),
                    parent: parent_id.clone(),
                });
            };
            if !seen.insert(parent_id.clone()) {
                return Err(HierarchyError::Cycle {
                    at: parent_id.clone(),
                });
            }
            chain.push(parent_id.clone());
            current = parent;
        }
        Ok(chain)
    }

    /// Every dangling parent reference and every distinct parent cycle.
    pub fn check_hierarchy(&self) -> Vec<HierarchyError> {
        let mut problems = Vec::new();
        let mut in_reported_cycle = HashSet::new();

        for item in &self.items {
            if let ParentId::Item(parent) = &item.parent
                && !self.contains(parent)
            {
                problems.push(HierarchyError::DanglingParent {
                    item: item.id.clone(),
                    parent: parent.clone(),
                });
            }
        }

        for item in &self.items {
            let mut seen = HashSet::new();
            let mut current = &item.id;
            loop {
                if !seen.insert(current.clone()) {
                    if !in_reported_cycle.contains(current) {
                        problems.push(HierarchyError::Cycle {
                            at: current.clone(),
                        });
                        self.mark_cycle(current, &mut in_reported_cycle);
                    }
                    break;
                }
                match self.get(current).map(|item| &item.parent) {
                    Some(ParentId::Item(parent)) if self.contains(parent) => current = parent,
                    _ => break,
                }
            }
        }
        problems
    }

    fn mark_cycle(&self, start: &ItemId, marked: &mut HashSet<ItemId>) {
        let mut current = start.clone();
        while marked.insert(current.clone()) {
            match self.get(&current).map(|item| &item.parent) {
                Some(ParentId::Item(parent)) => current = parent.clone(),
                _ => break,
            }
        }
    }
}
