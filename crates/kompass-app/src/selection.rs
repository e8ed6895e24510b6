// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Cascading (de)selection.
//!
//! Turning an item on turns on every ancestor. Turning an item with active
//! descendants off turns those descendants off too, after an optional
//! confirmation. The caller flips the item's own `active` flag first and then
//! hands it to [`recursive_check`] to settle the rest of the tree.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::events::StoreEvent;
use crate::ids::{ItemId, ParentId};
use crate::model::{ItemFlag, ItemQuery};
use crate::store::{HierarchyError, ItemStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing needed to change.
    Unchanged,
    /// Ancestors that were switched on.
    Activated(Vec<ItemId>),
    /// The item itself followed by every descendant that was switched off.
    Deactivated(Vec<ItemId>),
    /// The confirmation was refused and the item was switched back on.
    Declined,
}

impl CheckOutcome {
    pub fn changed(&self) -> &[ItemId] {
        match self {
            Self::Activated(ids) | Self::Deactivated(ids) => ids,
            Self::Unchanged | Self::Declined => &[],
        }
    }
}

/// Settles the hierarchy after `id` had its `active` flag flipped.
///
/// `confirm` is only consulted when `require_confirmation` is set and the
/// item still has active descendants; deactivating an item whose subtree is
/// already inactive never prompts and returns [`CheckOutcome::Unchanged`].
/// At most one batched store notification is emitted. A declined cascade
/// emits a single `FlagChanged` restoring the item instead.
pub fn recursive_check<F>(
    store: &mut ItemStore,
    id: &ItemId,
    require_confirmation: bool,
    confirm: F,
) -> Result<CheckOutcome, HierarchyError>
where
    F: FnOnce() -> bool,
{
    let Some((active, has_children)) = store.get(id).map(|item| (item.active, item.has_children))
    else {
        return Ok(CheckOutcome::Unchanged);
    };

    if active {
        let chain = activation_chain(store, id)?;
        let touched = chain
            .into_iter()
            .filter(|ancestor| store.set_flag_silent(ancestor, ItemFlag::Active, true))
            .collect::<Vec<_>>();
        if touched.is_empty() {
            return Ok(CheckOutcome::Unchanged);
        }
        debug!(item = %id, ancestors = touched.len(), "activated ancestors");
        notify(store, &touched);
        return Ok(CheckOutcome::Activated(touched));
    }

    if !has_children {
        return Ok(CheckOutcome::Unchanged);
    }

    let mut seen = HashSet::from([id.clone()]);
    let mut descendants = Vec::new();
    collect_active_descendants(store, id, &mut seen, &mut descendants)?;
    if descendants.is_empty() {
        return Ok(CheckOutcome::Unchanged);
    }

    if require_confirmation && !confirm() {
        store.set_flag(id, ItemFlag::Active, true);
        debug!(item = %id, "cascade declined; item re-activated");
        return Ok(CheckOutcome::Declined);
    }

    for descendant in &descendants {
        store.set_flag_silent(descendant, ItemFlag::Active, false);
    }
    let mut touched = Vec::with_capacity(descendants.len() + 1);
    touched.push(id.clone());
    touched.extend(descendants);
    debug!(item = %id, descendants = touched.len() - 1, "deactivated descendants");
    notify(store, &touched);
    Ok(CheckOutcome::Deactivated(touched))
}

/// Parents of `id` up to the root-level item. A dangling parent ends the walk.
fn activation_chain(store: &ItemStore, id: &ItemId) -> Result<Vec<ItemId>, HierarchyError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([id.clone()]);
    let mut current = id.clone();

    while let Some(ParentId::Item(parent)) = store.get(&current).map(|item| item.parent.clone()) {
        if !store.contains(&parent) {
            warn!(item = %current, parent = %parent, "parent missing; stopping ancestor walk");
            break;
        }
        if !seen.insert(parent.clone()) {
            return Err(HierarchyError::Cycle { at: parent });
        }
        chain.push(parent.clone());
        current = parent;
    }
    Ok(chain)
}

fn collect_active_descendants(
    store: &ItemStore,
    parent: &ItemId,
    seen: &mut HashSet<ItemId>,
    out: &mut Vec<ItemId>,
) -> Result<(), HierarchyError> {
    let children = store.query_ids(&ItemQuery::children_of(parent.clone()).active(true));
    for child in children {
        if !seen.insert(child.clone()) {
            return Err(HierarchyError::Cycle { at: child });
        }
        out.push(child.clone());
        collect_active_descendants(store, &child, seen, out)?;
    }
    Ok(())
}

fn notify(store: &mut ItemStore, touched: &[ItemId]) {
    store.emit(StoreEvent::FlagBatch {
        flag: ItemFlag::Active,
        ids: touched.to_vec(),
    });
}

#[cfg(test)]
mod tests {
    use super::{CheckOutcome, recursive_check};
    use crate::events::StoreEvent;
    use crate::ids::{ItemId, ParentId};
    use crate::model::{ItemFlag, ItemGroups, ItemInput};
    use crate::store::{HierarchyError, ItemStore};
    use std::cell::Cell;

    fn id(value: &str) -> ItemId {
        ItemId::new(value)
    }

    /// root → a → b → c, plus a root-level sibling d.
    fn chain_store() -> ItemStore {
        let mut groups = ItemGroups::new();
        groups.push(
            ParentId::Root,
            [ItemInput::new("a", "A"), ItemInput::new("d", "D")],
        );
        groups.push(ParentId::from_key("a"), [ItemInput::new("b", "B")]);
        groups.push(ParentId::from_key("b"), [ItemInput::new("c", "C")]);
        let mut store = ItemStore::from_groups(&groups);
        store.take_events();
        store
    }

    fn is_active(store: &ItemStore, value: &str) -> bool {
        store.get(&id(value)).is_some_and(|item| item.active)
    }

    fn activate_all(store: &mut ItemStore, ids: &[&str]) {
        for value in ids {
            store.set_flag(&id(value), ItemFlag::Active, true);
        }
        store.take_events();
    }

    #[test]
    fn activating_a_leaf_activates_every_ancestor() {
        let mut store = chain_store();
        store.set_flag(&id("c"), ItemFlag::Active, true);
        store.take_events();

        let outcome = recursive_check(&mut store, &id("c"), true, || {
            panic!("activation never asks for confirmation")
        });

        assert_eq!(outcome, Ok(CheckOutcome::Activated(vec![id("b"), id("a")])));
        assert!(is_active(&store, "a"));
        assert!(is_active(&store, "b"));
        assert!(is_active(&store, "c"));
        assert!(!is_active(&store, "d"));
        assert_eq!(
            store.take_events(),
            vec![StoreEvent::FlagBatch {
                flag: ItemFlag::Active,
                ids: vec![id("b"), id("a")],
            }]
        );
    }

    #[test]
    fn confirmed_cascade_deactivates_only_descendants() {
        let mut store = chain_store();
        activate_all(&mut store, &["a", "b", "c", "d"]);
        store.set_flag(&id("a"), ItemFlag::Active, false);
        store.take_events();

        let outcome = recursive_check(&mut store, &id("a"), true, || true);

        assert_eq!(
            outcome,
            Ok(CheckOutcome::Deactivated(vec![id("a"), id("b"), id("c")]))
        );
        assert!(!is_active(&store, "a"));
        assert!(!is_active(&store, "b"));
        assert!(!is_active(&store, "c"));
        assert!(is_active(&store, "d"));
        assert_eq!(store.take_events().len(), 1);
    }

    #[test]
    fn declined_cascade_rolls_the_item_back() {
        let mut store = chain_store();
        activate_all(&mut store, &["a", "b", "c"]);
        store.set_flag(&id("a"), ItemFlag::Active, false);
        store.take_events();

        let outcome = recursive_check(&mut store, &id("a"), true, || false);

        assert_eq!(outcome, Ok(CheckOutcome::Declined));
        assert!(outcome.as_ref().is_ok_and(|o| o.changed().is_empty()));
        assert!(is_active(&store, "a"));
        assert!(is_active(&store, "b"));
        assert!(is_active(&store, "c"));
        assert_eq!(
            store.take_events(),
            vec![StoreEvent::FlagChanged {
                id: id("a"),
                flag: ItemFlag::Active,
                value: true,
            }]
        );
    }

    #[test]
    fn unprompted_cascade_skips_the_confirmation() {
        let mut store = chain_store();
        activate_all(&mut store, &["a", "b"]);
        store.set_flag(&id("a"), ItemFlag::Active, false);

        let asked = Cell::new(false);
        let outcome = recursive_check(&mut store, &id("a"), false, || {
            asked.set(true);
            false
        });

        assert!(!asked.get());
        assert_eq!(outcome, Ok(CheckOutcome::Deactivated(vec![id("a"), id("b")])));
    }

    #[test]
    fn settled_state_is_idempotent() {
        let mut store = chain_store();
        store.set_flag(&id("c"), ItemFlag::Active, true);
        assert!(recursive_check(&mut store, &id("c"), true, || true).is_ok());
        store.take_events();

        assert_eq!(
            recursive_check(&mut store, &id("c"), true, || true),
            Ok(CheckOutcome::Unchanged)
        );
        assert!(store.take_events().is_empty());

        store.set_flag(&id("a"), ItemFlag::Active, false);
        assert!(recursive_check(&mut store, &id("a"), false, || true).is_ok());
        store.take_events();

        let asked = Cell::new(false);
        let again = recursive_check(&mut store, &id("a"), true, || {
            asked.set(true);
            true
        });
        assert_eq!(again, Ok(CheckOutcome::Unchanged));
        assert!(!asked.get());
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn leaf_deactivation_never_cascades() {
        let mut store = chain_store();
        activate_all(&mut store, &["a", "b", "c"]);
        store.set_flag(&id("c"), ItemFlag::Active, false);
        store.take_events();

        assert_eq!(
            recursive_check(&mut store, &id("c"), true, || false),
            Ok(CheckOutcome::Unchanged)
        );
        assert!(!is_active(&store, "c"));
        assert!(is_active(&store, "b"));
    }

    #[test]
    fn parent_with_inactive_subtree_is_not_prompted() {
        let mut store = chain_store();
        activate_all(&mut store, &["a"]);
        store.set_flag(&id("a"), ItemFlag::Active, false);
        store.take_events();

        let asked = Cell::new(false);
        let outcome = recursive_check(&mut store, &id("a"), true, || {
            asked.set(true);
            false
        });

        assert_eq!(outcome, Ok(CheckOutcome::Unchanged));
        assert!(!asked.get());
        assert!(!is_active(&store, "a"));
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn parent_cycles_are_reported_instead_of_looping() {
        let mut groups = ItemGroups::new();
        groups.push(ParentId::from_key("x"), [ItemInput::new("y", "Y")]);
        groups.push(ParentId::from_key("y"), [ItemInput::new("x", "X")]);
        let mut store = ItemStore::from_groups(&groups);
        store.set_flag(&id("x"), ItemFlag::Active, true);

        assert!(matches!(
            recursive_check(&mut store, &id("x"), false, || true),
            Err(HierarchyError::Cycle { .. })
        ));
    }

    #[test]
    fn dangling_parent_stops_the_walk_quietly() {
        let mut groups = ItemGroups::new();
        groups.push(ParentId::from_key("ghost"), [ItemInput::new("orphan", "O")]);
        let mut store = ItemStore::from_groups(&groups);
        store.set_flag(&id("orphan"), ItemFlag::Active, true);

        assert_eq!(
            recursive_check(&mut store, &id("orphan"), false, || true),
            Ok(CheckOutcome::Unchanged)
        );
    }
}
