// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use tracing::{debug, warn};

use crate::columns::{Column, ColumnError, ColumnStack};
use crate::events::NavEvent;
use crate::ids::{ColumnId, ItemId, ParentId};
use crate::model::{Item, ItemFlag, ItemQuery};
use crate::selection::{CheckOutcome, recursive_check};
use crate::store::{HierarchyError, ItemStore};
use crate::viewport::{Viewport, reconcile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    UnknownItem(ItemId),
    UnknownColumn(ColumnId),
    ItemNotInColumn { item: ItemId, column: ColumnId },
    ReadOnlyColumn(ColumnId),
    NoRootColumn,
    Column(ColumnError),
    Hierarchy(HierarchyError),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownItem(id) => write!(f, "item {id} does not exist"),
            Self::UnknownColumn(id) => write!(f, "column {id} is not in the stack"),
            Self::ItemNotInColumn { item, column } => {
                write!(f, "item {item} is not listed in column {column}")
            }
            Self::ReadOnlyColumn(id) => write!(f, "column {id} is read-only"),
            Self::NoRootColumn => f.write_str("no root column has been created"),
            Self::Column(error) => write!(f, "{error}"),
            Self::Hierarchy(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for NavError {}

impl From<ColumnError> for NavError {
    fn from(value: ColumnError) -> Self {
        match value {
            ColumnError::UnknownColumn(id) => Self::UnknownColumn(id),
            other => Self::Column(other),
        }
    }
}

impl From<HierarchyError> for NavError {
    fn from(value: HierarchyError) -> Self {
        Self::Hierarchy(value)
    }
}

/// A gesture the rendering layer forwards to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    SelectItem {
        item: ItemId,
        column: ColumnId,
    },
    GoBack {
        column: ColumnId,
    },
    GoToRoot {
        column: ColumnId,
    },
    JumpTo {
        item: ItemId,
    },
    /// `confirmed` is the answer to the cascade prompt, consulted only when a
    /// prompt is actually required.
    SetActive {
        item: ItemId,
        column: ColumnId,
        active: bool,
        require_confirmation: bool,
        confirmed: bool,
    },
    Resize {
        width: u32,
    },
}

/// Owns the item store and column stack and keeps them consistent.
///
/// Every entry point returns the notifications it caused: controller events
/// first, then store changes tagged with the originating column, then column
/// changes. State mutated before an error is still reported through the
/// store listeners but the event list is dropped.
#[derive(Debug, Default)]
pub struct Navigator {
    store: ItemStore,
    columns: ColumnStack,
    viewport: Viewport,
    detail: Option<ItemId>,
}

impl Navigator {
    pub fn new(store: ItemStore, width: u32) -> Self {
        Self {
            store,
            columns: ColumnStack::new(),
            viewport: Viewport::new(width),
            detail: None,
        }
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// Direct store access for subscribing listeners. Flag edits made here
    /// bypass the selection closure.
    pub fn store_mut(&mut self) -> &mut ItemStore {
        &mut self.store
    }

    pub fn columns(&self) -> &ColumnStack {
        &self.columns
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn detail(&self) -> Option<&ItemId> {
        self.detail.as_ref()
    }

    pub fn detail_item(&self) -> Option<&Item> {
        self.detail.as_ref().and_then(|id| self.store.get(id))
    }

    pub fn root_column(&self) -> Option<ColumnId> {
        self.columns.first().map(Column::id)
    }

    pub fn last_column(&self) -> Option<ColumnId> {
        self.columns.last().map(Column::id)
    }

    pub fn column_items(&self, column: ColumnId) -> Result<Vec<&Item>, NavError> {
        let column = self
            .columns
            .get(column)
            .ok_or(NavError::UnknownColumn(column))?;
        Ok(column.items(&self.store))
    }

    /// True when deactivating `item` would ask for confirmation first.
    pub fn needs_confirmation(&self, item: &ItemId) -> bool {
        let Some(found) = self.store.get(item) else {
            return false;
        };
        found.active
            && found.has_children
            && !self
                .store
                .query(&ItemQuery::children_of(item.clone()).active(true))
                .is_empty()
    }

    pub fn dispatch(&mut self, command: NavCommand) -> Result<Vec<NavEvent>, NavError> {
        match command {
            NavCommand::SelectItem { item, column } => self.select_item(&item, column),
            NavCommand::GoBack { column } => self.go_back(column),
            NavCommand::GoToRoot { column } => self.go_to_root(column),
            NavCommand::JumpTo { item } => self.jump_to(&item),
            NavCommand::SetActive {
                item,
                column,
                active,
                require_confirmation,
                confirmed,
            } => self.set_active(&item, column, active, require_confirmation, move || confirmed),
            NavCommand::Resize { width } => self.resize(width),
        }
    }

    pub fn create_root_column(&mut self, editable: bool) -> Result<Vec<NavEvent>, NavError> {
        self.run(None, |nav, _| {
            let id = nav.columns.create_root_column(editable)?;
            debug!(column = %id, editable, "root column created");
            Ok(())
        })
    }

    /// Shows `item` in the detail panel and, for an unexpanded parent, opens
    /// a new column with its children to the right of `column`.
    pub fn select_item(&mut self, item: &ItemId, column: ColumnId) -> Result<Vec<NavEvent>, NavError> {
        self.run(Some(column), |nav, events| nav.open_item(item, column, events))
    }

    pub fn go_back(&mut self, column: ColumnId) -> Result<Vec<NavEvent>, NavError> {
        self.run(Some(column), |nav, events| {
            let left = nav.columns.left_siblings(column)?;
            let right = nav.columns.right_siblings(column)?;

            nav.store.clear_flag(ItemFlag::Highlighted, &ItemQuery::all());
            nav.set_detail(None, events);
            if let Some(&prev) = left.last() {
                nav.columns.expand(prev)?;
            }
            if let Some(&last) = right.last() {
                nav.columns.remove(&[last]);
            }
            if let Some(parent) = nav.columns.last().map(|last| last.parent().clone()) {
                nav.store
                    .clear_flag(ItemFlag::Expanded, &ItemQuery::children_of(parent));
            }
            debug!(column = %column, remaining = nav.columns.len(), "went back");
            Ok(())
        })
    }

    pub fn go_to_root(&mut self, column: ColumnId) -> Result<Vec<NavEvent>, NavError> {
        self.run(Some(column), |nav, events| {
            if nav.columns.position(column).is_none() {
                return Err(NavError::UnknownColumn(column));
            }
            nav.collapse_to_root()?;
            nav.set_detail(None, events);
            debug!(column = %column, "returned to root column");
            Ok(())
        })
    }

    /// Rebuilds the column path down to `item`'s parent and highlights it.
    pub fn jump_to(&mut self, item: &ItemId) -> Result<Vec<NavEvent>, NavError> {
        self.run(None, |nav, events| {
            if !nav.store.contains(item) {
                return Err(NavError::UnknownItem(item.clone()));
            }
            let mut chain = nav.store.ancestors(item)?;
            chain.reverse();

            nav.collapse_to_root()?;
            for ancestor in &chain {
                let last = nav.last_column().ok_or(NavError::NoRootColumn)?;
                nav.open_item(ancestor, last, events)?;
            }

            nav.store.set_flag(item, ItemFlag::Highlighted, true);
            events.push(NavEvent::Highlighted { item: item.clone() });
            nav.set_detail(Some(item.clone()), events);
            debug!(item = %item, depth = chain.len(), "jumped to item");
            Ok(())
        })
    }

    /// Sets `item`'s active flag from an editable column and settles the
    /// hierarchy around it.
    pub fn set_active<F>(
        &mut self,
        item: &ItemId,
        column: ColumnId,
        active: bool,
        require_confirmation: bool,
        confirm: F,
    ) -> Result<Vec<NavEvent>, NavError>
    where
        F: FnOnce() -> bool,
    {
        self.run(Some(column), |nav, events| {
            nav.item_in_column(item, column)?;
            if !nav.columns.get(column).is_some_and(Column::is_editable) {
                return Err(NavError::ReadOnlyColumn(column));
            }

            nav.store.set_flag(item, ItemFlag::Active, active);
            let outcome = recursive_check(&mut nav.store, item, require_confirmation, confirm)?;
            if outcome == CheckOutcome::Declined {
                events.push(NavEvent::CascadeDeclined { item: item.clone() });
            }
            debug!(item = %item, active, outcome = ?outcome, "active flag set");
            Ok(())
        })
    }

    pub fn toggle_active<F>(
        &mut self,
        item: &ItemId,
        column: ColumnId,
        require_confirmation: bool,
        confirm: F,
    ) -> Result<Vec<NavEvent>, NavError>
    where
        F: FnOnce() -> bool,
    {
        let active = self
            .store
            .get(item)
            .map(|found| found.active)
            .ok_or_else(|| NavError::UnknownItem(item.clone()))?;
        self.set_active(item, column, !active, require_confirmation, confirm)
    }

    pub fn resize(&mut self, width: u32) -> Result<Vec<NavEvent>, NavError> {
        self.run(None, |nav, events| {
            let old = nav.viewport.resize(width);
            let new = nav.viewport.budget();
            if old == new {
                return Ok(());
            }
            let changed = reconcile(&mut nav.columns, old, new)?;
            events.push(NavEvent::BudgetChanged {
                old,
                new,
                column_width: nav.viewport.column_width(),
            });
            debug!(width, old, new, changed, "column budget changed");
            Ok(())
        })
    }

    /// Re-activates a saved selection. Ids missing from the store are skipped.
    pub fn restore_selection<I>(&mut self, ids: I) -> Result<Vec<NavEvent>, NavError>
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.run(None, |nav, _| {
            let mut restored = 0usize;
            for id in ids {
                if !nav.store.contains(&id) {
                    warn!(item = %id, "saved selection references unknown item; skipping");
                    continue;
                }
                nav.store.set_flag(&id, ItemFlag::Active, true);
                recursive_check(&mut nav.store, &id, false, || true)?;
                restored += 1;
            }
            debug!(restored, "selection restored");
            Ok(())
        })
    }

    fn run<F>(&mut self, origin: Option<ColumnId>, op: F) -> Result<Vec<NavEvent>, NavError>
    where
        F: FnOnce(&mut Self, &mut Vec<NavEvent>) -> Result<(), NavError>,
    {
        let mut events = Vec::new();
        let outcome = op(self, &mut events);
        events.extend(
            self.store
                .take_events()
                .into_iter()
                .map(|change| NavEvent::Items { origin, change }),
        );
        events.extend(self.columns.take_events().into_iter().map(NavEvent::Column));
        outcome.map(|()| events)
    }

    fn item_in_column(&self, item: &ItemId, column: ColumnId) -> Result<&Item, NavError> {
        let found = self
            .store
            .get(item)
            .ok_or_else(|| NavError::UnknownItem(item.clone()))?;
        let column_parent = self
            .columns
            .get(column)
            .map(Column::parent)
            .ok_or(NavError::UnknownColumn(column))?;
        if &found.parent != column_parent {
            return Err(NavError::ItemNotInColumn {
                item: item.clone(),
                column,
            });
        }
        Ok(found)
    }

    fn open_item(
        &mut self,
        item: &ItemId,
        column: ColumnId,
        events: &mut Vec<NavEvent>,
    ) -> Result<(), NavError> {
        let found = self.item_in_column(item, column)?;
        let (has_children, expanded, parent) =
            (found.has_children, found.expanded, found.parent.clone());

        self.set_detail(Some(item.clone()), events);
        if !has_children || expanded {
            return Ok(());
        }

        let right = self.columns.right_siblings(column)?;
        self.columns.remove(&right);
        self.store
            .clear_flag(ItemFlag::Highlighted, &ItemQuery::all());
        self.store
            .clear_flag(ItemFlag::Expanded, &ItemQuery::children_of(parent));
        self.store.set_flag(item, ItemFlag::Expanded, true);

        let opened = self
            .columns
            .create_column(ParentId::Item(item.clone()), true, true);
        self.store
            .clear_flag(ItemFlag::Expanded, &ItemQuery::children_of(item.clone()));
        self.fit_budget(opened)?;
        self.columns.expand(opened)?;

        debug!(item = %item, from = %column, opened = %opened, "opened item column");
        Ok(())
    }

    /// Collapses the oldest columns to the left of `opened` so that, with
    /// `opened` itself, no more than the budget stay expanded.
    fn fit_budget(&mut self, opened: ColumnId) -> Result<(), NavError> {
        let left = self.columns.left_siblings(opened)?;
        let budget = self.viewport.budget();
        if left.len() < budget {
            return Ok(());
        }
        for (index, id) in left.iter().enumerate() {
            if left.len() - index >= budget {
                self.columns.collapse(*id)?;
            } else {
                self.columns.expand(*id)?;
            }
        }
        Ok(())
    }

    fn collapse_to_root(&mut self) -> Result<(), NavError> {
        let first = self.root_column().ok_or(NavError::NoRootColumn)?;
        self.store
            .clear_flag(ItemFlag::Highlighted, &ItemQuery::all());
        self.store.clear_flag(ItemFlag::Expanded, &ItemQuery::all());
        let right = self.columns.right_siblings(first)?;
        self.columns.remove(&right);
        self.columns.expand(first)?;
        Ok(())
    }

    fn set_detail(&mut self, item: Option<ItemId>, events: &mut Vec<NavEvent>) {
        if self.detail != item {
            self.detail = item.clone();
            events.push(NavEvent::DetailChanged { item });
        }
    }
}
