// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use crate::events::ColumnEvent;
use crate::ids::{ColumnId, ItemId, ParentId};
use crate::model::Item;
use crate::store::ItemStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnError {
    RootColumnExists,
    UnknownColumn(ColumnId),
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootColumnExists => f.write_str("a root column was already created"),
            Self::UnknownColumn(id) => write!(f, "column {id} is not in the stack"),
        }
    }
}

impl std::error::Error for ColumnError {}

/// A list showing the children of one parent. The item list is a live view
/// of the store, not a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    id: ColumnId,
    parent: ParentId,
    editable: bool,
    collapsed: bool,
}

impl Column {
    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn parent(&self) -> &ParentId {
        &self.parent
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn items<'s>(&self, store: &'s ItemStore) -> Vec<&'s Item> {
        store.children(&self.parent)
    }

    pub fn item_ids(&self, store: &ItemStore) -> Vec<ItemId> {
        self.items(store)
            .into_iter()
            .map(|item| item.id.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ColumnStack {
    columns: Vec<Column>,
    next_id: u64,
    root_created: bool,
    outbox: Vec<ColumnEvent>,
}

impl ColumnStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_column(
        &mut self,
        parent: ParentId,
        editable: bool,
        collapsed: bool,
    ) -> ColumnId {
        self.next_id += 1;
        let id = ColumnId::new(self.next_id);
        self.columns.push(Column {
            id,
            parent: parent.clone(),
            editable,
            collapsed,
        });
        self.outbox.push(ColumnEvent::Added {
            column: id,
            parent,
            collapsed,
        });
        id
    }

    /// Creates the column of top-level items. Allowed once per stack.
    pub fn create_root_column(&mut self, editable: bool) -> Result<ColumnId, ColumnError> {
        if self.root_created || !self.columns.is_empty() {
            return Err(ColumnError::RootColumnExists);
        }
        self.root_created = true;
        Ok(self.create_column(ParentId::Root, editable, false))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(Column::id).collect()
    }

    pub fn get(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == id)
    }

    pub fn position(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|column| column.id == id)
    }

    pub fn first(&self) -> Option<&Column> {
        self.columns.first()
    }

    pub fn last(&self) -> Option<&Column> {
        self.columns.last()
    }

    pub fn expanded_count(&self) -> usize {
        self.columns.iter().filter(|column| !column.collapsed).count()
    }

    fn index_of(&self, id: ColumnId) -> Result<usize, ColumnError> {
        self.position(id).ok_or(ColumnError::UnknownColumn(id))
    }

    /// Columns before `id`, in stack order.
    pub fn left_siblings(&self, id: ColumnId) -> Result<Vec<ColumnId>, ColumnError> {
        let index = self.index_of(id)?;
        Ok(self.columns[..index].iter().map(Column::id).collect())
    }

    /// Columns after `id`, in stack order.
    pub fn right_siblings(&self, id: ColumnId) -> Result<Vec<ColumnId>, ColumnError> {
        let index = self.index_of(id)?;
        Ok(self.columns[index + 1..].iter().map(Column::id).collect())
    }

    /// Removes the given columns in argument order. Ids no longer in the
    /// stack are skipped.
    pub fn remove(&mut self, ids: &[ColumnId]) -> Vec<Column> {
        let mut removed = Vec::new();
        for &id in ids {
            if let Some(index) = self.position(id) {
                removed.push(self.columns.remove(index));
                self.outbox.push(ColumnEvent::Removed { column: id });
            }
        }
        removed
    }

    pub fn collapse(&mut self, id: ColumnId) -> Result<bool, ColumnError> {
        self.set_collapsed(id, true)
    }

    pub fn expand(&mut self, id: ColumnId) -> Result<bool, ColumnError> {
        self.set_collapsed(id, false)
    }

    pub fn is_collapsed(&self, id: ColumnId) -> Result<bool, ColumnError> {
        let index = self.index_of(id)?;
        Ok(self.columns[index].collapsed)
    }

    fn set_collapsed(&mut self, id: ColumnId, collapsed: bool) -> Result<bool, ColumnError> {
        let index = self.index_of(id)?;
        let column = &mut self.columns[index];
        if column.collapsed == collapsed {
            return Ok(false);
        }
        column.collapsed = collapsed;
        self.outbox.push(if collapsed {
            ColumnEvent::Collapsed { column: id }
        } else {
            ColumnEvent::Expanded { column: id }
        });
        Ok(true)
    }

    pub fn take_events(&mut self) -> Vec<ColumnEvent> {
        std::mem::take(&mut self.outbox)
    }
}
