// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::{ColumnId, ItemId, ParentId};
use crate::model::ItemFlag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The whole store was rebuilt from a new document.
    Reset { items: usize },
    FlagChanged {
        id: ItemId,
        flag: ItemFlag,
        value: bool,
    },
    /// Several items changed the same flag as one logical operation.
    FlagBatch { flag: ItemFlag, ids: Vec<ItemId> },
}

impl StoreEvent {
    pub fn flag(&self) -> Option<ItemFlag> {
        match self {
            Self::Reset { .. } => None,
            Self::FlagChanged { flag, .. } | Self::FlagBatch { flag, .. } => Some(*flag),
        }
    }

    pub fn touches(&self, id: &ItemId) -> bool {
        match self {
            Self::Reset { .. } => true,
            Self::FlagChanged { id: changed, .. } => changed == id,
            Self::FlagBatch { ids, .. } => ids.contains(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnEvent {
    Added {
        column: ColumnId,
        parent: ParentId,
        collapsed: bool,
    },
    Removed { column: ColumnId },
    Collapsed { column: ColumnId },
    Expanded { column: ColumnId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    /// A store notification, tagged with the column whose gesture caused it.
    Items {
        origin: Option<ColumnId>,
        change: StoreEvent,
    },
    Column(ColumnEvent),
    DetailChanged { item: Option<ItemId> },
    BudgetChanged {
        old: usize,
        new: usize,
        column_width: u32,
    },
    CascadeDeclined { item: ItemId },
    Highlighted { item: ItemId },
}

impl NavEvent {
    /// True for events after which a summary of active items is stale.
    pub fn affects_selection(&self) -> bool {
        match self {
            Self::Items { change, .. } => {
                matches!(change, StoreEvent::Reset { .. })
                    || change.flag() == Some(ItemFlag::Active)
            }
            _ => false,
        }
    }
}
