// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group key used by the input document for top-level items.
pub const ROOT_KEY: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an item hangs in the hierarchy: directly under the root, or under
/// another item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentId {
    Root,
    Item(ItemId),
}

impl ParentId {
    pub fn from_key(key: &str) -> Self {
        if key == ROOT_KEY {
            Self::Root
        } else {
            Self::Item(ItemId::new(key))
        }
    }

    pub fn as_key(&self) -> &str {
        match self {
            Self::Root => ROOT_KEY,
            Self::Item(id) => id.as_str(),
        }
    }

    pub fn item(&self) -> Option<&ItemId> {
        match self {
            Self::Root => None,
            Self::Item(id) => Some(id),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl From<ItemId> for ParentId {
    fn from(value: ItemId) -> Self {
        Self::Item(value)
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

macro_rules! handle_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle_id!(ColumnId);
handle_id!(SubscriptionId);
