// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ItemId, ParentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemFlag {
    Active,
    Expanded,
    Highlighted,
}

impl ItemFlag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expanded => "expanded",
            Self::Highlighted => "highlighted",
        }
    }
}

/// One curriculum node as it appears in the input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    pub id: ItemId,
    #[serde(default, deserialize_with = "deserialize_name")]
    pub name: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl ItemInput {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: vec![name.into()],
            kind: None,
            data: Map::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameField {
    One(String),
    Many(Vec<String>),
}

fn deserialize_name<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match NameField::deserialize(deserializer)? {
        NameField::One(name) => vec![name],
        NameField::Many(names) => names,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemGroup {
    pub parent: ParentId,
    pub items: Vec<ItemInput>,
}

/// The grouped-by-parent input document, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemGroups {
    groups: Vec<ItemGroup>,
}

impl ItemGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends items to the group for `parent`, creating the group if needed.
    pub fn push(&mut self, parent: ParentId, items: impl IntoIterator<Item = ItemInput>) {
        match self.groups.iter_mut().find(|group| group.parent == parent) {
            Some(group) => group.items.extend(items),
            None => self.groups.push(ItemGroup {
                parent,
                items: items.into_iter().collect(),
            }),
        }
    }

    pub fn group(&self, parent: &ParentId) -> Option<&[ItemInput]> {
        self.groups
            .iter()
            .find(|group| &group.parent == parent)
            .map(|group| group.items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemGroup> {
        self.groups.iter()
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("parse curriculum JSON")?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            bail!("curriculum document must be a JSON object keyed by parent id");
        };

        let mut groups = Self::new();
        for (key, value) in object {
            let items: Vec<ItemInput> = serde_json::from_value(value)
                .with_context(|| format!("decode item group {key:?}"))?;
            groups.push(ParentId::from_key(&key), items);
        }
        Ok(groups)
    }

    pub fn to_json_value(&self) -> Result<Value> {
        let mut object = Map::new();
        for group in &self.groups {
            let items = serde_json::to_value(&group.items)
                .with_context(|| format!("encode item group {:?}", group.parent.as_key()))?;
            object.insert(group.parent.as_key().to_owned(), items);
        }
        Ok(Value::Object(object))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub parent: ParentId,
    pub name: Vec<String>,
    pub kind: Option<String>,
    pub has_children: bool,
    pub active: bool,
    pub expanded: bool,
    pub highlighted: bool,
    pub data: Map<String, Value>,
}

impl Item {
    pub fn from_input(input: &ItemInput, parent: ParentId, has_children: bool) -> Self {
        Self {
            id: input.id.clone(),
            parent,
            name: input.name.clone(),
            kind: input.kind.clone(),
            has_children,
            active: false,
            expanded: false,
            highlighted: false,
            data: input.data.clone(),
        }
    }

    pub fn flag(&self, flag: ItemFlag) -> bool {
        match flag {
            ItemFlag::Active => self.active,
            ItemFlag::Expanded => self.expanded,
            ItemFlag::Highlighted => self.highlighted,
        }
    }

    pub(crate) fn flag_mut(&mut self, flag: ItemFlag) -> &mut bool {
        match flag {
            ItemFlag::Active => &mut self.active,
            ItemFlag::Expanded => &mut self.expanded,
            ItemFlag::Highlighted => &mut self.highlighted,
        }
    }

    /// All name lines joined with spaces, markup removed.
    pub fn label(&self) -> String {
        let joined = self
            .name
            .iter()
            .map(|line| strip_markup(line))
            .collect::<Vec<_>>()
            .join(" ");
        collapse_whitespace(&joined)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.iter().all(|line| line.trim().is_empty()) {
            errors.push("an item requires a name".to_owned());
        }
        if let ParentId::Item(parent) = &self.parent
            && parent.as_str().trim().is_empty()
        {
            errors.push("an item requires a parent id".to_owned());
        }
        errors
    }
}

/// Attribute-equality filter over items. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub parent: Option<ParentId>,
    pub active: Option<bool>,
    pub expanded: Option<bool>,
    pub highlighted: Option<bool>,
    pub kind: Option<String>,
}

impl ItemQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn children_of(parent: impl Into<ParentId>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn flag(mut self, flag: ItemFlag, value: bool) -> Self {
        match flag {
            ItemFlag::Active => self.active = Some(value),
            ItemFlag::Expanded => self.expanded = Some(value),
            ItemFlag::Highlighted => self.highlighted = Some(value),
        }
        self
    }

    pub fn active(self, value: bool) -> Self {
        self.flag(ItemFlag::Active, value)
    }

    pub fn expanded(self, value: bool) -> Self {
        self.flag(ItemFlag::Expanded, value)
    }

    pub fn highlighted(self, value: bool) -> Self {
        self.flag(ItemFlag::Highlighted, value)
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.parent.as_ref().is_none_or(|parent| &item.parent == parent)
            && self.active.is_none_or(|active| item.active == active)
            && self.expanded.is_none_or(|expanded| item.expanded == expanded)
            && self
                .highlighted
                .is_none_or(|highlighted| item.highlighted == highlighted)
            && self
                .kind
                .as_deref()
                .is_none_or(|kind| item.kind.as_deref() == Some(kind))
    }
}

/// Drops everything between `<` and `>`. Names in curriculum exports carry
/// inline markup such as `<br />` and `<em>`.
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
