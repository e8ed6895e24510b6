// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Nested tree of the active items, rebuilt after selection changes.

use std::collections::HashSet;

use crate::ids::{ItemId, ParentId};
use crate::model::ItemQuery;
use crate::store::ItemStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryNode {
    pub id: ItemId,
    pub label: String,
    pub kind: Option<String>,
    pub children: Vec<SummaryNode>,
}

impl SummaryNode {
    /// This node plus all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SummaryNode::node_count)
            .sum::<usize>()
    }
}

pub fn build_summary(store: &ItemStore) -> Vec<SummaryNode> {
    let mut seen = HashSet::new();
    build_level(store, &ParentId::Root, &mut seen)
}

fn build_level(
    store: &ItemStore,
    parent: &ParentId,
    seen: &mut HashSet<ItemId>,
) -> Vec<SummaryNode> {
    let query = ItemQuery::children_of(parent.clone()).active(true);

    let mut nodes = Vec::new();
    for item in store.query(&query) {
        if !seen.insert(item.id.clone()) {
            continue;
        }
        let children = if item.has_children {
            build_level(store, &ParentId::Item(item.id.clone()), seen)
        } else {
            Vec::new()
        };
        nodes.push(SummaryNode {
            id: item.id.clone(),
            label: item.label(),
            kind: item.kind.clone(),
            children,
        });
    }
    nodes
}

/// Depth-first rows for list rendering; top-level nodes have depth 0.
pub fn flatten_summary(nodes: &[SummaryNode]) -> Vec<(usize, &SummaryNode)> {
    let mut rows = Vec::new();
    let mut stack = nodes.iter().rev().map(|node| (0, node)).collect::<Vec<_>>();
    while let Some((depth, node)) = stack.pop() {
        rows.push((depth, node));
        stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::{build_summary, flatten_summary};
    use crate::ids::{ItemId, ParentId};
    use crate::model::{ItemFlag, ItemGroups, ItemInput};
    use crate::store::ItemStore;

    fn store() -> ItemStore {
        let mut groups = ItemGroups::new();
        groups.push(
            ParentId::Root,
            [
                ItemInput::new("s1", "Sciences").with_kind("subject"),
                ItemInput::new("s2", "Arts"),
            ],
        );
        groups.push(
            ParentId::from_key("s1"),
            [ItemInput::new("c1", "Observer"), ItemInput::new("c2", "<b>Mesurer</b>")],
        );
        groups.push(ParentId::from_key("c2"), [ItemInput::new("l1", "Niveau 1")]);
        ItemStore::from_groups(&groups)
    }

    #[test]
    fn summary_nests_active_items_in_store_order() {
        let mut store = store();
        for id in ["s1", "c2", "l1", "s2"] {
            store.set_flag(&ItemId::new(id), ItemFlag::Active, true);
        }

        let tree = build_summary(&store);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].kind.as_deref(), Some("subject"));
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].label, "Mesurer");
        assert_eq!(tree[0].node_count(), 3);

        let rows = flatten_summary(&tree)
            .into_iter()
            .map(|(depth, node)| (depth, node.id.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(rows, vec![(0, "s1"), (1, "c2"), (2, "l1"), (0, "s2")]);
    }

    #[test]
    fn inactive_parents_hide_their_subtree() {
        let mut store = store();
        store.set_flag(&ItemId::new("c1"), ItemFlag::Active, true);
        assert!(build_summary(&store).is_empty());
    }
}
