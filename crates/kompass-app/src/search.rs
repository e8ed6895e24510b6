// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::ItemId;
use crate::model::Item;
use crate::store::ItemStore;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: ItemId,
    pub label: String,
}

/// Keeps ASCII letters and digits, `_`, `-`, whitespace and the accented
/// lowercase Latin-1 range used by French curriculum names.
pub fn sanitize_term(term: &str) -> String {
    term.chars()
        .filter(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '_' | '-' | '\u{e0}'..='\u{fc}')
                || ch.is_whitespace()
        })
        .collect()
}

/// First `limit` items, in store order, whose id or name contains `term`.
pub fn search(store: &ItemStore, term: &str, limit: usize) -> Vec<SearchHit> {
    let needle = sanitize_term(term).trim().to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }

    store
        .iter()
        .filter(|item| is_match(item, &needle))
        .take(limit)
        .map(|item| SearchHit {
            id: item.id.clone(),
            label: item.label(),
        })
        .collect()
}

fn is_match(item: &Item, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    if contains(item.id.as_str()) {
        return true;
    }
    if item.name.first().is_some_and(|first| contains(first)) {
        return true;
    }
    item.name.len() > 1 && contains(&item.name.join(" "))
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SEARCH_LIMIT, sanitize_term, search};
    use crate::ids::{ItemId, ParentId};
    use crate::model::{ItemGroups, ItemInput};
    use crate::store::ItemStore;

    fn store() -> ItemStore {
        let mut groups = ItemGroups::new();
        groups.push(
            ParentId::Root,
            [
                ItemInput::new("math", "Mathématiques"),
                ItemInput::new("fr", "Français"),
            ],
        );
        groups.push(
            ParentId::from_key("math"),
            [
                ItemInput::new("math-1", "Les <em>nombres</em>"),
                ItemInput::new("math-2", "Géométrie").with_names(["Géométrie", "plane et espace"]),
            ],
        );
        groups.push(
            ParentId::from_key("fr"),
            (1..=15).map(|n| ItemInput::new(format!("fr-{n}"), format!("Lecture {n}"))),
        );
        ItemStore::from_groups(&groups)
    }

    fn ids(hits: &[super::SearchHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.id.as_str()).collect()
    }

    #[test]
    fn matches_ids_and_first_names_case_insensitively() {
        let store = store();
        assert_eq!(ids(&search(&store, "MATH", 10)), vec!["math", "math-1", "math-2"]);
        assert_eq!(ids(&search(&store, "français", 10)), vec!["fr"]);
    }

    #[test]
    fn later_name_lines_match_only_when_joined() {
        let store = store();
        assert_eq!(ids(&search(&store, "plane", 10)), vec!["math-2"]);
        assert_eq!(ids(&search(&store, "géométrie plane", 10)), vec!["math-2"]);
    }

    #[test]
    fn results_stop_at_the_limit_in_store_order() {
        let store = store();
        let hits = search(&store, "lecture", DEFAULT_SEARCH_LIMIT);
        assert_eq!(hits.len(), DEFAULT_SEARCH_LIMIT);
        assert_eq!(hits[0].id, ItemId::new("fr-1"));
        assert_eq!(hits[9].id, ItemId::new("fr-10"));
        assert!(search(&store, "lecture", 0).is_empty());
    }

    #[test]
    fn labels_drop_markup() {
        let store = store();
        let hits = search(&store, "nombres", 10);
        assert_eq!(hits[0].label, "Les nombres");
    }

    #[test]
    fn punctuation_is_stripped_and_blank_terms_find_nothing() {
        assert_eq!(sanitize_term("a.b*c (d)"), "abc d");
        assert_eq!(sanitize_term("é-è_1"), "é-è_1");
        let store = store();
        assert!(search(&store, "  ?* ", 10).is_empty());
        assert_eq!(ids(&search(&store, "math-1!", 10)), vec!["math-1"]);
    }
}
