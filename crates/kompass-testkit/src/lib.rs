// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use kompass_app::{ItemGroups, ItemInput, ItemStore, ParentId};
use serde_json::json;
use std::path::PathBuf;

const SUBJECTS: [(&str, &str); 8] = [
    ("fr", "Français"),
    ("ma", "Mathématiques"),
    ("sn", "Sciences de la nature"),
    ("ge", "Géographie"),
    ("hi", "Histoire"),
    ("av", "Arts visuels"),
    ("mu", "Musique"),
    ("ep", "Éducation physique"),
];

const COMPETENCY_VERBS: [&str; 12] = [
    "Comprendre",
    "Produire",
    "Observer",
    "Résoudre",
    "Représenter",
    "Explorer",
    "Comparer",
    "Mesurer",
    "Interpréter",
    "Décrire",
    "Expérimenter",
    "Analyser",
];

const COMPETENCY_TOPICS: [&str; 12] = [
    "des textes oraux",
    "des textes écrits",
    "le vivant",
    "des problèmes numériques",
    "l'espace",
    "des grandeurs",
    "des sources historiques",
    "des paysages",
    "des œuvres",
    "des rythmes",
    "des mouvements",
    "des phénomènes",
];

const LEVEL_NAMES: [&str; 3] = ["Cycle 1", "Cycle 2", "Cycle 3"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Hand-assembled item groups for tests.
#[derive(Debug, Clone, Default)]
pub struct CurriculumBuilder {
    groups: ItemGroups,
}

impl CurriculumBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `(id, name)` pairs under `parent` (`"root"` for top-level items).
    pub fn group(mut self, parent: &str, items: &[(&str, &str)]) -> Self {
        self.groups.push(
            ParentId::from_key(parent),
            items.iter().map(|(id, name)| ItemInput::new(*id, *name)),
        );
        self
    }

    pub fn item(mut self, parent: &str, item: ItemInput) -> Self {
        self.groups.push(ParentId::from_key(parent), [item]);
        self
    }

    pub fn build(self) -> ItemGroups {
        self.groups
    }

    pub fn store(self) -> ItemStore {
        ItemStore::from_groups(&self.groups)
    }
}

/// A single path `ids[0] → ids[1] → …` hanging from the root.
pub fn chain(ids: &[&str]) -> ItemGroups {
    let mut builder = CurriculumBuilder::new();
    let mut parent = "root";
    for id in ids {
        builder = builder.item(parent, ItemInput::new(*id, id.to_uppercase()));
        parent = *id;
    }
    builder.build()
}

/// Deterministic subjects → competencies → levels curricula.
#[derive(Debug, Clone)]
pub struct CurriculumFaker {
    rng: DeterministicRng,
}

impl CurriculumFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn curriculum(&mut self, subjects: usize) -> ItemGroups {
        let mut groups = ItemGroups::new();
        let count = subjects.min(SUBJECTS.len());

        groups.push(
            ParentId::Root,
            SUBJECTS[..count]
                .iter()
                .map(|(id, name)| ItemInput::new(*id, *name).with_kind("subject")),
        );

        for (subject, _) in &SUBJECTS[..count] {
            let competencies = 2 + self.rng.int_n(3);
            let inputs = (1..=competencies)
                .map(|n| self.competency(subject, n))
                .collect::<Vec<_>>();
            let ids = inputs.iter().map(|input| input.id.clone()).collect::<Vec<_>>();
            groups.push(ParentId::from_key(subject), inputs);

            for competency in ids {
                groups.push(
                    ParentId::Item(competency.clone()),
                    LEVEL_NAMES.iter().enumerate().map(|(index, level)| {
                        ItemInput::new(format!("{competency}-{}", index + 1), *level)
                            .with_kind("level")
                            .with_data("cycle", json!(index + 1))
                    }),
                );
            }
        }
        groups
    }

    fn competency(&mut self, subject: &str, n: usize) -> ItemInput {
        let verb = COMPETENCY_VERBS[self.rng.int_n(COMPETENCY_VERBS.len())];
        let topic = COMPETENCY_TOPICS[self.rng.int_n(COMPETENCY_TOPICS.len())];
        ItemInput::new(format!("{subject}-{n}"), String::new())
            .with_names([
                format!("<strong>{subject}</strong> {n}"),
                format!("{verb} {topic}"),
            ])
            .with_kind("competency")
    }
}

/// The curriculum shown by `kompass --demo`.
pub fn demo_curriculum() -> ItemGroups {
    CurriculumFaker::new(42).curriculum(SUBJECTS.len())
}

pub fn write_curriculum_file(groups: &ItemGroups) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("curriculum.json");
    let value = groups.to_json_value()?;
    let raw = serde_json::to_string_pretty(&value).context("encode curriculum JSON")?;
    std::fs::write(&path, raw)
        .with_context(|| format!("write curriculum file {}", path.display()))?;
    Ok((dir, path))
}

pub fn subject_ids() -> Vec<&'static str> {
    SUBJECTS.iter().map(|(id, _)| *id).collect()
}
