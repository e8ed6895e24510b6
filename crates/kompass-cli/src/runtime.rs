// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use kompass_app::ItemId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk shape of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StateFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confirm_uncheck: Option<bool>,
    #[serde(default)]
    selection: Vec<ItemId>,
}

/// Keeps the selection and the confirmation preference in a JSON file.
/// Without a path (demo mode) nothing is written.
#[derive(Debug)]
pub struct FileRuntime {
    path: Option<PathBuf>,
    state: StateFile,
    default_confirm_uncheck: bool,
}

impl FileRuntime {
    pub fn open(path: PathBuf, default_confirm_uncheck: bool) -> Result<Self> {
        let state = read_state(&path)?;
        Ok(Self {
            path: Some(path),
            state,
            default_confirm_uncheck,
        })
    }

    pub fn ephemeral(default_confirm_uncheck: bool) -> Self {
        Self {
            path: None,
            state: StateFile::default(),
            default_confirm_uncheck,
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create state directory {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.state).context("encode state file")?;
        fs::write(path, raw).with_context(|| format!("write state file {}", path.display()))?;
        debug!(path = %path.display(), selected = self.state.selection.len(), "state saved");
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<StateFile> {
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read state file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| {
        format!(
            "parse state file {}; delete it to start with an empty selection",
            path.display()
        )
    })
}

impl kompass_tui::AppRuntime for FileRuntime {
    fn load_selection(&mut self) -> Result<Vec<ItemId>> {
        Ok(self.state.selection.clone())
    }

    fn save_selection(&mut self, ids: &[ItemId]) -> Result<()> {
        self.state.selection = ids.to_vec();
        self.persist()
    }

    fn confirm_uncheck_preference(&mut self) -> Result<bool> {
        Ok(self
            .state
            .confirm_uncheck
            .unwrap_or(self.default_confirm_uncheck))
    }

    fn set_confirm_uncheck_preference(&mut self, confirm: bool) -> Result<()> {
        self.state.confirm_uncheck = Some(confirm);
        self.persist()
    }
}
