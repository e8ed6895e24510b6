// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use kompass_tui::UiOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "kompass";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const DEFAULT_CELL_WIDTH_PX: u16 = 8;
const DEFAULT_SUMMARY_DEBOUNCE: &str = "10ms";
const DEFAULT_RESIZE_DEBOUNCE: &str = "50ms";
const DEFAULT_CLICK_WINDOW: &str = "200ms";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data: Data::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Data {
    pub path: Option<String>,
    pub state_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub confirm_uncheck: Option<bool>,
    pub cell_width_px: Option<u16>,
    pub summary_debounce: Option<String>,
    pub resize_debounce: Option<String>,
    pub click_window: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            confirm_uncheck: Some(true),
            cell_width_px: Some(DEFAULT_CELL_WIDTH_PX),
            summary_debounce: Some(DEFAULT_SUMMARY_DEBOUNCE.to_owned()),
            resize_debounce: Some(DEFAULT_RESIZE_DEBOUNCE.to_owned()),
            click_window: Some(DEFAULT_CLICK_WINDOW.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("KOMPASS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set KOMPASS_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [data], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate it with --print-example-config",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.ui.cell_width_px == Some(0) {
            bail!("ui.cell_width_px in {} must be positive, got 0", path.display());
        }

        for (key, value) in [
            ("ui.summary_debounce", &self.ui.summary_debounce),
            ("ui.resize_debounce", &self.ui.resize_debounce),
            ("ui.click_window", &self.ui.click_window),
        ] {
            if let Some(raw) = value
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        for (key, value) in [
            ("data.path", &self.data.path),
            ("data.state_path", &self.data.state_path),
            ("log.path", &self.log.path),
        ] {
            if value.as_deref().is_some_and(|raw| raw.trim().is_empty()) {
                bail!("{key} in {} must not be empty", path.display());
            }
        }

        Ok(())
    }

    pub fn data_path(&self) -> Option<PathBuf> {
        self.data.path.as_deref().map(PathBuf::from)
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.data.state_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(app_data_dir()?.join("state.json")),
        }
    }

    pub fn confirm_uncheck(&self) -> bool {
        self.ui.confirm_uncheck.unwrap_or(true)
    }

    pub fn ui_options(&self) -> Result<UiOptions> {
        Ok(UiOptions {
            cell_width_px: self.ui.cell_width_px.unwrap_or(DEFAULT_CELL_WIDTH_PX),
            summary_debounce: parse_duration(
                self.ui
                    .summary_debounce
                    .as_deref()
                    .unwrap_or(DEFAULT_SUMMARY_DEBOUNCE),
            )?,
            resize_debounce: parse_duration(
                self.ui
                    .resize_debounce
                    .as_deref()
                    .unwrap_or(DEFAULT_RESIZE_DEBOUNCE),
            )?,
            click_window: parse_duration(
                self.ui.click_window.as_deref().unwrap_or(DEFAULT_CLICK_WINDOW),
            )?,
        })
    }

    pub fn log_level(&self) -> String {
        self.log
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_ascii_lowercase()
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(app_data_dir()?.join("kompass.log")),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# kompass config\n# Place this file at: {}\n\nversion = 1\n\n[data]\n# Curriculum JSON document. `--data <path>` overrides it.\n# path = \"/absolute/path/to/curriculum.json\"\n# Optional. Default is the platform data dir (for example ~/.local/share/kompass/state.json)\n# state_path = \"/absolute/path/to/state.json\"\n\n[ui]\nconfirm_uncheck = true\ncell_width_px = {}\nsummary_debounce = \"{}\"\nresize_debounce = \"{}\"\nclick_window = \"{}\"\n\n[log]\n# One of: {}. RUST_LOG overrides it.\nlevel = \"{}\"\n# path = \"/absolute/path/to/kompass.log\"\n",
            path.display(),
            DEFAULT_CELL_WIDTH_PX,
            DEFAULT_SUMMARY_DEBOUNCE,
            DEFAULT_RESIZE_DEBOUNCE,
            DEFAULT_CLICK_WINDOW,
            LOG_LEVELS.join(", "),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn app_data_dir() -> Result<PathBuf> {
    let data_root = dirs::data_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set [data].state_path and [log].path explicitly")
    })?;
    Ok(data_root.join(APP_NAME))
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 50ms or 1s)")
}
