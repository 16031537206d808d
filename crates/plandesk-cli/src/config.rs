// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use log::LevelFilter;
use plandesk_app::{EntityKind, TableOptions};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "plandesk";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_ITEMS_PER_PAGE: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            table: Table::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Table {
    pub items_per_page: Option<usize>,
    pub menu_gap: Option<i32>,
    pub menu_margin: Option<i32>,
    pub role_toggle: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub start_kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PLANDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PLANDESK_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
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
                    "config file {} has no version. Add `version = 1` and keep values under [api], [table], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
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
        if self.api_base_url().trim().is_empty() {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        let timeout = self.api_timeout()?;
        if timeout <= Duration::ZERO {
            bail!(
                "api.timeout in {} must be positive, got {}",
                path.display(),
                self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT)
            );
        }

        if let Some(items) = self.table.items_per_page
            && !(1..=MAX_ITEMS_PER_PAGE).contains(&items)
        {
            bail!(
                "table.items_per_page in {} must be between 1 and {MAX_ITEMS_PER_PAGE}, got {items}",
                path.display()
            );
        }

        for (key, value) in [
            ("menu_gap", self.table.menu_gap),
            ("menu_margin", self.table.menu_margin),
        ] {
            if let Some(value) = value
                && value < 0
            {
                bail!(
                    "table.{key} in {} must be non-negative, got {value}",
                    path.display()
                );
            }
        }

        self.start_kind()
            .with_context(|| format!("invalid [ui] config in {}", path.display()))?;
        self.log_level()
            .with_context(|| format!("invalid [log] config in {}", path.display()))?;
        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn table_options(&self) -> TableOptions {
        let defaults = TableOptions::default();
        TableOptions {
            items_per_page: self.table.items_per_page.unwrap_or(defaults.items_per_page),
            menu_gap: self.table.menu_gap.unwrap_or(defaults.menu_gap),
            menu_margin: self.table.menu_margin.unwrap_or(defaults.menu_margin),
            role_toggle: self.table.role_toggle.unwrap_or(defaults.role_toggle),
        }
    }

    pub fn start_kind(&self) -> Result<EntityKind> {
        let Some(raw) = self.ui.start_kind.as_deref() else {
            return Ok(EntityKind::Organization);
        };
        EntityKind::parse(raw.trim()).ok_or_else(|| {
            let known = EntityKind::ALL
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!("unknown start_kind {raw:?}; use one of: {known}")
        })
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        let raw = self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        raw.trim().parse::<LevelFilter>().map_err(|_| {
            anyhow!("unknown log level {raw:?}; use off, error, warn, info, debug, or trace")
        })
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].path or pass --log <path>")
        })?;
        Ok(data_root.join(APP_NAME).join("plandesk.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# plandesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[table]\nitems_per_page = {}\nmenu_gap = 1\nmenu_margin = 1\n# Offer promote/demote on user rows\nrole_toggle = false\n\n[ui]\n# organization, user, insurance, pending, request, or view-only\nstart_kind = \"organization\"\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/plandesk/plandesk.log)\n# path = \"/absolute/path/to/plandesk.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            TableOptions::default().items_per_page,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
