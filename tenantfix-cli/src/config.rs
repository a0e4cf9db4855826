//! Configuration file loading for tenantfix.
//!
//! Discovers and loads `tenantfix.toml` from the working directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tenantfix_core::settings::{default_models, default_next_steps, MigrationSettings, DEFAULT_SCHEMA_PATH};
use tenantfix_types::ops::{RewriteEngine, TenantSpec};
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "tenantfix.toml";

/// Top-level configuration from tenantfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantfixConfig {
    /// Which schema to read and where to write it.
    pub schema: SchemaConfig,

    /// Declarations to inject and the anchors that place them.
    pub tenant: TenantSpec,

    /// Target models and run behaviour.
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub path: Utf8PathBuf,

    /// Write here instead of rewriting `path` in place.
    pub output: Option<Utf8PathBuf>,

    pub engine: RewriteEngine,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from(DEFAULT_SCHEMA_PATH),
            output: None,
            engine: RewriteEngine::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Target models, in execution order.
    pub models: Vec<String>,

    /// Skip passes whose declaration already exists.
    pub guard_existing: bool,

    /// Refuse to write when any pass would be skipped.
    pub strict: bool,

    /// Printed after a successful run.
    pub next_steps: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            guard_existing: true,
            strict: false,
            next_steps: default_next_steps(),
        }
    }
}

/// Discover the tenantfix.toml config file in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a tenantfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<TenantfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<TenantfixConfig> {
    let config: TenantfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load an explicit config path, else discover one in `root`, else defaults.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    root: &Utf8Path,
) -> anyhow::Result<TenantfixConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(TenantfixConfig::default()),
    }
}

/// Values given on the command line; `None`/`false` leaves the file setting.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub schema: Option<Utf8PathBuf>,
    pub output: Option<Utf8PathBuf>,
    /// Non-empty replaces the configured list.
    pub models: Vec<String>,
    pub engine: Option<RewriteEngine>,
    pub no_guard: bool,
    pub strict: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: TenantfixConfig,
}

impl ConfigMerger {
    pub fn new(config: TenantfixConfig) -> Self {
        Self { config }
    }

    pub fn merge(self, cli: &CliOverrides) -> MigrationSettings {
        let TenantfixConfig {
            schema,
            tenant,
            migration,
        } = self.config;

        let models = if cli.models.is_empty() {
            migration.models
        } else {
            cli.models.clone()
        };

        MigrationSettings {
            input: cli.schema.clone().unwrap_or(schema.path),
            output: cli.output.clone().or(schema.output),
            models,
            tenant,
            engine: cli.engine.unwrap_or(schema.engine),
            guard_existing: migration.guard_existing && !cli.no_guard,
            strict: migration.strict || cli.strict,
            next_steps: migration.next_steps,
        }
    }
}
