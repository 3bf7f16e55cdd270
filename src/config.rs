use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Default source directory when `qlab ingest` is given no argument.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            root: None,
            include_globs: default_include_globs(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["*.json".to_string()]
}

/// Policy knobs for the fetch/label cycle.
#[derive(Debug, Deserialize, Clone)]
pub struct LabelingConfig {
    /// How long a fetched item stays reserved to the fetching actor.
    /// Zero disables reservations entirely.
    #[serde(default)]
    pub reservation_secs: u64,
    #[serde(default = "default_allow_relabel")]
    pub allow_relabel: bool,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            reservation_secs: 0,
            allow_relabel: true,
        }
    }
}

/// Upper bound for `labeling.reservation_secs` (one day).
pub const MAX_RESERVATION_SECS: u64 = 86_400;

fn default_allow_relabel() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.labeling.reservation_secs > MAX_RESERVATION_SECS {
        anyhow::bail!(
            "labeling.reservation_secs must be at most {} (got {})",
            MAX_RESERVATION_SECS,
            config.labeling.reservation_secs
        );
    }

    if config.ingest.include_globs.is_empty() {
        anyhow::bail!("ingest.include_globs must contain at least one pattern");
    }
    for pattern in &config.ingest.include_globs {
        globset::Glob::new(pattern)
            .with_context(|| format!("Invalid ingest.include_globs pattern: '{}'", pattern))?;
    }

    Ok(())
}
