use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoosterConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which page enhancements run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub merge_request_list: bool,
    #[serde(default = "default_true")]
    pub issue_detail: bool,
    #[serde(default = "default_true")]
    pub issue_list: bool,
}

/// What a routine does when a metadata document could not be fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Render nothing for the unavailable sub-resource
    #[default]
    Skip,
    /// Render as if the document were an empty list
    Empty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub on_failure: FetchFailurePolicy,
    /// Extra request headers, e.g. a session cookie for private instances
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// [diff] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Apply the built-in translation/mock/test/lockfile exclusions
    #[serde(default = "default_true")]
    pub builtin_excludes: bool,
    /// Additional glob patterns excluded from diff totals
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Share of the viewport width taken by the side panel
    #[serde(default = "default_width_percent")]
    pub width_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_width_percent() -> u8 {
    40
}

fn default_log_filter() -> String {
    "warn".into()
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            merge_request_list: true,
            issue_detail: true,
            issue_list: true,
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            builtin_excludes: true,
            exclude: Vec::new(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width_percent: default_width_percent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl BoosterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: BoosterConfig =
            toml::from_str(content).context("Failed to parse booster config")?;
        config.panel.width_percent = config.panel.width_percent.clamp(1, 100);
        Ok(config)
    }
}

/// Load `~/.config/issue-booster/config.toml`, falling back to built-in defaults
/// when the file is missing or invalid.
pub fn load_config() -> BoosterConfig {
    match dirs::config_dir() {
        Some(dir) => load_config_from(&dir.join("issue-booster/config.toml")),
        None => BoosterConfig::default(),
    }
}

pub fn load_config_from(path: &Path) -> BoosterConfig {
    let Ok(content) = std::fs::read_to_string(path) else {
        return BoosterConfig::default();
    };
    match BoosterConfig::from_toml_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config");
            BoosterConfig::default()
        }
    }
}
