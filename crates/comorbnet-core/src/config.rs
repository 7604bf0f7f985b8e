use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::suppress::DEFAULT_THRESHOLD;
use crate::table::WeightField;

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "comorbnet.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub suppression: SuppressionSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub pagerank: PageRankSettings,
    #[serde(default)]
    pub community: CommunitySettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionSettings {
    #[serde(default = "default_threshold")]
    pub threshold: u64,
}

impl Default for SuppressionSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Which subgraph community detection runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterScope {
    /// Only the largest strongly connected component; all other nodes are
    /// unassigned.
    #[default]
    LargestScc,
    WholeGraph,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(default)]
    pub weight: WeightField,
    #[serde(default)]
    pub cluster_scope: ClusterScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankSettings {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

impl Default for PageRankSettings {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            tolerance: default_tolerance(),
            max_iter: default_max_iter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunitySettings {
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            seed: default_seed(),
            max_passes: default_max_passes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Worker threads for per-cause units; 0 lets rayon decide.
    #[serde(default)]
    pub threads: usize,
}

/// Load configuration.
///
/// An explicit path must exist. Without one, `./comorbnet.toml` is used when
/// present, then the user config directory (`comorbnet/config.toml`), and
/// otherwise defaults.
///
/// # Errors
///
/// Returns an error if the chosen file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return read_config(&local);
    }

    let user = dirs::config_dir().map(|dir| dir.join("comorbnet/config.toml"));
    if let Some(user) = user.filter(|path| path.exists()) {
        return read_config(&user);
    }

    Ok(ProjectConfig::default())
}

fn read_config(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_threshold() -> u64 {
    DEFAULT_THRESHOLD
}

const fn default_damping() -> f64 {
    0.85
}

const fn default_tolerance() -> f64 {
    1.0e-6
}

const fn default_max_iter() -> usize {
    100
}

const fn default_trials() -> usize {
    10
}

const fn default_seed() -> u64 {
    123
}

const fn default_max_passes() -> usize {
    20
}
