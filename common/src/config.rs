use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where difference artifacts live and how they are named.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Name artifacts `<file_name>_<index>.<extension>` so every frame of a
    /// group keeps its own diff instead of overwriting a single file.
    #[serde(default)]
    pub per_frame_artifacts: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of visible entries in one directory level. 0 = unbounded.
    #[serde(default = "default_max_entries_per_dir")]
    pub max_entries_per_dir: usize,
    /// Descend into sub-directories of the frame directory.
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Inception selection strategy: "never", "dimensions" or "threshold".
    #[serde(default = "default_inception")]
    pub inception: String,
    /// Mean absolute channel difference above which "threshold" starts a new group.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            file_name: default_file_name(),
            extension: default_extension(),
            per_frame_artifacts: false,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_entries_per_dir: default_max_entries_per_dir(),
            recursive: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inception: default_inception(),
            threshold: default_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ScanConfig {
    /// The per-directory ceiling, or `None` when scanning is unbounded.
    pub fn entry_limit(&self) -> Option<usize> {
        (self.max_entries_per_dir > 0).then_some(self.max_entries_per_dir)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_cache_root() -> PathBuf {
    PathBuf::from(".inference")
}
fn default_file_name() -> String {
    "diff".into()
}
fn default_extension() -> String {
    "dat".into()
}
fn default_max_entries_per_dir() -> usize {
    100
}
fn default_inception() -> String {
    "never".into()
}
fn default_threshold() -> f64 {
    32.0
}
fn default_log_level() -> String {
    "info".into()
}
