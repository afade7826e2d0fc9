use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Session configuration, read from `~/.raystruct/config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub algorithms: AlgorithmConfig,
}

/// How custom sources are compiled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolchainConfig {
    /// C++ compiler executable, looked up on PATH
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Language standard passed as `-std=`
    #[serde(default = "default_standard")]
    pub standard: String,

    /// Directory holding `model/DataStructure.hpp` and `model/Algorithm.hpp`
    #[serde(default = "default_include_dir")]
    pub include_dir: PathBuf,

    /// Appended after the built-in flags
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactsConfig {
    /// Generated libraries go to `<root>/structures` and `<root>/algorithms`
    #[serde(default = "default_artifact_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    /// Step-by-step display is skipped above this many elements
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    /// Fewer elements than this and the benchmark is refused
    #[serde(default = "default_min_elements")]
    pub min_elements: usize,

    /// Inclusive range for `rnd`
    #[serde(default)]
    pub random_min: i32,
    #[serde(default = "default_random_max")]
    pub random_max: i32,
}

/// Settings for the built-in algorithms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlgorithmConfig {
    #[serde(default = "default_true")]
    pub min_heap: bool,

    /// Rank for heap selection, 1-based
    #[serde(default = "default_selection_k")]
    pub selection_k: usize,

    /// k-th smallest when true, k-th largest otherwise
    #[serde(default = "default_true")]
    pub selection_smallest: bool,

    /// A* endpoints; smallest and largest vertex when unset
    #[serde(default)]
    pub astar_start: Option<i32>,
    #[serde(default)]
    pub astar_goal: Option<i32>,
}

fn default_compiler() -> String {
    "g++".to_string()
}

fn default_standard() -> String {
    "c++17".to_string()
}

fn default_include_dir() -> PathBuf {
    PathBuf::from("include")
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("custom").join("build")
}

fn default_display_limit() -> usize {
    20
}

fn default_min_elements() -> usize {
    2
}

fn default_random_max() -> i32 {
    100
}

fn default_selection_k() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            standard: default_standard(),
            include_dir: default_include_dir(),
            extra_flags: Vec::new(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: default_artifact_root(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            display_limit: default_display_limit(),
            min_elements: default_min_elements(),
            random_min: 0,
            random_max: default_random_max(),
        }
    }
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            min_heap: true,
            selection_k: default_selection_k(),
            selection_smallest: true,
            astar_start: None,
            astar_goal: None,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;

        let config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;

        Ok(home.join(".raystruct").join("config.yaml"))
    }

    fn validate(&self) -> Result<()> {
        if self.toolchain.compiler.trim().is_empty() {
            anyhow::bail!("toolchain.compiler must not be empty");
        }
        if self.benchmark.random_min > self.benchmark.random_max {
            anyhow::bail!(
                "benchmark.random_min ({}) is greater than benchmark.random_max ({})",
                self.benchmark.random_min,
                self.benchmark.random_max
            );
        }
        Ok(())
    }
}
