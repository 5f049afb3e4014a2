use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssemblyConfig {
    /// Token budget when neither a per-function setting nor a CLI
    /// override supplies one.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: i64,
    /// A document is only partially included when strictly more than
    /// this many tokens of budget remain.
    #[serde(default = "default_min_partial_tokens")]
    pub min_partial_tokens: i64,
    /// Characters per estimated token, for documents without a stored
    /// estimate and for loader-side estimates.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: 200_000,
            min_partial_tokens: 1_000,
            chars_per_token: 3.5,
        }
    }
}

fn default_max_tokens() -> i64 {
    200_000
}
fn default_min_partial_tokens() -> i64 {
    1_000
}
fn default_chars_per_token() -> f64 {
    3.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
    ]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate assembly
    if config.assembly.default_max_tokens <= 0 {
        anyhow::bail!("assembly.default_max_tokens must be > 0");
    }

    if config.assembly.min_partial_tokens < 0 {
        anyhow::bail!("assembly.min_partial_tokens must be >= 0");
    }

    if config.assembly.chars_per_token <= 0.0 {
        anyhow::bail!("assembly.chars_per_token must be > 0");
    }

    Ok(config)
}
