use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project settings read from `bindgraph.toml`. Command-line flags take
/// precedence over every field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub path: Option<String>,
    pub database: Option<String>,
    /// Languages to analyze; empty means every registered one
    pub languages: Vec<String>,
    pub eager_expression_resolve: bool,
    pub exclude: Vec<String>,
    /// Parser workers; 0 picks the available parallelism
    pub threads: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            path: None,
            database: None,
            languages: Vec::new(),
            eager_expression_resolve: true,
            exclude: Vec::new(),
            threads: 0,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("bindgraph.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".bindgraph").join("bindgraph.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AnalyzerConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AnalyzerConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AnalyzerConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
