use anyhow::{Context as AnyhowContext, Result};
use doctree_core::TreeConfig;
use doctree_splitter::SplitterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of a `doctree.toml` file. Missing tables and keys fall back to
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub tree: TreeConfig,
    pub splitter: SplitterConfig,
}

impl FileConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid doctree config")
    }

    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
