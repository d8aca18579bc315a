use crate::catalog::Language;
use crate::search::Ranking;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAX_TOP_K: usize = 100;

/// Engine settings shared by the CLI and the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overrides the bundled English stop-word list.
    pub english_stopwords: Option<PathBuf>,
    /// Overrides the bundled Czech stop-word list.
    pub czech_stopwords: Option<PathBuf>,
    pub ranking: Ranking,
    pub top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { english_stopwords: None, czech_stopwords: None, ranking: Ranking::default(), top_k: 10 }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn stopwords_path(&self, language: Language) -> Option<&Path> {
        match language {
            Language::English => self.english_stopwords.as_deref(),
            Language::Czech => self.czech_stopwords.as_deref(),
        }
    }

    /// Requested result count, or the configured default, kept within 1..=100.
    pub fn clamp_top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.top_k).max(1).min(MAX_TOP_K)
    }
}
