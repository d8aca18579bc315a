//! Per-language routing: one [`Index`] per supported language, created on
//! first use with that language's preprocessor.

use crate::config::EngineConfig;
use crate::index::{Index, IndexStats};
use crate::ingest::ArticleRecord;
use crate::tokenizer::{self, CzechPreprocessor, EnglishPreprocessor, Preprocessor, StopWords};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Czech,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::Czech];

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Czech => "cs",
        }
    }

    pub fn preprocessor(self, config: &EngineConfig) -> Box<dyn Preprocessor> {
        let path = config.stopwords_path(self);
        match self {
            Language::English => Box::new(EnglishPreprocessor::from_stopword_file(path)),
            Language::Czech => Box::new(CzechPreprocessor::from_stopword_file(path)),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            // Slovak is close enough to share the Czech pipeline.
            "cs" | "czech" | "sk" | "slovak" => Ok(Language::Czech),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::English => "english",
            Language::Czech => "czech",
        })
    }
}

/// Decides which index a document belongs to. `None` means unsupported.
pub trait DetectLanguage: Send + Sync {
    fn detect(&self, text: &str) -> Option<Language>;
}

/// Always answers the same language.
pub struct FixedLanguage(pub Language);

impl DetectLanguage for FixedLanguage {
    fn detect(&self, _text: &str) -> Option<Language> { Some(self.0) }
}

/// Votes by counting hits in each language's bundled stop-word list.
/// Text with no stop word of any language is unsupported; ties go to the
/// language listed first in [`Language::ALL`].
pub struct StopWordDetector {
    lists: Vec<(Language, StopWords)>,
}

impl Default for StopWordDetector {
    fn default() -> Self {
        Self { lists: vec![(Language::English, StopWords::english()), (Language::Czech, StopWords::czech())] }
    }
}

impl DetectLanguage for StopWordDetector {
    fn detect(&self, text: &str) -> Option<Language> {
        let words: Vec<String> = tokenizer::spans(text).map(str::to_lowercase).collect();
        let mut best: Option<(Language, usize)> = None;
        for (language, list) in &self.lists {
            let hits = words.iter().filter(|w| list.contains(w)).count();
            if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
                best = Some((*language, hits));
            }
        }
        best.map(|(language, _)| language)
    }
}

/// Indexes keyed by language.
pub struct Catalog {
    config: EngineConfig,
    indexes: BTreeMap<Language, Index>,
}

impl Catalog {
    pub fn new(config: EngineConfig) -> Self { Self { config, indexes: BTreeMap::new() } }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// The index for `language`, if any document was routed to it.
    pub fn index(&self, language: Language) -> Option<&Index> { self.indexes.get(&language) }

    pub fn index_mut(&mut self, language: Language) -> &mut Index {
        let config = &self.config;
        self.indexes.entry(language).or_insert_with(|| {
            tracing::info!(%language, "creating index");
            Index::new(language.preprocessor(config))
        })
    }

    /// Indexes the title and body of `record` under `file_path`. Returns
    /// false when that path is already in the language's index.
    pub fn index_article(&mut self, language: Language, record: &ArticleRecord, file_path: &str) -> bool {
        self.index_mut(language).index(&record.indexable_text(), file_path)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ { self.indexes.keys().copied() }

    pub fn stats(&self) -> BTreeMap<Language, IndexStats> {
        self.indexes.iter().map(|(language, index)| (*language, index.stats())).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_are_created_lazily_per_language() {
        let mut catalog = Catalog::default();
        assert!(catalog.index(Language::Czech).is_none());
        assert!(catalog.index_article(Language::Czech, &ArticleRecord::new("Praha", "Město na řece"), "cs/1.json"));
        assert!(catalog.index(Language::Czech).is_some());
        assert!(catalog.index(Language::English).is_none());
        assert_eq!(catalog.languages().collect::<Vec<_>>(), vec![Language::Czech]);
        assert_eq!(catalog.stats()[&Language::Czech].documents, 1);
    }

    #[test]
    fn same_path_is_indexed_once_per_language() {
        let mut catalog = Catalog::default();
        let record = ArticleRecord::new("Cats", "Cats purr.");
        assert!(catalog.index_article(Language::English, &record, "a.json"));
        assert!(!catalog.index_article(Language::English, &record, "a.json"));
        assert!(catalog.index_article(Language::Czech, &record, "a.json"));
    }

    #[test]
    fn czech_index_uses_czech_normalization() {
        let mut catalog = Catalog::default();
        catalog.index_article(Language::Czech, &ArticleRecord::new("Žena", "ženy"), "x");
        let index = catalog.index(Language::Czech).unwrap();
        let term = index.preprocessor().preprocess("žena");
        assert_eq!(index.documents(&term).as_slice(), &[0]);
    }

    #[test]
    fn stop_word_detector_votes() {
        let detector = StopWordDetector::default();
        assert_eq!(detector.detect("The cat is on the mat and it is happy"), Some(Language::English));
        assert_eq!(detector.detect("Kočka je na stole a také spí, protože je unavená"), Some(Language::Czech));
        assert_eq!(detector.detect("12345"), None);
        assert_eq!(FixedLanguage(Language::Czech).detect("anything"), Some(Language::Czech));
    }

    #[test]
    fn language_names_parse() {
        assert_eq!("cs".parse::<Language>(), Ok(Language::Czech));
        assert_eq!("Slovak".parse::<Language>(), Ok(Language::Czech));
        assert_eq!("en".parse::<Language>(), Ok(Language::English));
        assert!("de".parse::<Language>().is_err());
        assert_eq!(Language::Czech.code(), "cs");
    }
}
