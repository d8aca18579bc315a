use crate::error::QueryError;
use crate::index::{DocumentList, Index};
use crate::query::Grammar;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// How matching documents are ordered. Chosen per call, outside the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ranking {
    /// Ascending document id.
    None,
    #[default]
    TfIdf,
    Cosine,
}

impl FromStr for Ranking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Ranking::None),
            "tfidf" | "tf-idf" => Ok(Ranking::TfIdf),
            "cosine" => Ok(Ranking::Cosine),
            other => Err(format!("unknown ranking '{other}' (expected none, tfidf or cosine)")),
        }
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ranking::None => "none",
            Ranking::TfIdf => "tfidf",
            Ranking::Cosine => "cosine",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub total_hits: usize,
    pub hits: Vec<Hit>,
    /// Non-negated identifiers as written in the query, sorted.
    pub query_words: Vec<String>,
    /// Normalized terms the scores were computed from, sorted.
    pub relevant_terms: Vec<String>,
    pub took_s: f64,
}

/// Drops stop words from the raw relevant words and normalizes the rest.
pub fn relevant_terms(index: &Index, words: &HashSet<String>) -> HashSet<String> {
    let preprocessor = index.preprocessor();
    words
        .iter()
        .filter(|w| !preprocessor.is_stop_word(w))
        .map(|w| preprocessor.preprocess(w))
        .collect()
}

/// Scores every document and orders by descending score. The sort is
/// stable, so equal scores keep ascending id order.
pub fn rank(index: &Index, docs: &DocumentList, terms: &HashSet<String>, ranking: Ranking) -> Vec<Hit> {
    let score = |doc_id: DocId| -> f64 {
        if terms.is_empty() {
            return 0.0;
        }
        match ranking {
            Ranking::None => 0.0,
            Ranking::TfIdf => index.tf_idf(doc_id, terms),
            Ranking::Cosine => index.cosine_similarity(doc_id, terms),
        }
    };
    let mut hits: Vec<Hit> = docs.iter().map(|doc_id| Hit { doc_id, score: score(doc_id) }).collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits
}

/// Compiles `query`, evaluates it against `index` and ranks the matches.
/// `top_k` limits the returned hits; `total_hits` always counts all matches.
pub fn search(
    index: &Index,
    query: &str,
    grammar: Grammar,
    ranking: Ranking,
    top_k: Option<usize>,
) -> Result<SearchOutcome, QueryError> {
    let start = Instant::now();
    let mut compiled = grammar.compile(query)?;
    let docs = compiled.evaluate(index);
    let words = compiled.relevant_words();
    let terms = relevant_terms(index, &words);

    let mut hits = rank(index, &docs, &terms, ranking);
    let total_hits = hits.len();
    if let Some(k) = top_k {
        hits.truncate(k);
    }
    let mut query_words: Vec<String> = words.into_iter().collect();
    query_words.sort();
    let mut relevant_terms: Vec<String> = terms.into_iter().collect();
    relevant_terms.sort();

    let took_s = start.elapsed().as_secs_f64();
    tracing::debug!(%grammar, %ranking, total_hits, took_s, "search finished");
    Ok(SearchOutcome { total_hits, hits, query_words, relevant_terms, took_s })
}
