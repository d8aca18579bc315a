use crate::error::IndexError;
use crate::tokenizer::{EnglishPreprocessor, Preprocessor};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
}

/// Postings of one term, sorted by `doc_id` with one entry per document.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self { Self::default() }

    /// Records one occurrence of the term in `doc_id`. Returns true when the
    /// document was not in the list before.
    pub fn add(&mut self, doc_id: DocId) -> bool {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.frequency += 1;
                false
            }
            Some(last) if last.doc_id > doc_id => {
                // Out-of-order insert; only reachable through direct add_document calls.
                match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
                    Ok(pos) => {
                        self.postings[pos].frequency += 1;
                        false
                    }
                    Err(pos) => {
                        self.postings.insert(pos, Posting { doc_id, frequency: 1 });
                        true
                    }
                }
            }
            _ => {
                self.postings.push(Posting { doc_id, frequency: 1 });
                true
            }
        }
    }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> { self.postings.iter() }

    pub fn frequency(&self, doc_id: DocId) -> u32 {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .map(|pos| self.postings[pos].frequency)
            .unwrap_or(0)
    }

    pub fn doc_ids(&self) -> DocumentList {
        DocumentList(self.postings.iter().map(|p| p.doc_id).collect())
    }
}

/// Ordered, duplicate-free sequence of document ids. Used both for the ids of
/// a posting list and for the result of boolean evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentList(Vec<DocId>);

impl DocumentList {
    pub fn new() -> Self { Self::default() }

    /// Wraps ids that are already ascending and unique.
    pub fn from_sorted(ids: Vec<DocId>) -> Self {
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids must be strictly ascending");
        Self(ids)
    }

    pub fn as_slice(&self) -> &[DocId] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ { self.0.iter().copied() }

    pub fn contains(&self, doc_id: DocId) -> bool { self.0.binary_search(&doc_id).is_ok() }
}

impl From<Vec<DocId>> for DocumentList {
    fn from(mut ids: Vec<DocId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }
}

impl FromIterator<DocId> for DocumentList {
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl IntoIterator for DocumentList {
    type Item = DocId;
    type IntoIter = std::vec::IntoIter<DocId>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

/// Term counts of one document.
#[derive(Debug, Clone, Default)]
pub struct BagOfWords {
    words: HashMap<String, u32>,
}

impl BagOfWords {
    pub fn new() -> Self { Self::default() }

    /// Every term counted once, as used for a query.
    pub fn from_terms<'a, I: IntoIterator<Item = &'a str>>(terms: I) -> Self {
        let mut bag = Self::new();
        for term in terms {
            if bag.occurrences(term) == 0 {
                bag.add_word(term, 1);
            }
        }
        bag
    }

    pub fn add_word(&mut self, word: &str, count: u32) {
        *self.words.entry(word.to_string()).or_insert(0) += count;
    }

    pub fn occurrences(&self, word: &str) -> u32 { self.words.get(word).copied().unwrap_or(0) }

    pub fn words(&self) -> impl Iterator<Item = (&str, u32)> {
        self.words.iter().map(|(w, c)| (w.as_str(), *c))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: u64,
    pub terms: u64,
    pub tokens: u64,
}

/// In-memory inverted index for one language.
pub struct Index {
    preprocessor: Box<dyn Preprocessor>,
    postings: HashMap<String, PostingList>,
    bags: BTreeMap<DocId, BagOfWords>,
    file_paths: HashMap<DocId, String>,
    seen_paths: HashSet<String>,
    next_doc_id: DocId,
    document_count: u64,
    term_count: u64,
    token_count: u64,
}

impl Default for Index {
    fn default() -> Self { Self::new(Box::new(EnglishPreprocessor::default())) }
}

impl Index {
    pub fn new(preprocessor: Box<dyn Preprocessor>) -> Self {
        Self {
            preprocessor,
            postings: HashMap::new(),
            bags: BTreeMap::new(),
            file_paths: HashMap::new(),
            seen_paths: HashSet::new(),
            next_doc_id: 0,
            document_count: 0,
            term_count: 0,
            token_count: 0,
        }
    }

    pub fn preprocessor(&self) -> &dyn Preprocessor { self.preprocessor.as_ref() }

    /// Records one occurrence of an already normalized `term` in `doc_id`.
    pub fn add_document(&mut self, term: &str, doc_id: DocId, file_path: &str) {
        match self.postings.get_mut(term) {
            Some(list) => {
                list.add(doc_id);
            }
            None => {
                let mut list = PostingList::new();
                list.add(doc_id);
                self.postings.insert(term.to_string(), list);
                self.term_count += 1;
            }
        }
        self.file_paths.entry(doc_id).or_insert_with(|| file_path.to_string());
        self.bags.entry(doc_id).or_default().add_word(term, 1);
        self.token_count += 1;
        if doc_id >= self.next_doc_id {
            self.next_doc_id = doc_id.saturating_add(1);
        }
    }

    /// Preprocesses `text` and indexes it under a fresh id. Returns false and
    /// changes nothing when `file_path` has been indexed already.
    pub fn index(&mut self, text: &str, file_path: &str) -> bool {
        if self.seen_paths.contains(file_path) {
            tracing::debug!(file_path, "document already indexed");
            return false;
        }
        let doc_id = self.next_doc_id;
        let Some(next) = doc_id.checked_add(1) else {
            tracing::warn!(file_path, "document ids exhausted");
            return false;
        };
        self.seen_paths.insert(file_path.to_string());
        self.next_doc_id = next;
        self.file_paths.insert(doc_id, file_path.to_string());
        let terms = self.preprocessor.tokenize(text);
        for term in &terms {
            self.add_document(term, doc_id, file_path);
        }
        self.document_count += 1;
        tracing::debug!(doc_id, file_path, terms = terms.len(), "indexed document");
        true
    }

    /// Document ids containing `term`; empty when the term was never indexed.
    pub fn documents(&self, term: &str) -> DocumentList {
        self.postings.get(term).map(PostingList::doc_ids).unwrap_or_default()
    }

    pub fn postings(&self, term: &str) -> Option<&PostingList> { self.postings.get(term) }

    /// Every document id that has at least one term, ascending.
    pub fn all_document_ids(&self) -> DocumentList {
        DocumentList(self.bags.keys().copied().collect())
    }

    pub fn file_path(&self, doc_id: DocId) -> Result<&str, IndexError> {
        self.file_paths.get(&doc_id).map(String::as_str).ok_or(IndexError::NotFound(doc_id))
    }

    pub fn bag_of_words(&self, doc_id: DocId) -> Option<&BagOfWords> { self.bags.get(&doc_id) }

    pub fn document_count(&self) -> u64 { self.document_count }

    pub fn term_count(&self) -> u64 { self.term_count }

    pub fn token_count(&self) -> u64 { self.token_count }

    pub fn stats(&self) -> IndexStats {
        IndexStats { documents: self.document_count, terms: self.term_count, tokens: self.token_count }
    }

    fn idf(&self, term: &str) -> f64 {
        let df = self.postings.get(term).map(PostingList::len).unwrap_or(0);
        if df == 0 {
            return 0.0;
        }
        (self.bags.len() as f64 / df as f64).ln()
    }

    fn tf(frequency: u32) -> f64 {
        if frequency > 0 { 1.0 + (frequency as f64).ln() } else { 0.0 }
    }

    /// Additive score `sum(tf * idf)` over the relevant terms.
    pub fn tf_idf(&self, doc_id: DocId, relevant_terms: &HashSet<String>) -> f64 {
        let Some(bag) = self.bags.get(&doc_id) else {
            return 0.0;
        };
        relevant_terms
            .iter()
            .map(|term| Self::tf(bag.occurrences(term)) * self.idf(term))
            .sum()
    }

    /// Cosine between the tf-idf vector of the document and that of the
    /// relevant terms (each counted once). Zero when either vector is zero.
    pub fn cosine_similarity(&self, doc_id: DocId, relevant_terms: &HashSet<String>) -> f64 {
        let Some(doc) = self.bags.get(&doc_id) else {
            return 0.0;
        };
        let query = BagOfWords::from_terms(relevant_terms.iter().map(String::as_str));

        let mut vocabulary: HashSet<&str> = doc.words().map(|(w, _)| w).collect();
        vocabulary.extend(query.words().map(|(w, _)| w));

        let (mut dot, mut norm_doc, mut norm_query) = (0.0f64, 0.0f64, 0.0f64);
        for term in vocabulary {
            let idf = self.idf(term);
            let d = Self::tf(doc.occurrences(term)) * idf;
            let q = Self::tf(query.occurrences(term)) * idf;
            dot += d * q;
            norm_doc += d * d;
            norm_query += q * q;
        }
        if norm_doc == 0.0 || norm_query == 0.0 {
            return 0.0;
        }
        dot / (norm_doc.sqrt() * norm_query.sqrt())
    }
}
