use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const ENGLISH_STOPWORDS: &str = include_str!("../data/stopwords-en.txt");
const CZECH_STOPWORDS: &str = include_str!("../data/stopwords-cs.txt");

lazy_static! {
    // Alternatives are tried left to right at each position, so URLs, times and
    // separated numbers win over the generic word pattern.
    static ref RE: Regex = Regex::new(concat!(
        r"(?P<tag><[^<>]*>)",
        r"|(?P<url>(?:https?|ftp|file)://[-a-zA-Z0-9+&@#/%?=~_|!:,.;]*[-a-zA-Z0-9+&@#/%=~_|])",
        r"|(?P<time>\d+:\d+)",
        r"|(?P<number>\d+(?:[.,]\d+)+)",
        r"|(?P<word>[\p{L}\p{N}*]+(?:'[\p{L}\p{N}*]+)*)",
    ))
    .expect("valid regex");
}

/// Splits raw text into candidate token spans. HTML-like tags are dropped.
pub fn spans(text: &str) -> impl Iterator<Item = &str> + '_ {
    RE.captures_iter(text).filter_map(|caps| {
        if caps.name("tag").is_some() {
            return None;
        }
        caps.get(0).map(|m| m.as_str())
    })
}

/// Word-like tokens get stemmed; URLs, times and numbers are only case-folded.
fn is_word(token: &str) -> bool {
    token.chars().all(|c| c.is_alphanumeric() || c == '\'' || c == '*')
}

/// Text normalization contract shared by every language.
pub trait Preprocessor: Send + Sync {
    /// Turns a document into its sequence of index terms, in order.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Normalizes a single token (e.g. a query identifier) the same way
    /// `tokenize` normalizes document tokens. Stop words are not removed.
    fn preprocess(&self, token: &str) -> String;

    fn is_stop_word(&self, word: &str) -> bool;
}

/// Newline-delimited stop-word list. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn from_list(list: &str) -> Self {
        let words = list
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { words }
    }

    /// Reads a list from disk. An unreadable file yields an empty set so the
    /// preprocessor can still be built.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(list) => Self::from_list(&list),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read stop words, continuing without them");
                Self::default()
            }
        }
    }

    pub fn english() -> Self { Self::from_list(ENGLISH_STOPWORDS) }

    pub fn czech() -> Self { Self::from_list(CZECH_STOPWORDS) }

    pub fn contains(&self, word: &str) -> bool { self.words.contains(word) }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

/// Stemming strategy plugged into a preprocessor.
pub trait Stem: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// Snowball stemmer from `rust-stemmers`.
pub struct SnowballStemmer(Stemmer);

impl SnowballStemmer {
    pub fn english() -> Self { Self(Stemmer::create(Algorithm::English)) }
}

impl Stem for SnowballStemmer {
    fn stem(&self, word: &str) -> String { self.0.stem(word).into_owned() }
}

/// Leaves words untouched.
pub struct NoStemmer;

impl Stem for NoStemmer {
    fn stem(&self, word: &str) -> String { word.to_string() }
}

/// Light Czech stemmer: strips case endings and possessive suffixes, then
/// normalizes the final consonant. Expects diacritics already folded.
pub struct CzechLightStemmer;

const CZECH_CASE_3: &[&str] = &[
    "ech", "ich", "eho", "emi", "emu", "ete", "eti", "iho", "imi", "imu", "ach", "ata", "aty",
    "ych", "ama", "ami", "ove", "ovi", "ymi",
];
const CZECH_CASE_2: &[&str] = &["em", "es", "im", "um", "at", "am", "os", "us", "ym", "mi", "ou"];

fn ends_with(s: &[char], suffix: &str) -> bool {
    let n = suffix.chars().count();
    s.len() >= n && s[s.len() - n..].iter().copied().eq(suffix.chars())
}

impl CzechLightStemmer {
    fn remove_case(s: &[char]) -> usize {
        let len = s.len();
        if len > 7 && ends_with(s, "atech") {
            return len - 5;
        }
        if len > 6 && (ends_with(s, "etem") || ends_with(s, "atum")) {
            return len - 4;
        }
        if len > 5 && CZECH_CASE_3.iter().any(|x| ends_with(s, x)) {
            return len - 3;
        }
        if len > 4 && CZECH_CASE_2.iter().any(|x| ends_with(s, x)) {
            return len - 2;
        }
        if len > 3 && matches!(s[len - 1], 'a' | 'e' | 'i' | 'o' | 'u' | 'y') {
            return len - 1;
        }
        len
    }

    fn remove_possessives(s: &[char]) -> usize {
        let len = s.len();
        if len > 5 && (ends_with(s, "ov") || ends_with(s, "in") || ends_with(s, "uv")) {
            return len - 2;
        }
        len
    }

    fn normalize(s: &mut Vec<char>) {
        let len = s.len();
        if ends_with(s, "ct") {
            s[len - 1] = 'k';
            return;
        }
        if ends_with(s, "st") {
            s[len - 2] = 's';
            s[len - 1] = 'k';
            return;
        }
        match s[len - 1] {
            'c' => s[len - 1] = 'k',
            'z' => s[len - 1] = 'h',
            _ if len > 1 && s[len - 2] == 'e' => {
                s[len - 2] = s[len - 1];
                s.truncate(len - 1);
            }
            _ => {}
        }
    }
}

impl Stem for CzechLightStemmer {
    fn stem(&self, word: &str) -> String {
        let mut s: Vec<char> = word.chars().collect();
        let len = Self::remove_case(&s);
        s.truncate(len);
        let len = Self::remove_possessives(&s);
        s.truncate(len);
        if !s.is_empty() {
            Self::normalize(&mut s);
        }
        s.into_iter().collect()
    }
}

fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// English pipeline: NFKC, lowercase, Snowball stemming.
pub struct EnglishPreprocessor {
    stop_words: StopWords,
    stemmer: Box<dyn Stem>,
}

impl EnglishPreprocessor {
    pub fn new(stop_words: StopWords) -> Self {
        Self::with_stemmer(stop_words, Box::new(SnowballStemmer::english()))
    }

    pub fn with_stemmer(stop_words: StopWords, stemmer: Box<dyn Stem>) -> Self {
        Self { stop_words, stemmer }
    }

    /// Uses the list at `path` when given, the bundled list otherwise.
    pub fn from_stopword_file(path: Option<&Path>) -> Self {
        Self::new(path.map(StopWords::load).unwrap_or_else(StopWords::english))
    }
}

impl Default for EnglishPreprocessor {
    fn default() -> Self { Self::new(StopWords::english()) }
}

impl Preprocessor for EnglishPreprocessor {
    fn tokenize(&self, text: &str) -> Vec<String> {
        spans(text)
            .filter(|span| !self.stop_words.contains(span))
            .map(|span| self.preprocess(span))
            .collect()
    }

    fn preprocess(&self, token: &str) -> String {
        let lowered = token.nfkc().collect::<String>().to_lowercase();
        if is_word(&lowered) { self.stemmer.stem(&lowered) } else { lowered }
    }

    fn is_stop_word(&self, word: &str) -> bool { self.stop_words.contains(word) }
}

/// Czech pipeline: lowercase, diacritics folded, light Czech stemming.
pub struct CzechPreprocessor {
    stop_words: StopWords,
    stemmer: Box<dyn Stem>,
}

impl CzechPreprocessor {
    pub fn new(stop_words: StopWords) -> Self {
        Self::with_stemmer(stop_words, Box::new(CzechLightStemmer))
    }

    pub fn with_stemmer(stop_words: StopWords, stemmer: Box<dyn Stem>) -> Self {
        Self { stop_words, stemmer }
    }

    pub fn from_stopword_file(path: Option<&Path>) -> Self {
        Self::new(path.map(StopWords::load).unwrap_or_else(StopWords::czech))
    }
}

impl Default for CzechPreprocessor {
    fn default() -> Self { Self::new(StopWords::czech()) }
}

impl Preprocessor for CzechPreprocessor {
    fn tokenize(&self, text: &str) -> Vec<String> {
        spans(text)
            .filter(|span| !self.stop_words.contains(span))
            .map(|span| self.preprocess(span))
            .collect()
    }

    fn preprocess(&self, token: &str) -> String {
        let folded = strip_diacritics(&token.to_lowercase());
        if is_word(&folded) { self.stemmer.stem(&folded) } else { folded }
    }

    fn is_stop_word(&self, word: &str) -> bool { self.stop_words.contains(word) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = EnglishPreprocessor::default().tokenize("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn spans_keep_numbers_times_and_urls_whole() {
        let got: Vec<&str> = spans("At 12:30 we paid 1,000.50 see https://example.com/a?b=1 now").collect();
        assert_eq!(got, vec!["At", "12:30", "we", "paid", "1,000.50", "see", "https://example.com/a?b=1", "now"]);
    }

    #[test]
    fn spans_drop_tags_and_keep_apostrophes_and_wildcards() {
        let got: Vec<&str> = spans("<p>don't comput*</p>").collect();
        assert_eq!(got, vec!["don't", "comput*"]);
    }

    #[test]
    fn stop_words_match_raw_span_exactly() {
        let p = EnglishPreprocessor::new(StopWords::from_list("the\n"));
        assert_eq!(p.tokenize("the cat"), vec!["cat"]);
        // Case-sensitive: a capitalized stop word survives and is then folded.
        assert_eq!(p.tokenize("The cat"), vec!["the", "cat"]);
    }

    #[test]
    fn missing_stop_word_file_is_not_fatal() {
        let p = EnglishPreprocessor::from_stopword_file(Some(Path::new("/definitely/not/here.txt")));
        assert!(!p.is_stop_word("the"));
        assert_eq!(p.tokenize("the"), vec!["the"]);
    }

    #[test]
    fn urls_are_not_stemmed() {
        let p = EnglishPreprocessor::default();
        assert_eq!(p.preprocess("HTTP://Example.com/Items"), "http://example.com/items");
    }

    #[test]
    fn query_tokens_normalize_like_documents() {
        let p = EnglishPreprocessor::default();
        let doc = p.tokenize("Connections");
        assert_eq!(doc, vec![p.preprocess("connection")]);
    }

    #[test]
    fn czech_folds_diacritics_and_stems() {
        let p = CzechPreprocessor::default();
        assert_eq!(p.preprocess("Žena"), p.preprocess("ženy"));
        assert!(p.tokenize("a že").is_empty());
        assert!(!p.preprocess("Město").contains('ě'));
    }

    #[test]
    fn czech_stemmer_strips_case_endings() {
        let s = CzechLightStemmer;
        assert_eq!(s.stem("hradech"), "hrad");
        assert_eq!(s.stem("mestech"), "mesk");
    }
}
