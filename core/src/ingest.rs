use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// News article as stored on disk. `title` and `article` are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub article: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>, article: impl Into<String>) -> Self {
        Self { title: title.into(), article: article.into(), author: None, datetime: None, subject: None, url: None }
    }

    /// The text that gets indexed: title and body separated by a space.
    pub fn indexable_text(&self) -> String { format!("{} {}", self.title, self.article) }
}

fn is_article_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("json" | "jsonl"))
}

/// `.json`/`.jsonl` files under `input` (or `input` itself), sorted by path.
pub fn collect_article_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("input path {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_article_file(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Reads every article stored in `file`, each keyed by the path it will be
/// indexed under. A `.json` file holds one object (keyed by the file path)
/// or an array; a `.jsonl` file holds one object per line. Array and line
/// entries are keyed `path#n`.
pub fn read_articles(file: &Path) -> Result<Vec<(String, ArticleRecord)>> {
    let base = file.display().to_string();
    let f = File::open(file).with_context(|| format!("opening {base}"))?;
    let reader = BufReader::new(f);

    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut out = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading {base}"))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ArticleRecord =
                serde_json::from_str(&line).with_context(|| format!("parsing {base} line {}", n + 1))?;
            out.push((format!("{base}#{n}"), record));
        }
        return Ok(out);
    }

    let json: serde_json::Value = serde_json::from_reader(reader).with_context(|| format!("parsing {base}"))?;
    match json {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(n, v)| {
                let record: ArticleRecord =
                    serde_json::from_value(v).with_context(|| format!("parsing {base} entry {n}"))?;
                Ok((format!("{base}#{n}"), record))
            })
            .collect(),
        value @ serde_json::Value::Object(_) => {
            let record: ArticleRecord = serde_json::from_value(value).with_context(|| format!("parsing {base}"))?;
            Ok(vec![(base, record)])
        }
        _ => anyhow::bail!("{base} is neither a JSON object nor an array"),
    }
}

/// Loads the article an index key points at, as produced by [`read_articles`].
pub fn load_article(key: &str) -> Result<ArticleRecord> {
    let (file, entry) = match key.rsplit_once('#') {
        Some((file, n)) if n.parse::<usize>().is_ok() => (file, Some(key)),
        _ => (key, None),
    };
    let wanted = entry.unwrap_or(file);
    read_articles(Path::new(file))?
        .into_iter()
        .find(|(k, _)| k == wanted)
        .map(|(_, record)| record)
        .with_context(|| format!("no article stored under {key}"))
}
