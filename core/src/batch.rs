//! Background indexing. One worker thread takes the write lock per document,
//! so searches can interleave between documents, and checks a cancel flag
//! before each one. Documents indexed before cancellation stay indexed.

use crate::catalog::{Catalog, DetectLanguage};
use crate::ingest::{read_articles, ArticleRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

pub type SharedCatalog = Arc<RwLock<Catalog>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Documents looked at, including skipped ones.
    pub processed: usize,
    pub indexed: usize,
    pub duplicates: usize,
    /// Files or entries that could not be read or parsed.
    pub failed: usize,
    pub unsupported: usize,
    pub cancelled: bool,
    pub took_s: f64,
}

pub struct BatchIndexer {
    catalog: SharedCatalog,
    detector: Arc<dyn DetectLanguage>,
    cancel: Arc<AtomicBool>,
}

impl BatchIndexer {
    pub fn new(catalog: SharedCatalog, detector: Arc<dyn DetectLanguage>) -> Self {
        Self { catalog, detector, cancel: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag that stops the batch before its next document once set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> { self.cancel.clone() }

    /// Reads and indexes every file in order. Unreadable files are counted
    /// as failed and skipped.
    pub fn run(&self, files: &[PathBuf]) -> BatchReport {
        let entries = files.iter().flat_map(|file| match read_articles(file) {
            Ok(records) => records.into_iter().map(Ok::<_, anyhow::Error>).collect::<Vec<_>>(),
            Err(err) => vec![Err(err.context(format!("skipping {}", file.display())))],
        });
        self.run_with(entries)
    }

    pub fn run_with<I>(&self, entries: I) -> BatchReport
    where
        I: IntoIterator<Item = anyhow::Result<(String, ArticleRecord)>>,
    {
        let start = Instant::now();
        let mut report = BatchReport::default();

        for entry in entries {
            if self.cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                tracing::info!(processed = report.processed, "batch cancelled");
                break;
            }
            report.processed += 1;
            let (path, record) = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %format!("{err:#}"), "could not load document");
                    report.failed += 1;
                    continue;
                }
            };
            let text = record.indexable_text();
            let Some(language) = self.detector.detect(&text) else {
                tracing::warn!(%path, "language of document is not supported");
                report.unsupported += 1;
                continue;
            };
            let fresh = self.catalog.write().index_article(language, &record, &path);
            if fresh {
                report.indexed += 1;
            } else {
                tracing::debug!(%path, %language, "skipping duplicate document");
                report.duplicates += 1;
            }
        }

        report.took_s = start.elapsed().as_secs_f64();
        tracing::info!(
            processed = report.processed,
            indexed = report.indexed,
            duplicates = report.duplicates,
            failed = report.failed,
            unsupported = report.unsupported,
            took_s = report.took_s,
            "batch finished"
        );
        report
    }

    /// Runs the batch on its own thread.
    pub fn spawn(self, files: Vec<PathBuf>) -> BatchHandle {
        let cancel = self.cancel_handle();
        let thread = std::thread::spawn(move || self.run(&files));
        BatchHandle { cancel, thread }
    }
}

pub struct BatchHandle {
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub fn cancel(&self) { self.cancel.store(true, Ordering::Relaxed); }

    pub fn join(self) -> anyhow::Result<BatchReport> {
        self.thread.join().map_err(|_| anyhow::anyhow!("batch indexing thread panicked"))
    }
}
