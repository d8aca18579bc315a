use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use parking_lot::RwLock;
use quarry_core::catalog::{DetectLanguage, FixedLanguage, Language, StopWordDetector};
use quarry_core::ingest::{collect_article_files, load_article};
use quarry_core::query::Grammar;
use quarry_core::search::{search, Ranking, SearchOutcome};
use quarry_core::{BatchIndexer, Catalog, EngineConfig};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load JSON articles into in-memory indexes and run boolean queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LoadArgs {
    /// Input path (file or directory of .json/.jsonl articles)
    #[arg(long)]
    input: PathBuf,
    /// Language of the input, or `auto` to detect it per article
    #[arg(long, default_value = "auto")]
    language: String,
    /// Engine settings as JSON
    #[arg(long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,
    /// English stop-word list (one word per line)
    #[arg(long, env = "QUARRY_STOPWORDS_EN")]
    english_stopwords: Option<PathBuf>,
    /// Czech stop-word list (one word per line)
    #[arg(long, env = "QUARRY_STOPWORDS_CS")]
    czech_stopwords: Option<PathBuf>,
}

#[derive(Args)]
struct SearchArgs {
    /// Index to query
    #[arg(long, default_value = "en")]
    lang: Language,
    /// Query grammar: infix or prefix
    #[arg(long, default_value = "prefix")]
    grammar: Grammar,
    /// Ranking: none, tfidf or cosine (defaults to the configured one)
    #[arg(long)]
    ranking: Option<Ranking>,
    /// Number of hits to print (clamped to 1..=100)
    #[arg(long)]
    k: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the input and print per-language statistics
    Stats {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Index the input and run one query
    Query {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// The query text
        #[arg(long)]
        q: String,
        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Index the input and read queries from stdin, one per line
    Shell {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Serialize)]
struct QueryReport<'a> {
    query: &'a str,
    language: Language,
    grammar: Grammar,
    ranking: Ranking,
    #[serde(flatten)]
    outcome: &'a SearchOutcome,
    paths: Vec<&'a str>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { load } => {
            let catalog = load_catalog(&load)?;
            println!("{}", serde_json::to_string_pretty(&catalog.stats())?);
            Ok(())
        }
        Commands::Query { load, search, q, json } => {
            let catalog = load_catalog(&load)?;
            run_query(&catalog, &search, &q, json)
        }
        Commands::Shell { load, search } => {
            let catalog = load_catalog(&load)?;
            shell(&catalog, search)
        }
    }
}

fn load_catalog(args: &LoadArgs) -> Result<Catalog> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if args.english_stopwords.is_some() {
        config.english_stopwords = args.english_stopwords.clone();
    }
    if args.czech_stopwords.is_some() {
        config.czech_stopwords = args.czech_stopwords.clone();
    }
    let detector: Arc<dyn DetectLanguage> = match args.language.as_str() {
        "auto" => Arc::new(StopWordDetector::default()),
        other => Arc::new(FixedLanguage(other.parse::<Language>().map_err(anyhow::Error::msg)?)),
    };

    let files = collect_article_files(&args.input)?;
    tracing::info!(files = files.len(), input = %args.input.display(), "loading articles");
    let catalog = Arc::new(RwLock::new(Catalog::new(config)));
    let report = BatchIndexer::new(catalog.clone(), detector).run(&files);
    if report.indexed == 0 {
        tracing::warn!(failed = report.failed, unsupported = report.unsupported, "no documents were indexed");
    }
    Arc::try_unwrap(catalog)
        .map(RwLock::into_inner)
        .map_err(|_| anyhow::anyhow!("catalog is still shared after loading"))
}

fn run_query(catalog: &Catalog, args: &SearchArgs, q: &str, json: bool) -> Result<()> {
    let index = catalog
        .index(args.lang)
        .with_context(|| format!("There are no files indexed in the {} language", args.lang))?;
    let ranking = args.ranking.unwrap_or(catalog.config().ranking);
    let k = catalog.config().clamp_top_k(args.k);
    let outcome = search(index, q, args.grammar, ranking, Some(k)).map_err(|err| anyhow::anyhow!("{q}: {err}"))?;
    let paths: Vec<&str> = outcome.hits.iter().map(|h| index.file_path(h.doc_id).unwrap_or("?")).collect();

    if json {
        let report = QueryReport { query: q, language: args.lang, grammar: args.grammar, ranking, outcome: &outcome, paths };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{} hits in {:.4}s (showing {})", outcome.total_hits, outcome.took_s, outcome.hits.len());
    for (rank, (hit, path)) in outcome.hits.iter().zip(&paths).enumerate() {
        let title = load_article(path).map(|a| a.title).unwrap_or_default();
        println!("{:>3}. [{:>5}] {:.4}  {}  {}", rank + 1, hit.doc_id, hit.score, title, path);
    }
    Ok(())
}

fn shell(catalog: &Catalog, mut args: SearchArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout();
    write!(out, "> ")?;
    out.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => {}
            (":quit" | ":q", _) => break,
            (":grammar", value) => match value.parse() {
                Ok(g) => args.grammar = g,
                Err(e) => eprintln!("{e}"),
            },
            (":ranking", value) => match value.parse() {
                Ok(r) => args.ranking = Some(r),
                Err(e) => eprintln!("{e}"),
            },
            (":lang", value) => match value.parse() {
                Ok(l) => args.lang = l,
                Err(e) => eprintln!("{e}"),
            },
            (":k", value) => match value.parse() {
                Ok(k) => args.k = Some(k),
                Err(e) => eprintln!("{e}"),
            },
            (":stats", _) => println!("{}", serde_json::to_string_pretty(&catalog.stats())?),
            _ => {
                if let Err(err) = run_query(catalog, &args, line, false) {
                    eprintln!("{err:#}");
                }
            }
        }
        write!(out, "> ")?;
        out.flush()?;
    }
    Ok(())
}
