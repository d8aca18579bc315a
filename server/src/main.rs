use anyhow::Result;
use axum::Router;
use clap::Parser;
use parking_lot::RwLock;
use quarry_core::catalog::{DetectLanguage, FixedLanguage, Language, StopWordDetector};
use quarry_core::ingest::collect_article_files;
use quarry_core::{BatchIndexer, Catalog, EngineConfig};
use server::{build_app, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Articles (file or directory) to index before serving
    #[arg(long)]
    input: Option<PathBuf>,
    /// Language of the preloaded articles, or `auto`
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
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

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
    let catalog = Arc::new(RwLock::new(Catalog::new(config)));

    if let Some(input) = &args.input {
        let detector: Arc<dyn DetectLanguage> = match args.language.as_str() {
            "auto" => Arc::new(StopWordDetector::default()),
            other => Arc::new(FixedLanguage(other.parse::<Language>().map_err(anyhow::Error::msg)?)),
        };
        let files = collect_article_files(input)?;
        let indexer = BatchIndexer::new(catalog.clone(), detector);
        let report = tokio::task::spawn_blocking(move || indexer.run(&files)).await?;
        tracing::info!(indexed = report.indexed, failed = report.failed, "preload complete");
    }

    let app: Router = build_app(AppState::from_env(catalog));
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
