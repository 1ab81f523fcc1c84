use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use lexicon_db::{Engine, Interner, LoadMode, SourceDescriptor};
use lexicon_server::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_SOURCES: &str = "sources.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!(
        "using sources from {} (mode: {:?})",
        config.sources_path.display(),
        config.load_mode
    );

    let descriptors = read_descriptors(&config.sources_path)?;
    let engine = Arc::new(Engine::new(Arc::new(Interner::new()), config.load_mode));

    let start = Instant::now();
    let reports = engine.load_all(descriptors).await;
    for report in reports.iter().filter(|r| r.outcome.is_failure()) {
        warn!("source `{}` is only partially available", report.source);
    }
    info!(
        "{} sources loaded in {} ms ({} interned strings)",
        reports.len(),
        start.elapsed().as_millis(),
        engine.interner().len()
    );

    let state = AppState { engine };
    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    sources_path: PathBuf,
    load_mode: LoadMode,
}

fn load_config() -> Config {
    let mut cli_sources: Option<PathBuf> = None;
    let mut cli_load_mode: Option<LoadMode> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--sources" => {
                if let Some(path) = args.next() {
                    cli_sources = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--sources=") {
                    cli_sources = Some(PathBuf::from(path));
                } else if let Some(mode) = arg.strip_prefix("--load-mode=") {
                    cli_load_mode = LoadMode::parse(mode);
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let sources_path = cli_sources
        .or_else(|| env::var("LEXICON_SOURCES").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCES));
    let load_mode = cli_load_mode
        .or_else(|| {
            env::var("LEXICON_LOAD_MODE")
                .ok()
                .as_deref()
                .and_then(LoadMode::parse)
        })
        .unwrap_or_default();

    Config {
        host,
        port,
        sources_path,
        load_mode,
    }
}

/// Source list as a JSON array of descriptors. A missing file means no sources.
fn read_descriptors(path: &Path) -> anyhow::Result<Vec<SourceDescriptor>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("no source list at {}; serving nothing", path.display());
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", path.display()));
        }
    };
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
