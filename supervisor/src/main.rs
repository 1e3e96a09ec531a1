mod cache;
mod codec;
mod decoder;
mod engine;
mod retrieval;
mod scan;
mod selection;

use cache::CachePathResolver;
use clap::Parser;
use engine::{DifferenceEngine, EngineError};
use frame_delta_common::config::{Config, ConfigError};
use retrieval::{RetrievalEngine, RetrievalError};
use scan::ScanError;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Delta-encode a directory of frames against per-group inception frames.
#[derive(Parser, Debug)]
#[command(name = "frame-delta", version)]
struct Cli {
    /// Directory holding the frames.
    root: PathBuf,

    /// TOML config file. Built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a PNG of every retrieved difference into this directory.
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Store differences without reading them back.
    #[arg(long)]
    skip_retrieval: bool,
}

#[derive(Debug, thiserror::Error)]
enum SupervisorError {
    #[error("could not open directory {}: {source}", .path.display())]
    RootUnopenable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %cli.root.display(),
        cache_root = %config.cache.root.display(),
        "starting inter-frame supervisor"
    );

    if let Err(e) = run(&cli, &config) {
        error!(error = %e, "run aborted");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn run(cli: &Cli, config: &Config) -> Result<(), SupervisorError> {
    let root = validate_root(&cli.root)?;
    let limit = config.scan.entry_limit();

    let frames = scan::scan(&root, config.scan.recursive, limit)?;
    let report = DifferenceEngine::from_config(config)?.run(&frames)?;
    info!(
        frames = report.frames_visited,
        groups = report.groups,
        artifacts = report.artifacts.len(),
        "difference pass finished"
    );

    if cli.skip_retrieval {
        return Ok(());
    }
    if !config.cache.root.is_dir() {
        info!(cache_root = %config.cache.root.display(), "no differences stored, nothing to retrieve");
        return Ok(());
    }

    let artifacts = scan::scan_artifacts(&config.cache.root)?;
    let mut retrieval = RetrievalEngine::new(CachePathResolver::new(config.cache.clone()));
    if let Some(dir) = &cli.preview_dir {
        retrieval = retrieval.with_preview_dir(dir);
    }

    for item in retrieval.run(&artifacts)? {
        info!(
            artifact = %item.artifact_path.display(),
            inception = %item.inception_path.display(),
            size = format!("{}x{}", item.inception.width(), item.inception.height()),
            peak = item.difference.peak(),
            "difference available"
        );
    }
    Ok(())
}

/// The frame directory must exist and be a directory; returns its canonical path.
fn validate_root(path: &Path) -> Result<PathBuf, SupervisorError> {
    let canonical = path
        .canonicalize()
        .map_err(|source| SupervisorError::RootUnopenable {
            path: path.to_path_buf(),
            source,
        })?;
    if !canonical.is_dir() {
        return Err(SupervisorError::NotADirectory(canonical));
    }
    Ok(canonical)
}
