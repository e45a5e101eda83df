//! mangapack - repack Mox.moe EPUB manga into CBZ

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use mangapack::batch::{Converter, LogReporter};
use mangapack::{Config, Settings};

#[derive(Parser)]
#[command(name = "mangapack")]
#[command(version, about = "Repack Vol.moe / Mox.moe / Kox.moe EPUB manga into CBZ", long_about = None)]
#[command(after_help = "EXAMPLES:
    mangapack                         Convert every .epub under the current directory
    mangapack ~/manga -o ~/cbz        Convert ~/manga into ~/cbz
    mangapack -e unsorted --json      Skip 'unsorted' folders, print a JSON report")]
struct Cli {
    /// Directory searched for .epub files [default: current directory]
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output root [default: INPUT/output]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Working directory for extraction [default: INPUT/cache]
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,

    /// Config file [default: ./mangapack.toml if present]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip directories with this name (repeatable)
    #[arg(short, long, value_name = "NAME")]
    exclude: Vec<String>,

    /// Keep the cache directory after a successful run
    #[arg(long)]
    keep_cache: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every page rename
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("input:  {}", settings.input_dir.display());
    tracing::info!("output: {}", settings.output_dir.display());

    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    let mut batch = tokio::task::spawn_blocking(move || {
        let converter = Converter::new(settings);
        let archives = converter.discover()?;
        converter.run(&archives, &LogReporter, &worker_cancel)
    });

    let outcome = tokio::select! {
        joined = &mut batch => joined,
        () = shutdown_signal() => {
            cancel.store(true, Ordering::SeqCst);
            eprintln!("interrupted: converted files and the cache folder are kept on disk");
            batch.await
        }
    };

    match outcome {
        Ok(Ok(report)) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: conversion worker failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout is reserved for the `--json` report.
fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "mangapack=debug"
    } else if cli.quiet {
        "mangapack=warn"
    } else {
        "mangapack=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Config file values, overridden by command-line flags.
fn load_settings(cli: &Cli) -> mangapack::Result<Settings> {
    let cwd = std::env::current_dir()?;
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default(&cwd)?,
    };

    if let Some(input) = &cli.input {
        config.input_dir = Some(input.clone());
    }
    if let Some(output) = &cli.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(cache) = &cli.cache {
        config.cache_dir = Some(cache.clone());
    }
    config.exclude.extend(cli.exclude.iter().cloned());
    config.keep_cache |= cli.keep_cache;

    config.resolve(&cwd)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
