//! CLI entry point for the leecher tool.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use leecher_core::auth::{EMAIL_ENV, PASSWORD_ENV};
use leecher_core::config::load_file_config;
use leecher_core::{
    CancelFlag, Crawler, Credentials, HttpClient, Orchestrator, PciCrawler, QConcursosCrawler,
    SiteUrls,
};
use tracing::{debug, info, warn};

mod cli;
mod progress;

use cli::{Args, Site};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_file_config(args.config.as_deref())?;

    init_logging(&args.log_file(&file_config), args.quiet, args.verbose)?;
    debug!(?args, ?file_config, "configuration resolved");
    info!("leecher starting");

    let client = HttpClient::new(&Args::client_config(&file_config))?;
    let crawler = build_crawler(args.site(), client, args.base_url.as_deref()).await?;

    let plan = args.plan(&file_config);
    let query = args.query(plan.max_pages);

    let cancel = CancelFlag::new();
    spawn_interrupt_handler(cancel.clone());

    let site = crawler.name();
    let orchestrator = Orchestrator::new(crawler, plan, cancel);
    let use_spinner = !args.quiet && std::io::stderr().is_terminal();
    let (spinner, stop) = progress::spawn_progress_ui(use_spinner, site, orchestrator.stats());

    let summary = match &query {
        Some(query) => orchestrator.run_query(query).await,
        None => orchestrator.run().await,
    };

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }

    println!("{summary}");
    Ok(())
}

/// Installs the file logger.
///
/// Priority: `RUST_LOG` env var > quiet flag > verbose flag > default (info)
fn init_logging(path: &Path, quiet: bool, verbose: u8) -> Result<()> {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

async fn build_crawler(
    site: Site,
    client: HttpClient,
    base_url: Option<&str>,
) -> Result<Arc<dyn Crawler>> {
    let urls = SiteUrls::default();
    match site {
        Site::Pci => {
            let crawler = PciCrawler::new(client, base_url.unwrap_or(&urls.pci))?;
            Ok(Arc::new(crawler))
        }
        Site::Qconcursos => {
            let crawler = QConcursosCrawler::new(client, base_url.unwrap_or(&urls.qconcursos))?;
            let credentials = Credentials::from_env().ok_or_else(|| {
                anyhow!("qconcursos needs credentials: set {EMAIL_ENV} and {PASSWORD_ENV}")
            })?;
            if !crawler.login(&credentials).await {
                bail!("qconcursos login failed, see the log file for details");
            }
            info!("qconcursos session established");
            Ok(Arc::new(crawler))
        }
    }
}

fn spawn_interrupt_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, finishing current downloads");
                cancel.cancel();
            }
            Err(error) => warn!(error = %error, "failed to listen for interrupt"),
        }
    });
}
