//! Progress UI (spinner) for crawl runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use leecher_core::CrawlStats;

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    site: &'static str,
    stats: Arc<CrawlStats>,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(site, stats, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_spinner_inner(
    site: &'static str,
    stats: Arc<CrawlStats>,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            spinner.set_message(status_line(site, &stats));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}

fn status_line(site: &str, stats: &CrawlStats) -> String {
    let mut line = format!(
        "[{}/{}] Downloading from {site}...",
        stats.succeeded(),
        stats.attempted()
    );
    if stats.failed() > 0 {
        line.push_str(&format!(" {} failed", stats.failed()));
    }
    line
}
