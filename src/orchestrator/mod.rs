//! Bulk orchestration: years × terms → search → dedup → place → download → index.
//!
//! The orchestrator owns the run's shared state (dedup scope, counters,
//! rate limiter, contest locks) and drives a [`Crawler`]. It never returns an
//! error: per-page and per-item failures are logged and counted, and the run
//! ends with a [`CrawlSummary`] when the plan is exhausted, the query cap is
//! reached or cancellation is observed.
//!
//! Downloads run on a worker pool bounded by [`CrawlPlan::concurrency`]; with
//! the default of one worker the run is fully sequential.

mod cancel;
mod plan;
mod stats;

pub use cancel::CancelFlag;
pub use plan::{
    CrawlPlan, DEFAULT_CONCURRENCY, DEFAULT_MAX_PAGES, DEFAULT_TERM_DELAY, DEFAULT_TERMS,
    FUTURE_YEARS, MIN_YEAR, YearRange, latest_supported_year,
};
pub use stats::{CrawlStats, CrawlSummary};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::DedupSet;
use crate::crawler::Crawler;
use crate::download::RateLimiter;
use crate::model::{ResultItem, SearchQuery};
use crate::organize::{ContestLocks, place, record_index};

/// Drives one crawler through a [`CrawlPlan`].
pub struct Orchestrator {
    crawler: Arc<dyn Crawler>,
    plan: CrawlPlan,
    cancel: CancelFlag,
    stats: Arc<CrawlStats>,
    rate_limiter: Arc<RateLimiter>,
    locks: Arc<ContestLocks>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("crawler", &self.crawler.name())
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// State cloned into each download task.
#[derive(Clone)]
struct Worker {
    crawler: Arc<dyn Crawler>,
    output_dir: PathBuf,
    cancel: CancelFlag,
    stats: Arc<CrawlStats>,
    rate_limiter: Arc<RateLimiter>,
    locks: Arc<ContestLocks>,
}

impl Orchestrator {
    /// Creates an orchestrator; `cancel` is shared with whoever may stop the run.
    #[must_use]
    pub fn new(crawler: Arc<dyn Crawler>, plan: CrawlPlan, cancel: CancelFlag) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(plan.item_delay));
        Self {
            crawler,
            plan,
            cancel,
            stats: Arc::new(CrawlStats::new()),
            rate_limiter,
            locks: Arc::new(ContestLocks::new()),
        }
    }

    /// Live counters, for progress reporting while a run is in flight.
    #[must_use]
    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    /// The plan this orchestrator executes.
    #[must_use]
    pub fn plan(&self) -> &CrawlPlan {
        &self.plan
    }

    /// Runs every `(year, term)` pair of the plan, newest year first.
    ///
    /// Dedup is scoped to one year: the same document found by two terms of
    /// the same year is downloaded once.
    #[instrument(skip(self), fields(
        site = self.crawler.name(),
        newest = self.plan.years.newest(),
        oldest = self.plan.years.oldest(),
        terms = self.plan.terms.len(),
        board = self.plan.board.as_deref()
    ))]
    pub async fn run(&self) -> CrawlSummary {
        if !self.ensure_ready() {
            return self.finish();
        }
        info!("bulk crawl started");

        let mut queries = 0usize;
        'years: for year in self.plan.years.iter() {
            let mut seen = DedupSet::new();
            info!(year, "processing year");

            for term in &self.plan.terms {
                if self.cancel.is_cancelled() {
                    info!("cancellation observed, stopping crawl");
                    break 'years;
                }
                if self.plan.max_queries.is_some_and(|cap| queries >= cap) {
                    info!(queries, "query cap reached, stopping crawl");
                    break 'years;
                }
                queries += 1;

                let mut query = SearchQuery::new(term.as_str(), self.plan.max_pages)
                    .with_year(year.to_string());
                if let Some(board) = &self.plan.board {
                    query = query.with_board(board.as_str());
                }
                let found = self.discover(&query).await;
                let fresh = self.dedup(&mut seen, found);
                self.process(fresh).await;

                if !self.plan.term_delay.is_zero() && !self.cancel.sleep(self.plan.term_delay).await
                {
                    break 'years;
                }
            }
        }

        self.finish()
    }

    /// Runs a single query: one search (plus answer keys when planned),
    /// deduplicated and downloaded into the usual layout.
    #[instrument(skip(self), fields(site = self.crawler.name(), term = %query.term))]
    pub async fn run_query(&self, query: &SearchQuery) -> CrawlSummary {
        if !self.ensure_ready() {
            return self.finish();
        }
        let found = self.discover(query).await;
        let fresh = self.dedup(&mut DedupSet::new(), found);
        self.process(fresh).await;
        self.finish()
    }

    fn ensure_ready(&self) -> bool {
        if self.crawler.requires_session() && !self.crawler.is_ready() {
            error!(
                site = self.crawler.name(),
                "site requires a session and none is active, refusing to crawl"
            );
            return false;
        }
        true
    }

    fn finish(&self) -> CrawlSummary {
        let summary = self.stats.summary(self.cancel.is_cancelled());
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            duplicates = summary.duplicates_skipped,
            cancelled = summary.cancelled,
            "crawl finished"
        );
        summary
    }

    /// Exam and answer-key searches run concurrently; exams come first in the
    /// merged list so they win dedup ties.
    async fn discover(&self, query: &SearchQuery) -> Vec<ResultItem> {
        let exams = self.crawler.search(query, &self.cancel);
        let keys = async {
            if self.plan.include_answer_keys {
                self.crawler.search_answer_keys(query, &self.cancel).await
            } else {
                Ok(Vec::new())
            }
        };
        let (exams, keys) = tokio::join!(exams, keys);

        let mut merged = Vec::new();
        for (label, result) in [("exams", exams), ("answer keys", keys)] {
            match result {
                Ok(items) => merged.extend(items),
                Err(error) => warn!(error = %error, kind = label, "search failed"),
            }
        }
        debug!(found = merged.len(), "discovery finished");
        merged
    }

    /// Drops already-seen items, then adds companion answer keys of the
    /// survivors.
    fn dedup(&self, seen: &mut DedupSet, found: Vec<ResultItem>) -> Vec<ResultItem> {
        let total = found.len();
        let fresh = seen.retain_new(found);
        let skipped = total - fresh.len();
        if skipped > 0 {
            debug!(skipped, "dropped duplicates");
            self.stats.add_duplicates(skipped);
        }
        fresh
            .into_iter()
            .flat_map(|item| {
                let key = item.companion_answer_key();
                std::iter::once(item).chain(key)
            })
            .collect()
    }

    async fn process(&self, items: Vec<ResultItem>) {
        if items.is_empty() {
            return;
        }

        let mut by_board: BTreeMap<String, Vec<ResultItem>> = BTreeMap::new();
        for item in items {
            by_board
                .entry(item.examining_board.clone())
                .or_default()
                .push(item);
        }

        let semaphore = Arc::new(Semaphore::new(self.plan.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let worker = self.worker();

        'boards: for (board, items) in by_board {
            info!(board = %board, count = items.len(), "processing board");
            for item in items {
                if self.cancel.is_cancelled() {
                    break 'boards;
                }
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break 'boards;
                };
                if self.cancel.is_cancelled() {
                    break 'boards;
                }
                let worker = worker.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    worker.process_item(item).await;
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "download task panicked");
            }
        }
    }

    fn worker(&self) -> Worker {
        Worker {
            crawler: Arc::clone(&self.crawler),
            output_dir: self.plan.output_dir.clone(),
            cancel: self.cancel.clone(),
            stats: Arc::clone(&self.stats),
            rate_limiter: Arc::clone(&self.rate_limiter),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl Worker {
    /// place → rate limit → download → index. Failures count, never propagate.
    async fn process_item(&self, item: ResultItem) {
        let destination = match place(&item, &self.output_dir).await {
            Ok(destination) => destination,
            Err(error) => {
                warn!(error = %error, name = %item.display_name, "cannot prepare destination");
                self.stats.increment_attempted();
                self.stats.increment_failed();
                return;
            }
        };
        let file_path = destination.file_path(&item);

        self.rate_limiter.acquire(&item.remote_url).await;
        if self.cancel.is_cancelled() {
            return;
        }

        self.stats.increment_attempted();
        debug!(kind = %item.kind, name = %item.display_name, url = %item.remote_url, "downloading");
        if !self
            .crawler
            .download(&item, &file_path, &self.cancel)
            .await
        {
            self.stats.increment_failed();
            return;
        }

        let lock = self.locks.lock_for(destination.contest_dir());
        let _guard = lock.lock().await;
        match record_index(destination.contest_dir(), &item).await {
            Ok(()) => {
                self.stats.increment_succeeded();
                info!(path = %file_path.display(), "document stored");
            }
            Err(error) => {
                warn!(error = %error, "downloaded but could not be indexed");
                self.stats.increment_failed();
            }
        }
    }
}
