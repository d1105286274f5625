//! Per-host rate limiting for document downloads.
//!
//! The limiter enforces a minimum delay between two requests to the same host,
//! standing in for the fixed pause the archives expect between downloads.
//! Requests to different hosts never wait for each other, so documents served
//! from a CDN do not slow down those served by the archive itself.
//!
//! Every host also tracks the total delay it has been given. Once that total
//! crosses [`CUMULATIVE_DELAY_WARNING_THRESHOLD`] a single `warn!` is emitted,
//! which usually means the configured delay is too large for the run.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use leecher_core::download::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_millis(500)));
//!
//! // First request proceeds immediately
//! limiter.acquire("https://www.pciconcursos.com.br/provas/ti/1/").await;
//!
//! // Second request to the same host waits for the delay
//! limiter.acquire("https://www.pciconcursos.com.br/provas/ti/2/").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::CUMULATIVE_DELAY_WARNING_THRESHOLD;

/// Per-host rate limiter, shared across download workers behind an `Arc`.
///
/// `DashMap` holds one state per host; the state's `tokio::sync::Mutex`
/// makes the check-sleep-update sequence atomic for that host, so two workers
/// racing for the same host are spaced by the full delay.
///
/// # Usage Pattern
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use leecher_core::download::RateLimiter;
///
/// # async fn example() {
/// let limiter = Arc::new(RateLimiter::new(Duration::from_millis(500)));
///
/// let worker_limiter = Arc::clone(&limiter);
/// tokio::spawn(async move {
///     worker_limiter
///         .acquire("https://arquivos.pciconcursos.com.br/provas/1.pdf")
///         .await;
///     // ... download
/// });
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests to the same host.
    default_delay: Duration,
    /// Set for a zero delay (`--rate-limit-ms 0`); `acquire` returns at once.
    disabled: bool,
    /// Arc lets the `DashMap` shard lock be released before awaiting the
    /// inner mutex.
    hosts: DashMap<String, Arc<HostState>>,
}

/// Timing state for one host.
#[derive(Debug)]
struct HostState {
    /// `None` until the first request, which is never delayed.
    last_request: Mutex<Option<Instant>>,
    /// Total delay applied to this host so far, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Adds `delay` to the running total and returns the new total.
    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}

impl RateLimiter {
    /// Creates a limiter enforcing `default_delay` between same-host requests.
    ///
    /// A zero delay yields a [disabled](Self::disabled) limiter.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use leecher_core::download::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(Duration::from_millis(500));
    /// assert!(!limiter.is_disabled());
    /// assert!(RateLimiter::new(Duration::ZERO).is_disabled());
    /// ```
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = default_delay.as_millis()))]
    pub fn new(default_delay: Duration) -> Self {
        if default_delay.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            default_delay,
            disabled: false,
            hosts: DashMap::new(),
        }
    }

    /// Creates a limiter that never delays and keeps no per-host state.
    ///
    /// ```
    /// use std::time::Duration;
    /// use leecher_core::download::RateLimiter;
    ///
    /// let limiter = RateLimiter::disabled();
    /// assert_eq!(limiter.default_delay(), Duration::ZERO);
    /// ```
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            default_delay: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the delay between same-host requests.
    #[must_use]
    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Waits until a request to `url`'s host is allowed, then records it.
    ///
    /// 1. The host is extracted from `url` (see [`extract_host`]).
    /// 2. If the previous request to that host is more recent than the
    ///    delay, the call sleeps for the remainder.
    /// 3. The host's last-request time is set to now.
    ///
    /// The first request to any host proceeds immediately. The host lock is
    /// held across the sleep, so concurrent callers queue up in turn.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.disabled {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut last_request = state.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.default_delay {
                let delay = self.default_delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);

                debug!(
                    host = %host,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying rate limit delay"
                );
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(delay) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "rate limiting has added significant delay for this host"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

/// Extracts the lowercase host of a URL, or `"unknown"` if it has none.
///
/// Malformed URLs still share one bucket so they are rate limited too.
///
/// ```
/// use leecher_core::download::extract_host;
///
/// assert_eq!(extract_host("https://WWW.QConcursos.com/api"), "www.qconcursos.com");
/// assert_eq!(extract_host("http://localhost:8080/x"), "localhost");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
