//! Constants for the download module (timeouts, rate limiting, completeness).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// A file strictly larger than this is treated as already downloaded.
///
/// Only detects empty or truncated leftovers; it is not an integrity check.
pub const MIN_COMPLETE_BYTES: u64 = 1024;

/// Write buffer size used while streaming a body to disk.
pub const CHUNK_SIZE: usize = 8192;

/// Default delay between two requests to the same host.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(500);

/// Warning threshold for cumulative rate limit delay per host (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);
