//! Crawler-level errors.

use thiserror::Error;

/// Errors a crawler raises instead of returning partial results.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The site requires a session and no login has succeeded.
    #[error("{site} requires a successful login before searching")]
    NotAuthenticated {
        /// Crawler name.
        site: &'static str,
    },

    /// The configured base URL cannot be parsed.
    #[error("invalid base URL for {site}: {url}")]
    InvalidBaseUrl {
        /// Crawler name.
        site: &'static str,
        /// Rejected value.
        url: String,
    },
}
