//! Login failure reasons.

use thiserror::Error;

/// Errors raised by the login flow.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The login page or sign-in endpoint could not be reached.
    #[error("network error during login at {url}: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// A login step answered with an unexpected status.
    #[error("login step {url} answered HTTP {status}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The login page carried no CSRF token.
    #[error("no CSRF token found on {url}")]
    MissingCsrfToken {
        /// Login page URL.
        url: String,
    },
}

impl LoginError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }
}
