//! Error types for fetching search result pages.

use thiserror::Error;

/// Errors that end pagination for a query.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connection refused, TLS, reset).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// Page URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the client timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// Page URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Page URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response envelope could not be decoded.
    #[error("could not decode page from {source_name}: {message}")]
    Decode {
        /// Name of the page source.
        source_name: &'static str,
        /// Decoder message.
        message: String,
    },
}

impl FetchError {
    /// Classifies a client error, separating timeouts from other network failures.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn decode(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            source_name,
            message: message.into(),
        }
    }
}
