//! HTTP transport and document downloads.
//!
//! # Features
//!
//! - One shared client: browser headers, cookie jar, gzip, configurable timeouts
//! - Streaming downloads with a fixed-size write buffer
//! - Size-threshold idempotence: complete-looking files are not re-fetched
//! - Partial files are removed on any transport, IO or cancellation failure
//! - Per-host rate limiting
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use leecher_core::CancelFlag;
//! use leecher_core::download::{ClientConfig, HttpClient};
//! use reqwest::header::HeaderMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&ClientConfig::default())?;
//! let ok = client
//!     .download(
//!         "https://example.com/prova.pdf",
//!         Path::new("./provas/prova.pdf"),
//!         &HeaderMap::new(),
//!         &CancelFlag::new(),
//!     )
//!     .await;
//! println!("downloaded: {ok}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
pub mod rate_limiter;

pub use client::{ClientConfig, DownloadOutcome, HttpClient};
pub use error::DownloadError;
pub use rate_limiter::{RateLimiter, extract_host};
