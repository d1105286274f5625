//! Leecher Core Library
//!
//! This library crawls public-exam archives, deduplicates what it finds and
//! downloads the documents into a per-contest folder tree.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Result parsing for HTML listings and JSON search responses
//! - [`search`] - Paginated search loop shared by every site
//! - [`auth`] - Login flow and session headers for authenticated sites
//! - [`aggregate`] - Cross-search deduplication
//! - [`organize`] - Board/institution/year folder layout and contest index files
//! - [`download`] - Streaming, resumable downloads with per-host rate limiting
//! - [`crawler`] - Site crawlers combining the above
//! - [`orchestrator`] - Bulk years × terms runs with cancellation
//! - [`config`] - Optional config file for crawl defaults

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod crawler;
pub mod download;
pub mod model;
pub mod orchestrator;
pub mod organize;
pub mod parser;
pub mod search;
mod user_agent;

// Re-export commonly used types
pub use aggregate::{DedupSet, aggregate};
pub use auth::{Credentials, LoginError, Session, SessionStore};
pub use crawler::{CrawlError, Crawler, PciCrawler, QConcursosCrawler, SiteUrls};
pub use download::{ClientConfig, DownloadError, DownloadOutcome, HttpClient, RateLimiter};
pub use model::{DocumentKind, ResultItem, SearchQuery};
pub use orchestrator::{
    CancelFlag, CrawlPlan, CrawlStats, CrawlSummary, Orchestrator, YearRange,
};
pub use organize::{DestinationPath, OrganizeError};
pub use search::FetchError;
pub use user_agent::BROWSER_USER_AGENT;
