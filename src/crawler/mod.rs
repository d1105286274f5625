//! Site crawlers.
//!
//! A [`Crawler`] bundles everything site-specific: how to search, whether a
//! session is needed, and which headers document downloads carry. The
//! orchestrator only talks to this trait.
//!
//! | Crawler | Source | Session |
//! |---------|--------|---------|
//! | [`PciCrawler`] | HTML exam tables and answer-key cards | no |
//! | [`QConcursosCrawler`] | JSON question API | yes |

mod error;
mod pci;
mod qconcursos;

pub use error::CrawlError;
pub use pci::{NO_ANSWER_KEYS_SENTINEL, NO_EXAMS_SENTINEL, PciCrawler};
pub use qconcursos::{QConcursosCrawler, SEARCH_PATH, SEARCH_PER_PAGE};

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::download::HttpClient;
use crate::model::{ResultItem, SearchQuery};
use crate::orchestrator::CancelFlag;
use crate::search::FetchError;

/// Production base URL of the markup archive.
pub const PCI_BASE_URL: &str = "https://www.pciconcursos.com.br";

/// Production base URL of the question API.
pub const QCONCURSOS_BASE_URL: &str = "https://www.qconcursos.com";

/// Base URLs of both sites; overridable for tests and mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    pub pci: String,
    pub qconcursos: String,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self {
            pci: PCI_BASE_URL.to_string(),
            qconcursos: QCONCURSOS_BASE_URL.to_string(),
        }
    }
}

/// One crawlable site.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Name used in log records and errors.
    fn name(&self) -> &'static str;

    /// Shared HTTP client used for pages and documents.
    fn client(&self) -> &HttpClient;

    /// Returns true if searching needs a prior login.
    fn requires_session(&self) -> bool {
        false
    }

    /// Returns true if the crawler can search right now.
    fn is_ready(&self) -> bool {
        true
    }

    /// Searches exam documents, page by page.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::NotAuthenticated`] when a required session is
    /// missing. Page failures are not errors; they end pagination early.
    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancelFlag,
    ) -> Result<Vec<ResultItem>, CrawlError>;

    /// Searches the site's separate answer-key listing, if it has one.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    async fn search_answer_keys(
        &self,
        _query: &SearchQuery,
        _cancel: &CancelFlag,
    ) -> Result<Vec<ResultItem>, CrawlError> {
        Ok(Vec::new())
    }

    /// Headers merged into document downloads.
    fn request_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// Downloads `item` to `dest`; see [`HttpClient::download`].
    async fn download(&self, item: &ResultItem, dest: &Path, cancel: &CancelFlag) -> bool {
        self.client()
            .download(&item.remote_url, dest, &self.request_headers(), cancel)
            .await
    }
}

/// Reads a successful response body as text.
async fn fetch_text(
    response: Result<reqwest::Response, reqwest::Error>,
    url: &str,
) -> Result<String, FetchError> {
    let response = response.map_err(|e| FetchError::from_reqwest(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http_status(url, status.as_u16()));
    }
    response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}
