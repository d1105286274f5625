//! Crawler for the public HTML exam archive.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;
use url::Url;

use super::{Crawler, CrawlError, fetch_text};
use crate::download::HttpClient;
use crate::model::{DocumentKind, ResultItem, SearchQuery};
use crate::orchestrator::CancelFlag;
use crate::parser::{contains_sentinel, markup};
use crate::search::{FetchError, PageSource, paginate};

/// Body text of an exam page past the last result.
pub const NO_EXAMS_SENTINEL: &str = "Nenhuma prova encontrada";

/// Body text of an answer-key page past the last result.
pub const NO_ANSWER_KEYS_SENTINEL: &str = "Nenhum gabarito encontrado";

const SENTINELS: [&str; 2] = [NO_EXAMS_SENTINEL, NO_ANSWER_KEYS_SENTINEL];

/// One paginated listing of the archive (exams or answer keys).
#[derive(Debug, Clone)]
struct ListingPages {
    client: HttpClient,
    base: Url,
    kind: DocumentKind,
}

impl ListingPages {
    fn page_url(&self, term: &str, page: u32) -> String {
        let section = match self.kind {
            DocumentKind::Exam => "provas",
            DocumentKind::AnswerKey => "gabaritos",
        };
        format!(
            "{}/{section}/{}/{page}/",
            self.base.as_str().trim_end_matches('/'),
            urlencoding::encode(term.trim())
        )
    }
}

#[async_trait]
impl PageSource for ListingPages {
    fn name(&self) -> &'static str {
        match self.kind {
            DocumentKind::Exam => "pci-provas",
            DocumentKind::AnswerKey => "pci-gabaritos",
        }
    }

    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(&query.term, page);
        fetch_text(self.client.inner().get(&url).send().await, &url).await
    }

    fn parse_page(&self, body: &str) -> Result<Vec<ResultItem>, FetchError> {
        let document = Html::parse_document(body);
        let items = match self.kind {
            DocumentKind::Exam => markup::exam_rows(&document, &self.base).collect(),
            DocumentKind::AnswerKey => markup::answer_key_cards(&document, &self.base).collect(),
        };
        Ok(items)
    }

    fn is_sentinel(&self, body: &str) -> bool {
        contains_sentinel(body, &SENTINELS)
    }
}

/// Public archive: exam tables under `/provas/`, answer keys under `/gabaritos/`.
#[derive(Debug, Clone)]
pub struct PciCrawler {
    client: HttpClient,
    exams: ListingPages,
    answer_keys: ListingPages,
}

impl PciCrawler {
    /// Creates a crawler rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidBaseUrl`] if `base_url` is not absolute.
    pub fn new(client: HttpClient, base_url: &str) -> Result<Self, CrawlError> {
        let base = Url::parse(base_url).map_err(|_| CrawlError::InvalidBaseUrl {
            site: "pci",
            url: base_url.to_string(),
        })?;
        let listing = |kind| ListingPages {
            client: client.clone(),
            base: base.clone(),
            kind,
        };
        Ok(Self {
            exams: listing(DocumentKind::Exam),
            answer_keys: listing(DocumentKind::AnswerKey),
            client,
        })
    }
}

#[async_trait]
impl Crawler for PciCrawler {
    fn name(&self) -> &'static str {
        "pci"
    }

    fn client(&self) -> &HttpClient {
        &self.client
    }

    #[instrument(skip(self, cancel), fields(term = %query.term))]
    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancelFlag,
    ) -> Result<Vec<ResultItem>, CrawlError> {
        Ok(paginate(&self.exams, query, cancel).await)
    }

    #[instrument(skip(self, cancel), fields(term = %query.term))]
    async fn search_answer_keys(
        &self,
        query: &SearchQuery,
        cancel: &CancelFlag,
    ) -> Result<Vec<ResultItem>, CrawlError> {
        Ok(paginate(&self.answer_keys, query, cancel).await)
    }
}
