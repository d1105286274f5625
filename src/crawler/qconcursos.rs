//! Crawler for the authenticated question-bank API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{Crawler, CrawlError, fetch_text};
use crate::auth::{Credentials, SessionStore, try_login};
use crate::download::HttpClient;
use crate::model::{ResultItem, SearchQuery};
use crate::orchestrator::CancelFlag;
use crate::parser::api;
use crate::search::{FetchError, PageSource, paginate};

/// Question search endpoint path.
pub const SEARCH_PATH: &str = "/api/v2/questions/search";

/// Page size requested from the search endpoint.
pub const SEARCH_PER_PAGE: u32 = 100;

const SITE: &str = "qconcursos";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    page: u32,
    per_page: u32,
    filters: SearchFilters<'a>,
}

#[derive(Debug, Serialize)]
struct SearchFilters<'a> {
    subjects: [&'a str; 0],
    examining_boards: Vec<&'a str>,
    years: Vec<&'a str>,
}

impl<'a> SearchRequest<'a> {
    fn new(query: &'a SearchQuery, page: u32) -> Self {
        Self {
            q: query.term.trim(),
            page,
            per_page: SEARCH_PER_PAGE,
            filters: SearchFilters {
                subjects: [],
                examining_boards: query.board.as_deref().map(str::trim).into_iter().collect(),
                years: query.year.as_deref().map(str::trim).into_iter().collect(),
            },
        }
    }
}

#[derive(Debug)]
struct QuestionPages {
    client: HttpClient,
    base: String,
    session: Arc<SessionStore>,
}

impl QuestionPages {
    fn headers(&self) -> HeaderMap {
        let mut headers = self.session.auth_headers();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(value) = self
            .session
            .csrf_token()
            .and_then(|token| HeaderValue::from_str(&token).ok())
        {
            headers.insert("x-csrf-token", value);
        }
        headers
    }
}

#[async_trait]
impl PageSource for QuestionPages {
    fn name(&self) -> &'static str {
        SITE
    }

    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<String, FetchError> {
        let url = format!("{}{SEARCH_PATH}", self.base);
        let response = self
            .client
            .inner()
            .post(&url)
            .headers(self.headers())
            .json(&SearchRequest::new(query, page))
            .send()
            .await;
        fetch_text(response, &url).await
    }

    fn parse_page(&self, body: &str) -> Result<Vec<ResultItem>, FetchError> {
        api::question_items(body, &self.base)
            .map(|items| items.collect())
            .map_err(|e| FetchError::decode(SITE, e.to_string()))
    }
}

/// Question-bank API; every search and download needs a logged-in session.
#[derive(Debug)]
pub struct QConcursosCrawler {
    client: HttpClient,
    session: Arc<SessionStore>,
    pages: QuestionPages,
}

impl QConcursosCrawler {
    /// Creates a logged-out crawler rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidBaseUrl`] if `base_url` is not absolute.
    pub fn new(client: HttpClient, base_url: &str) -> Result<Self, CrawlError> {
        url::Url::parse(base_url).map_err(|_| CrawlError::InvalidBaseUrl {
            site: SITE,
            url: base_url.to_string(),
        })?;
        let session = Arc::new(SessionStore::new());
        let pages = QuestionPages {
            client: client.clone(),
            base: base_url.trim_end_matches('/').to_string(),
            session: Arc::clone(&session),
        };
        Ok(Self {
            client,
            session,
            pages,
        })
    }

    /// Logs in and stores the session; returns whether login succeeded.
    ///
    /// A failed login clears any previous session.
    #[instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: &Credentials) -> bool {
        match try_login(&self.client, &self.pages.base, credentials).await {
            Ok(session) => {
                self.session.set(session);
                true
            }
            Err(error) => {
                warn!(error = %error, "login failed");
                self.session.clear();
                false
            }
        }
    }

    /// Current session holder.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}

#[async_trait]
impl Crawler for QConcursosCrawler {
    fn name(&self) -> &'static str {
        SITE
    }

    fn client(&self) -> &HttpClient {
        &self.client
    }

    fn requires_session(&self) -> bool {
        true
    }

    fn is_ready(&self) -> bool {
        self.session.is_authenticated()
    }

    #[instrument(skip(self, cancel), fields(term = %query.term))]
    async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancelFlag,
    ) -> Result<Vec<ResultItem>, CrawlError> {
        if !self.session.is_authenticated() {
            return Err(CrawlError::NotAuthenticated { site: SITE });
        }
        let items = paginate(&self.pages, query, cancel).await;
        info!(found = items.len(), "question search finished");
        Ok(items)
    }

    fn request_headers(&self) -> HeaderMap {
        self.session.auth_headers()
    }
}
