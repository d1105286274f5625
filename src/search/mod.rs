//! Paginated search: drives page-by-page discovery for one query.
//!
//! A [`PageSource`] knows how to fetch and parse one page of a site; the
//! [`paginate`] loop is shared by every site:
//!
//! 1. fetch page `n` (starting at 1, at most `max_pages`)
//! 2. stop if the body carries a "no results" sentinel or parses to nothing
//! 3. keep the items that pass the query's year/board filters, then continue
//!
//! A failed fetch ends pagination for the query and the pages gathered so far
//! are returned; the failure is logged, never raised.

mod error;

pub use error::FetchError;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::model::{ResultItem, SearchQuery};
use crate::orchestrator::CancelFlag;

/// One site's view of a paginated result listing.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Name used in log records.
    fn name(&self) -> &'static str;

    /// Fetches the raw body of result page `page` (1-based) for `query`.
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<String, FetchError>;

    /// Parses a page body into result items.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] when the page envelope itself is
    /// unreadable; malformed rows are skipped, not reported.
    fn parse_page(&self, body: &str) -> Result<Vec<ResultItem>, FetchError>;

    /// Returns true if the body explicitly signals that there are no results.
    fn is_sentinel(&self, _body: &str) -> bool {
        false
    }
}

/// Runs the pagination loop for `query` against `source`.
///
/// Returns the filtered items of every page fetched before the loop stopped,
/// in page order. Cancellation is checked before each page fetch.
#[instrument(skip(source, cancel), fields(source = source.name(), term = %query.term))]
pub async fn paginate(
    source: &dyn PageSource,
    query: &SearchQuery,
    cancel: &CancelFlag,
) -> Vec<ResultItem> {
    let mut collected = Vec::new();

    for page in 1..=query.max_pages {
        if cancel.is_cancelled() {
            debug!(page, "cancellation observed, stopping pagination");
            break;
        }

        let body = match source.fetch_page(query, page).await {
            Ok(body) => body,
            Err(error) => {
                warn!(page, error = %error, "page fetch failed, stopping pagination");
                break;
            }
        };

        if source.is_sentinel(&body) {
            debug!(page, "no-results sentinel found");
            break;
        }

        let items = match source.parse_page(&body) {
            Ok(items) => items,
            Err(error) => {
                warn!(page, error = %error, "page could not be decoded, stopping pagination");
                break;
            }
        };
        if items.is_empty() {
            debug!(page, "empty page, stopping pagination");
            break;
        }

        let parsed = items.len();
        let before = collected.len();
        collected.extend(items.into_iter().filter(|item| query.matches(item)));
        debug!(page, parsed, kept = collected.len() - before, "page processed");
    }

    info!(found = collected.len(), "search finished");
    collected
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::tests::exam;

    /// Scripted source: one entry per page, `None` simulates a transport failure.
    struct FakeSource {
        pages: Vec<Option<Vec<ResultItem>>>,
        requested: Mutex<Vec<u32>>,
    }

    impl FakeSource {
        fn new(pages: Vec<Option<Vec<ResultItem>>>) -> Self {
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_page(&self, _query: &SearchQuery, page: u32) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(page);
            let index = usize::try_from(page - 1).unwrap();
            match self.pages.get(index) {
                Some(Some(_)) => Ok(page.to_string()),
                Some(None) => Err(FetchError::http_status("https://fake/", 503)),
                None => Ok(String::from("0")),
            }
        }

        fn parse_page(&self, body: &str) -> Result<Vec<ResultItem>, FetchError> {
            let page: usize = body.parse().unwrap();
            if page == 0 {
                return Ok(Vec::new());
            }
            Ok(self.pages[page - 1].clone().unwrap_or_default())
        }

        fn is_sentinel(&self, body: &str) -> bool {
            body == "sentinel"
        }
    }

    fn page_of(prefix: &str, year: &str, count: usize) -> Option<Vec<ResultItem>> {
        Some(
            (0..count)
                .map(|i| exam(&format!("{prefix}{i}"), year, "CESGRANRIO"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_pagination_stops_at_first_empty_page() {
        let source = FakeSource::new(vec![
            page_of("a", "2021", 2),
            page_of("b", "2021", 2),
            page_of("c", "2021", 2),
            Some(Vec::new()),
        ]);
        let query = SearchQuery::new("ti", 10);

        let items = paginate(&source, &query, &CancelFlag::new()).await;

        assert_eq!(items.len(), 6);
        assert_eq!(source.requested(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_pagination_respects_max_pages() {
        let source = FakeSource::new(vec![
            page_of("a", "2021", 1),
            page_of("b", "2021", 1),
            page_of("c", "2021", 1),
        ]);
        let query = SearchQuery::new("ti", 2);

        let items = paginate(&source, &query, &CancelFlag::new()).await;

        assert_eq!(items.len(), 2);
        assert_eq!(source.requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_transport_failure_returns_pages_before_it() {
        let source = FakeSource::new(vec![page_of("a", "2021", 3), None, page_of("c", "2021", 3)]);
        let query = SearchQuery::new("ti", 10);

        let items = paginate(&source, &query, &CancelFlag::new()).await;

        assert_eq!(items.len(), 3);
        assert_eq!(source.requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_filtered_out_page_does_not_stop_pagination() {
        let source = FakeSource::new(vec![
            page_of("old", "2019", 3),
            page_of("new", "2021", 2),
            Some(Vec::new()),
        ]);
        let query = SearchQuery::new("ti", 10).with_year("2021");

        let items = paginate(&source, &query, &CancelFlag::new()).await;

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.year.contains("2021")));
        assert_eq!(source.requested(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cancelled_flag_prevents_any_fetch() {
        let source = FakeSource::new(vec![page_of("a", "2021", 3)]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let items = paginate(&source, &SearchQuery::new("ti", 10), &cancel).await;

        assert!(items.is_empty());
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn test_items_keep_page_order() {
        let source = FakeSource::new(vec![page_of("a", "2021", 2), page_of("b", "2021", 2)]);
        let items = paginate(&source, &SearchQuery::new("ti", 2), &CancelFlag::new()).await;
        let names: Vec<_> = items.iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["a0", "a1", "b0", "b1"]);
    }
}
