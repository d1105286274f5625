//! Result parsing: turns one page of a search response into [`ResultItem`]s.
//!
//! Two source shapes are supported:
//!
//! - [`markup`] - HTML result tables and answer-key cards, scraped by fixed
//!   positional offsets inside row/card containers
//! - [`api`] - typed JSON collections where document URLs are built from an
//!   item identifier template
//!
//! Parsers never fail on a single bad row: rows with missing links or too few
//! cells are skipped so a partially broken page still yields its good rows.
//!
//! # Example
//!
//! ```
//! use leecher_core::parser::markup;
//! use scraper::Html;
//! use url::Url;
//!
//! let html = Html::parse_document(
//!     r#"<table><tr>
//!         <td><a href="/provas/1.pdf">Analista</a></td>
//!         <td>2021</td><td>IBGE</td><td>CESGRANRIO</td><td>Superior</td>
//!     </tr></table>"#,
//! );
//! let base = Url::parse("https://www.pciconcursos.com.br").unwrap();
//! let items: Vec<_> = markup::exam_rows(&html, &base).collect();
//! assert_eq!(items.len(), 1);
//! assert_eq!(items[0].remote_url, "https://www.pciconcursos.com.br/provas/1.pdf");
//! ```
//!
//! [`ResultItem`]: crate::model::ResultItem

pub mod api;
pub mod markup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Compiles a CSS selector at static init; panics on invalid pattern.
pub(crate) fn compile_static_selector(pattern: &str) -> Selector {
    Selector::parse(pattern).unwrap_or_else(|e| panic!("invalid static selector '{pattern}': {e}"))
}

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static YEAR_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\b(19|20)\d{2}\b"));

/// Returns the first year-like match (19xx or 20xx) in `value`.
#[must_use]
pub fn extract_year_from_str(value: &str) -> Option<String> {
    YEAR_VALUE_RE
        .find(value)
        .map(|capture| capture.as_str().to_string())
}

/// Resolves a possibly relative link against the site's base URL.
///
/// Absolute `http(s)` links are returned as-is; `//host/...` links take the
/// base URL's scheme.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("{}:{value}", base_url.scheme()));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}

/// Concatenated text of an element with internal whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if `body` contains any of the "no results" markers.
#[must_use]
pub fn contains_sentinel(body: &str, sentinels: &[&str]) -> bool {
    sentinels.iter().any(|marker| body.contains(marker))
}
