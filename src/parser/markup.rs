//! HTML result extraction for the markup-based exam archive.
//!
//! Exam search pages list one exam per table row:
//!
//! | cell | content |
//! |------|---------|
//! | 0 | link to the document, link text is the exam name |
//! | 1 | year |
//! | 2 | institution |
//! | 3 | examining board |
//! | 4 | level |
//!
//! Answer-key pages use cards (`div.ga-list-item`) holding a link and an info
//! block with the publication date and the board.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::trace;
use url::Url;

use super::{absolutize_url, compile_static_selector, element_text, extract_year_from_str};
use crate::model::{DocumentKind, ResultItem, sanitize_display_name};

/// Minimum number of cells an exam row must have.
pub const MIN_EXAM_ROW_CELLS: usize = 5;

static ROW: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));
static CARD: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("div.ga-list-item"));
static CARD_INFO: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("div.ga-list-info"));
static CARD_DATE: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("div.ga-list-date"));
static CARD_ORG: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("div.ga-list-org"));
static CSRF_META: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(r#"meta[name="csrf-token"]"#));

/// Lazily yields one exam per well-formed table row.
pub fn exam_rows<'a>(
    document: &'a Html,
    base_url: &'a Url,
) -> impl Iterator<Item = ResultItem> + 'a {
    document
        .select(&ROW)
        .filter_map(move |row| exam_from_row(row, base_url))
}

fn exam_from_row(row: ElementRef<'_>, base_url: &Url) -> Option<ResultItem> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    if cells.len() < MIN_EXAM_ROW_CELLS {
        trace!(cells = cells.len(), "skipping short row");
        return None;
    }

    let link = cells[0].select(&LINK).next()?;
    let remote_url = absolutize_url(link.value().attr("href")?, base_url)?;
    let display_name = sanitize_display_name(&element_text(link));
    if display_name.is_empty() {
        trace!(url = %remote_url, "skipping row without a name");
        return None;
    }

    let level = element_text(cells[4]);
    Some(ResultItem {
        kind: DocumentKind::Exam,
        remote_url,
        display_name,
        year: element_text(cells[1]),
        institution: element_text(cells[2]),
        examining_board: element_text(cells[3]),
        level: (!level.is_empty()).then_some(level),
        answer_key_url: None,
    })
}

/// Lazily yields one answer key per well-formed card.
///
/// Cards carry no institution column; the card title names the contest and
/// is used as the institution so keys still group into a contest directory.
pub fn answer_key_cards<'a>(
    document: &'a Html,
    base_url: &'a Url,
) -> impl Iterator<Item = ResultItem> + 'a {
    document
        .select(&CARD)
        .filter_map(move |card| answer_key_from_card(card, base_url))
}

fn answer_key_from_card(card: ElementRef<'_>, base_url: &Url) -> Option<ResultItem> {
    let link = card.select(&LINK).next()?;
    let info = card.select(&CARD_INFO).next()?;
    let remote_url = absolutize_url(link.value().attr("href")?, base_url)?;

    let title = element_text(link);
    let display_name = sanitize_display_name(&title);
    if display_name.is_empty() {
        trace!(url = %remote_url, "skipping card without a title");
        return None;
    }

    let date = info
        .select(&CARD_DATE)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let board = info
        .select(&CARD_ORG)
        .next()
        .map(element_text)
        .unwrap_or_default();

    Some(ResultItem {
        kind: DocumentKind::AnswerKey,
        remote_url,
        display_name,
        year: year_from_date(&date),
        examining_board: board,
        institution: title,
        level: None,
        answer_key_url: None,
    })
}

/// Year of a `dd/mm/yyyy` date: the last `/` segment, or the first year-like
/// token when the segment carries trailing text.
fn year_from_date(date: &str) -> String {
    let last = date.rsplit('/').next().unwrap_or("").trim();
    if last.len() == 4 && last.chars().all(|c| c.is_ascii_digit()) {
        return last.to_string();
    }
    extract_year_from_str(last).unwrap_or_else(|| last.to_string())
}

/// Extracts the CSRF token from a page's `<meta name="csrf-token">` tag.
#[must_use]
pub fn csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&CSRF_META)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
