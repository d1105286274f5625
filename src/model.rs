//! Core data types shared by every crawl component.
//!
//! A [`ResultItem`] is one downloadable document discovered on a search page.
//! Items are closed records: every field a downstream component needs is
//! carried explicitly, and the document kind is a tagged enum rather than a
//! free-form label.

use std::fmt;

/// Maximum length (in characters) of a sanitized display name.
pub const MAX_DISPLAY_NAME_CHARS: usize = 150;

/// Kind of document a result points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// An exam paper.
    Exam,
    /// The answer key (gabarito) of an exam.
    AnswerKey,
}

impl DocumentKind {
    /// Stable label used in index entries (`- [exam] ...`).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Exam => "exam",
            Self::AnswerKey => "gabarito",
        }
    }

    /// Directory name under a contest directory: the label plus `s`.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Exam => "exams",
            Self::AnswerKey => "gabaritos",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One discoverable document.
///
/// `remote_url` is always absolute: parsers resolve relative links against the
/// site's base URL before constructing an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub kind: DocumentKind,
    pub remote_url: String,
    /// Filesystem-safe name (see [`sanitize_display_name`]).
    pub display_name: String,
    /// Year as reported by the site; not necessarily numeric.
    pub year: String,
    pub examining_board: String,
    pub institution: String,
    pub level: Option<String>,
    /// Set only for exams whose answer key is known to exist.
    pub answer_key_url: Option<String>,
}

impl ResultItem {
    /// Identity used for de-duplication.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            display_name: self.display_name.clone(),
            year: self.year.clone(),
            examining_board: self.examining_board.clone(),
        }
    }

    /// File name the document is saved under: `<name> (<year>).pdf`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{} ({}).pdf",
            self.display_name,
            sanitize_display_name(&self.year)
        )
    }

    /// Builds the answer-key item that accompanies an exam, if one is known.
    ///
    /// The companion shares the exam's contest metadata so it lands in the
    /// same contest directory.
    #[must_use]
    pub fn companion_answer_key(&self) -> Option<ResultItem> {
        if self.kind != DocumentKind::Exam {
            return None;
        }
        let url = self.answer_key_url.as_ref()?;
        Some(ResultItem {
            kind: DocumentKind::AnswerKey,
            remote_url: url.clone(),
            display_name: self.display_name.clone(),
            year: self.year.clone(),
            examining_board: self.examining_board.clone(),
            institution: self.institution.clone(),
            level: self.level.clone(),
            answer_key_url: None,
        })
    }
}

/// Composite identity `(display_name, year, examining_board)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub display_name: String,
    pub year: String,
    pub examining_board: String,
}

/// A search request against one site.
///
/// `year` and `board` are applied as substring filters over parsed results;
/// sites are not trusted to filter exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub year: Option<String>,
    pub board: Option<String>,
    pub max_pages: u32,
}

impl SearchQuery {
    /// Creates a query with no filters.
    #[must_use]
    pub fn new(term: impl Into<String>, max_pages: u32) -> Self {
        Self {
            term: term.into(),
            year: None,
            board: None,
            max_pages,
        }
    }

    /// Restricts results to years containing `year`.
    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into()).filter(|y: &String| !y.trim().is_empty());
        self
    }

    /// Restricts results to boards containing `board` (case-insensitive).
    #[must_use]
    pub fn with_board(mut self, board: impl Into<String>) -> Self {
        self.board = Some(board.into()).filter(|b: &String| !b.trim().is_empty());
        self
    }

    /// Returns true if `item` passes the year and board filters.
    #[must_use]
    pub fn matches(&self, item: &ResultItem) -> bool {
        let year_ok = self
            .year
            .as_deref()
            .is_none_or(|year| item.year.contains(year.trim()));
        let board_ok = self.board.as_deref().is_none_or(|board| {
            item.examining_board
                .to_lowercase()
                .contains(&board.trim().to_lowercase())
        });
        year_ok && board_ok
    }
}

/// Strips characters that are invalid in file names and caps the length.
///
/// Removes `< > : " / \ | ? *` and control characters, trims surrounding
/// whitespace and keeps at most [`MAX_DISPLAY_NAME_CHARS`] characters.
#[must_use]
pub fn sanitize_display_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    cleaned
        .trim()
        .chars()
        .take(MAX_DISPLAY_NAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn exam(name: &str, year: &str, board: &str) -> ResultItem {
        ResultItem {
            kind: DocumentKind::Exam,
            remote_url: format!("https://example.com/{name}.pdf"),
            display_name: name.to_string(),
            year: year.to_string(),
            examining_board: board.to_string(),
            institution: "IBGE".to_string(),
            level: Some("Superior".to_string()),
            answer_key_url: None,
        }
    }

    #[test]
    fn test_sanitize_strips_invalid_path_characters() {
        assert_eq!(
            sanitize_display_name(r#"Analista: TI <2021> "A/B" \ | ? *"#),
            "Analista TI 2021 AB"
        );
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_display_name(&long).chars().count(), MAX_DISPLAY_NAME_CHARS);
    }

    #[test]
    fn test_sanitize_counts_characters_not_bytes() {
        let long = "ção".repeat(100);
        let cleaned = sanitize_display_name(&long);
        assert_eq!(cleaned.chars().count(), MAX_DISPLAY_NAME_CHARS);
    }

    #[test]
    fn test_file_name_includes_year() {
        let item = exam("Analista de Sistemas", "2021", "CESGRANRIO");
        assert_eq!(item.file_name(), "Analista de Sistemas (2021).pdf");
    }

    #[test]
    fn test_dedup_key_ignores_url_and_kind() {
        let a = exam("Prova", "2020", "FGV");
        let mut b = exam("Prova", "2020", "FGV");
        b.remote_url = "https://example.com/other.pdf".to_string();
        b.kind = DocumentKind::AnswerKey;
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_companion_answer_key_only_for_exams_with_url() {
        let mut item = exam("Prova", "2020", "FGV");
        assert!(item.companion_answer_key().is_none());

        item.answer_key_url = Some("https://example.com/key.pdf".to_string());
        let key = item.companion_answer_key().unwrap();
        assert_eq!(key.kind, DocumentKind::AnswerKey);
        assert_eq!(key.remote_url, "https://example.com/key.pdf");
        assert_eq!(key.institution, item.institution);
        assert!(key.answer_key_url.is_none());
        assert!(key.companion_answer_key().is_none());
    }

    #[test]
    fn test_query_year_filter_is_substring() {
        let query = SearchQuery::new("ti", 10).with_year("2020");
        assert!(query.matches(&exam("A", "2020", "FGV")));
        assert!(query.matches(&exam("A", "2020/2021", "FGV")));
        assert!(!query.matches(&exam("A", "2019", "FGV")));
    }

    #[test]
    fn test_query_board_filter_is_case_insensitive() {
        let query = SearchQuery::new("ti", 10).with_board("cesgranrio");
        assert!(query.matches(&exam("A", "2020", "CESGRANRIO")));
        assert!(query.matches(&exam("A", "2020", "Fundação Cesgranrio")));
        assert!(!query.matches(&exam("A", "2020", "FGV")));
    }

    #[test]
    fn test_query_blank_filters_are_ignored() {
        let query = SearchQuery::new("ti", 10).with_year("  ").with_board("");
        assert!(query.year.is_none());
        assert!(query.board.is_none());
        assert!(query.matches(&exam("A", "1999", "X")));
    }

    #[test]
    fn test_kind_dir_names() {
        assert_eq!(DocumentKind::Exam.dir_name(), "exams");
        assert_eq!(DocumentKind::AnswerKey.dir_name(), "gabaritos");
        assert_eq!(DocumentKind::Exam.to_string(), "exam");
    }
}
