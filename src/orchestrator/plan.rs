//! Fully resolved parameters of a bulk crawl.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Datelike;

use crate::download::constants::DEFAULT_ITEM_DELAY;

/// Oldest year any crawl will ask for.
pub const MIN_YEAR: i32 = 1990;

/// How many years past the current one are still searched.
pub const FUTURE_YEARS: i32 = 2;

/// Default page cap per query.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Default number of concurrent downloads.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default pause after each term.
pub const DEFAULT_TERM_DELAY: Duration = Duration::from_secs(1);

/// Terms searched when none are configured.
pub const DEFAULT_TERMS: [&str; 28] = [
    "administracao",
    "direito",
    "contabilidade",
    "economia",
    "informatica",
    "ti",
    "medicina",
    "enfermagem",
    "engenharia",
    "matematica",
    "portugues",
    "conhecimentos-gerais",
    "raciocinio-logico",
    "tecnico",
    "analista",
    "auditor",
    "fiscal",
    "professor",
    "policia",
    "agente",
    "oficial",
    "assistente",
    "superior",
    "medio",
    "fundamental",
    "especialista",
    "gestor",
    "perito",
];

/// Newest year accepted as a bound: the current year plus [`FUTURE_YEARS`].
#[must_use]
pub fn latest_supported_year() -> i32 {
    chrono::Local::now().year() + FUTURE_YEARS
}

/// Inclusive year range, always iterated newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    newest: i32,
    oldest: i32,
}

impl YearRange {
    /// Creates a range from two bounds given in any order.
    #[must_use]
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            newest: a.max(b),
            oldest: a.min(b),
        }
    }

    /// A single year.
    #[must_use]
    pub fn single(year: i32) -> Self {
        Self::new(year, year)
    }

    /// Newest year in the range.
    #[must_use]
    pub fn newest(self) -> i32 {
        self.newest
    }

    /// Oldest year in the range.
    #[must_use]
    pub fn oldest(self) -> i32 {
        self.oldest
    }

    /// Number of years covered.
    #[must_use]
    pub fn len(self) -> usize {
        let span = i64::from(self.newest) - i64::from(self.oldest) + 1;
        usize::try_from(span).unwrap_or(usize::MAX)
    }

    /// Always false; a range covers at least one year.
    #[must_use]
    pub fn is_empty(self) -> bool {
        false
    }

    /// Years from newest to oldest.
    pub fn iter(self) -> impl Iterator<Item = i32> {
        (self.oldest..=self.newest).rev()
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(latest_supported_year(), MIN_YEAR)
    }
}

/// Everything the orchestrator needs for one run.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub output_dir: PathBuf,
    pub years: YearRange,
    pub terms: Vec<String>,
    /// Examining-board substring applied to every search.
    pub board: Option<String>,
    pub max_pages: u32,
    /// Also search the site's answer-key listing for each term.
    pub include_answer_keys: bool,
    pub concurrency: usize,
    /// Minimum spacing between two downloads from the same host.
    pub item_delay: Duration,
    pub term_delay: Duration,
    /// Upper bound on `(year, term)` searches; `None` means unbounded.
    pub max_queries: Option<usize>,
}

impl CrawlPlan {
    /// Plan with default years, terms, pacing and a single worker.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            years: YearRange::default(),
            terms: DEFAULT_TERMS.iter().map(ToString::to_string).collect(),
            board: None,
            max_pages: DEFAULT_MAX_PAGES,
            include_answer_keys: true,
            concurrency: DEFAULT_CONCURRENCY,
            item_delay: DEFAULT_ITEM_DELAY,
            term_delay: DEFAULT_TERM_DELAY,
            max_queries: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_year_range_normalizes_descending() {
        let range = YearRange::new(2019, 2021);
        assert_eq!(range.newest(), 2021);
        assert_eq!(range.oldest(), 2019);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![2021, 2020, 2019]);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_year_range_single() {
        assert_eq!(YearRange::single(2020).iter().collect::<Vec<_>>(), vec![2020]);
    }

    #[test]
    fn test_year_range_len_extreme_bounds() {
        let range = YearRange::new(i32::MAX, i32::MIN);
        assert_eq!(range.len(), usize::try_from(1u64 << 32).unwrap_or(usize::MAX));
        assert_eq!(YearRange::single(i32::MIN).len(), 1);
    }

    #[test]
    fn test_default_year_range_bounds() {
        let range = YearRange::default();
        assert_eq!(range.oldest(), MIN_YEAR);
        assert_eq!(range.newest(), latest_supported_year());
        assert!(range.newest() >= 2026);
    }

    #[test]
    fn test_plan_defaults() {
        let plan = CrawlPlan::new("out");
        assert_eq!(plan.terms.len(), 28);
        assert_eq!(plan.terms[0], "administracao");
        assert_eq!(plan.terms[27], "perito");
        assert_eq!(plan.concurrency, 1);
        assert_eq!(plan.item_delay, Duration::from_millis(500));
        assert_eq!(plan.term_delay, Duration::from_secs(1));
        assert!(plan.include_answer_keys);
        assert!(plan.max_queries.is_none());
        assert!(plan.board.is_none());
    }
}
