//! De-duplication of result items across search terms and result kinds.
//!
//! Two items with the same [`DedupKey`] are the same document; the first one
//! seen wins and output order follows input order.

use std::collections::HashSet;

use crate::model::{DedupKey, ResultItem};

/// Running set of identities already emitted.
///
/// Owned by one aggregation scope (a single call, or one year of a bulk run)
/// and never shared between concurrent runs.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<DedupKey>,
}

impl DedupSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the items whose identity has not been seen, recording them.
    pub fn retain_new(&mut self, items: impl IntoIterator<Item = ResultItem>) -> Vec<ResultItem> {
        items
            .into_iter()
            .filter(|item| self.seen.insert(item.dedup_key()))
            .collect()
    }

    /// Number of distinct identities recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Merges item lists into one list, first-seen-wins by [`DedupKey`].
#[must_use]
pub fn aggregate<I, L>(lists: I) -> Vec<ResultItem>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = ResultItem>,
{
    let mut set = DedupSet::new();
    lists
        .into_iter()
        .flat_map(|list| set.retain_new(list))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DocumentKind;
    use crate::model::tests::exam;

    #[test]
    fn test_aggregate_keeps_first_seen_across_lists() {
        let mut first = exam("Prova", "2021", "FGV");
        first.remote_url = "https://example.com/first.pdf".to_string();
        let mut dup = exam("Prova", "2021", "FGV");
        dup.remote_url = "https://example.com/second.pdf".to_string();

        let merged = aggregate(vec![
            vec![exam("A", "2021", "FGV"), first],
            vec![dup, exam("B", "2021", "FGV")],
        ]);

        let names: Vec<_> = merged.iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["A", "Prova", "B"]);
        assert_eq!(merged[1].remote_url, "https://example.com/first.pdf");
    }

    #[test]
    fn test_aggregate_dedups_within_one_list() {
        let merged = aggregate([vec![
            exam("A", "2021", "FGV"),
            exam("A", "2021", "FGV"),
            exam("A", "2020", "FGV"),
            exam("A", "2021", "CESPE"),
        ]]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_aggregate_treats_kinds_with_same_key_as_duplicates() {
        let mut key = exam("A", "2021", "FGV");
        key.kind = DocumentKind::AnswerKey;
        let merged = aggregate([vec![exam("A", "2021", "FGV")], vec![key]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, DocumentKind::Exam);
    }

    #[test]
    fn test_aggregate_empty_input() {
        let merged = aggregate(Vec::<Vec<ResultItem>>::new());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_dedup_set_persists_across_calls() {
        let mut set = DedupSet::new();
        let first = set.retain_new(vec![exam("A", "2021", "FGV"), exam("B", "2021", "FGV")]);
        let second = set.retain_new(vec![exam("B", "2021", "FGV"), exam("C", "2021", "FGV")]);

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].display_name, "C");
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
    }
}
