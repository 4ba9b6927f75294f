//! Merging of the two lookup results
//!
//! Unlike score fusion, the merge keeps the retrieval order intact: primary
//! results first, then the substring results that were not already seen.

use super::SearchableRecord;
use std::collections::HashSet;
use uuid::Uuid;

/// Concatenate primary then secondary and keep the first copy of each id.
///
/// When both lists carry the same id, the primary copy wins even if the two
/// copies differ in content.
pub fn merge_candidates(
    primary: Vec<SearchableRecord>,
    secondary: Vec<SearchableRecord>,
) -> Vec<SearchableRecord> {
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(primary.len() + secondary.len());

    primary
        .into_iter()
        .chain(secondary)
        .filter(|record| seen.insert(record.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::test_support::record;

    fn ids(records: &[SearchableRecord]) -> Vec<u128> {
        records.iter().map(|r| r.id.as_u128()).collect()
    }

    #[test]
    fn test_shared_id_kept_once() {
        let primary = vec![record(1, "a"), record(2, "b")];
        let secondary = vec![record(2, "b"), record(3, "c")];

        let merged = merge_candidates(primary, secondary);

        assert_eq!(ids(&merged), vec![1, 2, 3]);
    }

    #[test]
    fn test_primary_copy_wins_on_conflict() {
        let mut from_primary = record(7, "onion price wholesale");
        from_primary.title = "Onions (ranked)".to_string();
        let mut from_secondary = record(7, "onion price wholesale");
        from_secondary.title = "Onions (substring)".to_string();

        let merged = merge_candidates(vec![from_primary], vec![from_secondary]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Onions (ranked)");
    }

    #[test]
    fn test_order_is_primary_then_unseen_secondary() {
        let primary = vec![record(5, ""), record(3, ""), record(9, "")];
        let secondary = vec![record(4, ""), record(9, ""), record(1, ""), record(5, "")];

        let merged = merge_candidates(primary, secondary);

        assert_eq!(ids(&merged), vec![5, 3, 9, 4, 1]);
    }

    #[test]
    fn test_duplicates_within_one_list() {
        let merged = merge_candidates(vec![record(1, ""), record(1, "")], vec![]);
        assert_eq!(ids(&merged), vec![1]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge_candidates(vec![], vec![]).is_empty());
        assert_eq!(ids(&merge_candidates(vec![], vec![record(2, "")])), vec![2]);
    }
}
