//! Shared top-N selection for every ranked result.
//!
//! All rankings order by score descending and break ties by ascending key, so
//! output never depends on hash or storage iteration order.

use std::cmp::Ordering;

#[inline]
fn by_score_then_key<K: Ord, S: Ord>((ka, sa): &(K, S), (kb, sb): &(K, S)) -> Ordering {
    sb.cmp(sa).then_with(|| ka.cmp(kb))
}

/// The `limit` best `(key, score)` pairs. Keys are expected to be unique.
#[must_use]
pub fn top_by_score<K, S, I>(tally: I, limit: usize) -> Vec<(K, S)>
where
    K: Ord,
    S: Ord,
    I: IntoIterator<Item = (K, S)>,
{
    let mut ranked: Vec<(K, S)> = tally.into_iter().collect();
    if limit == 0 {
        return Vec::new();
    }
    if limit < ranked.len() {
        // Partition first so only the kept prefix pays for a full sort.
        ranked.select_nth_unstable_by(limit - 1, by_score_then_key);
        ranked.truncate(limit);
    }
    ranked.sort_unstable_by(by_score_then_key);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_score_then_key() {
        let ranked = top_by_score(vec![(3, 5), (1, 5), (2, 9), (4, 1)], 10);
        assert_eq!(ranked, vec![(2, 9), (1, 5), (3, 5), (4, 1)]);
    }

    #[test]
    fn test_truncates_to_limit() {
        let tally: Vec<(i64, u64)> = (1..=100).map(|k| (k, (k % 7) as u64)).collect();
        let ranked = top_by_score(tally.clone(), 5);
        assert_eq!(ranked.len(), 5);

        let mut full = top_by_score(tally, usize::MAX);
        full.truncate(5);
        assert_eq!(ranked, full, "partial selection must agree with a full sort");
    }

    #[test]
    fn test_zero_limit_and_empty_input() {
        assert!(top_by_score(vec![(1, 1)], 0).is_empty());
        assert!(top_by_score(Vec::<(i64, i64)>::new(), 3).is_empty());
    }
}
