//! Move detection for keyed arrays.
//!
//! A member counts as moved when it falls outside the longest common
//! subsequence of keys shared by both arrays. The LCS is the largest set of
//! members that kept their relative order, so everything else had to move.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use dvg_types::{key_of, ArrayId, ParentArray};
use serde_json::Value;
use tracing::debug;

/// Key to signed index change (`index in b - index in a`).
pub type MoveTable = BTreeMap<String, i64>;

/// Below this many shared keys the LCS itself is reported as moved.
const MIN_SHARED_FOR_INVERSION: usize = 3;

/// Longest common subsequence of two sequences.
///
/// Ties prefer dropping from `a`, which keeps the earliest members of `a`
/// in the result.
pub fn lcs<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut out = Vec::with_capacity(dp[n][m]);
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            out.push(a[i - 1].clone());
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] >= dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    out.reverse();
    out
}

/// Compute the move table between two arrays of keyed objects.
///
/// Only keys present in both arrays are eligible. Members without a `_key`
/// are ignored, and zero deltas are left out.
pub fn find_moves(a: &[Value], b: &[Value]) -> MoveTable {
    let index_a = key_index(a);
    let index_b = key_index(b);

    let shared_a: Vec<&str> = keys(a).filter(|k| index_b.contains_key(k)).collect();
    let shared_b: Vec<&str> = keys(b).filter(|k| index_a.contains_key(k)).collect();
    let anchored = lcs(&shared_a, &shared_b);

    let moved: Vec<&str> = if shared_a.len() < MIN_SHARED_FOR_INVERSION {
        anchored
    } else {
        shared_a
            .iter()
            .copied()
            .filter(|k| !anchored.contains(k))
            .collect()
    };

    moved
        .into_iter()
        .filter_map(|key| {
            let delta = index_b[key] as i64 - index_a[key] as i64;
            (delta != 0).then(|| (key.to_string(), delta))
        })
        .collect()
}

fn keys(items: &[Value]) -> impl Iterator<Item = &str> {
    items.iter().filter_map(key_of)
}

fn key_index(items: &[Value]) -> HashMap<&str, usize> {
    let mut index = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        if let Some(key) = key_of(item) {
            index.entry(key).or_insert(i);
        }
    }
    index
}

/// Move detection memoized by array identity.
///
/// Results are keyed by the `(ArrayId, ArrayId)` pair, so repeated lookups
/// for the same pair of flattened arrays skip the O(n·m) LCS. The memo is
/// cleared once it reaches capacity.
#[derive(Debug)]
pub struct MoveDetector {
    capacity: usize,
    memo: RwLock<HashMap<(ArrayId, ArrayId), Arc<MoveTable>>>,
    lookups: AtomicUsize,
    hits: AtomicUsize,
}

impl MoveDetector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            memo: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    /// Moves that turn `a` into `b`.
    pub fn moves(&self, a: &ParentArray, b: &ParentArray) -> Arc<MoveTable> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = (a.id, b.id);
        if let Some(hit) = self.memo.read().expect("lock poisoned").get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(hit);
        }

        let table = Arc::new(find_moves(&a.items, &b.items));
        if self.capacity > 0 {
            let mut memo = self.memo.write().expect("lock poisoned");
            if memo.len() >= self.capacity {
                debug!(entries = memo.len(), "move memo full, clearing");
                memo.clear();
            }
            memo.insert(key, Arc::clone(&table));
        }
        table
    }

    pub fn stats(&self) -> MoveStats {
        let lookups = self.lookups.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        MoveStats {
            lookups,
            hits,
            misses: lookups.saturating_sub(hits),
            entries: self.memo.read().expect("lock poisoned").len(),
        }
    }

    pub fn clear(&self) {
        self.memo.write().expect("lock poisoned").clear();
        self.lookups.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
    }
}

impl Default for MoveDetector {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Memo statistics for a [`MoveDetector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveStats {
    pub lookups: usize,
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn keyed(keys: &[&str]) -> Vec<Value> {
        keys.iter().map(|k| json!({"_key": k})).collect()
    }

    fn table(pairs: &[(&str, i64)]) -> MoveTable {
        pairs.iter().map(|(k, d)| (k.to_string(), *d)).collect()
    }

    #[test]
    fn lcs_of_rotation_keeps_the_run() {
        assert_eq!(lcs(&["a", "b", "c", "d"], &["d", "a", "b", "c"]), vec!["a", "b", "c"]);
    }

    #[test]
    fn lcs_tie_keeps_earliest_of_a() {
        assert_eq!(lcs(&["a", "b"], &["b", "a"]), vec!["a"]);
        assert_eq!(lcs(&["a", "b", "c", "d"], &["c", "d", "a", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn rotated_tail_moves_to_front() {
        let moves = find_moves(&keyed(&["a", "b", "c", "d"]), &keyed(&["d", "a", "b", "c"]));
        assert_eq!(moves, table(&[("d", -3)]));
    }

    #[test]
    fn swapped_pair_reports_one_move() {
        let moves = find_moves(&keyed(&["a", "b"]), &keyed(&["b", "a"]));
        assert_eq!(moves, table(&[("a", 1)]));
    }

    #[test]
    fn swapped_halves_move_the_second_half() {
        let moves = find_moves(&keyed(&["a", "b", "c", "d"]), &keyed(&["c", "d", "a", "b"]));
        assert_eq!(moves, table(&[("c", -2), ("d", -2)]));
    }

    #[test]
    fn unchanged_order_has_no_moves() {
        let moves = find_moves(&keyed(&["a", "b", "c"]), &keyed(&["a", "b", "c"]));
        assert!(moves.is_empty());
    }

    #[test]
    fn inserted_and_removed_keys_are_not_moves() {
        let moves = find_moves(&keyed(&["a", "b", "c"]), &keyed(&["x", "a", "b", "c"]));
        assert_eq!(moves, MoveTable::new());

        let moves = find_moves(&keyed(&["a", "gone", "b", "c"]), &keyed(&["a", "b", "c"]));
        assert!(moves.is_empty());
    }

    #[test]
    fn unkeyed_members_are_ignored() {
        let a = vec![json!("x"), json!({"_key": "a"}), json!({"_key": "b"})];
        let b = vec![json!({"_key": "b"}), json!({"_key": "a"})];
        // `a` sits at index 1 in both arrays
        assert!(find_moves(&a, &b).is_empty());
    }

    #[test]
    fn small_intersections_report_the_anchor() {
        let moves = find_moves(&keyed(&["a", "gone", "b"]), &keyed(&["a", "b"]));
        assert_eq!(moves, table(&[("b", -1)]));
    }

    #[test]
    fn detector_memoizes_by_identity() {
        let detector = MoveDetector::new(8);
        let a = ParentArray::new(ArrayId(1), Arc::new(keyed(&["a", "b"])));
        let b = ParentArray::new(ArrayId(2), Arc::new(keyed(&["b", "a"])));

        let first = detector.moves(&a, &b);
        let second = detector.moves(&a, &b);
        assert!(Arc::ptr_eq(&first, &second));

        let stats = detector.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn detector_clears_when_full() {
        let detector = MoveDetector::new(2);
        let items = Arc::new(keyed(&["a"]));
        for i in 0..3 {
            let a = ParentArray::new(ArrayId(i * 2), Arc::clone(&items));
            let b = ParentArray::new(ArrayId(i * 2 + 1), Arc::clone(&items));
            detector.moves(&a, &b);
        }
        assert_eq!(detector.stats().entries, 1);
    }

    proptest! {
        #[test]
        fn lcs_is_a_subsequence_of_both(
            a in prop::collection::vec(0u8..6, 0..10),
            b in prop::collection::vec(0u8..6, 0..10),
        ) {
            let common = lcs(&a, &b);
            let is_subseq = |s: &[u8]| {
                let mut it = s.iter();
                common.iter().all(|c| it.any(|x| x == c))
            };
            prop_assert!(is_subseq(&a));
            prop_assert!(is_subseq(&b));
            prop_assert!(common.len() <= a.len().min(b.len()));
        }
    }
}
