//! Joint count table: level combination → per-arm counts.
//!
//! Keys are level indices, one per factor in factor order, so
//! `[0, 2]` with factors `Sex = (Male, Female)` and
//! `Age = (10-20, 20-30, 30+)` means `(Male, 30+)`. Each participant lives in
//! exactly one row. Rows appear the first time a combination is seen; the
//! full cartesian product is never materialised.

use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct CountTable {
    n_arms: usize,
    rows: BTreeMap<Vec<usize>, Vec<u64>>,
}

impl CountTable {
    pub fn new(n_arms: usize) -> Self {
        Self { n_arms, rows: BTreeMap::new() }
    }

    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    /// Get-or-insert-zero.
    pub fn entry(&mut self, key: Vec<usize>) -> &mut [u64] {
        let n = self.n_arms;
        self.rows.entry(key).or_insert_with(|| vec![0; n])
    }

    pub fn get(&self, key: &[usize]) -> Option<&[u64]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    /// Counts for `key`, zeros if the combination was never seen.
    pub fn counts(&self, key: &[usize]) -> Vec<u64> {
        self.get(key).map_or_else(|| vec![0; self.n_arms], <[u64]>::to_vec)
    }

    pub fn increment(&mut self, key: Vec<usize>, arm: usize) {
        self.entry(key)[arm] += 1;
    }

    /// Per-arm totals over every row whose `factor`-th level is `level`.
    pub fn marginal(&self, factor: usize, level: usize) -> Vec<u64> {
        let mut out = vec![0; self.n_arms];
        for (key, counts) in &self.rows {
            if key.get(factor) == Some(&level) {
                for (o, c) in out.iter_mut().zip(counts) {
                    *o += c;
                }
            }
        }
        out
    }

    /// Per-arm totals over the whole table.
    pub fn arm_totals(&self) -> Vec<u64> {
        let mut out = vec![0; self.n_arms];
        for counts in self.rows.values() {
            for (o, c) in out.iter_mut().zip(counts) {
                *o += c;
            }
        }
        out
    }

    pub fn total(&self) -> u64 {
        self.rows.values().flatten().sum()
    }

    /// Zero every count; observed combinations stay as keys.
    pub fn reset(&mut self) {
        for counts in self.rows.values_mut() {
            counts.iter_mut().for_each(|c| *c = 0);
        }
    }

    /// Number of observed combinations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[usize], &[u64])> {
        self.rows.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// Tables are equal when every combination has the same counts, treating an
/// absent row as all zeros.
impl PartialEq for CountTable {
    fn eq(&self, other: &Self) -> bool {
        self.n_arms == other.n_arms
            && self.rows.keys().chain(other.rows.keys()).all(|k| self.counts(k) == other.counts(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_created_lazily() {
        let mut t = CountTable::new(2);
        assert!(t.is_empty());
        t.increment(vec![0, 1], 1);
        t.increment(vec![0, 1], 1);
        t.increment(vec![1, 1], 0);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&[0, 1]), Some(&[0, 2][..]));
        assert_eq!(t.get(&[0, 0]), None);
        assert_eq!(t.marginal(1, 1), vec![1, 2]);
        assert_eq!(t.marginal(0, 0), vec![0, 2]);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn reset_keeps_keys_and_equals_fresh() {
        let mut t = CountTable::new(3);
        t.increment(vec![0], 2);
        t.increment(vec![1], 0);
        t.reset();
        assert_eq!(t.len(), 2);
        assert_eq!(t.total(), 0);
        assert_eq!(t, CountTable::new(3));
    }
}
