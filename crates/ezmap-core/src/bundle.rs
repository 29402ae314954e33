//! Input bundle and result vector (spec §3).

use serde::{Deserialize, Serialize};

use crate::error::{EzmapError, Result};

/// An ordered tuple of equal-length sequences `(s_1, …, s_k)`, stored as
/// homogeneous columns since Rust cannot express a heterogeneous-arity
/// tuple-of-sequences generically without per-arity machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle<T> {
    pub columns: Vec<Vec<T>>,
}

impl<T: Clone> Bundle<T> {
    pub fn from1(a: Vec<T>) -> Self {
        Bundle { columns: vec![a] }
    }

    pub fn from2(a: Vec<T>, b: Vec<T>) -> Self {
        Bundle { columns: vec![a, b] }
    }

    pub fn from3(a: Vec<T>, b: Vec<T>, c: Vec<T>) -> Self {
        Bundle { columns: vec![a, b, c] }
    }

    /// Number of items, i.e. the shared column length. Zero columns means
    /// zero items.
    pub fn len(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// `|s_m| = N` for all columns.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        if self.columns.iter().any(|c| c.len() != n) {
            return Err(EzmapError::Config(
                "bundle columns must all share the same length".to_string(),
            ));
        }
        Ok(())
    }

    pub fn item(&self, j: usize) -> Vec<T> {
        ezmap_partition::lookup_item(&self.columns, j)
    }

    pub fn slice(&self, begin: usize, end: usize) -> Vec<Vec<T>> {
        ezmap_partition::lookup_slice(&self.columns, begin, end)
    }
}

/// Ordered result sequence of length `N`, aligned to input order. Modeled
/// as `Vec<Option<T>>` internally so an unfilled slot is a representable,
/// checkable state (spec §3): "Missing slots are a fatal invariant
/// violation."
#[derive(Debug)]
pub struct ResultVec<T> {
    slots: Vec<Option<T>>,
}

impl<T> ResultVec<T> {
    pub fn empty(n: usize) -> Self {
        ResultVec { slots: (0..n).map(|_| None).collect() }
    }

    pub fn set(&mut self, j: usize, value: T) {
        self.slots[j] = Some(value);
    }

    pub fn into_vec(self) -> Result<Vec<T>> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(j, slot)| {
                slot.ok_or_else(|| {
                    EzmapError::InvariantViolation(format!("result slot {j} was never filled"))
                })
            })
            .collect()
    }
}

/// A worker's outcome for one item, distinguishing a computed value from a
/// caught panic/error. The master treats this as an ordinary payload — it
/// does not interpret it semantically (spec §7) — and the caller decides
/// whether to unwrap it as an error via `propagate_worker_errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerOutcome<R> {
    Value(R),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_item_and_slice_match_partition_lookup() {
        let bundle = Bundle::from2(vec![0, 1, 2, 3], vec![10, 11, 12, 13]);
        assert_eq!(bundle.item(2), vec![2, 12]);
        assert_eq!(bundle.slice(1, 3), vec![vec![1, 2], vec![11, 12]]);
    }

    #[test]
    fn validate_rejects_mismatched_column_lengths() {
        let bundle = Bundle { columns: vec![vec![1, 2, 3], vec![1, 2]] };
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn result_vec_reports_unfilled_slots() {
        let mut rv = ResultVec::empty(3);
        rv.set(0, "a");
        rv.set(2, "c");
        let err = rv.into_vec().unwrap_err();
        assert!(matches!(err, EzmapError::InvariantViolation(_)));
    }

    #[test]
    fn result_vec_ok_when_fully_filled() {
        let mut rv = ResultVec::empty(2);
        rv.set(1, 20);
        rv.set(0, 10);
        assert_eq!(rv.into_vec().unwrap(), vec![10, 20]);
    }
}
