//! Confusion count accumulators and averaging reducers

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};

use super::average::{Average, MultidimAverage};

/// Per-class confusion counts
///
/// Accumulators are wide on purpose: narrow input label types can never
/// wrap the totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCounts {
    pub true_positives: i64,
    pub false_positives: i64,
    pub true_negatives: i64,
    pub false_negatives: i64,
}

impl StatCounts {
    /// Number of true instances for the class
    #[must_use]
    pub fn support(&self) -> i64 {
        self.true_positives + self.false_negatives
    }

    /// Add another accumulator into this one
    pub fn add(&mut self, other: &StatCounts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.true_negatives += other.true_negatives;
        self.false_negatives += other.false_negatives;
    }

    /// Counts in reporting order: tp, fp, tn, fn, support
    #[must_use]
    pub fn row(&self) -> [f64; 5] {
        [
            self.true_positives as f64,
            self.false_positives as f64,
            self.true_negatives as f64,
            self.false_negatives as f64,
            self.support() as f64,
        ]
    }
}

/// Running state for stat-scores counting.
///
/// Global mode keeps one running total per class; samplewise mode keeps
/// one row of per-class totals per processed sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Accum {
    Global(Vec<StatCounts>),
    Samplewise(Vec<Vec<StatCounts>>),
}

impl Accum {
    pub(crate) fn new(multidim_average: MultidimAverage, num_classes: usize) -> Self {
        match multidim_average {
            MultidimAverage::Global => Accum::Global(vec![StatCounts::default(); num_classes]),
            MultidimAverage::Samplewise => Accum::Samplewise(Vec::new()),
        }
    }

    pub(crate) fn add_global(&mut self, delta: &[StatCounts]) {
        match self {
            Accum::Global(slots) => {
                debug_assert_eq!(slots.len(), delta.len());
                for (slot, d) in slots.iter_mut().zip(delta) {
                    slot.add(d);
                }
            }
            Accum::Samplewise(_) => debug_assert!(false, "global delta on samplewise state"),
        }
    }

    pub(crate) fn push_sample(&mut self, sample: Vec<StatCounts>) {
        match self {
            Accum::Samplewise(samples) => samples.push(sample),
            Accum::Global(_) => debug_assert!(false, "sample row on global state"),
        }
    }

    pub(crate) fn merge(&mut self, other: &Accum) {
        match (self, other) {
            (Accum::Global(slots), Accum::Global(other_slots)) => {
                debug_assert_eq!(slots.len(), other_slots.len());
                for (slot, o) in slots.iter_mut().zip(other_slots) {
                    slot.add(o);
                }
            }
            (Accum::Samplewise(samples), Accum::Samplewise(other_samples)) => {
                samples.extend(other_samples.iter().cloned());
            }
            _ => debug_assert!(false, "merge across mismatched reduction modes"),
        }
    }

    pub(crate) fn reset(&mut self) {
        match self {
            Accum::Global(slots) => {
                for slot in slots.iter_mut() {
                    *slot = StatCounts::default();
                }
            }
            Accum::Samplewise(samples) => samples.clear(),
        }
    }
}

/// Tally one stream of binary decisions against binary targets,
/// skipping positions whose target equals the ignore sentinel.
pub(crate) fn count_binary(
    pairs: impl Iterator<Item = (i64, i64)>,
    ignore_index: Option<i64>,
) -> StatCounts {
    let mut counts = StatCounts::default();
    for (pred, target) in pairs {
        if Some(target) == ignore_index {
            continue;
        }
        match (pred, target) {
            (1, 1) => counts.true_positives += 1,
            (1, 0) => counts.false_positives += 1,
            (0, 0) => counts.true_negatives += 1,
            _ => counts.false_negatives += 1,
        }
    }
    counts
}

/// Rows produced by one counting scope under the averaging policy.
///
/// `None` yields one row per class in ascending class order; the other
/// policies reduce to a single row. Weighted with zero total support
/// yields a zero row, never NaN.
pub(crate) fn reduce_scope(counts: &[StatCounts], average: Average) -> Vec<[f64; 5]> {
    match average {
        Average::None => counts.iter().map(StatCounts::row).collect(),
        Average::Micro => {
            let mut total = StatCounts::default();
            for c in counts {
                total.add(c);
            }
            vec![total.row()]
        }
        Average::Macro => {
            let n = counts.len().max(1) as f64;
            let mut acc = [0.0; 5];
            for c in counts {
                for (slot, v) in acc.iter_mut().zip(c.row()) {
                    *slot += v;
                }
            }
            for slot in &mut acc {
                *slot /= n;
            }
            vec![acc]
        }
        Average::Weighted => {
            let total: i64 = counts.iter().map(StatCounts::support).sum();
            if total == 0 {
                return vec![[0.0; 5]];
            }
            let mut acc = [0.0; 5];
            for c in counts {
                let weight = c.support() as f64 / total as f64;
                for (slot, v) in acc.iter_mut().zip(c.row()) {
                    *slot += weight * v;
                }
            }
            vec![acc]
        }
    }
}

/// Pack reporting rows into an array of the given shape. The shape's
/// element count must equal `5 * rows.len()`.
pub(crate) fn rows_to_array(rows: Vec<[f64; 5]>, shape: &[usize]) -> Result<ArrayD<f64>> {
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    ArrayD::from_shape_vec(IxDyn(shape), flat)
        .map_err(|e| MetricError::Internal(format!("output shape build error: {e}")))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn counts(tp: i64, fp: i64, tn: i64, fn_: i64) -> StatCounts {
        StatCounts {
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        }
    }

    #[test]
    fn test_support_is_tp_plus_fn() {
        let c = counts(3, 1, 4, 2);
        assert_eq!(c.support(), 5);
    }

    #[test]
    fn test_add_accumulates_fieldwise() {
        let mut a = counts(1, 2, 3, 4);
        a.add(&counts(10, 20, 30, 40));
        assert_eq!(a, counts(11, 22, 33, 44));
    }

    #[test]
    fn test_row_order() {
        let row = counts(3, 1, 4, 2).row();
        assert_eq!(row, [3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_reduce_none_keeps_class_order() {
        let per_class = vec![counts(1, 0, 0, 0), counts(0, 2, 0, 0)];
        let rows = reduce_scope(&per_class, Average::None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], [1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(rows[1], [0.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reduce_micro_is_sum_of_rows() {
        let per_class = vec![counts(1, 2, 3, 4), counts(5, 6, 7, 8)];
        let rows = reduce_scope(&per_class, Average::Micro);
        assert_eq!(rows, vec![[6.0, 8.0, 10.0, 12.0, 18.0]]);
    }

    #[test]
    fn test_reduce_macro_is_mean_of_rows() {
        let per_class = vec![counts(1, 2, 3, 4), counts(3, 4, 5, 6)];
        let rows = reduce_scope(&per_class, Average::Macro);
        assert_eq!(rows, vec![[2.0, 3.0, 4.0, 5.0, 7.0]]);
    }

    #[test]
    fn test_reduce_weighted_normalizes_by_support() {
        // Supports 1 and 3: weights 0.25 and 0.75
        let per_class = vec![counts(1, 0, 0, 0), counts(1, 4, 0, 2)];
        let rows = reduce_scope(&per_class, Average::Weighted);
        assert_relative_eq!(rows[0][0], 0.25 + 0.75);
        assert_relative_eq!(rows[0][1], 0.75 * 4.0);
        assert_relative_eq!(rows[0][4], 0.25 + 0.75 * 3.0);
    }

    #[test]
    fn test_reduce_weighted_zero_support_gives_zero_row() {
        let per_class = vec![counts(0, 3, 1, 0), counts(0, 0, 4, 0)];
        let rows = reduce_scope(&per_class, Average::Weighted);
        assert_eq!(rows, vec![[0.0; 5]]);
    }

    #[test]
    fn test_accum_global_merge_adds() {
        let mut a = Accum::new(MultidimAverage::Global, 2);
        a.add_global(&[counts(1, 0, 0, 0), counts(0, 1, 0, 0)]);
        let mut b = Accum::new(MultidimAverage::Global, 2);
        b.add_global(&[counts(2, 0, 1, 0), counts(0, 0, 0, 3)]);
        a.merge(&b);
        assert_eq!(
            a,
            Accum::Global(vec![counts(3, 0, 1, 0), counts(0, 1, 0, 3)])
        );
    }

    #[test]
    fn test_accum_samplewise_merge_appends() {
        let mut a = Accum::new(MultidimAverage::Samplewise, 1);
        a.push_sample(vec![counts(1, 0, 0, 0)]);
        let mut b = Accum::new(MultidimAverage::Samplewise, 1);
        b.push_sample(vec![counts(0, 1, 0, 0)]);
        a.merge(&b);
        assert_eq!(
            a,
            Accum::Samplewise(vec![vec![counts(1, 0, 0, 0)], vec![counts(0, 1, 0, 0)]])
        );
    }

    #[test]
    fn test_accum_reset() {
        let mut a = Accum::new(MultidimAverage::Global, 1);
        a.add_global(&[counts(5, 5, 5, 5)]);
        a.reset();
        assert_eq!(a, Accum::new(MultidimAverage::Global, 1));

        let mut b = Accum::new(MultidimAverage::Samplewise, 1);
        b.push_sample(vec![counts(1, 1, 1, 1)]);
        b.reset();
        assert_eq!(b, Accum::new(MultidimAverage::Samplewise, 1));
    }

    #[test]
    fn test_rows_to_array_shapes() {
        let rows = vec![[1.0, 2.0, 3.0, 4.0, 5.0], [6.0, 7.0, 8.0, 9.0, 15.0]];
        let arr = rows_to_array(rows, &[2, 5]).unwrap();
        assert_eq!(arr.shape(), &[2, 5]);
        assert_eq!(arr[[1, 4]], 15.0);

        let single = rows_to_array(vec![[1.0, 0.0, 0.0, 0.0, 1.0]], &[5]).unwrap();
        assert_eq!(single.shape(), &[5]);

        let empty = rows_to_array(Vec::new(), &[0, 5]).unwrap();
        assert_eq!(empty.shape(), &[0, 5]);
    }
}
