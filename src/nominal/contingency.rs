//! Contingency tables over paired categorical observations

use ndarray::{Array2, ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};

/// Treatment of NaN categories in float inputs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NanStrategy {
    /// Substitute NaN with a fixed category value
    Replace(f64),
    /// Remove a pair when either side is NaN
    Drop,
}

impl Default for NanStrategy {
    fn default() -> Self {
        NanStrategy::Replace(0.0)
    }
}

/// Reduce one input side to raw categories: 1-d values pass through,
/// 2-d score matrices collapse to the arg-max column per row, ties
/// toward the lower index.
fn to_categories(values: &ArrayD<f64>) -> Result<Vec<f64>> {
    match values.ndim() {
        1 => Ok(values.iter().copied().collect()),
        2 => {
            let mut categories = Vec::with_capacity(values.shape()[0]);
            for lane in values.lanes(Axis(1)) {
                let mut best = 0;
                for (i, &v) in lane.iter().enumerate() {
                    if v > lane[best] {
                        best = i;
                    }
                }
                categories.push(best as f64);
            }
            Ok(categories)
        }
        n => Err(MetricError::InvalidNominalRank(n)),
    }
}

/// Paired integer categories ready for binning.
///
/// Arg-max reduction happens before the NaN strategy; `Drop` removes a
/// pair when either side is NaN. Values truncate toward zero, so range
/// checks stay with the caller.
pub(crate) fn paired_categories(
    preds: &ArrayD<f64>,
    target: &ArrayD<f64>,
    strategy: NanStrategy,
) -> Result<Vec<(i64, i64)>> {
    let pred_cats = to_categories(preds)?;
    let target_cats = to_categories(target)?;
    if pred_cats.len() != target_cats.len() {
        return Err(MetricError::MismatchedLengths {
            left: pred_cats.len(),
            right: target_cats.len(),
        });
    }

    let mut pairs = Vec::with_capacity(pred_cats.len());
    for (&p, &t) in pred_cats.iter().zip(&target_cats) {
        let (p, t) = match strategy {
            NanStrategy::Replace(value) => (
                if p.is_nan() { value } else { p },
                if t.is_nan() { value } else { t },
            ),
            NanStrategy::Drop => {
                if p.is_nan() || t.is_nan() {
                    continue;
                }
                (p, t)
            }
        };
        pairs.push((p as i64, t as i64));
    }
    Ok(pairs)
}

/// Bound-check pairs against the class count.
pub(crate) fn check_pairs(
    pairs: &[(i64, i64)],
    num_classes: usize,
) -> Result<Vec<(usize, usize)>> {
    let mut checked = Vec::with_capacity(pairs.len());
    for &(p, t) in pairs {
        for label in [p, t] {
            if label < 0 || label >= num_classes as i64 {
                return Err(MetricError::LabelOutOfRange { label, num_classes });
            }
        }
        checked.push((p as usize, t as usize));
    }
    Ok(checked)
}

/// Copy of the table without all-zero rows and columns, as float.
pub(crate) fn drop_empty_rows_and_cols(table: &Array2<i64>) -> Array2<f64> {
    let rows: Vec<usize> = (0..table.nrows())
        .filter(|&r| table.row(r).sum() > 0)
        .collect();
    let cols: Vec<usize> = (0..table.ncols())
        .filter(|&c| table.column(c).sum() > 0)
        .collect();
    let mut dense = Array2::zeros((rows.len(), cols.len()));
    for (ri, &r) in rows.iter().enumerate() {
        for (ci, &c) in cols.iter().enumerate() {
            dense[[ri, ci]] = table[[r, c]] as f64;
        }
    }
    dense
}

#[cfg(test)]
mod tests {
    use ndarray::IxDyn;

    use super::*;

    fn floats(values: &[f64]) -> ArrayD<f64> {
        ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.to_vec()).unwrap()
    }

    #[test]
    fn test_one_dimensional_passthrough() {
        let pairs = paired_categories(
            &floats(&[0.0, 1.0, 2.0]),
            &floats(&[2.0, 1.0, 0.0]),
            NanStrategy::default(),
        )
        .unwrap();
        assert_eq!(pairs, vec![(0, 2), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_scores_collapse_to_argmax() {
        let scores = ArrayD::from_shape_vec(
            IxDyn(&[3, 2]),
            vec![0.9, 0.1, 0.2, 0.8, 0.4, 0.6],
        )
        .unwrap();
        let pairs =
            paired_categories(&scores, &floats(&[0.0, 1.0, 1.0]), NanStrategy::default())
                .unwrap();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (1, 1)]);
    }

    #[test]
    fn test_rejects_higher_rank() {
        let cube = ArrayD::from_shape_vec(IxDyn(&[1, 1, 2]), vec![0.0, 1.0]).unwrap();
        let err =
            paired_categories(&cube, &floats(&[0.0]), NanStrategy::default()).unwrap_err();
        assert!(matches!(err, MetricError::InvalidNominalRank(3)));
    }

    #[test]
    fn test_nan_replace_substitutes_value() {
        let pairs = paired_categories(
            &floats(&[f64::NAN, 1.0]),
            &floats(&[1.0, f64::NAN]),
            NanStrategy::Replace(0.0),
        )
        .unwrap();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_nan_drop_removes_pair() {
        let pairs = paired_categories(
            &floats(&[f64::NAN, 1.0, 0.0]),
            &floats(&[1.0, f64::NAN, 0.0]),
            NanStrategy::Drop,
        )
        .unwrap();
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn test_categories_truncate_toward_zero() {
        let pairs = paired_categories(
            &floats(&[2.7, 0.4]),
            &floats(&[1.0, 1.0]),
            NanStrategy::default(),
        )
        .unwrap();
        assert_eq!(pairs, vec![(2, 1), (0, 1)]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = paired_categories(
            &floats(&[0.0, 1.0]),
            &floats(&[0.0]),
            NanStrategy::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MetricError::MismatchedLengths { left: 2, right: 1 }
        ));
    }

    #[test]
    fn test_check_pairs_bounds() {
        assert_eq!(
            check_pairs(&[(0, 1), (1, 0)], 2).unwrap(),
            vec![(0, 1), (1, 0)]
        );
        let err = check_pairs(&[(0, 2)], 2).unwrap_err();
        assert!(matches!(
            err,
            MetricError::LabelOutOfRange {
                label: 2,
                num_classes: 2
            }
        ));
        let err = check_pairs(&[(-1, 0)], 2).unwrap_err();
        assert!(matches!(err, MetricError::LabelOutOfRange { label: -1, .. }));
    }

    #[test]
    fn test_drop_empty_rows_and_cols() {
        // Middle row and middle column carry no observations
        let mut table = Array2::zeros((3, 3));
        table[[0, 0]] = 2;
        table[[0, 2]] = 1;
        table[[2, 2]] = 3;
        let dense = drop_empty_rows_and_cols(&table);
        assert_eq!(dense.shape(), &[2, 2]);
        assert_eq!(dense[[0, 0]], 2.0);
        assert_eq!(dense[[0, 1]], 1.0);
        assert_eq!(dense[[1, 0]], 0.0);
        assert_eq!(dense[[1, 1]], 3.0);
    }
}
