//! Prediction inputs, score normalization, and label validation

use ndarray::{ArrayD, ArrayView1, Axis, IxDyn};

use crate::error::{MetricError, Result};

/// Model outputs fed to classification metrics
///
/// `Labels` carries hard decisions, `Scores` carries probabilities or
/// logits. Scores outside [0, 1] are treated as logits and pushed
/// through a logistic transform before thresholding.
#[derive(Clone, Debug)]
pub enum Predictions {
    /// Discrete class indices (binary and multilabel: values in {0, 1})
    Labels(ArrayD<i64>),
    /// Probabilities or logits; multiclass expects the class axis at position 1
    Scores(ArrayD<f64>),
}

impl Predictions {
    /// Shape of the underlying array
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Predictions::Labels(a) => a.shape(),
            Predictions::Scores(a) => a.shape(),
        }
    }

    /// Number of dimensions of the underlying array
    #[must_use]
    pub fn ndim(&self) -> usize {
        match self {
            Predictions::Labels(a) => a.ndim(),
            Predictions::Scores(a) => a.ndim(),
        }
    }
}

impl From<ArrayD<i64>> for Predictions {
    fn from(labels: ArrayD<i64>) -> Self {
        Predictions::Labels(labels)
    }
}

impl From<ArrayD<f64>> for Predictions {
    fn from(scores: ArrayD<f64>) -> Self {
        Predictions::Scores(scores)
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid
    if x >= 0.0 {
        let exp_neg = (-x).exp();
        1.0 / (1.0 + exp_neg)
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

/// Map scores to probabilities: identity when already confined to
/// [0, 1], otherwise a logistic transform of every value.
pub(crate) fn normalize_scores(scores: &ArrayD<f64>) -> ArrayD<f64> {
    let confined = scores.iter().all(|&v| (0.0..=1.0).contains(&v));
    if confined {
        scores.clone()
    } else {
        scores.mapv(sigmoid)
    }
}

/// Threshold normalized scores into {0, 1} decisions.
pub(crate) fn binarize_scores(scores: &ArrayD<f64>, threshold: f64) -> ArrayD<i64> {
    normalize_scores(scores).mapv(|v| i64::from(v > threshold))
}

/// The `k` highest-scoring class indices, ties broken toward the lower
/// index so the selection is deterministic.
pub(crate) fn top_k_indices(scores: ArrayView1<'_, f64>, k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order.truncate(k);
    order
}

pub(crate) fn check_same_shape(preds: &[usize], target: &[usize]) -> Result<()> {
    if preds == target {
        Ok(())
    } else {
        Err(MetricError::ShapeMismatch {
            preds: preds.to_vec(),
            target: target.to_vec(),
        })
    }
}

/// Scores must carry the class axis at position 1 and otherwise mirror
/// the target shape: (N, C, ...) against (N, ...).
pub(crate) fn check_multiclass_score_shape(
    scores: &[usize],
    target: &[usize],
    num_classes: usize,
) -> Result<()> {
    let ok = !target.is_empty()
        && scores.len() == target.len() + 1
        && scores[0] == target[0]
        && scores[1] == num_classes
        && scores[2..] == target[1..];
    if ok {
        Ok(())
    } else {
        Err(MetricError::ShapeMismatch {
            preds: scores.to_vec(),
            target: target.to_vec(),
        })
    }
}

/// Collapse the class axis (position 1) to the index of the highest
/// score, ties toward the lower index.
pub(crate) fn argmax_labels(scores: &ArrayD<f64>) -> Result<ArrayD<i64>> {
    let mut shape: Vec<usize> = scores.shape().to_vec();
    shape.remove(1);
    let mut flat = Vec::with_capacity(shape.iter().product());
    for lane in scores.lanes(Axis(1)) {
        flat.push(top_k_indices(lane, 1).first().copied().unwrap_or(0) as i64);
    }
    ArrayD::from_shape_vec(IxDyn(&shape), flat)
        .map_err(|e| MetricError::Internal(format!("argmax shape build error: {e}")))
}

/// Every value must be 0 or 1; `allow` extends the set by a sentinel.
pub(crate) fn check_binary_values(values: &ArrayD<i64>, allow: Option<i64>) -> Result<()> {
    for &v in values {
        if v != 0 && v != 1 && Some(v) != allow {
            return Err(MetricError::NotBinary(v));
        }
    }
    Ok(())
}

/// Every value must fall in `0..num_classes`; `allow` extends the set
/// by a sentinel.
pub(crate) fn check_class_values(
    values: &ArrayD<i64>,
    num_classes: usize,
    allow: Option<i64>,
) -> Result<()> {
    for &v in values {
        if Some(v) == allow {
            continue;
        }
        if v < 0 || v >= num_classes as i64 {
            return Err(MetricError::LabelOutOfRange {
                label: v,
                num_classes,
            });
        }
    }
    Ok(())
}

pub(crate) fn check_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(MetricError::InvalidThreshold(threshold))
    }
}
