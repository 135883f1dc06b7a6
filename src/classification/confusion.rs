//! Streaming confusion matrix for multiclass classification

use std::fmt;

use ndarray::{Array2, ArrayD};

use crate::error::{MetricError, Result};
use crate::metric::Metric;

use super::input::{
    argmax_labels, check_class_values, check_multiclass_score_shape, check_same_shape, Predictions,
};

/// Confusion matrix accumulated over batches
///
/// Element `[t, p]` counts samples with true label `t` predicted as `p`.
/// Score inputs are collapsed to labels along the class axis before
/// tallying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Array2<i64>,
    num_classes: usize,
    ignore_index: Option<i64>,
}

impl ConfusionMatrix {
    /// Create an empty matrix for `num_classes` classes
    ///
    /// # Errors
    /// Returns an error when `num_classes` is below 2.
    pub fn new(num_classes: usize) -> Result<Self> {
        if num_classes < 2 {
            return Err(MetricError::InvalidNumClasses(num_classes));
        }
        Ok(Self {
            matrix: Array2::zeros((num_classes, num_classes)),
            num_classes,
            ignore_index: None,
        })
    }

    /// Like [`ConfusionMatrix::new`], but target positions equal to
    /// `ignore_index` are dropped from the tally
    ///
    /// # Errors
    /// Returns an error when `num_classes` is below 2.
    pub fn with_ignore_index(num_classes: usize, ignore_index: i64) -> Result<Self> {
        let mut matrix = Self::new(num_classes)?;
        matrix.ignore_index = Some(ignore_index);
        Ok(matrix)
    }

    /// The raw counts, rows are true labels and columns predictions
    #[must_use]
    pub fn matrix(&self) -> &Array2<i64> {
        &self.matrix
    }

    /// Number of classes
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// The sentinel dropped from targets, if any
    #[must_use]
    pub fn ignore_index(&self) -> Option<i64> {
        self.ignore_index
    }

    /// Count at `[true_label, predicted_label]`
    #[must_use]
    pub fn get(&self, true_label: usize, predicted_label: usize) -> i64 {
        self.matrix[[true_label, predicted_label]]
    }

    /// Samples of `class` predicted as `class`
    #[must_use]
    pub fn true_positives(&self, class: usize) -> i64 {
        self.matrix[[class, class]]
    }

    /// Samples predicted as `class` whose true label differs
    #[must_use]
    pub fn false_positives(&self, class: usize) -> i64 {
        self.matrix.column(class).sum() - self.true_positives(class)
    }

    /// Samples of `class` predicted as something else
    #[must_use]
    pub fn false_negatives(&self, class: usize) -> i64 {
        self.matrix.row(class).sum() - self.true_positives(class)
    }

    /// Samples neither of `class` nor predicted as it
    #[must_use]
    pub fn true_negatives(&self, class: usize) -> i64 {
        self.total()
            - self.true_positives(class)
            - self.false_positives(class)
            - self.false_negatives(class)
    }

    /// True instances of a class
    #[must_use]
    pub fn support(&self, class: usize) -> i64 {
        self.matrix.row(class).sum()
    }

    /// Samples tallied so far
    #[must_use]
    pub fn total(&self) -> i64 {
        self.matrix.sum()
    }

    /// Fraction of samples on the diagonal, 0.0 before any update
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: i64 = self.matrix.diag().sum();
        correct as f64 / total as f64
    }

    fn tally(&mut self, labels: &ArrayD<i64>, target: &ArrayD<i64>) {
        for (&p, &t) in labels.iter().zip(target.iter()) {
            if Some(t) == self.ignore_index {
                continue;
            }
            self.matrix[[t as usize, p as usize]] += 1;
        }
    }
}

impl<'a> Metric<'a> for ConfusionMatrix {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = Array2<i64>;

    fn update(&mut self, (preds, target): Self::Input) -> Result<()> {
        match preds {
            Predictions::Labels(labels) => {
                check_same_shape(labels.shape(), target.shape())?;
                check_class_values(labels, self.num_classes, None)?;
                check_class_values(target, self.num_classes, self.ignore_index)?;
                self.tally(labels, target);
            }
            Predictions::Scores(scores) => {
                check_multiclass_score_shape(scores.shape(), target.shape(), self.num_classes)?;
                check_class_values(target, self.num_classes, self.ignore_index)?;
                let labels = argmax_labels(scores)?;
                self.tally(&labels, target);
            }
        }
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        Ok(self.matrix.clone())
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.num_classes, other.num_classes);
        self.matrix += &other.matrix;
    }

    fn reset(&mut self) {
        self.matrix.fill(0);
    }

    fn name(&self) -> &'static str {
        "confusion_matrix"
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confusion Matrix:")?;

        // Header
        write!(f, "      ")?;
        for j in 0..self.num_classes {
            write!(f, "Pred {j} ")?;
        }
        writeln!(f)?;

        // Rows
        for i in 0..self.num_classes {
            write!(f, "True {i}")?;
            for j in 0..self.num_classes {
                write!(f, "{:>6} ", self.matrix[[i, j]])?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::IxDyn;

    use super::*;

    fn labels(values: &[i64]) -> ArrayD<i64> {
        ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.to_vec()).unwrap()
    }

    fn filled(num_classes: usize, preds: &[i64], target: &[i64]) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new(num_classes).unwrap();
        cm.update((&Predictions::Labels(labels(preds)), &labels(target)))
            .unwrap();
        cm
    }

    #[test]
    fn test_rejects_single_class() {
        let err = ConfusionMatrix::new(1).unwrap_err();
        assert!(matches!(err, MetricError::InvalidNumClasses(1)));
    }

    #[test]
    fn test_counts_land_at_true_pred() {
        let cm = filled(3, &[0, 2, 2, 2, 0], &[0, 1, 2, 2, 0]);
        assert_eq!(cm.get(0, 0), 2);
        assert_eq!(cm.get(1, 2), 1);
        assert_eq!(cm.get(2, 2), 2);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_per_class_counts() {
        let cm = filled(3, &[0, 2, 2, 2, 0], &[0, 1, 2, 2, 0]);
        // Class 2 attracts the stray prediction from class 1
        assert_eq!(cm.true_positives(2), 2);
        assert_eq!(cm.false_positives(2), 1);
        assert_eq!(cm.false_negatives(2), 0);
        assert_eq!(cm.true_negatives(2), 2);
        assert_eq!(cm.support(2), 2);
        assert_eq!(cm.false_negatives(1), 1);
        assert_eq!(cm.support(1), 1);
    }

    #[test]
    fn test_accuracy() {
        let cm = filled(3, &[0, 2, 2, 2, 0], &[0, 1, 2, 2, 0]);
        assert_relative_eq!(cm.accuracy(), 0.8);
        let empty = ConfusionMatrix::new(3).unwrap();
        assert_relative_eq!(empty.accuracy(), 0.0);
    }

    #[test]
    fn test_scores_collapse_to_argmax() {
        let probs = ArrayD::from_shape_vec(
            IxDyn(&[3, 3]),
            vec![0.35, 0.4, 0.25, 0.1, 0.5, 0.4, 0.2, 0.1, 0.7],
        )
        .unwrap();
        let mut cm = ConfusionMatrix::new(3).unwrap();
        cm.update((&Predictions::Scores(probs), &labels(&[0, 1, 2])))
            .unwrap();
        // Argmax labels are [1, 1, 2]
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 1), 1);
        assert_eq!(cm.get(2, 2), 1);
        assert_relative_eq!(cm.accuracy(), 2.0 / 3.0);
    }

    #[test]
    fn test_ignore_index_drops_positions() {
        let mut cm = ConfusionMatrix::with_ignore_index(2, -1).unwrap();
        cm.update((&Predictions::Labels(labels(&[0, 0, 1])), &labels(&[0, -1, 1])))
            .unwrap();
        assert_eq!(cm.total(), 2);
        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(1, 1), 1);
    }

    #[test]
    fn test_rejects_out_of_range_labels() {
        let mut cm = ConfusionMatrix::new(2).unwrap();
        let err = cm
            .update((&Predictions::Labels(labels(&[0, 2])), &labels(&[0, 1])))
            .unwrap_err();
        assert!(matches!(err, MetricError::LabelOutOfRange { label: 2, .. }));
        // Rejected batches leave the state untouched
        assert_eq!(cm.total(), 0);
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let mut cm = ConfusionMatrix::new(2).unwrap();
        let err = cm
            .update((&Predictions::Labels(labels(&[0, 1, 0])), &labels(&[0, 1])))
            .unwrap_err();
        assert!(matches!(err, MetricError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_merge_matches_one_shot() {
        let mut left = filled(3, &[0, 2], &[0, 1]);
        let right = filled(3, &[2, 2, 0], &[2, 2, 0]);
        left.merge(&right);
        let one_shot = filled(3, &[0, 2, 2, 2, 0], &[0, 1, 2, 2, 0]);
        assert_eq!(left.matrix(), one_shot.matrix());
    }

    #[test]
    fn test_reset_zeroes_counts() {
        let mut cm = filled(2, &[0, 1], &[0, 1]);
        cm.reset();
        assert_eq!(cm.total(), 0);
        assert_eq!(cm.compute().unwrap(), Array2::<i64>::zeros((2, 2)));
    }

    #[test]
    fn test_display_lists_rows_and_columns() {
        let cm = filled(2, &[0, 1], &[0, 1]);
        let text = cm.to_string();
        assert!(text.contains("Confusion Matrix:"));
        assert!(text.contains("Pred 0"));
        assert!(text.contains("True 1"));
    }
}
