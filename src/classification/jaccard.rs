//! Jaccard index (intersection over union) for classification tasks
//!
//! Scores derive from accumulated confusion counts: for a class `c`,
//! `J_c = tp_c / (tp_c + fp_c + fn_c)` with `0/0` reported as 0.0.

use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::metric::Metric;

use super::average::Average;
use super::confusion::ConfusionMatrix;
use super::counts::{count_binary, StatCounts};
use super::input::{
    binarize_scores, check_binary_values, check_same_shape, check_threshold, Predictions,
};

fn safe_divide(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

fn scalar(value: f64) -> ArrayD<f64> {
    ArrayD::from_elem(IxDyn(&[]), value)
}

/// Configuration for [`BinaryJaccardIndex`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BinaryJaccardIndexConfig {
    /// Decision cut for probabilistic predictions
    pub threshold: f64,
    /// Target value excluded from the tally
    pub ignore_index: Option<i64>,
}

impl Default for BinaryJaccardIndexConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            ignore_index: None,
        }
    }
}

/// Configuration for [`MulticlassJaccardIndex`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MulticlassJaccardIndexConfig {
    pub num_classes: usize,
    pub average: Average,
    /// Target value excluded from the tally; a value inside `[0,
    /// num_classes)` additionally zeroes that class's score and weight
    pub ignore_index: Option<i64>,
}

impl MulticlassJaccardIndexConfig {
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            average: Average::default(),
            ignore_index: None,
        }
    }
}

/// Configuration for [`MultilabelJaccardIndex`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MultilabelJaccardIndexConfig {
    pub num_labels: usize,
    /// Decision cut for probabilistic predictions
    pub threshold: f64,
    pub average: Average,
    /// Target value excluded from the tally
    pub ignore_index: Option<i64>,
}

impl MultilabelJaccardIndexConfig {
    #[must_use]
    pub fn new(num_labels: usize) -> Self {
        Self {
            num_labels,
            threshold: 0.5,
            average: Average::default(),
            ignore_index: None,
        }
    }
}

/// Intersection over union of the positive class.
#[derive(Clone, Debug)]
pub struct BinaryJaccardIndex {
    config: BinaryJaccardIndexConfig,
    state: StatCounts,
}

impl BinaryJaccardIndex {
    /// # Errors
    /// Returns an error when the threshold falls outside `[0, 1]`.
    pub fn new(config: BinaryJaccardIndexConfig) -> Result<Self> {
        check_threshold(config.threshold)?;
        Ok(Self {
            config,
            state: StatCounts::default(),
        })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &BinaryJaccardIndexConfig {
        &self.config
    }
}

impl<'a> Metric<'a> for BinaryJaccardIndex {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = f64;

    fn update(&mut self, (preds, target): Self::Input) -> Result<()> {
        check_same_shape(preds.shape(), target.shape())?;
        check_binary_values(target, self.config.ignore_index)?;
        let decisions = match preds {
            Predictions::Labels(labels) => {
                check_binary_values(labels, None)?;
                labels.clone()
            }
            Predictions::Scores(scores) => binarize_scores(scores, self.config.threshold),
        };
        let batch = count_binary(
            decisions.iter().copied().zip(target.iter().copied()),
            self.config.ignore_index,
        );
        self.state.add(&batch);
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        let c = self.state;
        Ok(safe_divide(
            c.true_positives as f64,
            (c.true_positives + c.false_positives + c.false_negatives) as f64,
        ))
    }

    fn merge(&mut self, other: &Self) {
        self.state.add(&other.state);
    }

    fn reset(&mut self) {
        self.state = StatCounts::default();
    }

    fn name(&self) -> &'static str {
        "binary_jaccard_index"
    }
}

/// Per-class intersection over union backed by a confusion matrix.
///
/// `none` yields one score per class; `micro` pools all classes;
/// `macro` averages over classes that appear in the data (union above
/// zero); `weighted` weights classes by support.
#[derive(Clone, Debug)]
pub struct MulticlassJaccardIndex {
    config: MulticlassJaccardIndexConfig,
    state: ConfusionMatrix,
}

impl MulticlassJaccardIndex {
    /// # Errors
    /// Returns an error when `num_classes` is below 2.
    pub fn new(config: MulticlassJaccardIndexConfig) -> Result<Self> {
        let state = match config.ignore_index {
            Some(sentinel) => ConfusionMatrix::with_ignore_index(config.num_classes, sentinel)?,
            None => ConfusionMatrix::new(config.num_classes)?,
        };
        Ok(Self { config, state })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &MulticlassJaccardIndexConfig {
        &self.config
    }

    /// Class index silenced by the ignore sentinel, when it lands
    /// inside the class range
    fn ignored_class(&self) -> Option<usize> {
        self.config
            .ignore_index
            .filter(|&v| v >= 0 && (v as usize) < self.config.num_classes)
            .map(|v| v as usize)
    }
}

impl<'a> Metric<'a> for MulticlassJaccardIndex {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = ArrayD<f64>;

    fn update(&mut self, input: Self::Input) -> Result<()> {
        self.state.update(input)
    }

    fn compute(&self) -> Result<Self::Output> {
        let num_classes = self.config.num_classes;
        let matrix = self.state.matrix();
        // An in-range ignore sentinel leaves its row zero at update
        // time, so only scores and weights still need silencing.
        let ignored = self.ignored_class();

        let mut scores = vec![0.0; num_classes];
        let mut nums = vec![0.0; num_classes];
        let mut denoms = vec![0.0; num_classes];
        let mut present = vec![false; num_classes];
        for class in 0..num_classes {
            let diag = matrix[[class, class]] as f64;
            let row = self.state.support(class) as f64;
            let col = matrix.column(class).sum() as f64;
            nums[class] = diag;
            denoms[class] = row + col - diag;
            scores[class] = safe_divide(diag, denoms[class]);
            present[class] = row + col > 0.0;
        }

        match self.config.average {
            Average::None => ArrayD::from_shape_vec(IxDyn(&[num_classes]), scores)
                .map_err(|e| MetricError::Internal(format!("output shape build error: {e}"))),
            Average::Micro => Ok(scalar(safe_divide(
                nums.iter().sum(),
                denoms.iter().sum(),
            ))),
            Average::Macro => {
                let mut total = 0.0;
                let mut weight_sum = 0.0;
                for class in 0..num_classes {
                    if Some(class) == ignored || !present[class] {
                        continue;
                    }
                    total += scores[class];
                    weight_sum += 1.0;
                }
                Ok(scalar(safe_divide(total, weight_sum)))
            }
            Average::Weighted => {
                let mut total = 0.0;
                let mut weight_sum = 0.0;
                for class in 0..num_classes {
                    if Some(class) == ignored {
                        continue;
                    }
                    let weight = self.state.support(class) as f64;
                    total += weight * scores[class];
                    weight_sum += weight;
                }
                Ok(scalar(safe_divide(total, weight_sum)))
            }
        }
    }

    fn merge(&mut self, other: &Self) {
        self.state.merge(&other.state);
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn name(&self) -> &'static str {
        "multiclass_jaccard_index"
    }
}

/// Per-label binary intersection over union.
///
/// `macro` is the plain mean over all labels, absent ones included;
/// `micro` pools every label into one binary problem.
#[derive(Clone, Debug)]
pub struct MultilabelJaccardIndex {
    config: MultilabelJaccardIndexConfig,
    state: Vec<StatCounts>,
}

impl MultilabelJaccardIndex {
    /// # Errors
    /// Returns an error when `num_labels` is below 2 or the threshold
    /// falls outside `[0, 1]`.
    pub fn new(config: MultilabelJaccardIndexConfig) -> Result<Self> {
        if config.num_labels < 2 {
            return Err(MetricError::InvalidNumLabels(config.num_labels));
        }
        check_threshold(config.threshold)?;
        Ok(Self {
            config,
            state: vec![StatCounts::default(); config.num_labels],
        })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &MultilabelJaccardIndexConfig {
        &self.config
    }

    fn label_score(&self, label: usize) -> f64 {
        let c = self.state[label];
        safe_divide(
            c.true_positives as f64,
            (c.true_positives + c.false_positives + c.false_negatives) as f64,
        )
    }
}

impl<'a> Metric<'a> for MultilabelJaccardIndex {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = ArrayD<f64>;

    fn update(&mut self, (preds, target): Self::Input) -> Result<()> {
        check_same_shape(preds.shape(), target.shape())?;
        if target.ndim() < 2 || target.shape()[1] != self.config.num_labels {
            return Err(MetricError::ShapeMismatch {
                preds: preds.shape().to_vec(),
                target: target.shape().to_vec(),
            });
        }
        check_binary_values(target, self.config.ignore_index)?;
        let decisions = match preds {
            Predictions::Labels(labels) => {
                check_binary_values(labels, None)?;
                labels.clone()
            }
            Predictions::Scores(scores) => binarize_scores(scores, self.config.threshold),
        };
        for label in 0..self.config.num_labels {
            let pred_l = decisions.index_axis(Axis(1), label);
            let target_l = target.index_axis(Axis(1), label);
            let batch = count_binary(
                pred_l.iter().copied().zip(target_l.iter().copied()),
                self.config.ignore_index,
            );
            self.state[label].add(&batch);
        }
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        let num_labels = self.config.num_labels;
        match self.config.average {
            Average::None => {
                let scores: Vec<f64> = (0..num_labels).map(|l| self.label_score(l)).collect();
                ArrayD::from_shape_vec(IxDyn(&[num_labels]), scores)
                    .map_err(|e| MetricError::Internal(format!("output shape build error: {e}")))
            }
            Average::Micro => {
                let mut pooled = StatCounts::default();
                for c in &self.state {
                    pooled.add(c);
                }
                Ok(scalar(safe_divide(
                    pooled.true_positives as f64,
                    (pooled.true_positives + pooled.false_positives + pooled.false_negatives)
                        as f64,
                )))
            }
            Average::Macro => {
                let total: f64 = (0..num_labels).map(|l| self.label_score(l)).sum();
                Ok(scalar(total / num_labels as f64))
            }
            Average::Weighted => {
                let mut total = 0.0;
                let mut weight_sum = 0.0;
                for label in 0..num_labels {
                    let weight = self.state[label].support() as f64;
                    total += weight * self.label_score(label);
                    weight_sum += weight;
                }
                Ok(scalar(safe_divide(total, weight_sum)))
            }
        }
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.state.len(), other.state.len());
        for (slot, extra) in self.state.iter_mut().zip(&other.state) {
            slot.add(extra);
        }
    }

    fn reset(&mut self) {
        for slot in &mut self.state {
            *slot = StatCounts::default();
        }
    }

    fn name(&self) -> &'static str {
        "multilabel_jaccard_index"
    }
}

/// One-shot binary Jaccard index over a single batch.
///
/// # Errors
/// Returns an error when the configuration or input validation fails.
pub fn binary_jaccard_index(
    preds: &Predictions,
    target: &ArrayD<i64>,
    config: BinaryJaccardIndexConfig,
) -> Result<f64> {
    let mut metric = BinaryJaccardIndex::new(config)?;
    metric.update((preds, target))?;
    metric.compute()
}

/// One-shot multiclass Jaccard index over a single batch.
///
/// # Errors
/// Returns an error when the configuration or input validation fails.
pub fn multiclass_jaccard_index(
    preds: &Predictions,
    target: &ArrayD<i64>,
    config: MulticlassJaccardIndexConfig,
) -> Result<ArrayD<f64>> {
    let mut metric = MulticlassJaccardIndex::new(config)?;
    metric.update((preds, target))?;
    metric.compute()
}

/// One-shot multilabel Jaccard index over a single batch.
///
/// # Errors
/// Returns an error when the configuration or input validation fails.
pub fn multilabel_jaccard_index(
    preds: &Predictions,
    target: &ArrayD<i64>,
    config: MultilabelJaccardIndexConfig,
) -> Result<ArrayD<f64>> {
    let mut metric = MultilabelJaccardIndex::new(config)?;
    metric.update((preds, target))?;
    metric.compute()
}
