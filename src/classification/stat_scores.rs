//! Stat scores: streaming tp/fp/tn/fn/support counting
//!
//! The counting path is shared by every derived classification metric:
//! predictions are normalized to discrete decisions, positions matching
//! the ignore index are dropped, per-class counts accumulate in wide
//! integers, and an averaging policy shapes the report.

use std::str::FromStr;

use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::metric::Metric;

use super::average::{Average, MultidimAverage};
use super::counts::{count_binary, reduce_scope, rows_to_array, Accum, StatCounts};
use super::input::{
    binarize_scores, check_binary_values, check_class_values, check_multiclass_score_shape,
    check_same_shape, check_threshold, top_k_indices, Predictions,
};

/// Configuration for [`BinaryStatScores`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BinaryStatScoresConfig {
    /// Decision threshold applied to probability scores
    pub threshold: f64,
    /// Reduction over extra input dimensions
    pub multidim_average: MultidimAverage,
    /// Target value excluded from counting
    pub ignore_index: Option<i64>,
}

impl Default for BinaryStatScoresConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            multidim_average: MultidimAverage::Global,
            ignore_index: None,
        }
    }
}

impl BinaryStatScoresConfig {
    fn validate(&self) -> Result<()> {
        check_threshold(self.threshold)
    }
}

/// Configuration for [`MulticlassStatScores`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MulticlassStatScoresConfig {
    /// Number of classes; labels live in `0..num_classes`
    pub num_classes: usize,
    /// Score predictions count as hits when the true class is among the
    /// `top_k` highest-scoring classes
    pub top_k: usize,
    /// Averaging policy for the per-class rows
    pub average: Average,
    /// Reduction over extra input dimensions
    pub multidim_average: MultidimAverage,
    /// Target value excluded from counting
    pub ignore_index: Option<i64>,
}

impl MulticlassStatScoresConfig {
    /// Default policies for the given class count
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            top_k: 1,
            average: Average::default(),
            multidim_average: MultidimAverage::default(),
            ignore_index: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.num_classes < 2 {
            return Err(MetricError::InvalidNumClasses(self.num_classes));
        }
        if self.top_k < 1 || self.top_k > self.num_classes {
            return Err(MetricError::InvalidTopK {
                top_k: self.top_k,
                num_classes: self.num_classes,
            });
        }
        Ok(())
    }
}

/// Configuration for [`MultilabelStatScores`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MultilabelStatScoresConfig {
    /// Number of labels along axis 1 of the inputs
    pub num_labels: usize,
    /// Decision threshold applied to probability scores
    pub threshold: f64,
    /// Averaging policy for the per-label rows
    pub average: Average,
    /// Reduction over extra input dimensions
    pub multidim_average: MultidimAverage,
    /// Target value excluded from counting
    pub ignore_index: Option<i64>,
}

impl MultilabelStatScoresConfig {
    /// Default policies for the given label count
    #[must_use]
    pub fn new(num_labels: usize) -> Self {
        Self {
            num_labels,
            threshold: 0.5,
            average: Average::default(),
            multidim_average: MultidimAverage::default(),
            ignore_index: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.num_labels < 2 {
            return Err(MetricError::InvalidNumLabels(self.num_labels));
        }
        check_threshold(self.threshold)
    }
}

/// Per-position counting over prediction sets against one class space.
///
/// Every recorded position contributes exactly one count to every class
/// slot; whatever is not tp, fp, or fn for a class is its tn.
struct Tally {
    counts: Vec<StatCounts>,
    seen: i64,
}

impl Tally {
    fn new(num_classes: usize) -> Self {
        Self {
            counts: vec![StatCounts::default(); num_classes],
            seen: 0,
        }
    }

    /// `pred_set` holds distinct class indices; both it and `target`
    /// must already be range-checked.
    fn record(&mut self, pred_set: &[usize], target: usize) {
        self.seen += 1;
        let mut hit = false;
        for &class in pred_set {
            if class == target {
                self.counts[class].true_positives += 1;
                hit = true;
            } else {
                self.counts[class].false_positives += 1;
            }
        }
        if !hit {
            self.counts[target].false_negatives += 1;
        }
    }

    fn finish(mut self) -> Vec<StatCounts> {
        for c in &mut self.counts {
            c.true_negatives =
                self.seen - c.true_positives - c.false_positives - c.false_negatives;
        }
        self.counts
    }
}

/// Streaming confusion counter for binary tasks.
///
/// Output shape: `(5)` under global reduction, `(n_samples, 5)` under
/// samplewise, rows ordered tp, fp, tn, fn, support.
#[derive(Clone, Debug)]
pub struct BinaryStatScores {
    config: BinaryStatScoresConfig,
    state: Accum,
}

impl BinaryStatScores {
    /// # Errors
    /// Returns an error when the threshold falls outside [0, 1].
    pub fn new(config: BinaryStatScoresConfig) -> Result<Self> {
        config.validate()?;
        let state = Accum::new(config.multidim_average, 1);
        Ok(Self { config, state })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &BinaryStatScoresConfig {
        &self.config
    }

    fn decisions(&self, preds: &Predictions) -> Result<ArrayD<i64>> {
        match preds {
            Predictions::Labels(labels) => {
                check_binary_values(labels, None)?;
                Ok(labels.clone())
            }
            Predictions::Scores(scores) => Ok(binarize_scores(scores, self.config.threshold)),
        }
    }
}

impl<'a> Metric<'a> for BinaryStatScores {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = ArrayD<f64>;

    fn update(&mut self, (preds, target): Self::Input) -> Result<()> {
        check_same_shape(preds.shape(), target.shape())?;
        check_binary_values(target, self.config.ignore_index)?;
        let decisions = self.decisions(preds)?;
        let ignore = self.config.ignore_index;
        match self.config.multidim_average {
            MultidimAverage::Global => {
                let scope =
                    count_binary(decisions.iter().copied().zip(target.iter().copied()), ignore);
                self.state.add_global(&[scope]);
            }
            MultidimAverage::Samplewise => {
                if target.ndim() < 2 {
                    return Err(MetricError::SamplewiseRank(target.ndim()));
                }
                for (pred_row, target_row) in
                    decisions.axis_iter(Axis(0)).zip(target.axis_iter(Axis(0)))
                {
                    let scope = count_binary(
                        pred_row.iter().copied().zip(target_row.iter().copied()),
                        ignore,
                    );
                    self.state.push_sample(vec![scope]);
                }
            }
        }
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        match &self.state {
            Accum::Global(slots) => {
                let scope = slots.first().copied().unwrap_or_default();
                rows_to_array(vec![scope.row()], &[5])
            }
            Accum::Samplewise(samples) => {
                let rows: Vec<[f64; 5]> = samples
                    .iter()
                    .map(|s| s.first().copied().unwrap_or_default().row())
                    .collect();
                let shape = [rows.len(), 5];
                rows_to_array(rows, &shape)
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
        "binary_stat_scores"
    }
}

/// Streaming confusion counter for multiclass tasks.
///
/// Accepts hard labels of the target's shape or scores with the class
/// axis at position 1. Output shape: `(num_classes, 5)` or `(5)` under
/// global reduction, `(n_samples, num_classes, 5)` or `(n_samples, 5)`
/// under samplewise.
#[derive(Clone, Debug)]
pub struct MulticlassStatScores {
    config: MulticlassStatScoresConfig,
    state: Accum,
}

impl MulticlassStatScores {
    /// # Errors
    /// Returns an error when `num_classes` is below 2 or `top_k` falls
    /// outside `1..=num_classes`.
    pub fn new(config: MulticlassStatScoresConfig) -> Result<Self> {
        config.validate()?;
        let state = Accum::new(config.multidim_average, config.num_classes);
        Ok(Self { config, state })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &MulticlassStatScoresConfig {
        &self.config
    }

    fn update_labels(&mut self, labels: &ArrayD<i64>, target: &ArrayD<i64>) -> Result<()> {
        if self.config.top_k > 1 {
            return Err(MetricError::TopKRequiresScores);
        }
        check_same_shape(labels.shape(), target.shape())?;
        check_class_values(labels, self.config.num_classes, None)?;
        check_class_values(target, self.config.num_classes, self.config.ignore_index)?;

        let ignore = self.config.ignore_index;
        match self.config.multidim_average {
            MultidimAverage::Global => {
                let mut tally = Tally::new(self.config.num_classes);
                for (&p, &t) in labels.iter().zip(target.iter()) {
                    if Some(t) == ignore {
                        continue;
                    }
                    tally.record(&[p as usize], t as usize);
                }
                self.state.add_global(&tally.finish());
            }
            MultidimAverage::Samplewise => {
                if target.ndim() < 2 {
                    return Err(MetricError::SamplewiseRank(target.ndim()));
                }
                for (pred_row, target_row) in
                    labels.axis_iter(Axis(0)).zip(target.axis_iter(Axis(0)))
                {
                    let mut tally = Tally::new(self.config.num_classes);
                    for (&p, &t) in pred_row.iter().zip(target_row.iter()) {
                        if Some(t) == ignore {
                            continue;
                        }
                        tally.record(&[p as usize], t as usize);
                    }
                    self.state.push_sample(tally.finish());
                }
            }
        }
        Ok(())
    }

    fn update_scores(&mut self, scores: &ArrayD<f64>, target: &ArrayD<i64>) -> Result<()> {
        check_multiclass_score_shape(scores.shape(), target.shape(), self.config.num_classes)?;
        check_class_values(target, self.config.num_classes, self.config.ignore_index)?;

        let ignore = self.config.ignore_index;
        let k = self.config.top_k;
        match self.config.multidim_average {
            MultidimAverage::Global => {
                // Lanes along the class axis pair up with the flattened
                // target in row-major order
                let mut tally = Tally::new(self.config.num_classes);
                for (lane, &t) in scores.lanes(Axis(1)).into_iter().zip(target.iter()) {
                    if Some(t) == ignore {
                        continue;
                    }
                    tally.record(&top_k_indices(lane, k), t as usize);
                }
                self.state.add_global(&tally.finish());
            }
            MultidimAverage::Samplewise => {
                if target.ndim() < 2 {
                    return Err(MetricError::SamplewiseRank(target.ndim()));
                }
                for (scores_row, target_row) in
                    scores.axis_iter(Axis(0)).zip(target.axis_iter(Axis(0)))
                {
                    let mut tally = Tally::new(self.config.num_classes);
                    for (lane, &t) in scores_row.lanes(Axis(0)).into_iter().zip(target_row.iter())
                    {
                        if Some(t) == ignore {
                            continue;
                        }
                        tally.record(&top_k_indices(lane, k), t as usize);
                    }
                    self.state.push_sample(tally.finish());
                }
            }
        }
        Ok(())
    }
}

impl<'a> Metric<'a> for MulticlassStatScores {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = ArrayD<f64>;

    fn update(&mut self, (preds, target): Self::Input) -> Result<()> {
        match preds {
            Predictions::Labels(labels) => self.update_labels(labels, target),
            Predictions::Scores(scores) => self.update_scores(scores, target),
        }
    }

    fn compute(&self) -> Result<Self::Output> {
        let average = self.config.average;
        let num_classes = self.config.num_classes;
        match &self.state {
            Accum::Global(slots) => {
                let rows = reduce_scope(slots, average);
                match average {
                    Average::None => rows_to_array(rows, &[num_classes, 5]),
                    _ => rows_to_array(rows, &[5]),
                }
            }
            Accum::Samplewise(samples) => {
                let mut rows = Vec::with_capacity(samples.len() * num_classes);
                for sample in samples {
                    rows.extend(reduce_scope(sample, average));
                }
                match average {
                    Average::None => rows_to_array(rows, &[samples.len(), num_classes, 5]),
                    _ => rows_to_array(rows, &[samples.len(), 5]),
                }
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
        "multiclass_stat_scores"
    }
}

/// Streaming confusion counter for multilabel tasks.
///
/// Inputs carry the label axis at position 1 and are counted as
/// independent binary problems per label. Output shape:
/// `(num_labels, 5)` or `(5)` under global reduction,
/// `(n_samples, num_labels, 5)` or `(n_samples, 5)` under samplewise.
#[derive(Clone, Debug)]
pub struct MultilabelStatScores {
    config: MultilabelStatScoresConfig,
    state: Accum,
}

impl MultilabelStatScores {
    /// # Errors
    /// Returns an error when `num_labels` is below 2 or the threshold
    /// falls outside [0, 1].
    pub fn new(config: MultilabelStatScoresConfig) -> Result<Self> {
        config.validate()?;
        let state = Accum::new(config.multidim_average, config.num_labels);
        Ok(Self { config, state })
    }

    /// The validated configuration
    #[must_use]
    pub fn config(&self) -> &MultilabelStatScoresConfig {
        &self.config
    }

    fn decisions(&self, preds: &Predictions) -> Result<ArrayD<i64>> {
        match preds {
            Predictions::Labels(labels) => {
                check_binary_values(labels, None)?;
                Ok(labels.clone())
            }
            Predictions::Scores(scores) => Ok(binarize_scores(scores, self.config.threshold)),
        }
    }
}

impl<'a> Metric<'a> for MultilabelStatScores {
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
        let decisions = self.decisions(preds)?;
        let ignore = self.config.ignore_index;
        match self.config.multidim_average {
            MultidimAverage::Global => {
                let mut per_label = Vec::with_capacity(self.config.num_labels);
                for label in 0..self.config.num_labels {
                    let pred_l = decisions.index_axis(Axis(1), label);
                    let target_l = target.index_axis(Axis(1), label);
                    per_label.push(count_binary(
                        pred_l.iter().copied().zip(target_l.iter().copied()),
                        ignore,
                    ));
                }
                self.state.add_global(&per_label);
            }
            MultidimAverage::Samplewise => {
                if target.ndim() < 3 {
                    return Err(MetricError::SamplewiseRank(target.ndim()));
                }
                for (pred_sample, target_sample) in
                    decisions.axis_iter(Axis(0)).zip(target.axis_iter(Axis(0)))
                {
                    let mut per_label = Vec::with_capacity(self.config.num_labels);
                    for (pred_l, target_l) in pred_sample
                        .axis_iter(Axis(0))
                        .zip(target_sample.axis_iter(Axis(0)))
                    {
                        per_label.push(count_binary(
                            pred_l.iter().copied().zip(target_l.iter().copied()),
                            ignore,
                        ));
                    }
                    self.state.push_sample(per_label);
                }
            }
        }
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        let average = self.config.average;
        let num_labels = self.config.num_labels;
        match &self.state {
            Accum::Global(slots) => {
                let rows = reduce_scope(slots, average);
                match average {
                    Average::None => rows_to_array(rows, &[num_labels, 5]),
                    _ => rows_to_array(rows, &[5]),
                }
            }
            Accum::Samplewise(samples) => {
                let mut rows = Vec::with_capacity(samples.len() * num_labels);
                for sample in samples {
                    rows.extend(reduce_scope(sample, average));
                }
                match average {
                    Average::None => rows_to_array(rows, &[samples.len(), num_labels, 5]),
                    _ => rows_to_array(rows, &[samples.len(), 5]),
                }
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
        "multilabel_stat_scores"
    }
}

/// Classification task family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Binary,
    Multiclass,
    Multilabel,
}

impl FromStr for Task {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "binary" => Ok(Task::Binary),
            "multiclass" => Ok(Task::Multiclass),
            "multilabel" => Ok(Task::Multilabel),
            other => Err(MetricError::InvalidTask(other.to_string())),
        }
    }
}

/// Task-level configuration for the [`StatScores`] wrapper
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StatScoresConfig {
    pub task: Task,
    /// Decision threshold for binary and multilabel scores
    pub threshold: f64,
    /// Required when `task` is [`Task::Multiclass`]
    pub num_classes: Option<usize>,
    /// Required when `task` is [`Task::Multilabel`]
    pub num_labels: Option<usize>,
    /// Multiclass top-k hit counting
    pub top_k: usize,
    pub average: Average,
    pub multidim_average: MultidimAverage,
    pub ignore_index: Option<i64>,
}

impl StatScoresConfig {
    /// Default policies for the given task
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            task,
            threshold: 0.5,
            num_classes: None,
            num_labels: None,
            top_k: 1,
            average: Average::default(),
            multidim_average: MultidimAverage::default(),
            ignore_index: None,
        }
    }
}

/// Stat scores with the task variant fixed at construction
#[derive(Clone, Debug)]
pub enum StatScores {
    Binary(BinaryStatScores),
    Multiclass(MulticlassStatScores),
    Multilabel(MultilabelStatScores),
}

impl StatScores {
    /// # Errors
    /// Returns an error when a field required by the task is missing or
    /// any field fails validation.
    pub fn new(config: StatScoresConfig) -> Result<Self> {
        match config.task {
            Task::Binary => Ok(StatScores::Binary(BinaryStatScores::new(
                BinaryStatScoresConfig {
                    threshold: config.threshold,
                    multidim_average: config.multidim_average,
                    ignore_index: config.ignore_index,
                },
            )?)),
            Task::Multiclass => {
                let num_classes = config.num_classes.ok_or(MetricError::MissingNumClasses)?;
                Ok(StatScores::Multiclass(MulticlassStatScores::new(
                    MulticlassStatScoresConfig {
                        num_classes,
                        top_k: config.top_k,
                        average: config.average,
                        multidim_average: config.multidim_average,
                        ignore_index: config.ignore_index,
                    },
                )?))
            }
            Task::Multilabel => {
                let num_labels = config.num_labels.ok_or(MetricError::MissingNumLabels)?;
                Ok(StatScores::Multilabel(MultilabelStatScores::new(
                    MultilabelStatScoresConfig {
                        num_labels,
                        threshold: config.threshold,
                        average: config.average,
                        multidim_average: config.multidim_average,
                        ignore_index: config.ignore_index,
                    },
                )?))
            }
        }
    }
}

impl<'a> Metric<'a> for StatScores {
    type Input = (&'a Predictions, &'a ArrayD<i64>);
    type Output = ArrayD<f64>;

    fn update(&mut self, input: Self::Input) -> Result<()> {
        match self {
            StatScores::Binary(m) => m.update(input),
            StatScores::Multiclass(m) => m.update(input),
            StatScores::Multilabel(m) => m.update(input),
        }
    }

    fn compute(&self) -> Result<Self::Output> {
        match self {
            StatScores::Binary(m) => m.compute(),
            StatScores::Multiclass(m) => m.compute(),
            StatScores::Multilabel(m) => m.compute(),
        }
    }

    fn merge(&mut self, other: &Self) {
        match (self, other) {
            (StatScores::Binary(a), StatScores::Binary(b)) => a.merge(b),
            (StatScores::Multiclass(a), StatScores::Multiclass(b)) => a.merge(b),
            (StatScores::Multilabel(a), StatScores::Multilabel(b)) => a.merge(b),
            _ => debug_assert!(false, "merge across mismatched tasks"),
        }
    }

    fn reset(&mut self) {
        match self {
            StatScores::Binary(m) => m.reset(),
            StatScores::Multiclass(m) => m.reset(),
            StatScores::Multilabel(m) => m.reset(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StatScores::Binary(m) => m.name(),
            StatScores::Multiclass(m) => m.name(),
            StatScores::Multilabel(m) => m.name(),
        }
    }
}

/// One-shot binary stat scores over a single batch.
///
/// # Errors
/// Returns an error when the configuration or the batch fails
/// validation.
pub fn binary_stat_scores(
    preds: &Predictions,
    target: &ArrayD<i64>,
    config: BinaryStatScoresConfig,
) -> Result<ArrayD<f64>> {
    let mut metric = BinaryStatScores::new(config)?;
    metric.update((preds, target))?;
    metric.compute()
}

/// One-shot multiclass stat scores over a single batch.
///
/// # Errors
/// Returns an error when the configuration or the batch fails
/// validation.
pub fn multiclass_stat_scores(
    preds: &Predictions,
    target: &ArrayD<i64>,
    config: MulticlassStatScoresConfig,
) -> Result<ArrayD<f64>> {
    let mut metric = MulticlassStatScores::new(config)?;
    metric.update((preds, target))?;
    metric.compute()
}

/// One-shot multilabel stat scores over a single batch.
///
/// # Errors
/// Returns an error when the configuration or the batch fails
/// validation.
pub fn multilabel_stat_scores(
    preds: &Predictions,
    target: &ArrayD<i64>,
    config: MultilabelStatScoresConfig,
) -> Result<ArrayD<f64>> {
    let mut metric = MultilabelStatScores::new(config)?;
    metric.update((preds, target))?;
    metric.compute()
}
