//! R-precision for grouped retrieval results
//!
//! Measures, per query, the fraction of relevant documents among the
//! top `R` ranked predictions, where `R` is that query's number of
//! relevant documents. Query scores are then aggregated into a single
//! corpus value.

use std::collections::BTreeMap;
use std::str::FromStr;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::metric::Metric;

/// What a query group without a single relevant document contributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTargetAction {
    /// Drop the group from the aggregate
    Skip,
    /// Score the group 0.0
    #[default]
    Neg,
    /// Score the group 1.0
    Pos,
    /// Fail the computation
    Error,
}

impl FromStr for EmptyTargetAction {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(EmptyTargetAction::Skip),
            "neg" => Ok(EmptyTargetAction::Neg),
            "pos" => Ok(EmptyTargetAction::Pos),
            "error" => Ok(EmptyTargetAction::Error),
            other => Err(MetricError::InvalidEmptyTargetAction(other.to_string())),
        }
    }
}

/// How per-query scores collapse into the corpus value.
///
/// `Median` takes the lower middle element on even counts. `Custom`
/// receives the query scores in ascending query-id order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum RetrievalAggregation {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Custom(fn(&[f64]) -> f64),
}

/// Configuration for [`RPrecision`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RPrecisionConfig {
    pub empty_target_action: EmptyTargetAction,
    /// Target value whose positions are dropped before scoring
    pub ignore_index: Option<i64>,
    pub aggregation: RetrievalAggregation,
}

/// Fraction of relevant documents ranked inside the top `R`, one score
/// per query group, aggregated over groups.
///
/// Updates buffer raw triples; grouping happens at compute time so
/// documents of one query may arrive across batches.
#[derive(Clone, Debug)]
pub struct RPrecision {
    config: RPrecisionConfig,
    indexes: Vec<i64>,
    preds: Vec<f64>,
    target: Vec<i64>,
}

impl RPrecision {
    #[must_use]
    pub fn new(config: RPrecisionConfig) -> Self {
        Self {
            config,
            indexes: Vec::new(),
            preds: Vec::new(),
            target: Vec::new(),
        }
    }

    /// The configuration in use
    #[must_use]
    pub fn config(&self) -> &RPrecisionConfig {
        &self.config
    }

    /// Buffered document count
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

/// Score one query group, `None` when it holds no relevant document.
///
/// Entries are `(predicted score, relevance)`; ranking is descending
/// by score with ties kept in arrival order.
fn score_group(entries: &[(f64, i64)]) -> Option<f64> {
    let relevant = entries.iter().filter(|(_, t)| *t == 1).count();
    if relevant == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        entries[b]
            .0
            .partial_cmp(&entries[a].0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let hits = order
        .iter()
        .take(relevant)
        .filter(|&&i| entries[i].1 == 1)
        .count();
    Some(hits as f64 / relevant as f64)
}

/// Collapse query scores; an empty slice reports 0.0.
fn aggregate(scores: &[f64], aggregation: RetrievalAggregation) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    match aggregation {
        RetrievalAggregation::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
        RetrievalAggregation::Median => {
            let mut sorted = scores.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            sorted[(sorted.len() - 1) / 2]
        }
        RetrievalAggregation::Min => scores.iter().copied().fold(f64::INFINITY, f64::min),
        RetrievalAggregation::Max => scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        RetrievalAggregation::Custom(f) => f(scores),
    }
}

impl<'a> Metric<'a> for RPrecision {
    /// Query ids, predicted scores, and binary relevance, all one
    /// value per document and identically shaped
    type Input = (&'a ArrayD<i64>, &'a ArrayD<f64>, &'a ArrayD<i64>);
    type Output = f64;

    fn update(&mut self, (indexes, preds, target): Self::Input) -> Result<()> {
        if indexes.shape() != preds.shape() || preds.shape() != target.shape() {
            return Err(MetricError::ShapeMismatch {
                preds: preds.shape().to_vec(),
                target: target.shape().to_vec(),
            });
        }
        let ignore = self.config.ignore_index;
        for &t in target {
            if Some(t) != ignore && t != 0 && t != 1 {
                return Err(MetricError::NotBinary(t));
            }
        }
        for ((&idx, &score), &t) in indexes.iter().zip(preds.iter()).zip(target.iter()) {
            if Some(t) == ignore {
                continue;
            }
            self.indexes.push(idx);
            self.preds.push(score);
            self.target.push(t);
        }
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        let mut groups: BTreeMap<i64, Vec<(f64, i64)>> = BTreeMap::new();
        for ((&idx, &score), &t) in self.indexes.iter().zip(&self.preds).zip(&self.target) {
            groups.entry(idx).or_default().push((score, t));
        }

        let mut scores = Vec::with_capacity(groups.len());
        for (&group_id, entries) in &groups {
            match score_group(entries) {
                Some(score) => scores.push(score),
                None => match self.config.empty_target_action {
                    EmptyTargetAction::Skip => {}
                    EmptyTargetAction::Neg => scores.push(0.0),
                    EmptyTargetAction::Pos => scores.push(1.0),
                    EmptyTargetAction::Error => {
                        return Err(MetricError::NoPositiveTarget(group_id))
                    }
                },
            }
        }
        Ok(aggregate(&scores, self.config.aggregation))
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.config, other.config);
        self.indexes.extend_from_slice(&other.indexes);
        self.preds.extend_from_slice(&other.preds);
        self.target.extend_from_slice(&other.target);
    }

    fn reset(&mut self) {
        self.indexes.clear();
        self.preds.clear();
        self.target.clear();
    }

    fn name(&self) -> &'static str {
        "r_precision"
    }
}

/// R-precision of a single query.
///
/// # Errors
/// Returns an error when the shapes differ, the input is empty, or the
/// target is not binary.
pub fn retrieval_r_precision(preds: &ArrayD<f64>, target: &ArrayD<i64>) -> Result<f64> {
    if preds.shape() != target.shape() {
        return Err(MetricError::ShapeMismatch {
            preds: preds.shape().to_vec(),
            target: target.shape().to_vec(),
        });
    }
    if preds.is_empty() {
        return Err(MetricError::EmptyInput);
    }
    for &t in target {
        if t != 0 && t != 1 {
            return Err(MetricError::NotBinary(t));
        }
    }
    let entries: Vec<(f64, i64)> = preds.iter().copied().zip(target.iter().copied()).collect();
    Ok(score_group(&entries).unwrap_or(0.0))
}
