//! Metric error types

use thiserror::Error;

/// Errors raised by metric configuration and input validation
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("Invalid average '{0}', expected one of: none, micro, macro, weighted")]
    InvalidAverage(String),

    #[error("Invalid multidim average '{0}', expected one of: global, samplewise")]
    InvalidMultidimAverage(String),

    #[error("Invalid task '{0}', expected one of: binary, multiclass, multilabel")]
    InvalidTask(String),

    #[error("Invalid empty-target action '{0}', expected one of: skip, neg, pos, error")]
    InvalidEmptyTargetAction(String),

    #[error("Shape mismatch: predictions {preds:?} vs target {target:?}")]
    ShapeMismatch {
        preds: Vec<usize>,
        target: Vec<usize>,
    },

    #[error("Threshold {0} outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("num_classes must be at least 2, got {0}")]
    InvalidNumClasses(usize),

    #[error("num_labels must be at least 2, got {0}")]
    InvalidNumLabels(usize),

    #[error("top_k must be in 1..={num_classes}, got {top_k}")]
    InvalidTopK { top_k: usize, num_classes: usize },

    #[error("top_k above 1 requires probability scores, not hard labels")]
    TopKRequiresScores,

    #[error("Label {label} outside 0..{num_classes}")]
    LabelOutOfRange { label: i64, num_classes: usize },

    #[error("Expected binary values in {{0, 1}}, got {0}")]
    NotBinary(i64),

    #[error("num_classes is required for the multiclass task")]
    MissingNumClasses,

    #[error("num_labels is required for the multilabel task")]
    MissingNumLabels,

    #[error("Samplewise reduction requires dimensions beyond the leading axes, got rank {0}")]
    SamplewiseRank(usize),

    #[error("Mismatched lengths: {left} vs {right}")]
    MismatchedLengths { left: usize, right: usize },

    #[error("Empty input")]
    EmptyInput,

    #[error("Query group {0} has no positive targets")]
    NoPositiveTarget(i64),

    #[error("Inputs must be 1-d label vectors or 2-d score matrices, got {0} dimensions")]
    InvalidNominalRank(usize),

    #[error("Metric error: {0}")]
    Internal(String),
}

/// Result type for metric operations
pub type Result<T> = std::result::Result<T, MetricError>;
