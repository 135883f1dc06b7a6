//! Streaming evaluation metrics for machine learning models
//!
//! Metrics accumulate sufficient statistics across batches via a shared
//! update / compute / merge / reset contract, so distributed shards can
//! be counted independently and combined without changing the result.
//!
//! ## Architecture
//!
//! - `classification`: stat scores, confusion matrix, and Jaccard index
//!   for binary, multiclass, and multilabel tasks
//! - `text`: word error rate over whitespace-tokenized text
//! - `retrieval`: R-precision over grouped query results
//! - `nominal`: Tschuprow's T association between categorical variables
//!
//! ## Example
//!
//! ```ignore
//! use medir::{Metric, MulticlassStatScores, MulticlassStatScoresConfig, Predictions};
//!
//! let mut metric = MulticlassStatScores::new(MulticlassStatScoresConfig::new(3))?;
//! for (preds, target) in batches {
//!     metric.update((&Predictions::Scores(preds), &target))?;
//! }
//! // One row of [tp, fp, tn, fn, support] under the configured average
//! let counts = metric.compute()?;
//! ```

pub mod classification;
pub mod error;
pub mod metric;
pub mod nominal;
pub mod retrieval;
pub mod text;

// Re-export the streaming contract and error types
pub use error::{MetricError, Result};
pub use metric::Metric;

// Re-export classification types
pub use classification::{
    binary_jaccard_index, binary_stat_scores, multiclass_jaccard_index, multiclass_stat_scores,
    multilabel_jaccard_index, multilabel_stat_scores, Average, BinaryJaccardIndex,
    BinaryJaccardIndexConfig, BinaryStatScores, BinaryStatScoresConfig, ConfusionMatrix,
    MulticlassJaccardIndex, MulticlassJaccardIndexConfig, MulticlassStatScores,
    MulticlassStatScoresConfig, MultidimAverage, MultilabelJaccardIndex,
    MultilabelJaccardIndexConfig, MultilabelStatScores, MultilabelStatScoresConfig, Predictions,
    StatCounts, StatScores, StatScoresConfig, Task,
};

// Re-export text, retrieval, and nominal metrics
pub use nominal::{tschuprows_t, tschuprows_t_matrix, NanStrategy, TschuprowsT, TschuprowsTConfig};
pub use retrieval::{
    retrieval_r_precision, EmptyTargetAction, RPrecision, RPrecisionConfig, RetrievalAggregation,
};
pub use text::{word_error_rate, WordErrorRate};
