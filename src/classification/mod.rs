//! Classification metrics over hard labels and scores
//!
//! Provides streaming metrics for binary, multiclass, and multilabel
//! tasks:
//! - Stat scores (tp / fp / tn / fn / support tuples)
//! - Confusion matrix accumulation
//! - Jaccard index (intersection over union)
//! - Micro, macro, weighted, and per-class averaging

mod average;
mod confusion;
mod counts;
mod input;
mod jaccard;
mod stat_scores;


// Re-export all public types and functions
pub use average::{Average, MultidimAverage};
pub use confusion::ConfusionMatrix;
pub use counts::StatCounts;
pub use input::Predictions;
pub use jaccard::{
    binary_jaccard_index, multiclass_jaccard_index, multilabel_jaccard_index, BinaryJaccardIndex,
    BinaryJaccardIndexConfig, MulticlassJaccardIndex, MulticlassJaccardIndexConfig,
    MultilabelJaccardIndex, MultilabelJaccardIndexConfig,
};
pub use stat_scores::{
    binary_stat_scores, multiclass_stat_scores, multilabel_stat_scores, BinaryStatScores,
    BinaryStatScoresConfig, MulticlassStatScores, MulticlassStatScoresConfig,
    MultilabelStatScores, MultilabelStatScoresConfig, StatScores, StatScoresConfig, Task,
};
