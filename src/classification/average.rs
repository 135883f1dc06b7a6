//! Averaging policies for per-class statistics

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetricError;

/// Averaging policy applied to per-class statistic rows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    /// Per-class rows in ascending class order, no reduction
    None,
    /// Sum counts over all classes, then report one row
    Micro,
    /// Unweighted mean over classes
    #[default]
    Macro,
    /// Mean over classes weighted by support (number of true instances)
    Weighted,
}

impl FromStr for Average {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Average::None),
            "micro" => Ok(Average::Micro),
            "macro" => Ok(Average::Macro),
            "weighted" => Ok(Average::Weighted),
            other => Err(MetricError::InvalidAverage(other.to_string())),
        }
    }
}

/// How inputs with extra trailing dimensions are reduced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultidimAverage {
    /// Flatten everything but the class axis and count once
    #[default]
    Global,
    /// Count each sample along the leading axis independently
    Samplewise,
}

impl FromStr for MultidimAverage {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(MultidimAverage::Global),
            "samplewise" => Ok(MultidimAverage::Samplewise),
            other => Err(MetricError::InvalidMultidimAverage(other.to_string())),
        }
    }
}
