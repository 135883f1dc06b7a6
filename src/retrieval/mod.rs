//! Information retrieval metrics over grouped query results

mod r_precision;

pub use r_precision::{
    retrieval_r_precision, EmptyTargetAction, RPrecision, RPrecisionConfig, RetrievalAggregation,
};
