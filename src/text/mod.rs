//! Text comparison metrics

mod wer;

pub use wer::{word_error_rate, WordErrorRate};
