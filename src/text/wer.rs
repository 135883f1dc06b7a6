//! Word error rate over whitespace-tokenized text
//!
//! WER = (Substitutions + Deletions + Insertions) / Reference Length

use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::metric::Metric;

/// Word-level Levenshtein distance between reference and hypothesis.
fn edit_distance(reference: &[&str], hypothesis: &[&str]) -> usize {
    let n = reference.len();
    let m = hypothesis.len();

    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    // Dynamic programming table for edit distance
    let mut dp = vec![vec![0usize; m + 1]; n + 1];

    for i in 0..=n {
        dp[i][0] = i;
    }
    for j in 0..=m {
        dp[0][j] = j;
    }

    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
            dp[i][j] = (dp[i - 1][j] + 1) // deletion
                .min(dp[i][j - 1] + 1) // insertion
                .min(dp[i - 1][j - 1] + cost); // substitution
        }
    }

    dp[n][m]
}

/// Corpus-level word error rate.
///
/// Accumulates edit errors against total reference words, so long
/// references weigh more than short ones. The rate can exceed 1.0 when
/// hypotheses run much longer than their references; an empty corpus
/// reports 0.0, and errors against an entirely empty reference report
/// infinity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordErrorRate {
    errors: u64,
    total: u64,
}

impl WordErrorRate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit errors accumulated so far
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Reference words accumulated so far
    #[must_use]
    pub fn total_words(&self) -> u64 {
        self.total
    }
}

impl<'a> Metric<'a> for WordErrorRate {
    type Input = (&'a str, &'a str);
    type Output = f64;

    fn update(&mut self, (prediction, reference): Self::Input) -> Result<()> {
        let ref_words: Vec<&str> = reference.split_whitespace().collect();
        let hyp_words: Vec<&str> = prediction.split_whitespace().collect();
        self.errors += edit_distance(&ref_words, &hyp_words) as u64;
        self.total += ref_words.len() as u64;
        Ok(())
    }

    fn compute(&self) -> Result<Self::Output> {
        if self.total == 0 {
            return Ok(if self.errors == 0 { 0.0 } else { f64::INFINITY });
        }
        Ok(self.errors as f64 / self.total as f64)
    }

    fn merge(&mut self, other: &Self) {
        self.errors += other.errors;
        self.total += other.total;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn name(&self) -> &'static str {
        "word_error_rate"
    }
}

/// One-shot corpus word error rate over parallel prediction and
/// reference slices.
///
/// # Errors
/// Returns an error when the slices differ in length.
pub fn word_error_rate(preds: &[&str], targets: &[&str]) -> Result<f64> {
    if preds.len() != targets.len() {
        return Err(MetricError::MismatchedLengths {
            left: preds.len(),
            right: targets.len(),
        });
    }
    let mut metric = WordErrorRate::new();
    for (prediction, reference) in preds.iter().zip(targets) {
        metric.update((prediction, reference))?;
    }
    metric.compute()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_identical_strings_zero_rate() {
        let score = word_error_rate(&["hello world"], &["hello world"]).unwrap();
        assert_relative_eq!(score, 0.0);
    }

    #[test]
    fn test_reference_pair_example() {
        let preds = ["this is the prediction", "there is an other sample"];
        let targets = ["this is the reference", "there is another one"];
        let score = word_error_rate(&preds, &targets).unwrap();
        // 4 errors over 8 reference words
        assert_relative_eq!(score, 0.5);
    }

    #[test]
    fn test_corpus_rate_weighs_by_reference_length() {
        // One short bad pair, one long perfect pair: the corpus rate
        // is 1/10, not the mean of the per-pair rates
        let preds = ["x", "a b c d e f g h i"];
        let targets = ["y", "a b c d e f g h i"];
        let score = word_error_rate(&preds, &targets).unwrap();
        assert_relative_eq!(score, 0.1);
    }

    #[test]
    fn test_insertions_can_exceed_one() {
        let score = word_error_rate(&["a b c"], &["a"]).unwrap();
        assert_relative_eq!(score, 2.0);
    }

    #[test]
    fn test_empty_reference_with_hypothesis_is_infinite() {
        let score = word_error_rate(&["something"], &[""]).unwrap();
        assert!(score.is_infinite());
    }

    #[test]
    fn test_both_empty_is_zero() {
        let score = word_error_rate(&[""], &[""]).unwrap();
        assert_relative_eq!(score, 0.0);
        let empty: [&str; 0] = [];
        assert_relative_eq!(word_error_rate(&empty, &empty).unwrap(), 0.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = word_error_rate(&["a", "b"], &["a"]).unwrap_err();
        assert!(matches!(
            err,
            MetricError::MismatchedLengths { left: 2, right: 1 }
        ));
    }

    #[test]
    fn test_whitespace_tokenization() {
        // Runs of whitespace collapse to single separators
        let score = word_error_rate(&["hello   world"], &["hello world"]).unwrap();
        assert_relative_eq!(score, 0.0);
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let preds = ["this is the prediction", "there is an other sample"];
        let targets = ["this is the reference", "there is another one"];

        let mut streaming = WordErrorRate::new();
        for (p, t) in preds.iter().zip(&targets) {
            streaming.update((p, t)).unwrap();
        }
        let one_shot = word_error_rate(&preds, &targets).unwrap();
        assert_relative_eq!(streaming.compute().unwrap(), one_shot);
    }

    #[test]
    fn test_merge_pools_errors_and_words() {
        let mut left = WordErrorRate::new();
        left.update(("this is the prediction", "this is the reference"))
            .unwrap();
        let mut right = WordErrorRate::new();
        right
            .update(("there is an other sample", "there is another one"))
            .unwrap();
        left.merge(&right);
        assert_eq!(left.errors(), 4);
        assert_eq!(left.total_words(), 8);
        assert_relative_eq!(left.compute().unwrap(), 0.5);
    }

    #[test]
    fn test_reset_restores_empty_state() {
        let mut metric = WordErrorRate::new();
        metric.update(("a b", "c d")).unwrap();
        metric.reset();
        assert_eq!(metric.total_words(), 0);
        assert_relative_eq!(metric.compute().unwrap(), 0.0);
    }

    #[test]
    fn test_substitution_only() {
        let score = word_error_rate(&["the fast brown fox"], &["the quick brown fox"]).unwrap();
        assert_relative_eq!(score, 0.25);
    }
}
