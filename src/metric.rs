//! Streaming metric contract

use crate::error::Result;

/// A metric that accumulates batches and reports a final value.
///
/// State is always raw counts or appended rows, so `merge` of two
/// identically configured metrics gives exactly the result of a single
/// metric that saw both update streams. `compute` never consumes the
/// state; more updates may follow.
pub trait Metric<'a> {
    /// One update batch, typically a tuple of borrowed arrays
    type Input;
    /// The finalized metric value
    type Output;

    /// Fold one batch into the accumulated state.
    ///
    /// # Errors
    /// Returns an error when the batch fails shape or value validation.
    /// Rejected batches leave the state untouched.
    fn update(&mut self, input: Self::Input) -> Result<()>;

    /// Report the metric over everything seen so far.
    ///
    /// # Errors
    /// Returns an error when the accumulated state cannot be scored,
    /// for example a query group that a policy says must not be empty.
    fn compute(&self) -> Result<Self::Output>;

    /// Fold another metric's state into this one.
    ///
    /// Both sides must share the same configuration.
    fn merge(&mut self, other: &Self);

    /// Clear the state back to the freshly constructed one.
    fn reset(&mut self);

    /// Stable identifier, usable as a report key.
    fn name(&self) -> &'static str;
}
