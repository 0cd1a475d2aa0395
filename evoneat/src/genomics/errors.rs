use thiserror::Error;

/// An error type indicating the values passed
/// to [`Genome::feed_forward`] do not fit the genome.
///
/// [`Genome::feed_forward`]: crate::Genome::feed_forward
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    /// The number of values differs from the genome's input count.
    #[error("expected {expected} input values, got {found}")]
    InputCountMismatch { expected: usize, found: usize },
    /// A value was NaN or infinite.
    #[error("input value {value} at index {index} is not a finite number")]
    NonFiniteInput { index: usize, value: f32 },
}
