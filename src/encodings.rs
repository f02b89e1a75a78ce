//! # CNF Encodings for Cardinality Constraints
//!
//! At-most-k constraints over literal multisets, encoded to CNF directly
//! into a SAT backend. The core-guided engine only relies on the totalizer
//! encoding, which supports incremental bound tightening.

use thiserror::Error;

pub mod totalizer;
pub use totalizer::Totalizer;

/// Errors from cardinality encodings
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The encoding has not been built yet
    #[error("the encoding is not built yet")]
    NotEncoded,
    /// The encoding has already been built and cannot be built again
    #[error("the encoding is already built")]
    AlreadyEncoded,
    /// The requested bound is lower than what is already encoded; bounds
    /// only grow
    #[error("the requested bound {0} is below the encoded bound {1}")]
    BoundTooLow(usize, usize),
}
