//! # MaxSAT Algorithms
//!
//! The core-guided search loop lives in [`oll`]. The types here are shared
//! between the search paths and their callers.

use std::fmt;

use crate::types::Assignment;

pub mod oll;
pub use oll::OllSolver;

/// The result of a terminated MaxSAT search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An optimal model was found; the saved model's cost equals the proven
    /// lower bound
    Optimum {
        /// The optimal cost over the soft clauses
        cost: usize,
        /// A model attaining that cost
        model: Assignment,
    },
    /// The hard clauses are unsatisfiable. The core-guided search paths
    /// never produce this themselves; they treat an unsatisfiable hard set
    /// as a caller bug and panic. The variant is part of the outcome
    /// contract for search strategies that do report it.
    Unsat,
}

/// Cardinality encodings selectable for the core-guided engine.
///
/// The engine requires an encoding with iterative bound tightening and is
/// implemented for the totalizer only; requesting anything else is a
/// configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardEncoding {
    /// The incremental totalizer ([`crate::encodings::Totalizer`])
    #[default]
    Totalizer,
    /// A sequential counter; not supported by the core-guided engine
    SequentialCounter,
}

impl fmt::Display for CardEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardEncoding::Totalizer => write!(f, "totalizer"),
            CardEncoding::SequentialCounter => write!(f, "sequential counter"),
        }
    }
}

/// Options for the core-guided engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OllOptions {
    /// The cardinality encoding used for relaxing cores
    pub encoding: CardEncoding,
}

/// Statistics of a core-guided search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OllStats {
    /// The number of satisfiable oracle calls
    pub n_sat_calls: usize,
    /// The number of cores extracted
    pub n_cores: usize,
    /// The summed size of all extracted cores
    pub sum_core_sizes: usize,
    /// The final lower bound
    pub lb: usize,
    /// The final upper bound (`usize::MAX` if no model was found)
    pub ub: usize,
}
