//! # ollsat - Clause Algebra and Core-Guided Weighted MaxSAT
//!
//! `ollsat` is the solving core of a constraint-scheduling system, reduced
//! to its two load-bearing pieces:
//!
//! - a **boolean-formula algebra** over CNF clause sets
//!   ([`algebra::ClauseSet`]) whose disjunction and implication stay
//!   logically faithful in both directions, so built formulas can be nested
//!   as antecedents of further implications, and
//! - a **core-guided (OLL) weighted MaxSAT engine** ([`algs::OllSolver`])
//!   that drives an incremental CDCL backend with assumption literals,
//!   relaxes extracted cores into incremental totalizer cardinality
//!   constraints, splits soft clauses on weight discrepancies, stratifies
//!   assumptions by weight, and tightens lower and upper bounds until they
//!   meet.
//!
//! Clients build an instance through an explicit [`context::Context`] (or
//! directly on an [`instances::Formula`]) and read the optimal model back
//! per variable. A pure-Rust [BatSat](https://crates.io/crates/batsat)
//! backend ships with the library; other backends plug in through the
//! traits in [`solvers`].
//!
//! ## Example
//!
//! ```
//! use ollsat::{clause, context::Context};
//!
//! let mut ctx = Context::new();
//! let a = ctx.new_var();
//! let b = ctx.new_var();
//! ctx.add_hard(clause![a.pos_lit(), b.pos_lit()]);
//! ctx.add_soft(clause![a.neg_lit()], 1);
//! ctx.add_soft(clause![b.neg_lit()], 1);
//! ctx.solve().unwrap();
//! // one of the two soft clauses has to give
//! assert_eq!(ctx.cost(), Some(1));
//! ```

#![warn(clippy::pedantic)]
#![warn(missing_docs)]

use thiserror::Error;

pub mod algebra;
pub mod algs;
pub mod context;
pub mod encodings;
pub mod instances;
pub mod solvers;
pub mod types;

pub use context::Context;

/// Error returned when the engine is set up in a way it does not support
///
/// These are client mistakes, reported with a one-line diagnostic;
/// violations of internal search invariants are programming bugs and panic
/// instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The core-guided engine only supports iteratively tightened
    /// totalizers
    #[error("cardinality encoding '{0}' is not supported by the core-guided engine")]
    UnsupportedEncoding(algs::CardEncoding),
    /// A search path was invoked on a formula of the wrong problem type
    #[error("problem type mismatch: the {expected} path cannot solve a {found} formula")]
    WrongProblemType {
        /// The problem type the invoked search path expects
        expected: instances::ProblemType,
        /// The problem type of the formula
        found: instances::ProblemType,
    },
}
