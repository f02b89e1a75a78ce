//! # Interfaces to SAT Solvers
//!
//! The traits an underlying CDCL backend has to implement for the
//! core-guided engine, and the types shared between solver implementations.
//! A pure-Rust backend based on [BatSat](https://crates.io/crates/batsat)
//! ships with the library; other solvers can be used by implementing
//! [`Solve`] and [`SolveIncremental`].

use std::{fmt, time::Duration};

use thiserror::Error;

use crate::{
    instances::Cnf,
    types::{Assignment, Clause, Lit, TernaryVal, Var},
};

pub mod batsat;
pub use self::batsat::BatsatSolver;

/// Trait for all SAT solvers in this library.
pub trait Solve {
    /// Gets a signature of the solver implementation
    fn signature(&self) -> &'static str;
    /// Solves the internal CNF formula without any assumptions.
    ///
    /// # Errors
    ///
    /// A specific implementation might return solver-API errors
    fn solve(&mut self) -> anyhow::Result<SolverResult>;
    /// Gets an assignment of a literal in the solver.
    ///
    /// # Errors
    ///
    /// - If the solver is not in the satisfied state
    /// - A specific implementation might return other errors
    fn lit_val(&self, lit: Lit) -> anyhow::Result<TernaryVal>;
    /// Same as [`Solve::lit_val`], but for variables.
    ///
    /// # Errors
    ///
    /// See [`Solve::lit_val`]
    fn var_val(&self, var: Var) -> anyhow::Result<TernaryVal> {
        self.lit_val(var.pos_lit())
    }
    /// Gets the full solution up to a given variable.
    ///
    /// # Errors
    ///
    /// See [`Solve::lit_val`]
    fn solution(&self, high_var: Var) -> anyhow::Result<Assignment> {
        let mut assignment = Vec::with_capacity(high_var.idx() + 1);
        for idx in 0..=high_var.idx32() {
            assignment.push(self.lit_val(Lit::positive(idx))?);
        }
        Ok(Assignment::from(assignment))
    }
    /// Adds a clause to the solver.
    /// If the solver is in the satisfied or unsatisfied state before, it is
    /// in the input state afterwards.
    ///
    /// # Errors
    ///
    /// A specific implementation might return solver-API errors
    fn add_clause(&mut self, clause: Clause) -> anyhow::Result<()>;
    /// Like [`Solve::add_clause`] but for unit clauses.
    ///
    /// # Errors
    ///
    /// See [`Solve::add_clause`]
    fn add_unit(&mut self, lit: Lit) -> anyhow::Result<()> {
        self.add_clause(Clause::from(lit))
    }
    /// Like [`Solve::add_clause`] but for binary clauses.
    ///
    /// # Errors
    ///
    /// See [`Solve::add_clause`]
    fn add_binary(&mut self, lit1: Lit, lit2: Lit) -> anyhow::Result<()> {
        self.add_clause(Clause::from(vec![lit1, lit2]))
    }
    /// Adds all clauses from a [`Cnf`] instance.
    ///
    /// # Errors
    ///
    /// See [`Solve::add_clause`]
    fn add_cnf(&mut self, cnf: Cnf) -> anyhow::Result<()> {
        cnf.into_iter().try_for_each(|cl| self.add_clause(cl))
    }
    /// Allocates a fresh variable in the solver.
    ///
    /// The cardinality encoders allocate their internal variables through
    /// this, so the backend may run ahead of the logical formula; see
    /// [`crate::instances::Formula::sync_with`].
    fn fresh_var(&mut self) -> Var;
    /// Reserves variables in the solver up to and including `max_var`
    ///
    /// # Errors
    ///
    /// A specific implementation might return solver-API errors
    fn reserve(&mut self, _max_var: Var) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Trait for SAT solvers that can solve under assumptions and extract
/// unsatisfiable cores.
pub trait SolveIncremental: Solve {
    /// Solves the internal CNF formula under assumptions. Assumption order
    /// is preserved because some backends are sensitive to it.
    ///
    /// # Errors
    ///
    /// A specific implementation might return solver-API errors
    fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult>;
    /// Gets a core found by an unsatisfiable query.
    /// A core is a clause entailed by the formula that contains only
    /// inverted literals of the assumptions.
    ///
    /// # Errors
    ///
    /// - If the solver is not in the unsatisfied state
    /// - A specific implementation might return other errors
    fn core(&mut self) -> anyhow::Result<Vec<Lit>>;
}

/// Solver statistics
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct SolverStats {
    /// The number of satisfiable queries executed
    pub n_sat: usize,
    /// The number of unsatisfiable queries executed
    pub n_unsat: usize,
    /// The number of clauses in the solver
    pub n_clauses: usize,
    /// The highest variable in the solver
    pub max_var: Option<Var>,
    /// The total CPU time spent solving
    pub cpu_solve_time: Duration,
}

/// Trait for solvers that track certain statistics.
pub trait SolveStats {
    /// Gets the available statistics from the solver
    fn stats(&self) -> SolverStats;
    /// Gets the number of satisfiable queries executed.
    fn n_sat_solves(&self) -> usize {
        self.stats().n_sat
    }
    /// Gets the number of unsatisfiable queries executed.
    fn n_unsat_solves(&self) -> usize {
        self.stats().n_unsat
    }
    /// Gets the total number of queries executed.
    fn n_solves(&self) -> usize {
        self.n_sat_solves() + self.n_unsat_solves()
    }
    /// Gets the number of clauses in the solver.
    fn n_clauses(&self) -> usize {
        self.stats().n_clauses
    }
    /// Gets the variable with the highest index in the solver, if any.
    fn max_var(&self) -> Option<Var> {
        self.stats().max_var
    }
    /// Get number of variables. Correct as long as variables are used in
    /// order, which the engine guarantees.
    fn n_vars(&self) -> u32 {
        match self.max_var() {
            Some(var) => var.idx32() + 1,
            None => 0,
        }
    }
    /// Gets the total CPU time spent solving.
    fn cpu_solve_time(&self) -> Duration {
        self.stats().cpu_solve_time
    }
}

/// States that the solver can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverState {
    /// Input state, while adding clauses
    #[default]
    Input,
    /// The last query was found satisfiable
    Sat,
    /// The last query was found unsatisfiable
    Unsat,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverState::Input => write!(f, "INPUT"),
            SolverState::Sat => write!(f, "SAT"),
            SolverState::Unsat => write!(f, "UNSAT"),
        }
    }
}

/// Return value for solving queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverResult {
    /// The query was found satisfiable
    Sat,
    /// The query was found unsatisfiable
    Unsat,
    /// The query was prematurely interrupted
    Interrupted,
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverResult::Sat => write!(f, "SAT"),
            SolverResult::Unsat => write!(f, "UNSAT"),
            SolverResult::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Error returned when a solver is in the wrong state for an operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("solver needs to be in state {required_state} but was in state {actual_state}")]
pub struct StateError {
    /// The state required for the operation
    pub required_state: SolverState,
    /// The state the solver is actually in
    pub actual_state: SolverState,
}
