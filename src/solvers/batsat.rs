//! # BatSat Backend
//!
//! Backend adapter for the [BatSat](https://github.com/c-cube/batsat)
//! incremental SAT solver. BatSat is pure Rust, so the engine runs without
//! linking any C or C++ solver library.
//!
//! The adapter keeps three things next to the inner solver: the query
//! state, the unsatisfiable core of the last failed query (translated
//! immediately, see below), and running query statistics.

// BatSat stores the sign bit of a literal inverted relative to this
// library, so literals are rebuilt through BatSat's constructors on every
// crossing instead of being transmuted.

use std::time::Duration;

use batsat::{intmap::AsIndex, lbool, BasicCallbacks, SolverInterface};
use cpu_time::ProcessTime;

use crate::{
    solvers::{
        Solve, SolveIncremental, SolveStats, SolverResult, SolverState, SolverStats, StateError,
    },
    types::{Clause, Lit, TernaryVal, Var},
};

/// The BatSat solver wrapped for [`Solve`] and [`SolveIncremental`]
///
/// The core of a failed query is captured eagerly when the query returns,
/// because the inner solver only guarantees it until the next call; the
/// assumption bookkeeping of the core-guided engine reads it later.
#[derive(Default)]
pub struct BatsatSolver {
    internal: batsat::Solver<BasicCallbacks>,
    state: SolverState,
    /// Inverted failed assumptions of the last unsatisfiable query
    core: Vec<Lit>,
    /// Reused translation buffer; [`batsat::Solver::add_clause_reuse`]
    /// wants a mutable vector anyway
    buffer: Vec<batsat::Lit>,
    n_sat: usize,
    n_unsat: usize,
    cpu_time: Duration,
}

/// Translates a literal over a variable the inner solver already knows
fn known_lit(lit: Lit) -> batsat::Lit {
    batsat::Lit::new(batsat::Var::from_index(lit.vidx()), lit.is_pos())
}

/// Translates a BatSat truth value
fn truth_value(val: lbool) -> TernaryVal {
    if val == lbool::TRUE {
        TernaryVal::True
    } else if val == lbool::FALSE {
        TernaryVal::False
    } else {
        TernaryVal::DontCare
    }
}

impl BatsatSolver {
    /// Creates a new solver instance
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the translation buffer from a sequence of literals, creating
    /// missing variables in the inner solver on the way
    fn translate_into_buffer<'slf>(&mut self, lits: impl IntoIterator<Item = &'slf Lit>) {
        self.buffer.clear();
        for l in lits {
            let var = self.internal.var_of_int(l.vidx32());
            self.buffer.push(batsat::Lit::new(var, l.is_pos()));
        }
    }

    fn in_state(&self, required_state: SolverState) -> Result<(), StateError> {
        if self.state == required_state {
            return Ok(());
        }
        Err(StateError {
            required_state,
            actual_state: self.state,
        })
    }
}

impl std::fmt::Debug for BatsatSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatsatSolver")
            .field("state", &self.state)
            .field("core", &self.core)
            .field("n_sat", &self.n_sat)
            .field("n_unsat", &self.n_unsat)
            .field("cpu_time", &self.cpu_time)
            .finish_non_exhaustive()
    }
}

impl Solve for BatsatSolver {
    fn signature(&self) -> &'static str {
        "BatSat 0.6"
    }

    fn solve(&mut self) -> anyhow::Result<SolverResult> {
        self.solve_assumps(&[])
    }

    fn lit_val(&self, lit: Lit) -> anyhow::Result<TernaryVal> {
        self.in_state(SolverState::Sat)?;
        Ok(truth_value(self.internal.value_lit(known_lit(lit))))
    }

    fn add_clause(&mut self, clause: Clause) -> anyhow::Result<()> {
        self.state = SolverState::Input;
        self.translate_into_buffer(&clause);
        self.internal.add_clause_reuse(&mut self.buffer);
        Ok(())
    }

    fn fresh_var(&mut self) -> Var {
        Var::new(self.internal.new_var_default().idx())
    }

    fn reserve(&mut self, max_var: Var) -> anyhow::Result<()> {
        // creates every missing variable up to the requested index
        self.internal.var_of_int(max_var.idx32());
        Ok(())
    }
}

impl SolveIncremental for BatsatSolver {
    fn solve_assumps(&mut self, assumps: &[Lit]) -> anyhow::Result<SolverResult> {
        self.translate_into_buffer(assumps);
        let start = ProcessTime::now();
        let res = self.internal.solve_limited(&self.buffer);
        self.cpu_time += start.elapsed();
        if res == lbool::TRUE {
            self.n_sat += 1;
            self.state = SolverState::Sat;
            self.core.clear();
            return Ok(SolverResult::Sat);
        }
        if res == lbool::FALSE {
            self.n_unsat += 1;
            self.state = SolverState::Unsat;
            self.core = self
                .internal
                .unsat_core()
                .iter()
                .map(|l| Lit::new(l.var().idx(), !l.sign()))
                .collect();
            return Ok(SolverResult::Unsat);
        }
        self.state = SolverState::Input;
        Ok(SolverResult::Interrupted)
    }

    fn core(&mut self) -> anyhow::Result<Vec<Lit>> {
        self.in_state(SolverState::Unsat)?;
        Ok(self.core.clone())
    }
}

impl SolveStats for BatsatSolver {
    fn stats(&self) -> SolverStats {
        SolverStats {
            n_sat: self.n_sat,
            n_unsat: self.n_unsat,
            n_clauses: self.n_clauses(),
            max_var: self.max_var(),
            cpu_solve_time: self.cpu_time,
        }
    }

    fn n_sat_solves(&self) -> usize {
        self.n_sat
    }

    fn n_unsat_solves(&self) -> usize {
        self.n_unsat
    }

    fn n_clauses(&self) -> usize {
        usize::try_from(self.internal.num_clauses()).expect("more than `usize::MAX` clauses")
    }

    fn max_var(&self) -> Option<Var> {
        match self.internal.num_vars() {
            0 => None,
            n => Some(Var::new(n - 1)),
        }
    }

    fn cpu_solve_time(&self) -> Duration {
        self.cpu_time
    }
}

#[cfg(test)]
mod tests {
    use super::BatsatSolver;
    use crate::{
        clause, lit,
        solvers::{Solve, SolveIncremental, SolveStats, SolverResult},
        types::TernaryVal,
    };

    #[test]
    fn empty_sat() {
        let mut solver = BatsatSolver::default();
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
    }

    #[test]
    fn contradiction_unsat() {
        let mut solver = BatsatSolver::default();
        solver.add_clause(clause![lit![0]]).unwrap();
        solver.add_clause(clause![!lit![0]]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Unsat);
    }

    #[test]
    fn unit_propagation() {
        let mut solver = BatsatSolver::default();
        solver.add_clause(clause![lit![0], lit![1]]).unwrap();
        solver.add_clause(clause![!lit![0]]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
        assert_eq!(solver.lit_val(lit![1]).unwrap(), TernaryVal::True);
        assert_eq!(solver.lit_val(lit![0]).unwrap(), TernaryVal::False);
    }

    #[test]
    fn assumption_core() {
        let mut solver = BatsatSolver::default();
        solver.add_clause(clause![lit![0], lit![1]]).unwrap();
        let res = solver.solve_assumps(&[!lit![0], !lit![1]]).unwrap();
        assert_eq!(res, SolverResult::Unsat);
        let core = solver.core().unwrap();
        assert!(!core.is_empty());
        // the core contains inverted failed assumptions
        for l in core {
            assert!(l == lit![0] || l == lit![1]);
        }
        // removing the assumptions makes the query satisfiable again
        assert_eq!(solver.solve_assumps(&[]).unwrap(), SolverResult::Sat);
    }

    #[test]
    fn core_outlives_later_clauses() {
        // the core is captured when the query fails, so adding clauses
        // afterwards must invalidate it through the state check
        let mut solver = BatsatSolver::default();
        solver.add_clause(clause![lit![0]]).unwrap();
        let res = solver.solve_assumps(&[!lit![0]]).unwrap();
        assert_eq!(res, SolverResult::Unsat);
        solver.add_clause(clause![lit![1]]).unwrap();
        assert!(solver.core().is_err());
    }

    #[test]
    fn lit_val_requires_sat_state() {
        let mut solver = BatsatSolver::default();
        solver.add_clause(clause![lit![0]]).unwrap();
        assert!(solver.lit_val(lit![0]).is_err());
    }

    #[test]
    fn fresh_vars_count_up() {
        let mut solver = BatsatSolver::default();
        let v0 = solver.fresh_var();
        let v1 = solver.fresh_var();
        assert_eq!(v0.idx(), 0);
        assert_eq!(v1.idx(), 1);
        assert_eq!(solver.n_vars(), 2);
    }

    #[test]
    fn reserve_creates_variables() {
        let mut solver = BatsatSolver::default();
        solver.reserve(crate::var![4]).unwrap();
        assert_eq!(solver.n_vars(), 5);
        let next = solver.fresh_var();
        assert_eq!(next.idx(), 5);
    }
}
