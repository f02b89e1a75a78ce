//! # Core-Guided Search (OLL)
//!
//! Weighted MaxSAT search that drives an incremental SAT backend with an
//! evolving assumption set. Every soft clause carries a relaxation literal
//! whose negation is assumed while the clause is inactive; an unsatisfiable
//! core moves the involved soft clauses into a cardinality constraint over
//! their relaxation literals and raises the lower bound by the core's
//! minimum weight. Cardinality constraints are incremental totalizers whose
//! bound is tightened (or whose encoder is duplicated, on a weight
//! discrepancy) when their output literal reappears in a core. Search ends
//! when the lower bound meets the cost of the best model.
//!
//! The weighted path stratifies assumptions by weight: only soft clauses
//! and cardinality outputs at or above the current minimum weight are
//! assumed, and the minimum weight moves down in diversity-controlled steps
//! once the current stratum is optimal. The unweighted path shares the
//! scaffolding with all weights pinned to one and no stratification.

use std::{cmp, collections::BTreeSet};

use log::{debug, trace};

use crate::{
    algs::{CardEncoding, OllOptions, OllStats, Outcome},
    encodings::Totalizer,
    instances::{Formula, ProblemType, SoftClause},
    solvers::{SolveIncremental, SolveStats, SolverResult},
    types::{Assignment, Lit, RsHashMap, RsHashSet},
    ConfigError,
};

/// Index of a cardinality encoder in the append-only encoder arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EncId(usize);

/// Where a cardinality assumption literal points: the encoder it belongs
/// to, the bound it enforces, and the weight at which it was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CardBound {
    enc: EncId,
    bound: usize,
    weight: usize,
}

/// The core-guided (OLL) MaxSAT engine
///
/// Owns the [`Formula`] and the SAT backend for the duration of the search.
/// The backend has to start out empty; [`OllSolver::solve`] may be called
/// once.
#[derive(Debug)]
pub struct OllSolver<S> {
    formula: Formula,
    oracle: S,
    opts: OllOptions,
    model: Assignment,
    nb_satisfiable: usize,
    nb_cores: usize,
    sum_core_sizes: usize,
    min_weight: usize,
    /// Maps the assumption literal of an inactive soft clause to its index
    core_mapping: RsHashMap<Lit, usize>,
    /// Per soft clause: whether it has appeared in a core and been relaxed
    active_soft: Vec<bool>,
    /// Append-only arena of cardinality encoders, live until the search ends
    soft_cardinality: Vec<Totalizer>,
    /// Maps a totalizer output literal to the bound it enforces
    bound_mapping: RsHashMap<Lit, CardBound>,
    /// The totalizer outputs currently assumed; ordered for determinism
    cardinality_assumptions: BTreeSet<Lit>,
}

impl<S: SolveIncremental + SolveStats> OllSolver<S> {
    /// Creates a new engine over a formula and a fresh backend
    pub fn new(formula: Formula, oracle: S) -> Self {
        Self::with_options(formula, oracle, OllOptions::default())
    }

    /// Creates a new engine with non-default options
    pub fn with_options(formula: Formula, oracle: S, opts: OllOptions) -> Self {
        OllSolver {
            formula,
            oracle,
            opts,
            model: Assignment::default(),
            nb_satisfiable: 0,
            nb_cores: 0,
            sum_core_sizes: 0,
            min_weight: 1,
            core_mapping: RsHashMap::default(),
            active_soft: vec![],
            soft_cardinality: vec![],
            bound_mapping: RsHashMap::default(),
            cardinality_assumptions: BTreeSet::new(),
        }
    }

    /// The formula the engine operates on
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Search statistics
    pub fn stats(&self) -> OllStats {
        OllStats {
            n_sat_calls: self.nb_satisfiable,
            n_cores: self.nb_cores,
            sum_core_sizes: self.sum_core_sizes,
            lb: self.formula.lb(),
            ub: self.formula.ub(),
        }
    }

    /// Runs the search matching the formula's problem type
    ///
    /// # Errors
    ///
    /// [`ConfigError`] on misconfiguration; backend errors are passed
    /// through.
    ///
    /// # Panics
    ///
    /// If the hard clauses are unsatisfiable. The engine optimizes over the
    /// soft clauses of a consistent hard core; feeding it contradictory
    /// hard clauses is a caller bug.
    pub fn solve(&mut self) -> anyhow::Result<Outcome> {
        match self.formula.problem_type() {
            ProblemType::Weighted => self.solve_weighted(),
            ProblemType::Unweighted => self.solve_unweighted(),
        }
    }

    /// Runs the weighted core-guided search.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the formula is not weighted or a non-totalizer
    /// encoding is requested; backend errors are passed through.
    ///
    /// # Panics
    ///
    /// If the hard clauses are unsatisfiable (see [`OllSolver::solve`]).
    pub fn solve_weighted(&mut self) -> anyhow::Result<Outcome> {
        self.check_config(ProblemType::Weighted)?;
        self.init()?;
        self.min_weight = self.formula.max_weight();

        let mut assumptions: Vec<Lit> = vec![];
        loop {
            match self.oracle.solve_assumps(&assumptions)? {
                SolverResult::Sat => {
                    self.nb_satisfiable += 1;
                    let sol = self.current_solution()?;
                    let cost = self.compute_cost(&sol);
                    if cost < self.formula.ub() || self.nb_satisfiable == 1 {
                        self.model = sol;
                        self.formula.update_ub(cost);
                        debug!("upper bound {cost}");
                    }
                    if self.nb_satisfiable == 1 {
                        self.min_weight = self.next_weight_diversity(self.min_weight);
                        trace!("considering weights >= {}", self.min_weight);
                        assumptions = self.rebuild_assumptions();
                    } else if self.count_not_considered() != 0 {
                        self.min_weight = self.next_weight_diversity(self.min_weight);
                        trace!("considering weights >= {}", self.min_weight);
                        assumptions = self.rebuild_assumptions();
                    } else {
                        // every soft clause and cardinality output has been
                        // considered at full weight; the model is optimal
                        debug_assert_eq!(cost, self.formula.lb());
                        self.formula.close_bounds();
                        return Ok(Outcome::Optimum {
                            cost: self.formula.ub(),
                            model: self.model.clone(),
                        });
                    }
                }
                SolverResult::Unsat => {
                    // the hard clauses must be consistent; an unsatisfiable
                    // first call can only come from a broken caller
                    assert!(
                        self.nb_satisfiable > 0,
                        "unsatisfiable before any satisfiable call"
                    );
                    let core = self.oracle.core()?;
                    let min_core = self.core_weight(&core);
                    self.nb_cores += 1;
                    self.sum_core_sizes += core.len();
                    self.formula.add_lb(min_core);
                    debug!(
                        "lower bound {} (core of size {}, weight {})",
                        self.formula.lb(),
                        core.len(),
                        min_core
                    );
                    if self.formula.lb() == self.formula.ub() {
                        return Ok(Outcome::Optimum {
                            cost: self.formula.ub(),
                            model: self.model.clone(),
                        });
                    }
                    let (soft_relax, card_relax) = self.relax_core(&core, min_core)?;
                    self.harden(&soft_relax, &card_relax, min_core)?;
                    assumptions = self.rebuild_assumptions();
                }
                SolverResult::Interrupted => unreachable!(),
            }
        }
    }

    /// Runs the unweighted core-guided search: the weighted skeleton with
    /// every core at weight one, no clause splitting and no stratification.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the formula is weighted or a non-totalizer
    /// encoding is requested; backend errors are passed through.
    ///
    /// # Panics
    ///
    /// If the hard clauses are unsatisfiable (see [`OllSolver::solve`]).
    pub fn solve_unweighted(&mut self) -> anyhow::Result<Outcome> {
        self.check_config(ProblemType::Unweighted)?;
        self.init()?;
        self.min_weight = 1;

        let mut assumptions: Vec<Lit> = vec![];
        loop {
            match self.oracle.solve_assumps(&assumptions)? {
                SolverResult::Sat => {
                    self.nb_satisfiable += 1;
                    let sol = self.current_solution()?;
                    let cost = self.compute_cost(&sol);
                    self.model = sol;
                    self.formula.update_ub(cost);
                    debug!("upper bound {cost}");
                    if self.nb_satisfiable == 1 {
                        if cost == 0 {
                            self.formula.close_bounds();
                            return Ok(Outcome::Optimum {
                                cost: 0,
                                model: self.model.clone(),
                            });
                        }
                        assumptions = self.rebuild_assumptions();
                    } else {
                        debug_assert_eq!(cost, self.formula.lb());
                        self.formula.close_bounds();
                        return Ok(Outcome::Optimum {
                            cost: self.formula.ub(),
                            model: self.model.clone(),
                        });
                    }
                }
                SolverResult::Unsat => {
                    assert!(
                        self.nb_satisfiable > 0,
                        "unsatisfiable before any satisfiable call"
                    );
                    let core = self.oracle.core()?;
                    self.nb_cores += 1;
                    self.sum_core_sizes += core.len();
                    self.formula.add_lb(1);
                    debug!("lower bound {} (core of size {})", self.formula.lb(), core.len());
                    if self.formula.lb() == self.formula.ub() {
                        return Ok(Outcome::Optimum {
                            cost: self.formula.ub(),
                            model: self.model.clone(),
                        });
                    }
                    let (soft_relax, card_relax) = self.relax_core_unweighted(&core)?;
                    self.harden(&soft_relax, &card_relax, 1)?;
                    assumptions = self.rebuild_assumptions();
                }
                SolverResult::Interrupted => unreachable!(),
            }
        }
    }

    fn check_config(&self, expected: ProblemType) -> Result<(), ConfigError> {
        if self.opts.encoding != CardEncoding::Totalizer {
            return Err(ConfigError::UnsupportedEncoding(self.opts.encoding));
        }
        if self.formula.problem_type() != expected {
            return Err(ConfigError::WrongProblemType {
                expected,
                found: self.formula.problem_type(),
            });
        }
        Ok(())
    }

    /// Builds the working backend: the hard clauses plus every soft body
    /// with its relaxation literals appended, and the assumption-to-soft
    /// bookkeeping.
    fn init(&mut self) -> anyhow::Result<()> {
        if let Some(max_var) = self.formula.max_var() {
            self.oracle.reserve(max_var)?;
        }
        for cl in self.formula.hard().iter() {
            self.oracle.add_clause(cl.clone())?;
        }
        for sc in self.formula.iter_soft() {
            debug_assert_eq!(sc.relax_lits(), &[sc.assump()]);
            let mut relaxed = sc.clause().clone();
            relaxed.extend(sc.relax_lits().iter().copied());
            self.oracle.add_clause(relaxed)?;
        }
        self.active_soft.resize(self.formula.n_soft(), false);
        for idx in 0..self.formula.n_soft() {
            self.core_mapping.insert(self.formula.soft(idx).assump(), idx);
        }
        Ok(())
    }

    /// Reads the full solution of a satisfiable oracle call
    fn current_solution(&self) -> anyhow::Result<Assignment> {
        match self.oracle.max_var() {
            Some(max_var) => self.oracle.solution(max_var),
            None => Ok(Assignment::default()),
        }
    }

    /// The cost of a model: the summed weight of soft clauses whose body it
    /// does not satisfy
    fn compute_cost(&self, sol: &Assignment) -> usize {
        self.formula
            .iter_soft()
            .filter(|sc| !sc.clause().is_sat(sol))
            .map(SoftClause::weight)
            .sum()
    }

    /// The minimum weight over the soft clauses and cardinality assumptions
    /// in a core
    fn core_weight(&self, core: &[Lit]) -> usize {
        let mut min_core = usize::MAX;
        for p in core {
            if let Some(&idx) = self.core_mapping.get(p) {
                debug_assert!(!self.active_soft[idx]);
                min_core = cmp::min(min_core, self.formula.soft(idx).weight());
            }
            if let Some(cb) = self.bound_mapping.get(p) {
                min_core = cmp::min(min_core, cb.weight);
            }
        }
        assert_ne!(min_core, usize::MAX, "core contains no known assumption");
        min_core
    }

    /// Relaxes every conflict literal of a weighted core, splitting soft
    /// clauses and duplicating cardinality constraints on weight
    /// discrepancies. Returns the relaxation literals that have to be tied
    /// together by [`OllSolver::harden`].
    fn relax_core(
        &mut self,
        core: &[Lit],
        min_core: usize,
    ) -> anyhow::Result<(Vec<Lit>, Vec<Lit>)> {
        let mut soft_relax = vec![];
        let mut card_relax = vec![];
        for &p in core {
            if let Some(&idx) = self.core_mapping.get(&p) {
                if self.formula.soft(idx).weight() > min_core {
                    // split: keep the clause inactive at the reduced weight
                    // and relax a fresh copy at the core weight
                    assert!(!self.active_soft[idx], "splitting an active soft clause");
                    self.formula.reduce_soft_weight(idx, min_core);
                    let body = self.formula.soft(idx).clause().clone();
                    // cardinality encoders allocate on the backend, catch up
                    // before issuing a logical literal
                    self.formula.sync_with(self.oracle.n_vars());
                    let relax = self.formula.new_lit(false);
                    let new_idx = self.formula.add_relaxed_soft(min_core, body.clone(), relax);
                    self.active_soft.push(true);
                    debug_assert_eq!(self.active_soft.len(), self.formula.n_soft());
                    self.oracle.reserve(relax.var())?;
                    let mut relaxed = body;
                    relaxed.add(relax);
                    self.oracle.add_clause(relaxed)?;
                    self.core_mapping.insert(relax, new_idx);
                    soft_relax.push(relax);
                } else {
                    debug_assert_eq!(self.formula.soft(idx).weight(), min_core);
                    assert!(!self.active_soft[idx], "relaxing an active soft clause");
                    self.active_soft[idx] = true;
                    soft_relax.push(p);
                }
            }
            if let Some(cb) = self.bound_mapping.get(&p).copied() {
                assert!(
                    self.cardinality_assumptions.contains(&p),
                    "cardinality assumption missing from the assumption set"
                );
                debug_assert!(self.soft_cardinality[cb.enc.0].has_encoding());
                if cb.weight == min_core {
                    self.cardinality_assumptions.remove(&p);
                    card_relax.push(p);
                    self.tighten(cb.enc, cb.bound, min_core)?;
                } else {
                    // weight discrepancy: duplicate the constraint over the
                    // same inputs at the core weight and keep the original
                    // at the remaining weight
                    let inputs = self.soft_cardinality[cb.enc.0].lits().to_vec();
                    let mut enc = Totalizer::new();
                    enc.build(&mut self.oracle, &inputs, cb.bound)?;
                    let out = enc.outputs()[cb.bound];
                    self.soft_cardinality.push(enc);
                    let new_enc = EncId(self.soft_cardinality.len() - 1);
                    self.bound_mapping.insert(
                        out,
                        CardBound {
                            enc: new_enc,
                            bound: cb.bound,
                            weight: min_core,
                        },
                    );
                    card_relax.push(out);
                    debug_assert!(cb.weight > min_core);
                    self.bound_mapping
                        .get_mut(&p)
                        .expect("bound mapping lookup miss")
                        .weight = cb.weight - min_core;
                    self.tighten(new_enc, cb.bound, min_core)?;
                }
            }
        }
        assert!(
            !soft_relax.is_empty() || !card_relax.is_empty(),
            "core without relaxable assumptions"
        );
        Ok((soft_relax, card_relax))
    }

    /// The unweighted rendition of [`OllSolver::relax_core`]: no splitting,
    /// no duplication
    fn relax_core_unweighted(&mut self, core: &[Lit]) -> anyhow::Result<(Vec<Lit>, Vec<Lit>)> {
        let mut soft_relax = vec![];
        let mut card_relax = vec![];
        for &p in core {
            if let Some(&idx) = self.core_mapping.get(&p) {
                assert!(!self.active_soft[idx], "relaxing an active soft clause");
                debug_assert_eq!(p, self.formula.soft(idx).relax_lits()[0]);
                self.active_soft[idx] = true;
                soft_relax.push(p);
            }
            if let Some(cb) = self.bound_mapping.get(&p).copied() {
                assert!(
                    self.cardinality_assumptions.remove(&p),
                    "cardinality assumption missing from the assumption set"
                );
                card_relax.push(p);
                self.tighten(cb.enc, cb.bound, 1)?;
            }
        }
        assert!(
            !soft_relax.is_empty() || !card_relax.is_empty(),
            "core without relaxable assumptions"
        );
        Ok((soft_relax, card_relax))
    }

    /// Tightens an encoder to enforce one more relaxed literal and, if the
    /// new bound still restricts anything, assumes the next output
    fn tighten(&mut self, enc: EncId, bound: usize, weight: usize) -> anyhow::Result<()> {
        self.soft_cardinality[enc.0].inc_update(&mut self.oracle, bound + 1)?;
        let tot = &self.soft_cardinality[enc.0];
        // a bound equal to the number of inputs restricts nothing
        if bound + 1 < tot.outputs().len() {
            let out = tot.outputs()[bound + 1];
            self.bound_mapping.insert(
                out,
                CardBound {
                    enc,
                    bound: bound + 1,
                    weight,
                },
            );
            self.cardinality_assumptions.insert(out);
        }
        Ok(())
    }

    /// Ties the relaxed literals of a core together: a unit core hardens
    /// its only literal, anything larger gets an at-most-one totalizer
    /// whose output becomes a cardinality assumption at the core weight
    fn harden(
        &mut self,
        soft_relax: &[Lit],
        card_relax: &[Lit],
        min_core: usize,
    ) -> anyhow::Result<()> {
        if soft_relax.len() == 1 && card_relax.is_empty() {
            // the unique relaxed literal must hold
            self.oracle.add_unit(soft_relax[0])?;
        }
        if soft_relax.len() + card_relax.len() > 1 {
            let mut relax_harden = soft_relax.to_vec();
            relax_harden.extend_from_slice(card_relax);
            let mut enc = Totalizer::new();
            enc.build(&mut self.oracle, &relax_harden, 1)?;
            debug_assert!(enc.outputs().len() > 1);
            let out = enc.outputs()[1];
            self.soft_cardinality.push(enc);
            let enc_id = EncId(self.soft_cardinality.len() - 1);
            self.bound_mapping.insert(
                out,
                CardBound {
                    enc: enc_id,
                    bound: 1,
                    weight: min_core,
                },
            );
            self.cardinality_assumptions.insert(out);
        }
        Ok(())
    }

    /// Rebuilds the assumption vector: the negated assumption literal of
    /// every inactive soft clause and the negated cardinality outputs, both
    /// restricted to the current minimum weight
    fn rebuild_assumptions(&self) -> Vec<Lit> {
        let mut assumptions = vec![];
        for (idx, sc) in self.formula.iter_soft().enumerate() {
            if !self.active_soft[idx] && sc.weight() >= self.min_weight {
                assumptions.push(!sc.assump());
            }
        }
        for out in &self.cardinality_assumptions {
            let cb = self
                .bound_mapping
                .get(out)
                .expect("bound mapping lookup miss");
            if cb.weight >= self.min_weight {
                assumptions.push(!*out);
            }
        }
        trace!("{} assumptions", assumptions.len());
        assumptions
    }

    /// The number of soft clauses and cardinality assumptions below the
    /// current minimum weight, i.e., not yet considered by the search
    fn count_not_considered(&self) -> usize {
        let softs = self
            .formula
            .iter_soft()
            .filter(|sc| sc.weight() < self.min_weight)
            .count();
        let cards = self
            .cardinality_assumptions
            .iter()
            .filter(|out| {
                self.bound_mapping
                    .get(out)
                    .expect("bound mapping lookup miss")
                    .weight
                    < self.min_weight
            })
            .count();
        softs + cards
    }

    /// The largest weight strictly below `weight` over the soft clauses and
    /// cardinality assumptions, or 1 if there is none
    fn find_next_weight(&self, weight: usize) -> usize {
        let mut next_weight = 1;
        for sc in self.formula.iter_soft() {
            if sc.weight() > next_weight && sc.weight() < weight {
                next_weight = sc.weight();
            }
        }
        for out in &self.cardinality_assumptions {
            let w = self
                .bound_mapping
                .get(out)
                .expect("bound mapping lookup miss")
                .weight;
            if w > next_weight && w < weight {
                next_weight = w;
            }
        }
        next_weight
    }

    /// Weight diversity heuristic: lowers the minimum weight stratum by
    /// stratum until the considered clauses are diverse enough (more than
    /// `ALPHA` clauses per distinct weight) or everything is considered
    fn next_weight_diversity(&self, weight: usize) -> usize {
        debug_assert!(self.nb_satisfiable > 0);
        const ALPHA: f64 = 1.25;
        let mut next_weight = weight;
        let mut find_next = false;
        loop {
            if self.nb_satisfiable > 1 || find_next {
                next_weight = self.find_next_weight(next_weight);
            }
            let mut n_considered = 0usize;
            let mut weights = RsHashSet::default();
            for sc in self.formula.iter_soft() {
                if sc.weight() >= next_weight {
                    n_considered += 1;
                    weights.insert(sc.weight());
                }
            }
            for out in &self.cardinality_assumptions {
                let w = self
                    .bound_mapping
                    .get(out)
                    .expect("bound mapping lookup miss")
                    .weight;
                if w >= next_weight {
                    n_considered += 1;
                    weights.insert(w);
                }
            }
            let total = self.formula.n_soft() + self.cardinality_assumptions.len();
            if n_considered == total {
                break;
            }
            #[allow(clippy::cast_precision_loss)]
            if !weights.is_empty() && n_considered as f64 / weights.len() as f64 > ALPHA {
                break;
            }
            if self.nb_satisfiable == 1 && !find_next {
                find_next = true;
            }
        }
        next_weight
    }
}
