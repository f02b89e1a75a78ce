//! # Client Context
//!
//! The handle a constraint-building client works through: it owns the
//! growing [`Formula`], hands out variables and literals, translates the
//! client's weight conventions, and runs the weighted core-guided search
//! over the BatSat backend. After solving, the model can be read back per
//! variable.

use log::info;

use crate::{
    algebra::ClauseSet,
    algs::{OllSolver, Outcome},
    instances::{Formula, ProblemType},
    solvers::BatsatSolver,
    types::{Assignment, Lit, TernaryVal, Var},
};

/// Explicit solving context for building and solving one weighted instance
///
/// A set of *output variables* can be declared; [`Context::solve`] reports
/// whether all of them hold in the optimal model, which is the signal the
/// client uses to decide whether the high-level goals were met or only a
/// best-effort assignment exists.
#[derive(Debug, Default)]
pub struct Context {
    formula: Formula,
    output_vars: Vec<Var>,
    model: Option<Assignment>,
    cost: Option<usize>,
}

impl Context {
    /// Creates a new context over an empty weighted formula
    #[must_use]
    pub fn new() -> Self {
        Context {
            formula: Formula::new(ProblemType::Weighted),
            output_vars: vec![],
            model: None,
            cost: None,
        }
    }

    /// Allocates a fresh variable
    pub fn new_var(&mut self) -> Var {
        self.formula.new_var()
    }

    /// Allocates a fresh variable and returns a literal of the requested
    /// polarity over it
    pub fn new_lit(&mut self, negated: bool) -> Lit {
        self.formula.new_lit(negated)
    }

    /// The underlying formula, for the clause algebra operators
    pub fn formula_mut(&mut self) -> &mut Formula {
        &mut self.formula
    }

    /// The underlying formula
    #[must_use]
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Adds every clause of a clause set as a hard clause
    pub fn add_hard(&mut self, set: impl Into<ClauseSet>) {
        self.formula.add_hard_set(set.into());
    }

    /// Adds every clause of a clause set as a soft clause of the given
    /// weight
    ///
    /// # Panics
    ///
    /// If `weight` is zero.
    pub fn add_soft(&mut self, set: impl Into<ClauseSet>, weight: usize) {
        for cl in set.into() {
            self.formula.add_soft(weight, cl);
        }
    }

    /// Adds a clause set with the client's weight convention: a negative
    /// weight means hard, a positive weight soft.
    ///
    /// # Panics
    ///
    /// If `weight` is zero.
    pub fn add_weighted(&mut self, set: impl Into<ClauseSet>, weight: isize) {
        if weight < 0 {
            self.add_hard(set);
        } else {
            assert!(weight > 0, "soft clauses must have positive weight");
            #[allow(clippy::cast_sign_loss)]
            self.add_soft(set, weight as usize);
        }
    }

    /// Declares the output variables whose joint truth [`Context::solve`]
    /// reports
    pub fn declare_output_vars(&mut self, vars: impl IntoIterator<Item = Var>) {
        self.output_vars.extend(vars);
    }

    /// Adds a unit soft clause of the given weight for every declared
    /// output variable, steering the optimizer towards making them all true
    ///
    /// # Panics
    ///
    /// If `weight` is zero.
    pub fn add_output_softs(&mut self, weight: usize) {
        for idx in 0..self.output_vars.len() {
            let var = self.output_vars[idx];
            self.formula.add_soft(weight, crate::types::Clause::from(var.pos_lit()));
        }
    }

    /// Runs the weighted core-guided search and saves the optimal model.
    /// Returns true iff every declared output variable is true in it.
    ///
    /// Consumes the built formula; constraints added afterwards start a new
    /// instance.
    ///
    /// # Errors
    ///
    /// Configuration and backend errors are passed through.
    ///
    /// # Panics
    ///
    /// If the hard constraints are contradictory; the clients of this
    /// context encode anything that may fail as weighted soft constraints
    /// and keep the hard core satisfiable by construction.
    pub fn solve(&mut self) -> anyhow::Result<bool> {
        let formula = std::mem::take(&mut self.formula);
        let mut engine = OllSolver::new(formula, BatsatSolver::default());
        match engine.solve_weighted()? {
            Outcome::Optimum { cost, model } => {
                info!("optimum {cost}");
                self.model = Some(model);
                self.cost = Some(cost);
                Ok(self.all_outputs_true())
            }
            Outcome::Unsat => unreachable!("the weighted search asserts hard-clause consistency"),
        }
    }

    fn all_outputs_true(&self) -> bool {
        self.output_vars.iter().all(|&v| self.value(v))
    }

    /// Reads a variable from the saved model. Anything not assigned false
    /// counts as true.
    ///
    /// # Panics
    ///
    /// If no model has been saved.
    #[must_use]
    pub fn value(&self, var: Var) -> bool {
        let model = self.model.as_ref().expect("no model saved");
        model.var_value(var) != TernaryVal::False
    }

    /// Same as [`Context::value`] but for literals
    ///
    /// # Panics
    ///
    /// If no model has been saved.
    #[must_use]
    pub fn lit_value(&self, lit: Lit) -> bool {
        let model = self.model.as_ref().expect("no model saved");
        model.lit_value(lit) != TernaryVal::False
    }

    /// The saved optimal model, if the last [`Context::solve`] found one
    #[must_use]
    pub fn model(&self) -> Option<&Assignment> {
        self.model.as_ref()
    }

    /// The cost of the saved model
    #[must_use]
    pub fn cost(&self) -> Option<usize> {
        self.cost
    }
}
