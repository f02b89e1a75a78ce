//! # Incremental Totalizer Encoding
//!
//! Implementation of the binary adder tree totalizer encoding \[1\],
//! incremental as extended in \[2\]: the tree and all of its output
//! variables are created once, clauses enforcing the count semantics are
//! emitted lazily as the bound is tightened, and tightening never
//! invalidates previously emitted clauses.
//!
//! Only the upper-bound direction is encoded (`>= i+1` inputs true forces
//! output `i` true), which is what assumption-based at-most-k enforcement
//! needs: assuming the negation of output `k` excludes every model with
//! more than `k` true inputs.
//!
//! Output variables are allocated on the SAT backend itself, not on the
//! logical formula; callers interleaving logical allocations have to re-sync
//! the two (see [`crate::instances::Formula::sync_with`]).
//!
//! ## References
//!
//! - \[1\] Olivier Bailleux and Yacine Boufkhad: _Efficient CNF Encoding of
//!   Boolean Cardinality Constraints_, CP 2003.
//! - \[2\] Ruben Martins and Saurabh Joshi and Vasco Manquinho and Ines
//!   Lynce: _Incremental Cardinality Constraints for MaxSAT_, CP 2014.

use std::cmp;

use crate::{
    encodings::Error,
    solvers::Solve,
    types::{Clause, Lit},
};

/// Incremental at-most-k totalizer over a fixed input literal multiset
#[derive(Debug, Default)]
pub struct Totalizer {
    /// The input literals
    in_lits: Vec<Lit>,
    /// The root of the adder tree, once built
    root: Option<Node>,
    /// The bound the encoding currently enforces when the corresponding
    /// output is assumed
    bound: usize,
}

impl Totalizer {
    /// Creates a new, unbuilt totalizer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`Totalizer::build`] has been called
    #[must_use]
    pub fn has_encoding(&self) -> bool {
        self.root.is_some()
    }

    /// The input literals of the encoding
    #[must_use]
    pub fn lits(&self) -> &[Lit] {
        &self.in_lits
    }

    /// The ordered output literals; `outputs()[i]` is true iff at least
    /// `i+1` input literals are true. All outputs exist as soon as the
    /// encoding is built, independent of the encoded bound.
    ///
    /// # Panics
    ///
    /// If the encoding is not built.
    #[must_use]
    pub fn outputs(&self) -> &[Lit] {
        match self.root.as_ref().expect("totalizer is not built") {
            Node::Leaf(_) => unreachable!("adder tree over >= 2 inputs has an internal root"),
            Node::Internal { out_lits, .. } => out_lits,
        }
    }

    /// The currently enforceable bound
    #[must_use]
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Builds the adder tree over `inputs`, reserves all output variables on
    /// the solver and emits the clauses needed to enforce at-most-`bound` by
    /// assuming `!outputs()[bound]`.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyEncoded`] if called twice; solver errors are passed
    /// through.
    ///
    /// # Panics
    ///
    /// If `inputs` has fewer than two literals.
    pub fn build<S: Solve + ?Sized>(
        &mut self,
        solver: &mut S,
        inputs: &[Lit],
        bound: usize,
    ) -> anyhow::Result<()> {
        if self.has_encoding() {
            return Err(Error::AlreadyEncoded.into());
        }
        assert!(inputs.len() >= 2, "totalizer needs at least two inputs");
        self.in_lits = inputs.to_vec();
        let mut root = Node::build_tree(inputs);
        root.reserve_vars(solver);
        root.encode_ub(bound, solver)?;
        self.root = Some(root);
        self.bound = bound;
        Ok(())
    }

    /// Tightens the encoding so that at-most-`new_bound` can be enforced by
    /// assuming `!outputs()[new_bound]`. Only the clauses for the widened
    /// range are emitted.
    ///
    /// # Errors
    ///
    /// [`Error::NotEncoded`] if the encoding is not built,
    /// [`Error::BoundTooLow`] if `new_bound` is below the current bound;
    /// solver errors are passed through.
    pub fn inc_update<S: Solve + ?Sized>(
        &mut self,
        solver: &mut S,
        new_bound: usize,
    ) -> anyhow::Result<()> {
        let Some(root) = self.root.as_mut() else {
            return Err(Error::NotEncoded.into());
        };
        if new_bound < self.bound {
            return Err(Error::BoundTooLow(new_bound, self.bound).into());
        }
        root.encode_ub(new_bound, solver)?;
        self.bound = new_bound;
        Ok(())
    }
}

/// A node of the binary adder tree
#[derive(Debug)]
enum Node {
    Leaf(Lit),
    Internal {
        /// The output literals; reserved in full when the tree is built
        out_lits: Vec<Lit>,
        /// The maximum count this node can represent
        max_val: usize,
        /// Counts `1..=encoded_vals` have their defining clauses emitted
        encoded_vals: usize,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Recursively builds the tree structure, without allocating variables
    fn build_tree(lits: &[Lit]) -> Node {
        debug_assert!(!lits.is_empty());
        if lits.len() == 1 {
            return Node::Leaf(lits[0]);
        }
        let split = lits.len() / 2;
        let left = Node::build_tree(&lits[..split]);
        let right = Node::build_tree(&lits[split..]);
        Node::Internal {
            out_lits: vec![],
            max_val: lits.len(),
            encoded_vals: 0,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Allocates all output variables of the subtree on the solver, depth
    /// first so that variable order is deterministic
    fn reserve_vars<S: Solve + ?Sized>(&mut self, solver: &mut S) {
        let Node::Internal {
            out_lits,
            max_val,
            left,
            right,
            ..
        } = self
        else {
            return;
        };
        left.reserve_vars(solver);
        right.reserve_vars(solver);
        debug_assert!(out_lits.is_empty());
        out_lits.extend((0..*max_val).map(|_| solver.fresh_var().pos_lit()));
    }

    /// The output literals representing counts `1..=max_val`; a leaf
    /// represents count 1 through its input literal
    fn output_slice(&self) -> &[Lit] {
        match self {
            Node::Leaf(lit) => std::slice::from_ref(lit),
            Node::Internal { out_lits, .. } => out_lits,
        }
    }

    /// Emits the upper-bound adder clauses so that every count up to
    /// `bound + 1` propagates from the children to this node's outputs.
    /// Incremental: only counts beyond the already-encoded range produce
    /// clauses.
    fn encode_ub<S: Solve + ?Sized>(&mut self, bound: usize, solver: &mut S) -> anyhow::Result<()> {
        let Node::Internal {
            out_lits,
            max_val,
            encoded_vals,
            left,
            right,
        } = self
        else {
            return Ok(());
        };
        let new_top = cmp::min(bound + 1, *max_val);
        if new_top <= *encoded_vals {
            return Ok(());
        }
        left.encode_ub(bound, solver)?;
        right.encode_ub(bound, solver)?;
        let left_outs = left.output_slice();
        let right_outs = right.output_slice();
        for sum in *encoded_vals + 1..=new_top {
            for left_val in 0..=cmp::min(sum, left_outs.len()) {
                let right_val = sum - left_val;
                if right_val > right_outs.len() {
                    continue;
                }
                // (left >= a) & (right >= b) -> (out >= a+b)
                let mut clause = Clause::with_capacity(3);
                if left_val > 0 {
                    clause.add(!left_outs[left_val - 1]);
                }
                if right_val > 0 {
                    clause.add(!right_outs[right_val - 1]);
                }
                clause.add(out_lits[sum - 1]);
                solver.add_clause(clause)?;
            }
        }
        *encoded_vals = new_top;
        Ok(())
    }
}
