//! # Clause-Set Algebra
//!
//! A value-typed CNF formula fragment ([`ClauseSet`]) with negation,
//! conjunction, disjunction and implication. The operators keep the result
//! in CNF and preserve logical strength in both directions, so a clause set
//! built here can be used as the antecedent of an implication.
//!
//! Disjunction is where the design earns its keep. The naive CNF product of
//! an `m`-clause and an `n`-clause operand has `m * n` clauses; a plain
//! Tseitin encoding is linear but only equi-satisfiable, which breaks
//! nesting: if the Tseitin result is falsified, nothing forces the original
//! operands to be false. [`ClauseSet::or`] instead allocates selector
//! variables and emits side-effect clauses into the owning [`Formula`] such
//! that falsifying the returned fragment falsifies both operands. The cost
//! is linear and the direction needed by `implies` is preserved.
//!
//! All operators that allocate selectors take the owning [`Formula`]
//! explicitly; there is no hidden global context. Operands must be built
//! over variables of that same formula.

use std::{fmt, slice, vec};

use crate::{
    instances::Formula,
    types::{Assignment, Clause, Lit, Var},
};

/// A set of clauses interpreted as their conjunction, i.e., a CNF formula
/// fragment.
///
/// The empty set is the neutral element of [`ClauseSet::and`]; a set
/// containing the empty clause is unsatisfiable.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ClauseSet {
    clauses: Vec<Clause>,
}

impl ClauseSet {
    /// Creates an empty clause set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clause set asserting a single literal
    #[must_use]
    pub fn unit(lit: Lit) -> Self {
        Self {
            clauses: vec![Clause::from(lit)],
        }
    }

    /// The number of clauses in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Checks whether the set contains no clauses
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Gets an iterator over the clauses in the set
    pub fn iter(&self) -> slice::Iter<'_, Clause> {
        self.clauses.iter()
    }

    /// Adds a clause to the set (conjunctively)
    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// The conjunction of two clause sets: the concatenation of their
    /// clauses. Pure, no side effects.
    #[must_use]
    pub fn and(&self, other: &ClauseSet) -> ClauseSet {
        let mut clauses = self.clauses.clone();
        clauses.extend(other.clauses.iter().cloned());
        ClauseSet { clauses }
    }

    /// The disjunction of two clause sets.
    ///
    /// Returns a single-clause set `(x | y)` over two fresh selector
    /// variables and emits hard clauses into `formula` tying the selectors
    /// to the operands: `x` implies every clause of `self` (via one fresh
    /// selector per clause), `y` every clause of `other`, and falsifying
    /// `(x | y)` falsifies a clause of each operand. A model of the emitted
    /// clauses can always extend an assignment of the operand variables, and
    /// whenever the returned fragment is false under such a model, both
    /// operands are false, which is exactly what [`ClauseSet::implies`]
    /// requires of its antecedent.
    ///
    /// If either operand has no clauses, the other operand is returned
    /// unchanged and nothing is emitted.
    #[must_use]
    pub fn or(&self, other: &ClauseSet, formula: &mut Formula) -> ClauseSet {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let x = formula.new_lit(false);
        let y = formula.new_lit(false);
        let mut xrep = Clause::from(x);
        let mut yrep = Clause::from(y);
        Self::emit_selected(&self.clauses, x, &mut xrep, formula);
        Self::emit_selected(&other.clauses, y, &mut yrep, formula);
        formula.add_hard(xrep);
        formula.add_hard(yrep);
        ClauseSet {
            clauses: vec![Clause::from(vec![x, y])],
        }
    }

    /// Ties one disjunction operand to its selector literal `sel`. For every
    /// clause `C` a fresh `c` is allocated with `sel -> c`, `l -> c` for
    /// every literal of `C`, and `c -> C`; `!c` is collected into `rep`.
    fn emit_selected(clauses: &[Clause], sel: Lit, rep: &mut Clause, formula: &mut Formula) {
        for cl in clauses {
            let c = formula.new_lit(false);
            rep.add(!c);
            formula.add_hard(Clause::from(vec![c, !sel]));
            let mut definition = Clause::with_capacity(cl.len() + 1);
            definition.add(!c);
            for &l in cl {
                formula.add_hard(Clause::from(vec![c, !l]));
                definition.add(l);
            }
            formula.add_hard(definition);
        }
    }

    /// The negation of the clause set.
    ///
    /// `!(C1 & ... & Cm)` is `!C1 | ... | !Cm`, where the negation of a
    /// clause is the conjunction of its negated literals. The disjunctions
    /// are re-normalized to CNF with [`ClauseSet::or`] and therefore carry
    /// its side effects. The empty set negates to the unsatisfiable set
    /// containing the empty clause.
    #[must_use]
    pub fn negate(&self, formula: &mut Formula) -> ClauseSet {
        if self.is_empty() {
            return ClauseSet {
                clauses: vec![Clause::new()],
            };
        }
        let mut negation = Self::negate_clause(&self.clauses[0]);
        for cl in &self.clauses[1..] {
            negation = negation.or(&Self::negate_clause(cl), formula);
        }
        negation
    }

    /// The negation of a single clause as a set of unit clauses
    fn negate_clause(clause: &Clause) -> ClauseSet {
        ClauseSet {
            clauses: clause.iter().map(|&l| Clause::from(!l)).collect(),
        }
    }

    /// The implication `self -> other`, defined as `!self | other`. Carries
    /// the side effects of [`ClauseSet::negate`] and [`ClauseSet::or`].
    #[must_use]
    pub fn implies(&self, other: &ClauseSet, formula: &mut Formula) -> ClauseSet {
        self.negate(formula).or(other, formula)
    }

    /// Evaluates the clause set under a (total) assignment of its variables
    #[must_use]
    pub fn eval(&self, assignment: &Assignment) -> bool {
        self.clauses.iter().all(|cl| cl.is_sat(assignment))
    }
}

impl From<Var> for ClauseSet {
    fn from(var: Var) -> Self {
        ClauseSet::unit(var.pos_lit())
    }
}

impl From<Lit> for ClauseSet {
    fn from(lit: Lit) -> Self {
        ClauseSet::unit(lit)
    }
}

impl From<Clause> for ClauseSet {
    fn from(clause: Clause) -> Self {
        ClauseSet {
            clauses: vec![clause],
        }
    }
}

impl From<Vec<Clause>> for ClauseSet {
    fn from(clauses: Vec<Clause>) -> Self {
        ClauseSet { clauses }
    }
}

impl FromIterator<Clause> for ClauseSet {
    fn from_iter<T: IntoIterator<Item = Clause>>(iter: T) -> Self {
        ClauseSet {
            clauses: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ClauseSet {
    type Item = Clause;
    type IntoIter = vec::IntoIter<Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.into_iter()
    }
}

impl<'slf> IntoIterator for &'slf ClauseSet {
    type Item = &'slf Clause;
    type IntoIter = slice::Iter<'slf, Clause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}

impl fmt::Debug for ClauseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.clauses).finish()
    }
}

impl fmt::Display for ClauseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for cl in &self.clauses {
            if !first {
                write!(f, " & ")?;
            }
            write!(f, "{cl}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ClauseSet;
    use crate::{
        clause, lit,
        instances::{Formula, ProblemType},
        types::{Assignment, Clause, Lit, TernaryVal, Var},
    };

    /// Enumerates all assignments over variables `0..n_vars`
    fn all_assignments(n_vars: u32) -> impl Iterator<Item = Assignment> {
        (0u64..(1 << n_vars)).map(move |bits| {
            (0..n_vars)
                .map(|idx| bits & (1 << idx) != 0)
                .collect::<Assignment>()
        })
    }

    /// Checks whether all hard clauses of `formula` from index `from` on are
    /// satisfied
    fn side_clauses_sat(formula: &Formula, from: usize, assign: &Assignment) -> bool {
        (from..formula.hard().len()).all(|idx| formula.hard()[idx].is_sat(assign))
    }

    /// Whether some extension of `assign` over the variables `ext_from..`
    /// satisfies the side-effect clauses and the returned fragment (if
    /// `fragment_true`), with the fragment false otherwise
    fn extension_exists(
        formula: &Formula,
        side_from: usize,
        fragment: &ClauseSet,
        assign: &Assignment,
        ext_from: u32,
        fragment_true: bool,
    ) -> bool {
        let n_ext = formula.n_vars() - ext_from;
        (0u64..(1 << n_ext)).any(|bits| {
            let mut full = assign.clone();
            for offset in 0..n_ext {
                let val = TernaryVal::from(bits & (1 << offset) != 0);
                full.assign_var(Var::new(ext_from + offset), val);
            }
            side_clauses_sat(formula, side_from, &full) && fragment.eval(&full) == fragment_true
        })
    }

    fn setup(n_vars: u32) -> Formula {
        let mut formula = Formula::new(ProblemType::Weighted);
        for _ in 0..n_vars {
            formula.new_var();
        }
        formula
    }

    #[test]
    fn and_is_concatenation() {
        let p = ClauseSet::from(vec![clause![lit![0], lit![1]], clause![lit![2]]]);
        let q = ClauseSet::from(clause![!lit![0]]);
        let conj = p.and(&q);
        assert_eq!(conj.len(), 3);
        for assign in all_assignments(3) {
            assert_eq!(conj.eval(&assign), p.eval(&assign) && q.eval(&assign));
        }
    }

    #[test]
    fn or_empty_operands() {
        let mut formula = setup(2);
        let n_hard = formula.hard().len();
        let n_vars = formula.n_vars();
        let p = ClauseSet::from(clause![lit![0], lit![1]]);
        let empty = ClauseSet::new();
        assert_eq!(empty.or(&p, &mut formula), p);
        assert_eq!(p.or(&empty, &mut formula), p);
        // no side effects on either early return
        assert_eq!(formula.hard().len(), n_hard);
        assert_eq!(formula.n_vars(), n_vars);
    }

    #[test]
    fn or_models_disjunction() {
        let mut formula = setup(4);
        let p = ClauseSet::from(vec![clause![lit![0], lit![1]], clause![lit![2]]]);
        let q = ClauseSet::from(clause![lit![3]]);
        let side_from = formula.hard().len();
        let fragment = p.or(&q, &mut formula);
        assert_eq!(fragment.len(), 1);
        for assign in all_assignments(4) {
            let expected = p.eval(&assign) || q.eval(&assign);
            assert_eq!(
                extension_exists(&formula, side_from, &fragment, &assign, 4, true),
                expected,
                "disjunction mismatch under {assign}",
            );
        }
    }

    #[test]
    fn or_preserves_direction() {
        // in any total model satisfying the side clauses with the returned
        // fragment false, both operands must be false
        let mut formula = setup(4);
        let p = ClauseSet::from(vec![clause![lit![0], lit![1]], clause![lit![2]]]);
        let q = ClauseSet::from(clause![lit![3]]);
        let side_from = formula.hard().len();
        let fragment = p.or(&q, &mut formula);
        let n_all = formula.n_vars();
        for full in all_assignments(n_all) {
            if side_clauses_sat(&formula, side_from, &full) && !fragment.eval(&full) {
                assert!(!p.eval(&full));
                assert!(!q.eval(&full));
            }
        }
    }

    #[test]
    fn negation_flips_truth() {
        let mut formula = setup(3);
        let s = ClauseSet::from(vec![clause![lit![0], lit![1]], clause![!lit![1], lit![2]]]);
        let side_from = formula.hard().len();
        let negation = s.negate(&mut formula);
        for assign in all_assignments(3) {
            assert_eq!(
                extension_exists(&formula, side_from, &negation, &assign, 3, true),
                !s.eval(&assign),
                "negation mismatch under {assign}",
            );
        }
    }

    #[test]
    fn negate_single_clause_needs_no_selectors() {
        let mut formula = setup(2);
        let n_vars = formula.n_vars();
        let s = ClauseSet::from(clause![lit![0], !lit![1]]);
        let negation = s.negate(&mut formula);
        // a single clause negates to plain unit clauses
        assert_eq!(formula.n_vars(), n_vars);
        assert_eq!(
            negation,
            ClauseSet::from(vec![clause![!lit![0]], clause![lit![1]]])
        );
    }

    #[test]
    fn negate_empty_is_false() {
        let mut formula = setup(0);
        let negation = ClauseSet::new().negate(&mut formula);
        assert_eq!(negation.len(), 1);
        assert!(negation.iter().next().unwrap().is_empty());
    }

    #[test]
    fn implication_semantics() {
        let mut formula = setup(3);
        let p = ClauseSet::from(vec![clause![lit![0]], clause![lit![1]]]);
        let q = ClauseSet::from(clause![lit![2]]);
        let side_from = formula.hard().len();
        let implication = p.implies(&q, &mut formula);
        for assign in all_assignments(3) {
            let expected = !p.eval(&assign) || q.eval(&assign);
            assert_eq!(
                extension_exists(&formula, side_from, &implication, &assign, 3, true),
                expected,
                "implication mismatch under {assign}",
            );
        }
    }

    #[test]
    fn unit_constructors() {
        let set = ClauseSet::from(Var::new(3));
        assert_eq!(set, ClauseSet::unit(Lit::positive(3)));
        let set = ClauseSet::from(!lit![2]);
        assert_eq!(set.len(), 1);
        let set = ClauseSet::from(Clause::from(vec![lit![0], lit![1]]));
        assert_eq!(set.len(), 1);
    }
}
