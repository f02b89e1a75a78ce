//! End-to-end tests of the core-guided search over the BatSat backend

use ollsat::{
    algs::{OllSolver, Outcome},
    clause,
    instances::{Formula, ProblemType},
    solvers::BatsatSolver,
    types::{Assignment, Clause, TernaryVal, Var},
};

fn optimum(formula: Formula) -> (usize, Assignment, OllSolver<BatsatSolver>) {
    let mut engine = OllSolver::new(formula, BatsatSolver::default());
    match engine.solve().unwrap() {
        Outcome::Optimum { cost, model } => (cost, model, engine),
        Outcome::Unsat => panic!("expected an optimum"),
    }
}

/// Recomputes the cost of a model over the original soft clauses
fn model_cost(softs: &[(usize, Clause)], model: &Assignment) -> usize {
    softs
        .iter()
        .filter(|(_, cl)| !cl.is_sat(model))
        .map(|(w, _)| w)
        .sum()
}

fn is_true(model: &Assignment, var: Var) -> bool {
    model.var_value(var) == TernaryVal::True
}

#[test]
fn forced_violation() {
    // hard (a); soft (!a) with weight 3: the model must pay 3
    let mut formula = Formula::new(ProblemType::Weighted);
    let a = formula.new_var();
    formula.add_hard(clause![a.pos_lit()]);
    formula.add_soft(3, clause![a.neg_lit()]);
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 3);
    assert!(is_true(&model, a));
    let stats = engine.stats();
    assert_eq!(stats.lb, 3);
    assert_eq!(stats.ub, 3);
}

#[test]
fn one_of_two() {
    // hard (a | b); unit weight softs against both
    let mut formula = Formula::new(ProblemType::Weighted);
    let a = formula.new_var();
    let b = formula.new_var();
    formula.add_hard(clause![a.pos_lit(), b.pos_lit()]);
    formula.add_soft(1, clause![a.neg_lit()]);
    formula.add_soft(1, clause![b.neg_lit()]);
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 1);
    assert!(is_true(&model, a) ^ is_true(&model, b));
    assert_eq!(engine.stats().lb, engine.stats().ub);
}

#[test]
fn three_forced_violations() {
    // hard (a), (b), (c); a weight-5 soft against each: every soft is a
    // core of its own and the bounds meet at 15
    let mut formula = Formula::new(ProblemType::Weighted);
    let mut softs = vec![];
    for _ in 0..3 {
        let v = formula.new_var();
        formula.add_hard(clause![v.pos_lit()]);
        formula.add_soft(5, clause![v.neg_lit()]);
        softs.push((5, clause![v.neg_lit()]));
    }
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 15);
    assert_eq!(model_cost(&softs, &model), 15);
    let stats = engine.stats();
    assert_eq!(stats.lb, 15);
    assert_eq!(stats.ub, 15);
    assert!(stats.n_cores >= 1);
    assert!(stats.n_sat_calls >= 1);
}

#[test]
fn stratified_weights() {
    // softs with weights 7, 5, 5, 3; the three lighter ones are mutually
    // exclusive, the weight-7 one is free: keep 7 and one 5, pay 5 + 3
    let mut formula = Formula::new(ProblemType::Weighted);
    let s1 = formula.new_var();
    let s2 = formula.new_var();
    let s3 = formula.new_var();
    let s4 = formula.new_var();
    for (v, w) in [(s1, 7), (s2, 5), (s3, 5), (s4, 3)] {
        formula.add_soft(w, clause![v.pos_lit()]);
    }
    for (u, v) in [(s2, s3), (s2, s4), (s3, s4)] {
        formula.add_hard(clause![u.neg_lit(), v.neg_lit()]);
    }
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 8);
    assert!(is_true(&model, s1));
    assert!(is_true(&model, s2) || is_true(&model, s3));
    assert_eq!(engine.stats().lb, 8);
    assert_eq!(engine.stats().ub, 8);
}

#[test]
fn repeated_cores_tighten_bounds() {
    // three weight-2 softs, pairwise conflicting: at most one can hold, so
    // two violations at weight 2 each; the second core re-enters the
    // cardinality constraint from the first
    let mut formula = Formula::new(ProblemType::Weighted);
    let vars: Vec<_> = (0..3).map(|_| formula.new_var()).collect();
    let mut softs = vec![];
    for &v in &vars {
        formula.add_soft(2, clause![v.pos_lit()]);
        softs.push((2, clause![v.pos_lit()]));
    }
    for i in 0..vars.len() {
        for j in i + 1..vars.len() {
            formula.add_hard(clause![vars[i].neg_lit(), vars[j].neg_lit()]);
        }
    }
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 4);
    assert_eq!(model_cost(&softs, &model), 4);
    let stats = engine.stats();
    assert_eq!(stats.lb, 4);
    assert_eq!(stats.ub, 4);
    assert!(stats.n_cores >= 2);
}

#[test]
fn weight_splitting() {
    // a core over softs of weight 4 and 2 splits the heavier clause; the
    // split must not change what any model pays
    let mut formula = Formula::new(ProblemType::Weighted);
    let a = formula.new_var();
    let b = formula.new_var();
    formula.add_soft(4, clause![a.pos_lit()]);
    formula.add_soft(2, clause![b.pos_lit()]);
    formula.add_hard(clause![a.neg_lit(), b.neg_lit()]);
    let softs = vec![(4, clause![a.pos_lit()]), (2, clause![b.pos_lit()])];
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 2);
    assert!(is_true(&model, a));
    assert!(!is_true(&model, b));
    assert_eq!(model_cost(&softs, &model), 2);
    assert_eq!(engine.stats().lb, 2);
}

#[test]
fn cardinality_duplication() {
    // weights 3, 3, 1, 1; the two heavy softs conflict with each other and
    // both light softs conflict with both heavy ones. The first core is
    // heavy-heavy at weight 3; a later core mixes its cardinality output
    // (weight 3) with a weight-1 soft, forcing the constraint to be
    // duplicated at the lower weight. Optimum keeps one heavy soft: 3+1+1.
    let mut formula = Formula::new(ProblemType::Weighted);
    let h1 = formula.new_var();
    let h2 = formula.new_var();
    let l1 = formula.new_var();
    let l2 = formula.new_var();
    let mut softs = vec![];
    for (v, w) in [(h1, 3), (h2, 3), (l1, 1), (l2, 1)] {
        formula.add_soft(w, clause![v.pos_lit()]);
        softs.push((w, clause![v.pos_lit()]));
    }
    formula.add_hard(clause![h1.neg_lit(), h2.neg_lit()]);
    for light in [l1, l2] {
        for heavy in [h1, h2] {
            formula.add_hard(clause![light.neg_lit(), heavy.neg_lit()]);
        }
    }
    let (cost, model, engine) = optimum(formula);
    assert_eq!(cost, 5);
    assert!(is_true(&model, h1) ^ is_true(&model, h2));
    assert_eq!(model_cost(&softs, &model), 5);
    let stats = engine.stats();
    assert_eq!(stats.lb, 5);
    assert_eq!(stats.ub, 5);
}

#[test]
fn all_softs_satisfiable() {
    let mut formula = Formula::new(ProblemType::Weighted);
    let a = formula.new_var();
    let b = formula.new_var();
    formula.add_hard(clause![a.pos_lit(), b.pos_lit()]);
    formula.add_soft(3, clause![a.pos_lit()]);
    formula.add_soft(2, clause![b.pos_lit()]);
    let (cost, _, engine) = optimum(formula);
    assert_eq!(cost, 0);
    assert_eq!(engine.stats().lb, 0);
}

#[test]
#[should_panic(expected = "unsatisfiable before any satisfiable")]
fn contradictory_hard_clauses_abort() {
    // the engine optimizes softs over a consistent hard core; a
    // contradictory hard set is a caller bug and hits the first-call
    // assertion instead of coming back as a result
    let mut formula = Formula::new(ProblemType::Weighted);
    let a = formula.new_var();
    let b = formula.new_var();
    formula.add_hard(clause![a.pos_lit()]);
    formula.add_hard(clause![a.neg_lit()]);
    formula.add_soft(2, clause![b.pos_lit()]);
    formula.add_soft(1, clause![b.neg_lit()]);
    let mut engine = OllSolver::new(formula, BatsatSolver::default());
    let _ = engine.solve();
}

#[test]
fn unweighted_msu_path() {
    // four unit softs, pairwise conflicting: three violations
    let mut formula = Formula::new(ProblemType::Unweighted);
    let vars: Vec<_> = (0..4).map(|_| formula.new_var()).collect();
    for &v in &vars {
        formula.add_soft(1, clause![v.pos_lit()]);
    }
    for i in 0..vars.len() {
        for j in i + 1..vars.len() {
            formula.add_hard(clause![vars[i].neg_lit(), vars[j].neg_lit()]);
        }
    }
    let mut engine = OllSolver::new(formula, BatsatSolver::default());
    let Outcome::Optimum { cost, model } = engine.solve().unwrap() else {
        panic!("expected an optimum");
    };
    assert_eq!(cost, 3);
    let n_true = vars.iter().filter(|&&v| is_true(&model, v)).count();
    assert!(n_true <= 1);
    assert_eq!(engine.stats().lb, 3);
}

#[test]
fn larger_mixed_instance() {
    // a small scheduling-shaped instance: 4 items, 3 slots, each item in
    // exactly one slot (hard), preferred slots as weighted softs, one slot
    // pair forbidden (hard)
    let mut formula = Formula::new(ProblemType::Weighted);
    let mut item_slot = vec![];
    for _ in 0..4 {
        let slots: Vec<_> = (0..3).map(|_| formula.new_var()).collect();
        // at least one slot
        formula.add_hard(slots.iter().map(|s| s.pos_lit()).collect::<Vec<_>>().into());
        // at most one slot
        for i in 0..slots.len() {
            for j in i + 1..slots.len() {
                formula.add_hard(clause![slots[i].neg_lit(), slots[j].neg_lit()]);
            }
        }
        item_slot.push(slots);
    }
    // items 0 and 1 cannot share slot 0
    formula.add_hard(clause![item_slot[0][0].neg_lit(), item_slot[1][0].neg_lit()]);
    // everyone prefers slot 0, with different insistence
    let mut softs = vec![];
    for (item, weight) in [(0usize, 4usize), (1, 3), (2, 2), (3, 1)] {
        formula.add_soft(weight, clause![item_slot[item][0].pos_lit()]);
        softs.push((weight, clause![item_slot[item][0].pos_lit()]));
    }
    let (cost, model, engine) = optimum(formula);
    // items 2 and 3 can take slot 0 freely; of items 0 and 1 only one can,
    // and dropping item 1 is cheaper
    assert_eq!(cost, 3);
    assert_eq!(model_cost(&softs, &model), 3);
    assert!(is_true(&model, item_slot[0][0]));
    let stats = engine.stats();
    assert_eq!(stats.lb, stats.ub);
}
