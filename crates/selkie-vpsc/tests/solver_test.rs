use selkie_vpsc::{Constraint, Solver, Variable};

fn vars(desired: &[f64]) -> Vec<Variable> {
    desired.iter().map(|&d| Variable::new(d)).collect()
}

fn slacks(positions: &[f64], cs: &[Constraint]) -> Vec<f64> {
    cs.iter()
        .map(|c| positions[c.right] - c.gap - positions[c.left])
        .collect()
}

#[test]
fn unconstrained_variables_stay_at_desired_positions() {
    let mut vs = vars(&[1.0, -2.0, 7.5]);
    let mut cs: Vec<Constraint> = Vec::new();
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    assert_eq!(solver.positions(), vec![1.0, -2.0, 7.5]);
}

#[test]
fn satisfied_constraint_leaves_positions_untouched() {
    let mut vs = vars(&[0.0, 5.0]);
    let mut cs = vec![Constraint::new(0, 1, 2.0)];
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    assert_eq!(solver.positions(), vec![0.0, 5.0]);
    assert!(!cs[0].active);
}

#[test]
fn violated_constraint_splits_displacement_evenly() {
    let mut vs = vars(&[0.0, 0.0]);
    let mut cs = vec![Constraint::new(0, 1, 2.0)];
    let mut solver = Solver::new(&mut vs, &mut cs);
    let cost = solver.solve();
    let ps = solver.positions();
    assert!((ps[0] + 1.0).abs() < 1e-9);
    assert!((ps[1] - 1.0).abs() < 1e-9);
    assert!((cost - 2.0).abs() < 1e-9);
    assert!(cs[0].active);
}

#[test]
fn chain_of_violated_constraints_merges_into_one_block() {
    let mut vs = vars(&[5.0, 3.0, 1.0]);
    let mut cs = vec![Constraint::new(0, 1, 3.0), Constraint::new(1, 2, 3.0)];
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let ps = solver.positions();
    assert!((ps[0] - 0.0).abs() < 1e-9);
    assert!((ps[1] - 3.0).abs() < 1e-9);
    assert!((ps[2] - 6.0).abs() < 1e-9);
}

#[test]
fn heavier_variable_moves_less() {
    let mut vs = vec![Variable::with_weight(0.0, 100.0), Variable::new(0.0)];
    let mut cs = vec![Constraint::new(0, 1, 2.0)];
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let ps = solver.positions();
    assert!((ps[0] - (-2.0 / 101.0)).abs() < 1e-9);
    assert!((ps[1] - ps[0] - 2.0).abs() < 1e-9);
}

#[test]
fn equality_constraint_is_enforced_exactly() {
    // The gap is not violated as an inequality, but equality pulls the
    // variables together anyway.
    let mut vs = vars(&[0.0, 10.0]);
    let mut cs = vec![Constraint::with_equality(0, 1, 2.0, true)];
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let ps = solver.positions();
    assert!((ps[1] - ps[0] - 2.0).abs() < 1e-9);
    assert!((ps[0] - 4.0).abs() < 1e-9);
    assert!((ps[1] - 6.0).abs() < 1e-9);
}

#[test]
fn constraint_cycle_marks_exactly_one_unsatisfiable() {
    let mut vs = vars(&[0.0, 0.0, 0.0]);
    let mut cs = vec![
        Constraint::new(0, 1, 1.0),
        Constraint::new(1, 2, 1.0),
        Constraint::new(2, 0, 1.0),
    ];
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let ps = solver.positions();
    let unsatisfiable = cs.iter().filter(|c| c.unsatisfiable).count();
    assert_eq!(unsatisfiable, 1);
    for (c, s) in cs.iter().zip(slacks(&ps, &cs)) {
        if !c.unsatisfiable {
            assert!(s > -1e-6, "satisfiable constraint violated: slack {s}");
        }
    }
}

#[test]
fn resolving_with_new_desired_positions_reuses_the_solver() {
    let mut vs = vars(&[0.0, 0.0]);
    let mut cs = vec![Constraint::new(0, 1, 2.0)];
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();

    solver.set_desired_positions(&[10.0, 20.0]);
    solver.solve();
    let ps = solver.positions();
    assert!((ps[0] - 10.0).abs() < 1e-4);
    assert!((ps[1] - 20.0).abs() < 1e-4);
}

#[test]
fn overlapping_chain_with_fixed_endpoints_spreads_interior() {
    // Five variables wanting the same spot, pushed apart by uniform gaps.
    let mut vs = vars(&[0.0; 5]);
    let mut cs: Vec<Constraint> = (0..4).map(|i| Constraint::new(i, i + 1, 10.0)).collect();
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let ps = solver.positions();
    for w in ps.windows(2) {
        assert!((w[1] - w[0] - 10.0).abs() < 1e-9);
    }
    // Symmetric about the common desired position.
    assert!((ps[2] - 0.0).abs() < 1e-9);
}
