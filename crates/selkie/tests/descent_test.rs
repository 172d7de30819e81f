use selkie::descent::{Descent, Project, PseudoRandom};

fn distance(x: &[Vec<f64>], i: usize, j: usize) -> f64 {
    let dx = x[0][i] - x[0][j];
    let dy = x[1][i] - x[1][j];
    (dx * dx + dy * dy).sqrt()
}

fn path_ideal_distances(n: usize) -> Vec<Vec<f64>> {
    Descent::create_square_matrix(n, |i, j| (i as f64 - j as f64).abs())
}

#[test]
fn pseudo_random_sequence_is_reproducible() {
    let mut a = PseudoRandom::default();
    let mut b = PseudoRandom::new(1);
    for _ in 0..100 {
        assert_eq!(a.get_next(), b.get_next());
    }
    let first = PseudoRandom::new(1).get_next();
    assert!((first - 41.0 / 32767.0).abs() < 1e-12);
}

#[test]
fn pseudo_random_stays_in_unit_range() {
    let mut r = PseudoRandom::new(17);
    for _ in 0..1000 {
        let v = r.get_next();
        assert!((0.0..1.0).contains(&v));
    }
    let mut r = PseudoRandom::new(17);
    for _ in 0..1000 {
        let v = r.get_next_between(3.0, 5.0);
        assert!((3.0..5.0).contains(&v));
    }
}

#[test]
fn stress_is_zero_for_an_exact_layout() {
    let x = vec![vec![0.0, 1.0, 2.0], vec![0.0, 0.0, 0.0]];
    let descent = Descent::new(x, path_ideal_distances(3));
    assert!(descent.compute_stress() < 1e-12);
}

#[test]
fn descent_reduces_stress_monotonically() {
    let x = vec![vec![0.0, 3.0, 1.0, 4.0, 2.0], vec![0.0, 1.0, 4.0, 2.0, 3.0]];
    let mut descent = Descent::new(x, path_ideal_distances(5));
    let mut prev = descent.compute_stress();
    for _ in 0..10 {
        let s = descent.runge_kutta(None);
        assert!(s <= prev + 1e-9, "stress rose from {prev} to {s}");
        prev = s;
    }
}

#[test]
fn run_converges_near_the_ideal_distances() {
    let x = vec![vec![0.0, 0.5, 2.5, 2.0], vec![0.0, 1.5, 0.5, 2.0]];
    let mut descent = Descent::new(x, path_ideal_distances(4));
    descent.run(200, None);
    for i in 0..4 {
        for j in i + 1..4 {
            let ideal = (j - i) as f64;
            let got = distance(&descent.x, i, j);
            assert!(
                (got - ideal).abs() / ideal < 0.15,
                "pair ({i},{j}): got {got}, ideal {ideal}"
            );
        }
    }
}

#[test]
fn coincident_points_are_pulled_apart() {
    let x = vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]];
    let mut descent = Descent::new(x, path_ideal_distances(3));
    descent.run(50, None);
    for i in 0..3 {
        assert!(descent.x[0][i].is_finite() && descent.x[1][i].is_finite());
        for j in i + 1..3 {
            assert!(distance(&descent.x, i, j) > 0.1);
        }
    }
}

#[test]
fn locked_node_is_held_near_its_lock_position() {
    let x = vec![vec![0.0, 0.3], vec![0.0, 0.1]];
    let d = Descent::create_square_matrix(2, |i, j| if i == j { 0.0 } else { 1.0 });
    let mut descent = Descent::new(x, d);
    descent.locks.add(0, [5.0, 5.0]);
    descent.run(100, None);
    let dx = descent.x[0][0] - 5.0;
    let dy = descent.x[1][0] - 5.0;
    assert!(
        (dx * dx + dy * dy).sqrt() < 1.0,
        "locked node drifted to ({}, {})",
        descent.x[0][0],
        descent.x[1][0]
    );
    assert!((distance(&descent.x, 0, 1) - 1.0).abs() < 0.1);
}

#[test]
fn single_gradient_step_reduces_stress() {
    let x = vec![vec![0.0, 3.0, 1.0, 4.0], vec![0.0, 1.0, 4.0, 2.0]];
    let mut descent = Descent::new(x, path_ideal_distances(4));
    let before = descent.compute_stress();
    let after = descent.reduce_stress();
    assert!(after < before, "stress rose from {before} to {after}");
}

/// Clamps every x coordinate to be non-negative.
struct HalfPlane;

impl Project for HalfPlane {
    fn project_x(&mut self, _x0: &[f64], _y0: &[f64], x: &mut [f64]) {
        for v in x.iter_mut() {
            *v = v.max(0.0);
        }
    }

    fn project_y(&mut self, _x: &[f64], _y0: &[f64], _y: &mut [f64]) {}
}

#[test]
fn projection_hook_is_applied_on_every_iteration() {
    let x = vec![vec![-2.0, -1.0, 1.0], vec![0.0, 0.5, -0.5]];
    let mut hook = HalfPlane;
    let mut descent = Descent::new(x, path_ideal_distances(3));
    descent.run(50, Some(&mut hook));
    for i in 0..3 {
        assert!(descent.x[0][i] >= -1e-9, "node {i} at x {}", descent.x[0][i]);
    }
}

#[test]
fn disconnected_pairs_do_not_contribute_stress() {
    let mut d = path_ideal_distances(2);
    d[0][1] = f64::INFINITY;
    d[1][0] = f64::INFINITY;
    let x = vec![vec![0.0, 123.0], vec![0.0, -7.0]];
    let descent = Descent::new(x, d);
    assert_eq!(descent.compute_stress(), 0.0);
}
