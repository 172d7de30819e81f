//! Gradient-descent minimization of the stress function
//! `sum_{i<j} w_ij ((|x_i - x_j| - D_ij) / D_ij)^2`
//! with a full per-dimension Hessian and 4th-order Runge-Kutta integration.

use std::mem;

use rustc_hash::FxHashMap;

/// Squared distance below which two points are treated as coincident and one
/// is perturbed before computing derivatives.
const COINCIDENCE_TOLERANCE: f64 = 1e-9;

/// Linear congruential generator matching a common C runtime: reproducible
/// across platforms, which keeps coincident-point resolution deterministic.
#[derive(Debug, Clone)]
pub struct PseudoRandom {
    seed: u64,
}

impl PseudoRandom {
    const A: u64 = 214013;
    const C: u64 = 2531011;
    const M: u64 = 2_147_483_648;
    const RANGE: f64 = 32767.0;

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Next value in [0, 1).
    pub fn get_next(&mut self) -> f64 {
        self.seed = (self.seed.wrapping_mul(Self::A).wrapping_add(Self::C)) % Self::M;
        (self.seed >> 16) as f64 / Self::RANGE
    }

    pub fn get_next_between(&mut self, min: f64, max: f64) -> f64 {
        min + self.get_next() * (max - min)
    }
}

impl Default for PseudoRandom {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Positions of dragged or pinned nodes, applied as a heavy diagonal penalty
/// pulling the node's variables toward the locked coordinates.
#[derive(Debug, Clone, Default)]
pub struct Locks {
    locks: FxHashMap<usize, [f64; 2]>,
}

impl Locks {
    pub fn add(&mut self, id: usize, position: [f64; 2]) {
        self.locks.insert(id, position);
    }

    pub fn clear(&mut self) {
        self.locks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, [f64; 2])> + '_ {
        self.locks.iter().map(|(&id, &p)| (id, p))
    }
}

/// Per-axis projection of a raw descent step onto the feasible region of the
/// active constraint set. The y projection sees the already-projected x
/// coordinates, since vertical feasibility can depend on them.
pub trait Project {
    fn project_x(&mut self, x0: &[f64], y0: &[f64], x: &mut [f64]);
    fn project_y(&mut self, x: &[f64], y0: &[f64], y: &mut [f64]);
}

/// Stress-majorization engine over a k x n position matrix (k is 2 here; the
/// buffers stay dimension-indexed to keep the formulas readable).
pub struct Descent {
    /// Current positions, one row per dimension.
    pub x: Vec<Vec<f64>>,
    /// Relative stress-delta convergence threshold for `run`.
    pub threshold: f64,
    /// Ideal pairwise distances; infinite entries mean disconnection.
    pub d: Vec<Vec<f64>>,
    /// Optional pairwise weights: edges 1, non-edges below 1. A weight above 1
    /// drops the attractive term once the pair is longer than ideal.
    pub g: Option<Vec<Vec<f64>>>,
    pub locks: Locks,
    k: usize,
    n: usize,
    grad: Vec<Vec<f64>>,
    hessian: Vec<Vec<Vec<f64>>>,
    hd: Vec<Vec<f64>>,
    stage_a: Vec<Vec<f64>>,
    stage_b: Vec<Vec<f64>>,
    stage_c: Vec<Vec<f64>>,
    stage_d: Vec<Vec<f64>>,
    interim_a: Vec<Vec<f64>>,
    interim_b: Vec<Vec<f64>>,
    feasible_dir: Vec<Vec<f64>>,
    min_d: f64,
    random: PseudoRandom,
}

impl Descent {
    pub fn new(x: Vec<Vec<f64>>, d: Vec<Vec<f64>>) -> Self {
        Self::with_weights(x, d, None)
    }

    pub fn with_weights(x: Vec<Vec<f64>>, d: Vec<Vec<f64>>, g: Option<Vec<Vec<f64>>>) -> Self {
        let k = x.len();
        let n = x.first().map_or(0, Vec::len);
        let mut min_d = f64::MAX;
        for i in 0..n {
            for j in i + 1..n {
                let dij = d[i][j];
                if dij > 0.0 && dij < min_d {
                    min_d = dij;
                }
            }
        }
        if min_d == f64::MAX {
            min_d = 1.0;
        }
        let square = || vec![vec![0.0; n]; k];
        Self {
            x,
            threshold: 1e-4,
            d,
            g,
            locks: Locks::default(),
            k,
            n,
            grad: square(),
            hessian: vec![vec![vec![0.0; n]; n]; k],
            hd: square(),
            stage_a: square(),
            stage_b: square(),
            stage_c: square(),
            stage_d: square(),
            interim_a: square(),
            interim_b: square(),
            feasible_dir: square(),
            min_d,
            random: PseudoRandom::default(),
        }
    }

    pub fn create_square_matrix(n: usize, mut f: impl FnMut(usize, usize) -> f64) -> Vec<Vec<f64>> {
        (0..n).map(|i| (0..n).map(|j| f(i, j)).collect()).collect()
    }

    /// Random unit-ish direction scaled to the minimum ideal distance.
    fn offset_dir(&mut self) -> Vec<f64> {
        let mut u: Vec<f64> = (0..self.k)
            .map(|_| self.random.get_next_between(0.01, 1.0) - 0.5)
            .collect();
        let l = u.iter().map(|c| c * c).sum::<f64>().sqrt();
        for c in u.iter_mut() {
            *c *= self.min_d / l;
        }
        u
    }

    /// Gradient and Hessian of the stress function at `x`. Coincident points
    /// are perturbed in place until every pair is separated.
    pub fn compute_derivatives(&mut self, x: &mut [Vec<f64>]) {
        let n = self.n;
        if n < 1 {
            return;
        }
        let k = self.k;
        let mut diff = vec![0.0; k];
        let mut diff2 = vec![0.0; k];
        let mut diag = vec![0.0; k];
        let mut max_h: f64 = 0.0;
        for i in 0..n {
            for d in 0..k {
                diag[d] = 0.0;
                self.grad[d][i] = 0.0;
            }
            for j in 0..n {
                if i == j {
                    continue;
                }
                // Perturb j until the pair is numerically separated.
                let mut d2;
                loop {
                    d2 = 0.0;
                    for d in 0..k {
                        let dx = x[d][i] - x[d][j];
                        diff[d] = dx;
                        diff2[d] = dx * dx;
                        d2 += diff2[d];
                    }
                    if d2 > COINCIDENCE_TOLERANCE {
                        break;
                    }
                    let offset = self.offset_dir();
                    for d in 0..k {
                        x[d][j] += offset[d];
                    }
                }
                let dist = d2.sqrt();
                let ideal = self.d[i][j];
                let mut weight = match &self.g {
                    Some(g) => g[i][j],
                    None => 1.0,
                };
                if (weight > 1.0 && dist > ideal) || !ideal.is_finite() {
                    for d in 0..k {
                        self.hessian[d][i][j] = 0.0;
                    }
                    continue;
                }
                if weight > 1.0 {
                    weight = 1.0;
                }
                let ideal2 = ideal * ideal;
                let gs = weight * (dist - ideal) / (ideal2 * dist);
                let hs = -weight / (ideal2 * dist * dist * dist);
                for d in 0..k {
                    self.grad[d][i] += diff[d] * gs;
                    let h = hs * (ideal * (diff2[d] - d2) + dist * d2);
                    self.hessian[d][i][j] = h;
                    diag[d] -= h;
                }
            }
            for d in 0..k {
                self.hessian[d][i][i] = diag[d];
                max_h = max_h.max(diag[d]);
            }
        }
        if !self.locks.is_empty() {
            for (u, p) in self.locks.iter().collect::<Vec<_>>() {
                for d in 0..k {
                    self.hessian[d][u][u] += max_h;
                    self.grad[d][u] -= max_h * (p[d] - x[d][u]);
                }
            }
        }
    }

    fn dot_prod(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    /// Generalized Newton step length `(g . dir) / (dir . H . dir)`; zero on a
    /// degenerate denominator rather than propagating NaN.
    pub fn compute_step_size(&mut self, grad: &[Vec<f64>], dir: &[Vec<f64>]) -> f64 {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for d in 0..self.k {
            numerator += Self::dot_prod(&grad[d], &dir[d]);
            for (hd, row) in self.hd[d].iter_mut().zip(&self.hessian[d]) {
                *hd = Self::dot_prod(row, &dir[d]);
            }
            denominator += Self::dot_prod(&dir[d], &self.hd[d]);
        }
        if denominator != 0.0 && denominator.is_finite() {
            numerator / denominator
        } else {
            0.0
        }
    }

    /// One unconstrained gradient step; returns the resulting stress.
    pub fn reduce_stress(&mut self) -> f64 {
        let mut x = mem::take(&mut self.x);
        self.compute_derivatives(&mut x);
        let grad = mem::take(&mut self.grad);
        let step = self.compute_step_size(&grad, &grad);
        for d in 0..self.k {
            Self::take_descent_step(&mut x[d], &grad[d], step);
        }
        self.grad = grad;
        self.x = x;
        self.compute_stress()
    }

    fn take_descent_step(x: &mut [f64], dir: &[f64], step: f64) {
        for (xi, di) in x.iter_mut().zip(dir) {
            *xi -= step * di;
        }
    }

    fn step_and_project(
        &mut self,
        x0: &[Vec<f64>],
        r: &mut [Vec<f64>],
        dir: &[Vec<f64>],
        step: f64,
        mut project: Option<&mut (dyn Project + '_)>,
    ) {
        for d in 0..self.k {
            r[d].copy_from_slice(&x0[d]);
        }
        Self::take_descent_step(&mut r[0], &dir[0], step);
        if let Some(p) = project.as_deref_mut() {
            p.project_x(&x0[0], &x0[1], &mut r[0]);
        }
        Self::take_descent_step(&mut r[1], &dir[1], step);
        if let Some(p) = project {
            let (rx, ry) = r.split_at_mut(1);
            p.project_y(&rx[0], &x0[1], &mut ry[0]);
        }
    }

    /// Raw Newton step from `x0` into `r`, then (when projecting) a second
    /// feasible-direction step with its length clamped to [0.2, 1].
    fn compute_next_position(
        &mut self,
        x0: &mut [Vec<f64>],
        r: &mut [Vec<f64>],
        mut project: Option<&mut (dyn Project + '_)>,
    ) {
        self.compute_derivatives(x0);
        let grad = mem::take(&mut self.grad);
        let step = self.compute_step_size(&grad, &grad);
        let projecting = project.is_some();
        self.step_and_project(x0, r, &grad, step, project.as_deref_mut());
        if projecting {
            let mut dir = mem::take(&mut self.feasible_dir);
            for d in 0..self.k {
                for i in 0..self.n {
                    dir[d][i] = x0[d][i] - r[d][i];
                }
            }
            let step = self.compute_step_size(&grad, &dir).clamp(0.2, 1.0);
            self.step_and_project(x0, r, &dir, step, project);
            self.feasible_dir = dir;
        }
        self.grad = grad;
    }

    /// Iterate RK steps until the relative stress change drops below the
    /// threshold or the iteration budget runs out; returns the final stress.
    pub fn run(&mut self, iterations: usize, mut project: Option<&mut (dyn Project + '_)>) -> f64 {
        let mut stress = f64::MAX;
        let mut converged = false;
        let mut remaining = iterations;
        while !converged && remaining > 0 {
            remaining -= 1;
            let s = self.runge_kutta(project.as_deref_mut());
            converged = (stress / s - 1.0).abs() < self.threshold;
            stress = s;
        }
        stress
    }

    /// One 4th-order Runge-Kutta integration step; returns the new stress.
    pub fn runge_kutta(&mut self, mut project: Option<&mut (dyn Project + '_)>) -> f64 {
        let mut x = mem::take(&mut self.x);
        let mut sa = mem::take(&mut self.stage_a);
        let mut sb = mem::take(&mut self.stage_b);
        let mut sc = mem::take(&mut self.stage_c);
        let mut sd = mem::take(&mut self.stage_d);
        let mut ia = mem::take(&mut self.interim_a);
        let mut ib = mem::take(&mut self.interim_b);

        self.compute_next_position(&mut x, &mut sa, project.as_deref_mut());
        Self::mid(&x, &sa, &mut ia);
        self.compute_next_position(&mut ia, &mut sb, project.as_deref_mut());
        Self::mid(&x, &sb, &mut ib);
        self.compute_next_position(&mut ib, &mut sc, project.as_deref_mut());
        self.compute_next_position(&mut sc, &mut sd, project);
        for d in 0..self.k {
            for i in 0..self.n {
                x[d][i] = (sa[d][i] + 2.0 * sb[d][i] + 2.0 * sc[d][i] + sd[d][i]) / 6.0;
            }
        }

        self.x = x;
        self.stage_a = sa;
        self.stage_b = sb;
        self.stage_c = sc;
        self.stage_d = sd;
        self.interim_a = ia;
        self.interim_b = ib;
        self.compute_stress()
    }

    fn mid(x: &[Vec<f64>], a: &[Vec<f64>], out: &mut [Vec<f64>]) {
        for d in 0..x.len() {
            for i in 0..x[d].len() {
                out[d][i] = x[d][i] + (a[d][i] - x[d][i]) / 2.0;
            }
        }
    }

    /// Total stress at the current positions; disconnected (infinite-ideal)
    /// pairs contribute nothing.
    pub fn compute_stress(&self) -> f64 {
        let mut stress = 0.0;
        for i in 0..self.n.saturating_sub(1) {
            for j in i + 1..self.n {
                let mut d2 = 0.0;
                for d in 0..self.k {
                    let dx = self.x[d][i] - self.x[d][j];
                    d2 += dx * dx;
                }
                let dist = d2.sqrt();
                let ideal = self.d[i][j];
                if !ideal.is_finite() {
                    continue;
                }
                let r = ideal - dist;
                stress += r * r / (ideal * ideal);
            }
        }
        stress
    }
}
