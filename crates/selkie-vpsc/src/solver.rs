//! Active-set solver for one-dimensional separation constraints.
//!
//! Variables and constraints live in caller-owned slices and refer to each
//! other by index; blocks are a dense arena with swap-remove bookkeeping, so
//! merging and splitting blocks never leaves a dangling handle.

/// A constraint's minimum internal Lagrangian multiplier must drop below this
/// before its block is split to release the tension.
pub const LAGRANGIAN_TOLERANCE: f64 = -1e-4;

/// Slack below this is treated as a violation (guards float noise around zero).
pub const ZERO_UPPERBOUND: f64 = -1e-10;

/// One variable per layout dimension per node (or group boundary).
#[derive(Debug, Clone)]
pub struct Variable {
    pub desired_position: f64,
    pub weight: f64,
    pub scale: f64,
    pub offset: f64,
    /// Owning block, index into the solver's block arena.
    block: usize,
    /// Constraints in which this variable is the right-hand side.
    c_in: Vec<usize>,
    /// Constraints in which this variable is the left-hand side.
    c_out: Vec<usize>,
}

impl Variable {
    pub fn new(desired_position: f64) -> Self {
        Self::with_weight(desired_position, 1.0)
    }

    pub fn with_weight(desired_position: f64, weight: f64) -> Self {
        Self {
            desired_position,
            weight,
            scale: 1.0,
            offset: 0.0,
            block: 0,
            c_in: Vec::new(),
            c_out: Vec::new(),
        }
    }
}

/// `right.scale * right.pos - gap - left.scale * left.pos >= 0` when satisfied
/// (exact equality when `equality` is set).
#[derive(Debug, Clone)]
pub struct Constraint {
    pub left: usize,
    pub right: usize,
    pub gap: f64,
    pub equality: bool,
    pub active: bool,
    pub unsatisfiable: bool,
    /// Lagrangian multiplier, valid after the owning block's last `compute_lm`.
    lm: f64,
}

impl Constraint {
    pub fn new(left: usize, right: usize, gap: f64) -> Self {
        Self::with_equality(left, right, gap, false)
    }

    pub fn with_equality(left: usize, right: usize, gap: f64, equality: bool) -> Self {
        Self {
            left,
            right,
            gap,
            equality,
            active: false,
            unsatisfiable: false,
            lm: 0.0,
        }
    }
}

/// Running sums for the least-squares optimum of a block's position.
#[derive(Debug, Clone, Copy, Default)]
struct PositionStats {
    scale: f64,
    ab: f64,
    ad: f64,
    a2: f64,
}

impl PositionStats {
    fn new(scale: f64) -> Self {
        Self {
            scale,
            ab: 0.0,
            ad: 0.0,
            a2: 0.0,
        }
    }

    fn add_variable(&mut self, v: &Variable) {
        let b = self.scale / v.scale;
        let c = v.offset / v.scale;
        self.ab += v.weight * b * c;
        self.ad += v.weight * b * v.desired_position;
        self.a2 += v.weight * b * b;
    }

    fn posn(&self) -> f64 {
        (self.ad - self.ab) / self.a2
    }
}

/// A maximal set of variables glued together by active constraints. Variables
/// hold offsets relative to the block reference; the block holds the solved
/// reference position.
#[derive(Debug, Clone)]
struct Block {
    vars: Vec<usize>,
    posn: f64,
    ps: PositionStats,
}

/// Active-set solver over one axis. Borrows the variables and constraints so
/// callers can re-solve the same problem with fresh desired positions.
#[derive(Debug)]
pub struct Solver<'a> {
    pub vs: &'a mut [Variable],
    pub cs: &'a mut [Constraint],
    blocks: Vec<Block>,
    inactive: Vec<usize>,
    /// Constraint ids visited by the last `compute_lm` traversal.
    lm_scratch: Vec<usize>,
}

impl<'a> Solver<'a> {
    pub fn new(vs: &'a mut [Variable], cs: &'a mut [Constraint]) -> Self {
        for v in vs.iter_mut() {
            v.c_in.clear();
            v.c_out.clear();
        }
        let mut inactive = Vec::with_capacity(cs.len());
        for (i, c) in cs.iter_mut().enumerate() {
            c.active = false;
            vs[c.left].c_out.push(i);
            vs[c.right].c_in.push(i);
            inactive.push(i);
        }
        Self {
            vs,
            cs,
            blocks: Vec::new(),
            inactive,
            lm_scratch: Vec::new(),
        }
    }

    /// Current position of variable `v` in solved space.
    pub fn position(&self, v: usize) -> f64 {
        let b = &self.blocks[self.vs[v].block];
        (b.ps.scale * b.posn + self.vs[v].offset) / self.vs[v].scale
    }

    pub fn positions(&self) -> Vec<f64> {
        (0..self.vs.len()).map(|v| self.position(v)).collect()
    }

    pub fn slack(&self, c: usize) -> f64 {
        let c = &self.cs[c];
        if c.unsatisfiable {
            f64::MAX
        } else {
            self.vs[c.right].scale * self.position(c.right)
                - c.gap
                - self.vs[c.left].scale * self.position(c.left)
        }
    }

    fn dfdv(&self, v: usize) -> f64 {
        let var = &self.vs[v];
        2.0 * var.weight * (self.position(v) - var.desired_position)
    }

    pub fn cost(&self) -> f64 {
        (0..self.vs.len())
            .map(|v| {
                let d = self.position(v) - self.vs[v].desired_position;
                d * d * self.vs[v].weight
            })
            .sum()
    }

    /// Reset all blocks to singletons at the given starting positions.
    pub fn set_starting_positions(&mut self, positions: &[f64]) {
        for c in self.cs.iter_mut() {
            c.active = false;
        }
        self.inactive = (0..self.cs.len()).collect();
        self.init_blocks();
        for (b, &p) in self.blocks.iter_mut().zip(positions) {
            b.posn = p;
        }
    }

    pub fn set_desired_positions(&mut self, positions: &[f64]) {
        for (v, &p) in self.vs.iter_mut().zip(positions) {
            v.desired_position = p;
        }
    }

    fn init_blocks(&mut self) {
        self.blocks.clear();
        for v in 0..self.vs.len() {
            self.new_block(v);
        }
    }

    fn new_block(&mut self, v: usize) -> usize {
        let b = self.blocks.len();
        self.vs[v].offset = 0.0;
        self.blocks.push(Block {
            vars: Vec::new(),
            posn: 0.0,
            ps: PositionStats::new(self.vs[v].scale),
        });
        self.block_add_variable(b, v);
        b
    }

    fn block_add_variable(&mut self, b: usize, v: usize) {
        self.vs[v].block = b;
        let block = &mut self.blocks[b];
        block.ps.add_variable(&self.vs[v]);
        block.vars.push(v);
        block.posn = block.ps.posn();
    }

    /// Swap-remove a block, reassigning the handle of the block moved into its
    /// slot.
    fn remove_block(&mut self, b: usize) {
        self.blocks.swap_remove(b);
        if b < self.blocks.len() {
            for i in 0..self.blocks[b].vars.len() {
                let v = self.blocks[b].vars[i];
                self.vs[v].block = b;
            }
        }
    }

    fn update_block_positions(&mut self) {
        for b in 0..self.blocks.len() {
            let scale = self.blocks[b].ps.scale;
            let mut ps = PositionStats::new(scale);
            for &v in &self.blocks[b].vars {
                ps.add_variable(&self.vs[v]);
            }
            self.blocks[b].posn = ps.posn();
            self.blocks[b].ps = ps;
        }
    }

    /// Merge the blocks at either end of `c`, making `c` active. The smaller
    /// block is folded into the larger one.
    fn merge(&mut self, c: usize) {
        let lb = self.vs[self.cs[c].left].block;
        let rb = self.vs[self.cs[c].right].block;
        let dist = self.vs[self.cs[c].right].offset - self.vs[self.cs[c].left].offset
            - self.cs[c].gap;
        if self.blocks[lb].vars.len() < self.blocks[rb].vars.len() {
            self.merge_across(rb, lb, c, dist);
            self.remove_block(lb);
        } else {
            self.merge_across(lb, rb, c, -dist);
            self.remove_block(rb);
        }
    }

    fn merge_across(&mut self, into: usize, from: usize, c: usize, dist: f64) {
        self.cs[c].active = true;
        for i in 0..self.blocks[from].vars.len() {
            let v = self.blocks[from].vars[i];
            self.vs[v].offset += dist;
            self.block_add_variable(into, v);
        }
    }

    /// Walk the active-constraint tree from `v`, computing Lagrangian
    /// multipliers on every visited constraint (recorded in `lm_scratch`).
    fn compute_lm(&mut self, v: usize, prev: Option<usize>) -> f64 {
        let mut dfdv = self.dfdv(v);
        for i in 0..self.vs[v].c_out.len() {
            let c = self.vs[v].c_out[i];
            let next = self.cs[c].right;
            if !self.cs[c].active || prev == Some(next) {
                continue;
            }
            let lm = self.compute_lm(next, Some(v));
            self.cs[c].lm = lm;
            dfdv += lm * self.vs[self.cs[c].left].scale;
            self.lm_scratch.push(c);
        }
        for i in 0..self.vs[v].c_in.len() {
            let c = self.vs[v].c_in[i];
            let next = self.cs[c].left;
            if !self.cs[c].active || prev == Some(next) {
                continue;
            }
            let lm = self.compute_lm(next, Some(v));
            self.cs[c].lm = -lm;
            dfdv += lm * self.vs[self.cs[c].right].scale;
            self.lm_scratch.push(c);
        }
        dfdv / self.vs[v].scale
    }

    /// Grow a freshly split block outward from `v` along active constraints.
    fn populate_split_block(&mut self, b: usize, v: usize, prev: Option<usize>) {
        for i in 0..self.vs[v].c_out.len() {
            let c = self.vs[v].c_out[i];
            let next = self.cs[c].right;
            if !self.cs[c].active || prev == Some(next) {
                continue;
            }
            self.vs[next].offset = self.vs[v].offset + self.cs[c].gap;
            self.block_add_variable(b, next);
            self.populate_split_block(b, next, Some(v));
        }
        for i in 0..self.vs[v].c_in.len() {
            let c = self.vs[v].c_in[i];
            let next = self.cs[c].left;
            if !self.cs[c].active || prev == Some(next) {
                continue;
            }
            self.vs[next].offset = self.vs[v].offset - self.cs[c].gap;
            self.block_add_variable(b, next);
            self.populate_split_block(b, next, Some(v));
        }
    }

    /// Depth-first search along active constraints from `v` to `to`, recording
    /// each (constraint, child) edge on the found path into `path`.
    fn find_path(
        &mut self,
        v: usize,
        prev: Option<usize>,
        to: usize,
        path: &mut Vec<(usize, usize)>,
    ) -> bool {
        for i in 0..self.vs[v].c_out.len() {
            let c = self.vs[v].c_out[i];
            let next = self.cs[c].right;
            if !self.cs[c].active || prev == Some(next) {
                continue;
            }
            if next == to || self.find_path(next, Some(v), to, path) {
                path.push((c, next));
                return true;
            }
        }
        for i in 0..self.vs[v].c_in.len() {
            let c = self.vs[v].c_in[i];
            let next = self.cs[c].left;
            if !self.cs[c].active || prev == Some(next) {
                continue;
            }
            if next == to || self.find_path(next, Some(v), to, path) {
                path.push((c, next));
                return true;
            }
        }
        false
    }

    /// True when an active left-to-right chain already runs from `u` to `v`,
    /// meaning a new `v -> u` constraint would close a cycle.
    fn is_active_directed_path_between(&self, u: usize, v: usize) -> bool {
        if u == v {
            return true;
        }
        for &c in &self.vs[u].c_out {
            if self.cs[c].active && self.is_active_directed_path_between(self.cs[c].right, v) {
                return true;
            }
        }
        false
    }

    /// Minimum-multiplier non-equality constraint inside the block rooted at
    /// variable `root`.
    fn find_min_lm(&mut self, root: usize) -> Option<usize> {
        self.lm_scratch.clear();
        let _ = self.compute_lm(root, None);
        let mut min: Option<usize> = None;
        for i in 0..self.lm_scratch.len() {
            let c = self.lm_scratch[i];
            if self.cs[c].equality {
                continue;
            }
            if min.is_none_or(|m| self.cs[c].lm < self.cs[m].lm) {
                min = Some(c);
            }
        }
        min
    }

    /// Minimum-multiplier non-equality, left-to-right constraint on the active
    /// path between `lv` and `rv`.
    fn find_min_lm_between(&mut self, lv: usize, rv: usize) -> Option<usize> {
        self.lm_scratch.clear();
        let _ = self.compute_lm(lv, None);
        let mut path: Vec<(usize, usize)> = Vec::new();
        let _ = self.find_path(lv, None, rv, &mut path);
        let mut min: Option<usize> = None;
        for &(c, next) in &path {
            if self.cs[c].equality || self.cs[c].right != next {
                continue;
            }
            if min.is_none_or(|m| self.cs[c].lm < self.cs[m].lm) {
                min = Some(c);
            }
        }
        min
    }

    /// Deactivate `c` and rebuild the two blocks either side of it.
    fn split_on(&mut self, c: usize) {
        self.cs[c].active = false;
        let old = self.vs[self.cs[c].left].block;
        let lb = self.new_block(self.cs[c].left);
        self.populate_split_block(lb, self.cs[c].left, None);
        let rb = self.new_block(self.cs[c].right);
        self.populate_split_block(rb, self.cs[c].right, None);
        self.remove_block(old);
    }

    /// Split every block whose minimum internal multiplier shows over-tight
    /// internal tension, returning the released constraints to the inactive
    /// set.
    fn split_blocks(&mut self) {
        self.update_block_positions();
        let mut b = 0;
        while b < self.blocks.len() {
            let root = self.blocks[b].vars[0];
            match self.find_min_lm(root) {
                Some(c) if self.cs[c].lm < LAGRANGIAN_TOLERANCE => {
                    self.split_on(c);
                    self.inactive.push(c);
                    // split_on swap-removed this slot; revisit it.
                }
                _ => b += 1,
            }
        }
    }

    /// Inactive constraint with the most negative slack, preferring equality
    /// constraints (which short-circuit the scan). The chosen constraint is
    /// removed from the inactive list only when it will actually be processed.
    fn most_violated(&mut self) -> Option<usize> {
        let mut min_slack = f64::MAX;
        let mut sel: Option<(usize, usize)> = None;
        for i in 0..self.inactive.len() {
            let c = self.inactive[i];
            if self.cs[c].unsatisfiable {
                continue;
            }
            let slack = self.slack(c);
            if self.cs[c].equality || slack < min_slack {
                min_slack = slack;
                sel = Some((i, c));
                if self.cs[c].equality {
                    break;
                }
            }
        }
        let (i, c) = sel?;
        if (min_slack < ZERO_UPPERBOUND && !self.cs[c].active) || self.cs[c].equality {
            self.inactive.swap_remove(i);
        }
        Some(c)
    }

    /// Satisfy all satisfiable constraints by merging and splitting blocks.
    /// Constraints on a cycle are flagged `unsatisfiable` and skipped.
    pub fn satisfy(&mut self) {
        if self.blocks.is_empty() {
            self.init_blocks();
        }
        self.split_blocks();
        while let Some(c) = self.most_violated() {
            if !(self.cs[c].equality || (self.slack(c) < ZERO_UPPERBOUND && !self.cs[c].active)) {
                break;
            }
            let lb = self.vs[self.cs[c].left].block;
            let rb = self.vs[self.cs[c].right].block;
            if lb != rb {
                self.merge(c);
                continue;
            }
            if self.is_active_directed_path_between(self.cs[c].right, self.cs[c].left) {
                self.cs[c].unsatisfiable = true;
                tracing::debug!(
                    left = self.cs[c].left,
                    right = self.cs[c].right,
                    "constraint closes an active cycle, marked unsatisfiable"
                );
                continue;
            }
            let Some(split) = self.find_min_lm_between(self.cs[c].left, self.cs[c].right) else {
                self.cs[c].unsatisfiable = true;
                tracing::debug!(
                    left = self.cs[c].left,
                    right = self.cs[c].right,
                    "no splittable constraint between endpoints, marked unsatisfiable"
                );
                continue;
            };
            self.split_on(split);
            self.inactive.push(split);
            if self.slack(c) >= 0.0 {
                // The split alone relieved the violation.
                self.inactive.push(c);
            } else {
                self.merge(c);
            }
        }
    }

    /// Alternate `satisfy` with block re-splitting until the total cost
    /// stabilizes. Returns the final cost.
    pub fn solve(&mut self) -> f64 {
        self.satisfy();
        let mut last = f64::MAX;
        let mut cost = self.cost();
        while (last - cost).abs() > 1e-4 {
            self.satisfy();
            last = cost;
            cost = self.cost();
        }
        cost
    }
}
