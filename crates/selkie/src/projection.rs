//! Projection of descent steps onto the feasible region of the active
//! constraint set: per-axis separation solving over node variables and group
//! boundary variables.

use selkie_vpsc::{
    Constraint, Group, Rectangle, Solver, Variable, compute_group_bounds,
    generate_x_group_constraints, generate_y_group_constraints,
};

use crate::descent::Project;
use crate::model::{Axis, ConstraintSpec, GroupSpec, Node};

const FIXED_WEIGHT: f64 = 1e3;
const BOUNDARY_WEIGHT: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
struct NodeState {
    fixed: bool,
    /// Pinned position, the desired position while fixed.
    px: f64,
    py: f64,
    half_width: f64,
    half_height: f64,
}

/// Per-axis feasibility solver. One instance per layout phase: its block and
/// constraint state starts fresh, so activating a different constraint set
/// never inherits stale active flags.
pub struct Projection {
    vars: Vec<Variable>,
    nodes: Vec<NodeState>,
    bounds: Vec<Rectangle>,
    groups: Vec<Group>,
    root: Option<usize>,
    avoid_overlaps: bool,
    x_constraints: Vec<Constraint>,
    y_constraints: Vec<Constraint>,
}

impl Projection {
    /// Build variables for every node (and boundary variables for every group
    /// when overlap avoidance is on) and translate the user constraint specs.
    /// Alignment specs may pre-stack the given nodes to make the aligned
    /// positions feasible.
    pub fn new(
        nodes: &mut [Node],
        groups: &[GroupSpec],
        constraints: &[ConstraintSpec],
        avoid_overlaps: bool,
        default_node_size: f64,
    ) -> Self {
        let n = nodes.len();
        let mut p = Self {
            vars: (0..n).map(|_| Variable::new(0.0)).collect(),
            nodes: nodes
                .iter()
                .map(|v| NodeState {
                    fixed: v.fixed,
                    px: v.px.unwrap_or(v.x),
                    py: v.py.unwrap_or(v.y),
                    half_width: v.width_or(default_node_size) / 2.0,
                    half_height: v.height_or(default_node_size) / 2.0,
                })
                .collect(),
            bounds: vec![Rectangle::empty(); n],
            groups: Vec::new(),
            root: None,
            avoid_overlaps,
            x_constraints: Vec::new(),
            y_constraints: Vec::new(),
        };
        p.create_constraints(nodes, constraints);
        if avoid_overlaps {
            // Group arena: user groups first, then a synthetic root holding
            // every parentless node and group. Boundary variable ids follow
            // the node variables, two per user group.
            let mut in_group = vec![false; n];
            let mut has_parent = vec![false; groups.len()];
            for g in groups {
                for &l in &g.leaves {
                    in_group[l] = true;
                }
                for &c in &g.groups {
                    has_parent[c] = true;
                }
            }
            for (gi, g) in groups.iter().enumerate() {
                let min_var = n + 2 * gi;
                let max_var = min_var + 1;
                p.vars
                    .push(Variable::with_weight(0.0, BOUNDARY_WEIGHT));
                p.vars
                    .push(Variable::with_weight(0.0, BOUNDARY_WEIGHT));
                p.groups.push(Group {
                    leaves: g.leaves.clone(),
                    groups: g.groups.clone(),
                    padding: g.padding,
                    bounds: Rectangle::empty(),
                    min_var,
                    max_var,
                });
            }
            let root = p.groups.len();
            p.groups.push(Group {
                leaves: (0..n).filter(|&i| !in_group[i]).collect(),
                groups: (0..groups.len()).filter(|&g| !has_parent[g]).collect(),
                padding: 1.0,
                bounds: Rectangle::empty(),
                // The root's own boundaries are never materialized.
                min_var: usize::MAX,
                max_var: usize::MAX,
            });
            p.root = Some(root);
        }
        p
    }

    /// Number of variables, node plus group-boundary.
    pub fn variable_count(&self) -> usize {
        self.vars.len()
    }

    /// Refresh fixed flags and pinned positions from the nodes, so drags that
    /// happen between ticks are honoured by the next projection.
    pub fn set_pins(&mut self, nodes: &[Node]) {
        for (state, v) in self.nodes.iter_mut().zip(nodes) {
            state.fixed = v.fixed;
            state.px = v.px.unwrap_or(v.x);
            state.py = v.py.unwrap_or(v.y);
        }
    }

    fn create_constraints(&mut self, nodes: &mut [Node], specs: &[ConstraintSpec]) {
        for spec in specs {
            match spec {
                ConstraintSpec::Separation {
                    axis,
                    left,
                    right,
                    gap,
                    equality,
                } => {
                    let c = Constraint::with_equality(*left, *right, *gap, *equality);
                    match axis {
                        Axis::X => self.x_constraints.push(c),
                        Axis::Y => self.y_constraints.push(c),
                    }
                }
                ConstraintSpec::Alignment { axis, offsets } => {
                    if offsets.is_empty() {
                        continue;
                    }
                    self.make_feasible(nodes, *axis, offsets.iter().map(|o| o.node));
                    let guide = offsets[0].node;
                    let cs = match axis {
                        Axis::X => &mut self.x_constraints,
                        Axis::Y => &mut self.y_constraints,
                    };
                    for o in &offsets[1..] {
                        cs.push(Constraint::with_equality(guide, o.node, o.offset, true));
                    }
                }
            }
        }
    }

    /// Stack the aligned nodes along the perpendicular axis so the alignment
    /// equalities start from a non-overlapping arrangement.
    fn make_feasible(
        &self,
        nodes: &mut [Node],
        axis: Axis,
        members: impl Iterator<Item = usize>,
    ) {
        if !self.avoid_overlaps {
            return;
        }
        let mut order: Vec<usize> = members.collect();
        match axis {
            Axis::X => {
                order.sort_by(|&a, &b| nodes[a].y.total_cmp(&nodes[b].y));
                let mut prev: Option<usize> = None;
                for &i in &order {
                    if let Some(p) = prev {
                        nodes[i].y = nodes[p].y + 2.0 * self.nodes[p].half_height + 1.0;
                    }
                    prev = Some(i);
                }
            }
            Axis::Y => {
                order.sort_by(|&a, &b| nodes[a].x.total_cmp(&nodes[b].x));
                let mut prev: Option<usize> = None;
                for &i in &order {
                    if let Some(p) = prev {
                        nodes[i].x = nodes[p].x + 2.0 * self.nodes[p].half_width + 1.0;
                    }
                    prev = Some(i);
                }
            }
        }
    }

    fn setup_variables_and_bounds(&mut self, x0: &[f64], y0: &[f64], desired: &mut [f64], axis: Axis) {
        for (i, state) in self.nodes.iter().enumerate() {
            if state.fixed {
                self.vars[i].weight = FIXED_WEIGHT;
                desired[i] = match axis {
                    Axis::X => state.px,
                    Axis::Y => state.py,
                };
            } else {
                self.vars[i].weight = 1.0;
            }
            self.bounds[i] = Rectangle::new(
                x0[i] - state.half_width,
                x0[i] + state.half_width,
                y0[i] - state.half_height,
                y0[i] + state.half_height,
            );
        }
    }

    fn solve_axis(&mut self, axis: Axis, start: &[f64], out: &mut [f64]) {
        let mut cs: Vec<Constraint> = match axis {
            Axis::X => self.x_constraints.clone(),
            Axis::Y => self.y_constraints.clone(),
        };
        let overlap_groups = self.avoid_overlaps && self.root.is_some();
        if let Some(root) = self.root.filter(|_| self.avoid_overlaps) {
            compute_group_bounds(root, &mut self.groups, &self.bounds);
            let generated = match axis {
                Axis::X => generate_x_group_constraints(
                    root,
                    &mut self.groups,
                    &self.bounds,
                    &mut self.vars,
                ),
                Axis::Y => generate_y_group_constraints(
                    root,
                    &mut self.groups,
                    &self.bounds,
                    &mut self.vars,
                ),
            };
            cs.extend(generated);
        }
        for (v, &d) in self.vars.iter_mut().zip(out.iter()) {
            v.desired_position = d;
        }
        let mut solver = Solver::new(&mut self.vars, &mut cs);
        solver.set_starting_positions(start);
        solver.solve();
        for i in 0..self.nodes.len() {
            out[i] = solver.position(i);
        }
        if overlap_groups {
            for g in 0..self.groups.len() {
                if self.groups[g].min_var == usize::MAX {
                    continue;
                }
                out[self.groups[g].min_var] = solver.position(self.groups[g].min_var);
                out[self.groups[g].max_var] = solver.position(self.groups[g].max_var);
            }
        }
        // Recentre node bounds and rewrite group boxes from the solved
        // boundary positions.
        for i in 0..self.nodes.len() {
            match axis {
                Axis::X => self.bounds[i].set_x_center(out[i]),
                Axis::Y => self.bounds[i].set_y_center(out[i]),
            }
        }
        if overlap_groups {
            for g in self.groups.iter_mut() {
                if g.min_var == usize::MAX {
                    continue;
                }
                let pad = g.padding / 2.0;
                match axis {
                    Axis::X => {
                        g.bounds.min_x = out[g.min_var] - pad;
                        g.bounds.max_x = out[g.max_var] + pad;
                    }
                    Axis::Y => {
                        g.bounds.min_y = out[g.min_var] - pad;
                        g.bounds.max_y = out[g.max_var] + pad;
                    }
                }
            }
        }
    }
}

impl Project for Projection {
    fn project_x(&mut self, x0: &[f64], y0: &[f64], x: &mut [f64]) {
        if self.root.is_none() && self.x_constraints.is_empty() {
            return;
        }
        self.setup_variables_and_bounds(x0, y0, x, Axis::X);
        self.solve_axis(Axis::X, x0, x);
    }

    fn project_y(&mut self, x: &[f64], y0: &[f64], y: &mut [f64]) {
        if self.root.is_none() && self.y_constraints.is_empty() {
            return;
        }
        self.setup_variables_and_bounds(x, y0, y, Axis::Y);
        self.solve_axis(Axis::Y, y0, y);
    }
}
