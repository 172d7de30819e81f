//! The layout driver: wires the distance calculator, the descent engine and
//! the constraint projection into a tick-driven simulation, and exposes
//! routing of edges around the finished layout.

use selkie_vpsc::{Point, Rectangle, make_edge_between, make_edge_to};
use tracing::debug;

use crate::descent::{Descent, Project};
use crate::error::{Error, Result};
use crate::geom::TangentVisibilityGraph;
use crate::linklengths::generate_directed_edge_constraints;
use crate::model::{ConstraintSpec, GroupSpec, LayoutOptions, Link, Node};
use crate::packing::{apply_packing, separate_graphs};
use crate::projection::Projection;
use crate::shortestpaths::Calculator;

/// G-matrix weight coupling each group's pair of dummy nodes, and their ideal
/// separation. Weak enough not to distort the layout, present so groups hold
/// together during the unconstrained phases.
const GROUP_DUMMY_WEIGHT: f64 = 1e-6;
const GROUP_DUMMY_DISTANCE: f64 = 0.1;

/// Arrowhead clearance left at the target end of a routed edge.
const ARROW_CLEARANCE: f64 = 5.0;

pub struct Layout {
    nodes: Vec<Node>,
    links: Vec<Link>,
    groups: Vec<GroupSpec>,
    constraints: Vec<ConstraintSpec>,
    distance_matrix: Option<Vec<Vec<f64>>>,
    options: LayoutOptions,
    descent: Option<Descent>,
    projection: Option<Projection>,
    alpha: f64,
    last_stress: Option<f64>,
    running: bool,
    visibility: Option<TangentVisibilityGraph>,
    inner_bounds: Vec<Rectangle>,
}

impl Layout {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>, options: LayoutOptions) -> Self {
        Self {
            nodes,
            links,
            groups: Vec::new(),
            constraints: Vec::new(),
            distance_matrix: None,
            options,
            descent: None,
            projection: None,
            alpha: 0.0,
            last_stress: None,
            running: false,
            visibility: None,
            inner_bounds: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<GroupSpec>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<ConstraintSpec>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Supply ideal distances directly instead of deriving them from graph
    /// shortest paths. Disables component packing.
    pub fn with_distance_matrix(mut self, matrix: Vec<Vec<f64>>) -> Self {
        self.distance_matrix = Some(matrix);
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn validate(&self) -> Result<()> {
        let n = self.nodes.len();
        for (index, l) in self.links.iter().enumerate() {
            for endpoint in [l.source, l.target] {
                if endpoint >= n {
                    return Err(Error::LinkEndpointOutOfRange { index, endpoint, nodes: n });
                }
            }
        }
        for (index, g) in self.groups.iter().enumerate() {
            for &member in &g.leaves {
                if member >= n {
                    return Err(Error::GroupMemberOutOfRange { index, member, nodes: n });
                }
            }
            for &child in &g.groups {
                if child >= self.groups.len() {
                    return Err(Error::GroupChildOutOfRange {
                        index,
                        child,
                        groups: self.groups.len(),
                    });
                }
            }
        }
        for spec in &self.constraints {
            let refs: Vec<usize> = match spec {
                ConstraintSpec::Separation { left, right, .. } => vec![*left, *right],
                ConstraintSpec::Alignment { offsets, .. } => {
                    offsets.iter().map(|o| o.node).collect()
                }
            };
            for node in refs {
                if node >= n {
                    return Err(Error::ConstraintNodeOutOfRange { node, nodes: n });
                }
            }
        }
        Ok(())
    }

    fn link_length(&self, l: &Link) -> f64 {
        l.length.unwrap_or(self.options.link_distance)
    }

    /// Compute the initial layout. Runs three descent phases: unconstrained,
    /// user constraints only, then all constraints including overlap
    /// avoidance; finally packs disconnected components. Leaves the
    /// simulation running so `tick` continues refining positions.
    pub fn start(&mut self) -> Result<()> {
        self.validate()?;
        let n = self.nodes.len();
        let total = n + 2 * self.groups.len();
        let width = self.options.size[0];
        let height = self.options.size[1];

        let mut x = vec![0.0; total];
        let mut y = vec![0.0; total];
        for (i, v) in self.nodes.iter().enumerate() {
            x[i] = v.x;
            y[i] = v.y;
        }

        let mut g_matrix: Option<Vec<Vec<f64>>> = None;
        let mut d_matrix = match &self.distance_matrix {
            Some(matrix) => Descent::create_square_matrix(total, |i, j| {
                if i == j {
                    0.0
                } else {
                    matrix
                        .get(i)
                        .and_then(|row| row.get(j))
                        .copied()
                        .unwrap_or(f64::INFINITY)
                }
            }),
            None => {
                let calc = Calculator::new(
                    total,
                    self.links
                        .iter()
                        .map(|l| (l.source, l.target, self.link_length(l))),
                );
                let mut g = Descent::create_square_matrix(total, |_, _| 2.0);
                for l in &self.links {
                    g[l.source][l.target] = 1.0;
                    g[l.target][l.source] = 1.0;
                }
                g_matrix = Some(g);
                calc.distance_matrix()
            }
        };

        // Each group contributes a weakly sprung pair of dummy nodes.
        for gi in 0..self.groups.len() {
            let a = n + 2 * gi;
            if let Some(g) = g_matrix.as_mut() {
                g[a][a + 1] = GROUP_DUMMY_WEIGHT;
                g[a + 1][a] = GROUP_DUMMY_WEIGHT;
            }
            d_matrix[a][a + 1] = GROUP_DUMMY_DISTANCE;
            d_matrix[a + 1][a] = GROUP_DUMMY_DISTANCE;
            x[a] = 0.0;
            y[a] = 0.0;
            x[a + 1] = 0.0;
            y[a + 1] = 0.0;
        }

        let mut constraints = self.constraints.clone();
        if let Some(flow) = self.options.flow_layout {
            constraints.extend(generate_directed_edge_constraints(
                n,
                &self.links,
                flow.axis,
                flow.min_separation,
            ));
        }

        let mut descent = Descent::new(vec![x, y], d_matrix);
        descent.threshold = self.options.convergence_threshold;

        descent.run(self.options.initial_unconstrained_iterations, None);

        self.projection = if constraints.is_empty() {
            None
        } else {
            self.positions_from_descent(&descent);
            let p = Projection::new(
                &mut self.nodes,
                &self.groups,
                &constraints,
                false,
                self.options.default_node_size,
            );
            self.positions_into_descent(&mut descent);
            Some(p)
        };
        descent.run(
            self.options.initial_user_constraint_iterations,
            self.projection.as_mut().map(|p| p as &mut dyn Project),
        );

        if self.options.avoid_overlaps {
            self.positions_from_descent(&descent);
            let p = Projection::new(
                &mut self.nodes,
                &self.groups,
                &constraints,
                true,
                self.options.default_node_size,
            );
            self.positions_into_descent(&mut descent);
            self.projection = Some(p);
        }
        descent.g = g_matrix;
        descent.run(
            self.options.initial_all_constraints_iterations,
            self.projection.as_mut().map(|p| p as &mut dyn Project),
        );

        self.positions_from_descent(&descent);

        if self.distance_matrix.is_none() && self.options.handle_disconnected {
            let components = separate_graphs(n, &self.links);
            if components.len() > 1 {
                debug!(components = components.len(), "packing disconnected components");
            }
            apply_packing(&components, &mut self.nodes, width, height,
                self.options.default_node_size, 1.0);
            for (i, v) in self.nodes.iter().enumerate() {
                descent.x[0][i] = v.x;
                descent.x[1][i] = v.y;
            }
        }

        self.descent = Some(descent);
        self.last_stress = None;
        self.resume();
        Ok(())
    }

    /// Advance the simulation one step. Returns true once the layout has
    /// converged (alpha fell below the convergence threshold).
    pub fn tick(&mut self) -> bool {
        if self.alpha < self.options.convergence_threshold {
            self.alpha = 0.0;
            self.last_stress = None;
            self.running = false;
            return true;
        }
        let Some(descent) = self.descent.as_mut() else {
            return true;
        };

        descent.locks.clear();
        for (i, v) in self.nodes.iter_mut().enumerate() {
            if v.fixed {
                let px = *v.px.get_or_insert(v.x);
                let py = *v.py.get_or_insert(v.y);
                descent.locks.add(i, [px, py]);
            }
        }
        if let Some(p) = self.projection.as_mut() {
            p.set_pins(&self.nodes);
        }

        let stress = descent.runge_kutta(self.projection.as_mut().map(|p| p as &mut dyn Project));
        if stress == 0.0 {
            self.alpha = 0.0;
        } else if let Some(prev) = self.last_stress {
            if prev > stress - self.options.convergence_threshold {
                self.alpha = prev / stress - 1.0;
            }
        }
        self.last_stress = Some(stress);

        for (i, v) in self.nodes.iter_mut().enumerate() {
            if v.fixed {
                v.x = v.px.unwrap_or(v.x);
                v.y = v.py.unwrap_or(v.y);
            } else {
                v.x = descent.x[0][i];
                v.y = descent.x[1][i];
            }
        }
        false
    }

    /// Alignment feasibility may shuffle nodes, so positions are copied out
    /// to the node list before building a projection and back after.
    fn positions_from_descent(&mut self, descent: &Descent) {
        for (i, v) in self.nodes.iter_mut().enumerate() {
            v.x = descent.x[0][i];
            v.y = descent.x[1][i];
        }
    }

    fn positions_into_descent(&self, descent: &mut Descent) {
        for (i, v) in self.nodes.iter().enumerate() {
            descent.x[0][i] = v.x;
            descent.x[1][i] = v.y;
        }
    }

    /// Drive `tick` until convergence or the iteration cap.
    pub fn run(&mut self, max_ticks: usize) -> Result<()> {
        self.start()?;
        for _ in 0..max_ticks {
            if self.tick() {
                break;
            }
        }
        Ok(())
    }

    pub fn resume(&mut self) {
        self.alpha = 0.1;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.alpha = 0.0;
        self.running = false;
    }

    /// Build the visibility graph over every node's bounds shrunk by
    /// `margin`, so routed edges keep that distance from node borders.
    pub fn prepare_edge_routing(&mut self, margin: f64) {
        self.inner_bounds = self
            .nodes
            .iter()
            .map(|v| v.bounds(self.options.default_node_size).inflate(-margin))
            .collect();
        self.visibility = Some(TangentVisibilityGraph::new(
            self.inner_bounds.iter().map(Rectangle::vertices).collect(),
        ));
    }

    /// Poly-line route for one link around the other nodes' bounds. Falls
    /// back to the straight edge between the endpoint boxes when the
    /// endpoints see each other directly (or no route exists).
    pub fn route_edge(&self, link: &Link) -> Vec<Point> {
        let source_centre = Point {
            x: self.nodes[link.source].x,
            y: self.nodes[link.source].y,
        };
        let target_centre = Point {
            x: self.nodes[link.target].x,
            y: self.nodes[link.target].y,
        };
        let Some(base) = self.visibility.as_ref() else {
            return vec![source_centre, target_centre];
        };
        let source_inner = &self.inner_bounds[link.source];
        let target_inner = &self.inner_bounds[link.target];

        let mut vg = base.clone();
        let si = vg.add_point(source_centre, link.source);
        let ti = vg.add_point(target_centre, link.target);
        vg.add_edge_if_visible(si, ti, link.source, link.target);

        let calc = Calculator::new(
            vg.vertices.len(),
            vg.edges
                .iter()
                .map(|e| (e.source, e.target, vg.edge_length(e))),
        );
        let path = calc.path_from_node_to_node(si, ti);
        if path.len() <= 1 {
            let geometry = make_edge_between(source_inner, target_inner, ARROW_CLEARANCE);
            return vec![geometry.source_intersection, geometry.arrow_start];
        }

        // path runs from just before the target back to the source.
        let first_hop = vg.vertices[path[path.len() - 2]].p;
        let last_hop = vg.vertices[path[0]].p;
        let mut route = vec![
            source_inner
                .ray_intersection(first_hop.x, first_hop.y)
                .unwrap_or(source_centre),
        ];
        for &vi in path[..path.len() - 1].iter().rev() {
            route.push(vg.vertices[vi].p);
        }
        route.push(make_edge_to(&last_hop, target_inner, ARROW_CLEARANCE));
        route
    }
}
