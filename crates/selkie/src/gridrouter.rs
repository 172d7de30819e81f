//! Orthogonal edge routing over a sparse grid induced by the node layout.
//!
//! Grid lines run through the centres of each row and column of nodes and
//! through the gaps between them. Routes follow grid edges, pay a penalty for
//! every bend, and are finally nudged apart so parallel runs do not overlap.

use rustc_hash::FxHashSet;
use selkie_vpsc::{Constraint, Point, Rectangle, Solver, Variable};

use crate::shortestpaths::Calculator;

const BEND_PENALTY: f64 = 1000.0;

/// One routable entity: a node or a group enclosing its children.
#[derive(Debug, Clone)]
pub struct GridNode {
    pub bounds: Rectangle,
    /// Indices of member grid nodes; empty for leaves.
    pub children: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Wrapper {
    rect: Rectangle,
    children: Vec<usize>,
    leaf: bool,
    parent: Option<usize>,
    ports: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Vert {
    x: f64,
    y: f64,
    node: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct GridEdge {
    source: usize,
    target: usize,
    length: f64,
}

#[derive(Debug, Clone)]
struct GridLine {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    verts: Vec<usize>,
}

/// An axis-aligned polyline segment; routes are lists of these.
pub type Segment = [Point; 2];

#[derive(Debug)]
pub struct GridRouter {
    nodes: Vec<Wrapper>,
    back_to_front: Vec<usize>,
    verts: Vec<Vert>,
    edges: Vec<GridEdge>,
}

impl GridRouter {
    pub fn new(grid_nodes: Vec<GridNode>, group_padding: f64) -> Self {
        let mut nodes: Vec<Wrapper> = grid_nodes
            .into_iter()
            .map(|g| Wrapper {
                rect: g.bounds,
                leaf: g.children.is_empty(),
                children: g.children,
                parent: None,
                ports: Vec::new(),
            })
            .collect();
        for i in 0..nodes.len() {
            for ci in nodes[i].children.clone() {
                nodes[ci].parent = Some(i);
            }
        }

        let mut back_to_front: Vec<usize> = (0..nodes.len()).collect();
        back_to_front.sort_by_key(|&i| depth(&nodes, i));

        // Group rectangles are grown from the inside out so each encloses
        // its (already grown) children.
        for &gi in back_to_front.iter().rev() {
            if nodes[gi].leaf {
                continue;
            }
            let mut r: Option<Rectangle> = None;
            for c in nodes[gi].children.clone() {
                let cr = nodes[c].rect;
                r = Some(match r {
                    Some(u) => u.union(&cr),
                    None => cr,
                });
            }
            if let Some(r) = r {
                nodes[gi].rect = r.inflate(group_padding);
            }
        }

        let cols = grid_line_positions(&nodes, true);
        let rows = grid_line_positions(&nodes, false);
        if cols.is_empty() || rows.is_empty() {
            // No leaves anywhere: an empty grid with no routable vertices.
            return Self {
                nodes,
                back_to_front,
                verts: Vec::new(),
                edges: Vec::new(),
            };
        }
        let col_mids = mid_points(&cols);
        let row_mids = mid_points(&rows);

        let row_x = col_mids[0];
        let row_x2 = col_mids[col_mids.len() - 1];
        let col_y = row_mids[0];
        let col_y2 = row_mids[row_mids.len() - 1];

        let mut hlines: Vec<GridLine> = rows
            .iter()
            .chain(row_mids.iter())
            .map(|&y| GridLine { x1: row_x, y1: y, x2: row_x2, y2: y, verts: Vec::new() })
            .collect();
        let mut vlines: Vec<GridLine> = cols
            .iter()
            .chain(col_mids.iter())
            .map(|&x| GridLine { x1: x, y1: col_y, x2: x, y2: col_y2, verts: Vec::new() })
            .collect();

        let mut verts: Vec<Vert> = Vec::new();
        let mut edges: Vec<GridEdge> = Vec::new();

        // Vertices at every crossing of a horizontal and vertical line, each
        // assigned to the front-most node containing it.
        for h in &mut hlines {
            for v in &mut vlines {
                let p = Point { x: v.x1, y: h.y1 };
                let mut owner = None;
                for &ni in back_to_front.iter().rev() {
                    let r = &nodes[ni].rect;
                    if (p.x - r.cx()).abs() < r.width() / 2.0
                        && (p.y - r.cy()).abs() < r.height() / 2.0
                    {
                        owner = Some(ni);
                        break;
                    }
                }
                let id = verts.len();
                verts.push(Vert { x: p.x, y: p.y, node: owner });
                h.verts.push(id);
                v.verts.push(id);
            }
        }

        for l in hlines.iter_mut().chain(vlines.iter_mut()) {
            // Ports where the line crosses a node boundary.
            for (ni, node) in nodes.iter_mut().enumerate() {
                for p in node.rect.line_intersections(l.x1, l.y1, l.x2, l.y2) {
                    let id = verts.len();
                    verts.push(Vert { x: p.x, y: p.y, node: Some(ni) });
                    l.verts.push(id);
                    node.ports.push(id);
                }
            }

            // Split the line into edges between successive vertices, leaving
            // out runs through the interior of a leaf.
            let horizontal = (l.y1 - l.y2).abs() < 0.1;
            l.verts.sort_by(|&a, &b| {
                let (pa, pb) = (&verts[a], &verts[b]);
                if horizontal { pa.x.total_cmp(&pb.x) } else { pa.y.total_cmp(&pb.y) }
            });
            for w in l.verts.windows(2) {
                let (u, v) = (&verts[w[0]], &verts[w[1]]);
                if let (Some(un), Some(vn)) = (u.node, v.node) {
                    if un == vn && nodes[un].leaf {
                        continue;
                    }
                }
                let length = if horizontal { v.x - u.x } else { v.y - u.y };
                edges.push(GridEdge { source: w[0], target: w[1], length: length.abs() });
            }
        }

        Self { nodes, back_to_front, verts, edges }
    }

    fn lineage(&self, mut v: usize) -> Vec<usize> {
        let mut path = vec![v];
        while let Some(p) = self.nodes[v].parent {
            path.push(p);
            v = p;
        }
        path.reverse();
        path
    }

    /// Siblings of `a` and `b` along their lineages up to (but not through)
    /// the common ancestor; these block the route between them.
    fn sibling_obstacles(&self, a: usize, b: usize) -> FxHashSet<usize> {
        let la = self.lineage(a);
        let lb = self.lineage(b);
        let mut i = 0;
        while i < la.len() && i < lb.len() && la[i] == lb[i] {
            i += 1;
        }
        let common = if i > 0 { Some(la[i - 1]) } else { None };
        let on_path: FxHashSet<usize> = la[i..].iter().chain(lb[i..].iter()).copied().collect();

        let mut obstacles = FxHashSet::default();
        let top_level: Box<dyn Iterator<Item = usize>> = match common {
            Some(g) => Box::new(self.nodes[g].children.iter().copied()),
            None => Box::new((0..self.nodes.len()).filter(|&v| self.nodes[v].parent.is_none())),
        };
        for c in top_level {
            if !on_path.contains(&c) {
                obstacles.insert(c);
            }
        }
        for &v in on_path.iter() {
            if self.nodes[v].parent != common {
                if let Some(p) = self.nodes[v].parent {
                    for &c in &self.nodes[p].children {
                        if !on_path.contains(&c) {
                            obstacles.insert(c);
                        }
                    }
                }
            }
        }
        obstacles
    }

    /// Orthogonal route from node `s` to node `t` as a polyline of grid
    /// vertices. Bends cost extra so the route prefers straight runs.
    pub fn route(&self, s: usize, t: usize) -> Vec<Point> {
        let obstacles = self.sibling_obstacles(s, t);
        let blocked = |v: &Vert| v.node.is_some_and(|n| obstacles.contains(&n));

        let mut passable: Vec<(usize, usize, f64)> = self
            .edges
            .iter()
            .filter(|e| !blocked(&self.verts[e.source]) && !blocked(&self.verts[e.target]))
            .map(|e| (e.source, e.target, e.length))
            .collect();

        // Free movement between the ports of the endpoints themselves.
        for &end in &[s, t] {
            let ports = &self.nodes[end].ports;
            for &p in ports.iter().skip(1) {
                passable.push((ports[0], p, 0.0));
            }
        }

        let calc = Calculator::new(self.verts.len(), passable);
        let bend_penalty = |a: usize, b: usize, c: usize| {
            let (va, vb, vc) = (&self.verts[a], &self.verts[b], &self.verts[c]);
            let dx = (vc.x - va.x).abs();
            let dy = (vc.y - va.y).abs();
            // Bends inside the endpoints are free.
            if va.node == Some(s) && va.node == vb.node || vb.node == Some(t) && vb.node == vc.node
            {
                return 0.0;
            }
            if dx > 1.0 && dy > 1.0 { BEND_PENALTY } else { 0.0 }
        };
        let source_port = self.nodes[s].ports[0];
        let target_port = self.nodes[t].ports[0];
        let mut path =
            calc.path_from_node_to_node_with_prev_cost(source_port, target_port, bend_penalty);
        path.reverse();
        path.push(target_port);

        // Drop the extra port hops inside the endpoints.
        let is = |vi: usize, n: usize| self.verts[vi].node == Some(n);
        path.iter()
            .enumerate()
            .filter(|&(i, &vi)| {
                !(i + 1 < path.len() && is(path[i + 1], s) && is(vi, s)
                    || i > 0 && is(vi, t) && is(path[i - 1], t))
            })
            .map(|(_, &vi)| Point { x: self.verts[vi].x, y: self.verts[vi].y })
            .collect()
    }

    /// Route every edge, then nudge overlapping parallel segments apart by
    /// `nudge_gap` in both axes.
    pub fn route_edges(&self, edges: &[(usize, usize)], nudge_gap: f64) -> Vec<Vec<Segment>> {
        let mut routes: Vec<Vec<Segment>> = edges
            .iter()
            .map(|&(s, t)| make_segments(&self.route(s, t)))
            .collect();
        nudge_segments(&mut routes, true, nudge_gap);
        nudge_segments(&mut routes, false, nudge_gap);
        routes
    }

    #[cfg(test)]
    pub(crate) fn vert_count(&self) -> usize {
        self.verts.len()
    }
}

fn depth(nodes: &[Wrapper], mut v: usize) -> usize {
    let mut d = 0;
    while let Some(p) = nodes[v].parent {
        d += 1;
        v = p;
    }
    d
}

/// Positions of the grid lines along one axis: leaves are clustered by
/// overlap in that axis and each cluster contributes the mean of its centres.
fn grid_line_positions(nodes: &[Wrapper], x_axis: bool) -> Vec<f64> {
    let mut remaining: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].leaf).collect();
    let mut positions = Vec::new();
    while let Some(&first) = remaining.first() {
        let overlapping: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&v| {
                let (a, b) = (&nodes[v].rect, &nodes[first].rect);
                if x_axis { a.overlap_x(b) > 0.0 } else { a.overlap_y(b) > 0.0 }
            })
            .collect();
        let sum: f64 = overlapping
            .iter()
            .map(|&v| if x_axis { nodes[v].rect.cx() } else { nodes[v].rect.cy() })
            .sum();
        positions.push(sum / overlapping.len() as f64);
        remaining.retain(|v| !overlapping.contains(v));
    }
    positions.sort_by(f64::total_cmp);
    positions
}

/// Between, before and after the given sorted positions.
fn mid_points(a: &[f64]) -> Vec<f64> {
    if a.len() <= 1 {
        return a.to_vec();
    }
    let gap = a[1] - a[0];
    let mut mids = vec![a[0] - gap / 2.0];
    for w in a.windows(2) {
        mids.push((w[0] + w[1]) / 2.0);
    }
    mids.push(a[a.len() - 1] + gap / 2.0);
    mids
}

/// Merge collinear runs of a polyline into single segments.
pub fn make_segments(path: &[Point]) -> Vec<Segment> {
    let straight = |a: &Point, b: &Point, c: &Point| {
        ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() < 0.001
    };
    let mut segments = Vec::new();
    if path.is_empty() {
        return segments;
    }
    let mut a = path[0];
    for i in 1..path.len() {
        let b = path[i];
        let merge = i + 1 < path.len() && straight(&a, &b, &path[i + 1]);
        if !merge {
            segments.push([a, b]);
            a = b;
        }
    }
    segments
}

fn coord(p: &Point, x_axis: bool) -> f64 {
    if x_axis { p.x } else { p.y }
}

fn set_coord(p: &mut Point, x_axis: bool, v: f64) {
    if x_axis {
        p.x = v;
    } else {
        p.y = v;
    }
}

/// Spread bundles of collinear segments perpendicular to their axis so they
/// sit `gap` apart. Segments are grouped by position, then by overlap in the
/// along-axis direction, and each bundle is spaced with a separation solve.
/// Ties are broken by edge order.
fn nudge_segments(routes: &mut [Vec<Segment>], x_axis: bool, gap: f64) {
    // (edge, segment) references to the segments perpendicular to x_axis.
    let mut refs: Vec<(usize, usize)> = Vec::new();
    for (ei, route) in routes.iter().enumerate() {
        for (si, seg) in route.iter().enumerate() {
            if (coord(&seg[1], x_axis) - coord(&seg[0], x_axis)).abs() < 0.1 {
                refs.push((ei, si));
            }
        }
    }
    refs.sort_by(|&(ae, asi), &(be, bsi)| {
        coord(&routes[ae][asi][0], x_axis).total_cmp(&coord(&routes[be][bsi][0], x_axis))
    });

    let mut sets: Vec<Vec<(usize, usize)>> = Vec::new();
    for &r in &refs {
        let pos = coord(&routes[r.0][r.1][0], x_axis);
        match sets.last_mut() {
            Some(set) if (pos - coord(&routes[set[0].0][set[0].1][0], x_axis)).abs() <= 0.1 => {
                set.push(r);
            }
            _ => sets.push(vec![r]),
        }
    }

    for set in sets {
        // Sweep along the conjugate axis to find overlapping bundles.
        let mut events: Vec<(f64, bool, (usize, usize))> = Vec::new();
        for &r in &set {
            let seg = &routes[r.0][r.1];
            let a = coord(&seg[0], !x_axis);
            let b = coord(&seg[1], !x_axis);
            events.push((a.min(b), true, r));
            events.push((a.max(b), false, r));
        }
        events.sort_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut open: Vec<(usize, usize)> = Vec::new();
        let mut open_count = 0usize;
        for (_, is_open, r) in events {
            if is_open {
                open.push(r);
                open_count += 1;
            } else {
                open_count -= 1;
            }
            if open_count == 0 {
                nudge_bundle(routes, &open, x_axis, gap);
                open = Vec::new();
            }
        }
    }
}

fn nudge_bundle(routes: &mut [Vec<Segment>], bundle: &[(usize, usize)], x_axis: bool, gap: f64) {
    let n = bundle.len();
    if n <= 1 {
        return;
    }
    let mut vars: Vec<Variable> = bundle
        .iter()
        .map(|&(ei, si)| Variable::new(coord(&routes[ei][si][0], x_axis)))
        .collect();
    let mut cs: Vec<Constraint> = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let (e1, s1) = bundle[i];
            let (e2, _) = bundle[j];
            if e1 >= e2 {
                continue;
            }
            let seg1 = &routes[e1][s1];
            let ascending = coord(&seg1[0], !x_axis) < coord(&seg1[1], !x_axis);
            // In page coordinates the left-of relation flips between axes.
            let (lind, rind) = if x_axis == ascending { (j, i) } else { (i, j) };
            cs.push(Constraint::new(lind, rind, gap));
        }
    }
    let mut solver = Solver::new(&mut vars, &mut cs);
    solver.solve();
    let positions = solver.positions();
    for (k, &(ei, si)) in bundle.iter().enumerate() {
        let pos = positions[k];
        let route = &mut routes[ei];
        set_coord(&mut route[si][0], x_axis, pos);
        set_coord(&mut route[si][1], x_axis, pos);
        if si > 0 {
            set_coord(&mut route[si - 1][1], x_axis, pos);
        }
        if si + 1 < route.len() {
            set_coord(&mut route[si + 1][0], x_axis, pos);
        }
    }
}
