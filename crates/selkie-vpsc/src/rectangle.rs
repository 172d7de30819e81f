//! Axis-aligned rectangles and the sweep-line generation of non-overlap and
//! group-containment separation constraints.
//!
//! The sweep walks open/close events of rectangle extents projected onto one
//! axis, maintaining an ordered scan line so that only spatially adjacent
//! pairs produce constraints. All sweep state is local to an invocation.

use crate::solver::{Constraint, Solver, Variable};
use indexmap::IndexSet;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Rectangle {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Identity for `union`.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn cx(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn cy(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Horizontal overlap between this rectangle and `r`, zero when disjoint.
    pub fn overlap_x(&self, r: &Rectangle) -> f64 {
        let ux = self.cx();
        let vx = r.cx();
        if vx >= ux && r.min_x < self.max_x {
            return self.max_x - r.min_x;
        }
        if ux >= vx && self.min_x < r.max_x {
            return r.max_x - self.min_x;
        }
        0.0
    }

    pub fn overlap_y(&self, r: &Rectangle) -> f64 {
        let uy = self.cy();
        let vy = r.cy();
        if vy >= uy && r.min_y < self.max_y {
            return self.max_y - r.min_y;
        }
        if uy >= vy && self.min_y < r.max_y {
            return r.max_y - self.min_y;
        }
        0.0
    }

    pub fn set_x_center(&mut self, cx: f64) {
        let dx = cx - self.cx();
        self.min_x += dx;
        self.max_x += dx;
    }

    pub fn set_y_center(&mut self, cy: f64) {
        let dy = cy - self.cy();
        self.min_y += dy;
        self.max_y += dy;
    }

    pub fn union(&self, r: &Rectangle) -> Rectangle {
        Rectangle {
            min_x: self.min_x.min(r.min_x),
            max_x: self.max_x.max(r.max_x),
            min_y: self.min_y.min(r.min_y),
            max_y: self.max_y.max(r.max_y),
        }
    }

    pub fn inflate(&self, pad: f64) -> Rectangle {
        Rectangle {
            min_x: self.min_x - pad,
            max_x: self.max_x + pad,
            min_y: self.min_y - pad,
            max_y: self.max_y + pad,
        }
    }

    /// Corner loop, closed (first vertex repeated), counter-clockwise in
    /// screen coordinates.
    pub fn vertices(&self) -> Vec<Point> {
        vec![
            Point {
                x: self.min_x,
                y: self.min_y,
            },
            Point {
                x: self.max_x,
                y: self.min_y,
            },
            Point {
                x: self.max_x,
                y: self.max_y,
            },
            Point {
                x: self.min_x,
                y: self.max_y,
            },
            Point {
                x: self.min_x,
                y: self.min_y,
            },
        ]
    }

    /// Intersection point of segments `(x1,y1)-(x2,y2)` and `(x3,y3)-(x4,y4)`,
    /// if any.
    pub fn line_intersection(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
        x4: f64,
        y4: f64,
    ) -> Option<Point> {
        let dx12 = x2 - x1;
        let dx34 = x4 - x3;
        let dy12 = y2 - y1;
        let dy34 = y4 - y3;
        let denominator = dy34 * dx12 - dx34 * dy12;
        if denominator == 0.0 {
            return None;
        }
        let dx31 = x1 - x3;
        let dy31 = y1 - y3;
        let numa = dx34 * dy31 - dy34 * dx31;
        let a = numa / denominator;
        let numb = dx12 * dy31 - dy12 * dx31;
        let b = numb / denominator;
        if (0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b) {
            Some(Point {
                x: x1 + a * dx12,
                y: y1 + a * dy12,
            })
        } else {
            None
        }
    }

    /// Intersections of the segment with each of this rectangle's four sides.
    pub fn line_intersections(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<Point> {
        let sides = [
            [self.min_x, self.min_y, self.max_x, self.min_y],
            [self.max_x, self.min_y, self.max_x, self.max_y],
            [self.max_x, self.max_y, self.min_x, self.max_y],
            [self.min_x, self.max_y, self.min_x, self.min_y],
        ];
        let mut intersections = Vec::new();
        for side in sides {
            if let Some(p) =
                Self::line_intersection(x1, y1, x2, y2, side[0], side[1], side[2], side[3])
            {
                intersections.push(p);
            }
        }
        intersections
    }

    /// First intersection of the ray from this rectangle's centre toward
    /// `(x2, y2)` with the rectangle boundary.
    pub fn ray_intersection(&self, x2: f64, y2: f64) -> Option<Point> {
        self.line_intersections(self.cx(), self.cy(), x2, y2)
            .into_iter()
            .next()
    }
}

/// Hierarchical container of leaf rectangles and child groups. Boundaries are
/// expressed through two synthetic variables so containment becomes ordinary
/// separation constraints.
#[derive(Debug, Clone)]
pub struct Group {
    /// Leaf node ids; a leaf's variable id equals its node id.
    pub leaves: Vec<usize>,
    /// Child group ids into the same arena.
    pub groups: Vec<usize>,
    pub padding: f64,
    pub bounds: Rectangle,
    /// Variable id of the min (left/top) boundary.
    pub min_var: usize,
    /// Variable id of the max (right/bottom) boundary.
    pub max_var: usize,
}

/// Recompute `bounds` for the subtree rooted at `root`: union of member
/// bounds, inflated by the group padding.
pub fn compute_group_bounds(
    root: usize,
    groups: &mut [Group],
    leaf_rects: &[Rectangle],
) -> Rectangle {
    let mut bounds = Rectangle::empty();
    for i in 0..groups[root].leaves.len() {
        let l = groups[root].leaves[i];
        bounds = bounds.union(&leaf_rects[l]);
    }
    for i in 0..groups[root].groups.len() {
        let g = groups[root].groups[i];
        let child = compute_group_bounds(g, groups, leaf_rects);
        bounds = bounds.union(&child);
    }
    bounds = bounds.inflate(groups[root].padding);
    groups[root].bounds = bounds;
    bounds
}

#[derive(Debug, Clone, Copy)]
enum Dim {
    X,
    Y,
}

impl Dim {
    fn center(self, r: &Rectangle) -> f64 {
        match self {
            Dim::X => r.cx(),
            Dim::Y => r.cy(),
        }
    }

    /// Start of the rectangle's extent on the perpendicular (sweep) axis.
    fn open(self, r: &Rectangle) -> f64 {
        match self {
            Dim::X => r.min_y,
            Dim::Y => r.min_x,
        }
    }

    fn close(self, r: &Rectangle) -> f64 {
        match self {
            Dim::X => r.max_y,
            Dim::Y => r.max_x,
        }
    }

    fn size(self, r: &Rectangle) -> f64 {
        match self {
            Dim::X => r.width(),
            Dim::Y => r.height(),
        }
    }

    fn make_rect(self, open: f64, close: f64, center: f64, size: f64) -> Rectangle {
        match self {
            Dim::X => Rectangle::new(center - size / 2.0, center + size / 2.0, open, close),
            Dim::Y => Rectangle::new(open, close, center - size / 2.0, center + size / 2.0),
        }
    }
}

struct SweepNode {
    var: usize,
    rect: Rectangle,
    pos: f64,
    prev: IndexSet<usize>,
    next: IndexSet<usize>,
}

struct Event {
    is_open: bool,
    node: usize,
    pos: f64,
}

/// Ordered scan line of currently open sweep nodes, keyed by centre position.
struct ScanLine {
    order: Vec<usize>,
}

impl ScanLine {
    fn new() -> Self {
        Self { order: Vec::new() }
    }

    fn rank(&self, nodes: &[SweepNode], v: usize) -> Result<usize, usize> {
        self.order.binary_search_by(|&u| {
            nodes[u]
                .pos
                .total_cmp(&nodes[v].pos)
                .then_with(|| u.cmp(&v))
        })
    }

    fn insert(&mut self, nodes: &[SweepNode], v: usize) {
        if let Err(i) = self.rank(nodes, v) {
            self.order.insert(i, v);
        }
    }

    fn remove(&mut self, nodes: &[SweepNode], v: usize) {
        if let Ok(i) = self.rank(nodes, v) {
            self.order.remove(i);
        }
    }
}

fn link(nodes: &mut [SweepNode], left: usize, right: usize) {
    nodes[left].next.insert(right);
    nodes[right].prev.insert(left);
}

/// Record the spatially adjacent neighbours of a freshly opened node. The X
/// sweep scans outward until horizontal overlap ends; the Y sweep only links
/// immediate neighbours with horizontal overlap.
fn find_neighbours(dim: Dim, v: usize, scan: &ScanLine, nodes: &mut [SweepNode]) {
    let i = match scan.rank(nodes, v) {
        Ok(i) => i,
        Err(_) => return,
    };
    match dim {
        Dim::X => {
            for j in i + 1..scan.order.len() {
                let u = scan.order[j];
                let overlap = nodes[u].rect.overlap_x(&nodes[v].rect);
                if overlap <= 0.0 || overlap <= nodes[u].rect.overlap_y(&nodes[v].rect) {
                    link(nodes, v, u);
                }
                if overlap <= 0.0 {
                    break;
                }
            }
            for j in (0..i).rev() {
                let u = scan.order[j];
                let overlap = nodes[u].rect.overlap_x(&nodes[v].rect);
                if overlap <= 0.0 || overlap <= nodes[u].rect.overlap_y(&nodes[v].rect) {
                    link(nodes, u, v);
                }
                if overlap <= 0.0 {
                    break;
                }
            }
        }
        Dim::Y => {
            if i + 1 < scan.order.len() {
                let u = scan.order[i + 1];
                if nodes[u].rect.overlap_x(&nodes[v].rect) > 0.0 {
                    link(nodes, v, u);
                }
            }
            if i > 0 {
                let u = scan.order[i - 1];
                if nodes[u].rect.overlap_x(&nodes[v].rect) > 0.0 {
                    link(nodes, u, v);
                }
            }
        }
    }
}

fn generate_constraints(
    entries: &[(Rectangle, usize)],
    dim: Dim,
    min_gap: f64,
) -> Vec<Constraint> {
    let mut nodes: Vec<SweepNode> = entries
        .iter()
        .map(|&(rect, var)| SweepNode {
            var,
            rect,
            pos: dim.center(&rect),
            prev: IndexSet::new(),
            next: IndexSet::new(),
        })
        .collect();

    let mut events = Vec::with_capacity(2 * nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        events.push(Event {
            is_open: true,
            node: i,
            pos: dim.open(&node.rect),
        });
        events.push(Event {
            is_open: false,
            node: i,
            pos: dim.close(&node.rect),
        });
    }
    events.sort_by(|a, b| {
        a.pos
            .total_cmp(&b.pos)
            .then_with(|| b.is_open.cmp(&a.is_open))
    });

    let mut cs = Vec::new();
    let separation = |nodes: &[SweepNode], left: usize, right: usize| {
        let gap = (dim.size(&nodes[left].rect) + dim.size(&nodes[right].rect)) / 2.0 + min_gap;
        Constraint::new(nodes[left].var, nodes[right].var, gap)
    };

    let mut scan = ScanLine::new();
    for ev in &events {
        let v = ev.node;
        if ev.is_open {
            scan.insert(&nodes, v);
            find_neighbours(dim, v, &scan, &mut nodes);
        } else {
            scan.remove(&nodes, v);
            let lefts: Vec<usize> = nodes[v].prev.iter().copied().collect();
            for u in lefts {
                cs.push(separation(&nodes, u, v));
                nodes[u].next.swap_remove(&v);
            }
            let rights: Vec<usize> = nodes[v].next.iter().copied().collect();
            for u in rights {
                cs.push(separation(&nodes, v, u));
                nodes[u].prev.swap_remove(&v);
            }
        }
    }
    debug_assert!(scan.order.is_empty());
    cs
}

const OVERLAP_GAP: f64 = 1e-6;

/// Horizontal separation constraints keeping the given rectangles from
/// overlapping; constraint endpoints are rectangle indices.
pub fn generate_x_constraints(rects: &[Rectangle]) -> Vec<Constraint> {
    let entries: Vec<(Rectangle, usize)> = rects.iter().copied().zip(0..).collect();
    generate_constraints(&entries, Dim::X, OVERLAP_GAP)
}

pub fn generate_y_constraints(rects: &[Rectangle]) -> Vec<Constraint> {
    let entries: Vec<(Rectangle, usize)> = rects.iter().copied().zip(0..).collect();
    generate_constraints(&entries, Dim::Y, OVERLAP_GAP)
}

fn generate_group_constraints(
    root: usize,
    groups: &mut [Group],
    leaf_rects: &[Rectangle],
    vars: &mut [Variable],
    dim: Dim,
    is_contained: bool,
) -> Vec<Constraint> {
    let padding = groups[root].padding;

    let mut cs: Vec<Constraint> = Vec::new();
    for i in 0..groups[root].groups.len() {
        let g = groups[root].groups[i];
        cs.extend(generate_group_constraints(
            g, groups, leaf_rects, vars, dim, true,
        ));
    }

    let mut entries: Vec<(Rectangle, usize)> = Vec::new();
    if is_contained {
        let bounds = groups[root].bounds;
        let center = dim.center(&bounds);
        let half = dim.size(&bounds) / 2.0;
        let open = dim.open(&bounds);
        let close = dim.close(&bounds);
        let min_pos = center - half + padding / 2.0;
        let max_pos = center + half - padding / 2.0;
        vars[groups[root].min_var].desired_position = min_pos;
        entries.push((
            dim.make_rect(open, close, min_pos, padding),
            groups[root].min_var,
        ));
        vars[groups[root].max_var].desired_position = max_pos;
        entries.push((
            dim.make_rect(open, close, max_pos, padding),
            groups[root].max_var,
        ));
    }
    for &l in &groups[root].leaves {
        entries.push((leaf_rects[l], l));
    }
    for &g in &groups[root].groups {
        // A child group participates in the sweep as its whole padded box,
        // represented by its min boundary variable; the fix-up below rewrites
        // the generated constraints in terms of both boundaries.
        let b = groups[g].bounds;
        entries.push((
            dim.make_rect(dim.open(&b), dim.close(&b), dim.center(&b), dim.size(&b)),
            groups[g].min_var,
        ));
    }

    let mut own = generate_constraints(&entries, dim, OVERLAP_GAP);
    for i in 0..groups[root].groups.len() {
        let g = groups[root].groups[i];
        let shrink = (groups[g].padding - dim.size(&groups[g].bounds)) / 2.0;
        for c in own.iter_mut() {
            if c.right == groups[g].min_var {
                c.gap += shrink;
            } else if c.left == groups[g].min_var {
                c.left = groups[g].max_var;
                c.gap += shrink;
            }
        }
    }
    cs.extend(own);
    cs
}

/// Containment and non-overlap constraints for the group hierarchy rooted at
/// `root`, on the x axis. `compute_group_bounds` must have run first.
pub fn generate_x_group_constraints(
    root: usize,
    groups: &mut [Group],
    leaf_rects: &[Rectangle],
    vars: &mut [Variable],
) -> Vec<Constraint> {
    generate_group_constraints(root, groups, leaf_rects, vars, Dim::X, false)
}

pub fn generate_y_group_constraints(
    root: usize,
    groups: &mut [Group],
    leaf_rects: &[Rectangle],
    vars: &mut [Variable],
) -> Vec<Constraint> {
    generate_group_constraints(root, groups, leaf_rects, vars, Dim::Y, false)
}

/// One-shot removal of all rectangle overlaps at minimum total displacement:
/// solve the x axis, then the y axis against the updated x positions.
pub fn remove_overlaps(rects: &mut [Rectangle]) {
    let mut vs: Vec<Variable> = rects.iter().map(|r| Variable::new(r.cx())).collect();
    let mut cs = generate_x_constraints(rects);
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let xs = solver.positions();
    for (r, x) in rects.iter_mut().zip(xs) {
        r.set_x_center(x);
    }

    let mut vs: Vec<Variable> = rects.iter().map(|r| Variable::new(r.cy())).collect();
    let mut cs = generate_y_constraints(rects);
    let mut solver = Solver::new(&mut vs, &mut cs);
    solver.solve();
    let ys = solver.positions();
    for (r, y) in rects.iter_mut().zip(ys) {
        r.set_y_center(y);
    }
}

/// Endpoints for drawing an edge between two rectangles: the boundary
/// intersections of the centre-to-centre line, and the arrowhead start point
/// `ah` short of the target.
#[derive(Debug, Clone, Copy)]
pub struct EdgeGeometry {
    pub source_intersection: Point,
    pub target_intersection: Point,
    pub arrow_start: Point,
}

pub fn make_edge_between(source: &Rectangle, target: &Rectangle, ah: f64) -> EdgeGeometry {
    let si = source
        .ray_intersection(target.cx(), target.cy())
        .unwrap_or(Point {
            x: source.cx(),
            y: source.cy(),
        });
    let ti = target
        .ray_intersection(source.cx(), source.cy())
        .unwrap_or(Point {
            x: target.cx(),
            y: target.cy(),
        });
    let dx = ti.x - si.x;
    let dy = ti.y - si.y;
    let l = (dx * dx + dy * dy).sqrt();
    // Coincident rectangles leave no direction to back off along.
    let arrow_start = if l > 0.0 {
        let al = l - ah;
        Point {
            x: si.x + al * dx / l,
            y: si.y + al * dy / l,
        }
    } else {
        si
    };
    EdgeGeometry {
        source_intersection: si,
        target_intersection: ti,
        arrow_start,
    }
}

/// Point on the boundary of `target`, `ah` short of it along the ray from `p`.
pub fn make_edge_to(p: &Point, target: &Rectangle, ah: f64) -> Point {
    let ti = target.ray_intersection(p.x, p.y).unwrap_or(Point {
        x: target.cx(),
        y: target.cy(),
    });
    let dx = ti.x - p.x;
    let dy = ti.y - p.y;
    let l = (dx * dx + dy * dy).sqrt();
    if l > 0.0 {
        Point {
            x: ti.x - ah * dx / l,
            y: ti.y - ah * dy / l,
        }
    } else {
        ti
    }
}
