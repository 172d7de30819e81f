//! Computational geometry for obstacle-aware edge routing: convex hulls,
//! tangents between convex polygons, and the tangent visibility graph.
//!
//! Polygons are closed chains (first vertex repeated at the end) unless noted.

use selkie_vpsc::{Point, Rectangle};

/// Twice the signed area of triangle abc: positive when c lies to the left of
/// the directed line a -> b.
pub fn is_left(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

fn above(a: Point, b: Point, c: Point) -> bool {
    is_left(a, b, c) > 0.0
}

fn below(a: Point, b: Point, c: Point) -> bool {
    is_left(a, b, c) < 0.0
}

/// Monotone-chain convex hull. Input is an open point set; the output chain is
/// open too.
pub fn convex_hull(s: &[Point]) -> Vec<Point> {
    let mut p: Vec<Point> = s.to_vec();
    p.sort_by(|a, b| b.x.total_cmp(&a.x).then_with(|| b.y.total_cmp(&a.y)));
    let n = p.len();
    let minmin = 0;
    let xmin = p[0].x;
    let mut i = 1;
    while i < n && p[i].x == xmin {
        i += 1;
    }
    let minmax = i - 1;

    let mut hull = vec![p[minmin]];
    if minmax == n - 1 {
        if p[minmax].y != p[minmin].y {
            hull.push(p[minmax]);
        }
        return hull;
    }

    let maxmax = n - 1;
    let xmax = p[n - 1].x;
    let mut i = n - 1;
    while i > 0 && p[i - 1].x == xmax {
        i -= 1;
    }
    let maxmin = i;

    let mut i = minmax;
    while i + 1 <= maxmin {
        i += 1;
        if is_left(p[minmin], p[maxmin], p[i]) >= 0.0 && i < maxmin {
            continue;
        }
        while hull.len() > 1 && is_left(hull[hull.len() - 2], hull[hull.len() - 1], p[i]) <= 0.0 {
            hull.pop();
        }
        if i != minmin {
            hull.push(p[i]);
        }
    }
    if maxmax != maxmin {
        hull.push(p[maxmax]);
    }
    let bot = hull.len();
    let mut i = maxmin;
    while i > minmax {
        i -= 1;
        if is_left(p[maxmax], p[minmax], p[i]) >= 0.0 && i > minmax {
            continue;
        }
        while hull.len() > bot && is_left(hull[hull.len() - 2], hull[hull.len() - 1], p[i]) <= 0.0 {
            hull.pop();
        }
        if i != minmin {
            hull.push(p[i]);
        }
    }
    hull
}

/// Binary search for the rightmost tangent point from exterior point `p` to
/// the closed convex chain `poly`.
pub fn rtan(p: Point, poly: &[Point]) -> usize {
    let last = poly.len() - 1;
    if below(p, poly[1], poly[0]) && !above(p, poly[last - 1], poly[0]) {
        return 0;
    }
    let mut lo = 0;
    let mut hi = last;
    loop {
        if hi - lo == 1 {
            return if above(p, poly[lo], poly[hi]) { lo } else { hi };
        }
        let mid = (lo + hi) / 2;
        let down = below(p, poly[mid + 1], poly[mid]);
        if down && !above(p, poly[mid - 1], poly[mid]) {
            return mid;
        }
        if above(p, poly[lo + 1], poly[lo]) {
            if down {
                hi = mid;
            } else if above(p, poly[lo], poly[mid]) {
                hi = mid;
            } else {
                lo = mid;
            }
        } else if down {
            if below(p, poly[lo], poly[mid]) {
                hi = mid;
            } else {
                lo = mid;
            }
        } else {
            lo = mid;
        }
    }
}

/// Leftmost tangent point, mirror of `rtan`.
pub fn ltan(p: Point, poly: &[Point]) -> usize {
    let last = poly.len() - 1;
    if above(p, poly[last - 1], poly[0]) && !below(p, poly[1], poly[0]) {
        return 0;
    }
    let mut lo = 0;
    let mut hi = last;
    loop {
        if hi - lo == 1 {
            return if below(p, poly[lo], poly[hi]) { lo } else { hi };
        }
        let mid = (lo + hi) / 2;
        let down = below(p, poly[mid + 1], poly[mid]);
        if above(p, poly[mid - 1], poly[mid]) && !down {
            return mid;
        }
        if below(p, poly[lo + 1], poly[lo]) {
            if down {
                if below(p, poly[lo], poly[mid]) {
                    hi = mid;
                } else {
                    lo = mid;
                }
            } else {
                hi = mid;
            }
        } else if down {
            lo = mid;
        } else if above(p, poly[lo], poly[mid]) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
}

/// Pair of tangent-point indices, one on each polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TangentPair {
    pub t1: usize,
    pub t2: usize,
}

fn tangent_between(
    v: &[Point],
    w: &[Point],
    t1f: fn(Point, &[Point]) -> usize,
    t2f: fn(Point, &[Point]) -> usize,
    cmp1: fn(Point, Point, Point) -> bool,
    cmp2: fn(Point, Point, Point) -> bool,
) -> TangentPair {
    let mut t1 = t1f(w[0], v);
    let mut t2 = t2f(v[t1], w);
    let mut done = false;
    while !done {
        done = true;
        loop {
            if t1 == v.len() - 1 {
                t1 = 0;
            }
            if cmp1(w[t2], v[t1], v[t1 + 1]) {
                break;
            }
            t1 += 1;
        }
        loop {
            if t2 == 0 {
                t2 = w.len() - 1;
            }
            if cmp2(v[t1], w[t2], w[t2 - 1]) {
                break;
            }
            t2 -= 1;
            done = false;
        }
    }
    TangentPair { t1, t2 }
}

pub fn rl_tangent(v: &[Point], w: &[Point]) -> TangentPair {
    tangent_between(v, w, rtan, ltan, above, below)
}

pub fn lr_tangent(v: &[Point], w: &[Point]) -> TangentPair {
    let t = rl_tangent(w, v);
    TangentPair { t1: t.t2, t2: t.t1 }
}

pub fn ll_tangent(v: &[Point], w: &[Point]) -> TangentPair {
    tangent_between(v, w, ltan, ltan, below, below)
}

pub fn rr_tangent(v: &[Point], w: &[Point]) -> TangentPair {
    tangent_between(v, w, rtan, rtan, above, above)
}

#[derive(Debug, Clone, Copy)]
pub struct LineSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl LineSegment {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// Intersections of the segment with each edge of the closed chain `poly`.
pub fn intersects(l: &LineSegment, poly: &[Point]) -> Vec<Point> {
    let mut ints = Vec::new();
    for i in 1..poly.len() {
        if let Some(p) = Rectangle::line_intersection(
            l.x1,
            l.y1,
            l.x2,
            l.y2,
            poly[i - 1].x,
            poly[i - 1].y,
            poly[i].x,
            poly[i].y,
        ) {
            ints.push(p);
        }
    }
    ints
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BiTangents {
    pub ll: Option<TangentPair>,
    pub rr: Option<TangentPair>,
    pub rl: Option<TangentPair>,
    pub lr: Option<TangentPair>,
}

/// Brute-force bitangents between two closed convex chains, classified by
/// which side each polygon lies on.
pub fn tangents(v: &[Point], w: &[Point]) -> BiTangents {
    let vn = v.len() - 1;
    let wn = w.len() - 1;
    let mut bt = BiTangents::default();
    for i in 0..vn {
        for j in 0..wn {
            let v0 = v[if i == 0 { vn - 1 } else { i - 1 }];
            let v1 = v[i];
            let v2 = v[i + 1];
            let w0 = w[if j == 0 { wn - 1 } else { j - 1 }];
            let w1 = w[j];
            let w2 = w[j + 1];
            let c1 = is_left(v0, v1, w1);
            let c2 = is_left(v1, w0, w1);
            let c3 = is_left(v1, w1, w2);
            let c4 = is_left(w0, w1, v1);
            let c5 = is_left(w1, v0, v1);
            let c6 = is_left(w1, v1, v2);
            let pair = TangentPair { t1: i, t2: j };
            if c1 >= 0.0 && c2 >= 0.0 && c3 < 0.0 && c4 >= 0.0 && c5 >= 0.0 && c6 < 0.0 {
                bt.ll = Some(pair);
            } else if c1 <= 0.0 && c2 <= 0.0 && c3 > 0.0 && c4 <= 0.0 && c5 <= 0.0 && c6 > 0.0 {
                bt.rr = Some(pair);
            } else if c1 <= 0.0 && c2 > 0.0 && c3 <= 0.0 && c4 >= 0.0 && c5 < 0.0 && c6 >= 0.0 {
                bt.rl = Some(pair);
            } else if c1 >= 0.0 && c2 < 0.0 && c3 >= 0.0 && c4 <= 0.0 && c5 > 0.0 && c6 <= 0.0 {
                bt.lr = Some(pair);
            }
        }
    }
    bt
}

fn point_inside_poly(p: Point, poly: &[Point]) -> bool {
    for i in 1..poly.len() {
        if below(poly[i - 1], poly[i], p) {
            return false;
        }
    }
    true
}

fn any_vertex_inside(v: &[Point], w: &[Point]) -> bool {
    v.iter().any(|&p| point_inside_poly(p, w))
}

/// True when the closed chains share area: a vertex of one inside the other,
/// or any pair of edges crossing.
pub fn polys_overlap(v: &[Point], w: &[Point]) -> bool {
    if any_vertex_inside(v, w) || any_vertex_inside(w, v) {
        return true;
    }
    for i in 1..v.len() {
        let l = LineSegment::new(v[i - 1].x, v[i - 1].y, v[i].x, v[i].y);
        if !intersects(&l, w).is_empty() {
            return true;
        }
    }
    false
}

#[derive(Debug, Clone, Copy)]
pub struct VisibilityVertex {
    pub id: usize,
    /// Owning polygon, or one past the last polygon for inserted route
    /// endpoints.
    pub polyid: usize,
    pub polyvertid: usize,
    pub p: Point,
}

#[derive(Debug, Clone, Copy)]
pub struct VisibilityEdge {
    pub source: usize,
    pub target: usize,
}

/// Visibility graph over the vertices of a set of convex obstacle polygons:
/// perimeter edges plus every bitangent not blocked by a third polygon.
#[derive(Debug, Clone)]
pub struct TangentVisibilityGraph {
    pub polys: Vec<Vec<Point>>,
    pub vertices: Vec<VisibilityVertex>,
    pub edges: Vec<VisibilityEdge>,
    /// Vertex id of polygon point (i, j) is `poly_offset[i] + j`.
    poly_offset: Vec<usize>,
}

impl TangentVisibilityGraph {
    pub fn new(polys: Vec<Vec<Point>>) -> Self {
        let mut g = Self {
            polys,
            vertices: Vec::new(),
            edges: Vec::new(),
            poly_offset: Vec::new(),
        };
        for pi in 0..g.polys.len() {
            g.poly_offset.push(g.vertices.len());
            for vi in 0..g.polys[pi].len() {
                let id = g.vertices.len();
                g.vertices.push(VisibilityVertex {
                    id,
                    polyid: pi,
                    polyvertid: vi,
                    p: g.polys[pi][vi],
                });
                if vi > 0 {
                    g.edges.push(VisibilityEdge {
                        source: id - 1,
                        target: id,
                    });
                }
            }
        }
        for i in 0..g.polys.len() {
            for j in i + 1..g.polys.len() {
                let bt = tangents(&g.polys[i], &g.polys[j]);
                for pair in [bt.ll, bt.rr, bt.rl, bt.lr].into_iter().flatten() {
                    g.add_edge_if_visible(
                        g.poly_offset[i] + pair.t1,
                        g.poly_offset[j] + pair.t2,
                        i,
                        j,
                    );
                }
            }
        }
        g
    }

    /// Connect two vertices unless the segment between them crosses a polygon
    /// other than the two excluded ones (usually the endpoints' own).
    pub fn add_edge_if_visible(&mut self, u: usize, v: usize, exclude_a: usize, exclude_b: usize) {
        let a = self.vertices[u];
        let b = self.vertices[v];
        let l = LineSegment::new(a.p.x, a.p.y, b.p.x, b.p.y);
        for (pi, poly) in self.polys.iter().enumerate() {
            if pi == exclude_a || pi == exclude_b {
                continue;
            }
            if !intersects(&l, poly).is_empty() {
                return;
            }
        }
        self.edges.push(VisibilityEdge {
            source: u,
            target: v,
        });
    }

    /// Insert a free point (typically an edge endpoint at a node centre) and
    /// connect it to the visible tangent points of every polygon except
    /// `exclude`, which also never blocks those connections. Returns the new
    /// vertex id.
    pub fn add_point(&mut self, p: Point, exclude: usize) -> usize {
        let id = self.vertices.len();
        self.vertices.push(VisibilityVertex {
            id,
            polyid: self.polys.len(),
            polyvertid: 0,
            p,
        });
        for pi in 0..self.polys.len() {
            if pi == exclude {
                continue;
            }
            let l = ltan(p, &self.polys[pi]);
            let r = rtan(p, &self.polys[pi]);
            self.add_edge_if_visible(id, self.poly_offset[pi] + l, exclude, pi);
            self.add_edge_if_visible(id, self.poly_offset[pi] + r, exclude, pi);
        }
        id
    }

    pub fn edge_length(&self, e: &VisibilityEdge) -> f64 {
        let a = self.vertices[e.source].p;
        let b = self.vertices[e.target].p;
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        (dx * dx + dy * dy).sqrt()
    }
}
