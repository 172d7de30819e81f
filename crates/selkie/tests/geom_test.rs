use selkie::geom::{
    LineSegment, TangentVisibilityGraph, convex_hull, intersects, polys_overlap, tangents,
};
use selkie::shortestpaths::Calculator;
use selkie_vpsc::{Point, Rectangle};

fn pt(x: f64, y: f64) -> Point {
    Point { x, y }
}

fn square(cx: f64, cy: f64, half: f64) -> Vec<Point> {
    Rectangle::new(cx - half, cx + half, cy - half, cy + half).vertices()
}

#[test]
fn hull_of_a_square_with_interior_points_has_four_corners() {
    let pts = vec![
        pt(0.0, 0.0),
        pt(10.0, 0.0),
        pt(10.0, 10.0),
        pt(0.0, 10.0),
        pt(5.0, 5.0),
        pt(2.0, 7.0),
    ];
    let hull = convex_hull(&pts);
    assert_eq!(hull.len(), 4);
    for corner in [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 10.0), pt(0.0, 10.0)] {
        assert!(
            hull.iter()
                .any(|p| (p.x - corner.x).abs() < 1e-9 && (p.y - corner.y).abs() < 1e-9),
            "missing corner ({}, {})",
            corner.x,
            corner.y
        );
    }
}

#[test]
fn collinear_points_hull_is_degenerate() {
    let pts = vec![pt(0.0, 0.0), pt(1.0, 1.0), pt(2.0, 2.0), pt(3.0, 3.0)];
    let hull = convex_hull(&pts);
    assert!(hull.len() <= 3);
}

#[test]
fn all_four_bitangents_exist_for_disjoint_squares() {
    let v = square(0.0, 0.0, 1.0);
    let w = square(10.0, 0.0, 1.0);
    let bt = tangents(&v, &w);
    assert!(bt.ll.is_some());
    assert!(bt.rr.is_some());
    assert!(bt.rl.is_some());
    assert!(bt.lr.is_some());
}

#[test]
fn segment_polygon_intersections_are_found() {
    let poly = square(5.0, 0.0, 1.0);
    let through = LineSegment::new(0.0, 0.0, 10.0, 0.0);
    assert_eq!(intersects(&through, &poly).len(), 2);
    let miss = LineSegment::new(0.0, 5.0, 10.0, 5.0);
    assert!(intersects(&miss, &poly).is_empty());
}

#[test]
fn overlap_test_distinguishes_separate_and_nested_squares() {
    let a = square(0.0, 0.0, 2.0);
    let b = square(10.0, 0.0, 2.0);
    let c = square(0.5, 0.5, 0.5);
    assert!(!polys_overlap(&a, &b));
    assert!(polys_overlap(&a, &c));
}

#[test]
fn visibility_route_bends_around_an_obstacle() {
    // One square obstacle sitting between the two endpoints.
    let obstacle = square(0.0, 0.0, 2.0);
    let mut vg = TangentVisibilityGraph::new(vec![obstacle]);
    let exclude_none = vg.polys.len();
    let start = vg.add_point(pt(-10.0, 0.0), exclude_none);
    let goal = vg.add_point(pt(10.0, 0.0), exclude_none);
    vg.add_edge_if_visible(start, goal, exclude_none, exclude_none);

    let calc = Calculator::new(
        vg.vertices.len(),
        vg.edges
            .iter()
            .map(|e| (e.source, e.target, vg.edge_length(e))),
    );
    let path = calc.path_from_node_to_node(start, goal);
    assert!(path.len() > 1, "route should detour via tangent vertices");
    for &vi in &path {
        let p = vg.vertices[vi].p;
        assert!(
            p.x.abs() >= 2.0 - 1e-9 || p.y.abs() >= 2.0 - 1e-9,
            "route vertex ({}, {}) is inside the obstacle",
            p.x,
            p.y
        );
    }
}

#[test]
fn unobstructed_endpoints_connect_directly() {
    let obstacle = square(0.0, 10.0, 1.0);
    let mut vg = TangentVisibilityGraph::new(vec![obstacle]);
    let exclude_none = vg.polys.len();
    let start = vg.add_point(pt(-5.0, 0.0), exclude_none);
    let goal = vg.add_point(pt(5.0, 0.0), exclude_none);
    let before = vg.edges.len();
    vg.add_edge_if_visible(start, goal, exclude_none, exclude_none);
    assert_eq!(vg.edges.len(), before + 1);
}
