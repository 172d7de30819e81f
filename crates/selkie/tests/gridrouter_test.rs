use selkie::gridrouter::{GridNode, GridRouter, make_segments};
use selkie_vpsc::{Point, Rectangle};

fn leaf(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> GridNode {
    GridNode {
        bounds: Rectangle::new(min_x, max_x, min_y, max_y),
        children: Vec::new(),
    }
}

fn assert_orthogonal(route: &[Point]) {
    for w in route.windows(2) {
        let dx = (w[0].x - w[1].x).abs();
        let dy = (w[0].y - w[1].y).abs();
        assert!(
            dx < 0.1 || dy < 0.1,
            "diagonal hop from ({}, {}) to ({}, {})",
            w[0].x,
            w[0].y,
            w[1].x,
            w[1].y
        );
    }
}

/// Three nodes in a row with a fourth below the middle one, so the grid has
/// two rows and three columns.
fn row_with_blocker() -> GridRouter {
    GridRouter::new(
        vec![
            leaf(0.0, 10.0, 0.0, 10.0),
            leaf(20.0, 30.0, 0.0, 10.0),
            leaf(40.0, 50.0, 0.0, 10.0),
            leaf(20.0, 30.0, 40.0, 50.0),
        ],
        12.0,
    )
}

#[test]
fn route_between_row_neighbours_is_orthogonal() {
    let router = row_with_blocker();
    let route = router.route(0, 1);
    assert!(route.len() >= 2);
    assert_orthogonal(&route);
}

#[test]
fn route_starts_and_ends_at_the_endpoints() {
    let router = row_with_blocker();
    let route = router.route(0, 1);
    let first = route[0];
    let last = route[route.len() - 1];
    assert!((0.0..=10.0).contains(&first.x) && (0.0..=10.0).contains(&first.y));
    assert!((20.0..=30.0).contains(&last.x) && (0.0..=10.0).contains(&last.y));
}

#[test]
fn route_detours_around_a_blocking_sibling() {
    // Node 1 sits directly between 0 and 2 in the same row.
    let router = row_with_blocker();
    let route = router.route(0, 2);
    assert!(route.len() >= 2);
    assert_orthogonal(&route);
    for p in &route {
        let inside = p.x > 20.1 && p.x < 29.9 && p.y > 0.1 && p.y < 9.9;
        assert!(
            !inside,
            "route passes through the obstacle at ({}, {})",
            p.x, p.y
        );
    }
}

#[test]
fn routes_through_a_grid_have_few_bends() {
    // 2x2 grid; the diagonal route needs two bends at most.
    let router = GridRouter::new(
        vec![
            leaf(0.0, 10.0, 0.0, 10.0),
            leaf(40.0, 50.0, 0.0, 10.0),
            leaf(0.0, 10.0, 40.0, 50.0),
            leaf(40.0, 50.0, 40.0, 50.0),
        ],
        12.0,
    );
    let route = router.route(0, 3);
    assert_orthogonal(&route);
    let segments = make_segments(&route);
    assert!(
        segments.len() <= 3,
        "expected at most 3 segments, got {}",
        segments.len()
    );
}

#[test]
fn grouped_children_are_not_obstacles_for_each_other() {
    let router = GridRouter::new(
        vec![
            leaf(0.0, 10.0, 0.0, 10.0),
            leaf(30.0, 40.0, 0.0, 10.0),
            GridNode {
                bounds: Rectangle::new(0.0, 0.0, 0.0, 0.0),
                children: vec![0, 1],
            },
        ],
        10.0,
    );
    let route = router.route(0, 1);
    assert!(route.len() >= 2);
    assert_orthogonal(&route);
}

#[test]
fn identical_routes_are_nudged_apart() {
    let router = GridRouter::new(
        vec![
            leaf(0.0, 10.0, 0.0, 10.0),
            leaf(40.0, 50.0, 0.0, 10.0),
            leaf(0.0, 10.0, 30.0, 40.0),
            leaf(40.0, 50.0, 30.0, 40.0),
        ],
        12.0,
    );
    let routes = router.route_edges(&[(0, 1), (0, 1)], 2.0);
    assert_eq!(routes.len(), 2);
    for route in &routes {
        assert_eq!(route.len(), 1, "straight corridor should stay one segment");
    }
    let y0 = routes[0][0][0].y;
    let y1 = routes[1][0][0].y;
    assert!(
        (y0 - y1).abs() >= 1.9,
        "parallel segments still overlap: y0 {y0}, y1 {y1}"
    );
}

#[test]
fn route_edges_returns_axis_aligned_segments() {
    let router = row_with_blocker();
    let routes = router.route_edges(&[(0, 1), (1, 2), (0, 3)], 2.0);
    assert_eq!(routes.len(), 3);
    for route in &routes {
        assert!(!route.is_empty());
        for seg in route {
            let dx = (seg[0].x - seg[1].x).abs();
            let dy = (seg[0].y - seg[1].y).abs();
            assert!(dx < 0.1 || dy < 0.1);
        }
    }
}

#[test]
fn make_segments_merges_collinear_runs() {
    let path = vec![
        Point { x: 0.0, y: 0.0 },
        Point { x: 5.0, y: 0.0 },
        Point { x: 10.0, y: 0.0 },
        Point { x: 10.0, y: 8.0 },
    ];
    let segments = make_segments(&path);
    assert_eq!(segments.len(), 2);
    assert_eq!((segments[0][0].x, segments[0][1].x), (0.0, 10.0));
    assert_eq!((segments[1][0].y, segments[1][1].y), (0.0, 8.0));
}

#[test]
fn empty_node_set_builds_an_empty_grid() {
    let router = GridRouter::new(Vec::new(), 12.0);
    assert!(router.route_edges(&[], 2.0).is_empty());
}
