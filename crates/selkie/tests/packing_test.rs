use selkie::model::{Link, Node};
use selkie::packing::{apply_packing, separate_graphs};

fn component_box(nodes: &[Node], ids: &[usize], size: f64) -> (f64, f64, f64, f64) {
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    for &i in ids {
        min_x = min_x.min(nodes[i].x - size / 2.0);
        max_x = max_x.max(nodes[i].x + size / 2.0);
        min_y = min_y.min(nodes[i].y - size / 2.0);
        max_y = max_y.max(nodes[i].y + size / 2.0);
    }
    (min_x, max_x, min_y, max_y)
}

fn boxes_disjoint(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> bool {
    a.1 <= b.0 || b.1 <= a.0 || a.3 <= b.2 || b.3 <= a.2
}

#[test]
fn separate_graphs_finds_connected_components() {
    let links = vec![Link::new(0, 1), Link::new(1, 2), Link::new(3, 4)];
    let mut components = separate_graphs(6, &links);
    for c in components.iter_mut() {
        c.sort_unstable();
    }
    components.sort();
    assert_eq!(components, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
}

#[test]
fn packed_components_do_not_overlap() {
    // Two separate triangles laid out on top of each other.
    let mut nodes: Vec<Node> = (0..6)
        .map(|i| {
            let a = (i % 3) as f64;
            Node::new(a * 15.0, a * 10.0)
        })
        .collect();
    let links = vec![
        Link::new(0, 1),
        Link::new(1, 2),
        Link::new(2, 0),
        Link::new(3, 4),
        Link::new(4, 5),
        Link::new(5, 3),
    ];
    let components = separate_graphs(6, &links);
    assert_eq!(components.len(), 2);
    apply_packing(&components, &mut nodes, 400.0, 400.0, 10.0, 1.0);

    let a = component_box(&nodes, &components[0], 10.0);
    let b = component_box(&nodes, &components[1], 10.0);
    assert!(
        boxes_disjoint(a, b),
        "component boxes overlap: {a:?} vs {b:?}"
    );
}

#[test]
fn packing_preserves_relative_positions_within_a_component() {
    let mut nodes = vec![Node::new(0.0, 0.0), Node::new(30.0, 5.0), Node::new(100.0, 0.0)];
    let links = vec![Link::new(0, 1), Link::new(2, 2)];
    let components = separate_graphs(3, &links);
    apply_packing(&components, &mut nodes, 200.0, 200.0, 10.0, 1.0);

    let dx = nodes[1].x - nodes[0].x;
    let dy = nodes[1].y - nodes[0].y;
    assert!((dx - 30.0).abs() < 1e-9);
    assert!((dy - 5.0).abs() < 1e-9);
}

#[test]
fn single_component_is_centred_on_the_canvas() {
    let mut nodes = vec![Node::new(1000.0, 1000.0), Node::new(1010.0, 1000.0)];
    let links = vec![Link::new(0, 1)];
    let components = separate_graphs(2, &links);
    apply_packing(&components, &mut nodes, 100.0, 100.0, 10.0, 1.0);
    let cx = (nodes[0].x + nodes[1].x) / 2.0;
    let cy = (nodes[0].y + nodes[1].y) / 2.0;
    assert!((cx - 50.0).abs() < 30.0, "centre x drifted to {cx}");
    assert!((cy - 50.0).abs() < 30.0, "centre y drifted to {cy}");
}
