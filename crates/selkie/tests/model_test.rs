use selkie::{Axis, ConstraintSpec, Layout, LayoutOptions, Link, Node};

#[test]
fn graph_deserializes_from_json_and_lays_out() {
    let nodes: Vec<Node> = serde_json::from_str(
        r#"[
            {"x": 0, "y": 0},
            {"x": 0, "y": 0, "width": 20, "height": 10},
            {"x": 0, "y": 0, "fixed": true, "px": 5, "py": 5}
        ]"#,
    )
    .unwrap();
    let links: Vec<Link> = serde_json::from_str(
        r#"[
            {"source": 0, "target": 1},
            {"source": 1, "target": 2, "length": 30}
        ]"#,
    )
    .unwrap();

    assert_eq!(nodes[1].width, Some(20.0));
    assert!(nodes[2].fixed);
    assert_eq!(links[1].length, Some(30.0));

    let mut layout = Layout::new(nodes, links, LayoutOptions::default());
    layout.run(200).unwrap();
    for v in layout.nodes() {
        assert!(v.x.is_finite() && v.y.is_finite());
    }
}

#[test]
fn constraint_specs_use_the_tagged_form() {
    let specs: Vec<ConstraintSpec> = serde_json::from_str(
        r#"[
            {"type": "separation", "axis": "x", "left": 0, "right": 1, "gap": 25},
            {"type": "alignment", "axis": "y",
             "offsets": [{"node": 0}, {"node": 1, "offset": 10}]}
        ]"#,
    )
    .unwrap();

    match &specs[0] {
        ConstraintSpec::Separation {
            axis,
            left,
            right,
            gap,
            equality,
        } => {
            assert_eq!(*axis, Axis::X);
            assert_eq!((*left, *right), (0, 1));
            assert_eq!(*gap, 25.0);
            assert!(!equality);
        }
        other => panic!("expected a separation constraint, got {other:?}"),
    }
    match &specs[1] {
        ConstraintSpec::Alignment { axis, offsets } => {
            assert_eq!(*axis, Axis::Y);
            assert_eq!(offsets[1].offset, 10.0);
        }
        other => panic!("expected an alignment constraint, got {other:?}"),
    }
}

#[test]
fn options_accept_camel_case_keys_and_fill_defaults() {
    let options: LayoutOptions = serde_json::from_str(
        r#"{"linkDistance": 60, "avoidOverlaps": true, "size": [800, 600]}"#,
    )
    .unwrap();

    assert_eq!(options.link_distance, 60.0);
    assert!(options.avoid_overlaps);
    assert_eq!(options.size, [800.0, 600.0]);
    assert_eq!(
        options.convergence_threshold,
        LayoutOptions::default().convergence_threshold
    );
    assert!(options.handle_disconnected);
}
