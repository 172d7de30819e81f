use selkie::linklengths::{
    generate_directed_edge_constraints, jaccard_link_lengths, strongly_connected_components,
    symmetric_diff_link_lengths,
};
use selkie::model::{Axis, ConstraintSpec, Link};

fn links(pairs: &[(usize, usize)]) -> Vec<Link> {
    pairs.iter().map(|&(s, t)| Link::new(s, t)).collect()
}

#[test]
fn jaccard_lengths_shorten_links_outside_clusters() {
    // Triangle 0-1-2 with a pendant node 3 hanging off 0.
    let mut ls = links(&[(0, 1), (1, 2), (2, 0), (0, 3)]);
    jaccard_link_lengths(4, &mut ls, 1.0, 1.0);

    // Neighbour sets: 0 -> {1,2,3}, 1 -> {0,2}; intersection {2}, union 4.
    let l01 = ls[0].length.unwrap();
    assert!((l01 - 1.25).abs() < 1e-12);

    // The pendant's only neighbour is 0, so its similarity is zero.
    assert_eq!(ls[3].length.unwrap(), 1.0);
}

#[test]
fn symmetric_diff_lengths_stretch_bridges() {
    // Two triangles bridged by the link 2-3.
    let mut ls = links(&[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]);
    symmetric_diff_link_lengths(6, &mut ls, 1.0, 1.0);
    let bridge = ls[6].length.unwrap();
    let internal = ls[0].length.unwrap();
    assert!(
        bridge > internal,
        "bridge {bridge} should exceed internal {internal}"
    );
}

#[test]
fn tarjan_finds_the_cycle_and_the_stragglers() {
    let ls = links(&[(0, 1), (1, 2), (2, 0), (2, 3)]);
    let mut components = strongly_connected_components(4, &ls);
    for c in components.iter_mut() {
        c.sort_unstable();
    }
    components.sort();
    assert!(components.contains(&vec![0, 1, 2]));
    assert!(components.contains(&vec![3]));
    assert_eq!(components.len(), 2);
}

#[test]
fn directed_constraints_skip_links_inside_cycles() {
    let ls = links(&[(0, 1), (1, 2), (2, 0), (2, 3)]);
    let specs = generate_directed_edge_constraints(4, &ls, Axis::Y, 10.0);
    assert_eq!(specs.len(), 1);
    match &specs[0] {
        ConstraintSpec::Separation {
            axis,
            left,
            right,
            gap,
            equality,
        } => {
            assert_eq!(*axis, Axis::Y);
            assert_eq!((*left, *right), (2, 3));
            assert_eq!(*gap, 10.0);
            assert!(!equality);
        }
        other => panic!("unexpected constraint {other:?}"),
    }
}

#[test]
fn acyclic_graphs_constrain_every_link() {
    let ls = links(&[(0, 1), (1, 2), (0, 2)]);
    let specs = generate_directed_edge_constraints(3, &ls, Axis::X, 5.0);
    assert_eq!(specs.len(), 3);
}
