use selkie::model::Link;
use selkie::powergraph::{PowerEdge, PowerRef, get_groups};

fn links(pairs: &[(usize, usize)]) -> Vec<Link> {
    pairs.iter().map(|&(s, t)| Link::new(s, t)).collect()
}

#[test]
fn complete_bipartite_graph_compresses_to_one_power_edge() {
    // K2,2: both sources share both targets, so each side merges into a
    // group and the four links collapse into one.
    let ls = links(&[(0, 2), (0, 3), (1, 2), (1, 3)]);
    let pg = get_groups(4, &ls);

    assert_eq!(pg.groups.len(), 2);
    let mut leaf_sets: Vec<Vec<usize>> = pg
        .groups
        .iter()
        .map(|g| {
            let mut l = g.leaves.clone();
            l.sort_unstable();
            l
        })
        .collect();
    leaf_sets.sort();
    assert_eq!(leaf_sets, vec![vec![0, 1], vec![2, 3]]);

    assert_eq!(pg.power_edges.len(), 1);
    let PowerEdge { source, target } = pg.power_edges[0];
    assert!(matches!(source, PowerRef::Group(_)));
    assert!(matches!(target, PowerRef::Group(_)));
    assert_ne!(source, target);
}

#[test]
fn shared_target_merges_the_sources() {
    let ls = links(&[(0, 2), (1, 2)]);
    let pg = get_groups(3, &ls);

    assert_eq!(pg.groups.len(), 1);
    let mut leaves = pg.groups[0].leaves.clone();
    leaves.sort_unstable();
    assert_eq!(leaves, vec![0, 1]);

    assert_eq!(pg.power_edges.len(), 1);
    assert_eq!(
        pg.power_edges[0],
        PowerEdge {
            source: PowerRef::Group(0),
            target: PowerRef::Node(2),
        }
    );
}

#[test]
fn graph_without_shared_neighbourhoods_is_left_alone() {
    let ls = links(&[(0, 1), (1, 2)]);
    let pg = get_groups(3, &ls);
    assert!(pg.groups.is_empty());
    assert_eq!(pg.power_edges.len(), 2);
    for e in &pg.power_edges {
        assert!(matches!(e.source, PowerRef::Node(_)));
        assert!(matches!(e.target, PowerRef::Node(_)));
    }
}

#[test]
fn nested_merges_produce_a_hierarchy() {
    // Three sources all pointing at the same pair of sinks.
    let ls = links(&[(0, 3), (0, 4), (1, 3), (1, 4), (2, 3), (2, 4)]);
    let pg = get_groups(5, &ls);

    // All sources end up grouped together (possibly nested), the sinks too,
    // and a single power edge joins the two sides.
    assert_eq!(pg.power_edges.len(), 1);
    let mut grouped: Vec<usize> = pg.groups.iter().flat_map(|g| g.leaves.clone()).collect();
    grouped.sort_unstable();
    assert_eq!(grouped, vec![0, 1, 2, 3, 4]);
}
