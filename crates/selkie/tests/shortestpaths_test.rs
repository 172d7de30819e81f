use selkie::shortestpaths::Calculator;

#[test]
fn distance_matrix_over_a_path_graph() {
    let calc = Calculator::new(3, [(0, 1, 1.0), (1, 2, 1.0)]);
    let d = calc.distance_matrix();
    for (i, row) in d.iter().enumerate() {
        assert_eq!(row[i], 0.0);
        for (j, &v) in row.iter().enumerate() {
            assert_eq!(v, d[j][i]);
        }
    }
    assert_eq!(d[0][1], 1.0);
    assert_eq!(d[0][2], 2.0);
}

#[test]
fn disconnected_nodes_are_infinitely_far() {
    let calc = Calculator::new(4, [(0, 1, 1.0), (2, 3, 1.0)]);
    let d = calc.distance_matrix();
    assert!(d[0][2].is_infinite());
    assert!(d[1][3].is_infinite());
    assert_eq!(d[2][3], 1.0);
}

#[test]
fn edge_weights_are_respected() {
    let calc = Calculator::new(3, [(0, 1, 5.0), (1, 2, 0.5), (0, 2, 10.0)]);
    let d = calc.distances_from_node(0);
    assert_eq!(d[2], 5.5);
}

#[test]
fn path_excludes_the_target_and_ends_at_the_start() {
    // Direct edge 0-3 is more expensive than the detour through 1.
    let calc = Calculator::new(4, [(0, 1, 1.0), (1, 3, 1.0), (0, 3, 10.0)]);
    let path = calc.path_from_node_to_node(0, 3);
    assert_eq!(path, vec![1, 0]);
}

#[test]
fn no_path_yields_an_empty_result() {
    let calc = Calculator::new(3, [(0, 1, 1.0)]);
    assert!(calc.path_from_node_to_node(0, 2).is_empty());
}

#[test]
fn prev_cost_steers_the_route_away_from_penalised_nodes() {
    // Two routes from 0 to 2: through 1 (length 2) or through 3 (length 3).
    let edges = [(0, 1, 1.0), (1, 2, 1.0), (0, 3, 1.5), (3, 2, 1.5)];
    let calc = Calculator::new(4, edges);

    let free = calc.path_from_node_to_node_with_prev_cost(0, 2, |_, _, _| 0.0);
    assert_eq!(free, vec![1, 0]);

    let tolled =
        calc.path_from_node_to_node_with_prev_cost(0, 2, |_, b, _| if b == 1 { 10.0 } else { 0.0 });
    assert_eq!(tolled, vec![3, 0]);
}
