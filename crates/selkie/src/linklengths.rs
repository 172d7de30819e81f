//! Ideal-length heuristics from local topology, and directed-flow constraint
//! generation over the link set's strongly connected components.

use rustc_hash::FxHashSet;

use crate::model::{Axis, ConstraintSpec, Link};

fn neighbour_sets(n: usize, links: &[Link]) -> Vec<FxHashSet<usize>> {
    let mut sets: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); n];
    for l in links {
        sets[l.source].insert(l.target);
        sets[l.target].insert(l.source);
    }
    sets
}

fn union_count(a: &FxHashSet<usize>, b: &FxHashSet<usize>) -> usize {
    a.union(b).count()
}

fn intersection_count(a: &FxHashSet<usize>, b: &FxHashSet<usize>) -> usize {
    a.intersection(b).count()
}

fn compute_link_lengths(
    n: usize,
    links: &mut [Link],
    base_length: f64,
    w: f64,
    similarity: impl Fn(&FxHashSet<usize>, &FxHashSet<usize>) -> f64,
) {
    let sets = neighbour_sets(n, links);
    for l in links {
        let s = similarity(&sets[l.source], &sets[l.target]);
        l.length = Some(base_length * (1.0 + w * s));
    }
}

/// Set each link's ideal length from the square root of the symmetric
/// difference of its endpoints' neighbour sets: links inside dense clusters
/// stay short, bridges stretch.
pub fn symmetric_diff_link_lengths(n: usize, links: &mut [Link], base_length: f64, w: f64) {
    compute_link_lengths(n, links, base_length, w, |a, b| {
        ((union_count(a, b) - intersection_count(a, b)) as f64).sqrt()
    });
}

/// Set each link's ideal length from the Jaccard similarity of its endpoints'
/// neighbour sets. Endpoints with at most one neighbour contribute nothing.
pub fn jaccard_link_lengths(n: usize, links: &mut [Link], base_length: f64, w: f64) {
    compute_link_lengths(n, links, base_length, w, |a, b| {
        if a.len().min(b.len()) < 2 {
            0.0
        } else {
            intersection_count(a, b) as f64 / union_count(a, b) as f64
        }
    });
}

/// Tarjan's algorithm over the directed link set.
pub fn strongly_connected_components(n: usize, links: &[Link]) -> Vec<Vec<usize>> {
    struct State<'a> {
        out: Vec<Vec<usize>>,
        index: Vec<i64>,
        lowlink: Vec<i64>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        counter: i64,
        components: &'a mut Vec<Vec<usize>>,
    }

    fn strong_connect(s: &mut State, v: usize) {
        s.index[v] = s.counter;
        s.lowlink[v] = s.counter;
        s.on_stack[v] = true;
        s.counter += 1;
        s.stack.push(v);
        for i in 0..s.out[v].len() {
            let w = s.out[v][i];
            if s.index[w] < 0 {
                strong_connect(s, w);
                s.lowlink[v] = s.lowlink[v].min(s.lowlink[w]);
            } else if s.on_stack[w] {
                s.lowlink[v] = s.lowlink[v].min(s.lowlink[w]);
            }
        }
        if s.lowlink[v] == s.index[v] {
            let mut component = Vec::new();
            while let Some(w) = s.stack.pop() {
                s.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            s.components.push(component);
        }
    }

    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for l in links {
        out[l.source].push(l.target);
    }
    let mut components = Vec::new();
    let mut state = State {
        out,
        index: vec![-1; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        counter: 0,
        components: &mut components,
    };
    for v in 0..n {
        if state.index[v] < 0 {
            strong_connect(&mut state, v);
        }
    }
    components
}

/// Separation constraints imposing a directed flow on the given axis. Links
/// inside a cycle (a multi-node strongly connected component) are skipped, so
/// a feasible ordering always exists.
pub fn generate_directed_edge_constraints(
    n: usize,
    links: &[Link],
    axis: Axis,
    min_separation: f64,
) -> Vec<ConstraintSpec> {
    let components = strongly_connected_components(n, links);
    let mut component_of = vec![usize::MAX; n];
    for (ci, component) in components.iter().enumerate() {
        if component.len() > 1 {
            for &v in component {
                component_of[v] = ci;
            }
        }
    }
    let mut specs = Vec::new();
    for l in links {
        let cs = component_of[l.source];
        let ct = component_of[l.target];
        if cs != usize::MAX && cs == ct {
            continue;
        }
        specs.push(ConstraintSpec::Separation {
            axis,
            left: l.source,
            right: l.target,
            gap: min_separation,
            equality: false,
        });
    }
    specs
}
