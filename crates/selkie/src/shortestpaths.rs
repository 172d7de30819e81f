//! All-pairs and single-source shortest paths over an undirected weighted
//! graph, plus the turn-cost path variant used by the grid router.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
struct Neighbour {
    id: usize,
    distance: f64,
}

/// Heap entry ordered by smallest distance first. Stale entries are skipped on
/// pop rather than decrease-keyed in place.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueEntry {
    d: f64,
    node: usize,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.d.total_cmp(&self.d)
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distance oracle over a fixed topology; edge endpoints are node indices.
#[derive(Debug, Clone)]
pub struct Calculator {
    n: usize,
    neighbours: Vec<Vec<Neighbour>>,
}

impl Calculator {
    pub fn new(n: usize, edges: impl IntoIterator<Item = (usize, usize, f64)>) -> Self {
        let mut neighbours: Vec<Vec<Neighbour>> = vec![Vec::new(); n];
        for (u, v, distance) in edges {
            neighbours[u].push(Neighbour { id: v, distance });
            neighbours[v].push(Neighbour { id: u, distance });
        }
        Self { n, neighbours }
    }

    /// Dense all-pairs distance matrix; unreachable pairs are infinite.
    pub fn distance_matrix(&self) -> Vec<Vec<f64>> {
        (0..self.n).map(|u| self.dijkstra(u)).collect()
    }

    pub fn distances_from_node(&self, start: usize) -> Vec<f64> {
        self.dijkstra(start)
    }

    /// Node sequence from just before `end` back to `start` (the target itself
    /// is not included). Empty when no path exists.
    pub fn path_from_node_to_node(&self, start: usize, end: usize) -> Vec<usize> {
        let mut d = vec![f64::INFINITY; self.n];
        let mut prev: Vec<Option<usize>> = vec![None; self.n];
        let mut done = vec![false; self.n];
        let mut q = BinaryHeap::new();
        d[start] = 0.0;
        q.push(QueueEntry { d: 0.0, node: start });
        while let Some(QueueEntry { d: du, node: u }) = q.pop() {
            if done[u] {
                continue;
            }
            done[u] = true;
            if u == end {
                let mut path = Vec::new();
                let mut v = u;
                while let Some(p) = prev[v] {
                    path.push(p);
                    v = p;
                }
                return path;
            }
            for nb in &self.neighbours[u] {
                let t = du + nb.distance;
                if t < d[nb.id] {
                    d[nb.id] = t;
                    prev[nb.id] = Some(u);
                    q.push(QueueEntry { d: t, node: nb.id });
                }
            }
        }
        Vec::new()
    }

    /// Shortest path where continuing through a node costs extra:
    /// `prev_cost(prev, via, next)` is added for every traversed triple. The
    /// search state is (node, incoming edge), so a node may be expanded along
    /// several approaches. Returns the path like `path_from_node_to_node`.
    pub fn path_from_node_to_node_with_prev_cost(
        &self,
        start: usize,
        end: usize,
        prev_cost: impl Fn(usize, usize, usize) -> f64,
    ) -> Vec<usize> {
        // Search-tree arena: (node, parent entry, accumulated cost).
        let mut tree: Vec<(usize, Option<usize>, f64)> = vec![(start, None, 0.0)];
        let mut best_from: FxHashMap<(usize, usize), f64> = FxHashMap::default();
        let mut q: BinaryHeap<(std::cmp::Reverse<OrdF64>, usize)> = BinaryHeap::new();
        q.push((std::cmp::Reverse(OrdF64(0.0)), 0));
        let mut last = 0;
        while let Some((_, qi)) = q.pop() {
            let (u, parent, du) = tree[qi];
            last = qi;
            if u == end {
                break;
            }
            for nb in &self.neighbours[u] {
                let v = nb.id;
                if let Some(p) = parent {
                    if tree[p].0 == v {
                        continue;
                    }
                }
                let cc = match parent {
                    Some(p) => prev_cost(tree[p].0, u, v),
                    None => 0.0,
                };
                let t = du + nb.distance + cc;
                match best_from.get(&(v, u)) {
                    Some(&seen) if seen <= du => continue,
                    _ => {}
                }
                best_from.insert((v, u), t);
                let entry = tree.len();
                tree.push((v, Some(qi), t));
                q.push((std::cmp::Reverse(OrdF64(t)), entry));
            }
        }
        let mut path = Vec::new();
        let mut qi = last;
        while let Some(p) = tree[qi].1 {
            path.push(tree[p].0);
            qi = p;
        }
        path
    }

    fn dijkstra(&self, start: usize) -> Vec<f64> {
        let mut d = vec![f64::INFINITY; self.n];
        let mut done = vec![false; self.n];
        let mut q = BinaryHeap::new();
        d[start] = 0.0;
        q.push(QueueEntry { d: 0.0, node: start });
        while let Some(QueueEntry { d: du, node: u }) = q.pop() {
            if done[u] {
                continue;
            }
            done[u] = true;
            for nb in &self.neighbours[u] {
                let t = du + nb.distance;
                if t < d[nb.id] {
                    d[nb.id] = t;
                    q.push(QueueEntry { d: t, node: nb.id });
                }
            }
        }
        d
    }
}

/// Total-order wrapper so costs can key a `BinaryHeap`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
