//! Power-graph compression: greedy merging of modules that share neighbours,
//! producing a group hierarchy and a reduced "power edge" list.

use indexmap::IndexSet;

use crate::model::{GroupSpec, Link};

/// A module is a node or a merged cluster of modules. Adjacency is kept as
/// explicit id sets, updated in place as merges rewire the module graph.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: usize,
    pub outgoing: IndexSet<usize>,
    pub incoming: IndexSet<usize>,
    pub children: Vec<usize>,
    gid: Option<usize>,
}

impl Module {
    fn new(id: usize) -> Self {
        Self {
            id,
            outgoing: IndexSet::new(),
            incoming: IndexSet::new(),
            children: Vec::new(),
            gid: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_island(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

/// Reference to either an original node or a synthetic group produced by
/// compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRef {
    Node(usize),
    Group(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerEdge {
    pub source: PowerRef,
    pub target: PowerRef,
}

#[derive(Debug, Clone)]
pub struct PowerGraph {
    pub groups: Vec<GroupSpec>,
    pub power_edges: Vec<PowerEdge>,
}

/// The evolving module graph during compression.
#[derive(Debug, Clone)]
pub struct Configuration {
    modules: Vec<Module>,
    roots: IndexSet<usize>,
    /// Current total edge count.
    r: usize,
}

impl Configuration {
    pub fn new(n: usize, links: &[Link]) -> Self {
        let mut modules: Vec<Module> = (0..n).map(Module::new).collect();
        let roots: IndexSet<usize> = (0..n).collect();
        for l in links {
            modules[l.source].outgoing.insert(l.target);
            modules[l.target].incoming.insert(l.source);
        }
        Self {
            modules,
            roots,
            r: links.len(),
        }
    }

    /// Edge count after merging `a` and `b`: each shared neighbour collapses
    /// two edges into one.
    fn n_edges(&self, a: usize, b: usize) -> usize {
        let ma = &self.modules[a];
        let mb = &self.modules[b];
        self.r
            - ma.outgoing.intersection(&mb.outgoing).count()
            - ma.incoming.intersection(&mb.incoming).count()
    }

    fn merge(&mut self, a: usize, b: usize) -> usize {
        let id = self.modules.len();
        let shared_in: IndexSet<usize> = self.modules[a]
            .incoming
            .intersection(&self.modules[b].incoming)
            .copied()
            .collect();
        let shared_out: IndexSet<usize> = self.modules[a]
            .outgoing
            .intersection(&self.modules[b].outgoing)
            .copied()
            .collect();
        // Rewire shared neighbours to the merged module.
        for &u in &shared_out {
            let m = &mut self.modules[u];
            m.incoming.insert(id);
            m.incoming.swap_remove(&a);
            m.incoming.swap_remove(&b);
        }
        for &u in &shared_out {
            self.modules[a].outgoing.swap_remove(&u);
            self.modules[b].outgoing.swap_remove(&u);
        }
        for &u in &shared_in {
            let m = &mut self.modules[u];
            m.outgoing.insert(id);
            m.outgoing.swap_remove(&a);
            m.outgoing.swap_remove(&b);
        }
        for &u in &shared_in {
            self.modules[a].incoming.swap_remove(&u);
            self.modules[b].incoming.swap_remove(&u);
        }
        self.r -= shared_in.len() + shared_out.len();
        self.modules.push(Module {
            id,
            outgoing: shared_out,
            incoming: shared_in,
            children: vec![a, b],
            gid: None,
        });
        self.roots.swap_remove(&a);
        self.roots.swap_remove(&b);
        self.roots.insert(id);
        id
    }

    /// Merge the root pair whose merge leaves the fewest edges; false once no
    /// merge would reduce the total.
    pub fn greedy_merge(&mut self) -> bool {
        let mut best: Option<(usize, usize, usize)> = None;
        let roots: Vec<usize> = self.roots.iter().copied().collect();
        for i in 0..roots.len() {
            for j in i + 1..roots.len() {
                let n = self.n_edges(roots[i], roots[j]);
                if best.is_none_or(|(bn, _, _)| n < bn) {
                    best = Some((n, roots[i], roots[j]));
                }
            }
        }
        match best {
            Some((n, a, b)) if n < self.r => {
                self.merge(a, b);
                true
            }
            _ => false,
        }
    }

    /// All remaining edges of the module graph, over every module (merged
    /// modules carry the collapsed edges of their children).
    fn all_edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().copied().collect();
        while let Some(m) = stack.pop() {
            for &t in &self.modules[m].outgoing {
                edges.push((m, t));
            }
            stack.extend(&self.modules[m].children);
        }
        edges
    }

    /// Extract the nested group structure and the power edges referencing
    /// nodes or groups.
    pub fn get_group_hierarchy(&mut self) -> PowerGraph {
        let mut groups: Vec<GroupSpec> = Vec::new();
        let roots: Vec<usize> = self.roots.iter().copied().collect();
        for &m in &roots {
            self.extract_groups(m, None, &mut groups);
        }
        let power_edges = self
            .all_edges()
            .into_iter()
            .map(|(s, t)| PowerEdge {
                source: self.power_ref(s),
                target: self.power_ref(t),
            })
            .collect();
        PowerGraph {
            groups,
            power_edges,
        }
    }

    fn power_ref(&self, m: usize) -> PowerRef {
        match self.modules[m].gid {
            Some(g) => PowerRef::Group(g),
            None => PowerRef::Node(m),
        }
    }

    fn extract_groups(&mut self, m: usize, parent: Option<usize>, groups: &mut Vec<GroupSpec>) {
        if self.modules[m].is_leaf() {
            if let Some(p) = parent {
                groups[p].leaves.push(self.modules[m].id);
            }
            return;
        }
        let into = if self.modules[m].is_island() {
            // Island clusters dissolve into their parent.
            parent
        } else {
            let gid = groups.len();
            self.modules[m].gid = Some(gid);
            groups.push(GroupSpec::default());
            if let Some(p) = parent {
                groups[p].groups.push(gid);
            }
            Some(gid)
        };
        let children = self.modules[m].children.clone();
        for c in children {
            self.extract_groups(c, into, groups);
        }
    }
}

/// Compress the given link set: repeatedly merge the best module pair, then
/// read off groups and power edges.
pub fn get_groups(n: usize, links: &[Link]) -> PowerGraph {
    let mut config = Configuration::new(n, links);
    while config.greedy_merge() {}
    config.get_group_hierarchy()
}
