//! Strongly-connected-component decomposition.
//!
//! A cycle never crosses an SCC boundary, so the minimum-mean-cycle search in
//! [`crate::karp`] runs once per component, restricted to the arcs that stay
//! inside it. [`TarjanScc`] is the memory-efficient variant of Tarjan's
//! algorithm described by David J. Pierce, extended to also hand back the
//! same-component out-arc lists the engine needs.

use core::num::NonZeroUsize;

use crate::visit::{EdgeRef, IntoEdges, IntoNeighbors, IntoNodeIdentifiers, NodeIndexable};

#[derive(Copy, Clone, Debug)]
struct NodeData {
    rootindex: Option<NonZeroUsize>,
}

/// Reusable scratch state for [`TarjanScc::run`], so repeated searches over
/// graphs of similar size don't reallocate.
#[derive(Debug, Default)]
pub struct TarjanScc<N> {
    index: usize,
    componentcount: usize,
    nodes: Vec<NodeData>,
    stack: Vec<N>,
}

impl<N> TarjanScc<N> {
    pub fn new() -> Self {
        TarjanScc {
            index: 1,
            componentcount: usize::MAX,
            nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Calls `f` once per strongly connected component, in postorder
    /// (reverse topological order of the condensation). Node order within a
    /// component is arbitrary.
    pub fn run<G, F>(&mut self, g: G, mut f: F)
    where
        G: IntoNodeIdentifiers<NodeId = N> + IntoNeighbors<NodeId = N> + NodeIndexable<NodeId = N>,
        F: FnMut(&[N]),
        N: Copy + PartialEq,
    {
        self.nodes.clear();
        self.nodes.resize(g.node_bound(), NodeData { rootindex: None });
        self.index = 1;
        self.componentcount = usize::MAX;

        for n in g.node_identifiers() {
            if self.nodes[g.to_index(n)].rootindex.is_none() {
                self.visit(n, g, &mut f);
            }
        }

        debug_assert!(self.stack.is_empty());
    }

    fn visit<G, F>(&mut self, v: G::NodeId, g: G, f: &mut F)
    where
        G: IntoNeighbors<NodeId = N> + NodeIndexable<NodeId = N>,
        F: FnMut(&[N]),
        N: Copy + PartialEq,
    {
        macro_rules! node {
            ($node:expr) => {
                self.nodes[g.to_index($node)]
            };
        }

        let v_index = self.index;
        node!(v).rootindex = NonZeroUsize::new(v_index);
        self.index += 1;
        let mut v_is_local_root = true;

        for w in g.neighbors(v) {
            if node!(w).rootindex.is_none() {
                self.visit(w, g, f);
            }
            if node!(w).rootindex < node!(v).rootindex {
                node!(v).rootindex = node!(w).rootindex;
                v_is_local_root = false;
            }
        }

        if v_is_local_root {
            let mut indexadjustment = 1;
            let c = NonZeroUsize::new(self.componentcount);
            let nodes = &mut self.nodes;
            let start = self
                .stack
                .iter()
                .rposition(|&w| {
                    if nodes[g.to_index(v)].rootindex > nodes[g.to_index(w)].rootindex {
                        true
                    } else {
                        nodes[g.to_index(w)].rootindex = c;
                        indexadjustment += 1;
                        false
                    }
                })
                .map_or(0, |x| x + 1);
            nodes[g.to_index(v)].rootindex = c;
            self.stack.push(v);
            f(&self.stack[start..]);
            self.stack.truncate(start);
            self.index -= indexadjustment;
            self.componentcount -= 1;
        } else {
            self.stack.push(v);
        }
    }
}

/// The partition of a graph into strongly connected components, together
/// with the same-component out-arcs of every node — the only arcs that can
/// ever lie on a cycle through that node.
pub struct Components<G: IntoEdges> {
    /// `comp[g.to_index(node)]` is the component id of `node`, in `0..count`.
    pub comp: Vec<usize>,
    pub count: usize,
    /// Nodes grouped by component id.
    pub nodes: Vec<Vec<G::NodeId>>,
    /// `out_arcs[g.to_index(node)]` lists node's out-arcs whose target lies
    /// in the same component as `node`.
    pub out_arcs: Vec<Vec<G::EdgeRef>>,
}

/// Runs the SCC decomposition and restricts every node's out-arcs to its own
/// component, per §4.2 of the design: this is what lets the DP engine ignore
/// arcs that can never lie on a cycle.
pub fn decompose<G>(g: G) -> Components<G>
where
    G: IntoNodeIdentifiers + IntoNeighbors + IntoEdges + NodeIndexable,
    G::NodeId: Copy + PartialEq,
{
    let mut tarjan = TarjanScc::new();
    let mut sccs: Vec<Vec<G::NodeId>> = Vec::new();
    tarjan.run(g, |scc| sccs.push(scc.to_vec()));

    let count = sccs.len();
    log::trace!("scc: decomposed into {} component(s)", count);
    let mut comp = vec![0usize; g.node_bound()];
    for (id, nodes) in sccs.iter().enumerate() {
        for &n in nodes {
            comp[g.to_index(n)] = id;
        }
    }

    let mut out_arcs: Vec<Vec<G::EdgeRef>> = (0..g.node_bound()).map(|_| Vec::new()).collect();
    for n in g.node_identifiers() {
        let ni = g.to_index(n);
        let same_component = g
            .edges(n)
            .filter(|e| comp[g.to_index(e.target())] == comp[ni])
            .collect();
        out_arcs[ni] = same_component;
    }

    Components {
        comp,
        count,
        nodes: sccs,
        out_arcs,
    }
}
