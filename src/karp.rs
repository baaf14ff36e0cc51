//! Karp's algorithm for the minimum mean cycle.
//!
//! For each strongly connected component, build a table `D[v][k]` of the
//! shortest walk of exactly `k` arcs from an arbitrary root to `v`, then read
//! off the component's minimum cycle mean from Karp's inner-maximum
//! characterization and cross-multiply candidates against each other to
//! avoid floating-point bias. Reused across the crate the way
//! [`crate::scc::TarjanScc`] is: one long-lived struct,
//! `find_min_mean`/`find_cycle`/`run` as the entry points.

use crate::path::CycleContainer;
use crate::scc;
use crate::tolerance::{Measure, Tolerance};
use crate::visit::{EdgeRef, IntoEdges, IntoNeighbors, IntoNodeIdentifiers, LengthMap, NodeIndexable};

#[derive(Copy, Clone)]
struct PathData<V, R> {
    dist: V,
    pred: Option<R>,
}

impl<V: Measure, R> PathData<V, R> {
    fn infinite() -> Self {
        PathData {
            dist: V::INFINITY,
            pred: None,
        }
    }
}

struct Best<N, V> {
    node: Option<N>,
    length: V,
    size: usize,
}

impl<N, V: Measure> Best<N, V> {
    fn none() -> Self {
        Best {
            node: None,
            length: V::default(),
            size: 1,
        }
    }
}

/// Either an engine-owned container or one borrowed from the caller for the
/// lifetime of a query, per the ownership model in the design notes.
enum ContainerRef<'a, C> {
    Owned(Box<C>),
    Borrowed(&'a mut C),
}

impl<'a, C: Default> ContainerRef<'a, C> {
    fn owned() -> Self {
        ContainerRef::Owned(Box::new(C::default()))
    }
}

impl<'a, C> ContainerRef<'a, C> {
    fn get(&self) -> &C {
        match self {
            ContainerRef::Owned(b) => b,
            ContainerRef::Borrowed(r) => r,
        }
    }

    fn get_mut(&mut self) -> &mut C {
        match self {
            ContainerRef::Owned(b) => b,
            ContainerRef::Borrowed(r) => r,
        }
    }
}

/// Compares `a_len / a_size` against `b_len / b_size` by exact
/// cross-multiplication, never by floating-point division. Used for both
/// the inner maximum (per node, over k) and the outer minimum (over nodes
/// and components) in Karp's characterization — see §4.4.
fn cross_lt<V: Measure>(a_len: V, a_size: usize, b_len: V, b_size: usize) -> bool {
    a_len * V::from_usize(b_size) < b_len * V::from_usize(a_size)
}

/// Karp's algorithm for the directed cycle of minimum mean arc length.
///
/// `G` is the graph capability, `L` the arc-length oracle, `V` the
/// `LargeValue` accumulator, `T` the tolerance policy used during DP
/// relaxation, and `C` the cycle container (defaults to `Vec<G::EdgeId>`).
pub struct Karp<'a, G, L, V, T, C = Vec<<G as crate::visit::GraphBase>::EdgeId>>
where
    G: IntoNodeIdentifiers + IntoNeighbors + IntoEdges + NodeIndexable,
    G::NodeId: Copy + PartialEq,
    L: LengthMap<G::EdgeId, Value = V>,
    V: Measure,
    T: Tolerance<V>,
    C: CycleContainer<G::EdgeId> + Default,
{
    graph: G,
    length: L,
    tolerance: T,
    // data[g.to_index(node)] holds that node's own D[node][0..=n_component]
    // row; rows are cleared (not freed) and resized in place each search, so
    // the allocation is reused across components and across repeated runs.
    data: Vec<Vec<PathData<V, G::EdgeRef>>>,
    best: Best<G::NodeId, V>,
    container: ContainerRef<'a, C>,
}

impl<'a, G, L, V, T, C> Karp<'a, G, L, V, T, C>
where
    G: IntoNodeIdentifiers + IntoNeighbors + IntoEdges + NodeIndexable,
    G::NodeId: Copy + PartialEq,
    L: LengthMap<G::EdgeId, Value = V>,
    V: Measure,
    T: Tolerance<V>,
    C: CycleContainer<G::EdgeId> + Default,
{
    /// Binds the engine to a borrowed graph, length map and tolerance
    /// policy. Nothing is computed until [`Karp::run`] (or
    /// [`Karp::find_min_mean`]) is called.
    pub fn new(graph: G, length: L, tolerance: T) -> Self {
        Karp {
            graph,
            length,
            tolerance,
            data: Vec::new(),
            best: Best::none(),
            container: ContainerRef::owned(),
        }
    }

    /// Replaces the engine-owned cycle container with one borrowed from the
    /// caller; any previously engine-owned container is dropped.
    pub fn use_cycle_container(&mut self, container: &'a mut C) {
        self.container = ContainerRef::Borrowed(container);
    }

    /// Finds the minimum cycle mean. Returns `true` iff the graph contains a
    /// directed cycle. Re-running after the borrowed graph or lengths
    /// changed is the caller's responsibility to arrange; the engine simply
    /// recomputes from scratch every call.
    pub fn find_min_mean(&mut self) -> bool {
        let g = self.graph;
        self.data.resize_with(g.node_bound(), Vec::new);
        for row in &mut self.data {
            row.clear();
        }
        self.best = Best::none();

        let components = scc::decompose(g);
        log::debug!(
            "karp: {} node(s) split into {} component(s)",
            g.node_bound(),
            components.count
        );
        for nodes in &components.nodes {
            let n = nodes.len();
            let root = nodes[0];
            let root_idx = g.to_index(root);
            if n == 1 && components.out_arcs[root_idx].is_empty() {
                // No self-loop: a lone node can't lie on any cycle.
                log::trace!("karp: skipping trivial acyclic component at node {}", root_idx);
                continue;
            }
            self.init_component(nodes, n);
            self.process_rounds(nodes, n, &components.out_arcs);
            self.extract_mean(nodes, n);
        }

        self.best.node.is_some()
    }

    fn init_component(&mut self, nodes: &[G::NodeId], n: usize) {
        let g = self.graph;
        for &v in nodes {
            let vi = g.to_index(v);
            self.data[vi].resize(n + 1, PathData::infinite());
            for cell in &mut self.data[vi] {
                *cell = PathData::infinite();
            }
        }
        let root_idx = g.to_index(nodes[0]);
        self.data[root_idx][0] = PathData {
            dist: V::default(),
            pred: None,
        };
    }

    fn process_rounds(&mut self, nodes: &[G::NodeId], n: usize, out_arcs: &[Vec<G::EdgeRef>]) {
        let mut active = vec![nodes[0]];
        for k in 1..=n {
            if active.len() < n {
                let mut next = Vec::new();
                for &u in &active {
                    self.relax(u, k, out_arcs, Some(&mut next));
                }
                active = next;
            } else {
                for &u in nodes {
                    self.relax(u, k, out_arcs, None);
                }
            }
        }
    }

    /// Relaxes every same-component out-arc of `u` into layer `k`. Skips
    /// when `u` has no walk of `k - 1` arcs from the root: the table cell is
    /// the exact `Infinity` sentinel then, and adding a length to it would
    /// either stay meaningless or (for integer `V`) silently overflow.
    fn relax(
        &mut self,
        u: G::NodeId,
        k: usize,
        out_arcs: &[Vec<G::EdgeRef>],
        mut newly_active: Option<&mut Vec<G::NodeId>>,
    ) {
        let g = self.graph;
        let u_idx = g.to_index(u);
        let prev = self.data[u_idx][k - 1];
        if prev.dist == V::INFINITY {
            return;
        }
        for &e in &out_arcs[u_idx] {
            let v = e.target();
            let v_idx = g.to_index(v);
            let d = prev.dist + self.length.get(e.id());
            let cur = self.data[v_idx][k];
            if self.tolerance.less(d, cur.dist) {
                if cur.dist == V::INFINITY {
                    if let Some(next) = newly_active.as_deref_mut() {
                        next.push(v);
                    }
                }
                self.data[v_idx][k] = PathData {
                    dist: d,
                    pred: Some(e),
                };
            }
        }
    }

    /// Karp's inner-maximum characterization: for each node reachable in
    /// exactly `n` arcs, find the k achieving `max_k (D[u][n] - D[u][k]) /
    /// (n - k)`, then keep it as the global winner if it beats the current
    /// minimum. Both comparisons are exact cross-multiplications (§4.4).
    fn extract_mean(&mut self, nodes: &[G::NodeId], n: usize) {
        let g = self.graph;
        for &u in nodes {
            let u_idx = g.to_index(u);
            let end = self.data[u_idx][n];
            if end.dist == V::INFINITY {
                continue;
            }
            let mut found = false;
            let mut max_len = V::default();
            let mut max_size = 1usize;
            for k in 0..n {
                let cell = self.data[u_idx][k];
                if cell.dist == V::INFINITY {
                    continue;
                }
                let length = end.dist - cell.dist;
                let size = n - k;
                if !found || cross_lt(max_len, max_size, length, size) {
                    found = true;
                    max_len = length;
                    max_size = size;
                }
            }
            if found
                && (self.best.node.is_none()
                    || cross_lt(max_len, max_size, self.best.length, self.best.size))
            {
                log::trace!("karp: new best mean candidate {:?}/{}", max_len, max_size);
                self.best.node = Some(u);
                self.best.length = max_len;
                self.best.size = max_size;
            }
        }
    }

    /// Reconstructs the winning cycle into the current container.
    ///
    /// # Preconditions
    /// A prior call to [`Karp::find_min_mean`] must have returned `true`.
    /// Calling this beforehand is a contract violation; it returns `false`
    /// without touching the container rather than corrupting state.
    pub fn find_cycle(&mut self) -> bool {
        let g = self.graph;
        let Some(node_star) = self.best.node else {
            return false;
        };
        self.container.get_mut().clear();

        let mut reached = vec![-1i64; g.node_bound()];
        let mut u = node_star;
        let mut k = self.data[g.to_index(u)].len() - 1;
        while reached[g.to_index(u)] < 0 {
            reached[g.to_index(u)] = k as i64;
            let pred = self.data[g.to_index(u)][k]
                .pred
                .expect("reachable DP cell must carry a predecessor arc");
            u = pred.source();
            k -= 1;
        }

        k = reached[g.to_index(u)] as usize;
        let mut e = self.data[g.to_index(u)][k]
            .pred
            .expect("cycle-closing cell must carry a predecessor arc");
        self.container.get_mut().prepend_arc(e.id());
        let mut cycle_len = self.length.get(e.id());
        let mut cycle_size = 1usize;

        let mut v = e.source();
        while v != u {
            k -= 1;
            e = self.data[g.to_index(v)][k]
                .pred
                .expect("cycle-closing cell must carry a predecessor arc");
            self.container.get_mut().prepend_arc(e.id());
            cycle_len = cycle_len + self.length.get(e.id());
            cycle_size += 1;
            v = e.source();
        }

        self.best.length = cycle_len;
        self.best.size = cycle_size;
        true
    }

    /// Shortcut for `find_min_mean() && find_cycle()`.
    pub fn run(&mut self) -> bool {
        self.find_min_mean() && self.find_cycle()
    }

    /// Total length of the found cycle. `0` if no cycle was found.
    pub fn cycle_length(&self) -> V {
        self.best.length
    }

    /// Number of arcs on the found cycle. `1` (a guard value, never a real
    /// cycle size) if no cycle was found.
    pub fn cycle_arc_num(&self) -> usize {
        self.best.size
    }

    /// Mean length of the found cycle. `0.0` if no cycle was found — the
    /// `size = 1` guard in [`Best::none`] keeps the division well-defined
    /// even though the result isn't meaningful before a successful search.
    pub fn cycle_mean(&self) -> f64 {
        self.best.length.as_f64() / (self.best.size as f64)
    }

    /// The reconstructed cycle. Only meaningful after [`Karp::find_cycle`]
    /// returned `true`.
    pub fn cycle(&self) -> &C {
        self.container.get()
    }
}

impl<'a, G, L, V, C> Karp<'a, G, L, V, crate::tolerance::Exact, C>
where
    G: IntoNodeIdentifiers + IntoNeighbors + IntoEdges + NodeIndexable,
    G::NodeId: Copy + PartialEq,
    L: LengthMap<G::EdgeId, Value = V>,
    V: Measure,
    C: CycleContainer<G::EdgeId> + Default,
{
    /// Convenience constructor for integer `LargeValue`s, using exact
    /// (non-tolerant) DP relaxation.
    pub fn with_exact_tolerance(graph: G, length: L) -> Self {
        Karp::new(graph, length, crate::tolerance::Exact)
    }
}

impl<'a, G, L, C> Karp<'a, G, L, f64, crate::tolerance::Epsilon, C>
where
    G: IntoNodeIdentifiers + IntoNeighbors + IntoEdges + NodeIndexable,
    G::NodeId: Copy + PartialEq,
    L: LengthMap<G::EdgeId, Value = f64>,
    C: CycleContainer<G::EdgeId> + Default,
{
    /// Convenience constructor for floating-point `LargeValue`s, using the
    /// default epsilon tolerance.
    pub fn with_epsilon_tolerance(graph: G, length: L) -> Self {
        Karp::new(graph, length, crate::tolerance::Epsilon::default())
    }
}

/// One-shot convenience wrapper: runs Karp's algorithm with exact integer
/// tolerance and an engine-owned `Vec<G::EdgeId>` container, returning the
/// cycle's `(length, arc count, arcs)` if the graph has a directed cycle.
pub fn min_mean_cycle<G, L, V>(graph: G, length: L) -> Option<(V, usize, Vec<G::EdgeId>)>
where
    G: IntoNodeIdentifiers + IntoNeighbors + IntoEdges + NodeIndexable,
    G::NodeId: Copy + PartialEq,
    L: LengthMap<G::EdgeId, Value = V>,
    V: Measure,
{
    let mut karp: Karp<G, L, V, crate::tolerance::Exact, Vec<G::EdgeId>> =
        Karp::with_exact_tolerance(graph, length);
    if karp.run() {
        Some((karp.cycle_length(), karp.cycle_arc_num(), karp.cycle().clone()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn triangle() -> (Graph<(), i32>, [crate::graph::NodeIndex; 3]) {
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let c = g.add_node(());
        g.add_edge(a, b, 1);
        g.add_edge(b, c, 2);
        g.add_edge(c, a, 3);
        (g, [a, b, c])
    }

    #[test]
    fn triangle_cycle_is_its_own_mean_cycle() {
        let (g, _) = triangle();
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(karp.run());
        assert_eq!(karp.cycle_length(), 6);
        assert_eq!(karp.cycle_arc_num(), 3);
        assert_eq!(karp.cycle_mean(), 2.0);
        assert_eq!(karp.cycle().len(), 3);
    }

    #[test]
    fn two_cycle_with_negative_arc() {
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        g.add_edge(a, b, 10);
        g.add_edge(b, a, -4);
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(karp.run());
        assert_eq!(karp.cycle_length(), 6);
        assert_eq!(karp.cycle_arc_num(), 2);
        assert_eq!(karp.cycle_mean(), 3.0);
    }

    #[test]
    fn single_node_self_loop() {
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        g.add_edge(a, a, 7);
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(karp.run());
        assert_eq!(karp.cycle_length(), 7);
        assert_eq!(karp.cycle_arc_num(), 1);
        assert_eq!(karp.cycle_mean(), 7.0);
    }

    #[test]
    fn acyclic_graph_reports_no_cycle() {
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let c = g.add_node(());
        g.add_edge(a, b, 1);
        g.add_edge(b, c, 1);
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(!karp.find_min_mean());
        assert!(!karp.find_cycle());
        assert_eq!(karp.cycle_length(), 0);
        assert_eq!(karp.cycle_arc_num(), 1);
        assert_eq!(karp.cycle_mean(), 0.0);
    }

    #[test]
    fn picks_the_lower_mean_among_disjoint_cycles() {
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let c = g.add_node(());
        let d = g.add_node(());
        let e = g.add_node(());
        g.add_edge(a, b, 2);
        g.add_edge(b, c, 2);
        g.add_edge(c, a, 2);
        g.add_edge(d, e, 3);
        g.add_edge(e, d, 3);
        let length = |ix: crate::graph::EdgeIndex| *g.edge_weight(ix).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(karp.run());
        assert_eq!(karp.cycle_mean(), 2.0);
        let cycle_nodes: Vec<_> = karp
            .cycle()
            .iter()
            .map(|&ix| g.edge_endpoints(ix).unwrap().0)
            .collect();
        assert!(cycle_nodes.contains(&a) || cycle_nodes.contains(&b) || cycle_nodes.contains(&c));
        assert!(!cycle_nodes.contains(&d) && !cycle_nodes.contains(&e));
    }

    #[test]
    fn nested_cycles_share_a_vertex() {
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let c = g.add_node(());
        let d = g.add_node(());
        g.add_edge(a, b, 1);
        g.add_edge(b, c, 1);
        g.add_edge(c, a, 1);
        g.add_edge(a, d, 5);
        g.add_edge(d, a, 5);
        let length = |ix: crate::graph::EdgeIndex| *g.edge_weight(ix).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(karp.run());
        assert_eq!(karp.cycle_mean(), 1.0);
        assert_eq!(karp.cycle_arc_num(), 3);
    }

    #[test]
    fn self_loop_dominates_its_component_mean() {
        // a self-loop's length bounds the computed mean above.
        let mut g: Graph<(), i32> = Graph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        g.add_edge(a, b, 100);
        g.add_edge(b, a, 100);
        g.add_edge(a, a, 5);
        let length = |ix: crate::graph::EdgeIndex| *g.edge_weight(ix).unwrap();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        assert!(karp.run());
        assert!(karp.cycle_mean() <= 5.0);
    }

    #[test]
    fn scale_invariance_multiplies_the_mean() {
        // scaling every length by a positive integer scales the mean by the
        // same factor and keeps the same winning cycle.
        let (g, _) = triangle();
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let mut base = Karp::with_exact_tolerance(&g, length);
        base.run();

        let mut scaled: Graph<(), i32> = Graph::new();
        let a = scaled.add_node(());
        let b = scaled.add_node(());
        let c = scaled.add_node(());
        scaled.add_edge(a, b, 4);
        scaled.add_edge(b, c, 8);
        scaled.add_edge(c, a, 12);
        let scaled_length = |e: crate::graph::EdgeIndex| *scaled.edge_weight(e).unwrap();
        let mut scaled_karp = Karp::with_exact_tolerance(&scaled, scaled_length);
        scaled_karp.run();

        assert_eq!(scaled_karp.cycle_mean(), base.cycle_mean() * 4.0);
        assert_eq!(scaled_karp.cycle_arc_num(), base.cycle_arc_num());
    }

    #[test]
    fn borrowed_container_receives_the_cycle() {
        let (g, _) = triangle();
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let mut external: Vec<crate::graph::EdgeIndex> = Vec::new();
        let mut karp = Karp::with_exact_tolerance(&g, length);
        karp.use_cycle_container(&mut external);
        assert!(karp.run());
        assert_eq!(external.len(), 3);
    }

    #[test]
    fn min_mean_cycle_helper_matches_engine() {
        let (g, _) = triangle();
        let length = |e: crate::graph::EdgeIndex| *g.edge_weight(e).unwrap();
        let (len, size, cycle) = min_mean_cycle(&g, length).unwrap();
        assert_eq!(len, 6);
        assert_eq!(size, 3);
        assert_eq!(cycle.len(), 3);
    }
}
