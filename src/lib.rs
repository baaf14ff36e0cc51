//! **karp-mmc** finds a directed cycle of minimum mean arc length in a
//! directed multigraph.
//!
//! The entry point is [`karp::Karp`], an engine you bind to a borrowed graph
//! and arc-length map and then query with [`karp::Karp::run`]. A graph only
//! needs to implement the capability traits in [`visit`] — [`graph::Graph`]
//! is a small owned implementation good enough to build one from scratch or
//! to use in tests, but any caller-supplied type works equally well.
//!
//! ```
//! use karp_mmc::graph::Graph;
//! use karp_mmc::karp::Karp;
//!
//! let mut g: Graph<(), i32> = Graph::new();
//! let a = g.add_node(());
//! let b = g.add_node(());
//! let c = g.add_node(());
//! g.add_edge(a, b, 1);
//! g.add_edge(b, c, 2);
//! g.add_edge(c, a, 3);
//!
//! let length = |e| *g.edge_weight(e).unwrap();
//! let mut karp = Karp::with_exact_tolerance(&g, length);
//! assert!(karp.run());
//! assert_eq!(karp.cycle_mean(), 2.0);
//! ```

pub mod graph;
pub mod karp;
pub mod path;
pub mod scc;
pub mod tolerance;
pub mod visit;

pub use graph::Graph;
pub use karp::Karp;
