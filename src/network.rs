// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Edge, Graph, KDTree, Metric, Node};

/// Result of snapping a position to the nearest [Node].
#[derive(Debug, Clone, PartialEq)]
pub struct Snap {
    /// The nearest node. If multiple nodes are equally near, the one with the lowest id.
    pub node: Node,

    /// Distance between the position and the node, as per the network's [Metric].
    pub distance: f64,

    /// Sorted ids of other nodes at exactly the same distance as [Snap::node].
    pub ties: Vec<i64>,
}

impl Snap {
    pub fn new(node: Node, distance: f64) -> Self {
        Self {
            node,
            distance,
            ties: Vec::default(),
        }
    }

    /// Returns `true` if more than one node is the nearest one.
    pub fn is_ambiguous(&self) -> bool {
        !self.ties.is_empty()
    }
}

/// The minimal view of a road network required for [planning routes](crate::plan).
///
/// Implementations must be deterministic: the same queries must return
/// the same results, including the order of [Network::edges].
pub trait Network {
    /// Returns the number of directed edges in the network.
    fn edge_count(&self) -> usize;

    /// Retrieves a [Node] with the provided id.
    fn node(&self, id: i64) -> Option<Node>;

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    fn edges(&self, from_id: i64) -> &[Edge];

    /// Snaps a position to the nearest [Node].
    /// Returns `None` only if the network has no nodes.
    fn find_nearest_node(&self, x: f64, y: f64) -> Option<Snap>;

    /// Returns the [Metric] used to interpret node coordinates.
    fn metric(&self) -> Metric;

    /// Returns a lower bound for the cost of traveling a unit of distance,
    /// used to guide route search: every edge cost must be at least the [Metric]
    /// distance between its nodes multiplied by this value.
    /// Zero is always a valid (but slow) answer.
    fn min_cost_per_unit(&self) -> f64 {
        0.0
    }
}

impl Network for Graph {
    fn edge_count(&self) -> usize {
        Graph::edge_count(self)
    }

    fn node(&self, id: i64) -> Option<Node> {
        self.get_node(id)
    }

    fn edges(&self, from_id: i64) -> &[Edge] {
        self.get_edges(from_id)
    }

    fn find_nearest_node(&self, x: f64, y: f64) -> Option<Snap> {
        self.snap(x, y)
    }

    fn metric(&self) -> Metric {
        Graph::metric(self)
    }

    fn min_cost_per_unit(&self) -> f64 {
        Graph::min_cost_per_unit(self)
    }
}

/// A [Graph] paired with a [KDTree] over its nodes, for fast snapping of many stops.
///
/// The graph is borrowed immutably, so the index can not get out of sync.
#[derive(Debug, Clone)]
pub struct IndexedGraph<'a> {
    graph: &'a Graph,
    tree: Option<KDTree>,
}

impl<'a> IndexedGraph<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            tree: KDTree::build_from_graph(graph),
        }
    }
}

impl Network for IndexedGraph<'_> {
    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node(&self, id: i64) -> Option<Node> {
        self.graph.get_node(id)
    }

    fn edges(&self, from_id: i64) -> &[Edge] {
        self.graph.get_edges(from_id)
    }

    fn find_nearest_node(&self, x: f64, y: f64) -> Option<Snap> {
        self.tree.as_ref().map(|t| t.snap(x, y))
    }

    fn metric(&self) -> Metric {
        self.graph.metric()
    }

    fn min_cost_per_unit(&self) -> f64 {
        self.graph.min_cost_per_unit()
    }
}
