// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Edge, Metric, Node, Segment, Snap};
use std::collections::btree_map::{BTreeMap, Entry};

/// Represents a road network as a set of [Nodes](Node), [Edges](Edge) between them
/// and the [Segments](Segment) from which the edges were created.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<i64, (Node, Vec<Edge>)>,
    segments: BTreeMap<i64, Segment>,
    metric: Metric,
    edge_count: usize,
    min_weight: Option<f32>,
    min_cost_per_unit: Option<f64>,
}

impl Graph {
    /// Creates an empty graph, whose node coordinates are interpreted using the given [Metric].
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of directed edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns the [Metric] used to interpret node coordinates.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Changes the [Metric] used to interpret node coordinates.
    ///
    /// Lengths of already added segments are not recomputed.
    pub fn set_metric(&mut self, metric: Metric) {
        if metric != self.metric && self.edge_count > 0 {
            self.min_cost_per_unit = Some(0.0);
        }
        self.metric = metric;
    }

    /// Returns the smallest weight of all segments in the graph, or zero for graphs
    /// without segments. Every edge cost is at least its length multiplied by this value.
    pub fn min_weight(&self) -> f64 {
        self.min_weight.map(f64::from).unwrap_or(0.0)
    }

    /// Returns the smallest ratio of an edge cost to the [Metric] distance between
    /// its nodes, or zero if it is unknown. The cost of any path is at least
    /// the distance between its ends multiplied by this value.
    ///
    /// Moving nodes with [Graph::set_node] or changing the metric of a graph
    /// which already has edges resets this value to zero.
    pub fn min_cost_per_unit(&self) -> f64 {
        self.min_cost_per_unit
            .filter(|r| r.is_finite())
            .unwrap_or(0.0)
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|(node, _)| node)
    }

    /// Returns the largest node id in the graph, or zero for an empty graph.
    pub fn max_node_id(&self) -> i64 {
        self.nodes.keys().next_back().copied().unwrap_or(0)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.nodes.get(&id).map(|&(node, _)| node)
    }

    /// Creates or updates a [Node] with `node.id`.
    ///
    /// All outgoing and incoming edges are preserved. Moving a node which already
    /// has edges does not update their lengths or costs.
    pub fn set_node(&mut self, node: Node) {
        assert_ne!(node.id, 0);

        match self.nodes.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                debug_assert_eq!(e.get().0.id, node.id);
                let previous = e.get().0;
                e.get_mut().0 = node;
                if self.edge_count > 0 && (previous.x, previous.y) != (node.x, node.y) {
                    self.min_cost_per_unit = Some(0.0);
                }
            }
        }
    }

    /// Deletes a [Node] with a given `id`.
    ///
    /// While all outgoing edges are removed, incoming edges are preserved
    /// (as this would require a walk over all nodes in the graph).
    pub fn delete_node(&mut self, id: i64) {
        if let Some((_, edges)) = self.nodes.remove(&id) {
            self.edge_count -= edges.len();
        }
    }

    /// Finds the closest [Node] to the given position.
    ///
    /// If multiple nodes are equally close, the one with the lowest id is returned.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for large graphs - see [crate::IndexedGraph].
    pub fn find_nearest_node(&self, x: f64, y: f64) -> Option<Node> {
        self.snap(x, y).map(|s| s.node)
    }

    /// Like [Graph::find_nearest_node], but also returns the distance
    /// and all other nodes at exactly the same distance.
    pub fn snap(&self, x: f64, y: f64) -> Option<Snap> {
        let mut best: Option<Snap> = None;

        // Nodes are iterated by ascending id, so the first node at
        // the best distance has the lowest id and ties come out sorted.
        for &(nd, _) in self.nodes.values() {
            let distance = self.metric.distance(x, y, nd.x, nd.y);
            if distance.is_nan() {
                continue;
            }

            let replace = match &mut best {
                Some(b) if distance == b.distance => {
                    b.ties.push(nd.id);
                    false
                }
                Some(b) => distance < b.distance,
                None => true,
            };

            if replace {
                best = Some(Snap::new(nd, distance));
            }
        }

        best
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.nodes
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of the cheapest [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f64::INFINITY].
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> f64 {
        self.get_edges(from_id)
            .iter()
            .filter(|edge| edge.to == to_id)
            .map(|edge| edge.cost)
            .fold(f64::INFINITY, f64::min)
    }

    /// Retrieves a [Segment] with the provided id.
    pub fn get_segment(&self, id: i64) -> Option<&Segment> {
        self.segments.get(&id)
    }

    /// Returns an iterator over all [Segments](Segment) in the graph, ordered by id.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Returns the largest segment id in the graph, or zero if there are no segments.
    pub fn max_segment_id(&self) -> i64 {
        self.segments.keys().next_back().copied().unwrap_or(0)
    }

    /// Adds a [Segment] and creates its [Edges](Edge): `from -> to` if `forward` is set,
    /// and `to -> from` if `backward` is set. Both edges have a cost of
    /// `segment.length * segment.weight`.
    ///
    /// Returns `false` (and leaves the graph untouched) if either endpoint does not exist,
    /// the segment id is zero or already taken, or the resulting cost is not finite
    /// and greater than zero.
    pub fn add_segment(&mut self, segment: Segment, forward: bool, backward: bool) -> bool {
        let cost = segment.length * f64::from(segment.weight);

        let (Some(from), Some(to)) = (self.get_node(segment.from), self.get_node(segment.to)) else {
            return false;
        };

        if segment.id == 0
            || self.segments.contains_key(&segment.id)
            || !cost.is_finite()
            || cost <= 0.0
            || !(forward || backward)
        {
            return false;
        }

        // Lengths are not required to match node positions,
        // so the search heuristic is bounded by actual costs.
        let distance = self.metric.distance(from.x, from.y, to.x, to.y);
        let cost_per_unit = if distance > 0.0 {
            cost / distance
        } else if distance == 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        self.min_cost_per_unit = Some(
            self.min_cost_per_unit
                .map_or(cost_per_unit, |r| r.min(cost_per_unit)),
        );

        let mut push = |from: i64, to: i64| {
            if let Some((_, edges)) = self.nodes.get_mut(&from) {
                edges.push(Edge {
                    id: segment.id,
                    to,
                    cost,
                    length: segment.length,
                });
                self.edge_count += 1;
            }
        };

        if forward {
            push(segment.from, segment.to);
        }
        if backward {
            push(segment.to, segment.from);
        }

        self.min_weight = Some(
            self.min_weight
                .map_or(segment.weight, |w| w.min(segment.weight)),
        );
        self.segments.insert(segment.id, segment);
        true
    }
}
