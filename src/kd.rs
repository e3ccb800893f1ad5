// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Graph, Metric, Node, Snap};

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// which can be used to speed up nearest-neighbor search for large datasets.
/// Snapping every stop with [crate::Graph::find_nearest_node] requires a walk over
/// all nodes, which on larger networks takes more time than the route search itself.
///
/// The tree is split on raw coordinates, while distances are computed with
/// the provided [Metric]. For [Metric::Geographic] this results in undefined behavior
/// when points are close to the ante meridian (180°/-180° longitude) or poles
/// (90°/-90° latitude), or when the data spans multiple continents.
#[derive(Debug, Clone)]
pub struct KDTree {
    root: KDNode,
    metric: Metric,
}

#[derive(Debug, Clone)]
struct KDNode {
    pivot: Node,
    left: Option<Box<KDNode>>,
    right: Option<Box<KDNode>>,
}

impl KDTree {
    /// Finds the closest [Node] to the given position.
    /// Ties are resolved in favor of the lowest node id.
    pub fn find_nearest_node(&self, x: f64, y: f64) -> Node {
        self.snap(x, y).node
    }

    /// Like [KDTree::find_nearest_node], but also returns the distance
    /// and all other nodes at exactly the same distance.
    pub fn snap(&self, x: f64, y: f64) -> Snap {
        let pivot = self.root.pivot;
        let mut best = Snap::new(pivot, self.metric.distance(x, y, pivot.x, pivot.y));
        self.root.find_nearest_impl(x, y, false, self.metric, &mut best);
        best.ties.sort_unstable();
        best.ties.dedup();
        best
    }

    /// Builds a k-d tree from an iterable of [Nodes](Node).
    pub fn from_iter<I: IntoIterator<Item = Node>>(nodes: I, metric: Metric) -> Option<Self> {
        let mut nodes = nodes.into_iter().collect::<Vec<_>>();
        Self::build(nodes.as_mut_slice(), metric)
    }

    /// Builds a k-d tree from all nodes of a [Graph], using the graph's [Metric].
    pub fn build_from_graph(g: &Graph) -> Option<Self> {
        Self::from_iter(g.iter().copied(), g.metric())
    }

    /// Builds a k-d tree from a mutable slice of [Nodes](Node). Nodes will be reordered
    /// in the slice to facilitate building the tree.
    pub fn build(nodes: &mut [Node], metric: Metric) -> Option<Self> {
        KDNode::build(nodes, false).map(|root| Self { root, metric })
    }
}

impl KDNode {
    fn find_nearest_impl(&self, x: f64, y: f64, x_divides: bool, metric: Metric, best: &mut Snap) {
        offer(best, self.pivot, metric.distance(x, y, self.pivot.x, self.pivot.y));

        // Select which branch to recurse into first
        let first_left = if x_divides {
            x < self.pivot.x
        } else {
            y < self.pivot.y
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            branch.find_nearest_impl(x, y, !x_divides, metric, best);
        }

        if let Some(ref branch) = second {
            // A closer (or equally close) node is possible in the second branch
            // if and only if the splitting axis is not further than the current best.
            let (axis_x, axis_y) = if x_divides {
                (self.pivot.x, y)
            } else {
                (x, self.pivot.y)
            };
            let dist_to_axis = metric.distance(x, y, axis_x, axis_y);

            if dist_to_axis <= best.distance {
                branch.find_nearest_impl(x, y, !x_divides, metric, best);
            }
        }
    }

    fn build(nodes: &mut [Node], x_divides: bool) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => Some(Self {
                pivot: nodes[0],
                left: None,
                right: None,
            }),
            _ => {
                if x_divides {
                    nodes.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.id.cmp(&b.id)));
                } else {
                    nodes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.id.cmp(&b.id)));
                }
                let median = nodes.len() / 2;
                let pivot = nodes[median];
                let (left, right_and_pivot) = nodes.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build(left, !x_divides).map(Box::new),
                    right: Self::build(right, !x_divides).map(Box::new),
                })
            }
        }
    }
}

/// Considers `candidate` as the new nearest node.
fn offer(best: &mut Snap, candidate: Node, distance: f64) {
    if candidate.id == best.node.id || distance.is_nan() {
        return;
    }

    if distance < best.distance {
        *best = Snap::new(candidate, distance);
    } else if distance == best.distance {
        if candidate.id < best.node.id {
            best.ties.push(best.node.id);
            best.node = candidate;
        } else {
            best.ties.push(candidate.id);
        }
    }
}
