// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::{Edge, Network, Node, SearchError};

/// A least-cost path between two nodes, as returned by [find_path].
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Ids of traversed nodes, starting with the start node and ending with the end node.
    pub nodes: Vec<i64>,

    /// Ids of the [Segments](crate::Segment) of traversed edges;
    /// always one element shorter than [Path::nodes].
    pub edges: Vec<i64>,

    /// Sum of costs of all traversed edges.
    pub cost: f64,

    /// Sum of lengths of all traversed edges.
    pub length: f64,
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    cost: f64,
    score: f64,
}

impl QueueItem {
    /// Lower score first, then lower cost (so that all equally good predecessors
    /// of a node are expanded before the node itself), then lower node id.
    fn priority(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.cost.total_cmp(&other.cost))
            .then(self.at.cmp(&other.at))
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.priority(self)
    }
}

fn reconstruct_path(came_from: &HashMap<i64, (i64, Edge)>, mut last: i64, cost: f64) -> Path {
    let mut nodes = vec![last];
    let mut edges = Vec::default();
    let mut length = 0.0;

    while let Some(&(nd, edge)) = came_from.get(&last) {
        nodes.push(nd);
        edges.push(edge.id);
        length += edge.length;
        last = nd;
    }

    nodes.reverse();
    edges.reverse();
    Path {
        nodes,
        edges,
        cost,
        length,
    }
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the least-cost path between two nodes in the provided network.
///
/// The heuristic is the crow-flies distance multiplied by [Network::min_cost_per_unit];
/// if that is zero, this is plain Dijkstra's algorithm.
///
/// Returns `Ok(None)` if there is no path between the two nodes.
///
/// The result is deterministic. If multiple paths have the same minimal cost,
/// every node on the returned path is entered through the edge with the lowest
/// segment id among all edges reaching it at its minimal cost.
///
/// `step_limit` limits how many nodes may be expanded during the search
/// before returning [SearchError::StepLimitExceeded]. Concluding that no path exists requires
/// expanding all nodes accessible from the start, which is usually very time-consuming
/// on large datasets. The recommended value is [DEFAULT_STEP_LIMIT](crate::DEFAULT_STEP_LIMIT).
pub fn find_path<N: Network + ?Sized>(
    n: &N,
    from_id: i64,
    to_id: i64,
    step_limit: usize,
) -> Result<Option<Path>, SearchError> {
    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, (i64, Edge)> = HashMap::default();
    let mut known_costs: HashMap<i64, f64> = HashMap::default();
    let mut expanded: HashSet<i64> = HashSet::default();
    let mut steps: usize = 0;

    let to_node = n.node(to_id).ok_or(SearchError::InvalidReference(to_id))?;
    let from_node = n.node(from_id).ok_or(SearchError::InvalidReference(from_id))?;

    let metric = n.metric();
    let scale = match n.min_cost_per_unit() {
        s if s.is_finite() && s > 0.0 => s,
        _ => 0.0,
    };
    let heuristic = |nd: Node| scale * metric.distance(nd.x, nd.y, to_node.x, to_node.y);

    queue.push(QueueItem {
        at: from_id,
        cost: 0.0,
        score: heuristic(from_node),
    });
    known_costs.insert(from_id, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to_id {
            return Ok(Some(reconstruct_path(&came_from, to_id, item.cost)));
        }

        // Contrary to the wikipedia definition, we might keep multiple items in the queue for the same node.
        if item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY) {
            continue;
        }

        steps += 1;
        if steps > step_limit {
            return Err(SearchError::StepLimitExceeded);
        }
        expanded.insert(item.at);

        for &edge in n.edges(item.at) {
            // Check if the referred node exists
            let Some(neighbor) = n.node(edge.to) else {
                continue;
            };

            let neighbor_cost = item.cost + edge.cost;
            let known_cost = known_costs.get(&edge.to).cloned().unwrap_or(f64::INFINITY);

            if neighbor_cost == known_cost {
                // Equally good way to an unexpanded node - keep the lower segment id
                if !expanded.contains(&edge.to) {
                    if let Some(previous) = came_from.get_mut(&edge.to) {
                        if edge.id < previous.1.id {
                            *previous = (item.at, edge);
                        }
                    }
                }
                continue;
            } else if neighbor_cost > known_cost {
                continue;
            }

            // Push the new item into the queue
            came_from.insert(edge.to, (item.at, edge));
            known_costs.insert(edge.to, neighbor_cost);
            queue.push(QueueItem {
                at: edge.to,
                cost: neighbor_cost,
                score: neighbor_cost + heuristic(neighbor),
            });
        }
    }

    Ok(None)
}
