// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{find_path, Leg, Network, Point, Route, SearchError, Snap, DEFAULT_STEP_LIMIT};

/// What to do when a stop is equally close to multiple nodes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum SnapPolicy {
    /// Snap to the node with the lowest id.
    #[default]
    LowestId = 0,

    /// Fail with [PlanError::AmbiguousSnap].
    Strict = 1,
}

/// Additional controls for [plan].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanOptions {
    /// Maximum number of node expansions per leg, see [find_path].
    pub step_limit: usize,

    pub snap_policy: SnapPolicy,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            snap_policy: SnapPolicy::default(),
        }
    }
}

/// Error conditions which may occur during [plan].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("at least 2 stops are required to plan a route, got {0}")]
    InsufficientStops(usize),

    #[error("the network has no edges")]
    EmptyGraph,

    #[error("leg {leg}: no path from stop {from_stop} to stop {to_stop} (is the network disconnected?)")]
    UnreachableStop {
        leg: usize,
        from_stop: usize,
        to_stop: usize,
    },

    #[error("stop {stop} has a non-finite coordinate")]
    InvalidStop { stop: usize },

    #[error("stop {stop} is equally close to nodes {nodes:?}")]
    AmbiguousSnap { stop: usize, nodes: Vec<i64> },

    #[error("leg {leg}: step limit exceeded")]
    StepLimitExceeded { leg: usize },
}

/// Plans a route visiting all `stops` in order.
///
/// Every stop is snapped to its nearest node, and every pair of consecutive stops
/// is connected with an independent least-cost [Leg]. Edges shared by multiple legs
/// are not deduplicated. If any leg can't be found, the whole route fails.
///
/// The result only depends on the contents of the network and the stops.
/// See [find_path] and [SnapPolicy] for how ties are resolved.
pub fn plan<N: Network + ?Sized>(
    network: &N,
    stops: &[Point],
    options: &PlanOptions,
) -> Result<Route, PlanError> {
    if stops.len() < 2 {
        return Err(PlanError::InsufficientStops(stops.len()));
    }

    if network.edge_count() == 0 {
        return Err(PlanError::EmptyGraph);
    }

    if let Some(stop) = stops.iter().position(|s| !(s.x.is_finite() && s.y.is_finite())) {
        return Err(PlanError::InvalidStop { stop });
    }

    let snaps = stops
        .iter()
        .enumerate()
        .map(|(idx, stop)| snap_stop(network, idx, stop, options.snap_policy))
        .collect::<Result<Vec<_>, _>>()?;

    let mut legs = Vec::with_capacity(stops.len() - 1);
    for (leg, pair) in snaps.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        log::info!(
            "leg {}: from stop {} (node {}) to stop {} (node {})",
            leg,
            leg,
            from.node.id,
            leg + 1,
            to.node.id,
        );

        let unreachable = PlanError::UnreachableStop {
            leg,
            from_stop: leg,
            to_stop: leg + 1,
        };

        let path = match find_path(network, from.node.id, to.node.id, options.step_limit) {
            Ok(Some(path)) => path,
            Ok(None) => return Err(unreachable),
            Err(SearchError::StepLimitExceeded) => return Err(PlanError::StepLimitExceeded { leg }),
            Err(SearchError::InvalidReference(id)) => {
                log::error!("leg {}: snapped node {} does not exist in the network", leg, id);
                return Err(unreachable);
            }
        };

        let geometry = path
            .nodes
            .iter()
            .filter_map(|&id| network.node(id))
            .map(|nd| Point::new(nd.x, nd.y))
            .collect();

        legs.push(Leg {
            from_stop: leg,
            to_stop: leg + 1,
            from_node: from.node.id,
            to_node: to.node.id,
            nodes: path.nodes,
            edges: path.edges,
            geometry,
            cost: path.cost,
            length: path.length,
        });
    }

    let route = Route::new(legs);
    log::info!("planned a route through {} stops, total cost {}", stops.len(), route.cost);
    Ok(route)
}

fn snap_stop<N: Network + ?Sized>(
    network: &N,
    idx: usize,
    stop: &Point,
    policy: SnapPolicy,
) -> Result<Snap, PlanError> {
    // Networks with edges always have nodes
    let snap = network
        .find_nearest_node(stop.x, stop.y)
        .ok_or(PlanError::EmptyGraph)?;

    if snap.is_ambiguous() {
        if policy == SnapPolicy::Strict {
            let mut nodes = snap.ties.clone();
            nodes.push(snap.node.id);
            nodes.sort_unstable();
            return Err(PlanError::AmbiguousSnap { stop: idx, nodes });
        }

        log::debug!(
            "stop {} is equally close to nodes {} and {:?} - using {}",
            idx,
            snap.node.id,
            snap.ties,
            snap.node.id,
        );
    }

    Ok(snap)
}
