// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Topology checks of road networks, to be run before planning routes.

use std::collections::BTreeMap;

use crate::{Graph, Node};

/// A line end which does not meet any other line.
#[derive(Debug, Clone, PartialEq)]
pub struct Dangle {
    pub node: Node,

    /// Id of the only [Segment](crate::Segment) touching the node.
    pub segment: i64,

    /// Id of the line feature of that segment.
    pub feature_id: i64,
}

/// Finds all dangles - nodes touched by exactly one segment, regardless of its direction.
///
/// Dangles are legitimate at true dead ends, but more often they are
/// lines which were supposed to meet, but their ends are further apart than the
/// tolerance used when building the graph. Such lines leave parts of the network
/// disconnected, which manifests as [unreachable stops](crate::PlanError::UnreachableStop).
///
/// Dangles are returned ordered by node id.
pub fn find_dangles(g: &Graph) -> Vec<Dangle> {
    let mut touching: BTreeMap<i64, (usize, i64)> = BTreeMap::default();

    for s in g.segments() {
        for end in [s.from, s.to] {
            let entry = touching.entry(end).or_insert((0, s.id));
            entry.0 += 1;
        }
    }

    touching
        .into_iter()
        .filter(|&(_, (count, _))| count == 1)
        .filter_map(|(node_id, (_, segment))| {
            Some(Dangle {
                node: g.get_node(node_id)?,
                segment,
                feature_id: g.get_segment(segment)?.feature_id,
            })
        })
        .collect()
}
