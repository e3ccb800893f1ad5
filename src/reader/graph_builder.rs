// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};

use crate::{planar_distance, Graph, Node, Segment};

use super::{model::LineFeature, Options};

/// Helper object used for storing state related to converting [line features](LineFeature)
/// into a [Graph].
///
/// Vertices are merged into existing nodes if they are within [Options::tolerance];
/// candidates are found through a uniform grid with cells as large as the tolerance.
pub(super) struct GraphBuilder<'a> {
    g: &'a mut Graph,
    options: &'a Options<'a>,
    tolerance: f64,
    next_node_id: i64,
    next_segment_id: i64,
    cells: HashMap<(i64, i64), Vec<i64>>,
    unused_nodes: HashSet<i64>,
    added_segments: usize,
    skipped_features: usize,
}

impl<'a> GraphBuilder<'a> {
    /// Create a new graph builder, continuing to build the provided graph.
    pub(super) fn new(g: &'a mut Graph, options: &'a Options<'a>) -> Self {
        g.set_metric(options.metric);

        let tolerance = if options.tolerance.is_finite() && options.tolerance > 0.0 {
            options.tolerance
        } else {
            0.0
        };

        let mut b = Self {
            next_node_id: g.max_node_id() + 1,
            next_segment_id: g.max_segment_id() + 1,
            g,
            options,
            tolerance,
            cells: HashMap::default(),
            unused_nodes: HashSet::default(),
            added_segments: 0,
            skipped_features: 0,
        };

        // Allow merging with nodes added by previous calls
        let existing: Vec<Node> = b.g.iter().copied().collect();
        for nd in existing {
            let cell = b.cell(nd.x, nd.y);
            b.cells.entry(cell).or_default().push(nd.id);
        }

        b
    }

    /// Add all provided line features.
    pub(super) fn add_features<I: IntoIterator<Item = LineFeature>>(&mut self, features: I) {
        for f in features {
            self.add_feature(f);
        }
        self.cleanup();

        log::info!(
            "added {} segments to the graph ({} nodes), {} line features had no usable segments",
            self.added_segments,
            self.g.len(),
            self.skipped_features,
        );
    }

    fn cleanup(&mut self) {
        self.unused_nodes
            .iter()
            .for_each(|&id| self.g.delete_node(id));
        self.unused_nodes.clear();
    }

    fn add_feature(&mut self, f: LineFeature) {
        let profile = self.options.profile;

        let (weight, weight_valid) = profile.feature_weight(&f.properties);
        if !weight_valid {
            log::warn!(
                "feature {}: invalid {:?} value - using the road-type weight",
                f.id,
                profile.weight_field.unwrap_or_default(),
            );
        }

        let category = profile.category(&f.properties).map(str::to_string);
        let (forward, backward) = profile.direction(&f.properties);

        let mut added = 0;
        for part in &f.parts {
            let nodes = self.get_part_nodes(f.id, part);
            added += self.create_segments(f.id, &nodes, &category, weight, forward, backward);
        }

        if added == 0 {
            log::debug!("feature {}: no usable segments - skipping", f.id);
            self.skipped_features += 1;
        }
    }

    /// Converts vertices of a line into a sequence of nodes,
    /// with consecutive duplicates (zero-length pieces) removed.
    fn get_part_nodes(&mut self, feature_id: i64, part: &[[f64; 2]]) -> Vec<i64> {
        let mut nodes: Vec<i64> = part
            .iter()
            .filter(|[x, y]| {
                let finite = x.is_finite() && y.is_finite();
                if !finite {
                    log::warn!("feature {}: skipping a non-finite vertex", feature_id);
                }
                finite
            })
            .map(|&[x, y]| self.get_or_create_node(x, y))
            .collect();
        nodes.dedup();
        nodes
    }

    fn create_segments(
        &mut self,
        feature_id: i64,
        nodes: &[i64],
        category: &Option<String>,
        weight: f32,
        forward: bool,
        backward: bool,
    ) -> usize {
        let mut added = 0;

        for pair in nodes.windows(2) {
            let (Some(left), Some(right)) = (self.g.get_node(pair[0]), self.g.get_node(pair[1])) else {
                continue;
            };

            // Lengths are measured between (possibly merged) nodes,
            // so that edge costs stay consistent with node positions.
            let length = self.options.metric.distance(left.x, left.y, right.x, right.y);

            let segment = Segment {
                id: self.next_segment_id,
                feature_id,
                from: left.id,
                to: right.id,
                length,
                category: category.clone(),
                weight,
            };

            if self.g.add_segment(segment, forward, backward) {
                self.next_segment_id += 1;
                self.unused_nodes.remove(&left.id);
                self.unused_nodes.remove(&right.id);
                added += 1;
            } else {
                log::warn!(
                    "feature {}: unable to add a segment between nodes {} and {} (length {})",
                    feature_id,
                    left.id,
                    right.id,
                    length,
                );
            }
        }

        self.added_segments += added;
        added
    }

    fn get_or_create_node(&mut self, x: f64, y: f64) -> i64 {
        if let Some(id) = self.find_coincident_node(x, y) {
            return id;
        }

        let id = self.next_node_id;
        self.next_node_id += 1;

        self.g.set_node(Node { id, x, y });
        self.unused_nodes.insert(id);
        let cell = self.cell(x, y);
        self.cells.entry(cell).or_default().push(id);
        id
    }

    /// Finds the closest node within the tolerance, preferring lower ids on ties.
    fn find_coincident_node(&self, x: f64, y: f64) -> Option<i64> {
        let (cx, cy) = self.cell(x, y);

        if self.tolerance == 0.0 {
            return self.cells.get(&(cx, cy)).and_then(|ids| {
                ids.iter().copied().find(|&id| {
                    self.g
                        .get_node(id)
                        .is_some_and(|nd| nd.x == x && nd.y == y)
                })
            });
        }

        let mut best: Option<(f64, i64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                // Cells saturate at the edges of i64 for tiny tolerances
                let (Some(nx), Some(ny)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                let Some(ids) = self.cells.get(&(nx, ny)) else {
                    continue;
                };

                for &id in ids {
                    let Some(nd) = self.g.get_node(id) else {
                        continue;
                    };

                    let d = planar_distance(x, y, nd.x, nd.y);
                    let better = match best {
                        None => true,
                        Some((best_d, best_id)) => d < best_d || (d == best_d && id < best_id),
                    };
                    if d <= self.tolerance && better {
                        best = Some((d, id));
                    }
                }
            }
        }

        best.map(|(_, id)| id)
    }

    fn cell(&self, x: f64, y: f64) -> (i64, i64) {
        if self.tolerance == 0.0 {
            // Normalize -0.0 to 0.0, so that both land in the same cell
            ((x + 0.0).to_bits() as i64, (y + 0.0).to_bits() as i64)
        } else {
            (
                (x / self.tolerance).floor() as i64,
                (y / self.tolerance).floor() as i64,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Profile, Weight, DEFAULT_PROFILE};
    use crate::reader::FileFormat;
    use crate::Metric;
    use geojson::JsonObject;

    fn line(id: i64, coords: &[[f64; 2]], category: Option<&str>) -> LineFeature {
        let mut properties = JsonObject::new();
        if let Some(c) = category {
            properties.insert("road_type".to_string(), c.into());
        }
        LineFeature {
            id,
            parts: vec![coords.to_vec()],
            properties,
        }
    }

    fn options(profile: &'static Profile<'static>, tolerance: f64) -> Options<'static> {
        Options {
            profile,
            file_format: FileFormat::GeoJson,
            metric: Metric::Planar,
            tolerance,
        }
    }

    #[test]
    fn merges_within_tolerance() {
        let mut g = Graph::default();
        let options = options(&DEFAULT_PROFILE, 0.1);
        GraphBuilder::new(&mut g, &options).add_features([
            line(1, &[[0.0, 0.0], [10.0, 0.0]], None),
            line(2, &[[10.05, 0.05], [10.0, 10.0]], None),
            line(3, &[[10.2, 10.0], [20.0, 10.0]], None),
        ]);

        // (10.05, 0.05) merges into (10, 0), but (10.2, 10) is too far from (10, 10)
        assert_eq!(g.len(), 5);
        let merged = g.find_nearest_node(10.0, 0.0).unwrap();
        assert_eq!(g.get_edges(merged.id).len(), 2);
        assert_eq!((merged.x, merged.y), (10.0, 0.0));

        // Length is computed between nodes, not raw vertices
        let s = g.get_segment(2).unwrap();
        assert_eq!(s.length, 10.0);
    }

    #[test]
    fn exact_coincidence_without_tolerance() {
        let mut g = Graph::default();
        let options = options(&DEFAULT_PROFILE, 0.0);
        GraphBuilder::new(&mut g, &options).add_features([
            line(1, &[[0.0, 0.0], [1.0, 0.0]], None),
            line(2, &[[1.0, 0.0], [1.0, 1.0]], None),
            line(3, &[[-0.0, 0.0], [1.0, 1e-9]], None),
        ]);

        assert_eq!(g.len(), 4);
        assert_eq!(g.get_edges(g.find_nearest_node(0.0, 0.0).unwrap().id).len(), 2);
    }

    #[test]
    fn tiny_tolerance() {
        let mut g = Graph::default();
        let options = options(&DEFAULT_PROFILE, 1e-20);
        GraphBuilder::new(&mut g, &options).add_features([
            line(1, &[[500000.0, 0.0], [500010.0, 0.0]], None),
            line(2, &[[500010.0, 0.0], [-500000.0, -1e10]], None),
        ]);

        assert_eq!(g.len(), 3);
        assert_eq!(g.segments().count(), 2);
        assert_eq!(g.get_edges(g.find_nearest_node(500010.0, 0.0).unwrap().id).len(), 2);
    }

    #[test]
    fn skips_degenerate_lines() {
        let mut g = Graph::default();
        let options = options(&DEFAULT_PROFILE, 0.5);
        GraphBuilder::new(&mut g, &options).add_features([
            line(1, &[[0.0, 0.0], [0.1, 0.1], [0.2, 0.0]], None),
            line(2, &[[5.0, 5.0]], None),
            line(3, &[[f64::NAN, 0.0], [7.0, 0.0], [8.0, 0.0]], None),
        ]);

        // Only the last feature has a usable segment; unused nodes are removed
        assert_eq!(g.len(), 2);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.segments().count(), 1);
        assert_eq!(g.get_segment(1).unwrap().feature_id, 3);
    }

    #[test]
    fn weights_and_directions() {
        static WEIGHTS: [Weight<'static>; 1] = [Weight {
            category: "stairs",
            weight: 4.0,
        }];
        static PROFILE: Profile<'static> = Profile {
            name: "test",
            category_field: "road_type",
            weight_field: Some("cost"),
            direction_field: Some("oneway"),
            weights: &WEIGHTS,
            default_weight: 1.0,
        };

        let mut oneway = line(2, &[[1.0, 0.0], [2.0, 0.0]], None);
        oneway.properties.insert("oneway".to_string(), "yes".into());
        let mut explicit = line(3, &[[2.0, 0.0], [3.0, 0.0]], Some("stairs"));
        explicit.properties.insert("cost".to_string(), 2.5.into());

        let mut g = Graph::default();
        let options = options(&PROFILE, 0.0);
        GraphBuilder::new(&mut g, &options).add_features([
            line(1, &[[0.0, 0.0], [1.0, 0.0]], Some("stairs")),
            oneway,
            explicit,
        ]);

        let id = |x: f64| g.find_nearest_node(x, 0.0).unwrap().id;
        assert_eq!(g.get_edge(id(0.0), id(1.0)), 4.0);
        assert_eq!(g.get_edge(id(1.0), id(2.0)), 1.0);
        assert!(g.get_edge(id(2.0), id(1.0)).is_infinite());
        assert_eq!(g.get_edge(id(3.0), id(2.0)), 2.5);
        assert_eq!(g.min_weight(), 1.0);
    }

    #[test]
    fn continues_existing_graph() {
        let mut g = Graph::default();
        let options = options(&DEFAULT_PROFILE, 0.1);
        GraphBuilder::new(&mut g, &options).add_features([line(1, &[[0.0, 0.0], [1.0, 0.0]], None)]);
        GraphBuilder::new(&mut g, &options).add_features([line(1, &[[1.0, 0.0], [2.0, 0.0]], None)]);

        assert_eq!(g.len(), 3);
        assert_eq!(g.segments().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(g.get_edges(g.find_nearest_node(1.0, 0.0).unwrap().id).len(), 2);
    }
}
