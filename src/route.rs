// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::Point;

/// Part of a [Route] between two consecutive stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    /// Index of the stop where the leg starts.
    pub from_stop: usize,

    /// Index of the stop where the leg ends, always `from_stop + 1`.
    pub to_stop: usize,

    /// Node to which the starting stop was snapped.
    pub from_node: i64,

    /// Node to which the ending stop was snapped.
    pub to_node: i64,

    /// Ids of traversed nodes, from `from_node` to `to_node`.
    pub nodes: Vec<i64>,

    /// Ids of traversed [Segments](crate::Segment).
    pub edges: Vec<i64>,

    /// Positions of traversed nodes.
    pub geometry: Vec<Point>,

    pub cost: f64,
    pub length: f64,
}

/// Result of [planning](crate::plan) a route through multiple stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// One leg per pair of consecutive stops, in stop order.
    pub legs: Vec<Leg>,

    /// Sum of costs of all legs.
    pub cost: f64,
}

impl Route {
    pub fn new(legs: Vec<Leg>) -> Self {
        let cost = legs.iter().map(|l| l.cost).sum();
        Self { legs, cost }
    }

    /// Sum of lengths of all legs.
    pub fn length(&self) -> f64 {
        self.legs.iter().map(|l| l.length).sum()
    }

    /// Returns positions of all traversed nodes, with the position shared
    /// by the end of a leg and the start of the next one included only once.
    pub fn geometry(&self) -> Vec<Point> {
        let mut points: Vec<Point> = Vec::default();
        for leg in &self.legs {
            let skip = match (points.last(), leg.geometry.first()) {
                (Some(last), Some(first)) if last == first => 1,
                _ => 0,
            };
            points.extend(leg.geometry.iter().skip(skip));
        }
        points
    }

    /// Converts the route into a GeoJSON FeatureCollection, with one LineString
    /// feature per leg, and the total cost stored in a `total_cost` foreign member.
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self.legs.iter().enumerate().map(|(idx, leg)| leg.to_feature(idx)).collect();

        let mut foreign_members = JsonObject::new();
        foreign_members.insert("total_cost".to_string(), json!(self.cost));
        foreign_members.insert("total_length".to_string(), json!(self.length()));

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }
}

impl Leg {
    fn to_feature(&self, idx: usize) -> Feature {
        // A LineString needs at least 2 positions, even for legs without edges
        let mut coordinates: Vec<Vec<f64>> = self.geometry.iter().map(|p| vec![p.x, p.y]).collect();
        if coordinates.len() == 1 {
            coordinates.push(coordinates[0].clone());
        }

        let properties = json!({
            "leg": idx,
            "from_stop": self.from_stop,
            "to_stop": self.to_stop,
            "from_node": self.from_node,
            "to_node": self.to_node,
            "cost": self.cost,
            "length": self.length,
            "segments": self.edges,
        });

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(coordinates))),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(from_stop: usize, geometry: &[(f64, f64)], cost: f64) -> Leg {
        Leg {
            from_stop,
            to_stop: from_stop + 1,
            from_node: 1,
            to_node: 2,
            nodes: (1..=geometry.len() as i64).collect(),
            edges: (1..geometry.len() as i64).collect(),
            geometry: geometry.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            cost,
            length: geometry.len().saturating_sub(1) as f64,
        }
    }

    #[test]
    fn geometry_joins_legs() {
        let route = Route::new(vec![
            leg(0, &[(0.0, 0.0), (1.0, 0.0)], 1.0),
            leg(1, &[(1.0, 0.0), (1.0, 1.0), (2.0, 1.0)], 2.0),
            leg(2, &[(2.0, 1.0)], 0.0),
        ]);

        assert_eq!(route.cost, 3.0);
        assert_eq!(route.length(), 3.0);
        assert_eq!(
            route.geometry(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(2.0, 1.0),
            ]
        );
    }

    #[test]
    fn to_geojson() {
        let route = Route::new(vec![
            leg(0, &[(0.0, 0.0), (1.0, 0.0)], 1.5),
            leg(1, &[(1.0, 0.0)], 0.0),
        ]);

        let fc = route.to_geojson();
        assert_eq!(fc.features.len(), 2);
        assert_eq!(
            fc.foreign_members.as_ref().unwrap().get("total_cost"),
            Some(&json!(1.5))
        );

        let first = &fc.features[0];
        assert_eq!(
            first.geometry.as_ref().unwrap().value,
            Value::LineString(vec![vec![0.0, 0.0], vec![1.0, 0.0]])
        );
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props.get("leg"), Some(&json!(0)));
        assert_eq!(props.get("cost"), Some(&json!(1.5)));
        assert_eq!(props.get("segments"), Some(&json!([1])));

        // Single-node legs are still valid LineStrings
        assert_eq!(
            fc.features[1].geometry.as_ref().unwrap().value,
            Value::LineString(vec![vec![1.0, 0.0], vec![1.0, 0.0]])
        );

        let serialized = serde_json::to_value(&fc).unwrap();
        assert_eq!(serialized["type"], "FeatureCollection");
        assert_eq!(serialized["total_cost"], 1.5);
    }
}
