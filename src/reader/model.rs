// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use geojson::{JsonObject, Value};

/// A line feature of a road network layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    /// 1-based position of the feature in its collection.
    pub id: i64,

    /// Vertices of every part of the line; a `LineString` has exactly one part.
    pub parts: Vec<Vec<[f64; 2]>>,

    pub properties: JsonObject,
}

/// A point feature of a stop layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    /// 1-based position of the feature in its collection.
    pub id: i64,
    pub position: [f64; 2],
    pub properties: JsonObject,
}

impl LineFeature {
    /// Converts a GeoJSON feature into a [LineFeature].
    /// Returns `None` for features without a `LineString` or `MultiLineString` geometry.
    pub fn from_geojson(id: i64, f: geojson::Feature) -> Option<Self> {
        let parts = match f.geometry.map(|g| g.value) {
            Some(Value::LineString(line)) => vec![positions(&line)],
            Some(Value::MultiLineString(lines)) => lines.iter().map(|l| positions(l)).collect(),
            _ => return None,
        };

        Some(Self {
            id,
            parts,
            properties: f.properties.unwrap_or_default(),
        })
    }
}

impl PointFeature {
    /// Converts a GeoJSON feature into a [PointFeature].
    /// Returns `None` for features without a `Point` or a single-point `MultiPoint` geometry.
    pub fn from_geojson(id: i64, f: geojson::Feature) -> Option<Self> {
        let position = match f.geometry.map(|g| g.value) {
            Some(Value::Point(p)) => position(&p)?,
            Some(Value::MultiPoint(points)) if points.len() == 1 => position(&points[0])?,
            _ => return None,
        };

        Some(Self {
            id,
            position,
            properties: f.properties.unwrap_or_default(),
        })
    }
}

fn position(p: &[f64]) -> Option<[f64; 2]> {
    match p {
        [x, y, ..] => Some([*x, *y]),
        _ => None,
    }
}

fn positions(line: &[Vec<f64>]) -> Vec<[f64; 2]> {
    line.iter().filter_map(|p| position(p)).collect()
}
