// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Loading of road networks and stops from [GeoJSON](https://geojson.org/) layers.

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use geojson::GeoJson;
use graph_builder::GraphBuilder;

use crate::profile::Profile;
use crate::{Graph, Metric, Point};

mod graph_builder;
mod model;

pub use model::{LineFeature, PointFeature};

/// Format of the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum FileFormat {
    /// Unknown format - guess the compression based on the content
    Unknown = 0,

    /// Force uncompressed GeoJSON
    GeoJson = 1,

    /// Force GeoJSON with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    GeoJsonGz = 2,

    /// Force GeoJSON with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    GeoJsonBz2 = 3,
}

/// Additional controls for interpreting line features as a routing [Graph].
#[derive(Debug)]
pub struct Options<'a> {
    /// How line features should be weighted.
    pub profile: &'a Profile<'a>,

    /// Format of the input data.
    pub file_format: FileFormat,

    /// How coordinates should be interpreted when computing segment lengths.
    /// Overrides the [Metric] of the graph.
    pub metric: Metric,

    /// Vertices closer than this (planar) distance, in raw coordinate units,
    /// are considered coincident and become a single node. Zero requires exact
    /// coincidence; negative and non-finite values are treated as zero.
    pub tolerance: f64,
}

/// Error which can occur when loading layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a GeoJSON Feature or FeatureCollection")]
    NotAFeatureCollection,

    #[error("profile {0:?}: all weights must be finite and greater than zero")]
    InvalidProfile(String),

    #[error("stop {feature}: missing {field:?} attribute")]
    MissingOrderField { feature: i64, field: String },

    #[error("stop {feature}: {field:?} attribute must be a number or a string")]
    InvalidOrderValue { feature: i64, field: String },

    #[error("{field:?} attribute mixes numbers and strings, which can't be sorted")]
    MixedOrderTypes { field: String },
}

/// Parse line features from a reader into a [Graph] as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn add_features_from_io<'a, R: io::Read>(
    g: &'a mut Graph,
    options: &'a Options<'a>,
    reader: R,
) -> Result<(), Error> {
    if !options.profile.is_valid() {
        return Err(Error::InvalidProfile(options.profile.name.to_string()));
    }

    let features = parse_features(options.file_format, reader)?
        .into_iter()
        .enumerate()
        .filter_map(|(idx, f)| {
            let id = idx as i64 + 1;
            let line = LineFeature::from_geojson(id, f);
            if line.is_none() {
                log::debug!("feature {}: not a line - skipping", id);
            }
            line
        });

    GraphBuilder::new(g, options).add_features(features);
    Ok(())
}

/// Parse line features from a file at the provided path into a [Graph] as per the provided [Options].
pub fn add_features_from_file<'a, P: AsRef<Path>>(
    g: &'a mut Graph,
    options: &'a Options<'a>,
    path: P,
) -> Result<(), Error> {
    let f = File::open(path)?;
    add_features_from_io(g, options, f)
}

/// Parse line features from a static buffer into a [Graph] as per the provided [Options].
pub fn add_features_from_buffer<'a>(
    g: &'a mut Graph,
    options: &'a Options<'a>,
    data: &[u8],
) -> Result<(), Error> {
    add_features_from_io(g, options, io::Cursor::new(data))
}

/// Reads stop locations from point features, sorted by the `order_field` attribute.
///
/// The attribute must be present on every stop, and must either be a number on every stop,
/// or a string on every stop. Stops with equal order values keep their relative position.
/// If `order_field` is `None`, stops are returned in their original order.
///
/// Features without a point geometry are skipped.
pub fn read_stops_from_io<R: io::Read>(
    file_format: FileFormat,
    order_field: Option<&str>,
    reader: R,
) -> Result<Vec<Point>, Error> {
    let stops: Vec<PointFeature> = parse_features(file_format, reader)?
        .into_iter()
        .enumerate()
        .filter_map(|(idx, f)| {
            let id = idx as i64 + 1;
            let point = PointFeature::from_geojson(id, f);
            if point.is_none() {
                log::warn!("stop {}: not a point - skipping", id);
            }
            point
        })
        .collect();

    let stops = match order_field {
        Some(field) => sort_stops(stops, field)?,
        None => stops,
    };

    Ok(stops
        .into_iter()
        .map(|s| Point::new(s.position[0], s.position[1]))
        .collect())
}

/// Reads stop locations from a file at the provided path, see [read_stops_from_io].
pub fn read_stops_from_file<P: AsRef<Path>>(
    file_format: FileFormat,
    order_field: Option<&str>,
    path: P,
) -> Result<Vec<Point>, Error> {
    let f = File::open(path)?;
    read_stops_from_io(file_format, order_field, f)
}

/// Reads stop locations from a static buffer, see [read_stops_from_io].
pub fn read_stops_from_buffer(
    file_format: FileFormat,
    order_field: Option<&str>,
    data: &[u8],
) -> Result<Vec<Point>, Error> {
    read_stops_from_io(file_format, order_field, io::Cursor::new(data))
}

#[derive(Debug, Clone, PartialEq)]
enum OrderKey {
    Number(f64),
    Text(String),
}

fn sort_stops(stops: Vec<PointFeature>, field: &str) -> Result<Vec<PointFeature>, Error> {
    let mut keyed = stops
        .into_iter()
        .map(|s| {
            let key = match s.properties.get(field) {
                None | Some(serde_json::Value::Null) => {
                    return Err(Error::MissingOrderField {
                        feature: s.id,
                        field: field.to_string(),
                    })
                }
                Some(serde_json::Value::String(text)) => OrderKey::Text(text.clone()),
                Some(v) => match v.as_f64() {
                    Some(n) if !n.is_nan() => OrderKey::Number(n),
                    _ => {
                        return Err(Error::InvalidOrderValue {
                            feature: s.id,
                            field: field.to_string(),
                        })
                    }
                },
            };
            Ok((key, s))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let numbers = keyed
        .iter()
        .filter(|(k, _)| matches!(k, OrderKey::Number(_)))
        .count();
    if numbers != 0 && numbers != keyed.len() {
        return Err(Error::MixedOrderTypes {
            field: field.to_string(),
        });
    }

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (OrderKey::Number(a), OrderKey::Number(b)) => a.total_cmp(b),
        (OrderKey::Text(a), OrderKey::Text(b)) => a.cmp(b),
        _ => unreachable!("order keys were checked to be of the same type"),
    });

    Ok(keyed.into_iter().map(|(_, s)| s).collect())
}

/// Decompresses (as per the [FileFormat]) and parses a GeoJSON object,
/// returning all of its features.
fn parse_features<R: io::Read>(
    file_format: FileFormat,
    reader: R,
) -> Result<Vec<geojson::Feature>, Error> {
    let mut b = io::BufReader::new(reader);

    let file_format = match file_format {
        FileFormat::Unknown => detect_format(b.fill_buf()?),
        known => known,
    };

    let parsed: GeoJson = match file_format {
        FileFormat::Unknown | FileFormat::GeoJson => serde_json::from_reader(b)?,
        FileFormat::GeoJsonGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            serde_json::from_reader(io::BufReader::new(d))?
        }
        FileFormat::GeoJsonBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            serde_json::from_reader(io::BufReader::new(d))?
        }
    };

    match parsed {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        GeoJson::Feature(f) => Ok(vec![f]),
        GeoJson::Geometry(_) => Err(Error::NotAFeatureCollection),
    }
}

/// Guesses the [FileFormat] from the first bytes of the data.
fn detect_format(head: &[u8]) -> FileFormat {
    if head.starts_with(&[0x1f, 0x8b]) {
        FileFormat::GeoJsonGz
    } else if head.starts_with(b"BZh") {
        FileFormat::GeoJsonBz2
    } else {
        FileFormat::GeoJson
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DEFAULT_PROFILE;

    const NETWORK: &[u8] = include_bytes!("test_fixtures/network.geojson");
    const NETWORK_GZ: &[u8] = include_bytes!("test_fixtures/network.geojson.gz");
    const NETWORK_BZ2: &[u8] = include_bytes!("test_fixtures/network.geojson.bz2");
    const STOPS: &[u8] = include_bytes!("test_fixtures/stops.geojson");

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-4),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn options(file_format: FileFormat) -> Options<'static> {
        Options {
            profile: &DEFAULT_PROFILE,
            file_format,
            metric: Metric::Planar,
            tolerance: 0.5,
        }
    }

    fn load(data: &[u8], file_format: FileFormat) -> Graph {
        let mut g = Graph::default();
        add_features_from_buffer(&mut g, &options(file_format), data).unwrap();
        g
    }

    fn node_at(g: &Graph, x: f64, y: f64) -> i64 {
        let snap = g.snap(x, y).unwrap();
        assert!(snap.distance < 0.5, "no node at ({}, {})", x, y);
        snap.node.id
    }

    fn check_network(g: &Graph) {
        // (0,100)
        //    │ park-path
        // (0,0)──────(100,0)──────(200,0)
        //        road  │  bike-path
        //              │ embankment-road (100,0.3 starts the line)
        //           (100,-100)
        //
        // The point feature and the polygon are skipped.
        assert_eq!(g.len(), 5);
        assert_eq!(g.edge_count(), 8);

        let a = node_at(g, 0.0, 0.0);
        let b = node_at(g, 100.0, 0.0);
        let c = node_at(g, 200.0, 0.0);
        let d = node_at(g, 100.0, -100.0);
        let e = node_at(g, 0.0, 100.0);

        // Default weight 0.1
        assert_almost_eq!(g.get_edge(a, b), 10.0);
        assert_eq!(g.get_edge(a, b), g.get_edge(b, a));

        // bike-path, 25
        assert_almost_eq!(g.get_edge(b, c), 2500.0);

        // embankment-road, 100; the first vertex was merged into b
        assert_almost_eq!(g.get_edge(b, d), 10000.0);

        // park-path, 50, as a MultiLineString
        assert_almost_eq!(g.get_edge(a, e), 5000.0);

        let categories: Vec<Option<&str>> =
            g.segments().map(|s| s.category.as_deref()).collect();
        assert_eq!(
            categories,
            vec![None, Some("bike-path"), Some("embankment-road"), Some("park-path")]
        );
    }

    #[test]
    fn build_graph() {
        check_network(&load(NETWORK, FileFormat::GeoJson));
    }

    #[test]
    fn build_graph_gz() {
        check_network(&load(NETWORK_GZ, FileFormat::GeoJsonGz));
    }

    #[test]
    fn build_graph_bz2() {
        check_network(&load(NETWORK_BZ2, FileFormat::GeoJsonBz2));
    }

    #[test]
    fn build_graph_detects_format() {
        let plain = load(NETWORK, FileFormat::Unknown);
        assert_eq!(plain, load(NETWORK_GZ, FileFormat::Unknown));
        assert_eq!(plain, load(NETWORK_BZ2, FileFormat::Unknown));
    }

    #[test]
    fn invalid_profile() {
        let weights = [crate::profile::Weight {
            category: "bike-path",
            weight: -1.0,
        }];
        let profile = Profile {
            name: "broken",
            weights: &weights,
            ..DEFAULT_PROFILE
        };
        let options = Options {
            profile: &profile,
            ..options(FileFormat::GeoJson)
        };

        let mut g = Graph::default();
        let err = add_features_from_buffer(&mut g, &options, NETWORK).unwrap_err();
        assert!(matches!(err, Error::InvalidProfile(name) if name == "broken"));
        assert!(g.is_empty());
    }

    #[test]
    fn not_a_feature_collection() {
        let mut g = Graph::default();
        let err = add_features_from_buffer(
            &mut g,
            &options(FileFormat::GeoJson),
            br#"{"type": "Point", "coordinates": [1, 2]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotAFeatureCollection));

        let err = add_features_from_buffer(&mut g, &options(FileFormat::GeoJson), b"[1, 2")
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn read_stops() {
        let stops = read_stops_from_buffer(FileFormat::Unknown, Some("order_id"), STOPS).unwrap();
        assert_eq!(
            stops,
            vec![
                Point::new(0.0, 100.0),
                Point::new(200.0, 0.0),
                Point::new(100.0, -100.0),
            ]
        );

        let stops = read_stops_from_buffer(FileFormat::GeoJson, None, STOPS).unwrap();
        assert_eq!(
            stops,
            vec![
                Point::new(100.0, -100.0),
                Point::new(0.0, 100.0),
                Point::new(200.0, 0.0),
            ]
        );
    }

    #[test]
    fn read_stops_by_text() {
        const DATA: &[u8] = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"seq": "b"}, "geometry": {"type": "Point", "coordinates": [2, 0]}},
                {"type": "Feature", "properties": {"seq": "a"}, "geometry": {"type": "MultiPoint", "coordinates": [[1, 0]]}},
                {"type": "Feature", "properties": {"seq": "b"}, "geometry": {"type": "Point", "coordinates": [3, 0]}}
            ]
        }"#;

        let stops = read_stops_from_buffer(FileFormat::GeoJson, Some("seq"), DATA).unwrap();
        assert_eq!(
            stops,
            vec![Point::new(1.0, 0.0), Point::new(2.0, 0.0), Point::new(3.0, 0.0)]
        );
    }

    #[test]
    fn read_stops_errors() {
        const MISSING: &[u8] = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"seq": 1}, "geometry": {"type": "Point", "coordinates": [2, 0]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1, 0]}}
            ]
        }"#;
        let err = read_stops_from_buffer(FileFormat::GeoJson, Some("seq"), MISSING).unwrap_err();
        assert!(matches!(err, Error::MissingOrderField { feature: 2, .. }));

        const MIXED: &[u8] = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"seq": 1}, "geometry": {"type": "Point", "coordinates": [2, 0]}},
                {"type": "Feature", "properties": {"seq": "2"}, "geometry": {"type": "Point", "coordinates": [1, 0]}}
            ]
        }"#;
        let err = read_stops_from_buffer(FileFormat::GeoJson, Some("seq"), MIXED).unwrap_err();
        assert!(matches!(err, Error::MixedOrderTypes { .. }));

        const INVALID: &[u8] = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"seq": [1]}, "geometry": {"type": "Point", "coordinates": [2, 0]}}
            ]
        }"#;
        let err = read_stops_from_buffer(FileFormat::GeoJson, Some("seq"), INVALID).unwrap_err();
        assert!(matches!(err, Error::InvalidOrderValue { feature: 1, .. }));
    }

    #[test]
    fn detect() {
        assert_eq!(detect_format(b"{\"type\""), FileFormat::GeoJson);
        assert_eq!(detect_format(&NETWORK_GZ[..4]), FileFormat::GeoJsonGz);
        assert_eq!(detect_format(&NETWORK_BZ2[..4]), FileFormat::GeoJsonBz2);
        assert_eq!(detect_format(b""), FileFormat::GeoJson);
    }
}
