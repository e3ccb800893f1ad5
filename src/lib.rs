// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Multi-stop least-cost routing over weighted road networks.
//!
//! Line features (e.g. from a GIS layer exported to GeoJSON) are converted into a
//! weighted directed graph, where the cost of every segment is its length
//! multiplied by a desirability weight of its road type. The weights come from
//! an explicit [table](crate::profile::Profile). An ordered list of stops is then
//! snapped to the nearest graph nodes, and each consecutive pair of stops is
//! connected by an independent least-cost leg.
//!
//! # Example
//!
//! ```no_run
//! let mut g = multistop::Graph::default();
//! let options = multistop::reader::Options {
//!     profile: &multistop::profile::DEFAULT_PROFILE,
//!     file_format: multistop::reader::FileFormat::Unknown,
//!     metric: multistop::Metric::Planar,
//!     tolerance: 0.01,
//! };
//! multistop::reader::add_features_from_file(&mut g, &options, "path/to/roads.geojson")
//!     .expect("failed to load the road network");
//!
//! let stops = multistop::reader::read_stops_from_file(
//!     multistop::reader::FileFormat::Unknown,
//!     Some("order_id"),
//!     "path/to/stops.geojson",
//! )
//! .expect("failed to load stops");
//!
//! let route = multistop::plan(&g, &stops, &multistop::PlanOptions::default())
//!     .expect("failed to plan the route");
//!
//! println!("Total cost: {}", route.cost);
//! ```

pub mod c;
mod distance;
mod graph;
mod kd;
mod network;
mod planner;
pub mod profile;
pub mod reader;
mod route;
mod search;
pub mod topology;

pub use distance::{earth_distance, planar_distance, Metric};
pub use graph::Graph;
pub use kd::KDTree;
pub use network::{IndexedGraph, Network, Snap};
pub use planner::{plan, PlanError, PlanOptions, SnapPolicy};
pub use route::{Leg, Route};
pub use search::{find_path, Path, SearchError, DEFAULT_STEP_LIMIT};

/// Represents an element of the [Graph] - a point where segments of
/// line features meet.
///
/// Nodes with `id == 0` are disallowed, as zero is used by the C bindings
/// to signify absence of nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Node {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

impl Node {
    pub const ZERO: Self = Self {
        id: 0,
        x: 0.0,
        y: 0.0,
    };
}

/// Represents an outgoing (one-way) connection from a specific [Node].
///
/// `id` refers to the [Segment] from which the edge was created; both directions
/// of a two-way segment share the same `id`.
///
/// `cost` must be finite and greater than zero. `length` is not required to match
/// the distance between the nodes; route search bounds its estimates with
/// [Graph::min_cost_per_unit] instead.
///
/// Due to implementation details, `to` might not exist in the [Graph].
/// Users must silently ignore such edges.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Edge {
    pub id: i64,
    pub to: i64,
    pub cost: f64,
    pub length: f64,
}

/// Describes a single vertex-to-vertex piece of a line feature,
/// from which one or two [Edges](Edge) are created.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: i64,

    /// 1-based position of the source line feature in its collection.
    pub feature_id: i64,

    pub from: i64,
    pub to: i64,

    /// Length of the piece, which may be an abstract value
    /// unrelated to the positions of `from` and `to`.
    pub length: f64,

    /// Road-type category of the source feature, if any.
    pub category: Option<String>,

    /// Desirability weight applied to the length to get the cost.
    pub weight: f32,
}

/// A location of a stop, in the same coordinate system as the [Graph].
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
