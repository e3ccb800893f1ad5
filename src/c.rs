// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::*;

use std::borrow::Cow;
use std::ffi::{c_char, CStr, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::ptr::{null, null_mut};
use std::slice;

type CGraphIterator<'a> = Box<dyn Iterator<Item = &'a Node> + 'a>;

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_new(metric: Metric) -> *mut Graph {
    Box::into_raw(Box::new(Graph::new(metric)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_delete(ptr: *mut Graph) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_len(graph: *const Graph) -> usize {
    graph.as_ref().map(|g| g.len()).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_get_nodes(
    graph: *const Graph,
    iterator_ptr: *mut *mut CGraphIterator<'_>,
) -> usize {
    if let Some(graph) = graph.as_ref() {
        if !iterator_ptr.is_null() {
            let it: CGraphIterator<'_> = Box::new(graph.iter());
            *iterator_ptr = Box::into_raw(Box::new(it));
        }

        graph.len()
    } else {
        if !iterator_ptr.is_null() {
            *iterator_ptr = null_mut();
        }

        0
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_iterator_next(iterator: *mut CGraphIterator<'_>) -> Node {
    iterator
        .as_mut()
        .and_then(|it| it.next().copied())
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_iterator_delete(iterator: *mut CGraphIterator<'_>) {
    if !iterator.is_null() {
        drop(Box::from_raw(iterator));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_get_node(graph: *const Graph, id: i64) -> Node {
    graph
        .as_ref()
        .and_then(|g| g.get_node(id))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_find_nearest_node(
    graph: *const Graph,
    x: f64,
    y: f64,
) -> Node {
    graph
        .as_ref()
        .and_then(|g| g.find_nearest_node(x, y))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_get_edges(
    graph: *const Graph,
    from_id: i64,
    out_edges: *mut *const Edge,
) -> usize {
    if let Some(graph) = graph.as_ref() {
        let edges = graph.get_edges(from_id);
        if !out_edges.is_null() {
            *out_edges = edges.as_ptr();
        }

        edges.len()
    } else {
        if !out_edges.is_null() {
            *out_edges = null();
        }

        0
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_get_edge(
    graph: *const Graph,
    from_id: i64,
    to_id: i64,
) -> f64 {
    graph
        .as_ref()
        .map(|g| g.get_edge(from_id, to_id))
        .unwrap_or(f64::INFINITY)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_count_dangles(graph: *const Graph) -> usize {
    graph
        .as_ref()
        .map(|g| topology::find_dangles(g).len())
        .unwrap_or(0)
}

#[repr(C)]
pub struct CWeight {
    category: *const c_char,
    weight: f32,
}

#[repr(C)]
pub struct CProfile {
    name: *const c_char,
    category_field: *const c_char,

    /// May be NULL
    weight_field: *const c_char,

    /// May be NULL
    direction_field: *const c_char,

    weights: *const CWeight,
    weights_len: usize,

    default_weight: f32,
}

unsafe fn c_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

unsafe fn c_slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len)
    }
}

impl CProfile {
    /// Builds a buffer containing all strings referenced by this Profile.
    ///
    /// The layout of the buffer is as follows:
    /// - 0: name
    /// - 1: category_field
    /// - 2: weight_field (empty if NULL)
    /// - 3: direction_field (empty if NULL)
    /// - 4..4 + weights_len: weight categories
    unsafe fn build_string_table(&self) -> Vec<Cow<'_, str>> {
        let mut table = Vec::with_capacity(4 + self.weights_len);
        table.push(c_str(self.name));
        table.push(c_str(self.category_field));
        table.push(c_str(self.weight_field));
        table.push(c_str(self.direction_field));
        table.extend(
            c_slice(self.weights, self.weights_len)
                .iter()
                .map(|w| c_str(w.category)),
        );
        table
    }

    unsafe fn weights_as_rust<'a>(&self, string_table: &'a [Cow<'_, str>]) -> Vec<profile::Weight<'a>> {
        c_slice(self.weights, self.weights_len)
            .iter()
            .zip(&string_table[4..])
            .map(|(w, category)| profile::Weight {
                category: category.as_ref(),
                weight: w.weight,
            })
            .collect()
    }

    fn as_rust<'a>(
        &self,
        string_table: &'a [Cow<'_, str>],
        weights: &'a [profile::Weight<'a>],
    ) -> profile::Profile<'a> {
        profile::Profile {
            name: &string_table[0],
            category_field: &string_table[1],
            weight_field: (!self.weight_field.is_null()).then(|| &*string_table[2]),
            direction_field: (!self.direction_field.is_null()).then(|| &*string_table[3]),
            weights,
            default_weight: self.default_weight,
        }
    }
}

#[repr(C)]
pub struct COptions {
    pub profile: *const CProfile,
    pub format: reader::FileFormat,
    pub metric: Metric,
    pub tolerance: f64,
}

unsafe fn add_features_with_c_options<F>(c_options: &COptions, add: F) -> bool
where
    F: FnOnce(&reader::Options<'_>) -> Result<(), reader::Error>,
{
    let Some(c_profile) = c_options.profile.as_ref() else {
        log::error!("MultistopOptions.profile must not be NULL");
        return false;
    };

    let profile_strings = c_profile.build_string_table();
    let profile_weights = c_profile.weights_as_rust(&profile_strings);
    let profile = c_profile.as_rust(&profile_strings, &profile_weights);
    let options = reader::Options {
        profile: &profile,
        file_format: c_options.format,
        metric: c_options.metric,
        tolerance: c_options.tolerance,
    };

    match add(&options) {
        Ok(()) => true,
        Err(e) => {
            log::error!("failed to load line features: {}", e);
            false
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_add_from_file(
    graph: *mut Graph,
    c_options: *const COptions,
    c_filename: *const c_char,
) -> bool {
    if c_filename.is_null() {
        return false;
    }

    if let (Some(graph), Some(c_options)) = (graph.as_mut(), c_options.as_ref()) {
        let filename = OsStr::from_bytes(CStr::from_ptr(c_filename).to_bytes());
        add_features_with_c_options(c_options, |options| {
            reader::add_features_from_file(graph, options, filename)
        })
    } else {
        false
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_graph_add_from_memory(
    graph: *mut Graph,
    c_options: *const COptions,
    content: *const u8,
    content_len: usize,
) -> bool {
    if let (Some(graph), Some(c_options)) = (graph.as_mut(), c_options.as_ref()) {
        let content = c_slice(content, content_len);
        add_features_with_c_options(c_options, |options| {
            reader::add_features_from_buffer(graph, options, content)
        })
    } else {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum CPlanResultType {
    Ok = 0,
    InsufficientStops = 1,
    EmptyGraph = 2,
    UnreachableStop = 3,
    AmbiguousSnap = 4,
    StepLimitExceeded = 5,
    InvalidStop = 6,
}

/// Outcome of [multistop_plan].
///
/// `route` is only set for [CPlanResultType::Ok], and must be freed with [multistop_route_delete].
/// `index` is the number of stops for InsufficientStops, the offending leg for
/// UnreachableStop and StepLimitExceeded, and the offending stop for AmbiguousSnap
/// and InvalidStop.
#[repr(C)]
pub struct CPlanResult {
    pub route: *mut Route,
    pub index: usize,
    pub type_: CPlanResultType,
}

impl CPlanResult {
    fn error(type_: CPlanResultType, index: usize) -> Self {
        Self {
            route: null_mut(),
            index,
            type_,
        }
    }
}

impl From<Result<Route, PlanError>> for CPlanResult {
    fn from(value: Result<Route, PlanError>) -> Self {
        match value {
            Ok(route) => CPlanResult {
                route: Box::into_raw(Box::new(route)),
                index: 0,
                type_: CPlanResultType::Ok,
            },
            Err(PlanError::InsufficientStops(n)) => Self::error(CPlanResultType::InsufficientStops, n),
            Err(PlanError::EmptyGraph) => Self::error(CPlanResultType::EmptyGraph, 0),
            Err(PlanError::UnreachableStop { leg, .. }) => {
                Self::error(CPlanResultType::UnreachableStop, leg)
            }
            Err(PlanError::InvalidStop { stop }) => Self::error(CPlanResultType::InvalidStop, stop),
            Err(PlanError::AmbiguousSnap { stop, .. }) => {
                Self::error(CPlanResultType::AmbiguousSnap, stop)
            }
            Err(PlanError::StepLimitExceeded { leg }) => {
                Self::error(CPlanResultType::StepLimitExceeded, leg)
            }
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_plan(
    graph: *const Graph,
    stops: *const Point,
    stops_len: usize,
    step_limit: usize,
    snap_policy: SnapPolicy,
) -> CPlanResult {
    let stops = c_slice(stops, stops_len);
    let options = PlanOptions {
        step_limit,
        snap_policy,
    };

    match graph.as_ref() {
        Some(graph) => plan(&IndexedGraph::new(graph), stops, &options).into(),
        None => CPlanResult::error(CPlanResultType::EmptyGraph, 0),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_route_delete(route: *mut Route) {
    if !route.is_null() {
        drop(Box::from_raw(route));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_route_cost(route: *const Route) -> f64 {
    route.as_ref().map(|r| r.cost).unwrap_or(f64::NAN)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_route_legs_len(route: *const Route) -> usize {
    route.as_ref().map(|r| r.legs.len()).unwrap_or(0)
}

/// Summary of a single [Leg]. Pointers borrow from the [Route] and are invalidated
/// by [multistop_route_delete].
#[repr(C)]
pub struct CLeg {
    pub from_stop: usize,
    pub to_stop: usize,
    pub from_node: i64,
    pub to_node: i64,
    pub cost: f64,
    pub length: f64,

    pub nodes: *const i64,
    pub nodes_len: usize,

    pub segments: *const i64,
    pub segments_len: usize,
}

impl CLeg {
    const ZERO: Self = Self {
        from_stop: 0,
        to_stop: 0,
        from_node: 0,
        to_node: 0,
        cost: f64::NAN,
        length: f64::NAN,
        nodes: null(),
        nodes_len: 0,
        segments: null(),
        segments_len: 0,
    };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_route_get_leg(route: *const Route, idx: usize) -> CLeg {
    route
        .as_ref()
        .and_then(|r| r.legs.get(idx))
        .map(|leg| CLeg {
            from_stop: leg.from_stop,
            to_stop: leg.to_stop,
            from_node: leg.from_node,
            to_node: leg.to_node,
            cost: leg.cost,
            length: leg.length,
            nodes: leg.nodes.as_ptr(),
            nodes_len: leg.nodes.len(),
            segments: leg.edges.as_ptr(),
            segments_len: leg.edges.len(),
        })
        .unwrap_or(CLeg::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_kd_tree_new(graph: *const Graph) -> *mut KDTree {
    if let Some(graph) = graph.as_ref() {
        if let Some(kd) = KDTree::build_from_graph(graph) {
            return Box::into_raw(Box::new(kd));
        }
    }

    null_mut()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_kd_tree_delete(ptr: *mut KDTree) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_kd_tree_find_nearest_node(
    kd_tree: *const KDTree,
    x: f64,
    y: f64,
) -> Node {
    kd_tree
        .as_ref()
        .map(|kd| kd.find_nearest_node(x, y))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn multistop_earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    earth_distance(lat1, lon1, lat2, lon2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &[u8] = br#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"road_type": "road"}, "geometry": {"type": "LineString", "coordinates": [[0, 0], [10, 0]]}},
        {"type": "Feature", "properties": {"road_type": "park-path"}, "geometry": {"type": "LineString", "coordinates": [[10, 0], [20, 0]]}}
    ]}"#;

    fn c_profile(weights: &[CWeight]) -> CProfile {
        CProfile {
            name: c"test".as_ptr(),
            category_field: c"road_type".as_ptr(),
            weight_field: null(),
            direction_field: null(),
            weights: weights.as_ptr(),
            weights_len: weights.len(),
            default_weight: 1.0,
        }
    }

    unsafe fn load(profile: &CProfile) -> *mut Graph {
        let options = COptions {
            profile: profile as *const CProfile,
            format: reader::FileFormat::GeoJson,
            metric: Metric::Planar,
            tolerance: 0.0,
        };

        let g = multistop_graph_new(Metric::Planar);
        assert!(multistop_graph_add_from_memory(
            g,
            &options,
            NETWORK.as_ptr(),
            NETWORK.len(),
        ));
        g
    }

    #[test]
    fn profile_conversion() {
        let weights = [CWeight {
            category: c"park-path".as_ptr(),
            weight: 50.0,
        }];
        let c_profile = c_profile(&weights);

        unsafe {
            let strings = c_profile.build_string_table();
            let weights = c_profile.weights_as_rust(&strings);
            let profile = c_profile.as_rust(&strings, &weights);

            assert_eq!(profile.name, "test");
            assert_eq!(profile.category_field, "road_type");
            assert_eq!(profile.weight_field, None);
            assert_eq!(profile.direction_field, None);
            assert_eq!(profile.weight_of(Some("park-path")), 50.0);
            assert_eq!(profile.weight_of(Some("road")), 1.0);
        }
    }

    #[test]
    fn plan_through_c_api() {
        let weights = [CWeight {
            category: c"park-path".as_ptr(),
            weight: 50.0,
        }];
        let profile = c_profile(&weights);

        unsafe {
            let g = load(&profile);
            assert_eq!(multistop_graph_len(g), 3);
            assert_eq!(multistop_graph_count_dangles(g), 2);

            let stops = [Point::new(0.0, 0.0), Point::new(20.0, 0.0)];
            let result = multistop_plan(g, stops.as_ptr(), stops.len(), DEFAULT_STEP_LIMIT, SnapPolicy::LowestId);
            assert_eq!(result.type_, CPlanResultType::Ok);
            assert_eq!(multistop_route_cost(result.route), 510.0);
            assert_eq!(multistop_route_legs_len(result.route), 1);

            let leg = multistop_route_get_leg(result.route, 0);
            assert_eq!(leg.nodes_len, 3);
            assert_eq!(leg.segments_len, 2);
            assert_eq!(slice::from_raw_parts(leg.segments, leg.segments_len), &[1, 2]);
            assert_eq!(multistop_route_get_leg(result.route, 1).nodes_len, 0);

            multistop_route_delete(result.route);
            multistop_graph_delete(g);
        }
    }

    #[test]
    fn plan_errors_through_c_api() {
        let profile = c_profile(&[]);

        unsafe {
            let g = load(&profile);
            let stops = [Point::new(0.0, 0.0)];
            let result = multistop_plan(g, stops.as_ptr(), stops.len(), DEFAULT_STEP_LIMIT, SnapPolicy::LowestId);
            assert_eq!(result.type_, CPlanResultType::InsufficientStops);
            assert_eq!(result.index, 1);
            assert!(result.route.is_null());

            let stops = [Point::new(0.0, 0.0), Point::new(f64::NAN, 0.0)];
            let result = multistop_plan(g, stops.as_ptr(), stops.len(), DEFAULT_STEP_LIMIT, SnapPolicy::LowestId);
            assert_eq!(result.type_, CPlanResultType::InvalidStop);
            assert_eq!(result.index, 1);
            assert!(result.route.is_null());
            multistop_graph_delete(g);

            let empty = multistop_graph_new(Metric::Planar);
            let stops = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
            let result = multistop_plan(empty, stops.as_ptr(), stops.len(), DEFAULT_STEP_LIMIT, SnapPolicy::LowestId);
            assert_eq!(result.type_, CPlanResultType::EmptyGraph);
            multistop_graph_delete(empty);
        }
    }

    #[test]
    fn missing_profile() {
        let options = COptions {
            profile: null(),
            format: reader::FileFormat::GeoJson,
            metric: Metric::Planar,
            tolerance: 0.0,
        };

        unsafe {
            let g = multistop_graph_new(Metric::Planar);
            assert!(!multistop_graph_add_from_memory(g, &options, NETWORK.as_ptr(), NETWORK.len()));
            assert_eq!(multistop_graph_len(g), 0);
            multistop_graph_delete(g);
        }
    }
}
