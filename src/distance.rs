// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Mean radius of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6371.0088;

/// Mean diameter of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Describes how coordinates of [Nodes](crate::Node) should be interpreted
/// when computing lengths of segments and distances to stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum Metric {
    /// Coordinates are in a projected reference system,
    /// distances are euclidean and expressed in layer units.
    #[default]
    Planar = 0,

    /// Coordinates are longitude (x) and latitude (y) in degrees,
    /// distances are great-circle distances in kilometers.
    Geographic = 1,
}

impl Metric {
    /// Calculates the distance between two points, as per the metric.
    pub fn distance(self, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        match self {
            Self::Planar => planar_distance(x1, y1, x2, y2),
            Self::Geographic => earth_distance(y1, x1, y2, x2),
        }
    }
}

/// Calculates the euclidean distance between two points.
pub fn planar_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// Calculates the great-circle distance between two lat-lon positions
/// on Earth using the `haversine formula <https://en.wikipedia.org/wiki/Haversine_formula>`_.
/// Returns the result in kilometers.
pub fn earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();
    let lat2 = lat2.to_radians();
    let lon2 = lon2.to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar() {
        assert_eq!(planar_distance(0.0, 0.0, 3.0, 4.0), 5.0);
        assert_eq!(Metric::Planar.distance(1.0, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn geographic() {
        // Warsaw Centralna -> Kraków Główny
        let d = Metric::Geographic.distance(21.0034, 52.2288, 19.9474, 50.0678);
        assert!((d - 252.0).abs() < 2.0, "unexpected distance: {}", d);
    }
}
