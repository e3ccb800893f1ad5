// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use geojson::JsonObject;

/// Describes how line features are converted into a weighted [Graph](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the profile. Not used for data interpretation.
    pub name: &'a str,

    /// Name of the attribute holding the road-type category of a line feature.
    pub category_field: &'a str,

    /// Name of an optional numeric attribute holding a per-feature weight.
    ///
    /// If set, and a feature has a finite, positive number under this attribute,
    /// that number is used instead of looking up [Profile::weights].
    /// This supports layers which already carry a precomputed multiplier.
    pub weight_field: Option<&'a str>,

    /// Name of an optional attribute restricting the direction of travel,
    /// see [Profile::direction].
    pub direction_field: Option<&'a str>,

    /// Table of road-type categories and their desirability weights.
    ///
    /// A feature's category is matched against all [Weight] objects in order,
    /// and the first exact match is used. Each segment of the feature then gets
    /// a cost equal to its length multiplied by the weight. Lower cost is more desirable.
    ///
    /// All weights must be finite and greater than zero.
    ///
    /// For example, with two weights:
    /// 1. category=park-path, weight=50
    /// 2. category=bike-path, weight=25
    ///
    /// This will result in:
    /// - a park-path of 100 meters getting a cost of 5000,
    /// - a bike-path of 100 meters getting a cost of 2500,
    /// - any other road of 100 meters getting a cost of 100 × [Profile::default_weight].
    pub weights: &'a [Weight<'a>],

    /// Weight of features with an unrecognized or missing category.
    /// Must be finite and greater than zero.
    pub default_weight: f32,
}

/// Desirability weight for line features of a specific road-type category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight<'a> {
    /// Value of [Profile::category_field] for which this Weight applies,
    /// e.g. "park-path".
    pub category: &'a str,

    /// Multiplier of the length, to express preference for a specific road type.
    pub weight: f32,
}

impl<'a> Profile<'a> {
    /// Returns `true` if all weights (including the default one) are finite and positive.
    pub fn is_valid(&self) -> bool {
        is_valid_weight(self.default_weight) && self.weights.iter().all(|w| is_valid_weight(w.weight))
    }

    /// Finds the first matching [Weight] for a category, falling back to
    /// [Profile::default_weight] for unknown or missing categories.
    pub fn weight_of(&self, category: Option<&str>) -> f32 {
        category
            .and_then(|c| self.weights.iter().find(|w| w.category == c))
            .map(|w| w.weight)
            .unwrap_or(self.default_weight)
    }

    /// Returns the category of a feature, that is the string value under [Profile::category_field].
    pub fn category<'p>(&self, properties: &'p JsonObject) -> Option<&'p str> {
        properties.get(self.category_field).and_then(|v| v.as_str())
    }

    /// Returns the weight of a feature with the given properties.
    ///
    /// A valid explicit weight (see [Profile::weight_field]) takes precedence over
    /// the category lookup. The second return value is `false` if an explicit weight
    /// was present, but invalid, and therefore ignored.
    pub fn feature_weight(&self, properties: &JsonObject) -> (f32, bool) {
        let explicit = self
            .weight_field
            .and_then(|field| properties.get(field))
            .filter(|v| !v.is_null());

        match explicit {
            None => (self.weight_of(self.category(properties)), true),
            Some(v) => match v.as_f64().map(|w| w as f32).filter(|&w| is_valid_weight(w)) {
                Some(w) => (w, true),
                None => (self.weight_of(self.category(properties)), false),
            },
        }
    }

    /// Checks if a feature is traversable forward (first return value) and
    /// backwards (second return value) by investigating [Profile::direction_field].
    ///
    /// Recognized values are `yes`, `true`, `1` and `forward` for forward-only features,
    /// `-1`, `reverse` and `backward` for backward-only features. Anything else
    /// (including `no`, `both` and missing values) allows travel in both directions.
    pub fn direction(&self, properties: &JsonObject) -> (bool, bool) {
        let value = self
            .direction_field
            .and_then(|field| properties.get(field))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        match value.as_str() {
            "yes" | "true" | "1" | "forward" => (true, false),
            "-1" | "reverse" | "backward" => (false, true),
            _ => (true, true),
        }
    }
}

fn is_valid_weight(w: f32) -> bool {
    w.is_finite() && w > 0.0
}

/// Profile penalizing embankment roads, park paths, bike paths and pedestrian-bike paths
/// (in that order), with all other roads being the most desirable.
/// Categories are read from the `road_type` attribute.
pub const DEFAULT_PROFILE: Profile<'static> = Profile {
    name: "default",
    category_field: "road_type",
    weight_field: None,
    direction_field: None,
    weights: &[
        Weight {
            category: "embankment-road",
            weight: 100.0,
        },
        Weight {
            category: "park-path",
            weight: 50.0,
        },
        Weight {
            category: "bike-path",
            weight: 25.0,
        },
        Weight {
            category: "pedestrian-bike-path",
            weight: 12.5,
        },
    ],
    default_weight: 0.1,
};
