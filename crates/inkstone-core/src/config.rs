//! Canvas configuration.

use crate::elements::{NEUTRAL_FORCE, SerializableColor};
use crate::smoothing::{DEFAULT_BEZIER_SPACING, DEFAULT_MIN_POINT_DISTANCE};
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Style of the default brush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub point_size: f64,
    pub point_step: f64,
    pub color: SerializableColor,
    pub opacity: f64,
    pub force_sensitivity: f64,
    pub force_on_tap: f64,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            point_size: 4.0,
            point_step: 1.0,
            color: SerializableColor::black(),
            opacity: 0.3,
            force_sensitivity: 0.0,
            force_on_tap: 1.0,
        }
    }
}

/// Tunables for input handling and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Target distance between smoothed vertices.
    pub bezier_spacing: f64,
    /// Raw points closer than this to the previous one are dropped.
    pub min_point_distance: f64,
    /// Force assumed when the device reports none.
    pub neutral_force: f64,
    /// Use reported force; when false every sample uses `neutral_force`.
    pub force_enabled: bool,
    pub default_brush: BrushConfig,
    /// Size passed to the render target on full redraws.
    pub drawable_size: Size,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            bezier_spacing: DEFAULT_BEZIER_SPACING,
            min_point_distance: DEFAULT_MIN_POINT_DISTANCE,
            neutral_force: NEUTRAL_FORCE,
            force_enabled: false,
            default_brush: BrushConfig::default(),
            drawable_size: Size::new(800.0, 600.0),
        }
    }
}

impl CanvasConfig {
    /// Parse configuration from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = CanvasConfig::from_json(r#"{ "force_enabled": true, "default_brush": { "point_size": 9.0 } }"#).unwrap();
        assert!(config.force_enabled);
        assert!((config.default_brush.point_size - 9.0).abs() < f64::EPSILON);
        assert!((config.default_brush.opacity - 0.3).abs() < f64::EPSILON);
        assert!((config.bezier_spacing - DEFAULT_BEZIER_SPACING).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = CanvasConfig::default();
        config.neutral_force = 0.5;
        let parsed = CanvasConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
