//! Shared configuration for Reticle
//!
//! This crate provides the single source of truth for the tuned constants used
//! by picking and manipulation: epsilon bands for ranking hits, the on-screen
//! pick radius, grid and angle snapping, and manipulator handle sizes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default pick radius around the pointer in pixels
pub const DEFAULT_PIXEL_RADIUS: f32 = 8.0;

/// Screen distances closer than this are considered tied when ranking hits
pub const DEFAULT_DISTANCE_BAND: f32 = 1e-3;

/// Depths closer than this are considered tied when ranking hits
pub const DEFAULT_DEPTH_BAND: f32 = 1e-6;

/// Distance epsilon for "select all coincident" matching
pub const DEFAULT_MATCHING_DISTANCE_EPSILON: f32 = 0.25;

/// Depth epsilon for "select all coincident" matching
pub const DEFAULT_MATCHING_DEPTH_EPSILON: f32 = 2e-6;

/// Depth epsilon for deep matching (selects through the whole depth range)
pub const DEFAULT_DEEP_MATCHING_DEPTH_EPSILON: f32 = 2.0;

/// Default grid size in world units
pub const DEFAULT_GRID_SIZE: f32 = 8.0;

/// Default rotation snap increment in degrees
pub const DEFAULT_SNAP_ANGLE_DEGREES: f32 = 15.0;

/// Bounding box extents below this use point-relative scaling
pub const DEFAULT_MIN_SCALE_EXTENT: f32 = 0.0625;

/// Errors produced while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration for hit testing and candidate ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct PickConfig {
    /// Half size of the pick box around the pointer, in pixels
    pub pixel_radius: f32,
    /// Screen distance band for ordering
    pub distance_band: f32,
    /// Depth band for ordering
    pub depth_band: f32,
    /// Distance epsilon for matching selection
    pub matching_distance_epsilon: f32,
    /// Depth epsilon for matching selection
    pub matching_depth_epsilon: f32,
    /// Depth epsilon for deep matching selection
    pub deep_matching_depth_epsilon: f32,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            pixel_radius: DEFAULT_PIXEL_RADIUS,
            distance_band: DEFAULT_DISTANCE_BAND,
            depth_band: DEFAULT_DEPTH_BAND,
            matching_distance_epsilon: DEFAULT_MATCHING_DISTANCE_EPSILON,
            matching_depth_epsilon: DEFAULT_MATCHING_DEPTH_EPSILON,
            deep_matching_depth_epsilon: DEFAULT_DEEP_MATCHING_DEPTH_EPSILON,
        }
    }
}

impl PickConfig {
    /// Check that every field is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pixel_radius > 0.0) {
            return Err(invalid("pixel_radius", self.pixel_radius, "must be positive"));
        }
        for (field, value) in [
            ("distance_band", self.distance_band),
            ("depth_band", self.depth_band),
            ("matching_distance_epsilon", self.matching_distance_epsilon),
            ("matching_depth_epsilon", self.matching_depth_epsilon),
            ("deep_matching_depth_epsilon", self.deep_matching_depth_epsilon),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(invalid(field, value, "must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

/// Configuration for manipulator handles and drag behaviors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct ManipulatorConfig {
    /// Grid size for translation snapping (0 disables snapping)
    pub grid_size: f32,
    /// Rotation snap increment in degrees
    pub snap_angle_degrees: f32,
    /// Extents below this fall back to point-relative scaling
    pub min_scale_extent: f32,
    /// Radius of the virtual trackball, in manipulator units
    pub rotate_sphere_radius: f32,
    /// Length of translate axis handles, in manipulator units
    pub translate_axis_length: f32,
    /// Length of scale axis handles, in manipulator units
    pub scale_axis_length: f32,
    /// Half size of the screen-plane quad handle, in manipulator units
    pub quad_size: f32,
    /// Radius of the screen-facing rotate ring, in manipulator units
    pub rotate_screen_radius: f32,
    /// Axis handles with |dot(view, axis)| at or above this are hidden
    pub axis_hide_threshold: f32,
    /// Depth of a new brush along the view axis (0 uses the grid size)
    pub new_brush_depth: f32,
}

impl Default for ManipulatorConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            snap_angle_degrees: DEFAULT_SNAP_ANGLE_DEGREES,
            min_scale_extent: DEFAULT_MIN_SCALE_EXTENT,
            rotate_sphere_radius: 64.0,
            translate_axis_length: 128.0,
            scale_axis_length: 128.0,
            quad_size: 16.0,
            rotate_screen_radius: 72.0,
            axis_hide_threshold: 0.95,
            new_brush_depth: 0.0,
        }
    }
}

impl ManipulatorConfig {
    /// Snap angle in radians
    pub fn snap_angle(&self) -> f32 {
        self.snap_angle_degrees.to_radians()
    }

    /// Depth used for new brushes
    pub fn effective_brush_depth(&self) -> f32 {
        if self.new_brush_depth > 0.0 {
            self.new_brush_depth
        } else if self.grid_size > 0.0 {
            self.grid_size
        } else {
            1.0
        }
    }

    /// Check that every field is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_size >= 0.0) || !self.grid_size.is_finite() {
            return Err(invalid("grid_size", self.grid_size, "must be finite and non-negative"));
        }
        if !(self.snap_angle_degrees > 0.0 && self.snap_angle_degrees <= 180.0) {
            return Err(invalid(
                "snap_angle_degrees",
                self.snap_angle_degrees,
                "must be in (0, 180]",
            ));
        }
        if !(self.min_scale_extent >= 0.0) {
            return Err(invalid("min_scale_extent", self.min_scale_extent, "must be non-negative"));
        }
        for (field, value) in [
            ("rotate_sphere_radius", self.rotate_sphere_radius),
            ("translate_axis_length", self.translate_axis_length),
            ("scale_axis_length", self.scale_axis_length),
            ("quad_size", self.quad_size),
            ("rotate_screen_radius", self.rotate_screen_radius),
        ] {
            if !(value > 0.0) {
                return Err(invalid(field, value, "must be positive"));
            }
        }
        if !(self.axis_hide_threshold > 0.0 && self.axis_hide_threshold <= 1.0) {
            return Err(invalid(
                "axis_hide_threshold",
                self.axis_hide_threshold,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Combined configuration, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReticleConfig {
    pub pick: PickConfig,
    pub manipulator: ManipulatorConfig,
}

impl ReticleConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pick.validate()?;
        self.manipulator.validate()
    }
}

fn invalid(field: &'static str, value: f32, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: format!("{value} {reason}"),
    }
}
