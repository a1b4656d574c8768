//! Toolpath layer access.
//!
//! [`ToolpathLayer`] is what the list builder reads geometry and per-segment
//! profile values from. [`LayerData`] is a serde-backed in-memory layer,
//! loadable from JSON.

use std::collections::BTreeMap;

use lasercard_core::constants::LASER_INDEX_PROFILE_KEY;
use lasercard_core::{Error, Hatch2D, Point2D, ProfileValueType, Result, SegmentType};
use serde::{Deserialize, Serialize};

/// Read access to one layer of a toolpath.
pub trait ToolpathLayer {
    /// Millimeters per geometry unit.
    fn units(&self) -> f64;

    fn segment_count(&self) -> u32;

    /// Segment kind and reported point count.
    fn segment_info(&self, segment: u32) -> Result<(SegmentType, u32)>;

    /// Integer profile value, or `default` if the segment does not define it.
    fn segment_profile_integer_value(&self, segment: u32, key: &str, default: i64) -> Result<i64>;

    fn segment_profile_typed_value(&self, segment: u32, value_type: ProfileValueType) -> Result<f64>;

    /// Points of a loop or polyline in millimeters.
    fn segment_point_data_in_mm(&self, segment: u32) -> Result<Vec<Point2D>>;

    /// Hatch lines of a hatch segment in millimeters.
    fn segment_hatch_data_in_mm(&self, segment: u32) -> Result<Vec<Hatch2D>>;
}

/// Per-segment process parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    /// Jump speed in mm/s.
    pub jump_speed: f64,
    /// Mark speed in mm/s.
    pub mark_speed: f64,
    /// Laser power in watts.
    pub laser_power: f64,
    #[serde(default)]
    pub values: BTreeMap<String, i64>,
}

impl SegmentProfile {
    pub fn new(jump_speed: f64, mark_speed: f64, laser_power: f64) -> Self {
        Self {
            jump_speed,
            mark_speed,
            laser_power,
            values: BTreeMap::new(),
        }
    }

    pub fn with_laser_index(mut self, laser_index: i64) -> Self {
        self.values
            .insert(LASER_INDEX_PROFILE_KEY.to_string(), laser_index);
        self
    }
}

/// One segment of an in-memory layer. Points are in geometry units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentData {
    pub segment_type: SegmentType,
    pub points: Vec<Point2D>,
    pub profile: SegmentProfile,
}

impl SegmentData {
    pub fn new(segment_type: SegmentType, points: Vec<Point2D>, profile: SegmentProfile) -> Self {
        Self {
            segment_type,
            points,
            profile,
        }
    }
}

/// In-memory layer.
///
/// # Examples
///
/// ```
/// use lasercard_core::{Point2D, SegmentType};
/// use lasercard_driver::{LayerData, SegmentData, SegmentProfile, ToolpathLayer};
///
/// let layer = LayerData::new(0.001).with_segment(SegmentData::new(
///     SegmentType::Polyline,
///     vec![Point2D::new(0.0, 0.0), Point2D::new(1000.0, 0.0)],
///     SegmentProfile::new(2000.0, 500.0, 50.0),
/// ));
///
/// let points = layer.segment_point_data_in_mm(0)?;
/// assert_eq!(points[1], Point2D::new(1.0, 0.0));
/// # Ok::<(), lasercard_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub units: f64,
    #[serde(default)]
    pub segments: Vec<SegmentData>,
}

impl LayerData {
    pub fn new(units: f64) -> Self {
        Self {
            units,
            segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, segment: SegmentData) -> Self {
        self.segments.push(segment);
        self
    }

    /// Parse a layer from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("invalid layer: {}", e)))
    }

    fn segment(&self, segment: u32) -> Result<&SegmentData> {
        self.segments
            .get(segment as usize)
            .ok_or_else(|| Error::toolpath(format!("segment {} out of range", segment)))
    }

    fn scaled(&self, point: &Point2D) -> Point2D {
        Point2D::new(point.x * self.units, point.y * self.units)
    }
}

impl ToolpathLayer for LayerData {
    fn units(&self) -> f64 {
        self.units
    }

    fn segment_count(&self) -> u32 {
        self.segments.len() as u32
    }

    fn segment_info(&self, segment: u32) -> Result<(SegmentType, u32)> {
        let data = self.segment(segment)?;
        Ok((data.segment_type, data.points.len() as u32))
    }

    fn segment_profile_integer_value(&self, segment: u32, key: &str, default: i64) -> Result<i64> {
        let data = self.segment(segment)?;
        Ok(data.profile.values.get(key).copied().unwrap_or(default))
    }

    fn segment_profile_typed_value(&self, segment: u32, value_type: ProfileValueType) -> Result<f64> {
        let profile = &self.segment(segment)?.profile;
        Ok(match value_type {
            ProfileValueType::JumpSpeed => profile.jump_speed,
            ProfileValueType::Speed => profile.mark_speed,
            ProfileValueType::LaserPower => profile.laser_power,
        })
    }

    fn segment_point_data_in_mm(&self, segment: u32) -> Result<Vec<Point2D>> {
        let data = self.segment(segment)?;
        Ok(data.points.iter().map(|point| self.scaled(point)).collect())
    }

    fn segment_hatch_data_in_mm(&self, segment: u32) -> Result<Vec<Hatch2D>> {
        let data = self.segment(segment)?;
        Ok(data
            .points
            .chunks_exact(2)
            .map(|pair| Hatch2D::new(self.scaled(&pair[0]), self.scaled(&pair[1])))
            .collect())
    }
}
