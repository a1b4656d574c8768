use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection handle returned by the card SDK.
///
/// Valid handles are strictly positive; zero means "not connected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CardHandle(pub i32);

impl CardHandle {
    pub const DISCONNECTED: CardHandle = CardHandle(0);

    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for CardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// Handle of a device-side command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ListHandle(pub i64);

impl ListHandle {
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ListHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list#{}", self.0)
    }
}

/// A 2D point in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single hatch line in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hatch2D {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Hatch2D {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self {
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
        }
    }

    pub fn start(&self) -> Point2D {
        Point2D::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point2D {
        Point2D::new(self.x2, self.y2)
    }
}

/// Geometry kind of a toolpath segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Closed contour; the last point connects back to the first in the data itself.
    Loop,
    /// Open contour.
    Polyline,
    /// Independent mark lines given as point pairs.
    Hatch,
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentType::Loop => write!(f, "Loop"),
            SegmentType::Polyline => write!(f, "Polyline"),
            SegmentType::Hatch => write!(f, "Hatch"),
        }
    }
}

/// Typed per-segment profile values read by the list builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileValueType {
    /// Jump speed in mm/s.
    JumpSpeed,
    /// Mark speed in mm/s.
    Speed,
    /// Laser power in watts.
    LaserPower,
}

/// Action applied by a digital I/O write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpioAction {
    Set,
    Clear,
    Toggle,
    /// Replace the whole port with the mask.
    Write,
}

bitflags::bitflags! {
    /// Laser status word reported by the card.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LaserStatusFlags: u32 {
        const PILOT = 1 << 0;
        const ARMED = 1 << 1;
        const ALARM = 1 << 2;
    }
}

/// Decoded laser safety state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaserStatus {
    pub pilot_enabled: bool,
    pub laser_armed: bool,
    pub alarm: bool,
}

impl LaserStatus {
    /// Decode a raw status word. Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        let flags = LaserStatusFlags::from_bits_truncate(bits);
        Self {
            pilot_enabled: flags.contains(LaserStatusFlags::PILOT),
            laser_armed: flags.contains(LaserStatusFlags::ARMED),
            alarm: flags.contains(LaserStatusFlags::ALARM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false, false, false)]
    #[case(1, true, false, false)]
    #[case(2, false, true, false)]
    #[case(4, false, false, true)]
    #[case(7, true, true, true)]
    #[case(0xF8, false, false, false)]
    fn test_laser_status_decoding(
        #[case] bits: u32,
        #[case] pilot: bool,
        #[case] armed: bool,
        #[case] alarm: bool,
    ) {
        let status = LaserStatus::from_bits(bits);
        assert_eq!(status.pilot_enabled, pilot);
        assert_eq!(status.laser_armed, armed);
        assert_eq!(status.alarm, alarm);
    }

    #[test]
    fn test_card_handle_validity() {
        assert!(!CardHandle::DISCONNECTED.is_valid());
        assert!(!CardHandle(-4).is_valid());
        assert!(CardHandle(1).is_valid());
    }

    #[test]
    fn test_hatch_endpoints() {
        let hatch = Hatch2D::new(Point2D::new(1.0, 2.0), Point2D::new(3.0, 4.0));
        assert_eq!(hatch.start(), Point2D::new(1.0, 2.0));
        assert_eq!(hatch.end(), Point2D::new(3.0, 4.0));
    }

    #[test]
    fn test_segment_type_serialization() {
        let json = serde_json::to_string(&SegmentType::Polyline).unwrap();
        assert_eq!(json, "\"polyline\"");
        let parsed: SegmentType = serde_json::from_str("\"hatch\"").unwrap();
        assert_eq!(parsed, SegmentType::Hatch);
    }
}
