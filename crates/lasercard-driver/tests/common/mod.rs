//! Common fixtures for driver integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use lasercard_core::{Point2D, SegmentType};
use lasercard_driver::mock::{ManualClock, MockSdk};
use lasercard_driver::{CardConfig, CardSession, LaserCardDriver, LayerData, SegmentData, SegmentProfile, Sdk};

/// Maximum power of every test card.
pub const MAX_POWER_WATTS: f64 = 100.0;

/// Profile used by the test layers: 2000 mm/s jump, 500 mm/s mark, 50 W.
pub fn profile() -> SegmentProfile {
    SegmentProfile::new(2000.0, 500.0, 50.0)
}

pub fn polyline(points: &[(f64, f64)], profile: SegmentProfile) -> SegmentData {
    SegmentData::new(
        SegmentType::Polyline,
        points.iter().map(|&(x, y)| Point2D::new(x, y)).collect(),
        profile,
    )
}

/// A single three-point polyline in millimeters.
pub fn three_point_layer() -> LayerData {
    LayerData::new(1.0).with_segment(polyline(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], profile()))
}

/// One polyline per laser index in `indices`, each starting at x = index.
pub fn multi_laser_layer(indices: &[i64]) -> LayerData {
    indices.iter().fold(LayerData::new(1.0), |layer, &index| {
        let x = index as f64;
        layer.with_segment(polyline(
            &[(x, 0.0), (x, 1.0)],
            profile().with_laser_index(index),
        ))
    })
}

pub fn connect_session(mock: &Arc<MockSdk>, clock: Arc<ManualClock>) -> CardSession {
    let config = CardConfig::new("card", "192.168.0.10", 2000, MAX_POWER_WATTS);
    CardSession::connect(&config, Some(&Sdk::new(mock.clone())), clock, false).expect("session connects")
}

/// Driver with the mock SDK loaded and one card per `(name, laser index)`.
pub fn driver_with_cards(mock: &Arc<MockSdk>, clock: Arc<ManualClock>, cards: &[(&str, u32)]) -> LaserCardDriver {
    let mut driver = LaserCardDriver::with_clock("test", clock);
    driver.load_sdk(Sdk::new(mock.clone()));
    for (index, (name, laser_index)) in cards.iter().enumerate() {
        let ip = format!("192.168.0.{}", 10 + index);
        driver
            .connect_by_ip(name, &ip, 2000, MAX_POWER_WATTS)
            .expect("card connects")
            .assign_laser_index(*laser_index);
    }
    driver
}
