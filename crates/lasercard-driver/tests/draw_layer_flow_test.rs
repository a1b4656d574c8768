//! Layer drawing flows against the recording SDK.

mod common;

use std::sync::Arc;

use common::*;
use lasercard_core::{CardHandle, Error, ListHandle};
use lasercard_driver::mock::{ManualClock, MockSdk};
use lasercard_driver::{CardConfig, CardSession, LaserCardDriver, ScanCommand};

#[test]
fn test_three_point_polyline_command_sequence() {
    let mock = Arc::new(MockSdk::new());
    let mut session = connect_session(&mock, Arc::new(ManualClock::new(0)));

    session.draw_layer(&three_point_layer(), 10_000).unwrap();

    assert_eq!(
        mock.commands(ListHandle(1)),
        vec![
            ScanCommand::LaserOn,
            ScanCommand::SetJumpSpeed { meters_per_second: 2.0 },
            ScanCommand::SetMarkSpeed { meters_per_second: 0.5 },
            ScanCommand::SetPower { units: 32768 },
            ScanCommand::JumpAbsolute { x: 0.0, y: 0.0 },
            ScanCommand::MarkAbsolute { x: 10_000.0, y: 0.0 },
            ScanCommand::MarkAbsolute { x: 10_000.0, y: 10_000.0 },
            ScanCommand::LaserOff,
        ]
    );
    assert_eq!(mock.executed(), vec![(CardHandle(1), 0)]);
}

#[test]
fn test_successful_draw_call_order() {
    let mock = Arc::new(MockSdk::new());
    let mut session = connect_session(&mock, Arc::new(ManualClock::new(0)));
    mock.clear_calls();

    session.draw_layer(&three_point_layer(), 10_000).unwrap();

    let calls = mock.device_calls();
    let position = |name: &str| calls.iter().position(|call| call == name).unwrap();
    assert!(position("list_allocate") < position("list_set"));
    assert!(position("list_set") < position("list_execute"));
    assert!(position("list_execute") < position("list_wait_for_list_done"));
    assert!(position("list_wait_for_list_done") < position("list_delete"));
    assert!(position("list_delete") < position("list_release_handle"));
    assert_eq!(mock.call_count("list_abort_execution"), 0);
    assert!(mock.occupied_slots().is_empty());
}

#[test]
fn test_simulated_draw_performs_no_device_io() {
    let mock = Arc::new(MockSdk::new());
    let mut driver = LaserCardDriver::with_clock("sim", Arc::new(ManualClock::new(0)));
    driver.load_sdk(lasercard_driver::Sdk::new(mock.clone()));
    driver.set_to_simulation_mode();

    let session = driver.connect_by_ip("card", "192.168.0.10", 2000, MAX_POWER_WATTS).unwrap();
    session.draw_layer(&three_point_layer(), 10_000).unwrap();
    session.assign_laser_index(1);
    driver
        .draw_layer_multi_laser(&multi_laser_layer(&[1]), true, 10_000)
        .unwrap();

    assert!(mock.calls().is_empty());
}

#[test]
fn test_mid_execution_failure_aborts_then_deletes_once() {
    let mock = Arc::new(MockSdk::new());
    let mut session = connect_session(&mock, Arc::new(ManualClock::new(0)));
    mock.set_polls_until_done(3);
    mock.fail_next("list_wait_for_list_done", -5, "card lost");
    mock.clear_calls();

    let result = session.draw_layer(&three_point_layer(), 10_000);

    match result {
        Err(Error::Device { status, message }) => {
            assert_eq!(status, -5);
            assert_eq!(message, "card lost - rlListWaitForListDone");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let cleanup: Vec<String> = mock
        .device_calls()
        .into_iter()
        .skip_while(|call| call != "list_wait_for_list_done")
        .skip(1)
        .collect();
    assert_eq!(
        cleanup,
        vec![
            "list_is_execution_in_progress",
            "list_abort_execution",
            "list_delete",
            "list_release_handle",
        ]
    );
    assert!(mock.occupied_slots().is_empty());
}

#[test]
fn test_build_failure_releases_list_without_slot() {
    let mock = Arc::new(MockSdk::new());
    let mut session = connect_session(&mock, Arc::new(ManualClock::new(0)));
    mock.fail_next("list_append_mark_abs_2d", 3, "list full");

    let result = session.draw_layer(&three_point_layer(), 10_000);

    assert!(matches!(result, Err(Error::Device { status: 3, .. })));
    assert_eq!(mock.call_count("list_set"), 0);
    assert_eq!(mock.call_count("list_execute"), 0);
    assert_eq!(mock.released_lists(), vec![ListHandle(1)]);
}

#[test]
fn test_scanning_timeout() {
    let mock = Arc::new(MockSdk::new());
    mock.never_finish();
    let clock = Arc::new(ManualClock::with_step(5_000, 250));
    let mut session = connect_session(&mock, clock);

    let result = session.draw_layer(&three_point_layer(), 1_000);

    assert!(matches!(result, Err(Error::ScanningTimeout(1_000))));
    assert_eq!(mock.call_count("list_abort_execution"), 1);
    assert_eq!(mock.call_count("list_delete"), 1);
    assert!(mock.occupied_slots().is_empty());
}

#[test]
fn test_clock_regression() {
    let mock = Arc::new(MockSdk::new());
    mock.never_finish();
    let clock = Arc::new(ManualClock::new(0));
    clock.queue_readings(&[10_000, 10_100, 9_000]);
    let mut session = connect_session(&mock, clock);

    let result = session.draw_layer(&three_point_layer(), 60_000);

    match result {
        Err(Error::InvalidSystemTiming { start_ms, current_ms }) => {
            assert_eq!(start_ms, 10_000);
            assert_eq!(current_ms, 9_000);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(mock.call_count("list_wait_for_list_done"), 1);
    assert!(mock.occupied_slots().is_empty());
}

#[test]
fn test_multi_laser_each_card_draws_its_own_segments() {
    let mock = Arc::new(MockSdk::new());
    let mut driver = driver_with_cards(&mock, Arc::new(ManualClock::new(0)), &[("a", 2), ("b", 1)]);

    driver
        .draw_layer_multi_laser(&multi_laser_layer(&[1, 2, 3]), false, 10_000)
        .unwrap();

    // Lists are allocated in laser index order: card "b" first
    let first_motion = |list| {
        mock.commands(ListHandle(list))
            .into_iter()
            .find(|command| command.is_motion())
    };
    assert_eq!(
        first_motion(1),
        Some(ScanCommand::JumpAbsolute { x: 1_000.0, y: 0.0 })
    );
    assert_eq!(
        first_motion(2),
        Some(ScanCommand::JumpAbsolute { x: 2_000.0, y: 0.0 })
    );
    assert_eq!(mock.commands(ListHandle(1)).len(), 7);
    assert_eq!(mock.executed(), vec![(CardHandle(2), 0), (CardHandle(1), 0)]);
    assert!(mock.occupied_slots().is_empty());
}

#[test]
fn test_multi_laser_unassigned_segment_fails() {
    let mock = Arc::new(MockSdk::new());
    let mut driver = driver_with_cards(&mock, Arc::new(ManualClock::new(0)), &[("a", 1)]);
    let layer = multi_laser_layer(&[1]).with_segment(polyline(&[(0.0, 0.0), (1.0, 1.0)], profile()));

    let result = driver.draw_layer_multi_laser(&layer, true, 10_000);

    assert!(matches!(result, Err(Error::SegmentHasNoAssignedCard(1))));
    assert_eq!(mock.call_count("list_set"), 0);
    assert_eq!(mock.released_lists().len(), 1);
}

#[test]
fn test_multi_laser_timeout_cleans_up_every_card() {
    let mock = Arc::new(MockSdk::new());
    mock.never_finish();
    let clock = Arc::new(ManualClock::with_step(0, 300));
    let mut driver = driver_with_cards(&mock, clock, &[("a", 1), ("b", 2)]);

    let result = driver.draw_layer_multi_laser(&multi_laser_layer(&[1, 2]), false, 1_000);

    assert!(matches!(result, Err(Error::ScanningTimeout(1_000))));
    assert_eq!(mock.call_count("list_delete"), 2);
    assert_eq!(mock.released_lists().len(), 2);
    assert!(mock.occupied_slots().is_empty());
}

#[test]
fn test_connect_failure_leaves_registry_unchanged() {
    let mock = Arc::new(MockSdk::new());
    mock.fail_next("connect", -1, "no route to host");
    let mut driver = driver_with_cards(&mock, Arc::new(ManualClock::new(0)), &[]);

    let result = driver.connect_by_ip("a", "192.168.0.10", 2000, MAX_POWER_WATTS);

    assert!(matches!(result, Err(Error::Device { status: -1, .. })));
    assert!(!driver.card_exists("a").unwrap());
}

#[test]
fn test_session_reconnect_after_disconnect() {
    let mock = Arc::new(MockSdk::new());
    let config = CardConfig::new("card", "192.168.0.10", 2000, MAX_POWER_WATTS);
    let sdk = lasercard_driver::Sdk::new(mock.clone());

    let mut session = CardSession::connect(&config, Some(&sdk), Arc::new(ManualClock::new(0)), false).unwrap();
    session.disconnect().unwrap();
    assert!(!session.is_connected());
    drop(session);

    let session = CardSession::connect(&config, Some(&sdk), Arc::new(ManualClock::new(0)), false).unwrap();
    assert!(session.is_connected());
    assert_eq!(mock.call_count("connect"), 2);
    assert_eq!(mock.call_count("disconnect"), 1);
}
