//! Device-side scan lists.
//!
//! A [`ScanList`] owns one list handle allocated on the card. Commands are
//! appended straight to the device; nothing is buffered locally. A list can
//! occupy at most one numbered slot on the card at a time.
//!
//! Dropping a list deletes its slot, if any, and releases the handle.

use lasercard_core::constants::{
    LASER_INDEX_PROFILE_KEY, MAX_LIST_ID_ON_CARD, UNASSIGNED_LASER_INDEX, UNBOUNDED_EXECUTION_LIMIT,
};
use lasercard_core::{CardHandle, CoordinateTransform, Error, ListHandle, ProfileValueType, Result, SegmentType};
use tracing::{debug, trace, warn};

use crate::command::{ScanCommand, mm_per_second_to_meters_per_second, mm_to_microns, power_to_units};
use crate::sdk::Sdk;
use crate::toolpath::ToolpathLayer;

#[derive(Debug)]
pub struct ScanList {
    sdk: Sdk,
    card: CardHandle,
    handle: ListHandle,
    slot: Option<u32>,
    max_laser_power_watts: f64,
    transform: CoordinateTransform,
    command_count: usize,
}

impl ScanList {
    /// Allocate a new list on `card`.
    ///
    /// The transform is copied; later changes to the session's transform do
    /// not affect this list.
    pub fn allocate(
        sdk: Sdk,
        card: CardHandle,
        max_laser_power_watts: f64,
        transform: CoordinateTransform,
    ) -> Result<Self> {
        let handle = sdk.call("rlListAllocate", |raw| raw.list_allocate(card))?;
        debug!(%card, list = %handle, "Allocated scan list");

        Ok(Self {
            sdk,
            card,
            handle,
            slot: None,
            max_laser_power_watts,
            transform,
            command_count: 0,
        })
    }

    pub fn handle(&self) -> ListHandle {
        self.handle
    }

    pub fn card(&self) -> CardHandle {
        self.card
    }

    /// Slot the list currently occupies on the card.
    pub fn slot(&self) -> Option<u32> {
        self.slot
    }

    /// Number of commands appended so far.
    pub fn command_count(&self) -> usize {
        self.command_count
    }

    pub fn max_laser_power_watts(&self) -> f64 {
        self.max_laser_power_watts
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Append one command to the device list.
    pub fn append(&mut self, command: ScanCommand) -> Result<()> {
        let list = self.handle;
        self.sdk.call(command.sdk_name(), |raw| match command {
            ScanCommand::LaserOn => raw.list_append_laser_on(list),
            ScanCommand::LaserOff => raw.list_append_laser_off(list),
            ScanCommand::SetPower { units } => raw.list_append_power(list, units),
            ScanCommand::SetJumpSpeed { meters_per_second } => {
                raw.list_append_jump_speed(list, meters_per_second)
            }
            ScanCommand::SetMarkSpeed { meters_per_second } => {
                raw.list_append_mark_speed(list, meters_per_second)
            }
            ScanCommand::JumpAbsolute { x, y } => raw.list_append_jump_abs_2d(list, x, y),
            ScanCommand::MarkAbsolute { x, y } => raw.list_append_mark_abs_2d(list, x, y),
        })?;
        self.command_count += 1;
        Ok(())
    }

    /// Translate a toolpath layer into list commands.
    ///
    /// With a nonzero `laser_index_filter`, only segments assigned to that
    /// laser are emitted. With `fail_if_unassigned`, any segment without a
    /// laser index is an error.
    ///
    /// # Errors
    ///
    /// - `Error::SegmentHasNoAssignedCard` for an unassigned segment when `fail_if_unassigned` is set
    /// - `Error::InvalidPointCount` if geometry disagrees with the reported point count, or a hatch has an odd count
    /// - `Error::Device` if appending to the card fails
    pub fn add_layer_to_list(
        &mut self,
        layer: &dyn ToolpathLayer,
        laser_index_filter: u32,
        fail_if_unassigned: bool,
    ) -> Result<()> {
        let units = layer.units();
        let segment_count = layer.segment_count();
        debug!(
            list = %self.handle,
            segments = segment_count,
            units,
            laser_index_filter,
            "Adding layer to list"
        );

        self.append(ScanCommand::LaserOn)?;

        for segment in 0..segment_count {
            let (segment_type, point_count) = layer.segment_info(segment)?;

            let laser_index = layer.segment_profile_integer_value(
                segment,
                LASER_INDEX_PROFILE_KEY,
                UNASSIGNED_LASER_INDEX,
            )?;
            if laser_index == UNASSIGNED_LASER_INDEX && fail_if_unassigned {
                return Err(Error::SegmentHasNoAssignedCard(segment));
            }

            if laser_index_filter != 0 && laser_index != i64::from(laser_index_filter) {
                trace!(segment, laser_index, "Skipping segment of another laser");
                continue;
            }

            if point_count < 2 {
                trace!(segment, point_count, "Skipping degenerate segment");
                continue;
            }

            self.append_segment_parameters(layer, segment)?;

            match segment_type {
                SegmentType::Loop | SegmentType::Polyline => {
                    self.append_contour(layer, segment, point_count)?
                }
                SegmentType::Hatch => self.append_hatches(layer, segment, point_count)?,
            }
        }

        self.append(ScanCommand::LaserOff)?;
        debug!(list = %self.handle, commands = self.command_count, "Layer added to list");
        Ok(())
    }

    fn append_segment_parameters(&mut self, layer: &dyn ToolpathLayer, segment: u32) -> Result<()> {
        let jump_speed = layer.segment_profile_typed_value(segment, ProfileValueType::JumpSpeed)?;
        let mark_speed = layer.segment_profile_typed_value(segment, ProfileValueType::Speed)?;
        let power = layer.segment_profile_typed_value(segment, ProfileValueType::LaserPower)?;

        self.append(ScanCommand::SetJumpSpeed {
            meters_per_second: mm_per_second_to_meters_per_second(jump_speed),
        })?;
        self.append(ScanCommand::SetMarkSpeed {
            meters_per_second: mm_per_second_to_meters_per_second(mark_speed),
        })?;
        self.append(ScanCommand::SetPower {
            units: power_to_units(power, self.max_laser_power_watts),
        })
    }

    fn append_contour(&mut self, layer: &dyn ToolpathLayer, segment: u32, point_count: u32) -> Result<()> {
        let points = layer.segment_point_data_in_mm(segment)?;
        if points.len() != point_count as usize {
            return Err(Error::invalid_point_count(
                segment,
                point_count as usize,
                points.len(),
            ));
        }

        for (index, point) in points.iter().enumerate() {
            let (x, y) = self.to_device(point.x, point.y);
            if index == 0 {
                self.append(ScanCommand::JumpAbsolute { x, y })?;
            } else {
                self.append(ScanCommand::MarkAbsolute { x, y })?;
            }
        }
        Ok(())
    }

    fn append_hatches(&mut self, layer: &dyn ToolpathLayer, segment: u32, point_count: u32) -> Result<()> {
        if point_count % 2 == 1 {
            return Err(Error::invalid_point_count(
                segment,
                (point_count - 1) as usize,
                point_count as usize,
            ));
        }

        let hatches = layer.segment_hatch_data_in_mm(segment)?;
        if hatches.len() * 2 != point_count as usize {
            return Err(Error::invalid_point_count(
                segment,
                point_count as usize,
                hatches.len() * 2,
            ));
        }

        for hatch in &hatches {
            let (x1, y1) = self.to_device(hatch.x1, hatch.y1);
            let (x2, y2) = self.to_device(hatch.x2, hatch.y2);
            self.append(ScanCommand::JumpAbsolute { x: x1, y: y1 })?;
            self.append(ScanCommand::MarkAbsolute { x: x2, y: y2 })?;
        }
        Ok(())
    }

    /// Transform a point in millimeters and convert it to micrometers.
    fn to_device(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = self.transform.apply_transform(x, y);
        (mm_to_microns(x), mm_to_microns(y))
    }

    /// Place the list into `slot` on the card, replacing any previous slot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidListId` if `slot` is not below 256.
    pub fn set_list_on_card(&mut self, slot: u32) -> Result<()> {
        if self.slot.is_some() {
            self.delete_list_from_card()?;
        }

        validate_slot(slot)?;

        let (card, list) = (self.card, self.handle);
        self.sdk.call("rlListSet", |raw| {
            raw.list_set(card, slot, list, false, UNBOUNDED_EXECUTION_LIMIT)
        })?;
        self.slot = Some(slot);
        debug!(%card, %list, slot, "List placed on card");
        Ok(())
    }

    /// Delete the list's slot on the card. No-op without a slot.
    pub fn delete_list_from_card(&mut self) -> Result<()> {
        if let Some(slot) = self.slot.take() {
            let card = self.card;
            self.sdk
                .call("rlListDelete", |raw| raw.list_delete(card, slot, true))?;
            debug!(%card, slot, "List deleted from card");
        }
        Ok(())
    }

    /// Start executing the list stored in `slot`.
    pub fn execute_list(&mut self, slot: u32) -> Result<()> {
        validate_slot(slot)?;
        let card = self.card;
        self.sdk
            .call("rlListExecute", |raw| raw.list_execute(card, slot))?;
        debug!(%card, slot, "List execution started");
        Ok(())
    }

    /// Poll the card once, blocking up to `timeout_ms`. Returns whether the list is done.
    pub fn wait_for_execution(&mut self, timeout_ms: u32) -> Result<bool> {
        let card = self.card;
        let (done, list_id) = self.sdk.call("rlListWaitForListDone", |raw| {
            raw.list_wait_for_list_done(card, timeout_ms)
        })?;
        trace!(%card, done, list_id, "Polled list execution");
        Ok(done)
    }

    /// Abort execution on the card if a list is running. Returns whether an abort was issued.
    pub fn abort_execution_if_in_progress(&mut self) -> Result<bool> {
        abort_execution_if_in_progress(&self.sdk, self.card)
    }
}

impl Drop for ScanList {
    fn drop(&mut self) {
        if let Err(e) = self.delete_list_from_card() {
            warn!(list = %self.handle, error = %e, "Failed to delete list from card");
        }

        if self.handle.is_valid() {
            let list = self.handle;
            if let Err(e) = self
                .sdk
                .call("rlListReleaseHandle", |raw| raw.list_release_handle(list))
            {
                warn!(%list, error = %e, "Failed to release list handle");
            }
            self.handle = ListHandle::default();
        }
    }
}

fn validate_slot(slot: u32) -> Result<()> {
    if slot >= MAX_LIST_ID_ON_CARD {
        return Err(Error::InvalidListId(slot));
    }
    Ok(())
}

/// Query the card and abort a running list. Returns whether an abort was issued.
pub(crate) fn abort_execution_if_in_progress(sdk: &Sdk, card: CardHandle) -> Result<bool> {
    let in_progress = sdk.call("rlListIsExecutionInProgress", |raw| {
        raw.list_is_execution_in_progress(card)
    })?;

    if in_progress {
        sdk.call("rlListAbortExecution", |raw| raw.list_abort_execution(card))?;
        warn!(%card, "Aborted list execution");
    }
    Ok(in_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSdk;
    use crate::toolpath::{LayerData, SegmentData, SegmentProfile};
    use lasercard_core::{Hatch2D, Point2D};
    use std::sync::Arc;

    fn mock_list() -> (Arc<MockSdk>, ScanList) {
        let mock = Arc::new(MockSdk::new());
        let list = ScanList::allocate(
            Sdk::new(mock.clone()),
            CardHandle(1),
            100.0,
            CoordinateTransform::identity(),
        )
        .unwrap();
        (mock, list)
    }

    fn polyline(points: &[(f64, f64)], laser_index: i64) -> SegmentData {
        SegmentData::new(
            SegmentType::Polyline,
            points.iter().map(|&(x, y)| Point2D::new(x, y)).collect(),
            SegmentProfile::new(2000.0, 500.0, 50.0).with_laser_index(laser_index),
        )
    }

    #[test]
    fn test_polyline_command_sequence() {
        let (mock, mut list) = mock_list();
        let layer = LayerData::new(1.0).with_segment(polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 2.0)], 0));

        list.add_layer_to_list(&layer, 0, false).unwrap();

        assert_eq!(
            mock.commands(list.handle()),
            vec![
                ScanCommand::LaserOn,
                ScanCommand::SetJumpSpeed { meters_per_second: 2.0 },
                ScanCommand::SetMarkSpeed { meters_per_second: 0.5 },
                ScanCommand::SetPower { units: 32768 },
                ScanCommand::JumpAbsolute { x: 0.0, y: 0.0 },
                ScanCommand::MarkAbsolute { x: 1000.0, y: 0.0 },
                ScanCommand::MarkAbsolute { x: 1000.0, y: 2000.0 },
                ScanCommand::LaserOff,
            ]
        );
        assert_eq!(list.command_count(), 8);
    }

    #[test]
    fn test_transform_applied_before_unit_conversion() {
        let mock = Arc::new(MockSdk::new());
        let mut transform = CoordinateTransform::identity();
        transform.set_translational(0.5, -1.0);
        let mut list = ScanList::allocate(Sdk::new(mock.clone()), CardHandle(1), 100.0, transform).unwrap();

        let layer = LayerData::new(1.0).with_segment(polyline(&[(1.0, 1.0), (2.0, 1.0)], 0));
        list.add_layer_to_list(&layer, 0, false).unwrap();

        let commands = mock.commands(list.handle());
        assert_eq!(commands[4], ScanCommand::JumpAbsolute { x: 1500.0, y: 0.0 });
        assert_eq!(commands[5], ScanCommand::MarkAbsolute { x: 2500.0, y: 0.0 });
    }

    #[test]
    fn test_filter_skips_other_lasers() {
        let (mock, mut list) = mock_list();
        let layer = LayerData::new(1.0)
            .with_segment(polyline(&[(0.0, 0.0), (1.0, 1.0)], 2))
            .with_segment(polyline(&[(5.0, 5.0), (6.0, 6.0)], 3));

        list.add_layer_to_list(&layer, 3, false).unwrap();

        let motions: Vec<ScanCommand> = mock
            .commands(list.handle())
            .into_iter()
            .filter(ScanCommand::is_motion)
            .collect();
        assert_eq!(
            motions,
            vec![
                ScanCommand::JumpAbsolute { x: 5000.0, y: 5000.0 },
                ScanCommand::MarkAbsolute { x: 6000.0, y: 6000.0 },
            ]
        );
    }

    #[test]
    fn test_unassigned_segment_fails_when_required() {
        let (_mock, mut list) = mock_list();
        let layer = LayerData::new(1.0)
            .with_segment(polyline(&[(0.0, 0.0), (1.0, 1.0)], 1))
            .with_segment(polyline(&[(0.0, 0.0), (1.0, 1.0)], 0));

        assert!(matches!(
            list.add_layer_to_list(&layer, 1, true),
            Err(Error::SegmentHasNoAssignedCard(1))
        ));
    }

    #[test]
    fn test_single_point_segment_is_skipped() {
        let (mock, mut list) = mock_list();
        let layer = LayerData::new(1.0).with_segment(polyline(&[(3.0, 3.0)], 0));

        list.add_layer_to_list(&layer, 0, false).unwrap();
        assert_eq!(
            mock.commands(list.handle()),
            vec![ScanCommand::LaserOn, ScanCommand::LaserOff]
        );
    }

    #[test]
    fn test_odd_hatch_fails() {
        let (_mock, mut list) = mock_list();
        let layer = LayerData::new(1.0).with_segment(SegmentData::new(
            SegmentType::Hatch,
            vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0), Point2D::new(2.0, 0.0)],
            SegmentProfile::new(1000.0, 100.0, 10.0),
        ));

        assert!(matches!(
            list.add_layer_to_list(&layer, 0, false),
            Err(Error::InvalidPointCount { segment: 0, actual: 3, .. })
        ));
    }

    /// Layer whose reported point count disagrees with its geometry.
    struct MiscountedLayer {
        inner: LayerData,
        reported: u32,
    }

    impl ToolpathLayer for MiscountedLayer {
        fn units(&self) -> f64 {
            self.inner.units()
        }

        fn segment_count(&self) -> u32 {
            self.inner.segment_count()
        }

        fn segment_info(&self, segment: u32) -> Result<(SegmentType, u32)> {
            let (segment_type, _) = self.inner.segment_info(segment)?;
            Ok((segment_type, self.reported))
        }

        fn segment_profile_integer_value(&self, segment: u32, key: &str, default: i64) -> Result<i64> {
            self.inner.segment_profile_integer_value(segment, key, default)
        }

        fn segment_profile_typed_value(&self, segment: u32, value_type: ProfileValueType) -> Result<f64> {
            self.inner.segment_profile_typed_value(segment, value_type)
        }

        fn segment_point_data_in_mm(&self, segment: u32) -> Result<Vec<Point2D>> {
            self.inner.segment_point_data_in_mm(segment)
        }

        fn segment_hatch_data_in_mm(&self, segment: u32) -> Result<Vec<Hatch2D>> {
            self.inner.segment_hatch_data_in_mm(segment)
        }
    }

    #[test]
    fn test_polyline_point_count_mismatch() {
        let (mock, mut list) = mock_list();
        let layer = MiscountedLayer {
            inner: LayerData::new(1.0).with_segment(polyline(&[(0.0, 0.0), (1.0, 0.0)], 0)),
            reported: 3,
        };

        assert!(matches!(
            list.add_layer_to_list(&layer, 0, false),
            Err(Error::InvalidPointCount { segment: 0, expected: 3, actual: 2 })
        ));
        assert!(!mock.commands(list.handle()).iter().any(ScanCommand::is_motion));
    }

    #[test]
    fn test_hatch_count_mismatch() {
        let (_mock, mut list) = mock_list();
        let layer = MiscountedLayer {
            inner: LayerData::new(1.0).with_segment(SegmentData::new(
                SegmentType::Hatch,
                vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)],
                SegmentProfile::new(1000.0, 100.0, 10.0),
            )),
            reported: 4,
        };

        assert!(matches!(
            list.add_layer_to_list(&layer, 0, false),
            Err(Error::InvalidPointCount { segment: 0, expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_hatch_pairs() {
        let (mock, mut list) = mock_list();
        let layer = LayerData::new(1.0).with_segment(SegmentData::new(
            SegmentType::Hatch,
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(1.0, 0.0),
                Point2D::new(0.0, 0.1),
                Point2D::new(1.0, 0.1),
            ],
            SegmentProfile::new(1000.0, 100.0, 100.0),
        ));

        list.add_layer_to_list(&layer, 0, false).unwrap();
        let commands = mock.commands(list.handle());
        assert_eq!(commands[3], ScanCommand::SetPower { units: 65535 });
        assert_eq!(&commands[4..8], &[
            ScanCommand::JumpAbsolute { x: 0.0, y: 0.0 },
            ScanCommand::MarkAbsolute { x: 1000.0, y: 0.0 },
            ScanCommand::JumpAbsolute { x: 0.0, y: 100.0 },
            ScanCommand::MarkAbsolute { x: 1000.0, y: 100.0 },
        ]);
    }

    #[test]
    fn test_slot_management() {
        let (mock, mut list) = mock_list();

        assert!(matches!(list.set_list_on_card(256), Err(Error::InvalidListId(256))));
        assert!(matches!(list.execute_list(300), Err(Error::InvalidListId(300))));

        list.set_list_on_card(4).unwrap();
        list.set_list_on_card(7).unwrap();
        assert_eq!(list.slot(), Some(7));
        assert_eq!(mock.occupied_slots(), vec![(CardHandle(1), 7)]);
        assert_eq!(mock.call_count("list_delete"), 1);

        list.delete_list_from_card().unwrap();
        list.delete_list_from_card().unwrap();
        assert_eq!(mock.call_count("list_delete"), 2);
        assert_eq!(list.slot(), None);
    }

    #[test]
    fn test_drop_cleans_up() {
        let (mock, mut list) = mock_list();
        let handle = list.handle();
        list.set_list_on_card(0).unwrap();
        drop(list);

        assert!(mock.occupied_slots().is_empty());
        assert_eq!(mock.released_lists(), vec![handle]);
    }

    #[test]
    fn test_append_failure_is_tagged() {
        let (mock, mut list) = mock_list();
        mock.fail_next("list_append_power", 12, "list full");

        let error = list.append(ScanCommand::SetPower { units: 1 }).unwrap_err();
        assert_eq!(error.to_string(), "Device error 12 (list full - rlListAppendPower)");
        assert_eq!(list.command_count(), 0);
    }

    #[test]
    fn test_abort_only_when_running() {
        let (mock, mut list) = mock_list();
        assert!(!list.abort_execution_if_in_progress().unwrap());
        assert_eq!(mock.call_count("list_abort_execution"), 0);

        mock.set_execution_in_progress(true);
        assert!(list.abort_execution_if_in_progress().unwrap());
        assert_eq!(mock.call_count("list_abort_execution"), 1);
    }
}
