//! `motion` channel diff.

use super::{float_differs, sync, sync_analog, sync_digital, sync_float, sync_position, StatusTracker};
use crate::runtime::{AxisStat, StatSnapshot};
use mk_protocol::status::{MotionAxis, Position, StatusMotion};

fn seeded() -> StatusMotion {
    StatusMotion {
        active_queue: Some(0),
        actual_position: Some(Position::zeroed()),
        adaptive_feed_enabled: Some(false),
        ain: Vec::new(),
        aout: Vec::new(),
        axis: Vec::new(),
        block_delete: Some(false),
        current_line: Some(0),
        current_vel: Some(0.0),
        delay_left: Some(0.0),
        din: Vec::new(),
        distance_to_go: Some(0.0),
        dout: Vec::new(),
        dtg: Some(Position::zeroed()),
        enabled: Some(false),
        feed_hold_enabled: Some(false),
        feed_override_enabled: Some(false),
        feedrate: Some(0.0),
        g5x_index: Some(0),
        g5x_offset: Some(Position::zeroed()),
        g92_offset: Some(Position::zeroed()),
        id: Some(0),
        inpos: Some(false),
        joint_actual_position: Some(Position::zeroed()),
        joint_position: Some(Position::zeroed()),
        limit: Vec::new(),
        motion_line: Some(0),
        motion_type: Some(0),
        motion_mode: Some(0),
        paused: Some(false),
        position: Some(Position::zeroed()),
        probe_tripped: Some(false),
        probe_val: Some(0),
        probed_position: Some(Position::zeroed()),
        probing: Some(false),
        queue: Some(0),
        queue_full: Some(false),
        rotation_xy: Some(0.0),
        spindle_brake: Some(0),
        spindle_direction: Some(0),
        spindle_enabled: Some(0),
        spindle_increasing: Some(0),
        spindle_override_enabled: Some(false),
        spindle_speed: Some(0.0),
        spindlerate: Some(0.0),
        state: Some(0),
    }
}

fn zeroed_axis_slot(index: i32) -> MotionAxis {
    MotionAxis {
        index: Some(index),
        enabled: Some(false),
        fault: Some(false),
        ferror_current: Some(0.0),
        ferror_highmark: Some(0.0),
        homed: Some(false),
        homing: Some(false),
        inpos: Some(false),
        input: Some(0.0),
        max_hard_limit: Some(false),
        max_soft_limit: Some(false),
        min_hard_limit: Some(false),
        min_soft_limit: Some(false),
        output: Some(0.0),
        override_limits: Some(false),
        velocity: Some(0.0),
    }
}

/// Diff the live axis records, bounded by the runtime's declared `axes`
/// count; trailing entries beyond it are ignored.
fn sync_axes(
    base: &mut Vec<MotionAxis>,
    fresh: &[AxisStat],
    axes: i32,
    tx: &mut Vec<MotionAxis>,
) -> bool {
    let mut modified = false;
    for (i, axis) in fresh.iter().enumerate() {
        let index = i32::try_from(i).unwrap_or(i32::MAX);
        if index == axes {
            break;
        }
        if base.len() == i {
            base.push(zeroed_axis_slot(index));
        }

        let slot = &mut base[i];
        let mut delta = MotionAxis::default();
        let mut axis_modified = false;

        let bool_fields: [(&mut Option<bool>, bool, &mut Option<bool>); 10] = [
            (&mut slot.enabled, axis.enabled, &mut delta.enabled),
            (&mut slot.fault, axis.fault, &mut delta.fault),
            (&mut slot.homed, axis.homed, &mut delta.homed),
            (&mut slot.homing, axis.homing, &mut delta.homing),
            (&mut slot.inpos, axis.inpos, &mut delta.inpos),
            (
                &mut slot.max_hard_limit,
                axis.max_hard_limit,
                &mut delta.max_hard_limit,
            ),
            (
                &mut slot.max_soft_limit,
                axis.max_soft_limit,
                &mut delta.max_soft_limit,
            ),
            (
                &mut slot.min_hard_limit,
                axis.min_hard_limit,
                &mut delta.min_hard_limit,
            ),
            (
                &mut slot.min_soft_limit,
                axis.min_soft_limit,
                &mut delta.min_soft_limit,
            ),
            (
                &mut slot.override_limits,
                axis.override_limits,
                &mut delta.override_limits,
            ),
        ];
        for (base_field, fresh_value, delta_field) in bool_fields {
            if *base_field != Some(fresh_value) {
                *base_field = Some(fresh_value);
                *delta_field = Some(fresh_value);
                axis_modified = true;
            }
        }

        let float_fields: [(&mut Option<f64>, f64, &mut Option<f64>); 5] = [
            (
                &mut slot.ferror_current,
                axis.ferror_current,
                &mut delta.ferror_current,
            ),
            (
                &mut slot.ferror_highmark,
                axis.ferror_highmark,
                &mut delta.ferror_highmark,
            ),
            (&mut slot.input, axis.input, &mut delta.input),
            (&mut slot.output, axis.output, &mut delta.output),
            (&mut slot.velocity, axis.velocity, &mut delta.velocity),
        ];
        for (base_field, fresh_value, delta_field) in float_fields {
            if float_differs(base_field.unwrap_or(0.0), fresh_value) {
                *base_field = Some(fresh_value);
                *delta_field = Some(fresh_value);
                axis_modified = true;
            }
        }

        if axis_modified {
            delta.index = Some(index);
            tx.push(delta);
            modified = true;
        }
    }
    modified
}

impl StatusTracker {
    /// Diff the motion channel; returns the delta when anything changed.
    pub fn update_motion(&mut self, stat: &StatSnapshot) -> Option<StatusMotion> {
        if self.motion_first {
            self.motion = seeded();
            self.motion_first = false;
        }

        let base = &mut self.motion;
        let mut tx = StatusMotion::default();
        let mut modified = false;

        modified |= sync(&mut base.active_queue, stat.active_queue, &mut tx.active_queue);
        modified |= sync_position(
            &mut base.actual_position,
            &stat.actual_position,
            &mut tx.actual_position,
        );
        modified |= sync(
            &mut base.adaptive_feed_enabled,
            stat.adaptive_feed_enabled,
            &mut tx.adaptive_feed_enabled,
        );
        modified |= sync_analog(&mut base.ain, &stat.ain, &mut tx.ain);
        modified |= sync_analog(&mut base.aout, &stat.aout, &mut tx.aout);
        modified |= sync_axes(&mut base.axis, &stat.axis, stat.axes, &mut tx.axis);
        modified |= sync(&mut base.block_delete, stat.block_delete, &mut tx.block_delete);
        modified |= sync(&mut base.current_line, stat.current_line, &mut tx.current_line);
        modified |= sync_float(&mut base.current_vel, stat.current_vel, &mut tx.current_vel);
        modified |= sync_float(&mut base.delay_left, stat.delay_left, &mut tx.delay_left);
        modified |= sync_digital(&mut base.din, &stat.din, &mut tx.din);
        modified |= sync_float(
            &mut base.distance_to_go,
            stat.distance_to_go,
            &mut tx.distance_to_go,
        );
        modified |= sync_digital(&mut base.dout, &stat.dout, &mut tx.dout);
        modified |= sync_position(&mut base.dtg, &stat.dtg, &mut tx.dtg);
        modified |= sync(&mut base.enabled, stat.enabled, &mut tx.enabled);
        modified |= sync(
            &mut base.feed_hold_enabled,
            stat.feed_hold_enabled,
            &mut tx.feed_hold_enabled,
        );
        modified |= sync(
            &mut base.feed_override_enabled,
            stat.feed_override_enabled,
            &mut tx.feed_override_enabled,
        );
        modified |= sync_float(&mut base.feedrate, stat.feedrate, &mut tx.feedrate);
        modified |= sync(&mut base.g5x_index, stat.g5x_index, &mut tx.g5x_index);
        modified |= sync_position(&mut base.g5x_offset, &stat.g5x_offset, &mut tx.g5x_offset);
        modified |= sync_position(&mut base.g92_offset, &stat.g92_offset, &mut tx.g92_offset);
        modified |= sync(&mut base.id, stat.id, &mut tx.id);
        modified |= sync(&mut base.inpos, stat.inpos, &mut tx.inpos);
        modified |= sync_position(
            &mut base.joint_actual_position,
            &stat.joint_actual_position,
            &mut tx.joint_actual_position,
        );
        modified |= sync_position(
            &mut base.joint_position,
            &stat.joint_position,
            &mut tx.joint_position,
        );
        modified |= sync_digital(&mut base.limit, &stat.limit, &mut tx.limit);
        modified |= sync(&mut base.motion_line, stat.motion_line, &mut tx.motion_line);
        modified |= sync(&mut base.motion_type, stat.motion_type, &mut tx.motion_type);
        modified |= sync(&mut base.motion_mode, stat.motion_mode, &mut tx.motion_mode);
        modified |= sync(&mut base.paused, stat.paused, &mut tx.paused);
        modified |= sync_position(&mut base.position, &stat.position, &mut tx.position);
        modified |= sync(
            &mut base.probe_tripped,
            stat.probe_tripped,
            &mut tx.probe_tripped,
        );
        modified |= sync(&mut base.probe_val, stat.probe_val, &mut tx.probe_val);
        modified |= sync_position(
            &mut base.probed_position,
            &stat.probed_position,
            &mut tx.probed_position,
        );
        modified |= sync(&mut base.probing, stat.probing, &mut tx.probing);
        modified |= sync(&mut base.queue, stat.queue, &mut tx.queue);
        modified |= sync(&mut base.queue_full, stat.queue_full, &mut tx.queue_full);
        modified |= sync_float(&mut base.rotation_xy, stat.rotation_xy, &mut tx.rotation_xy);
        modified |= sync(
            &mut base.spindle_brake,
            stat.spindle_brake,
            &mut tx.spindle_brake,
        );
        modified |= sync(
            &mut base.spindle_direction,
            stat.spindle_direction,
            &mut tx.spindle_direction,
        );
        modified |= sync(
            &mut base.spindle_enabled,
            stat.spindle_enabled,
            &mut tx.spindle_enabled,
        );
        modified |= sync(
            &mut base.spindle_increasing,
            stat.spindle_increasing,
            &mut tx.spindle_increasing,
        );
        modified |= sync(
            &mut base.spindle_override_enabled,
            stat.spindle_override_enabled,
            &mut tx.spindle_override_enabled,
        );
        modified |= sync_float(
            &mut base.spindle_speed,
            stat.spindle_speed,
            &mut tx.spindle_speed,
        );
        modified |= sync_float(&mut base.spindlerate, stat.spindlerate, &mut tx.spindlerate);
        modified |= sync(&mut base.state, stat.state, &mut tx.state);

        modified.then_some(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;

    #[test]
    fn axis_iteration_stops_at_declared_count() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let stat = StatSnapshot {
            axes: 1,
            axis: vec![
                AxisStat {
                    homed: true,
                    ..AxisStat::default()
                },
                AxisStat {
                    homed: true,
                    ..AxisStat::default()
                },
            ],
            ..StatSnapshot::default()
        };
        let delta = tracker.update_motion(&stat).unwrap();
        assert_eq!(delta.axis.len(), 1);
        assert_eq!(delta.axis[0].index, Some(0));
        assert_eq!(tracker.motion_baseline().axis.len(), 1);
    }

    #[test]
    fn feedrate_walks_the_tolerance_boundary() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot {
            feedrate: 1.0,
            ..StatSnapshot::default()
        };
        let delta = tracker.update_motion(&stat).unwrap();
        assert_eq!(delta.feedrate, Some(1.0));

        stat.feedrate = 1.00005;
        assert!(tracker.update_motion(&stat).is_none());

        stat.feedrate = 1.0002;
        let delta = tracker.update_motion(&stat).unwrap();
        assert_eq!(delta.feedrate, Some(1.0002));
        assert_eq!(delta.enabled, None);
        assert!(delta.axis.is_empty());
    }

    #[test]
    fn axis_delta_carries_only_changed_fields() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot {
            axes: 2,
            axis: vec![AxisStat::default(), AxisStat::default()],
            ..StatSnapshot::default()
        };
        assert!(tracker.update_motion(&stat).is_none());

        stat.axis[1].velocity = 2.5;
        let delta = tracker.update_motion(&stat).unwrap();
        assert_eq!(delta.axis.len(), 1);
        let axis = &delta.axis[0];
        assert_eq!(axis.index, Some(1));
        assert_eq!(axis.velocity, Some(2.5));
        assert_eq!(axis.homed, None);
    }

    #[test]
    fn positions_diff_independently() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot::default();
        assert!(tracker.update_motion(&stat).is_none());

        stat.dtg[0] = 4.0;
        let delta = tracker.update_motion(&stat).unwrap();
        assert!(delta.dtg.is_some());
        assert!(delta.actual_position.is_none());
        assert!(delta.g5x_offset.is_none());
    }
}
