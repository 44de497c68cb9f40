//! `config` channel diff.
//!
//! Most fields track the runtime snapshot; the override limits, default
//! velocities, display strings, and program-extension list come from the
//! machine ini and are folded in once, during the first diff, so they ride
//! the channel's first publication and are never re-read.

use super::{float_differs, sync, sync_float, StatusTracker};
use crate::runtime::{AxisStat, StatSnapshot};
use mk_protocol::status::{ConfigAxis, ProgramExtension, StatusConfig};

fn seeded() -> StatusConfig {
    StatusConfig {
        acceleration: Some(0.0),
        angular_units: Some(0.0),
        axes: Some(0),
        axis: Vec::new(),
        axis_mask: Some(0),
        cycle_time: Some(0.0),
        debug: Some(0),
        kinematics_type: Some(0),
        linear_units: Some(0.0),
        max_acceleration: Some(0.0),
        max_velocity: Some(0.0),
        program_units: Some(0),
        velocity: Some(0.0),
        position_offset: Some(0),
        position_feedback: Some(0),
        max_feed_override: Some(0.0),
        min_feed_override: Some(0.0),
        max_spindle_override: Some(0.0),
        min_spindle_override: Some(0.0),
        default_spindle_speed: Some(0.0),
        default_linear_velocity: Some(0.0),
        min_velocity: Some(0.0),
        max_linear_velocity: Some(0.0),
        min_linear_velocity: Some(0.0),
        default_angular_velocity: Some(0.0),
        max_angular_velocity: Some(0.0),
        min_angular_velocity: Some(0.0),
        increments: Some(String::new()),
        grids: Some(String::new()),
        lathe: Some(false),
        geometry: Some(String::new()),
        arcdivision: Some(0),
        no_force_homing: Some(false),
        program_extension: Vec::new(),
    }
}

fn zeroed_axis_slot(index: i32) -> ConfigAxis {
    ConfigAxis {
        index: Some(index),
        axis_type: Some(0),
        backlash: Some(0.0),
        max_ferror: Some(0.0),
        max_position_limit: Some(0.0),
        min_ferror: Some(0.0),
        min_position_limit: Some(0.0),
        units: Some(0.0),
    }
}

fn sync_axes(
    base: &mut Vec<ConfigAxis>,
    fresh: &[AxisStat],
    axes: i32,
    tx: &mut Vec<ConfigAxis>,
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
        let mut delta = ConfigAxis::default();
        let mut axis_modified = false;

        if slot.axis_type != Some(axis.axis_type) {
            slot.axis_type = Some(axis.axis_type);
            delta.axis_type = Some(axis.axis_type);
            axis_modified = true;
        }

        let float_fields: [(&mut Option<f64>, f64, &mut Option<f64>); 6] = [
            (&mut slot.backlash, axis.backlash, &mut delta.backlash),
            (&mut slot.max_ferror, axis.max_ferror, &mut delta.max_ferror),
            (
                &mut slot.max_position_limit,
                axis.max_position_limit,
                &mut delta.max_position_limit,
            ),
            (&mut slot.min_ferror, axis.min_ferror, &mut delta.min_ferror),
            (
                &mut slot.min_position_limit,
                axis.min_position_limit,
                &mut delta.min_position_limit,
            ),
            (&mut slot.units, axis.units, &mut delta.units),
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
    /// Diff the config channel; returns the delta when anything changed.
    pub fn update_config(&mut self, stat: &StatSnapshot) -> Option<StatusConfig> {
        let mut tx = StatusConfig::default();
        let mut modified = false;

        if self.config_first {
            self.config = seeded();
            self.config_first = false;
            modified |= self.apply_static_config(&mut tx);
        }

        let base = &mut self.config;
        modified |= sync_float(&mut base.acceleration, stat.acceleration, &mut tx.acceleration);
        modified |= sync_float(
            &mut base.angular_units,
            stat.angular_units,
            &mut tx.angular_units,
        );
        modified |= sync(&mut base.axes, stat.axes, &mut tx.axes);
        modified |= sync_axes(&mut base.axis, &stat.axis, stat.axes, &mut tx.axis);
        modified |= sync(&mut base.axis_mask, stat.axis_mask, &mut tx.axis_mask);
        modified |= sync_float(&mut base.cycle_time, stat.cycle_time, &mut tx.cycle_time);
        modified |= sync(&mut base.debug, stat.debug, &mut tx.debug);
        modified |= sync(
            &mut base.kinematics_type,
            stat.kinematics_type,
            &mut tx.kinematics_type,
        );
        modified |= sync_float(&mut base.linear_units, stat.linear_units, &mut tx.linear_units);
        modified |= sync_float(
            &mut base.max_acceleration,
            stat.max_acceleration,
            &mut tx.max_acceleration,
        );
        modified |= sync_float(&mut base.max_velocity, stat.max_velocity, &mut tx.max_velocity);
        modified |= sync(
            &mut base.program_units,
            stat.program_units,
            &mut tx.program_units,
        );
        modified |= sync_float(&mut base.velocity, stat.velocity, &mut tx.velocity);

        modified.then_some(tx)
    }

    /// Fold the ini-sourced fields into the baseline and the first delta.
    fn apply_static_config(&mut self, tx: &mut StatusConfig) -> bool {
        let ini = &self.static_config;
        let base = &mut self.config;
        let mut modified = false;

        modified |= sync(
            &mut base.position_offset,
            ini.position_offset as i32,
            &mut tx.position_offset,
        );
        modified |= sync(
            &mut base.position_feedback,
            ini.position_feedback as i32,
            &mut tx.position_feedback,
        );
        modified |= sync_float(
            &mut base.max_feed_override,
            ini.max_feed_override,
            &mut tx.max_feed_override,
        );
        modified |= sync_float(
            &mut base.min_feed_override,
            ini.min_feed_override,
            &mut tx.min_feed_override,
        );
        modified |= sync_float(
            &mut base.max_spindle_override,
            ini.max_spindle_override,
            &mut tx.max_spindle_override,
        );
        modified |= sync_float(
            &mut base.min_spindle_override,
            ini.min_spindle_override,
            &mut tx.min_spindle_override,
        );
        modified |= sync_float(
            &mut base.default_spindle_speed,
            ini.default_spindle_speed,
            &mut tx.default_spindle_speed,
        );
        modified |= sync_float(
            &mut base.default_linear_velocity,
            ini.default_linear_velocity,
            &mut tx.default_linear_velocity,
        );
        modified |= sync_float(&mut base.min_velocity, ini.min_velocity, &mut tx.min_velocity);
        modified |= sync_float(
            &mut base.max_linear_velocity,
            ini.max_linear_velocity,
            &mut tx.max_linear_velocity,
        );
        modified |= sync_float(
            &mut base.min_linear_velocity,
            ini.min_linear_velocity,
            &mut tx.min_linear_velocity,
        );
        modified |= sync_float(
            &mut base.default_angular_velocity,
            ini.default_angular_velocity,
            &mut tx.default_angular_velocity,
        );
        modified |= sync_float(
            &mut base.max_angular_velocity,
            ini.max_angular_velocity,
            &mut tx.max_angular_velocity,
        );
        modified |= sync_float(
            &mut base.min_angular_velocity,
            ini.min_angular_velocity,
            &mut tx.min_angular_velocity,
        );
        modified |= sync(
            &mut base.increments,
            ini.increments.clone(),
            &mut tx.increments,
        );
        modified |= sync(&mut base.grids, ini.grids.clone(), &mut tx.grids);
        modified |= sync(&mut base.lathe, ini.lathe, &mut tx.lathe);
        modified |= sync(&mut base.geometry, ini.geometry.clone(), &mut tx.geometry);
        modified |= sync(&mut base.arcdivision, ini.arcdivision, &mut tx.arcdivision);
        modified |= sync(
            &mut base.no_force_homing,
            ini.no_force_homing,
            &mut tx.no_force_homing,
        );

        for (i, extension) in ini.program_extensions.iter().enumerate() {
            let index = i32::try_from(i).unwrap_or(i32::MAX);
            base.program_extension.push(ProgramExtension {
                index: Some(index),
                extension: Some(extension.clone()),
            });
            tx.program_extension.push(ProgramExtension {
                index: Some(index),
                extension: Some(extension.clone()),
            });
            modified = true;
        }

        modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;

    #[test]
    fn first_diff_includes_static_ini_fields() {
        let display = DisplayConfig {
            program_extensions: vec![".ngc".to_owned(), ".gcode".to_owned()],
            geometry: "XYZ".to_owned(),
            ..DisplayConfig::default()
        };
        let mut tracker = StatusTracker::new(&display);
        let delta = tracker.update_config(&StatSnapshot::default()).unwrap();

        assert_eq!(delta.max_feed_override, Some(1.2));
        assert_eq!(delta.arcdivision, Some(64));
        assert_eq!(delta.geometry.as_deref(), Some("XYZ"));
        assert_eq!(delta.program_extension.len(), 2);
        assert_eq!(delta.program_extension[1].extension.as_deref(), Some(".gcode"));
        // zero-valued statics are not part of the delta
        assert_eq!(delta.position_offset, None);
        assert_eq!(delta.lathe, None);
    }

    #[test]
    fn static_fields_are_not_re_emitted() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let stat = StatSnapshot::default();
        assert!(tracker.update_config(&stat).is_some());
        // second identical poll: statics are settled, runtime fields unchanged
        assert!(tracker.update_config(&stat).is_none());
    }

    #[test]
    fn runtime_fields_keep_diffing_after_first_run() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot::default();
        let _ = tracker.update_config(&stat);

        stat.max_velocity = 12.0;
        let delta = tracker.update_config(&stat).unwrap();
        assert_eq!(delta.max_velocity, Some(12.0));
        assert_eq!(delta.max_feed_override, None);
    }

    #[test]
    fn config_axes_bounded_by_declared_count() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let stat = StatSnapshot {
            axes: 2,
            axis: vec![
                AxisStat {
                    units: 1.0,
                    ..AxisStat::default()
                },
                AxisStat {
                    units: 1.0,
                    ..AxisStat::default()
                },
                AxisStat {
                    units: 1.0,
                    ..AxisStat::default()
                },
            ],
            ..StatSnapshot::default()
        };
        let delta = tracker.update_config(&stat).unwrap();
        assert_eq!(delta.axis.len(), 2);
    }
}
