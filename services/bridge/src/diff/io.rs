//! `io` channel diff.

use super::{float_differs, sync, sync_position, StatusTracker};
use crate::runtime::{StatSnapshot, ToolEntry};
use mk_protocol::status::{Position, StatusIo, ToolData};

fn seeded() -> StatusIo {
    StatusIo {
        estop: Some(0),
        flood: Some(0),
        lube: Some(0),
        lube_level: Some(0),
        mist: Some(0),
        pocket_prepped: Some(0),
        tool_in_spindle: Some(0),
        tool_offset: Some(Position::zeroed()),
        tool_table: Vec::new(),
    }
}

fn zeroed_tool_slot(index: i32) -> ToolData {
    ToolData {
        index: Some(index),
        id: Some(0),
        x_offset: Some(0.0),
        y_offset: Some(0.0),
        z_offset: Some(0.0),
        a_offset: Some(0.0),
        b_offset: Some(0.0),
        c_offset: Some(0.0),
        u_offset: Some(0.0),
        v_offset: Some(0.0),
        w_offset: Some(0.0),
        diameter: Some(0.0),
        frontangle: Some(0.0),
        backangle: Some(0.0),
        orientation: Some(0),
    }
}

/// Diff the tool table.  Baseline slots are created for every fresh row
/// (so the array stays index-aligned), but rows with the `id == -1`
/// sentinel never produce a delta.
fn sync_tool_table(base: &mut Vec<ToolData>, fresh: &[ToolEntry], tx: &mut Vec<ToolData>) -> bool {
    let mut modified = false;
    for (i, entry) in fresh.iter().enumerate() {
        let index = i32::try_from(i).unwrap_or(i32::MAX);
        if base.len() == i {
            base.push(zeroed_tool_slot(index));
        }
        if entry.id == -1 {
            continue;
        }

        let slot = &mut base[i];
        let mut delta = ToolData::default();
        let mut row_modified = false;

        if slot.id != Some(entry.id) {
            slot.id = Some(entry.id);
            delta.id = Some(entry.id);
            row_modified = true;
        }

        let float_fields: [(&mut Option<f64>, f64, &mut Option<f64>); 12] = [
            (&mut slot.x_offset, entry.x_offset, &mut delta.x_offset),
            (&mut slot.y_offset, entry.y_offset, &mut delta.y_offset),
            (&mut slot.z_offset, entry.z_offset, &mut delta.z_offset),
            (&mut slot.a_offset, entry.a_offset, &mut delta.a_offset),
            (&mut slot.b_offset, entry.b_offset, &mut delta.b_offset),
            (&mut slot.c_offset, entry.c_offset, &mut delta.c_offset),
            (&mut slot.u_offset, entry.u_offset, &mut delta.u_offset),
            (&mut slot.v_offset, entry.v_offset, &mut delta.v_offset),
            (&mut slot.w_offset, entry.w_offset, &mut delta.w_offset),
            (&mut slot.diameter, entry.diameter, &mut delta.diameter),
            (&mut slot.frontangle, entry.frontangle, &mut delta.frontangle),
            (&mut slot.backangle, entry.backangle, &mut delta.backangle),
        ];
        for (base_field, fresh_value, delta_field) in float_fields {
            if float_differs(base_field.unwrap_or(0.0), fresh_value) {
                *base_field = Some(fresh_value);
                *delta_field = Some(fresh_value);
                row_modified = true;
            }
        }

        if slot.orientation != Some(entry.orientation) {
            slot.orientation = Some(entry.orientation);
            delta.orientation = Some(entry.orientation);
            row_modified = true;
        }

        if row_modified {
            delta.index = Some(index);
            tx.push(delta);
            modified = true;
        }
    }
    modified
}

impl StatusTracker {
    /// Diff the io channel; returns the delta when anything changed.
    pub fn update_io(&mut self, stat: &StatSnapshot) -> Option<StatusIo> {
        if self.io_first {
            self.io = seeded();
            self.io_first = false;
        }

        let base = &mut self.io;
        let mut tx = StatusIo::default();
        let mut modified = false;

        modified |= sync(&mut base.estop, stat.estop, &mut tx.estop);
        modified |= sync(&mut base.flood, stat.flood, &mut tx.flood);
        modified |= sync(&mut base.lube, stat.lube, &mut tx.lube);
        modified |= sync(&mut base.lube_level, stat.lube_level, &mut tx.lube_level);
        modified |= sync(&mut base.mist, stat.mist, &mut tx.mist);
        modified |= sync(
            &mut base.pocket_prepped,
            stat.pocket_prepped,
            &mut tx.pocket_prepped,
        );
        modified |= sync(
            &mut base.tool_in_spindle,
            stat.tool_in_spindle,
            &mut tx.tool_in_spindle,
        );
        modified |= sync_position(&mut base.tool_offset, &stat.tool_offset, &mut tx.tool_offset);
        modified |= sync_tool_table(&mut base.tool_table, &stat.tool_table, &mut tx.tool_table);

        modified.then_some(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;

    #[test]
    fn sentinel_rows_never_appear_in_deltas() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let stat = StatSnapshot {
            tool_table: vec![
                ToolEntry {
                    id: 1,
                    diameter: 3.0,
                    ..ToolEntry::default()
                },
                ToolEntry {
                    id: -1,
                    diameter: 99.0,
                    ..ToolEntry::default()
                },
                ToolEntry {
                    id: 5,
                    z_offset: 0.25,
                    ..ToolEntry::default()
                },
            ],
            ..StatSnapshot::default()
        };
        let delta = tracker.update_io(&stat).unwrap();
        let indices: Vec<_> = delta.tool_table.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![Some(0), Some(2)]);
        // the skipped slot still exists in the baseline
        assert_eq!(tracker.io_baseline().tool_table.len(), 3);
    }

    #[test]
    fn tool_row_delta_contains_only_changed_fields() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot {
            tool_table: vec![ToolEntry {
                id: 7,
                diameter: 3.0,
                ..ToolEntry::default()
            }],
            ..StatSnapshot::default()
        };
        let _ = tracker.update_io(&stat);

        stat.tool_table[0].diameter = 3.5;
        let delta = tracker.update_io(&stat).unwrap();
        assert_eq!(delta.tool_table.len(), 1);
        let row = &delta.tool_table[0];
        assert_eq!(row.index, Some(0));
        assert_eq!(row.diameter, Some(3.5));
        assert_eq!(row.id, None);
        assert_eq!(row.z_offset, None);
    }

    #[test]
    fn tool_offset_position_diffs_per_component() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot::default();
        stat.tool_offset[2] = 0.5;
        let delta = tracker.update_io(&stat).unwrap();
        let offset = delta.tool_offset.unwrap();
        assert_eq!(offset.z, Some(0.5));
        assert_eq!(offset.x, None);
    }

    #[test]
    fn estop_toggle_round_trip() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot::default();
        assert!(tracker.update_io(&stat).is_none());
        stat.estop = 1;
        let delta = tracker.update_io(&stat).unwrap();
        assert_eq!(delta.estop, Some(1));
        assert_eq!(delta.flood, None);
        stat.estop = 0;
        let delta = tracker.update_io(&stat).unwrap();
        assert_eq!(delta.estop, Some(0));
    }
}
