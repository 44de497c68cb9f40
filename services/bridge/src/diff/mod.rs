//! Differential status replication.
//!
//! `StatusTracker` owns one baseline per status channel.  Each
//! `update_<channel>` call compares a fresh runtime snapshot against the
//! baseline, writes every change through to the baseline, and returns a
//! delta containing only the changed fields, or `None` when nothing
//! changed.  A full update is simply a clone of the baseline.
//!
//! Comparison rules:
//! - int / bool / string / enum: `!=`
//! - float: differs iff `|a − b| > 1e-4`
//! - position: per-component float rule; a delta carries only the changed
//!   components, the baseline receives the full component set
//! - indexed arrays: iterate fresh by index, growing the baseline with
//!   zeroed slots as needed; one delta record per changed slot, carrying
//!   `index` plus the changed fields.  Axis arrays stop at the runtime's
//!   declared `axes` count; tool rows with `id == -1` are skipped.
//!
//! On the first run of a channel the baseline is seeded with explicit
//! zeros, so the first delta covers every non-zero field.  Config-channel
//! fields sourced from the machine ini are folded in during that first run
//! only.

mod config;
mod interp;
mod io;
mod motion;
mod task;

use crate::config::DisplayConfig;
use mk_protocol::status::{
    AnalogIo, CodeSlot, DigitalIo, Position, SettingSlot, StatusConfig, StatusInterp, StatusIo,
    StatusMotion, StatusTask,
};

/// Absolute tolerance for float comparison on all numeric status fields.
pub const FLOAT_TOLERANCE: f64 = 1e-4;

/// Baselines and first-run flags for all five channels.
pub struct StatusTracker {
    pub(crate) io: StatusIo,
    pub(crate) task: StatusTask,
    pub(crate) interp: StatusInterp,
    pub(crate) motion: StatusMotion,
    pub(crate) config: StatusConfig,

    pub(crate) io_first: bool,
    pub(crate) task_first: bool,
    pub(crate) interp_first: bool,
    pub(crate) motion_first: bool,
    pub(crate) config_first: bool,

    /// Ini-sourced config fields, applied once on the first config diff.
    pub(crate) static_config: DisplayConfig,
}

impl StatusTracker {
    pub fn new(display: &DisplayConfig) -> Self {
        StatusTracker {
            io: StatusIo::default(),
            task: StatusTask::default(),
            interp: StatusInterp::default(),
            motion: StatusMotion::default(),
            config: StatusConfig::default(),
            io_first: true,
            task_first: true,
            interp_first: true,
            motion_first: true,
            config_first: true,
            static_config: display.clone(),
        }
    }

    pub fn io_baseline(&self) -> &StatusIo {
        &self.io
    }

    pub fn task_baseline(&self) -> &StatusTask {
        &self.task
    }

    pub fn interp_baseline(&self) -> &StatusInterp {
        &self.interp
    }

    pub fn motion_baseline(&self) -> &StatusMotion {
        &self.motion
    }

    pub fn config_baseline(&self) -> &StatusConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Field sync helpers
// ---------------------------------------------------------------------------

pub(crate) fn float_differs(a: f64, b: f64) -> bool {
    (a - b).abs() > FLOAT_TOLERANCE
}

/// Exact-equality sync: write `fresh` through to baseline and delta iff it
/// differs.  Returns whether it differed.
pub(crate) fn sync<T: PartialEq + Clone>(
    base: &mut Option<T>,
    fresh: T,
    tx: &mut Option<T>,
) -> bool {
    if base.as_ref() == Some(&fresh) {
        return false;
    }
    *base = Some(fresh.clone());
    *tx = Some(fresh);
    true
}

/// Tolerance-based sync for float fields.
pub(crate) fn sync_float(base: &mut Option<f64>, fresh: f64, tx: &mut Option<f64>) -> bool {
    if !float_differs(base.unwrap_or(0.0), fresh) {
        return false;
    }
    *base = Some(fresh);
    *tx = Some(fresh);
    true
}

/// Position sync: the delta carries only the components past tolerance,
/// the baseline receives the full fresh component set.
pub(crate) fn sync_position(
    base: &mut Option<Position>,
    fresh: &[f64; 9],
    tx: &mut Option<Position>,
) -> bool {
    let baseline = base.get_or_insert_with(Position::zeroed);
    let old = baseline.to_array();
    let mut delta = Position::default();
    let mut modified = false;
    {
        let components: [(f64, f64, &mut Option<f64>); 9] = [
            (old[0], fresh[0], &mut delta.x),
            (old[1], fresh[1], &mut delta.y),
            (old[2], fresh[2], &mut delta.z),
            (old[3], fresh[3], &mut delta.a),
            (old[4], fresh[4], &mut delta.b),
            (old[5], fresh[5], &mut delta.c),
            (old[6], fresh[6], &mut delta.u),
            (old[7], fresh[7], &mut delta.v),
            (old[8], fresh[8], &mut delta.w),
        ];
        for (old, new, slot) in components {
            if float_differs(old, new) {
                *slot = Some(new);
                modified = true;
            }
        }
    }
    if modified {
        *baseline = Position::from_array(*fresh);
        *tx = Some(delta);
    }
    modified
}

/// Indexed float slots (ain / aout / settings share the rule).
fn sync_float_slots<T>(
    base: &mut Vec<T>,
    fresh: &[f64],
    tx: &mut Vec<T>,
    new_slot: impl Fn(i32) -> T,
    value: impl Fn(&T) -> f64,
    set: impl Fn(&mut T, f64),
    delta: impl Fn(i32, f64) -> T,
) -> bool {
    let mut modified = false;
    for (i, &v) in fresh.iter().enumerate() {
        let index = i32::try_from(i).unwrap_or(i32::MAX);
        if base.len() == i {
            base.push(new_slot(index));
        }
        if float_differs(value(&base[i]), v) {
            set(&mut base[i], v);
            tx.push(delta(index, v));
            modified = true;
        }
    }
    modified
}

pub(crate) fn sync_analog(base: &mut Vec<AnalogIo>, fresh: &[f64], tx: &mut Vec<AnalogIo>) -> bool {
    sync_float_slots(
        base,
        fresh,
        tx,
        |index| AnalogIo {
            index: Some(index),
            value: Some(0.0),
        },
        |slot| slot.value.unwrap_or(0.0),
        |slot, v| slot.value = Some(v),
        |index, v| AnalogIo {
            index: Some(index),
            value: Some(v),
        },
    )
}

pub(crate) fn sync_settings(
    base: &mut Vec<SettingSlot>,
    fresh: &[f64],
    tx: &mut Vec<SettingSlot>,
) -> bool {
    sync_float_slots(
        base,
        fresh,
        tx,
        |index| SettingSlot {
            index: Some(index),
            value: Some(0.0),
        },
        |slot| slot.value.unwrap_or(0.0),
        |slot, v| slot.value = Some(v),
        |index, v| SettingSlot {
            index: Some(index),
            value: Some(v),
        },
    )
}

/// Indexed bool slots (din / dout / limit).
pub(crate) fn sync_digital(
    base: &mut Vec<DigitalIo>,
    fresh: &[bool],
    tx: &mut Vec<DigitalIo>,
) -> bool {
    let mut modified = false;
    for (i, &v) in fresh.iter().enumerate() {
        let index = i32::try_from(i).unwrap_or(i32::MAX);
        if base.len() == i {
            base.push(DigitalIo {
                index: Some(index),
                value: Some(false),
            });
        }
        if base[i].value != Some(v) {
            base[i].value = Some(v);
            tx.push(DigitalIo {
                index: Some(index),
                value: Some(v),
            });
            modified = true;
        }
    }
    modified
}

/// Indexed int slots (gcodes / mcodes).
pub(crate) fn sync_codes(base: &mut Vec<CodeSlot>, fresh: &[i32], tx: &mut Vec<CodeSlot>) -> bool {
    let mut modified = false;
    for (i, &v) in fresh.iter().enumerate() {
        let index = i32::try_from(i).unwrap_or(i32::MAX);
        if base.len() == i {
            base.push(CodeSlot {
                index: Some(index),
                value: Some(0),
            });
        }
        if base[i].value != Some(v) {
            base[i].value = Some(v);
            tx.push(CodeSlot {
                index: Some(index),
                value: Some(v),
            });
            modified = true;
        }
    }
    modified
}
