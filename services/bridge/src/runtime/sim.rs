//! In-process simulated runtime.
//!
//! Stands in for the motion kernel when the bridge runs without real
//! hardware and gives tests a scriptable runtime.  Commands mutate the
//! snapshot just enough for their effect to surface on the status stream;
//! everything is logged at debug level.

use super::{
    AutoOp, AxisStat, BrakeOp, Commander, ErrorChannel, ErrorKind, JogOp, RuntimeError,
    SpindleOp, StatPoller, StatSnapshot, TeleopVector, ToolEntry, ToolOffset,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

struct SimState {
    snapshot: StatSnapshot,
    errors: VecDeque<(ErrorKind, String)>,
}

/// A clonable handle to the simulated runtime; clones share state, so the
/// control loop and the command dispatcher observe each other's effects.
#[derive(Clone)]
pub struct SimRuntime {
    state: Arc<Mutex<SimState>>,
}

impl SimRuntime {
    /// A small three-axis mill with one tool loaded.
    pub fn new() -> Self {
        let mut snapshot = StatSnapshot {
            axes: 3,
            axis_mask: 0b111,
            cycle_time: 0.1,
            linear_units: 1.0,
            angular_units: 1.0,
            max_velocity: 10.0,
            max_acceleration: 100.0,
            feedrate: 1.0,
            ..StatSnapshot::default()
        };
        snapshot.axis = vec![AxisStat::default(); 3];
        snapshot.tool_table = vec![ToolEntry::default(); 4];
        for slot in snapshot.tool_table.iter_mut().skip(1) {
            slot.id = -1;
        }
        snapshot.gcodes = vec![0; 16];
        snapshot.mcodes = vec![0; 10];
        snapshot.settings = vec![0.0; 3];
        snapshot.ain = vec![0.0; 4];
        snapshot.aout = vec![0.0; 4];
        snapshot.din = vec![false; 4];
        snapshot.dout = vec![false; 4];
        snapshot.limit = vec![false; 9];
        SimRuntime {
            state: Arc::new(Mutex::new(SimState {
                snapshot,
                errors: VecDeque::new(),
            })),
        }
    }

    /// Mutate the simulated snapshot (tests drive state changes this way).
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&mut StatSnapshot) -> R) -> R {
        f(&mut self.state.lock().expect("sim state poisoned").snapshot)
    }

    /// Queue an error event for the error channel to drain.
    pub fn push_error(&self, kind: ErrorKind, text: impl Into<String>) {
        self.state
            .lock()
            .expect("sim state poisoned")
            .errors
            .push_back((kind, text.into()));
    }
}

impl Default for SimRuntime {
    fn default() -> Self {
        SimRuntime::new()
    }
}

impl StatPoller for SimRuntime {
    fn poll(&mut self) -> Result<StatSnapshot, RuntimeError> {
        Ok(self.state.lock().expect("sim state poisoned").snapshot.clone())
    }
}

impl ErrorChannel for SimRuntime {
    fn poll(&mut self) -> Result<Option<(ErrorKind, String)>, RuntimeError> {
        Ok(self
            .state
            .lock()
            .expect("sim state poisoned")
            .errors
            .pop_front())
    }
}

impl Commander for SimRuntime {
    fn abort(&mut self) -> Result<(), RuntimeError> {
        debug!("sim: abort");
        Ok(())
    }

    fn auto(&mut self, op: AutoOp) -> Result<(), RuntimeError> {
        debug!(?op, "sim: auto");
        let mut state = self.state.lock().expect("sim state poisoned");
        match op {
            AutoOp::Pause => state.snapshot.paused = true,
            AutoOp::Resume => state.snapshot.paused = false,
            AutoOp::Step => {}
            AutoOp::Run { line } => {
                state.snapshot.current_line = line;
                state.snapshot.paused = false;
            }
        }
        Ok(())
    }

    fn brake(&mut self, op: BrakeOp) -> Result<(), RuntimeError> {
        debug!(?op, "sim: brake");
        self.with_snapshot(|s| s.spindle_brake = i32::from(op == BrakeOp::Engage));
        Ok(())
    }

    fn debug(&mut self, level: i32) -> Result<(), RuntimeError> {
        debug!(level, "sim: debug");
        self.with_snapshot(|s| s.debug = level);
        Ok(())
    }

    fn feedrate(&mut self, scale: f64) -> Result<(), RuntimeError> {
        debug!(scale, "sim: feedrate");
        self.with_snapshot(|s| s.feedrate = scale);
        Ok(())
    }

    fn flood(&mut self, on: bool) -> Result<(), RuntimeError> {
        debug!(on, "sim: flood");
        self.with_snapshot(|s| s.flood = i32::from(on));
        Ok(())
    }

    fn home(&mut self, axis: i32) -> Result<(), RuntimeError> {
        debug!(axis, "sim: home");
        self.with_snapshot(|s| {
            if let Some(a) = usize::try_from(axis).ok().and_then(|i| s.axis.get_mut(i)) {
                a.homed = true;
            }
        });
        Ok(())
    }

    fn jog(&mut self, op: JogOp) -> Result<(), RuntimeError> {
        debug!(?op, "sim: jog");
        Ok(())
    }

    fn load_tool_table(&mut self) -> Result<(), RuntimeError> {
        debug!("sim: load_tool_table");
        Ok(())
    }

    fn maxvel(&mut self, velocity: f64) -> Result<(), RuntimeError> {
        debug!(velocity, "sim: maxvel");
        self.with_snapshot(|s| s.max_velocity = velocity);
        Ok(())
    }

    fn mdi(&mut self, command: &str) -> Result<(), RuntimeError> {
        debug!(command, "sim: mdi");
        self.with_snapshot(|s| s.command = command.to_owned());
        Ok(())
    }

    fn mist(&mut self, on: bool) -> Result<(), RuntimeError> {
        debug!(on, "sim: mist");
        self.with_snapshot(|s| s.mist = i32::from(on));
        Ok(())
    }

    fn mode(&mut self, task_mode: i32) -> Result<(), RuntimeError> {
        debug!(task_mode, "sim: mode");
        self.with_snapshot(|s| s.task_mode = task_mode);
        Ok(())
    }

    fn override_limits(&mut self) -> Result<(), RuntimeError> {
        debug!("sim: override_limits");
        Ok(())
    }

    fn program_open(&mut self, path: &std::path::Path) -> Result<(), RuntimeError> {
        debug!(path = %path.display(), "sim: program_open");
        self.with_snapshot(|s| s.file = path.display().to_string());
        Ok(())
    }

    fn reset_interpreter(&mut self) -> Result<(), RuntimeError> {
        debug!("sim: reset_interpreter");
        Ok(())
    }

    fn set_adaptive_feed(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: set_adaptive_feed");
        self.with_snapshot(|s| s.adaptive_feed_enabled = enable);
        Ok(())
    }

    fn set_analog_output(&mut self, index: i32, value: f64) -> Result<(), RuntimeError> {
        debug!(index, value, "sim: set_analog_output");
        self.with_snapshot(|s| {
            if let Some(pin) = usize::try_from(index).ok().and_then(|i| s.aout.get_mut(i)) {
                *pin = value;
            }
        });
        Ok(())
    }

    fn set_block_delete(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: set_block_delete");
        self.with_snapshot(|s| s.block_delete = enable);
        Ok(())
    }

    fn set_digital_output(&mut self, index: i32, enable: bool) -> Result<(), RuntimeError> {
        debug!(index, enable, "sim: set_digital_output");
        self.with_snapshot(|s| {
            if let Some(pin) = usize::try_from(index).ok().and_then(|i| s.dout.get_mut(i)) {
                *pin = enable;
            }
        });
        Ok(())
    }

    fn set_feed_hold(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: set_feed_hold");
        self.with_snapshot(|s| s.feed_hold_enabled = enable);
        Ok(())
    }

    fn set_feed_override(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: set_feed_override");
        self.with_snapshot(|s| s.feed_override_enabled = enable);
        Ok(())
    }

    fn set_max_limit(&mut self, axis: i32, value: f64) -> Result<(), RuntimeError> {
        debug!(axis, value, "sim: set_max_limit");
        self.with_snapshot(|s| {
            if let Some(a) = usize::try_from(axis).ok().and_then(|i| s.axis.get_mut(i)) {
                a.max_position_limit = value;
            }
        });
        Ok(())
    }

    fn set_min_limit(&mut self, axis: i32, value: f64) -> Result<(), RuntimeError> {
        debug!(axis, value, "sim: set_min_limit");
        self.with_snapshot(|s| {
            if let Some(a) = usize::try_from(axis).ok().and_then(|i| s.axis.get_mut(i)) {
                a.min_position_limit = value;
            }
        });
        Ok(())
    }

    fn set_optional_stop(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: set_optional_stop");
        self.with_snapshot(|s| s.optional_stop = enable);
        Ok(())
    }

    fn set_spindle_override(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: set_spindle_override");
        self.with_snapshot(|s| s.spindle_override_enabled = enable);
        Ok(())
    }

    fn spindle(&mut self, op: SpindleOp) -> Result<(), RuntimeError> {
        debug!(?op, "sim: spindle");
        self.with_snapshot(|s| match op {
            SpindleOp::Forward { speed } => {
                s.spindle_enabled = 1;
                s.spindle_speed = speed;
                s.spindle_direction = 1;
            }
            SpindleOp::Off => {
                s.spindle_enabled = 0;
                s.spindle_speed = 0.0;
                s.spindle_direction = 0;
            }
            SpindleOp::Increase => s.spindle_increasing = 1,
            SpindleOp::Decrease => s.spindle_increasing = -1,
            SpindleOp::Constant => s.spindle_increasing = 0,
        });
        Ok(())
    }

    fn spindle_override(&mut self, scale: f64) -> Result<(), RuntimeError> {
        debug!(scale, "sim: spindle_override");
        self.with_snapshot(|s| s.spindlerate = scale);
        Ok(())
    }

    fn state(&mut self, task_state: i32) -> Result<(), RuntimeError> {
        debug!(task_state, "sim: state");
        self.with_snapshot(|s| s.task_state = task_state);
        Ok(())
    }

    fn teleop_enable(&mut self, enable: bool) -> Result<(), RuntimeError> {
        debug!(enable, "sim: teleop_enable");
        Ok(())
    }

    fn teleop_vector(&mut self, vector: TeleopVector) -> Result<(), RuntimeError> {
        debug!(?vector, "sim: teleop_vector");
        Ok(())
    }

    fn traj_mode(&mut self, mode: i32) -> Result<(), RuntimeError> {
        debug!(mode, "sim: traj_mode");
        self.with_snapshot(|s| s.motion_mode = mode);
        Ok(())
    }

    fn tool_offset(&mut self, offset: ToolOffset) -> Result<(), RuntimeError> {
        debug!(?offset, "sim: tool_offset");
        self.with_snapshot(|s| {
            if let Some(row) = s
                .tool_table
                .iter_mut()
                .find(|row| row.id == offset.tool)
            {
                row.z_offset = offset.z_offset;
                row.x_offset = offset.x_offset;
                row.diameter = offset.diameter;
                row.frontangle = offset.frontangle;
                row.backangle = offset.backangle;
                row.orientation = offset.orientation;
            }
        });
        Ok(())
    }

    fn unhome(&mut self, axis: i32) -> Result<(), RuntimeError> {
        debug!(axis, "sim: unhome");
        self.with_snapshot(|s| {
            if let Some(a) = usize::try_from(axis).ok().and_then(|i| s.axis.get_mut(i)) {
                a.homed = false;
            }
        });
        Ok(())
    }
}
