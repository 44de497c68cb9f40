//! The narrow seam to the machine-control runtime.
//!
//! The bridge consumes the runtime through three traits: `StatPoller`
//! (one operation: poll a typed full-state snapshot), `ErrorChannel`
//! (drain one queued error event), and `Commander` (one method per runtime
//! verb).  Implementations wrap whatever native or IPC binding is
//! available; `sim` provides an in-process stand-in so the bridge runs and
//! tests end-to-end without a motion kernel.

pub mod sim;

use thiserror::Error;

/// Failure talking to the runtime.  Poll failures are cycle-local (log and
/// skip); command failures are logged, never replied.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("status poll failed: {0}")]
    Poll(String),
    #[error("command rejected: {0}")]
    Command(String),
}

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Per-axis state as reported by the runtime.  Carries both the static
/// configuration fields (config channel) and the live motion fields
/// (motion channel); each channel diffs its own subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisStat {
    pub axis_type: i32,
    pub backlash: f64,
    pub max_ferror: f64,
    pub max_position_limit: f64,
    pub min_ferror: f64,
    pub min_position_limit: f64,
    pub units: f64,

    pub enabled: bool,
    pub fault: bool,
    pub ferror_current: f64,
    pub ferror_highmark: f64,
    pub homed: bool,
    pub homing: bool,
    pub inpos: bool,
    pub input: f64,
    pub max_hard_limit: bool,
    pub max_soft_limit: bool,
    pub min_hard_limit: bool,
    pub min_soft_limit: bool,
    pub output: f64,
    pub override_limits: bool,
    pub velocity: f64,
}

/// One tool-table row.  `id == -1` marks an empty row; empty rows are
/// never published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolEntry {
    pub id: i32,
    pub x_offset: f64,
    pub y_offset: f64,
    pub z_offset: f64,
    pub a_offset: f64,
    pub b_offset: f64,
    pub c_offset: f64,
    pub u_offset: f64,
    pub v_offset: f64,
    pub w_offset: f64,
    pub diameter: f64,
    pub frontangle: f64,
    pub backangle: f64,
    pub orientation: i32,
}

/// The full runtime state snapshot, refreshed once per control cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatSnapshot {
    // task
    pub echo_serial_number: i32,
    pub exec_state: i32,
    pub file: String,
    pub input_timeout: bool,
    pub optional_stop: bool,
    pub read_line: i32,
    pub task_mode: i32,
    pub task_paused: i32,
    pub task_state: i32,

    // interp
    pub command: String,
    pub interp_state: i32,
    pub interpreter_errcode: i32,
    pub gcodes: Vec<i32>,
    pub mcodes: Vec<i32>,
    pub settings: Vec<f64>,

    // io
    pub estop: i32,
    pub flood: i32,
    pub lube: i32,
    pub lube_level: i32,
    pub mist: i32,
    pub pocket_prepped: i32,
    pub tool_in_spindle: i32,
    pub tool_offset: [f64; 9],
    pub tool_table: Vec<ToolEntry>,

    // config
    pub acceleration: f64,
    pub angular_units: f64,
    /// Declared axis count; axis arrays are only diffed up to this index.
    pub axes: i32,
    pub axis_mask: i32,
    pub cycle_time: f64,
    pub debug: i32,
    pub kinematics_type: i32,
    pub linear_units: f64,
    pub max_acceleration: f64,
    pub max_velocity: f64,
    pub program_units: i32,
    pub velocity: f64,
    pub axis: Vec<AxisStat>,

    // motion
    pub active_queue: i32,
    pub actual_position: [f64; 9],
    pub adaptive_feed_enabled: bool,
    pub ain: Vec<f64>,
    pub aout: Vec<f64>,
    pub block_delete: bool,
    pub current_line: i32,
    pub current_vel: f64,
    pub delay_left: f64,
    pub din: Vec<bool>,
    pub distance_to_go: f64,
    pub dout: Vec<bool>,
    pub dtg: [f64; 9],
    pub enabled: bool,
    pub feed_hold_enabled: bool,
    pub feed_override_enabled: bool,
    pub feedrate: f64,
    pub g5x_index: i32,
    pub g5x_offset: [f64; 9],
    pub g92_offset: [f64; 9],
    pub id: i32,
    pub inpos: bool,
    pub joint_actual_position: [f64; 9],
    pub joint_position: [f64; 9],
    pub limit: Vec<bool>,
    pub motion_line: i32,
    pub motion_type: i32,
    pub motion_mode: i32,
    pub paused: bool,
    pub position: [f64; 9],
    pub probe_tripped: bool,
    pub probe_val: i32,
    pub probed_position: [f64; 9],
    pub probing: bool,
    pub queue: i32,
    pub queue_full: bool,
    pub rotation_xy: f64,
    pub spindle_brake: i32,
    pub spindle_direction: i32,
    pub spindle_enabled: i32,
    pub spindle_increasing: i32,
    pub spindle_override_enabled: bool,
    pub spindle_speed: f64,
    pub spindlerate: f64,
    pub state: i32,
}

// ---------------------------------------------------------------------------
// Error channel
// ---------------------------------------------------------------------------

/// Kind of a queued runtime error event.  The kind selects the error-side
/// topic (error / text / display) and the published message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NmlError,
    OperatorError,
    NmlText,
    OperatorText,
    NmlDisplay,
    OperatorDisplay,
}

// ---------------------------------------------------------------------------
// Command argument types
// ---------------------------------------------------------------------------

/// Interpreter plan control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutoOp {
    Pause,
    Resume,
    Step,
    Run { line: i32 },
}

/// Axis jog control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JogOp {
    Stop { axis: i32 },
    Continuous { axis: i32, velocity: f64 },
    Increment { axis: i32, velocity: f64, distance: f64 },
}

/// Spindle control.  `Forward` speed may be signed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpindleOp {
    Forward { speed: f64 },
    Increase,
    Decrease,
    Constant,
    Off,
}

/// Spindle brake control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeOp {
    Engage,
    Release,
}

/// Teleop jog vector; a/b/c always present, u/v/w optional in nested
/// order (v is meaningful only with u, w only with u and v).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeleopVector {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub u: Option<f64>,
    pub v: Option<f64>,
    pub w: Option<f64>,
}

/// Tool geometry override for one tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolOffset {
    pub tool: i32,
    pub z_offset: f64,
    pub x_offset: f64,
    pub diameter: f64,
    pub frontangle: f64,
    pub backangle: f64,
    pub orientation: i32,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Polls the runtime's full state snapshot.
pub trait StatPoller: Send {
    fn poll(&mut self) -> Result<StatSnapshot, RuntimeError>;
}

/// Drains the runtime's queued error events, one per call.
pub trait ErrorChannel: Send {
    fn poll(&mut self) -> Result<Option<(ErrorKind, String)>, RuntimeError>;
}

/// One method per runtime verb.  Success is implicit; effects surface via
/// the status stream.
pub trait Commander: Send {
    fn abort(&mut self) -> Result<(), RuntimeError>;
    fn auto(&mut self, op: AutoOp) -> Result<(), RuntimeError>;
    fn brake(&mut self, op: BrakeOp) -> Result<(), RuntimeError>;
    fn debug(&mut self, level: i32) -> Result<(), RuntimeError>;
    fn feedrate(&mut self, scale: f64) -> Result<(), RuntimeError>;
    fn flood(&mut self, on: bool) -> Result<(), RuntimeError>;
    fn home(&mut self, axis: i32) -> Result<(), RuntimeError>;
    fn jog(&mut self, op: JogOp) -> Result<(), RuntimeError>;
    fn load_tool_table(&mut self) -> Result<(), RuntimeError>;
    fn maxvel(&mut self, velocity: f64) -> Result<(), RuntimeError>;
    fn mdi(&mut self, command: &str) -> Result<(), RuntimeError>;
    fn mist(&mut self, on: bool) -> Result<(), RuntimeError>;
    fn mode(&mut self, task_mode: i32) -> Result<(), RuntimeError>;
    fn override_limits(&mut self) -> Result<(), RuntimeError>;
    fn program_open(&mut self, path: &std::path::Path) -> Result<(), RuntimeError>;
    fn reset_interpreter(&mut self) -> Result<(), RuntimeError>;
    fn set_adaptive_feed(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn set_analog_output(&mut self, index: i32, value: f64) -> Result<(), RuntimeError>;
    fn set_block_delete(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn set_digital_output(&mut self, index: i32, enable: bool) -> Result<(), RuntimeError>;
    fn set_feed_hold(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn set_feed_override(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn set_max_limit(&mut self, axis: i32, value: f64) -> Result<(), RuntimeError>;
    fn set_min_limit(&mut self, axis: i32, value: f64) -> Result<(), RuntimeError>;
    fn set_optional_stop(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn set_spindle_override(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn spindle(&mut self, op: SpindleOp) -> Result<(), RuntimeError>;
    fn spindle_override(&mut self, scale: f64) -> Result<(), RuntimeError>;
    fn state(&mut self, task_state: i32) -> Result<(), RuntimeError>;
    fn teleop_enable(&mut self, enable: bool) -> Result<(), RuntimeError>;
    fn traj_mode(&mut self, mode: i32) -> Result<(), RuntimeError>;
    fn teleop_vector(&mut self, vector: TeleopVector) -> Result<(), RuntimeError>;
    fn tool_offset(&mut self, offset: ToolOffset) -> Result<(), RuntimeError>;
    fn unhome(&mut self, axis: i32) -> Result<(), RuntimeError>;
}
