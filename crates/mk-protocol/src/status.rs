//! Status-channel payload messages.
//!
//! Status is partitioned into five independently subscribable channels:
//! `io`, `task`, `interp`, `motion`, `config`.  A full update carries the
//! producer's entire channel baseline; an incremental update carries only
//! the fields that changed since the previous publication on that channel.
//!
//! Indexed records (axes, tool rows, I/O pins, code/setting slots) carry an
//! explicit `index` equal to their position in the producer's sequence.  A
//! delta record contains `index` plus only the changed fields.  Slot arrays
//! only ever grow within a session; a slot, once published, is updated but
//! never removed.
//!
//! `merge_update` implements the receiver side: applying a full update and
//! then every subsequent incremental, in order, reconstructs the producer's
//! baseline (absent fields read as their zero value).

// ---------------------------------------------------------------------------
// Shared sub-types
// ---------------------------------------------------------------------------

/// A nine-axis spatial coordinate (X Y Z A B C U V W).
///
/// Deltas set only the components that changed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    #[prost(double, optional, tag = "1")]
    pub x: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub y: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub z: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub a: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub b: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub c: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub u: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub v: Option<f64>,
    #[prost(double, optional, tag = "9")]
    pub w: Option<f64>,
}

impl Position {
    /// All nine components present and zero.
    pub fn zeroed() -> Self {
        Position {
            x: Some(0.0),
            y: Some(0.0),
            z: Some(0.0),
            a: Some(0.0),
            b: Some(0.0),
            c: Some(0.0),
            u: Some(0.0),
            v: Some(0.0),
            w: Some(0.0),
        }
    }

    /// All nine components present, taken from the array.
    pub fn from_array(values: [f64; 9]) -> Self {
        Position {
            x: Some(values[0]),
            y: Some(values[1]),
            z: Some(values[2]),
            a: Some(values[3]),
            b: Some(values[4]),
            c: Some(values[5]),
            u: Some(values[6]),
            v: Some(values[7]),
            w: Some(values[8]),
        }
    }

    /// The components as a fixed array, absent components reading as zero.
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.x.unwrap_or(0.0),
            self.y.unwrap_or(0.0),
            self.z.unwrap_or(0.0),
            self.a.unwrap_or(0.0),
            self.b.unwrap_or(0.0),
            self.c.unwrap_or(0.0),
            self.u.unwrap_or(0.0),
            self.v.unwrap_or(0.0),
            self.w.unwrap_or(0.0),
        ]
    }

    /// Overlay the components present in `delta` onto `self`.
    pub fn merge_update(&mut self, delta: &Position) {
        merge(&mut self.x, delta.x);
        merge(&mut self.y, delta.y);
        merge(&mut self.z, delta.z);
        merge(&mut self.a, delta.a);
        merge(&mut self.b, delta.b);
        merge(&mut self.c, delta.c);
        merge(&mut self.u, delta.u);
        merge(&mut self.v, delta.v);
        merge(&mut self.w, delta.w);
    }
}

/// One row of the tool table.  Also used as the payload of the
/// tool-offset command.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ToolData {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    /// Tool number; −1 marks an empty row on the producer side and is
    /// never published.
    #[prost(int32, optional, tag = "2")]
    pub id: Option<i32>,
    #[prost(double, optional, tag = "3")]
    pub x_offset: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub y_offset: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub z_offset: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub a_offset: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub b_offset: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub c_offset: Option<f64>,
    #[prost(double, optional, tag = "9")]
    pub u_offset: Option<f64>,
    #[prost(double, optional, tag = "10")]
    pub v_offset: Option<f64>,
    #[prost(double, optional, tag = "11")]
    pub w_offset: Option<f64>,
    #[prost(double, optional, tag = "12")]
    pub diameter: Option<f64>,
    #[prost(double, optional, tag = "13")]
    pub frontangle: Option<f64>,
    #[prost(double, optional, tag = "14")]
    pub backangle: Option<f64>,
    #[prost(int32, optional, tag = "15")]
    pub orientation: Option<i32>,
}

/// An analog input or output pin.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalogIo {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(double, optional, tag = "2")]
    pub value: Option<f64>,
}

/// A digital input, output, or limit flag.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DigitalIo {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(bool, optional, tag = "2")]
    pub value: Option<bool>,
}

/// An active G-code or M-code slot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CodeSlot {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub value: Option<i32>,
}

/// An interpreter settings slot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SettingSlot {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(double, optional, tag = "2")]
    pub value: Option<f64>,
}

/// A recognized program file extension (config channel).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProgramExtension {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub extension: Option<String>,
}

/// Static per-axis configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigAxis {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub axis_type: Option<i32>,
    #[prost(double, optional, tag = "3")]
    pub backlash: Option<f64>,
    #[prost(double, optional, tag = "4")]
    pub max_ferror: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub max_position_limit: Option<f64>,
    #[prost(double, optional, tag = "6")]
    pub min_ferror: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub min_position_limit: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub units: Option<f64>,
}

/// Live per-axis motion state.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MotionAxis {
    #[prost(int32, optional, tag = "1")]
    pub index: Option<i32>,
    #[prost(bool, optional, tag = "2")]
    pub enabled: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    pub fault: Option<bool>,
    #[prost(double, optional, tag = "4")]
    pub ferror_current: Option<f64>,
    #[prost(double, optional, tag = "5")]
    pub ferror_highmark: Option<f64>,
    #[prost(bool, optional, tag = "6")]
    pub homed: Option<bool>,
    #[prost(bool, optional, tag = "7")]
    pub homing: Option<bool>,
    #[prost(bool, optional, tag = "8")]
    pub inpos: Option<bool>,
    #[prost(double, optional, tag = "9")]
    pub input: Option<f64>,
    #[prost(bool, optional, tag = "10")]
    pub max_hard_limit: Option<bool>,
    #[prost(bool, optional, tag = "11")]
    pub max_soft_limit: Option<bool>,
    #[prost(bool, optional, tag = "12")]
    pub min_hard_limit: Option<bool>,
    #[prost(bool, optional, tag = "13")]
    pub min_soft_limit: Option<bool>,
    #[prost(double, optional, tag = "14")]
    pub output: Option<f64>,
    #[prost(bool, optional, tag = "15")]
    pub override_limits: Option<bool>,
    #[prost(double, optional, tag = "16")]
    pub velocity: Option<f64>,
}

// ---------------------------------------------------------------------------
// Config enums
// ---------------------------------------------------------------------------

/// Whether displayed positions are relative to the active offset or to
/// machine origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PositionOffsetMode {
    Relative = 0,
    Machine = 1,
}

/// Whether displayed positions reflect actual or commanded values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PositionFeedbackMode {
    Actual = 0,
    Commanded = 1,
}

// ---------------------------------------------------------------------------
// Channel payloads
// ---------------------------------------------------------------------------

/// The `io` channel: estop, coolant, lube, and tooling state.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusIo {
    #[prost(int32, optional, tag = "1")]
    pub estop: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub flood: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub lube: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub lube_level: Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub mist: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub pocket_prepped: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub tool_in_spindle: Option<i32>,
    #[prost(message, optional, tag = "8")]
    pub tool_offset: Option<Position>,
    #[prost(message, repeated, tag = "9")]
    pub tool_table: Vec<ToolData>,
}

/// The `task` channel: task mode/state and program execution bookkeeping.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusTask {
    #[prost(int32, optional, tag = "1")]
    pub echo_serial_number: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub exec_state: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub file: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub input_timeout: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub optional_stop: Option<bool>,
    #[prost(int32, optional, tag = "6")]
    pub read_line: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub task_mode: Option<i32>,
    #[prost(int32, optional, tag = "8")]
    pub task_paused: Option<i32>,
    #[prost(int32, optional, tag = "9")]
    pub task_state: Option<i32>,
}

/// The `interp` channel: interpreter state plus active code/setting slots.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusInterp {
    #[prost(string, optional, tag = "1")]
    pub command: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub gcodes: Vec<CodeSlot>,
    #[prost(int32, optional, tag = "3")]
    pub interp_state: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub interpreter_errcode: Option<i32>,
    #[prost(message, repeated, tag = "5")]
    pub mcodes: Vec<CodeSlot>,
    #[prost(message, repeated, tag = "6")]
    pub settings: Vec<SettingSlot>,
}

/// The `motion` channel: the live trajectory/spindle/axis view.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusMotion {
    #[prost(int32, optional, tag = "1")]
    pub active_queue: Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub actual_position: Option<Position>,
    #[prost(bool, optional, tag = "3")]
    pub adaptive_feed_enabled: Option<bool>,
    #[prost(message, repeated, tag = "4")]
    pub ain: Vec<AnalogIo>,
    #[prost(message, repeated, tag = "5")]
    pub aout: Vec<AnalogIo>,
    #[prost(message, repeated, tag = "6")]
    pub axis: Vec<MotionAxis>,
    #[prost(bool, optional, tag = "7")]
    pub block_delete: Option<bool>,
    #[prost(int32, optional, tag = "8")]
    pub current_line: Option<i32>,
    #[prost(double, optional, tag = "9")]
    pub current_vel: Option<f64>,
    #[prost(double, optional, tag = "10")]
    pub delay_left: Option<f64>,
    #[prost(message, repeated, tag = "11")]
    pub din: Vec<DigitalIo>,
    #[prost(double, optional, tag = "12")]
    pub distance_to_go: Option<f64>,
    #[prost(message, repeated, tag = "13")]
    pub dout: Vec<DigitalIo>,
    #[prost(message, optional, tag = "14")]
    pub dtg: Option<Position>,
    #[prost(bool, optional, tag = "15")]
    pub enabled: Option<bool>,
    #[prost(bool, optional, tag = "16")]
    pub feed_hold_enabled: Option<bool>,
    #[prost(bool, optional, tag = "17")]
    pub feed_override_enabled: Option<bool>,
    #[prost(double, optional, tag = "18")]
    pub feedrate: Option<f64>,
    #[prost(int32, optional, tag = "19")]
    pub g5x_index: Option<i32>,
    #[prost(message, optional, tag = "20")]
    pub g5x_offset: Option<Position>,
    #[prost(message, optional, tag = "21")]
    pub g92_offset: Option<Position>,
    #[prost(int32, optional, tag = "22")]
    pub id: Option<i32>,
    #[prost(bool, optional, tag = "23")]
    pub inpos: Option<bool>,
    #[prost(message, optional, tag = "24")]
    pub joint_actual_position: Option<Position>,
    #[prost(message, optional, tag = "25")]
    pub joint_position: Option<Position>,
    #[prost(message, repeated, tag = "26")]
    pub limit: Vec<DigitalIo>,
    #[prost(int32, optional, tag = "27")]
    pub motion_line: Option<i32>,
    #[prost(int32, optional, tag = "28")]
    pub motion_type: Option<i32>,
    #[prost(int32, optional, tag = "29")]
    pub motion_mode: Option<i32>,
    #[prost(bool, optional, tag = "30")]
    pub paused: Option<bool>,
    #[prost(message, optional, tag = "31")]
    pub position: Option<Position>,
    #[prost(bool, optional, tag = "32")]
    pub probe_tripped: Option<bool>,
    #[prost(int32, optional, tag = "33")]
    pub probe_val: Option<i32>,
    #[prost(message, optional, tag = "34")]
    pub probed_position: Option<Position>,
    #[prost(bool, optional, tag = "35")]
    pub probing: Option<bool>,
    #[prost(int32, optional, tag = "36")]
    pub queue: Option<i32>,
    #[prost(bool, optional, tag = "37")]
    pub queue_full: Option<bool>,
    #[prost(double, optional, tag = "38")]
    pub rotation_xy: Option<f64>,
    #[prost(int32, optional, tag = "39")]
    pub spindle_brake: Option<i32>,
    #[prost(int32, optional, tag = "40")]
    pub spindle_direction: Option<i32>,
    #[prost(int32, optional, tag = "41")]
    pub spindle_enabled: Option<i32>,
    #[prost(int32, optional, tag = "42")]
    pub spindle_increasing: Option<i32>,
    #[prost(bool, optional, tag = "43")]
    pub spindle_override_enabled: Option<bool>,
    #[prost(double, optional, tag = "44")]
    pub spindle_speed: Option<f64>,
    #[prost(double, optional, tag = "45")]
    pub spindlerate: Option<f64>,
    #[prost(int32, optional, tag = "46")]
    pub state: Option<i32>,
}

/// The `config` channel: machine geometry, limits, and display settings.
///
/// A subset of these fields is sourced from the machine ini rather than the
/// runtime snapshot and only ever appears in the first publication.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusConfig {
    #[prost(double, optional, tag = "1")]
    pub acceleration: Option<f64>,
    #[prost(double, optional, tag = "2")]
    pub angular_units: Option<f64>,
    #[prost(int32, optional, tag = "3")]
    pub axes: Option<i32>,
    #[prost(message, repeated, tag = "4")]
    pub axis: Vec<ConfigAxis>,
    #[prost(int32, optional, tag = "5")]
    pub axis_mask: Option<i32>,
    #[prost(double, optional, tag = "6")]
    pub cycle_time: Option<f64>,
    #[prost(int32, optional, tag = "7")]
    pub debug: Option<i32>,
    #[prost(int32, optional, tag = "8")]
    pub kinematics_type: Option<i32>,
    #[prost(double, optional, tag = "9")]
    pub linear_units: Option<f64>,
    #[prost(double, optional, tag = "10")]
    pub max_acceleration: Option<f64>,
    #[prost(double, optional, tag = "11")]
    pub max_velocity: Option<f64>,
    #[prost(int32, optional, tag = "12")]
    pub program_units: Option<i32>,
    #[prost(double, optional, tag = "13")]
    pub velocity: Option<f64>,
    #[prost(enumeration = "PositionOffsetMode", optional, tag = "14")]
    pub position_offset: Option<i32>,
    #[prost(enumeration = "PositionFeedbackMode", optional, tag = "15")]
    pub position_feedback: Option<i32>,
    #[prost(double, optional, tag = "16")]
    pub max_feed_override: Option<f64>,
    #[prost(double, optional, tag = "17")]
    pub min_feed_override: Option<f64>,
    #[prost(double, optional, tag = "18")]
    pub max_spindle_override: Option<f64>,
    #[prost(double, optional, tag = "19")]
    pub min_spindle_override: Option<f64>,
    #[prost(double, optional, tag = "20")]
    pub default_spindle_speed: Option<f64>,
    #[prost(double, optional, tag = "21")]
    pub default_linear_velocity: Option<f64>,
    #[prost(double, optional, tag = "22")]
    pub min_velocity: Option<f64>,
    #[prost(double, optional, tag = "23")]
    pub max_linear_velocity: Option<f64>,
    #[prost(double, optional, tag = "24")]
    pub min_linear_velocity: Option<f64>,
    #[prost(double, optional, tag = "25")]
    pub default_angular_velocity: Option<f64>,
    #[prost(double, optional, tag = "26")]
    pub max_angular_velocity: Option<f64>,
    #[prost(double, optional, tag = "27")]
    pub min_angular_velocity: Option<f64>,
    #[prost(string, optional, tag = "28")]
    pub increments: Option<String>,
    #[prost(string, optional, tag = "29")]
    pub grids: Option<String>,
    #[prost(bool, optional, tag = "30")]
    pub lathe: Option<bool>,
    #[prost(string, optional, tag = "31")]
    pub geometry: Option<String>,
    #[prost(int32, optional, tag = "32")]
    pub arcdivision: Option<i32>,
    #[prost(bool, optional, tag = "33")]
    pub no_force_homing: Option<bool>,
    #[prost(message, repeated, tag = "34")]
    pub program_extension: Vec<ProgramExtension>,
}

// ---------------------------------------------------------------------------
// Receiver-side merge
// ---------------------------------------------------------------------------

fn merge<T>(base: &mut Option<T>, delta: Option<T>) {
    if delta.is_some() {
        *base = delta;
    }
}

fn merge_position(base: &mut Option<Position>, delta: &Option<Position>) {
    if let Some(d) = delta {
        base.get_or_insert_with(Position::default).merge_update(d);
    }
}

/// An indexed record that can be overlaid onto an existing slot.
trait IndexedRecord: Clone + Default {
    fn index(&self) -> i32;
    fn overlay(&mut self, delta: &Self);
}

/// Overlay delta records onto the slot array, growing it as needed.
fn merge_slots<T: IndexedRecord>(base: &mut Vec<T>, deltas: &[T]) {
    for delta in deltas {
        let index = usize::try_from(delta.index()).unwrap_or(0);
        while base.len() <= index {
            base.push(T::default());
        }
        base[index].overlay(delta);
    }
}

macro_rules! indexed_record {
    ($ty:ident, $($field:ident),+) => {
        impl IndexedRecord for $ty {
            fn index(&self) -> i32 {
                self.index.unwrap_or(0)
            }
            fn overlay(&mut self, delta: &Self) {
                if delta.index.is_some() {
                    self.index = delta.index;
                }
                $(merge(&mut self.$field, delta.$field.clone());)+
            }
        }
    };
}

indexed_record!(AnalogIo, value);
indexed_record!(DigitalIo, value);
indexed_record!(CodeSlot, value);
indexed_record!(SettingSlot, value);
indexed_record!(ProgramExtension, extension);
indexed_record!(
    ToolData, id, x_offset, y_offset, z_offset, a_offset, b_offset, c_offset, u_offset, v_offset,
    w_offset, diameter, frontangle, backangle, orientation
);
indexed_record!(
    ConfigAxis,
    axis_type,
    backlash,
    max_ferror,
    max_position_limit,
    min_ferror,
    min_position_limit,
    units
);
indexed_record!(
    MotionAxis,
    enabled,
    fault,
    ferror_current,
    ferror_highmark,
    homed,
    homing,
    inpos,
    input,
    max_hard_limit,
    max_soft_limit,
    min_hard_limit,
    min_soft_limit,
    output,
    override_limits,
    velocity
);

impl StatusIo {
    /// Apply an incremental update on top of this state.
    pub fn merge_update(&mut self, delta: &StatusIo) {
        merge(&mut self.estop, delta.estop);
        merge(&mut self.flood, delta.flood);
        merge(&mut self.lube, delta.lube);
        merge(&mut self.lube_level, delta.lube_level);
        merge(&mut self.mist, delta.mist);
        merge(&mut self.pocket_prepped, delta.pocket_prepped);
        merge(&mut self.tool_in_spindle, delta.tool_in_spindle);
        merge_position(&mut self.tool_offset, &delta.tool_offset);
        merge_slots(&mut self.tool_table, &delta.tool_table);
    }
}

impl StatusTask {
    /// Apply an incremental update on top of this state.
    pub fn merge_update(&mut self, delta: &StatusTask) {
        merge(&mut self.echo_serial_number, delta.echo_serial_number);
        merge(&mut self.exec_state, delta.exec_state);
        merge(&mut self.file, delta.file.clone());
        merge(&mut self.input_timeout, delta.input_timeout);
        merge(&mut self.optional_stop, delta.optional_stop);
        merge(&mut self.read_line, delta.read_line);
        merge(&mut self.task_mode, delta.task_mode);
        merge(&mut self.task_paused, delta.task_paused);
        merge(&mut self.task_state, delta.task_state);
    }
}

impl StatusInterp {
    /// Apply an incremental update on top of this state.
    pub fn merge_update(&mut self, delta: &StatusInterp) {
        merge(&mut self.command, delta.command.clone());
        merge_slots(&mut self.gcodes, &delta.gcodes);
        merge(&mut self.interp_state, delta.interp_state);
        merge(&mut self.interpreter_errcode, delta.interpreter_errcode);
        merge_slots(&mut self.mcodes, &delta.mcodes);
        merge_slots(&mut self.settings, &delta.settings);
    }
}

impl StatusMotion {
    /// Apply an incremental update on top of this state.
    pub fn merge_update(&mut self, delta: &StatusMotion) {
        merge(&mut self.active_queue, delta.active_queue);
        merge_position(&mut self.actual_position, &delta.actual_position);
        merge(&mut self.adaptive_feed_enabled, delta.adaptive_feed_enabled);
        merge_slots(&mut self.ain, &delta.ain);
        merge_slots(&mut self.aout, &delta.aout);
        merge_slots(&mut self.axis, &delta.axis);
        merge(&mut self.block_delete, delta.block_delete);
        merge(&mut self.current_line, delta.current_line);
        merge(&mut self.current_vel, delta.current_vel);
        merge(&mut self.delay_left, delta.delay_left);
        merge_slots(&mut self.din, &delta.din);
        merge(&mut self.distance_to_go, delta.distance_to_go);
        merge_slots(&mut self.dout, &delta.dout);
        merge_position(&mut self.dtg, &delta.dtg);
        merge(&mut self.enabled, delta.enabled);
        merge(&mut self.feed_hold_enabled, delta.feed_hold_enabled);
        merge(&mut self.feed_override_enabled, delta.feed_override_enabled);
        merge(&mut self.feedrate, delta.feedrate);
        merge(&mut self.g5x_index, delta.g5x_index);
        merge_position(&mut self.g5x_offset, &delta.g5x_offset);
        merge_position(&mut self.g92_offset, &delta.g92_offset);
        merge(&mut self.id, delta.id);
        merge(&mut self.inpos, delta.inpos);
        merge_position(&mut self.joint_actual_position, &delta.joint_actual_position);
        merge_position(&mut self.joint_position, &delta.joint_position);
        merge_slots(&mut self.limit, &delta.limit);
        merge(&mut self.motion_line, delta.motion_line);
        merge(&mut self.motion_type, delta.motion_type);
        merge(&mut self.motion_mode, delta.motion_mode);
        merge(&mut self.paused, delta.paused);
        merge_position(&mut self.position, &delta.position);
        merge(&mut self.probe_tripped, delta.probe_tripped);
        merge(&mut self.probe_val, delta.probe_val);
        merge_position(&mut self.probed_position, &delta.probed_position);
        merge(&mut self.probing, delta.probing);
        merge(&mut self.queue, delta.queue);
        merge(&mut self.queue_full, delta.queue_full);
        merge(&mut self.rotation_xy, delta.rotation_xy);
        merge(&mut self.spindle_brake, delta.spindle_brake);
        merge(&mut self.spindle_direction, delta.spindle_direction);
        merge(&mut self.spindle_enabled, delta.spindle_enabled);
        merge(&mut self.spindle_increasing, delta.spindle_increasing);
        merge(
            &mut self.spindle_override_enabled,
            delta.spindle_override_enabled,
        );
        merge(&mut self.spindle_speed, delta.spindle_speed);
        merge(&mut self.spindlerate, delta.spindlerate);
        merge(&mut self.state, delta.state);
    }
}

impl StatusConfig {
    /// Apply an incremental update on top of this state.
    pub fn merge_update(&mut self, delta: &StatusConfig) {
        merge(&mut self.acceleration, delta.acceleration);
        merge(&mut self.angular_units, delta.angular_units);
        merge(&mut self.axes, delta.axes);
        merge_slots(&mut self.axis, &delta.axis);
        merge(&mut self.axis_mask, delta.axis_mask);
        merge(&mut self.cycle_time, delta.cycle_time);
        merge(&mut self.debug, delta.debug);
        merge(&mut self.kinematics_type, delta.kinematics_type);
        merge(&mut self.linear_units, delta.linear_units);
        merge(&mut self.max_acceleration, delta.max_acceleration);
        merge(&mut self.max_velocity, delta.max_velocity);
        merge(&mut self.program_units, delta.program_units);
        merge(&mut self.velocity, delta.velocity);
        merge(&mut self.position_offset, delta.position_offset);
        merge(&mut self.position_feedback, delta.position_feedback);
        merge(&mut self.max_feed_override, delta.max_feed_override);
        merge(&mut self.min_feed_override, delta.min_feed_override);
        merge(&mut self.max_spindle_override, delta.max_spindle_override);
        merge(&mut self.min_spindle_override, delta.min_spindle_override);
        merge(&mut self.default_spindle_speed, delta.default_spindle_speed);
        merge(
            &mut self.default_linear_velocity,
            delta.default_linear_velocity,
        );
        merge(&mut self.min_velocity, delta.min_velocity);
        merge(&mut self.max_linear_velocity, delta.max_linear_velocity);
        merge(&mut self.min_linear_velocity, delta.min_linear_velocity);
        merge(
            &mut self.default_angular_velocity,
            delta.default_angular_velocity,
        );
        merge(&mut self.max_angular_velocity, delta.max_angular_velocity);
        merge(&mut self.min_angular_velocity, delta.min_angular_velocity);
        merge(&mut self.increments, delta.increments.clone());
        merge(&mut self.grids, delta.grids.clone());
        merge(&mut self.lathe, delta.lathe);
        merge(&mut self.geometry, delta.geometry.clone());
        merge(&mut self.arcdivision, delta.arcdivision);
        merge(&mut self.no_force_homing, delta.no_force_homing);
        merge_slots(&mut self.program_extension, &delta.program_extension);
    }
}
