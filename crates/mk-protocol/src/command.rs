//! Command argument payload.
//!
//! Each command kind requires a specific subset of these fields; presence
//! is the validity test, so a zero value is a legitimate argument.

use crate::status::{Position, ToolData};

/// Arguments accompanying a parameterized command envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandParameters {
    /// Starting line for PLAN_RUN.
    #[prost(int32, optional, tag = "1")]
    pub line_number: Option<i32>,
    /// Program path for PLAN_OPEN, relative to the program directory.
    #[prost(string, optional, tag = "2")]
    pub path: Option<String>,
    /// MDI text for PLAN_EXECUTE.
    #[prost(string, optional, tag = "3")]
    pub command: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub enable: Option<bool>,
    #[prost(int32, optional, tag = "5")]
    pub debug_level: Option<i32>,
    #[prost(double, optional, tag = "6")]
    pub scale: Option<f64>,
    #[prost(double, optional, tag = "7")]
    pub velocity: Option<f64>,
    #[prost(double, optional, tag = "8")]
    pub distance: Option<f64>,
    /// Axis, pin, or slot index depending on the command kind.
    #[prost(int32, optional, tag = "9")]
    pub index: Option<i32>,
    #[prost(double, optional, tag = "10")]
    pub value: Option<f64>,
    #[prost(int32, optional, tag = "11")]
    pub task_mode: Option<i32>,
    #[prost(int32, optional, tag = "12")]
    pub task_state: Option<i32>,
    #[prost(int32, optional, tag = "13")]
    pub traj_mode: Option<i32>,
    /// Teleop vector; a/b/c required, u/v/w optional in nested order.
    #[prost(message, optional, tag = "14")]
    pub pose: Option<Position>,
    /// Tool offset payload for TOOL_SET_OFFSET.
    #[prost(message, optional, tag = "15")]
    pub tool_data: Option<ToolData>,
}
