//! Command dispatch.
//!
//! One inbound frame, one decoded envelope, one branch per command kind.
//! Each parameterized kind names its required fields; a missing field
//! produces an `ERROR` reply with note `"wrong parameters"` and the
//! runtime is not invoked.  Presence is the test; a field set to zero is
//! a valid argument.  Unrecognized kinds (including a type value outside
//! the known enum) get `"unknown command"`.
//!
//! Command success is implicit: the only positive reply is
//! PING_ACKNOWLEDGE for PING.  Effects surface on the status stream.  A
//! runtime-side command failure is logged and never replied.
//!
//! An undecodable frame is a transport transient: logged and dropped.

use crate::runtime::{AutoOp, BrakeOp, Commander, JogOp, SpindleOp, TeleopVector, ToolOffset};
use mk_protocol::{CommandParameters, Container, MessageType};
use prost::Message;
use std::path::PathBuf;
use tracing::{error, warn};

/// Decodes command envelopes and drives the runtime.
pub struct CommandDispatcher<C: Commander> {
    commander: C,
    /// PLAN_OPEN paths resolve against this directory.
    program_dir: PathBuf,
}

fn wrong_parameters() -> Container {
    let mut reply = Container::of_type(MessageType::Error);
    reply.note.push("wrong parameters".to_owned());
    reply
}

fn unknown_command() -> Container {
    let mut reply = Container::of_type(MessageType::Error);
    reply.note.push("unknown command".to_owned());
    reply
}

impl<C: Commander> CommandDispatcher<C> {
    pub fn new(commander: C, program_dir: PathBuf) -> Self {
        CommandDispatcher {
            commander,
            program_dir,
        }
    }

    /// Handle one inbound frame; returns the reply envelope, if any.
    pub fn handle(&mut self, frame: &[u8]) -> Option<Container> {
        let rx = match Container::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "discarding undecodable command frame");
                return None;
            }
        };
        let Some(kind) = rx.kind() else {
            return Some(unknown_command());
        };
        let params = rx.emc_command_params.as_ref();

        let outcome = match kind {
            MessageType::Ping => {
                return Some(Container::of_type(MessageType::PingAcknowledge));
            }

            MessageType::EmcTaskAbort => self.commander.abort(),
            MessageType::EmcTaskPlanPause => self.commander.auto(AutoOp::Pause),
            MessageType::EmcTaskPlanResume => self.commander.auto(AutoOp::Resume),
            MessageType::EmcTaskPlanStep => self.commander.auto(AutoOp::Step),
            MessageType::EmcTaskPlanRun => match params.and_then(|p| p.line_number) {
                Some(line) => self.commander.auto(AutoOp::Run { line }),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTaskPlanOpen => match params.and_then(|p| p.path.as_deref()) {
                Some(path) => self.commander.program_open(&self.program_dir.join(path)),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTaskPlanInit => self.commander.reset_interpreter(),
            MessageType::EmcTaskPlanExecute => match params.and_then(|p| p.command.as_deref()) {
                Some(command) => self.commander.mdi(command),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTaskPlanSetBlockDelete => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.set_block_delete(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTaskPlanSetOptionalStop => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.set_optional_stop(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTaskSetMode => match params.and_then(|p| p.task_mode) {
                Some(mode) => self.commander.mode(mode),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTaskSetState => match params.and_then(|p| p.task_state) {
                Some(state) => self.commander.state(state),
                None => return Some(wrong_parameters()),
            },

            MessageType::EmcSetDebug => match params.and_then(|p| p.debug_level) {
                Some(level) => self.commander.debug(level),
                None => return Some(wrong_parameters()),
            },

            MessageType::EmcTrajSetScale => match params.and_then(|p| p.scale) {
                Some(scale) => self.commander.feedrate(scale),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetMaxVelocity => match params.and_then(|p| p.velocity) {
                Some(velocity) => self.commander.maxvel(velocity),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetFhEnable => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.set_feed_hold(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetFoEnable => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.set_feed_override(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetSoEnable => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.set_spindle_override(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetSpindleScale => match params.and_then(|p| p.scale) {
                Some(scale) => self.commander.spindle_override(scale),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetMode => match params.and_then(|p| p.traj_mode) {
                Some(mode) => self.commander.traj_mode(mode),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetTeleopEnable => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.teleop_enable(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcTrajSetTeleopVector => match teleop_vector(params) {
                Some(vector) => self.commander.teleop_vector(vector),
                None => return Some(wrong_parameters()),
            },

            MessageType::EmcMotionAdaptive => match params.and_then(|p| p.enable) {
                Some(enable) => self.commander.set_adaptive_feed(enable),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcMotionSetAout => {
                match params.and_then(|p| Some((p.index?, p.value?))) {
                    Some((index, value)) => self.commander.set_analog_output(index, value),
                    None => return Some(wrong_parameters()),
                }
            }
            MessageType::EmcMotionSetDout => {
                match params.and_then(|p| Some((p.index?, p.enable?))) {
                    Some((index, enable)) => self.commander.set_digital_output(index, enable),
                    None => return Some(wrong_parameters()),
                }
            }

            MessageType::EmcAxisHome => match params.and_then(|p| p.index) {
                Some(axis) => self.commander.home(axis),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcAxisUnhome => match params.and_then(|p| p.index) {
                Some(axis) => self.commander.unhome(axis),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcAxisAbort => match params.and_then(|p| p.index) {
                Some(axis) => self.commander.jog(JogOp::Stop { axis }),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcAxisJog => {
                match params.and_then(|p| Some((p.index?, p.velocity?))) {
                    Some((axis, velocity)) => {
                        self.commander.jog(JogOp::Continuous { axis, velocity })
                    }
                    None => return Some(wrong_parameters()),
                }
            }
            MessageType::EmcAxisIncrJog => {
                match params.and_then(|p| Some((p.index?, p.velocity?, p.distance?))) {
                    Some((axis, velocity, distance)) => self.commander.jog(JogOp::Increment {
                        axis,
                        velocity,
                        distance,
                    }),
                    None => return Some(wrong_parameters()),
                }
            }
            MessageType::EmcAxisOverrideLimits => self.commander.override_limits(),
            MessageType::EmcAxisSetMaxPositionLimit => {
                match params.and_then(|p| Some((p.index?, p.value?))) {
                    Some((axis, value)) => self.commander.set_max_limit(axis, value),
                    None => return Some(wrong_parameters()),
                }
            }
            MessageType::EmcAxisSetMinPositionLimit => {
                match params.and_then(|p| Some((p.index?, p.value?))) {
                    Some((axis, value)) => self.commander.set_min_limit(axis, value),
                    None => return Some(wrong_parameters()),
                }
            }

            MessageType::EmcCoolantFloodOn => self.commander.flood(true),
            MessageType::EmcCoolantFloodOff => self.commander.flood(false),
            MessageType::EmcCoolantMistOn => self.commander.mist(true),
            MessageType::EmcCoolantMistOff => self.commander.mist(false),

            MessageType::EmcSpindleOn => match params.and_then(|p| p.velocity) {
                // always forward; the speed may be signed
                Some(speed) => self.commander.spindle(SpindleOp::Forward { speed }),
                None => return Some(wrong_parameters()),
            },
            MessageType::EmcSpindleIncrease => self.commander.spindle(SpindleOp::Increase),
            MessageType::EmcSpindleDecrease => self.commander.spindle(SpindleOp::Decrease),
            MessageType::EmcSpindleConstant => self.commander.spindle(SpindleOp::Constant),
            MessageType::EmcSpindleOff => self.commander.spindle(SpindleOp::Off),
            MessageType::EmcSpindleBrakeEngage => self.commander.brake(BrakeOp::Engage),
            MessageType::EmcSpindleBrakeRelease => self.commander.brake(BrakeOp::Release),

            MessageType::EmcToolLoadToolTable => self.commander.load_tool_table(),
            MessageType::EmcToolSetOffset => match tool_offset(params) {
                Some(offset) => self.commander.tool_offset(offset),
                None => return Some(wrong_parameters()),
            },

            // session/stream kinds have no meaning on the command socket
            _ => return Some(unknown_command()),
        };

        if let Err(e) = outcome {
            error!(kind = ?kind, error = %e, "runtime rejected command");
        }
        None
    }
}

/// Extract the teleop vector: a/b/c required; u, then v, then w are picked
/// up only while the chain is unbroken.
fn teleop_vector(params: Option<&CommandParameters>) -> Option<TeleopVector> {
    let pose = params?.pose.as_ref()?;
    let mut vector = TeleopVector {
        a: pose.a?,
        b: pose.b?,
        c: pose.c?,
        u: None,
        v: None,
        w: None,
    };
    if let Some(u) = pose.u {
        vector.u = Some(u);
        if let Some(v) = pose.v {
            vector.v = Some(v);
            if let Some(w) = pose.w {
                vector.w = Some(w);
            }
        }
    }
    Some(vector)
}

/// Extract the tool offset; every named field must be present (zero is a
/// legitimate value).
fn tool_offset(params: Option<&CommandParameters>) -> Option<ToolOffset> {
    let data = params?.tool_data.as_ref()?;
    Some(ToolOffset {
        tool: data.index?,
        z_offset: data.z_offset?,
        x_offset: data.x_offset?,
        diameter: data.diameter?,
        frontangle: data.frontangle?,
        backangle: data.backangle?,
        orientation: data.orientation?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeError;
    use mk_protocol::status::{Position, ToolData};
    use std::path::Path;

    /// Records every runtime call for assertion.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Commander for Recorder {
        fn abort(&mut self) -> Result<(), RuntimeError> {
            self.calls.push("abort".into());
            Ok(())
        }
        fn auto(&mut self, op: AutoOp) -> Result<(), RuntimeError> {
            self.calls.push(format!("auto {op:?}"));
            Ok(())
        }
        fn brake(&mut self, op: BrakeOp) -> Result<(), RuntimeError> {
            self.calls.push(format!("brake {op:?}"));
            Ok(())
        }
        fn debug(&mut self, level: i32) -> Result<(), RuntimeError> {
            self.calls.push(format!("debug {level}"));
            Ok(())
        }
        fn feedrate(&mut self, scale: f64) -> Result<(), RuntimeError> {
            self.calls.push(format!("feedrate {scale}"));
            Ok(())
        }
        fn flood(&mut self, on: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("flood {on}"));
            Ok(())
        }
        fn home(&mut self, axis: i32) -> Result<(), RuntimeError> {
            self.calls.push(format!("home {axis}"));
            Ok(())
        }
        fn jog(&mut self, op: JogOp) -> Result<(), RuntimeError> {
            self.calls.push(format!("jog {op:?}"));
            Ok(())
        }
        fn load_tool_table(&mut self) -> Result<(), RuntimeError> {
            self.calls.push("load_tool_table".into());
            Ok(())
        }
        fn maxvel(&mut self, velocity: f64) -> Result<(), RuntimeError> {
            self.calls.push(format!("maxvel {velocity}"));
            Ok(())
        }
        fn mdi(&mut self, command: &str) -> Result<(), RuntimeError> {
            self.calls.push(format!("mdi {command}"));
            Ok(())
        }
        fn mist(&mut self, on: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("mist {on}"));
            Ok(())
        }
        fn mode(&mut self, task_mode: i32) -> Result<(), RuntimeError> {
            self.calls.push(format!("mode {task_mode}"));
            Ok(())
        }
        fn override_limits(&mut self) -> Result<(), RuntimeError> {
            self.calls.push("override_limits".into());
            Ok(())
        }
        fn program_open(&mut self, path: &Path) -> Result<(), RuntimeError> {
            self.calls.push(format!("program_open {}", path.display()));
            Ok(())
        }
        fn reset_interpreter(&mut self) -> Result<(), RuntimeError> {
            self.calls.push("reset_interpreter".into());
            Ok(())
        }
        fn set_adaptive_feed(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_adaptive_feed {enable}"));
            Ok(())
        }
        fn set_analog_output(&mut self, index: i32, value: f64) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_analog_output {index} {value}"));
            Ok(())
        }
        fn set_block_delete(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_block_delete {enable}"));
            Ok(())
        }
        fn set_digital_output(&mut self, index: i32, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_digital_output {index} {enable}"));
            Ok(())
        }
        fn set_feed_hold(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_feed_hold {enable}"));
            Ok(())
        }
        fn set_feed_override(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_feed_override {enable}"));
            Ok(())
        }
        fn set_max_limit(&mut self, axis: i32, value: f64) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_max_limit {axis} {value}"));
            Ok(())
        }
        fn set_min_limit(&mut self, axis: i32, value: f64) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_min_limit {axis} {value}"));
            Ok(())
        }
        fn set_optional_stop(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_optional_stop {enable}"));
            Ok(())
        }
        fn set_spindle_override(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("set_spindle_override {enable}"));
            Ok(())
        }
        fn spindle(&mut self, op: SpindleOp) -> Result<(), RuntimeError> {
            self.calls.push(format!("spindle {op:?}"));
            Ok(())
        }
        fn spindle_override(&mut self, scale: f64) -> Result<(), RuntimeError> {
            self.calls.push(format!("spindle_override {scale}"));
            Ok(())
        }
        fn state(&mut self, task_state: i32) -> Result<(), RuntimeError> {
            self.calls.push(format!("state {task_state}"));
            Ok(())
        }
        fn teleop_enable(&mut self, enable: bool) -> Result<(), RuntimeError> {
            self.calls.push(format!("teleop_enable {enable}"));
            Ok(())
        }
        fn traj_mode(&mut self, mode: i32) -> Result<(), RuntimeError> {
            self.calls.push(format!("traj_mode {mode}"));
            Ok(())
        }
        fn teleop_vector(&mut self, vector: TeleopVector) -> Result<(), RuntimeError> {
            self.calls.push(format!("teleop_vector {vector:?}"));
            Ok(())
        }
        fn tool_offset(&mut self, offset: ToolOffset) -> Result<(), RuntimeError> {
            self.calls.push(format!("tool_offset {offset:?}"));
            Ok(())
        }
        fn unhome(&mut self, axis: i32) -> Result<(), RuntimeError> {
            self.calls.push(format!("unhome {axis}"));
            Ok(())
        }
    }

    fn dispatcher() -> CommandDispatcher<Recorder> {
        CommandDispatcher::new(Recorder::default(), PathBuf::from("/srv/nc"))
    }

    fn frame(envelope: &Container) -> Vec<u8> {
        envelope.encode_to_vec()
    }

    fn command(kind: MessageType, params: CommandParameters) -> Vec<u8> {
        let mut envelope = Container::of_type(kind);
        envelope.emc_command_params = Some(params);
        frame(&envelope)
    }

    #[test]
    fn ping_gets_an_acknowledge() {
        let mut d = dispatcher();
        let reply = d
            .handle(&frame(&Container::of_type(MessageType::Ping)))
            .unwrap();
        assert_eq!(reply.kind(), Some(MessageType::PingAcknowledge));
        assert!(d.commander.calls.is_empty());
    }

    #[test]
    fn plan_run_without_params_is_rejected_and_runtime_untouched() {
        let mut d = dispatcher();
        let reply = d
            .handle(&frame(&Container::of_type(MessageType::EmcTaskPlanRun)))
            .unwrap();
        assert_eq!(reply.kind(), Some(MessageType::Error));
        assert_eq!(reply.note, vec!["wrong parameters".to_owned()]);
        assert!(d.commander.calls.is_empty());
    }

    #[test]
    fn plan_run_with_line_number_invokes_auto() {
        let mut d = dispatcher();
        let reply = d.handle(&command(
            MessageType::EmcTaskPlanRun,
            CommandParameters {
                line_number: Some(12),
                ..CommandParameters::default()
            },
        ));
        assert!(reply.is_none());
        assert_eq!(d.commander.calls, vec!["auto Run { line: 12 }"]);
    }

    #[test]
    fn plan_open_joins_the_program_directory() {
        let mut d = dispatcher();
        let reply = d.handle(&command(
            MessageType::EmcTaskPlanOpen,
            CommandParameters {
                path: Some("part.ngc".to_owned()),
                ..CommandParameters::default()
            },
        ));
        assert!(reply.is_none());
        assert_eq!(d.commander.calls, vec!["program_open /srv/nc/part.ngc"]);
    }

    #[test]
    fn no_parameter_commands_invoke_directly() {
        let mut d = dispatcher();
        for kind in [
            MessageType::EmcTaskAbort,
            MessageType::EmcCoolantFloodOn,
            MessageType::EmcSpindleOff,
            MessageType::EmcAxisOverrideLimits,
            MessageType::EmcToolLoadToolTable,
        ] {
            assert!(d.handle(&frame(&Container::of_type(kind))).is_none());
        }
        assert_eq!(
            d.commander.calls,
            vec![
                "abort",
                "flood true",
                "spindle Off",
                "override_limits",
                "load_tool_table"
            ]
        );
    }

    #[test]
    fn unknown_kind_is_reported() {
        let mut d = dispatcher();
        let mut envelope = Container::default();
        envelope.r#type = 9999;
        let reply = d.handle(&frame(&envelope)).unwrap();
        assert_eq!(reply.kind(), Some(MessageType::Error));
        assert_eq!(reply.note, vec!["unknown command".to_owned()]);
    }

    #[test]
    fn stream_kinds_on_the_command_socket_are_unknown() {
        let mut d = dispatcher();
        let reply = d
            .handle(&frame(&Container::of_type(MessageType::EmcstatFullUpdate)))
            .unwrap();
        assert_eq!(reply.note, vec!["unknown command".to_owned()]);
    }

    #[test]
    fn undecodable_frame_is_dropped_silently() {
        let mut d = dispatcher();
        assert!(d.handle(&[0xff, 0xff, 0xff, 0x01]).is_none());
        assert!(d.commander.calls.is_empty());
    }

    #[test]
    fn spindle_on_requires_velocity() {
        let mut d = dispatcher();
        let reply = d
            .handle(&frame(&Container::of_type(MessageType::EmcSpindleOn)))
            .unwrap();
        assert_eq!(reply.note, vec!["wrong parameters".to_owned()]);

        let reply = d.handle(&command(
            MessageType::EmcSpindleOn,
            CommandParameters {
                velocity: Some(-200.0),
                ..CommandParameters::default()
            },
        ));
        assert!(reply.is_none());
        assert_eq!(d.commander.calls, vec!["spindle Forward { speed: -200.0 }"]);
    }

    #[test]
    fn incr_jog_requires_all_three_fields() {
        let mut d = dispatcher();
        let reply = d.handle(&command(
            MessageType::EmcAxisIncrJog,
            CommandParameters {
                index: Some(0),
                velocity: Some(1.0),
                ..CommandParameters::default()
            },
        ));
        assert_eq!(reply.unwrap().note, vec!["wrong parameters".to_owned()]);
        assert!(d.commander.calls.is_empty());
    }

    #[test]
    fn teleop_vector_nested_optionals() {
        let mut d = dispatcher();
        // w without v: the chain stops at u
        let reply = d.handle(&command(
            MessageType::EmcTrajSetTeleopVector,
            CommandParameters {
                pose: Some(Position {
                    a: Some(1.0),
                    b: Some(2.0),
                    c: Some(3.0),
                    u: Some(4.0),
                    w: Some(6.0),
                    ..Position::default()
                }),
                ..CommandParameters::default()
            },
        ));
        assert!(reply.is_none());
        assert_eq!(
            d.commander.calls,
            vec![
                "teleop_vector TeleopVector { a: 1.0, b: 2.0, c: 3.0, u: Some(4.0), v: None, w: None }"
            ]
        );
    }

    #[test]
    fn teleop_vector_missing_c_is_rejected() {
        let mut d = dispatcher();
        let reply = d.handle(&command(
            MessageType::EmcTrajSetTeleopVector,
            CommandParameters {
                pose: Some(Position {
                    a: Some(1.0),
                    b: Some(2.0),
                    ..Position::default()
                }),
                ..CommandParameters::default()
            },
        ));
        assert_eq!(reply.unwrap().note, vec!["wrong parameters".to_owned()]);
    }

    #[test]
    fn tool_offset_accepts_zero_values() {
        let mut d = dispatcher();
        let reply = d.handle(&command(
            MessageType::EmcToolSetOffset,
            CommandParameters {
                tool_data: Some(ToolData {
                    index: Some(3),
                    z_offset: Some(0.0),
                    x_offset: Some(0.0),
                    diameter: Some(6.35),
                    frontangle: Some(0.0),
                    backangle: Some(0.0),
                    orientation: Some(0),
                    ..ToolData::default()
                }),
                ..CommandParameters::default()
            },
        ));
        assert!(reply.is_none());
        assert_eq!(d.commander.calls.len(), 1);
        assert!(d.commander.calls[0].starts_with("tool_offset"));
    }

    #[test]
    fn tool_offset_missing_field_is_rejected() {
        let mut d = dispatcher();
        let reply = d.handle(&command(
            MessageType::EmcToolSetOffset,
            CommandParameters {
                tool_data: Some(ToolData {
                    index: Some(3),
                    z_offset: Some(0.1),
                    ..ToolData::default()
                }),
                ..CommandParameters::default()
            },
        ));
        assert_eq!(reply.unwrap().note, vec!["wrong parameters".to_owned()]);
        assert!(d.commander.calls.is_empty());
    }
}
