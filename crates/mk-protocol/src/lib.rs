// mk-protocol: machinetalk wire protocol types and serialization.
//
// All messages travel inside a single `Container` envelope whose `type`
// field discriminates the message kind.  The encoding is protobuf-style
// length-delimited tagged fields (prost); field tags below are the frozen
// v1 wire numbers and must never be reassigned.
//
// Every payload field carries explicit presence (`Option`) so that an
// incremental status update can express "only these fields changed".
// Receivers must treat an absent field and a field set to its zero value
// as equivalent when reconstructing state.

pub mod command;
pub mod status;

pub use command::CommandParameters;
pub use status::{
    AnalogIo, CodeSlot, ConfigAxis, DigitalIo, MotionAxis, Position, ProgramExtension,
    SettingSlot, StatusConfig, StatusInterp, StatusIo, StatusMotion, StatusTask, ToolData,
};

// ---------------------------------------------------------------------------
// Topic names
// ---------------------------------------------------------------------------

/// Subscription topic strings, exactly as they appear in the first frame of
/// every published message and in XPUB subscription notifications.
pub mod topics {
    pub const IO: &str = "io";
    pub const TASK: &str = "task";
    pub const INTERP: &str = "interp";
    pub const MOTION: &str = "motion";
    pub const CONFIG: &str = "config";

    pub const ERROR: &str = "error";
    pub const TEXT: &str = "text";
    pub const DISPLAY: &str = "display";
}

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// Frozen v1 message kinds.
///
/// Grouping: 1-9 session, 10-19 status stream, 20-29 error stream,
/// 100+ commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    /// Placeholder for an absent/unset type; never sent.
    Unspecified = 0,
    Ping = 1,
    PingAcknowledge = 2,
    Error = 3,

    EmcstatFullUpdate = 10,
    EmcstatIncrementalUpdate = 11,

    EmcNmlError = 20,
    EmcOperatorError = 21,
    EmcNmlText = 22,
    EmcOperatorText = 23,
    EmcNmlDisplay = 24,
    EmcOperatorDisplay = 25,

    EmcTaskAbort = 100,
    EmcTaskPlanPause = 101,
    EmcTaskPlanResume = 102,
    EmcTaskPlanStep = 103,
    EmcTaskPlanRun = 104,
    EmcTaskPlanOpen = 105,
    EmcTaskPlanInit = 106,
    EmcTaskPlanExecute = 107,
    EmcTaskPlanSetBlockDelete = 108,
    EmcTaskPlanSetOptionalStop = 109,
    EmcTaskSetMode = 110,
    EmcTaskSetState = 111,

    EmcSetDebug = 120,

    EmcTrajSetScale = 130,
    EmcTrajSetMaxVelocity = 131,
    EmcTrajSetFhEnable = 132,
    EmcTrajSetFoEnable = 133,
    EmcTrajSetSoEnable = 134,
    EmcTrajSetSpindleScale = 135,
    EmcTrajSetMode = 136,
    EmcTrajSetTeleopEnable = 137,
    EmcTrajSetTeleopVector = 138,

    EmcMotionAdaptive = 150,
    EmcMotionSetAout = 151,
    EmcMotionSetDout = 152,

    EmcAxisHome = 160,
    EmcAxisUnhome = 161,
    EmcAxisAbort = 162,
    EmcAxisJog = 163,
    EmcAxisIncrJog = 164,
    EmcAxisOverrideLimits = 165,
    EmcAxisSetMaxPositionLimit = 166,
    EmcAxisSetMinPositionLimit = 167,

    EmcCoolantFloodOn = 180,
    EmcCoolantFloodOff = 181,
    EmcCoolantMistOn = 182,
    EmcCoolantMistOff = 183,

    EmcSpindleOn = 190,
    EmcSpindleOff = 191,
    EmcSpindleIncrease = 192,
    EmcSpindleDecrease = 193,
    EmcSpindleConstant = 194,
    EmcSpindleBrakeEngage = 195,
    EmcSpindleBrakeRelease = 196,

    EmcToolLoadToolTable = 200,
    EmcToolSetOffset = 201,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Connection-level parameters attached to full updates and to the first
/// error-side ping after a new subscription, so clients learn the expected
/// heartbeat cadence.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtocolParameters {
    /// Expected ping period in milliseconds.
    #[prost(uint32, optional, tag = "1")]
    pub keepalive_timer: Option<u32>,
}

/// The envelope wrapping every message in both directions.
///
/// Exactly one of the status payloads is set on status publications;
/// `emc_command_params` is set on parameterized commands; `note` carries
/// human-readable strings (error reasons, error-channel event text).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Container {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub pparams: Option<ProtocolParameters>,

    #[prost(message, optional, tag = "10")]
    pub emc_status_io: Option<StatusIo>,
    #[prost(message, optional, tag = "11")]
    pub emc_status_task: Option<StatusTask>,
    #[prost(message, optional, tag = "12")]
    pub emc_status_interp: Option<StatusInterp>,
    #[prost(message, optional, tag = "13")]
    pub emc_status_motion: Option<StatusMotion>,
    #[prost(message, optional, tag = "14")]
    pub emc_status_config: Option<StatusConfig>,

    #[prost(message, optional, tag = "20")]
    pub emc_command_params: Option<CommandParameters>,

    #[prost(string, repeated, tag = "25")]
    pub note: Vec<String>,
}

impl Container {
    /// An envelope carrying nothing but a message kind (pings, acks,
    /// no-parameter commands).
    pub fn of_type(kind: MessageType) -> Self {
        Container {
            r#type: kind as i32,
            ..Container::default()
        }
    }

    /// The decoded message kind, if the type value is a known v1 kind.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::try_from(self.r#type).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn envelope_roundtrip_preserves_type_and_notes() {
        let mut c = Container::of_type(MessageType::Error);
        c.note.push("wrong parameters".to_owned());
        let bytes = c.encode_to_vec();
        let back = Container::decode(bytes.as_slice()).unwrap();
        assert_eq!(back.kind(), Some(MessageType::Error));
        assert_eq!(back.note, vec!["wrong parameters".to_owned()]);
        assert!(back.emc_status_motion.is_none());
    }

    #[test]
    fn absent_fields_stay_absent() {
        let mut motion = StatusMotion::default();
        motion.feedrate = Some(1.0002);
        let mut c = Container::of_type(MessageType::EmcstatIncrementalUpdate);
        c.emc_status_motion = Some(motion);

        let back = Container::decode(c.encode_to_vec().as_slice()).unwrap();
        let body = back.emc_status_motion.unwrap();
        assert_eq!(body.feedrate, Some(1.0002));
        assert_eq!(body.enabled, None);
        assert!(body.axis.is_empty());
    }

    #[test]
    fn unknown_type_value_yields_no_kind() {
        let mut c = Container::default();
        c.r#type = 9999;
        let back = Container::decode(c.encode_to_vec().as_slice()).unwrap();
        assert_eq!(back.kind(), None);
    }

    #[test]
    fn pparams_only_present_when_set() {
        let mut c = Container::of_type(MessageType::EmcstatFullUpdate);
        c.pparams = Some(ProtocolParameters {
            keepalive_timer: Some(2000),
        });
        let back = Container::decode(c.encode_to_vec().as_slice()).unwrap();
        assert_eq!(back.pparams.unwrap().keepalive_timer, Some(2000));

        let plain = Container::of_type(MessageType::Ping);
        let back = Container::decode(plain.encode_to_vec().as_slice()).unwrap();
        assert!(back.pparams.is_none());
    }
}
