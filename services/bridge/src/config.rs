//! Configuration loading.
//!
//! Two ini files feed the bridge:
//!
//! - the **deployment ini** (`MACHINEKIT_INI` env var): `[MACHINEKIT]`
//!   MKUUID, REMOTE, INTERFACES: whether to start at all, the deployment
//!   identity published in TXT records, and the interface preference list;
//! - the **machine ini** (first CLI arg or `INI_FILE_NAME` env var):
//!   `[DISPLAY]` cycle time and program directory, plus the static
//!   config-channel fields that are published once on the first config
//!   diff.
//!
//! A missing machine ini is not an error; every `[DISPLAY]` key has a
//! default.

use ini::Ini;
use mk_protocol::status::{PositionFeedbackMode, PositionOffsetMode};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading ini file '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: ini::Error,
    },
    #[error("missing key [{section}] {key} in '{path}'")]
    MissingKey {
        path: String,
        section: String,
        key: String,
    },
    #[error("invalid value for [{section}] {key}: '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Deployment ini
// ---------------------------------------------------------------------------

/// `[MACHINEKIT]` section of the deployment ini.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Deployment UUID published as `uuid=` in every TXT record.
    pub uuid: String,
    /// Remote communication switch; the bridge refuses to start when off.
    pub remote: bool,
    /// Interface name prefixes, tried in order.
    pub interfaces: Vec<String>,
}

impl MachineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let get = |key: &str| -> Result<&str, ConfigError> {
            ini.get_from(Some("MACHINEKIT"), key)
                .ok_or_else(|| ConfigError::MissingKey {
                    path: path.display().to_string(),
                    section: "MACHINEKIT".to_owned(),
                    key: key.to_owned(),
                })
        };

        let uuid = get("MKUUID")?.to_owned();
        let remote_raw = get("REMOTE")?;
        let remote: i32 = remote_raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            section: "MACHINEKIT".to_owned(),
            key: "REMOTE".to_owned(),
            value: remote_raw.to_owned(),
        })?;
        let interfaces = get("INTERFACES")?
            .split_whitespace()
            .map(str::to_owned)
            .collect();

        Ok(MachineConfig {
            uuid,
            remote: remote != 0,
            interfaces,
        })
    }
}

// ---------------------------------------------------------------------------
// Machine ini
// ---------------------------------------------------------------------------

/// `[DISPLAY]` (plus `[TRAJ]`/`[FILTER]`) settings from the machine ini.
///
/// The override/velocity/geometry fields are sourced here rather than from
/// the runtime snapshot; they are published once, in the first config-diff
/// delta, and never re-read.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Control-loop poll interval in seconds.
    pub cycle_time: f64,
    /// Program directory; `None` falls back to the working directory.
    pub program_prefix: Option<PathBuf>,

    pub position_offset: PositionOffsetMode,
    pub position_feedback: PositionFeedbackMode,
    pub max_feed_override: f64,
    pub min_feed_override: f64,
    pub max_spindle_override: f64,
    pub min_spindle_override: f64,
    pub default_spindle_speed: f64,
    pub default_linear_velocity: f64,
    pub min_velocity: f64,
    pub max_linear_velocity: f64,
    pub min_linear_velocity: f64,
    pub default_angular_velocity: f64,
    pub max_angular_velocity: f64,
    pub min_angular_velocity: f64,
    pub increments: String,
    pub grids: String,
    pub lathe: bool,
    pub geometry: String,
    pub arcdivision: i32,
    pub no_force_homing: bool,
    pub program_extensions: Vec<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            cycle_time: 0.1,
            program_prefix: None,
            position_offset: PositionOffsetMode::Relative,
            position_feedback: PositionFeedbackMode::Actual,
            max_feed_override: 1.2,
            min_feed_override: 0.5,
            max_spindle_override: 1.0,
            min_spindle_override: 0.5,
            default_spindle_speed: 1.0,
            default_linear_velocity: 0.25,
            min_velocity: 0.01,
            max_linear_velocity: 1.0,
            min_linear_velocity: 0.01,
            default_angular_velocity: 0.25,
            max_angular_velocity: 1.0,
            min_angular_velocity: 0.01,
            increments: String::new(),
            grids: String::new(),
            lathe: false,
            geometry: String::new(),
            arcdivision: 64,
            no_force_homing: false,
            program_extensions: Vec::new(),
        }
    }
}

impl DisplayConfig {
    /// Load from the machine ini; `None` yields all defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(DisplayConfig::default());
        };
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        })?;
        Ok(DisplayConfig::from_ini(&ini))
    }

    fn from_ini(ini: &Ini) -> Self {
        let defaults = DisplayConfig::default();
        let display = |key: &str| ini.get_from(Some("DISPLAY"), key);

        let position_offset = match display("POSITION_OFFSET") {
            Some("MACHINE") => PositionOffsetMode::Machine,
            _ => PositionOffsetMode::Relative,
        };
        let position_feedback = match display("POSITION_FEEDBACK") {
            Some("COMMANDED") => PositionFeedbackMode::Commanded,
            _ => PositionFeedbackMode::Actual,
        };

        let program_extensions = ini
            .section(Some("FILTER"))
            .map(|filter| {
                filter
                    .get_all("PROGRAM_EXTENSION")
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        DisplayConfig {
            cycle_time: parse_f64(display("CYCLE_TIME"), defaults.cycle_time),
            program_prefix: display("PROGRAM_PREFIX").map(PathBuf::from),
            position_offset,
            position_feedback,
            max_feed_override: parse_f64(display("MAX_FEED_OVERRIDE"), defaults.max_feed_override),
            min_feed_override: parse_f64(display("MIN_FEED_OVERRIDE"), defaults.min_feed_override),
            max_spindle_override: parse_f64(
                display("MAX_SPINDLE_OVERRIDE"),
                defaults.max_spindle_override,
            ),
            min_spindle_override: parse_f64(
                display("MIN_SPINDLE_OVERRIDE"),
                defaults.min_spindle_override,
            ),
            default_spindle_speed: parse_f64(
                display("DEFAULT_SPINDLE_SPEED"),
                defaults.default_spindle_speed,
            ),
            default_linear_velocity: parse_f64(
                display("DEFAULT_LINEAR_VELOCITY"),
                defaults.default_linear_velocity,
            ),
            min_velocity: parse_f64(display("MIN_VELOCITY"), defaults.min_velocity),
            max_linear_velocity: parse_f64(
                display("MAX_LINEAR_VELOCITY"),
                defaults.max_linear_velocity,
            ),
            min_linear_velocity: parse_f64(
                display("MIN_LINEAR_VELOCITY"),
                defaults.min_linear_velocity,
            ),
            default_angular_velocity: parse_f64(
                display("DEFAULT_ANGULAR_VELOCITY"),
                defaults.default_angular_velocity,
            ),
            max_angular_velocity: parse_f64(
                display("MAX_ANGULAR_VELOCITY"),
                defaults.max_angular_velocity,
            ),
            min_angular_velocity: parse_f64(
                display("MIN_ANGULAR_VELOCITY"),
                defaults.min_angular_velocity,
            ),
            increments: display("INCREMENTS").unwrap_or_default().to_owned(),
            grids: display("GRIDS").unwrap_or_default().to_owned(),
            lathe: parse_bool(display("LATHE")),
            geometry: display("GEOMETRY").unwrap_or_default().to_owned(),
            arcdivision: parse_i32(display("ARCDIVISION"), defaults.arcdivision),
            no_force_homing: parse_bool(ini.get_from(Some("TRAJ"), "NO_FORCE_HOMING")),
            program_extensions,
        }
    }

    /// The directory the file service and PLAN_OPEN resolve against.
    pub fn program_dir(&self) -> PathBuf {
        self.program_prefix
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

fn parse_f64(value: Option<&str>, default: f64) -> f64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_i32(value: Option<&str>, default: i32) -> i32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_bool(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
