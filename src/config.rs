//! Machine configuration.
//!
//! Field names deserialize from the camelCase option names
//! (`filterRepeatUpdates`, `debugLogBufferCount`, ...). Every field has a
//! default, so a partial JSON object is a valid config.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// Default cap on retained debug-log entries.
pub const DEFAULT_DEBUG_LOG_BUFFER_COUNT: usize = 1000;

/// Layout direction of the generated state diagram.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    TB,
    LR,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TB => f.write_str("TB"),
            Self::LR => f.write_str("LR"),
        }
    }
}

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime options for a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MachineConfig {
    /// Print declared rejections through `tracing`. Filtered rejections
    /// are never printed.
    pub output_transition_rejection_to_console: bool,

    /// Reject updates whose payload equals the current payload.
    pub filter_repeat_updates: bool,

    /// Maximum retained debug-log entries. `Some(0)` disables the log,
    /// `None` (JSON `null`) keeps everything.
    pub debug_log_buffer_count: Option<usize>,

    /// Store payloads in the debug log as JSON text.
    pub stringify_log_transition_data: bool,

    /// Also log filtered (repeat-update) rejections.
    pub record_filtered_updates_to_debug_log: bool,

    /// Default for `override_current_state`'s `reset_log` argument.
    pub reset_debug_log_on_override: bool,

    /// Append `reset`/`recover` entries restating the state the machine
    /// stays in after a rejection or a crash.
    pub record_reset_data_to_debug_log: bool,

    pub state_diagram_direction: Direction,

    /// Refuse to build a machine whose graph has inconsistent
    /// enter/leave declarations.
    pub enforce_graph_consistency: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            output_transition_rejection_to_console: true,
            filter_repeat_updates: true,
            debug_log_buffer_count: Some(DEFAULT_DEBUG_LOG_BUFFER_COUNT),
            stringify_log_transition_data: false,
            record_filtered_updates_to_debug_log: false,
            reset_debug_log_on_override: true,
            record_reset_data_to_debug_log: true,
            state_diagram_direction: Direction::TB,
            enforce_graph_consistency: false,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON, defaulting missing options.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
