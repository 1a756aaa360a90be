// src/utils/config.rs
//! Recorder configuration
//!
//! Values are layered: built-in defaults, then an optional config file,
//! then `UNDERHAND_*` environment variables.

use crate::utils::errors::{RecorderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Upper bound on the flush interval (one week)
pub const MAX_SEND_ANY_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// How `change` events on `<input>` elements are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeInputPolicy {
    /// Every non-select input change is recorded as a checkbox change,
    /// text and password inputs included
    #[default]
    AnyInput,

    /// Text and password inputs (and inputs without a type) are skipped
    ExcludeText,
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Compress and base64-encode payloads
    pub compress: bool,

    /// Timer-based flush interval (seconds, fractions allowed)
    pub send_any_secs: f64,

    /// Buffered record count that forces an immediate flush
    pub actions_threshold: usize,

    /// Emit the `init` record when the session starts
    pub send_initial: bool,

    /// Minimum pointer travel (pixels) before a move is recorded, 0 disables
    pub pointer_move_threshold: i32,

    /// Classification of `change` on inputs
    pub change_policy: ChangeInputPolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            compress: true,
            send_any_secs: 10.0,
            actions_threshold: 100,
            send_initial: true,
            pointer_move_threshold: 2,
            change_policy: ChangeInputPolicy::AnyInput,
        }
    }
}

impl RecorderConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading recorder configuration from {:?}", path);
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("UNDERHAND").try_parsing(true))
            .build()?;

        let config: RecorderConfig = settings.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.send_any_secs.is_finite() && self.send_any_secs > 0.0) {
            return Err(RecorderError::InvalidConfig(format!(
                "send_any_secs must be a positive number, got {}",
                self.send_any_secs
            )));
        }

        if self.send_any_secs > MAX_SEND_ANY_SECS {
            return Err(RecorderError::InvalidConfig(format!(
                "send_any_secs cannot exceed {} seconds",
                MAX_SEND_ANY_SECS
            )));
        }

        if self.actions_threshold == 0 {
            return Err(RecorderError::InvalidConfig(
                "actions_threshold must be greater than 0".to_string(),
            ));
        }

        if self.pointer_move_threshold < 0 {
            return Err(RecorderError::InvalidConfig(
                "pointer_move_threshold cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Flush interval as a `Duration`
    ///
    /// Out-of-range values saturate; `validate` rejects them up front.
    pub fn flush_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.send_any_secs).unwrap_or(if self.send_any_secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}
