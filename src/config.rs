//! Analyser Configuration
//!
//! Tunables for the capture pipeline and the emulator, loadable from a
//! JSON file. Unrecognised keys are rejected. Device selection scoring
//! is a function, not data; it is passed directly to
//! [`select_device`](crate::signal_analyser::select_device).

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AnalyserError, Result};

/// Default synthesised counter frequency in Hz.
pub const DEFAULT_COUNTER_FREQUENCY: u32 = 10_000;

/// Default reconstructed-time silence that completes a capture, seconds.
pub const DEFAULT_IDLE_THRESHOLD: f64 = 1.0;

/// Default wall-clock timeout for awaiting a capture, seconds.
pub const DEFAULT_CAPTURE_TIMEOUT: f64 = 10.0;

/// Default burn-time to darkness gain in inverse seconds.
///
/// Calibrated so that a typical strobe window produces a fully black
/// dot.
pub const DEFAULT_BURN_GAIN: f64 = 25_000.0;

/// Tunable parameters of the print mech analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyserConfig {
    /// Synthesised counter frequency in Hz.
    pub counter_frequency: u32,
    /// Reconstructed-time silence that completes a capture, in seconds.
    pub idle_threshold: f64,
    /// Default wall-clock timeout for awaiting a capture, in seconds.
    pub default_capture_timeout: f64,
    /// Burn-time to darkness gain in inverse seconds.
    #[serde(alias = "burn_gain_k")]
    pub burn_gain: f64,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        AnalyserConfig {
            counter_frequency: DEFAULT_COUNTER_FREQUENCY,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            default_capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            burn_gain: DEFAULT_BURN_GAIN,
        }
    }
}

impl AnalyserConfig {
    /// Load a configuration from a JSON file; missing keys keep their
    /// defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: AnalyserConfig = serde_json::from_str(&text)
            .map_err(|e| AnalyserError::Config(format!("invalid configuration {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is in its legal range.
    pub fn validate(&self) -> Result<()> {
        if self.counter_frequency == 0 {
            return Err(AnalyserError::Config(
                "counter_frequency must be a positive number of Hz".into(),
            ));
        }
        if !(self.idle_threshold > 0.0) {
            return Err(AnalyserError::Config(
                "idle_threshold must be a positive number of seconds".into(),
            ));
        }
        if !(self.default_capture_timeout > 0.0) {
            return Err(AnalyserError::Config(
                "default_capture_timeout must be a positive number of seconds".into(),
            ));
        }
        if !(self.burn_gain > 0.0) {
            return Err(AnalyserError::Config("burn_gain must be positive".into()));
        }
        Ok(())
    }

    /// Default capture timeout as a [`Duration`].
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.default_capture_timeout)
    }
}
