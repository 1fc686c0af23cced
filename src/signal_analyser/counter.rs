//! Counter Synthesis
//!
//! Drives eight digital outputs as a binary ripple counter which is wired
//! back into the analyser's inputs, so every captured sample carries an
//! 8-bit time index. Generating the clock on the device fabric keeps the
//! sample stream self-describing and avoids host-side timestamp jitter.

use super::discovery::{DeviceState, DiscoveryIo};
use super::record::COUNTER_OUTPUT_CHANNELS;
use crate::Result;

/// Configuration of the synthesised ripple counter.
///
/// Channel `n` toggles at `frequency / 2^n`, so reading all eight lines
/// as one byte yields a binary counter incrementing at `frequency`. The
/// MSB rolls over every `256 / frequency` seconds.
#[derive(Debug, Clone)]
pub struct CounterSynth {
    channels: [u8; 8],
    frequency: u32,
}

impl CounterSynth {
    /// Counter on the default output channels at `frequency` Hz.
    pub fn new(frequency: u32) -> Self {
        Self::with_channels(COUNTER_OUTPUT_CHANNELS, frequency)
    }

    /// Counter on an explicit set of output channels, LSB to MSB.
    pub fn with_channels(channels: [u8; 8], frequency: u32) -> Self {
        CounterSynth {
            channels,
            frequency,
        }
    }

    /// Tick frequency of the counter LSB in Hz.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Per-channel clock dividers for a device running at
    /// `internal_clock_hz`, doubling from the LSB up.
    pub fn dividers(&self, internal_clock_hz: f64) -> [u32; 8] {
        let mut dividers = [0u32; 8];
        let mut divider = (internal_clock_hz / f64::from(self.frequency)) as u32;
        for slot in dividers.iter_mut() {
            *slot = divider;
            divider *= 2;
        }
        dividers
    }

    /// Configure and start the counter outputs.
    ///
    /// Blocks until the output subsystem reports that it is running. The
    /// counter must be running before the input acquisition is armed.
    pub fn start<B: DiscoveryIo>(&self, io: &mut B) -> Result<()> {
        let dividers = self.dividers(io.internal_clock_hz()?);
        for (&channel, &divider) in self.channels.iter().zip(dividers.iter()) {
            io.configure_output_pulse(channel, divider)?;
        }
        io.start_outputs()?;

        // The output subsystem reports its running state as `Triggered`.
        while DeviceState::decode(io.output_state()?)? != DeviceState::Triggered {}
        Ok(())
    }

    /// Stop the counter, leaving all lines at their idle level.
    pub fn stop<B: DiscoveryIo>(&self, io: &mut B) -> Result<()> {
        io.reset_outputs()
    }
}
