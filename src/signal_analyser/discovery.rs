//! Digilent Digital Discovery Capture Driver
//!
//! Implements [`SignalAnalyser`] on top of a Digilent Digital Discovery
//! class device. The device is used in edge-synchronous mode: a sample is
//! recorded only when one of the six mech signals or the counter MSB
//! changes state, with the synthesised counter piggy-backed onto the high
//! byte of every sample word.
//!
//! The vendor SDK itself is an external collaborator; its surface is the
//! [`DiscoveryIo`] trait, which hardware shims implement and tests mock.

use std::thread;
use std::time::{Duration, Instant};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use super::counter::CounterSynth;
use super::decoder::SampleDecoder;
use super::record::{SampleRecord, COUNTER_CHANNELS, SIGNAL_CHANNELS};
use super::SignalAnalyser;
use crate::config::AnalyserConfig;
use crate::{AnalyserError, Result};

/// Delay after arming before sample timing becomes reliable.
// TODO: find out why this is needed; waiting for the device to report the
// triggered state does not remove the inaccuracy.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Acquisition subsystem states, decoded from the SDK's raw state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum DeviceState {
    /// Idle and ready to be configured.
    Ready = 0,
    /// Armed, waiting for the first trigger edge.
    Armed = 1,
    /// Acquisition finished.
    Done = 2,
    /// Triggered and recording. The output subsystem reports its running
    /// state with the same code.
    Triggered = 3,
    /// Being configured.
    Config = 4,
    /// Prefilling the sample buffer.
    Prefill = 5,
    /// Waiting for a start condition.
    Wait = 7,
}

impl DeviceState {
    /// Decode a raw SDK state code.
    pub fn decode(raw: u8) -> Result<Self> {
        Self::from_u8(raw)
            .ok_or_else(|| AnalyserError::Device(format!("unknown device state code {raw}")))
    }
}

/// Identity and capabilities of a candidate acquisition device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device product name.
    pub name: String,
    /// Device serial number.
    pub serial: String,
    /// Largest digital-in sample buffer the device configuration offers.
    pub digital_in_buffer_size: usize,
}

/// Default device ranking: prefer the configuration with the largest
/// digital-in buffer, so the capture tolerates long drain gaps.
pub fn max_digital_in_buffer(info: &DeviceInfo) -> i64 {
    info.digital_in_buffer_size as i64
}

/// Pick the best device among `candidates` according to `score`.
///
/// Fails with `DeviceNotFound` when no candidate is available.
pub fn select_device<'a>(
    candidates: &'a [DeviceInfo],
    score: impl Fn(&DeviceInfo) -> i64,
) -> Result<&'a DeviceInfo> {
    candidates
        .iter()
        .max_by_key(|info| score(info))
        .ok_or_else(|| {
            AnalyserError::DeviceNotFound("no compatible signal analyser is connected".into())
        })
}

/// Edge-synchronous acquisition setup for one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCaptureConfig {
    /// Bits recorded per sample: 6 signal + 8 counter + 2 unused.
    pub sample_bits: u8,
    /// Input clock divider; -1 selects edge-synchronous sampling.
    pub divider: i32,
    /// Channels whose rising and falling edges each record a sample.
    pub edge_mask: u32,
    /// Device sample buffer size.
    pub buffer_size: usize,
    /// Trigger position, in samples from the buffer start.
    pub trigger_position: usize,
}

impl EdgeCaptureConfig {
    /// Standard mech capture configuration for a device buffer size.
    pub fn new(buffer_size: usize) -> Self {
        EdgeCaptureConfig {
            sample_bits: 16,
            divider: -1,
            edge_mask: trigger_mask(),
            buffer_size,
            trigger_position: buffer_size,
        }
    }
}

/// Edge trigger set: the six signal lines plus the counter MSB, so a
/// counter wrap between signal edges is still observed in the stream.
pub fn trigger_mask() -> u32 {
    let mut mask = 0u32;
    for &channel in SIGNAL_CHANNELS.iter() {
        mask |= 1 << channel;
    }
    mask | 1 << COUNTER_CHANNELS[7]
}

/// Low-level device operations used by the capture driver.
///
/// This is the boundary to the vendor SDK. State queries return the SDK's
/// raw codes (see [`DeviceState`]); all other semantics are documented
/// per method. Mock implementations drive the unit tests.
pub trait DiscoveryIo {
    /// Internal clock of the output subsystem in Hz.
    fn internal_clock_hz(&mut self) -> Result<f64>;

    /// Largest digital-in sample buffer the open device supports.
    fn max_input_buffer(&mut self) -> Result<usize>;

    /// Configure one output channel as a free-running pulse with low idle
    /// level and the given clock divider.
    fn configure_output_pulse(&mut self, channel: u8, divider: u32) -> Result<()>;

    /// Start all configured output channels, repeating indefinitely.
    fn start_outputs(&mut self) -> Result<()>;

    /// Raw state code of the output subsystem.
    fn output_state(&mut self) -> Result<u8>;

    /// Reset the output subsystem, returning all lines to idle.
    fn reset_outputs(&mut self) -> Result<()>;

    /// Apply an edge capture configuration to the input subsystem.
    fn configure_capture(&mut self, config: &EdgeCaptureConfig) -> Result<()>;

    /// Arm the configured acquisition.
    fn arm_capture(&mut self) -> Result<()>;

    /// Raw state code of the input subsystem, refreshing its data.
    fn capture_state(&mut self) -> Result<u8>;

    /// Read and consume the raw sample bytes recorded since the last
    /// read; empty when nothing new has arrived.
    fn read_raw_samples(&mut self) -> Result<Vec<u8>>;

    /// Reset the input subsystem.
    fn reset_inputs(&mut self) -> Result<()>;

    /// Release the device handle.
    fn close(&mut self) -> Result<()>;
}

/// Signal analyser on a Digilent Digital Discovery class device.
pub struct DigilentDiscovery<B: DiscoveryIo> {
    io: B,
    counter: CounterSynth,
    decoder: SampleDecoder,
    records: Vec<SampleRecord>,
    idle_threshold: f64,
    settle_delay: Duration,
}

impl<B: DiscoveryIo> DigilentDiscovery<B> {
    /// Driver over an open device with the default configuration.
    pub fn new(io: B) -> Self {
        Self::with_config(io, &AnalyserConfig::default())
    }

    /// Driver over an open device with an explicit configuration.
    pub fn with_config(io: B, config: &AnalyserConfig) -> Self {
        DigilentDiscovery {
            io,
            counter: CounterSynth::new(config.counter_frequency),
            decoder: SampleDecoder::new(config.counter_frequency),
            records: Vec::new(),
            idle_threshold: config.idle_threshold,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Override the post-arm settle delay. Simulated backends need none.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    fn state(&mut self) -> Result<DeviceState> {
        DeviceState::decode(self.io.capture_state()?)
    }

    /// Read one batch, decode it and store the emitted records. Returns
    /// how many records the batch emitted.
    fn drain(&mut self) -> Result<usize> {
        let raw = self.io.read_raw_samples()?;
        if raw.is_empty() {
            return Ok(0);
        }
        let emitted = self.decoder.decode_bytes(&raw)?;
        let count = emitted.len();
        self.records.extend(emitted);
        Ok(count)
    }

    fn reset_device(&mut self) -> Result<()> {
        self.io.reset_outputs()?;
        self.io.reset_inputs()
    }
}

impl<B: DiscoveryIo> SignalAnalyser for DigilentDiscovery<B> {
    fn start_capture(&mut self) -> Result<()> {
        // The counter must be running before the inputs are armed, or the
        // first samples carry a stale time index.
        self.counter.start(&mut self.io)?;

        let buffer_size = self.io.max_input_buffer()?;
        self.io.configure_capture(&EdgeCaptureConfig::new(buffer_size))?;
        self.io.arm_capture()?;

        // Sample timing is inaccurate without a settle delay after arming.
        thread::sleep(self.settle_delay);
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<()> {
        let state = self.state()?;
        if state != DeviceState::Ready && state != DeviceState::Done {
            self.reset_device()?;
        }
        Ok(())
    }

    fn process_capture(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut last_emitted_at: Option<f64> = None;

        while Instant::now() < deadline {
            if self.state()? != DeviceState::Triggered {
                continue;
            }

            if self.drain()? > 0 {
                last_emitted_at = self.records.last().map(|record| record.timestamp);
            } else if let Some(at) = last_emitted_at {
                // No new state change, but the counter keeps the
                // reconstructed clock running. Idle long enough means the
                // print has completed.
                if self.decoder.elapsed() - at >= self.idle_threshold {
                    self.reset_device()?;
                    return Ok(());
                }
            }
        }

        self.reset_device()?;
        Err(AnalyserError::CaptureTimeout(format!(
            "no state change within {:?}",
            timeout
        )))
    }

    fn process_available_data(&mut self) -> Result<()> {
        match self.state()? {
            DeviceState::Triggered => {
                self.drain()?;
                Ok(())
            }
            // Not yet producing data, or already torn down.
            _ => Ok(()),
        }
    }

    fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    fn clear_data(&mut self) {
        self.records.clear();
        self.decoder.reset();
    }
}

impl<B: DiscoveryIo> Drop for DigilentDiscovery<B> {
    /// Release the device on every exit path so that subsequent processes
    /// can acquire it.
    fn drop(&mut self) {
        let _ = self.io.reset_outputs();
        let _ = self.io.reset_inputs();
        let _ = self.io.close();
    }
}
