//! Signal Acquisition Pipeline
//!
//! Everything between the logic analyser hardware and the mechanism
//! emulator: the sample word layout, the counter synthesiser that gives
//! every sample an in-band time index, the batch decoder that
//! reconstructs global timestamps, the Digilent Digital Discovery capture
//! driver and a playback source for recorded captures.

use std::time::Duration;

use crate::Result;

pub mod counter;
pub mod csv_io;
pub mod decoder;
pub mod discovery;
pub mod playback;
pub mod record;

pub use counter::CounterSynth;
pub use csv_io::{export_records, read_records, CsvRecords};
pub use decoder::SampleDecoder;
pub use discovery::{
    max_digital_in_buffer, select_device, DeviceInfo, DeviceState, DigilentDiscovery, DiscoveryIo,
    EdgeCaptureConfig,
};
pub use playback::PlaybackAnalyser;
pub use record::{
    SampleRecord, SignalBits, COUNTER_CHANNELS, COUNTER_OUTPUT_CHANNELS, SIGNAL_CHANNELS,
};

/// Interface of logic analysers able to capture print mech signals.
///
/// Implementations own their decoder state and accumulate every decoded
/// record until [`clear_data`](SignalAnalyser::clear_data), so a capture
/// can be exported after the fact regardless of how it was drained.
pub trait SignalAnalyser {
    /// Start a new capture. Samples collected during this capture are
    /// appended to any existing capture data.
    fn start_capture(&mut self) -> Result<()>;

    /// Stop an ongoing capture. Has no effect if no capture is running.
    fn stop_capture(&mut self) -> Result<()>;

    /// Drive an ongoing capture until the signals have been idle for the
    /// analyser's idle threshold.
    ///
    /// Blocks cooperatively, draining the device while the capture runs.
    /// Fails with [`AnalyserError::CaptureTimeout`](crate::AnalyserError)
    /// once `timeout` of wall-clock time passes without completion.
    fn process_capture(&mut self, timeout: Duration) -> Result<()>;

    /// Drain whatever the device currently has and return promptly.
    ///
    /// Never blocks beyond a single status and read cycle; an empty drain
    /// is not an error.
    fn process_available_data(&mut self) -> Result<()>;

    /// All records decoded since the last clear, in capture order.
    fn records(&self) -> &[SampleRecord];

    /// Discard captured records and decoder state.
    fn clear_data(&mut self);
}
