//! LTPD245 Print Mechanism Analyser
//!
//! Reconstructs the paper output of a thermal line printer by passively
//! observing the electrical signals that drive its print mechanism. A
//! logic analyser captures the mech control lines while the printer under
//! test prints; this crate decodes the captured edges, replays them
//! through a cycle-accurate digital twin of the LTPD245 thermal head and
//! stepper paper feed, and produces the grayscale image that would have
//! come out of the printer.
//!
//! # Components
//! - Edge-synchronous capture driver for Digilent Digital Discovery class
//!   devices, with a synthesised ripple counter giving every sample an
//!   in-band time index (`signal_analyser`)
//! - Global timestamp reconstruction and redundant-sample filtering
//!   (`signal_analyser::decoder`)
//! - Cycle-accurate print mechanism emulation: 384-dot shift/latch
//!   registers, strobe burn integration, stepper row cadence (`mech`)
//! - Grayscale rasterisation and PNG export (`printout`)
//! - Capture orchestration for test libraries (`ltpd245`)
//! - Raw capture CSV export and replay (`signal_analyser::csv_io`)
//!
//! # Quick start
//! ## Render a recorded capture
//! ```no_run
//! use print_mech_analyser::signal_analyser::read_records;
//! use print_mech_analyser::PrintMechEmulator;
//!
//! # fn main() -> print_mech_analyser::Result<()> {
//! let mut records = read_records("capture.csv")?;
//! let first = records.next().expect("empty capture")?;
//! let mut emulator = PrintMechEmulator::new(&first);
//! for record in records {
//!     emulator.update(&record?);
//! }
//! emulator.get_printout().save("printout.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Capture a print
//! ```no_run
//! use std::time::Duration;
//! use print_mech_analyser::{Ltpd245Analyser, SignalAnalyser};
//!
//! # fn main() -> print_mech_analyser::Result<()> {
//! # fn open_analyser() -> impl SignalAnalyser { print_mech_analyser::PlaybackAnalyser::new(10_000) }
//! let mut analyser = Ltpd245Analyser::new(open_analyser());
//! analyser.start_capture()?;
//! // ... stimulate the printer ...
//! analyser.await_capture_completion(Duration::from_secs(10))?;
//! analyser.export_printout("printout.png")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Domain modules
pub mod config; // Analyser configuration
pub mod ltpd245; // Capture orchestration
pub mod mech; // Print mechanism emulation (core)
pub mod printout; // Rasterisation & image export
pub mod signal_analyser; // Signal acquisition pipeline

/// Error types for print mech analyser operations
#[derive(thiserror::Error, Debug)]
pub enum AnalyserError {
    /// No compatible signal analyser device is available.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// I/O or configuration failure in the acquisition device.
    #[error("Device error: {0}")]
    Device(String),

    /// No (more) state change within the allotted time.
    #[error("Capture timeout: {0}")]
    CaptureTimeout(String),

    /// A capture task's print failed to complete within its timeout.
    #[error("print task {index} capture timed out after {timeout:?}")]
    MechCaptureTimeout {
        /// Index of the task whose capture timed out.
        index: usize,
        /// Timeout the task was given.
        timeout: std::time::Duration,
    },

    /// Malformed raw sample data or capture file.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for AnalyserError {
    /// Converts a String into `AnalyserError::Other`.
    fn from(msg: String) -> Self {
        AnalyserError::Other(msg)
    }
}

impl From<&str> for AnalyserError {
    /// Converts a string slice into `AnalyserError::Other`.
    fn from(msg: &str) -> Self {
        AnalyserError::Other(msg.to_string())
    }
}

/// Result type for analyser operations
pub type Result<T> = std::result::Result<T, AnalyserError>;

// Public API exports
pub use config::AnalyserConfig;
pub use ltpd245::{CaptureTask, Ltpd245Analyser};
pub use mech::{PrintMechEmulator, DOTS_PER_LINE};
pub use printout::Printout;
pub use signal_analyser::{
    DigilentDiscovery, PlaybackAnalyser, SampleDecoder, SampleRecord, SignalAnalyser, SignalBits,
};
