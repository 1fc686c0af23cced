//! LTPD245 Capture Orchestration
//!
//! Binds a signal analyser to the mechanism emulator and exposes the
//! small sequential API used by printer test libraries: arm the capture,
//! run a stimulus, await completion, take the printout. The orchestrator
//! owns both halves exclusively; everything runs cooperatively on the
//! caller's thread.

use std::path::Path;
use std::time::Duration;

use crate::config::{AnalyserConfig, DEFAULT_CAPTURE_TIMEOUT};
use crate::mech::PrintMechEmulator;
use crate::printout::Printout;
use crate::signal_analyser::{csv_io, SampleRecord, SignalAnalyser};
use crate::{AnalyserError, Result};

/// One stimulus to run against the printer while its output is captured.
pub struct CaptureTask<'a> {
    stimulus: Box<dyn FnMut() -> Result<()> + 'a>,
    timeout: Duration,
}

impl<'a> CaptureTask<'a> {
    /// Task running `stimulus` with the default capture timeout.
    pub fn new(stimulus: impl FnMut() -> Result<()> + 'a) -> Self {
        CaptureTask {
            stimulus: Box::new(stimulus),
            timeout: Duration::from_secs_f64(DEFAULT_CAPTURE_TIMEOUT),
        }
    }

    /// Override the time the task's capture is allowed to take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Analyser for the Seiko LTPD245 print mechanism.
///
/// Consumes the records captured by a [`SignalAnalyser`] and maintains a
/// [`PrintMechEmulator`] mirroring the paper that would have come out of
/// the printer. Captures accumulate until [`clear`](Self::clear); each
/// record is fed to the emulator exactly once.
pub struct Ltpd245Analyser<A: SignalAnalyser> {
    analyser: A,
    emulator: Option<PrintMechEmulator>,
    consumed: usize,
    config: AnalyserConfig,
}

impl<A: SignalAnalyser> Ltpd245Analyser<A> {
    /// Orchestrator over `analyser` with the default configuration.
    pub fn new(analyser: A) -> Self {
        Self::with_config(analyser, AnalyserConfig::default())
    }

    /// Orchestrator over `analyser` with an explicit configuration.
    pub fn with_config(analyser: A, config: AnalyserConfig) -> Self {
        Ltpd245Analyser {
            analyser,
            emulator: None,
            consumed: 0,
            config,
        }
    }

    /// Arm the acquisition. A captured print is appended to any print
    /// already captured.
    pub fn start_capture(&mut self) -> Result<()> {
        self.analyser.start_capture()
    }

    /// Best-effort disarm of a capture in progress.
    pub fn stop_capture(&mut self) -> Result<()> {
        self.analyser.stop_capture()
    }

    /// Block until the capture has been idle long enough to be complete,
    /// then fold the captured records into the emulator.
    ///
    /// Fails with `CaptureTimeout` if the print does not complete within
    /// `timeout` of wall-clock time.
    pub fn await_capture_completion(&mut self, timeout: Duration) -> Result<()> {
        self.analyser.process_capture(timeout)?;
        self.ingest_new_records();
        Ok(())
    }

    /// Fold any data the device currently has into the emulator and
    /// return promptly. An empty drain is not an error.
    pub fn process_available_data(&mut self) -> Result<()> {
        self.analyser.process_available_data()?;
        self.ingest_new_records();
        Ok(())
    }

    /// Run a series of stimulus tasks, capturing their cumulative output.
    ///
    /// Stops at the first task whose capture times out, reporting its
    /// index; the contribution of earlier tasks to the emulator is
    /// retained.
    pub fn capture_tasks(&mut self, tasks: &mut [CaptureTask<'_>]) -> Result<()> {
        for (index, task) in tasks.iter_mut().enumerate() {
            self.start_capture()?;
            (task.stimulus)()?;
            match self.await_capture_completion(task.timeout) {
                Ok(()) => {}
                Err(AnalyserError::CaptureTimeout(_)) => {
                    return Err(AnalyserError::MechCaptureTimeout {
                        index,
                        timeout: task.timeout,
                    });
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// The printout captured so far, or `None` if no samples have been
    /// consumed yet.
    pub fn get_printout(&mut self) -> Option<Printout> {
        self.emulator.as_mut().map(PrintMechEmulator::get_printout)
    }

    /// Write the captured printout to `path` as a grayscale PNG.
    pub fn export_printout<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        match self.get_printout() {
            Some(printout) => printout.save(path),
            None => Err(AnalyserError::Other(
                "no printout has been captured".into(),
            )),
        }
    }

    /// Write the captured sample records to `path` as CSV.
    pub fn export_raw_data<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        csv_io::export_records(path, self.analyser.records())
    }

    /// All records captured since the last clear.
    pub fn records(&self) -> &[SampleRecord] {
        self.analyser.records()
    }

    /// Discard the capture, the emulator state and all buffered samples.
    pub fn clear(&mut self) {
        self.analyser.clear_data();
        self.emulator = None;
        self.consumed = 0;
    }

    fn ingest_new_records(&mut self) {
        let records = self.analyser.records();
        for record in &records[self.consumed..] {
            match self.emulator.as_mut() {
                Some(emulator) => emulator.update(record),
                // The first record of a capture is the initial snapshot.
                None => {
                    self.emulator = Some(PrintMechEmulator::with_burn_gain(
                        record,
                        self.config.burn_gain,
                    ));
                }
            }
        }
        self.consumed = records.len();
    }
}
