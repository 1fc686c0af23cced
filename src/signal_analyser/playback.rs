//! Recorded Capture Playback
//!
//! A [`SignalAnalyser`] over a pre-recorded raw-word stream instead of
//! live hardware. Batches pass through the same decoder as the Digilent
//! driver, so the rest of the pipeline cannot tell the difference. Used
//! by the CLI replay mode and by tests.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use super::decoder::SampleDecoder;
use super::record::SampleRecord;
use super::SignalAnalyser;
use crate::config::AnalyserConfig;
use crate::{AnalyserError, Result};

/// Signal analyser that replays recorded raw sample batches.
#[derive(Debug)]
pub struct PlaybackAnalyser {
    batches: VecDeque<Vec<u16>>,
    decoder: SampleDecoder,
    records: Vec<SampleRecord>,
}

impl PlaybackAnalyser {
    /// Playback source with a counter running at `counter_frequency` Hz.
    pub fn new(counter_frequency: u32) -> Self {
        PlaybackAnalyser {
            batches: VecDeque::new(),
            decoder: SampleDecoder::new(counter_frequency),
            records: Vec::new(),
        }
    }

    /// Playback source configured like a live analyser.
    pub fn with_config(config: &AnalyserConfig) -> Self {
        Self::new(config.counter_frequency)
    }

    /// Queue one batch of 16-bit sample words for replay.
    pub fn push_batch(&mut self, words: &[u16]) {
        self.batches.push_back(words.to_vec());
    }

    /// Queue a batch of raw little-endian sample bytes for replay.
    pub fn push_raw(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() % 2 != 0 {
            return Err(AnalyserError::Decode(format!(
                "raw batch of {} bytes is not a whole number of 16-bit words",
                bytes.len()
            )));
        }
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        self.batches.push_back(words);
        Ok(())
    }

    /// Number of batches still waiting to be replayed.
    pub fn pending_batches(&self) -> usize {
        self.batches.len()
    }
}

impl SignalAnalyser for PlaybackAnalyser {
    fn start_capture(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<()> {
        Ok(())
    }

    fn process_capture(&mut self, timeout: Duration) -> Result<()> {
        let mut emitted = 0;
        while let Some(batch) = self.batches.pop_front() {
            let records = self.decoder.decode_words(&batch);
            emitted += records.len();
            self.records.extend(records);
        }
        if emitted > 0 {
            return Ok(());
        }

        // Nothing left to replay behaves like a silent capture.
        thread::sleep(timeout);
        Err(AnalyserError::CaptureTimeout(format!(
            "no state change within {:?}",
            timeout
        )))
    }

    fn process_available_data(&mut self) -> Result<()> {
        if let Some(batch) = self.batches.pop_front() {
            let records = self.decoder.decode_words(&batch);
            self.records.extend(records);
        }
        Ok(())
    }

    fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    fn clear_data(&mut self) {
        self.batches.clear();
        self.records.clear();
        self.decoder.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(signals: u8, count: u8) -> u16 {
        u16::from(signals) | (u16::from(count) << 8)
    }

    #[test]
    fn test_replay_decodes_all_batches() {
        let mut analyser = PlaybackAnalyser::new(10_000);
        analyser.push_batch(&[word(0x01, 0), word(0x00, 1)]);
        analyser.push_batch(&[word(0x01, 2)]);

        analyser.start_capture().unwrap();
        analyser.process_capture(Duration::from_secs(1)).unwrap();
        assert_eq!(analyser.records().len(), 3);
        assert_eq!(analyser.pending_batches(), 0);
    }

    #[test]
    fn test_empty_stream_times_out() {
        let mut analyser = PlaybackAnalyser::new(10_000);
        let err = analyser
            .process_capture(Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, AnalyserError::CaptureTimeout(_)));
    }

    #[test]
    fn test_push_raw_rejects_odd_length() {
        let mut analyser = PlaybackAnalyser::new(10_000);
        let err = analyser.push_raw(&[0x01, 0x00, 0x02]).unwrap_err();
        assert!(matches!(err, AnalyserError::Decode(_)));
    }

    #[test]
    fn test_process_available_data_consumes_one_batch() {
        let mut analyser = PlaybackAnalyser::new(10_000);
        analyser.push_batch(&[word(0x01, 0)]);
        analyser.push_batch(&[word(0x00, 1)]);

        analyser.process_available_data().unwrap();
        assert_eq!(analyser.records().len(), 1);
        assert_eq!(analyser.pending_batches(), 1);
    }
}
