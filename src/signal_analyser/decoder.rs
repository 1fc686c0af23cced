//! Raw Sample Batch Decoder
//!
//! Converts raw 16-bit words read from the analyser into [`SampleRecord`]s.
//! The 8-bit counter embedded in each word wraps every 25.6 ms at the
//! default 10 kHz counter frequency, so the decoder reconstructs a
//! monotonic global tick count across batches and converts it into
//! timestamps. Batches in which no signal line changed state are filtered
//! out.

use nom::multi::many0;
use nom::number::complete::le_u16;
use nom::IResult;

use super::record::{counter_of_word, SampleRecord, SignalBits};
use crate::{AnalyserError, Result};

/// Tick span covered by one period of the embedded 8-bit counter.
const COUNTER_WRAP: u64 = 256;

fn sample_words(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    many0(le_u16)(input)
}

/// Stateful decoder turning raw sample batches into timestamped records.
///
/// State persists across batches within a capture: the wrap detection
/// needs the final counter value of the previous batch, and the
/// redundancy filter needs the last signal state that was actually
/// emitted.
#[derive(Debug, Clone)]
pub struct SampleDecoder {
    frequency: f64,
    global_counter: u64,
    last_count: Option<u8>,
    last_emitted: Option<SignalBits>,
}

impl SampleDecoder {
    /// Create a decoder for a capture whose counter runs at
    /// `counter_frequency` Hz.
    pub fn new(counter_frequency: u32) -> Self {
        SampleDecoder {
            frequency: f64::from(counter_frequency),
            global_counter: 0,
            last_count: None,
            last_emitted: None,
        }
    }

    /// Decode a raw byte batch as read from the device.
    ///
    /// Samples are 16-bit little-endian words; a trailing odd byte means
    /// the batch was truncated mid-sample.
    pub fn decode_bytes(&mut self, raw: &[u8]) -> Result<Vec<SampleRecord>> {
        let (rest, words) = sample_words(raw)
            .map_err(|e| AnalyserError::Decode(format!("unparsable sample batch: {e:?}")))?;
        if !rest.is_empty() {
            return Err(AnalyserError::Decode(format!(
                "sample batch of {} bytes is not a whole number of 16-bit words",
                raw.len()
            )));
        }
        Ok(self.decode_words(&words))
    }

    /// Decode a batch of 16-bit sample words.
    ///
    /// Always advances the reconstructed time base, even when the batch is
    /// dropped by the redundancy filter; returns the emitted records.
    pub fn decode_words(&mut self, words: &[u16]) -> Vec<SampleRecord> {
        if words.is_empty() {
            return Vec::new();
        }

        let signals: Vec<SignalBits> = words.iter().map(|&w| SignalBits::from_word(w)).collect();
        let counts: Vec<u8> = words.iter().map(|&w| counter_of_word(w)).collect();

        // The counter MSB is in the trigger set, so at most one wrap can
        // hide between consecutive samples.
        if let Some(last) = self.last_count {
            if counts[0] < last {
                self.global_counter += COUNTER_WRAP;
            }
        }

        let mut timestamps = Vec::with_capacity(counts.len());
        for (i, &count) in counts.iter().enumerate() {
            if i > 0 && count < counts[i - 1] {
                self.global_counter += COUNTER_WRAP;
            }
            timestamps.push((self.global_counter + u64::from(count)) as f64 / self.frequency);
        }
        self.last_count = counts.last().copied();

        // Drop the batch outright if nothing observable happened: every
        // sample carries the same signal state and that state matches the
        // last record emitted.
        let unchanged = signals.windows(2).all(|pair| pair[0] == pair[1]);
        if unchanged && self.last_emitted == Some(signals[0]) {
            return Vec::new();
        }
        self.last_emitted = signals.last().copied();

        timestamps
            .into_iter()
            .zip(signals)
            .map(|(timestamp, bits)| SampleRecord::new(timestamp, bits))
            .collect()
    }

    /// Current reconstructed capture time in seconds.
    ///
    /// Advances with every decoded batch, including batches the
    /// redundancy filter dropped; used to measure how long the signals
    /// have been idle.
    pub fn elapsed(&self) -> f64 {
        (self.global_counter + u64::from(self.last_count.unwrap_or(0))) as f64 / self.frequency
    }

    /// Discard all reconstruction state.
    pub fn reset(&mut self) {
        self.global_counter = 0;
        self.last_count = None;
        self.last_emitted = None;
    }
}
