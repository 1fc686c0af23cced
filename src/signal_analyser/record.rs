//! Sample Word Layout and Timestamped Records
//!
//! Each sample captured from the analyser is a 16-bit word: the low six
//! bits carry the observed print mech signal lines, bits 6..7 are unused
//! and the high byte carries the synthesised counter value.

use bitflags::bitflags;

/// Digital input channels carrying the six mech signal lines, in wire order.
pub const SIGNAL_CHANNELS: [u8; 6] = [0, 1, 2, 3, 4, 5];

/// Digital input channels carrying the fed-back counter bits, LSB to MSB.
pub const COUNTER_CHANNELS: [u8; 8] = [8, 9, 10, 11, 12, 13, 14, 15];

/// Digital output channels driving the synthesised counter, LSB to MSB.
pub const COUNTER_OUTPUT_CHANNELS: [u8; 8] = [24, 25, 26, 27, 28, 29, 30, 31];

bitflags! {
    /// Snapshot of the six observed signal lines of a single sample word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SignalBits: u8 {
        /// SPI shift clock (`clk`).
        const CLOCK = 1 << 0;
        /// SPI data line (`dat`).
        const DATA = 1 << 1;
        /// Dot strobe (`dst`); burns the latched dots while high.
        const DST = 1 << 2;
        /// Latch line (`lat`); shift register is latched on the falling edge.
        const LATCH = 1 << 3;
        /// Stepper motor phase line 1 (`mtr1`).
        const MOTOR1 = 1 << 4;
        /// Stepper motor phase line 2 (`mtr2`).
        const MOTOR2 = 1 << 5;
    }
}

impl SignalBits {
    /// Extract the signal lines from a raw 16-bit sample word.
    pub fn from_word(word: u16) -> Self {
        Self::from_bits_truncate((word & 0x3f) as u8)
    }
}

/// Extract the 8-bit counter value from a raw 16-bit sample word.
pub fn counter_of_word(word: u16) -> u8 {
    (word >> 8) as u8
}

/// One decoded state change of the print mech control lines.
///
/// Records are only produced for samples that represent a transition of at
/// least one signal line (or a counter MSB edge, which keeps the
/// reconstructed time base observable). Timestamps are monotonically
/// non-decreasing within a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    /// Reconstructed global timestamp in seconds.
    pub timestamp: f64,
    /// SPI shift clock level.
    pub clock: bool,
    /// SPI data level.
    pub data: bool,
    /// Dot strobe level.
    pub dst: bool,
    /// Latch level.
    pub latch: bool,
    /// Stepper phase line 1 level.
    pub motor1: bool,
    /// Stepper phase line 2 level.
    pub motor2: bool,
}

impl SampleRecord {
    /// Build a record from a reconstructed timestamp and a signal snapshot.
    pub fn new(timestamp: f64, signals: SignalBits) -> Self {
        SampleRecord {
            timestamp,
            clock: signals.contains(SignalBits::CLOCK),
            data: signals.contains(SignalBits::DATA),
            dst: signals.contains(SignalBits::DST),
            latch: signals.contains(SignalBits::LATCH),
            motor1: signals.contains(SignalBits::MOTOR1),
            motor2: signals.contains(SignalBits::MOTOR2),
        }
    }

    /// Signal snapshot of this record.
    pub fn signals(&self) -> SignalBits {
        let mut bits = SignalBits::empty();
        bits.set(SignalBits::CLOCK, self.clock);
        bits.set(SignalBits::DATA, self.data);
        bits.set(SignalBits::DST, self.dst);
        bits.set(SignalBits::LATCH, self.latch);
        bits.set(SignalBits::MOTOR1, self.motor1);
        bits.set(SignalBits::MOTOR2, self.motor2);
        bits
    }
}
