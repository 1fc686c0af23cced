//! Print Mechanism State Machine
//!
//! Applies decoded signal records to the virtual mechanism. The
//! authoritative signal semantics:
//!
//! - clock rising edge: the data bit is shifted into the shift register;
//! - latch falling edge: pending burn is drained, then shift → latch;
//! - dot strobe high: the latched dots accumulate burn time until the
//!   next signal edge;
//! - stepper phase change: two motor steps; after two steps the head
//!   burns between the active and pending rows, after four the active
//!   row is finished and the paper advances.

use super::paper::PaperBuffer;
use super::registers::DotRegister;
use crate::config::DEFAULT_BURN_GAIN;
use crate::printout::Printout;
use crate::signal_analyser::SampleRecord;

/// Steps per stepper phase change.
const STEPS_PER_PHASE_CHANGE: u8 = 2;

/// Steps per full dot line.
const STEPS_PER_LINE: u8 = 4;

fn phase_of(motor1: bool, motor2: bool) -> u8 {
    u8::from(motor1) | u8::from(motor2) << 1
}

/// Cycle-accurate simulation of the print mechanism state.
///
/// Created from the first record of a capture, which is treated as the
/// initial line snapshot and has no burn effect. Every subsequent record
/// is applied through [`update`](Self::update); any well-formed record is
/// legal input.
#[derive(Debug, Clone)]
pub struct PrintMechEmulator {
    shift_register: DotRegister,
    latch_register: DotRegister,
    paper: PaperBuffer,
    burn_time: f64,
    motor_steps: u8,
    burn_gain: f64,
    last_timestamp: f64,
    last_clock: bool,
    last_dst: bool,
    last_latch: bool,
    last_phase: u8,
}

impl PrintMechEmulator {
    /// Emulator initialised from the first captured record.
    pub fn new(initial: &SampleRecord) -> Self {
        Self::with_burn_gain(initial, DEFAULT_BURN_GAIN)
    }

    /// Emulator with an explicit burn-time → darkness gain.
    pub fn with_burn_gain(initial: &SampleRecord, burn_gain: f64) -> Self {
        PrintMechEmulator {
            shift_register: DotRegister::new(),
            latch_register: DotRegister::new(),
            paper: PaperBuffer::new(),
            burn_time: 0.0,
            motor_steps: 0,
            burn_gain,
            last_timestamp: initial.timestamp,
            last_clock: initial.clock,
            last_dst: initial.dst,
            last_latch: initial.latch,
            last_phase: phase_of(initial.motor1, initial.motor2),
        }
    }

    /// Apply the next captured record to the mechanism.
    pub fn update(&mut self, input: &SampleRecord) {
        // DST controls the thermal head: while it was high, the latched
        // dots have been burning since the previous record.
        if self.last_dst {
            self.burn_time += input.timestamp - self.last_timestamp;
        }

        // Shift register contents transfer to the latch register on the
        // latch falling edge. Any accumulated burn belongs to the old
        // latch contents and must be drained first.
        if self.last_latch && !input.latch {
            self.burn_latch_register(false);
            self.latch_register = self.shift_register.clone();
        }

        // Data bits are valid on the clock's rising edge.
        if input.clock && !self.last_clock {
            self.shift_register.shift_in(input.data);
        }

        // Every observed phase change is two motor steps; one dot line
        // is four.
        let phase = phase_of(input.motor1, input.motor2);
        if phase != self.last_phase {
            self.motor_steps += STEPS_PER_PHASE_CHANGE;
            if self.motor_steps == STEPS_PER_PHASE_CHANGE {
                self.burn_latch_register(true);
            } else if self.motor_steps >= STEPS_PER_LINE {
                self.burn_latch_register(false);
                self.paper.advance();
                self.motor_steps = 0;
            }
        }

        self.last_timestamp = input.timestamp;
        self.last_clock = input.clock;
        self.last_dst = input.dst;
        self.last_latch = input.latch;
        self.last_phase = phase;
    }

    /// Burn the latched dots into the paper with the accumulated burn
    /// time, simulating one activation of the thermal head.
    fn burn_latch_register(&mut self, between_lines: bool) {
        self.paper.burn(&self.latch_register, self.burn_time, between_lines);
        self.burn_time = 0.0;
    }

    /// The image burned into the paper so far.
    ///
    /// Drains any residual burn into the active row first, so calling
    /// this twice without further updates returns identical printouts.
    pub fn get_printout(&mut self) -> Printout {
        self.burn_latch_register(false);
        Printout::from_burn_rows(self.paper.rows(), self.burn_gain)
    }

    /// The paper buffer accumulated so far.
    pub fn paper(&self) -> &PaperBuffer {
        &self.paper
    }

    /// Current shift register contents.
    pub fn shift_register(&self) -> &DotRegister {
        &self.shift_register
    }

    /// Current latch register contents.
    pub fn latch_register(&self) -> &DotRegister {
        &self.latch_register
    }

    /// Burn time accumulated since the last head activation.
    pub fn pending_burn(&self) -> f64 {
        self.burn_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_analyser::SignalBits;
    use approx::assert_relative_eq;

    fn record(timestamp: f64, signals: SignalBits) -> SampleRecord {
        SampleRecord::new(timestamp, signals)
    }

    /// Drive one full 384-bit line into the shift register, with `set`
    /// naming the dot columns that should end up high.
    fn shift_line(emulator: &mut PrintMechEmulator, mut t: f64, set: &[usize]) -> f64 {
        for column in 0..crate::mech::DOTS_PER_LINE {
            let mut bits = SignalBits::LATCH;
            if set.contains(&column) {
                bits |= SignalBits::DATA;
            }
            emulator.update(&record(t, bits | SignalBits::CLOCK));
            t += 0.0001;
            emulator.update(&record(t, bits));
            t += 0.0001;
        }
        t
    }

    #[test]
    fn test_clock_rising_edge_shifts_data() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        emulator.update(&record(
            0.0001,
            SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
        ));
        assert!(emulator.shift_register().get(383));

        // Holding clock high shifts nothing further.
        emulator.update(&record(
            0.0002,
            SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
        ));
        assert_eq!(emulator.shift_register().count_set(), 1);
    }

    #[test]
    fn test_latch_fall_copies_shift_register() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        emulator.update(&record(
            0.0001,
            SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
        ));
        assert_eq!(emulator.latch_register().count_set(), 0);

        emulator.update(&record(0.0002, SignalBits::empty()));
        assert!(emulator.latch_register().get(383));

        // The copy is by value: further shifts leave the latch alone.
        emulator.update(&record(0.0003, SignalBits::CLOCK));
        assert_eq!(emulator.latch_register().count_set(), 1);
        assert_eq!(emulator.shift_register().count_set(), 2);
    }

    #[test]
    fn test_dst_accumulates_burn_between_records() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::DST));
        emulator.update(&record(0.0030, SignalBits::DST));
        emulator.update(&record(0.0042, SignalBits::empty()));
        assert_relative_eq!(emulator.pending_burn(), 0.0042, epsilon = 1e-12);

        // DST low: no further accumulation.
        emulator.update(&record(0.0100, SignalBits::empty()));
        assert_relative_eq!(emulator.pending_burn(), 0.0042, epsilon = 1e-12);
    }

    #[test]
    fn test_latch_fall_drains_burn_before_copy() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        let t = shift_line(&mut emulator, 0.0001, &[10]);
        emulator.update(&record(t, SignalBits::empty())); // latch fall
        emulator.update(&record(t + 0.0001, SignalBits::DST));
        emulator.update(&record(t + 0.0021, SignalBits::DST | SignalBits::LATCH));

        // Second latch fall: the 2 ms of burn drains into the paper under
        // the *old* latch contents before the new copy.
        emulator.update(&record(t + 0.0022, SignalBits::empty()));
        assert_relative_eq!(emulator.pending_burn(), 0.0);
        assert_relative_eq!(emulator.paper().active_row()[10], 0.0021, epsilon = 1e-12);
    }

    #[test]
    fn test_latch_register_stable_between_falls() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        emulator.update(&record(
            0.0001,
            SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
        ));
        emulator.update(&record(0.0002, SignalBits::empty())); // latch fall
        let latched = emulator.latch_register().clone();

        // Clocks, strobes and a latch rise leave the latch unchanged.
        emulator.update(&record(0.0003, SignalBits::CLOCK | SignalBits::DATA));
        emulator.update(&record(0.0004, SignalBits::DST));
        emulator.update(&record(0.0005, SignalBits::LATCH));
        assert!(*emulator.latch_register() == latched);
    }

    #[test]
    fn test_row_advance_every_two_phase_changes() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::empty()));
        assert_eq!(emulator.paper().row_count(), 2);

        // Two steps: head moves between rows, no advance yet.
        emulator.update(&record(0.010, SignalBits::MOTOR1));
        assert_eq!(emulator.paper().row_count(), 2);

        // Four steps: one full dot line.
        emulator.update(&record(0.020, SignalBits::MOTOR1 | SignalBits::MOTOR2));
        assert_eq!(emulator.paper().row_count(), 3);

        emulator.update(&record(0.030, SignalBits::MOTOR2));
        assert_eq!(emulator.paper().row_count(), 3);
        emulator.update(&record(0.040, SignalBits::empty()));
        assert_eq!(emulator.paper().row_count(), 4);
    }

    #[test]
    fn test_phase_codes_distinguish_single_lines() {
        // 01 → 10 is one observed change even though both lines moved.
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::MOTOR1));
        emulator.update(&record(0.010, SignalBits::MOTOR2));
        emulator.update(&record(0.020, SignalBits::MOTOR1));
        assert_eq!(emulator.paper().row_count(), 3);
    }

    #[test]
    fn test_between_lines_burn_after_two_steps() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        let t = shift_line(&mut emulator, 0.0001, &[0]);
        emulator.update(&record(t, SignalBits::empty())); // latch fall
        emulator.update(&record(t + 0.0001, SignalBits::DST));
        emulator.update(&record(t + 0.0011, SignalBits::empty())); // 1 ms burn

        // First phase change: head is between rows, both burn.
        emulator.update(&record(t + 0.0012, SignalBits::MOTOR1));
        assert_relative_eq!(emulator.paper().active_row()[0], 0.001, epsilon = 1e-12);
        assert_relative_eq!(emulator.paper().pending_row()[0], 0.001, epsilon = 1e-12);
        assert_relative_eq!(emulator.pending_burn(), 0.0);
    }

    #[test]
    fn test_burn_is_conserved() {
        // Total burn on column 383 plus the pending accumulator must
        // equal the integrated DST-high time.
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        emulator.update(&record(
            0.0001,
            SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
        ));
        emulator.update(&record(0.0002, SignalBits::empty())); // latch the dot

        let mut dst_integral = 0.0;
        emulator.update(&record(0.0003, SignalBits::DST));
        emulator.update(&record(0.0013, SignalBits::empty()));
        dst_integral += 0.0010;
        emulator.update(&record(0.0014, SignalBits::MOTOR1)); // between lines
        emulator.update(&record(0.0015, SignalBits::MOTOR1 | SignalBits::DST));
        emulator.update(&record(0.0035, SignalBits::MOTOR1)); // +2 ms
        dst_integral += 0.0020;

        let burned: f64 = emulator
            .paper()
            .rows()
            .iter()
            .map(|row| row[383])
            .sum::<f64>()
            - emulator.paper().pending_row()[383]; // between-lines copy
        assert_relative_eq!(
            burned + emulator.pending_burn(),
            dst_integral,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_printout_is_idempotent() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
        emulator.update(&record(
            0.0001,
            SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
        ));
        emulator.update(&record(0.0002, SignalBits::empty()));
        emulator.update(&record(0.0003, SignalBits::DST));
        emulator.update(&record(0.0043, SignalBits::empty()));

        let first = emulator.get_printout();
        let second = emulator.get_printout();
        assert!(first == second);
    }

    #[test]
    fn test_updates_continue_after_printout() {
        let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::empty()));
        let _ = emulator.get_printout();

        emulator.update(&record(0.010, SignalBits::MOTOR1));
        emulator.update(&record(0.020, SignalBits::MOTOR1 | SignalBits::MOTOR2));
        emulator.update(&record(0.030, SignalBits::MOTOR2));
        emulator.update(&record(0.040, SignalBits::empty()));
        assert_eq!(emulator.get_printout().height(), 3);
    }
}
