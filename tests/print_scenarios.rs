//! End-to-end print scenarios driven straight through the emulator.

use print_mech_analyser::signal_analyser::SignalBits;
use print_mech_analyser::{PrintMechEmulator, SampleRecord, DOTS_PER_LINE};

fn record(timestamp: f64, signals: SignalBits) -> SampleRecord {
    SampleRecord::new(timestamp, signals)
}

/// Clock a full 384-bit line into the shift register; `set` names the
/// dot columns that end up high. Returns the next free timestamp.
fn shift_line(emulator: &mut PrintMechEmulator, mut t: f64, set: &[usize]) -> f64 {
    for column in 0..DOTS_PER_LINE {
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

fn assert_white_except(printout: &print_mech_analyser::Printout, except: &[(usize, usize)]) {
    for row in 0..printout.height() {
        for column in 0..printout.width() {
            if !except.contains(&(row, column)) {
                assert_eq!(
                    printout.pixel(row, column),
                    255,
                    "expected white at ({row}, {column})"
                );
            }
        }
    }
}

#[test]
fn single_dot_burn() {
    // Shift a single 1 into position 383, latch it, strobe for 4 ms.
    let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
    emulator.update(&record(
        0.0001,
        SignalBits::CLOCK | SignalBits::DATA | SignalBits::LATCH,
    ));
    emulator.update(&record(0.0002, SignalBits::DATA | SignalBits::LATCH));
    emulator.update(&record(0.0003, SignalBits::DATA));
    emulator.update(&record(0.0004, SignalBits::DATA | SignalBits::DST));
    emulator.update(&record(0.0044, SignalBits::DATA));

    let printout = emulator.get_printout();
    assert_eq!(printout.height(), 2);
    assert_eq!(printout.pixel(0, 383), 155);
    assert_white_except(&printout, &[(0, 383)]);
}

#[test]
fn row_advance_without_burn() {
    // The analyser records edges only, so the first captured record is
    // the first phase change; three more changes follow.
    let mut emulator = PrintMechEmulator::new(&record(0.010, SignalBits::MOTOR1));
    emulator.update(&record(0.020, SignalBits::MOTOR1 | SignalBits::MOTOR2));
    emulator.update(&record(0.030, SignalBits::MOTOR2));
    emulator.update(&record(0.040, SignalBits::empty()));

    let printout = emulator.get_printout();
    assert_eq!(printout.height(), 3);
    assert_white_except(&printout, &[]);
}

#[test]
fn between_rows_burn() {
    let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
    let t = shift_line(&mut emulator, 0.0001, &[0]);
    emulator.update(&record(t, SignalBits::empty())); // latch fall
    emulator.update(&record(t + 0.0001, SignalBits::DST));
    emulator.update(&record(t + 0.0011, SignalBits::empty())); // 1 ms of burn
    emulator.update(&record(t + 0.0012, SignalBits::MOTOR1)); // 2 steps: between rows

    let printout = emulator.get_printout();
    assert_eq!(printout.height(), 2);
    assert_eq!(printout.pixel(0, 0), 230);
    assert_eq!(printout.pixel(1, 0), 230);
    assert_white_except(&printout, &[(0, 0), (1, 0)]);
}

#[test]
fn printout_is_idempotent() {
    let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
    let t = shift_line(&mut emulator, 0.0001, &[5, 100, 383]);
    emulator.update(&record(t, SignalBits::empty()));
    emulator.update(&record(t + 0.0001, SignalBits::DST));
    emulator.update(&record(t + 0.0031, SignalBits::empty()));

    let first = emulator.get_printout();
    let second = emulator.get_printout();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn capture_without_strobe_stays_white() {
    // Latches and paper feed but DST never asserted: the paper grows yet
    // stays blank.
    let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
    let t = shift_line(&mut emulator, 0.0001, &[42]);
    emulator.update(&record(t, SignalBits::empty()));
    emulator.update(&record(t + 0.010, SignalBits::MOTOR1));
    emulator.update(&record(t + 0.020, SignalBits::MOTOR1 | SignalBits::MOTOR2));

    let printout = emulator.get_printout();
    assert_eq!(printout.height(), 3);
    assert_white_except(&printout, &[]);
}

#[test]
fn one_latch_fall_and_no_stepper() {
    // A single latch fall with strobe but no paper movement burns only
    // the active row.
    let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::LATCH));
    let t = shift_line(&mut emulator, 0.0001, &[7]);
    emulator.update(&record(t, SignalBits::empty()));
    emulator.update(&record(t + 0.0001, SignalBits::DST));
    emulator.update(&record(t + 0.0021, SignalBits::empty()));

    let printout = emulator.get_printout();
    assert_eq!(printout.height(), 2);
    assert_eq!(printout.pixel(0, 7), 205);
    assert_white_except(&printout, &[(0, 7)]);
}

#[test]
fn paper_only_ever_grows() {
    let mut emulator = PrintMechEmulator::new(&record(0.0, SignalBits::empty()));
    let mut heights = Vec::new();
    let phases = [
        SignalBits::MOTOR1,
        SignalBits::MOTOR1 | SignalBits::MOTOR2,
        SignalBits::MOTOR2,
        SignalBits::empty(),
    ];
    for step in 0..12 {
        let signals = phases[step % phases.len()];
        emulator.update(&record(0.010 * (step + 1) as f64, signals));
        heights.push(emulator.paper().row_count());
    }
    assert!(heights.windows(2).all(|pair| pair[1] >= pair[0]));
    assert_eq!(*heights.last().unwrap(), 2 + 6);
}
