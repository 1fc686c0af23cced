//! Command-line front end for the print mech analyser.
//!
//! Two modes:
//! - `--render` turns a recorded capture CSV into a printout image;
//! - `--capture` replays a raw analyser dump through the full capture
//!   pipeline and writes the decoded records as CSV.
//!
//! Hardware acquisition backends plug in behind the library's
//! `DiscoveryIo` trait and are not part of this binary.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use print_mech_analyser::signal_analyser::read_records;
use print_mech_analyser::{AnalyserConfig, Ltpd245Analyser, PlaybackAnalyser, PrintMechEmulator};

/// Raw bytes handed to the playback analyser per batch.
const REPLAY_BATCH_BYTES: usize = 1024;

const USAGE: &str = "\
mech-analyser - LTPD245 print mechanism analyser

USAGE:
    mech-analyser --render <capture.csv> --out <printout.png>
    mech-analyser --capture --from <dump.bin> --out <capture.csv> [--png <printout.png>]

OPTIONS:
    --render <capture.csv>    Render a recorded capture CSV to a printout image
    --capture                 Replay a raw analyser dump through the capture pipeline
    --from <dump.bin>         Raw 16-bit little-endian sample dump to replay
    --duration <secs>         Wall-clock capture timeout (default from configuration)
    --out <path>              Output file: PNG for --render, CSV for --capture
    --png <printout.png>      Additionally write the printout image (--capture only)
    --config <config.json>    Load analyser configuration overrides
    -h, --help                Show this help
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Render,
    Capture,
}

#[derive(Debug, Default)]
struct CliArgs {
    mode: Option<Mode>,
    render_input: Option<PathBuf>,
    replay_input: Option<PathBuf>,
    out: Option<PathBuf>,
    png: Option<PathBuf>,
    duration: Option<f64>,
    config: Option<PathBuf>,
    show_help: bool,
}

impl CliArgs {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--render" => {
                    parsed.mode = Some(Mode::Render);
                    let value = args.next().context("--render requires a capture CSV path")?;
                    parsed.render_input = Some(PathBuf::from(value));
                }
                "--capture" => {
                    parsed.mode = Some(Mode::Capture);
                }
                "--from" => {
                    let value = args.next().context("--from requires a dump file path")?;
                    parsed.replay_input = Some(PathBuf::from(value));
                }
                "--duration" => {
                    let value = args.next().context("--duration requires a number of seconds")?;
                    let seconds: f64 = value
                        .parse()
                        .with_context(|| format!("invalid --duration value '{value}'"))?;
                    if !(seconds > 0.0) {
                        bail!("--duration must be positive");
                    }
                    parsed.duration = Some(seconds);
                }
                "--out" => {
                    let value = args.next().context("--out requires an output path")?;
                    parsed.out = Some(PathBuf::from(value));
                }
                "--png" => {
                    let value = args.next().context("--png requires an output path")?;
                    parsed.png = Some(PathBuf::from(value));
                }
                "--config" => {
                    let value = args.next().context("--config requires a JSON file path")?;
                    parsed.config = Some(PathBuf::from(value));
                }
                "--help" | "-h" => {
                    parsed.show_help = true;
                }
                other => bail!("unknown argument '{other}' (see --help)"),
            }
        }
        Ok(parsed)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse(env::args().skip(1))?;
    if args.show_help {
        print!("{USAGE}");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => AnalyserConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => AnalyserConfig::default(),
    };

    match args.mode {
        Some(Mode::Render) => {
            let input = args
                .render_input
                .context("--render requires a capture CSV path")?;
            let out = args.out.context("--render requires --out <printout.png>")?;
            render(&input, &out, &config)
        }
        Some(Mode::Capture) => {
            let out = args.out.context("--capture requires --out <capture.csv>")?;
            let input = args.replay_input.context(
                "no hardware backend is linked into this binary; \
                 provide --from <dump.bin> to replay a recorded dump",
            )?;
            let timeout = args
                .duration
                .map(Duration::from_secs_f64)
                .unwrap_or_else(|| config.capture_timeout());
            capture(&input, &out, args.png.as_deref(), timeout, &config)
        }
        None => {
            print!("{USAGE}");
            bail!("no mode given: use --render or --capture");
        }
    }
}

/// Render a recorded capture CSV into a printout image.
fn render(input: &std::path::Path, out: &std::path::Path, config: &AnalyserConfig) -> Result<()> {
    let mut records =
        read_records(input).with_context(|| format!("failed to read {}", input.display()))?;

    let first = match records.next() {
        Some(record) => record?,
        None => bail!(
            "capture {} contains no samples; there is no printout to render",
            input.display()
        ),
    };

    let mut emulator = PrintMechEmulator::with_burn_gain(&first, config.burn_gain);
    let mut count = 1usize;
    for record in records {
        emulator.update(&record?);
        count += 1;
    }

    let printout = emulator.get_printout();
    printout
        .save(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "Rendered {count} records into a {}x{} printout at {}",
        printout.width(),
        printout.height(),
        out.display()
    );
    Ok(())
}

/// Replay a raw analyser dump through the capture pipeline.
fn capture(
    input: &std::path::Path,
    out: &std::path::Path,
    png: Option<&std::path::Path>,
    timeout: Duration,
    config: &AnalyserConfig,
) -> Result<()> {
    let raw = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;

    let mut playback = PlaybackAnalyser::with_config(config);
    for batch in raw.chunks(REPLAY_BATCH_BYTES) {
        playback
            .push_raw(batch)
            .with_context(|| format!("malformed dump {}", input.display()))?;
    }

    let mut analyser = Ltpd245Analyser::with_config(playback, config.clone());
    analyser.start_capture()?;
    analyser.await_capture_completion(timeout)?;

    analyser
        .export_raw_data(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "Captured {} records into {}",
        analyser.records().len(),
        out.display()
    );

    if let Some(png_path) = png {
        analyser
            .export_printout(png_path)
            .with_context(|| format!("failed to write {}", png_path.display()))?;
        println!("Wrote printout to {}", png_path.display());
    }
    Ok(())
}
