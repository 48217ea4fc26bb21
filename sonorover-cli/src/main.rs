use std::{
    fs::File,
    io::{BufRead, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sonorover::prelude::*;
use sonorover_emulator::{EmulatedDigitizer, EmulatedMotion, Emulator, EmulatorOption};

#[derive(Parser, Debug)]
#[command(name = "sonorover", version, about = "Acoustic field characterization rig")]
struct Cli {
    /// Increase verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every sequence of a protocol
    Run {
        /// Protocol file
        protocol: PathBuf,
        /// Run without asking for confirmation before each sequence
        #[arg(short, long)]
        yes: bool,
    },
    /// Move through the grid of a sequence without acquiring
    ScanOnly {
        #[command(flatten)]
        target: SequenceArgs,
        /// Dwell time at each point [ms]
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Execute the pulse sequence repeatedly without moving or acquiring
    PulseOnly {
        #[command(flatten)]
        target: SequenceArgs,
        /// Number of executions
        #[arg(short, long, default_value_t = 10)]
        repetitions: usize,
        /// Delay between two executions [ms]
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Rebuild the field volume from a raw waveform log
    Reprocess {
        /// Raw waveform log
        raw: PathBuf,
        /// Start of the processing window [us]
        #[arg(long)]
        begin_us: Option<f32>,
        /// End of the processing window [us]
        #[arg(long, requires = "begin_us")]
        end_us: Option<f32>,
        /// Time of flight correction per column (-1, 0 or 1)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true, requires = "begin_us")]
        adjust: i8,
        /// Output file, `<raw>.reprocessed.acd` by default
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SequenceArgs {
    /// Protocol file
    protocol: PathBuf,
    /// Sequence number
    #[arg(short, long)]
    sequence: usize,
}

#[derive(Deserialize, Debug)]
struct EmulatorSection {
    #[serde(default)]
    emulator: EmulatorOption,
}

type EmulatedRig = Rig<EmulatedMotion, EmulatedDigitizer, Box<dyn DrivingSystem>>;

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let file = log_file
        .map(|path| {
            File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))
        })
        .transpose()?
        .map(|f| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(f))
        });
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file)
        .try_init()?;
    Ok(())
}

/// Opens the emulated rig described by the `[emulator]` table of the protocol file.
fn open_rig(protocol: &Protocol) -> Result<EmulatedRig> {
    let mut option = match &protocol.path {
        Some(path) => toml::from_str::<EmulatorSection>(&std::fs::read_to_string(path)?)?.emulator,
        None => EmulatorOption::default(),
    };
    if option.travel_range.is_none() {
        option.travel_range = protocol.rig.travel_range.map(|r| [r.min, r.max]);
    }
    tracing::debug!("Emulator: {:?}", option);

    let emulator = Emulator::new(option);
    Ok(Rig::open(
        emulator.motion(),
        emulator.digitizer(),
        emulator.driving(protocol.rig.manufacturer),
    )?)
}

fn acquisition_option(rig: &RigConfig) -> AcquisitionOption<SpinSleeper> {
    AcquisitionOption {
        timeout_policy: rig.timeout_policy,
        ..Default::default()
    }
}

fn confirm(sequence: &Sequence) -> bool {
    eprint!("Run {}? [y/N] ", sequence);
    if std::io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            tracing::warn!("Failed to read the answer: {}", e);
            false
        }
    }
}

fn load_sequence(args: &SequenceArgs) -> Result<(Protocol, Sequence)> {
    let protocol = Protocol::load(&args.protocol)?;
    let sequence = protocol
        .sequence(args.sequence)
        .cloned()
        .with_context(|| format!("No sequence {} in {}", args.sequence, args.protocol.display()))?;
    Ok((protocol, sequence))
}

fn run(command: Command, confirm: impl FnMut(&Sequence) -> bool) -> Result<()> {
    match command {
        Command::Run { protocol, yes } => {
            let mut protocol = Protocol::load(&protocol)?;
            protocol.rig.perform_all |= yes;
            let mut rig = open_rig(&protocol)?;
            let reports =
                rig.run_protocol(&protocol, acquisition_option(&protocol.rig), confirm)?;
            reports.iter().for_each(|report| match &report.outcome {
                SequenceOutcome::Scan(scan) => tracing::info!(
                    "Sequence {}: {} points, {} degraded, written to {}",
                    report.number,
                    scan.points.len(),
                    scan.degraded_points().len(),
                    report.files.raw().display()
                ),
                SequenceOutcome::Alignment(alignment) => tracing::info!(
                    "Sequence {}: axis through ({:.3}, {:.3}, {:.3})",
                    report.number,
                    alignment.axis.origin.x,
                    alignment.axis.origin.y,
                    alignment.axis.origin.z
                ),
            });
            rig.close()?;
        }
        Command::ScanOnly { target, delay_ms } => {
            let (protocol, sequence) = load_sequence(&target)?;
            let grid = sequence
                .grid()
                .build(protocol.rig.coord_zero)?
                .context("Alignment sequences have no grid")?;
            let mut rig = open_rig(&protocol)?;
            let capture = rig.configure_digitizer(
                sequence.program().operating_frequency,
                protocol.rig.sampling_multiplier,
                protocol.rig.acquisition_time_us,
            )?;
            let elapsed = rig
                .scanner(capture, acquisition_option(&protocol.rig))
                .scan_only(&grid, Duration::from_millis(delay_ms))?;
            tracing::info!("{} points visited in {:?}", grid.len(), elapsed);
            rig.close()?;
        }
        Command::PulseOnly {
            target,
            repetitions,
            delay_ms,
        } => {
            let (protocol, sequence) = load_sequence(&target)?;
            let mut rig = open_rig(&protocol)?;
            rig.send_program(sequence.program())?;
            let capture = rig.configure_digitizer(
                sequence.program().operating_frequency,
                protocol.rig.sampling_multiplier,
                protocol.rig.acquisition_time_us,
            )?;
            rig.scanner(capture, acquisition_option(&protocol.rig))
                .pulse_only(repetitions, Duration::from_millis(delay_ms))?;
            rig.close()?;
        }
        Command::Reprocess {
            raw,
            begin_us,
            end_us,
            adjust,
            output,
        } => {
            let window = begin_us.map(|begin_us| ProcessingWindow {
                begin_us,
                end_us,
                adjust,
            });
            let volume = reprocess(&raw, window)?;
            let output = output.unwrap_or_else(|| raw.with_extension("reprocessed.acd"));
            std::fs::write(&output, volume.to_bytes())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!("Field volume {} written to {}", volume.shape(), output.display());
        }
    }
    Ok(())
}

/// Process exit status: 2 when a sequence was declined, 1 on any other error.
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) if matches!(e.downcast_ref::<ScanError>(), Some(ScanError::CancelledByUser)) => 2,
        Err(_) => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{:?}", e);
        return ExitCode::FAILURE;
    }

    let result = run(cli.command, confirm);
    match (&result, exit_status(&result)) {
        (Err(e), 2) => tracing::warn!("{}", e),
        (Err(e), _) => tracing::error!("{:?}", e),
        (Ok(()), _) => {}
    }
    ExitCode::from(exit_status(&result))
}
