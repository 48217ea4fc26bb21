use std::{path::Path, time::Duration};

use approx::assert_abs_diff_eq;

use sonorover::prelude::*;
use sonorover_emulator::{EmulatedDigitizer, EmulatedMotion, Emulator, EmulatorOption, VirtualBeam};

const PROTOCOL: &str = r#"
[rig]
coord_zero = [0.0, 0.0, 0.0]
acquisition_time_us = 80.0
manufacturer = "igt"
output_dir = "."
perform_all = true

[[sequence]]
number = 1
tag = "line"
grid = { kind = "regular", origin = [0.0, 0.0, 0.0], vect_slice = [0.0, 0.0, 1.0], vect_row = [0.0, 1.0, 0.0], vect_col = [1.0, 0.0, 0.0], shape = { slices = 1, rows = 1, cols = 3 } }

[sequence.program]
operating_frequency = 250000.0
power = { unit = "voltage", value = 10.0 }
focus = 40.0
timing = { pulse_duration = 20000.0, repetition_interval = 200000.0, train_duration = 2000000.0 }
ramp = { shape = "rectangular", duration = 0.0 }

[[sequence]]
number = 2
tag = "alignment"
grid = { kind = "alignment" }
alignment = { distance_from_focus = 10.0, line_length = 10.0, step = 0.5, threshold = 0.01, reduction_factor = 0.5, max_reduction_iterations = 3, emit_axis_table = true, axis_length = 10.0, axis_step = 1.0 }

[sequence.program]
operating_frequency = 250000.0
power = { unit = "amplitude", value = 30.0 }
focus = 40.0
timing = { pulse_duration = 20000.0, repetition_interval = 200000.0, train_duration = 2000000.0 }
ramp = { shape = "rectangular", duration = 0.0 }
"#;

type EmulatedRig = Rig<EmulatedMotion, EmulatedDigitizer, Box<dyn DrivingSystem>>;

fn protocol(dir: &Path, perform_all: bool) -> anyhow::Result<Protocol> {
    let mut protocol = Protocol::parse(PROTOCOL)?;
    protocol.rig.output_dir = dir.to_path_buf();
    protocol.rig.perform_all = perform_all;
    Ok(protocol)
}

fn option(timeout_policy: TimeoutPolicy) -> AcquisitionOption<StdSleeper> {
    AcquisitionOption {
        arm_settle: Duration::ZERO,
        point_settle: Duration::ZERO,
        timeout_policy,
        ..Default::default()
    }
}

fn open(emulator: &Emulator) -> anyhow::Result<EmulatedRig> {
    Ok(Rig::open(
        emulator.motion(),
        emulator.digitizer(),
        emulator.driving(Manufacturer::Igt),
    )?)
}

fn scan_report(report: &SequenceReport) -> anyhow::Result<&ScanReport> {
    match &report.outcome {
        SequenceOutcome::Scan(r) => Ok(r),
        SequenceOutcome::Alignment(_) => anyhow::bail!("sequence {} is not a scan", report.number),
    }
}

#[test]
fn line_scan() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let protocol = protocol(dir.path(), true)?;
    let emulator = Emulator::default();
    let mut rig = open(&emulator)?;

    let report = rig.run_sequence(&protocol, &protocol.sequences[0], option(TimeoutPolicy::Lenient))?;
    assert_eq!(1, report.number);
    assert_eq!(
        dir.path().join("sequence_1_output_data.raw"),
        report.files.raw()
    );
    assert_eq!(3, emulator.moves());
    assert_eq!(3, emulator.executions());
    assert_eq!(Point3::new(2., 0., 0.), emulator.position());

    let scan = scan_report(&report)?;
    assert!(scan.volume.is_complete());
    assert_eq!(6, scan.volume.to_vec().len());
    let amplitude = scan.volume.amplitude();
    let phase = scan.volume.phase();
    [1., (-1f32 / 8.).exp(), (-0.5f32).exp()]
        .into_iter()
        .enumerate()
        .for_each(|(col, expect)| {
            assert_abs_diff_eq!(expect, amplitude[[0, 0, col]], epsilon = 1e-3);
            assert_abs_diff_eq!(0., phase[[0, 0, col]], epsilon = 1e-3);
        });
    assert!(scan.degraded_points().is_empty());

    assert_eq!(
        3 * 1000 * 4,
        std::fs::metadata(report.files.raw())?.len()
    );
    assert_eq!(
        4,
        std::fs::read_to_string(report.files.coordinates())?
            .lines()
            .count()
    );
    assert_eq!(6 * 4, std::fs::metadata(report.files.volume())?.len());
    let parameters = RunParameters::load(&report.files.parameters())?;
    assert_eq!(1000, parameters.digitizer.sample_count);
    assert_eq!(12, parameters.digitizer.timebase);
    assert_eq!(Manufacturer::Igt, parameters.equipment.manufacturer);

    let reprocessed = reprocess(report.files.raw(), None)?;
    assert_eq!(scan.volume.shape(), reprocessed.shape());
    scan.volume
        .to_vec()
        .into_iter()
        .zip(reprocessed.to_vec())
        .for_each(|(a, b)| assert_abs_diff_eq!(a, b, epsilon = 1e-5));

    let again = rig.run_sequence(&protocol, &protocol.sequences[0], option(TimeoutPolicy::Lenient))?;
    assert_eq!(
        dir.path().join("sequence_1_output_data_00.raw"),
        again.files.raw()
    );
    Ok(())
}

#[test]
fn alignment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let protocol = protocol(dir.path(), true)?;
    let emulator = Emulator::new(EmulatorOption {
        beam: VirtualBeam {
            origin: Point3::new(5., 0., 0.),
            ..Default::default()
        },
        ..Default::default()
    });
    let mut rig = open(&emulator)?;

    let report = rig.run_sequence(&protocol, &protocol.sequences[1], option(TimeoutPolicy::Lenient))?;
    let SequenceOutcome::Alignment(alignment) = &report.outcome else {
        anyhow::bail!("sequence 2 is not an alignment");
    };
    assert_eq!(2, alignment.planes.len());
    alignment.planes.iter().for_each(|p| {
        assert_abs_diff_eq!(5., p.center.x, epsilon = 0.5);
        assert_abs_diff_eq!(0., p.center.y, epsilon = 0.5);
    });
    assert_abs_diff_eq!(30., alignment.planes[0].center.z);
    assert_abs_diff_eq!(50., alignment.planes[1].center.z);
    assert_abs_diff_eq!(5., alignment.axis.origin.x, epsilon = 0.5);
    assert!(alignment.axis.direction.z > 0.99);

    let table = std::fs::read_to_string(report.files.axis_table())?;
    assert_eq!(12, table.lines().count());
    Ok(())
}

#[test]
fn protocol_declined() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let protocol = protocol(dir.path(), false)?;
    let emulator = Emulator::default();
    let mut rig = open(&emulator)?;

    let mut asked = Vec::new();
    let r = rig.run_protocol(&protocol, option(TimeoutPolicy::Lenient), |sequence| {
        asked.push(sequence.number());
        sequence.number() == 1
    });
    assert!(matches!(r, Err(ScanError::CancelledByUser)));
    assert_eq!(vec![1, 2], asked);
    assert_eq!(3, emulator.executions());
    assert!(dir.path().join("sequence_1_output_data.raw").exists());
    assert!(!dir.path().join("sequence_2_output_data.raw").exists());
    Ok(())
}

#[test]
fn protocol_perform_all() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let protocol = protocol(dir.path(), true)?;
    let emulator = Emulator::new(EmulatorOption {
        beam: VirtualBeam {
            origin: Point3::new(1., -1., 0.),
            ..Default::default()
        },
        ..Default::default()
    });
    let mut rig = open(&emulator)?;

    let reports = rig.run_protocol(&protocol, option(TimeoutPolicy::Lenient), |_| false)?;
    assert_eq!(vec![1, 2], reports.iter().map(|r| r.number).collect::<Vec<_>>());
    assert!(matches!(reports[0].outcome, SequenceOutcome::Scan(_)));
    assert!(matches!(reports[1].outcome, SequenceOutcome::Alignment(_)));

    rig.close()?;
    assert!(!emulator.is_connected());
    Ok(())
}

#[test]
fn timeouts_are_bounded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let protocol = protocol(dir.path(), true)?;
    let emulator = Emulator::default();
    let mut rig = open(&emulator)?;

    emulator.inject_timeouts(6);
    let report = rig.run_sequence(&protocol, &protocol.sequences[0], option(TimeoutPolicy::Lenient))?;
    let scan = scan_report(&report)?;
    assert_eq!(vec![1], scan.degraded_points());
    assert_eq!(
        vec![6, 1, 1],
        scan.points.iter().map(|p| p.attempts).collect::<Vec<_>>()
    );
    assert_eq!(8, emulator.executions());
    let parameters = RunParameters::load(&report.files.parameters())?;
    assert_eq!(vec![1], parameters.acquisition.degraded_points);

    emulator.inject_timeouts(6);
    let r = rig.run_sequence(&protocol, &protocol.sequences[0], option(TimeoutPolicy::Strict));
    assert!(matches!(
        r,
        Err(ScanError::AcquisitionTimedOut(index, 6)) if index == GridIndex::new(0, 0, 0)
    ));
    Ok(())
}

#[test]
fn lost_connection_aborts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let protocol = protocol(dir.path(), true)?;
    let emulator = Emulator::default();
    let mut rig = open(&emulator)?;

    emulator.break_down();
    assert!(matches!(
        rig.run_sequence(&protocol, &protocol.sequences[0], option(TimeoutPolicy::Lenient)),
        Err(ScanError::Device(DeviceError::Disconnected(_)))
    ));
    emulator.repair();
    Ok(())
}
