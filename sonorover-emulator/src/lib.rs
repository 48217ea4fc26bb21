#![warn(missing_docs)]

//! A software rig for the SonoRover pipeline.
//!
//! [`Emulator`] holds the state shared by an emulated positioning system, digitizer and driving
//! system. The digitizer synthesizes the waveform a hydrophone would record at the current
//! position in a [`VirtualBeam`]. Faults can be injected at any time.

mod beam;
mod digitizer;
mod driving;
mod motion;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use sonorover_core::{
    device::{DeviceError, DrivingSystem, Manufacturer, Timebase},
    geometry::Point3,
    medium::Medium,
    program::PulseProgram,
};

pub use beam::VirtualBeam;
pub use digitizer::EmulatedDigitizer;
pub use driving::{Igt, SonicConcepts};
pub use motion::EmulatedMotion;

/// The option of [`Emulator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorOption {
    /// The acoustic beam.
    pub beam: VirtualBeam,
    /// Propagation medium.
    pub medium: Medium,
    /// Peak amplitude of the uniform noise added to every sample \[V\].
    pub noise: f32,
    /// Seed of the noise.
    pub seed: u64,
    /// Lower and upper travel limits of the positioning system \[㎜\].
    pub travel_range: Option<[Point3; 2]>,
}

impl Default for EmulatorOption {
    fn default() -> Self {
        Self {
            beam: VirtualBeam::default(),
            medium: Medium::default(),
            noise: 0.,
            seed: 0,
            travel_range: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct RigState {
    pub(crate) option: EmulatorOption,
    pub(crate) rng: StdRng,
    pub(crate) position: Point3,
    pub(crate) moves: usize,
    pub(crate) connected: bool,
    pub(crate) broken: bool,
    pub(crate) program: Option<PulseProgram>,
    pub(crate) executions: usize,
    pub(crate) armed: Option<(usize, Timebase)>,
    pub(crate) capture: Option<Vec<f32>>,
    pub(crate) pending_timeouts: usize,
}

impl RigState {
    pub(crate) fn check(&self) -> Result<(), DeviceError> {
        if self.broken {
            return Err(DeviceError::Disconnected("emulator".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Shared(Arc<Mutex<RigState>>);

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, RigState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared state of an emulated rig.
///
/// Cloning yields another handle to the same rig.
#[derive(Debug, Clone)]
pub struct Emulator {
    state: Shared,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(EmulatorOption::default())
    }
}

impl Emulator {
    /// Creates a new rig at the origin.
    #[must_use]
    pub fn new(option: EmulatorOption) -> Self {
        Self {
            state: Shared(Arc::new(Mutex::new(RigState {
                option,
                rng: StdRng::seed_from_u64(option.seed),
                position: Point3::origin(),
                moves: 0,
                connected: false,
                broken: false,
                program: None,
                executions: 0,
                armed: None,
                capture: None,
                pending_timeouts: 0,
            }))),
        }
    }

    /// The emulated positioning system.
    #[must_use]
    pub fn motion(&self) -> EmulatedMotion {
        EmulatedMotion {
            state: self.state.clone(),
        }
    }

    /// The emulated digitizer.
    #[must_use]
    pub fn digitizer(&self) -> EmulatedDigitizer {
        EmulatedDigitizer {
            state: self.state.clone(),
        }
    }

    /// The emulated driving system of `manufacturer`.
    #[must_use]
    pub fn driving(&self, manufacturer: Manufacturer) -> Box<dyn DrivingSystem> {
        match manufacturer {
            Manufacturer::SonicConcepts => Box::new(SonicConcepts {
                state: self.state.clone(),
            }),
            Manufacturer::Igt => Box::new(Igt {
                state: self.state.clone(),
            }),
        }
    }

    /// Makes the next `n` waits of the digitizer time out.
    pub fn inject_timeouts(&self, n: usize) {
        self.state.lock().pending_timeouts = n;
    }

    /// Makes every device report a lost connection.
    pub fn break_down(&self) {
        self.state.lock().broken = true;
    }

    /// Undoes [`Emulator::break_down`].
    pub fn repair(&self) {
        self.state.lock().broken = false;
    }

    /// Sets the travel limits of the positioning system.
    pub fn set_travel_range(&self, range: Option<[Point3; 2]>) {
        self.state.lock().option.travel_range = range;
    }

    /// Current position of the positioning system.
    #[must_use]
    pub fn position(&self) -> Point3 {
        self.state.lock().position
    }

    /// Number of completed moves.
    #[must_use]
    pub fn moves(&self) -> usize {
        self.state.lock().moves
    }

    /// Number of executed pulse sequences.
    #[must_use]
    pub fn executions(&self) -> usize {
        self.state.lock().executions
    }

    /// The uploaded pulse program.
    #[must_use]
    pub fn program(&self) -> Option<PulseProgram> {
        self.state.lock().program.clone()
    }

    /// Checks if the driving system is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use sonorover_core::{
        defined::{kHz, MHz},
        device::{Digitizer, MotionSystem},
        program::{Power, PulseTiming, Ramp},
    };

    use super::*;

    pub fn program(power: Power) -> PulseProgram {
        PulseProgram {
            operating_frequency: 250. * kHz,
            timing: PulseTiming {
                pulse_duration: 20_000.,
                repetition_interval: 200_000.,
                train_duration: 2_000_000.,
            },
            ramp: Ramp::default(),
            power,
            focus: 40.,
        }
    }

    #[test]
    fn acquisition_cycle() -> anyhow::Result<()> {
        let emulator = Emulator::default();
        let mut motion = emulator.motion();
        let mut digitizer = emulator.digitizer();
        let mut driving = emulator.driving(Manufacturer::Igt);

        driving.connect()?;
        driving.send_sequence(&program(Power::Voltage(10.)))?;
        let timebase = digitizer.configure(12.5 * MHz)?;
        motion.move_to(Point3::new(0., 0., 3.))?;

        digitizer.arm(100, timebase)?;
        assert!(!digitizer.wait_for_completion()?);
        driving.execute_sequence()?;
        assert!(digitizer.wait_for_completion()?);
        let samples = digitizer.read_calibrated_waveform()?;

        assert_eq!(100, samples.len());
        // half a wavelength from the origin
        approx::assert_abs_diff_eq!(-1., samples[0], epsilon = 1e-5);
        approx::assert_abs_diff_eq!(1., samples[25], epsilon = 1e-5);
        assert_eq!(1, emulator.executions());
        assert_eq!(1, emulator.moves());
        assert_eq!(Point3::new(0., 0., 3.), emulator.position());
        Ok(())
    }

    #[test]
    fn injected_timeouts() -> anyhow::Result<()> {
        let emulator = Emulator::default();
        let mut digitizer = emulator.digitizer();
        let mut driving = emulator.driving(Manufacturer::SonicConcepts);
        driving.connect()?;
        driving.send_sequence(&program(Power::GlobalPower(0.1)))?;
        let timebase = digitizer.configure(12.5 * MHz)?;

        emulator.inject_timeouts(2);
        (0..3).try_for_each(|i| {
            digitizer.arm(10, timebase)?;
            driving.execute_sequence()?;
            assert_eq!(i == 2, digitizer.wait_for_completion()?);
            anyhow::Ok(())
        })?;
        assert_eq!(10, digitizer.read_calibrated_waveform()?.len());
        Ok(())
    }

    #[test]
    fn break_down() -> anyhow::Result<()> {
        let emulator = Emulator::default();
        let mut motion = emulator.motion();
        let mut driving = emulator.driving(Manufacturer::Igt);
        driving.connect()?;
        driving.send_sequence(&program(Power::Amplitude(20.)))?;

        emulator.break_down();
        assert!(matches!(
            motion.move_to(Point3::origin()),
            Err(DeviceError::Disconnected(_))
        ));
        assert!(matches!(
            driving.execute_sequence(),
            Err(DeviceError::Disconnected(_))
        ));

        emulator.repair();
        motion.move_to(Point3::origin())?;
        driving.execute_sequence()?;
        Ok(())
    }

    #[test]
    fn option_from_toml() -> anyhow::Result<()> {
        let option: EmulatorOption = toml::from_str(
            r#"
            noise = 0.01
            travel_range = [[0.0, 0.0, 0.0], [300.0, 300.0, 100.0]]

            [beam]
            origin = [5.0, 0.0, 0.0]
            direction = [0.0, 0.0, 1.0]
            width = 3.0
            amplitude = 0.5
            "#,
        )?;
        approx::assert_abs_diff_eq!(0.01, option.noise);
        assert_eq!(Point3::new(5., 0., 0.), option.beam.origin);
        assert_eq!(
            Some([Point3::origin(), Point3::new(300., 300., 100.)]),
            option.travel_range
        );
        assert_eq!(Medium::default(), option.medium);
        Ok(())
    }
}
