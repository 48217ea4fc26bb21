use sonorover_core::{
    device::{DeviceError, DrivingSystem, Manufacturer},
    program::{Power, PulseProgram},
};

use crate::{digitizer::synthesize, Shared};

fn connect(state: &Shared) -> Result<(), DeviceError> {
    let mut state = state.lock();
    state.check()?;
    state.connected = true;
    Ok(())
}

fn upload(state: &Shared, program: &PulseProgram) -> Result<(), DeviceError> {
    let mut state = state.lock();
    state.check()?;
    if !state.connected {
        return Err(DeviceError::Disconnected("driving system".to_string()));
    }
    state.program = Some(program.clone());
    Ok(())
}

fn execute(state: &Shared) -> Result<(), DeviceError> {
    let mut state = state.lock();
    state.check()?;
    if !state.connected {
        return Err(DeviceError::Disconnected("driving system".to_string()));
    }
    if state.program.is_none() {
        return Err(DeviceError::new("no pulse program uploaded"));
    }
    state.executions += 1;
    if let Some((sample_count, timebase)) = state.armed.take() {
        let capture = synthesize(&mut state, sample_count, timebase);
        state.capture = Some(capture);
    }
    Ok(())
}

fn disconnect(state: &Shared) -> Result<(), DeviceError> {
    state.lock().connected = false;
    Ok(())
}

/// Emulated Sonic Concepts driving system, driven by global power.
#[derive(Debug, Clone)]
pub struct SonicConcepts {
    pub(crate) state: Shared,
}

impl DrivingSystem for SonicConcepts {
    fn connect(&mut self) -> Result<(), DeviceError> {
        connect(&self.state)
    }

    fn send_sequence(&mut self, program: &PulseProgram) -> Result<(), DeviceError> {
        match program.power {
            Power::GlobalPower(_) => upload(&self.state, program),
            p => Err(DeviceError::Unsupported(format!(
                "{:?} on a Sonic Concepts driving system",
                p
            ))),
        }
    }

    fn execute_sequence(&mut self) -> Result<(), DeviceError> {
        execute(&self.state)
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        disconnect(&self.state)
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn manufacturer(&self) -> Manufacturer {
        Manufacturer::SonicConcepts
    }
}

/// Emulated IGT driving system, driven by amplitude, pressure or voltage.
#[derive(Debug, Clone)]
pub struct Igt {
    pub(crate) state: Shared,
}

impl DrivingSystem for Igt {
    fn connect(&mut self) -> Result<(), DeviceError> {
        connect(&self.state)
    }

    fn send_sequence(&mut self, program: &PulseProgram) -> Result<(), DeviceError> {
        match program.power {
            Power::Amplitude(_) | Power::Pressure(_) | Power::Voltage(_) => {
                upload(&self.state, program)
            }
            p => Err(DeviceError::Unsupported(format!(
                "{:?} on an IGT driving system",
                p
            ))),
        }
    }

    fn execute_sequence(&mut self) -> Result<(), DeviceError> {
        execute(&self.state)
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        disconnect(&self.state)
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn manufacturer(&self) -> Manufacturer {
        Manufacturer::Igt
    }
}
