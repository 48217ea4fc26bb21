mod freq;

use std::time::Duration;

pub use freq::*;

pub use std::f32::consts::PI;

/// millimeter, the length unit of every coordinate in this workspace
pub const MILLIMETER: f32 = 1.0;

/// microsecond, the time unit of pulse timings and processing windows
pub const MICROSECOND: f32 = 1.0;

/// \[㎜\]
#[allow(non_upper_case_globals)]
pub const mm: f32 = MILLIMETER;

/// \[㎲\]
#[allow(non_upper_case_globals)]
pub const us: f32 = MICROSECOND;

/// Speed of sound in water used for time-of-flight corrections in \[㎜/㎲\].
pub const DEFAULT_SOUND_SPEED: f32 = 1.5 * mm / us;

/// Number of arm/trigger/wait cycles performed at one grid point before giving up.
pub const MAX_ACQUISITION_ATTEMPTS: usize = 6;

/// Delay between arming the digitizer and triggering the driving system.
pub const ARM_SETTLE_DELAY: Duration = Duration::from_millis(25);

/// Delay between two consecutive grid points.
pub const POINT_SETTLE_DELAY: Duration = Duration::from_millis(25);

/// Largest counter suffix tried when an output file name is taken.
pub const MAX_FILE_SUFFIX: usize = 99;
