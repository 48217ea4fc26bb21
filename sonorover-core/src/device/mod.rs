mod digitizer;
mod driving;
mod error;
mod motion;

pub use digitizer::*;
pub use driving::*;
pub use error::DeviceError;
pub use motion::*;
