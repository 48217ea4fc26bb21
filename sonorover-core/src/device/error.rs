use thiserror::Error;

use crate::geometry::Point3;

/// An error produced by the external equipment.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum DeviceError {
    /// The destination lies outside the travel range of the positioning system.
    #[error("Destination {0} is out of the travel range")]
    OutOfRange(Point3),
    /// The device is not connected or the connection was lost.
    #[error("Device is disconnected: {0}")]
    Disconnected(String),
    /// The digitizer was read before it had been armed.
    #[error("Digitizer is not armed")]
    NotArmed,
    /// The device cannot honor the request.
    #[error("Unsupported request: {0}")]
    Unsupported(String),
    /// Any other device failure, with the raw device response.
    #[error("{0}")]
    Other(String),
}

impl DeviceError {
    /// Creates a [`DeviceError::Other`] from a raw device response.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
