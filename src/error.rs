//! Error type for sensor bring-up

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

/// Errors surfaced to the caller
///
/// Only identification failures are fatal. Other transport faults are
/// logged where they occur and the affected reading is left stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The MPU-9250 did not answer with the expected `WHO_AM_I` value
    #[error("could not connect to MPU9250 (WHO_AM_I = {who_am_i:#04x})")]
    ImuNotFound { who_am_i: u8 },

    /// The AK8963 magnetometer did not answer with the expected `WIA` value
    #[error("could not connect to AK8963 magnetometer (WIA = {who_am_i:#04x})")]
    MagnetometerNotFound { who_am_i: u8 },

    /// The I2C transaction itself failed
    #[error("i2c transport error: {0:?}")]
    Bus(ErrorKind),

    /// The buoy was used before `setup` succeeded
    #[error("sensor has not been set up")]
    NotReady,
}

impl Error {
    /// Map any `embedded-hal` bus error onto [`Error::Bus`]
    pub fn bus<E: embedded_hal::i2c::Error>(err: E) -> Self {
        Error::Bus(err.kind())
    }
}
