#![no_std]

//! [![github]](https://github.com/buoy-fusion/buoy-fusion)&ensp;[![license]](https://opensource.org/licenses/MIT)
//!
//! [github]: https://img.shields.io/badge/github-8da0cb?style=for-the-badge&labelColor=555555&logo=github
//! [license]: https://img.shields.io/badge/License-MIT-blue.svg?style=for-the-badge&labelColor=555555
//!
//! Buoy Fusion - attitude estimation and wave statistics for a floating buoy
//!
//! The crate turns raw MPU-9250 readings into a stabilized orientation and,
//! from the vertical component of the rotated acceleration, into wave
//! measurements: average wave height, significant wave height and average
//! period.
//!
//! # Features
//!
//! - Calibration: resolution scaling, factory self-test, stationary bias, magnetometer hard- and soft-iron
//! - Madgwick gradient-descent and Mahony feedback attitude filters
//! - Butterworth low-pass (order 1 to 4) over a fixed-size motion buffer
//! - Crest/trough detection and half-wave integration to heights and periods
//! - MPU-9250 / AK8963 driver over `embedded-hal` 1.0
//! - `#![no_std]` compatible, no allocation
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use buoy_fusion::{Fusion, FusionSettings, FilterAlgorithm};
//!
//! let mut fusion = Fusion::with_settings(FusionSettings {
//!     algorithm: FilterAlgorithm::Mahony,
//!     ..Default::default()
//! });
//!
//! // Calibrated sensor readings
//! let accelerometer = Vector3::new(0.0, 0.0, 1.0); // g
//! let gyroscope = Vector3::new(0.1, 0.2, 0.3); // deg/s
//! let magnetometer = Vector3::new(200.0, 0.0, -400.0); // mG
//!
//! fusion.update(accelerometer, gyroscope, magnetometer, 0.01); // 10ms
//!
//! // Orientation and the acceleration in the reference frame
//! let angles = fusion.euler_angles();
//! let vertical = fusion.earth_acceleration().z;
//! # let _ = (angles, vertical);
//! ```
//!
//! On hardware, [`WaveBuoy`] wires the driver, the fusion filter and the
//! [`WaveAnalyser`] together behind a single `update` call.

// `sqrt`, `atan2` and the other float methods come from nalgebra's libm-backed
// `ComplexField` / `RealField` where `core` has no float math. Toolchains that
// provide them inherently leave those trait imports unused, hence the
// `#[allow(unused_imports)]` on each one.

mod buoy;
pub mod calibration;
mod clock;
mod convert;
mod error;
mod fusion;
mod imu;
mod lowpass;
mod madgwick;
mod mahony;
mod math;
mod motion;
pub mod mpu9250;
pub mod registers;
mod store;
mod types;
mod wave;

// Re-export all public types and functions
pub use buoy::{BuoySettings, WaveBuoy};
pub use calibration::{Calibration, MagSweep, SelfTestReport, StationaryBias};
pub use calibration::{calibrate_inertial, calibrate_magnetic};
pub use clock::{Clock, ManualClock};
pub use convert::{CalibratedSample, RawSample, SampleConverter};
pub use error::Error;
pub use fusion::{AttitudeFilter, Fusion};
pub use imu::{MotionSample, MotionSensor};
pub use lowpass::LowPassFilter;
pub use madgwick::Madgwick;
pub use mahony::Mahony;
pub use math::{DEG_TO_RAD, GRAVITY, QuaternionExt, RAD_TO_DEG, Vector3Ext};
pub use motion::MotionBuffer;
pub use mpu9250::Mpu9250;
pub use store::{LOG_FILE_NAME, LogStore, NullStore};
pub use types::*;
pub use wave::{
    MAX_SETTLE_DELAY_MS, WaveAnalyser, WaveMeasurement, WaveOutcome, WavePhase, WaveStatistics,
    sort_descending, wave_statistics,
};
