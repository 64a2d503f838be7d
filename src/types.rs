//! Core types and configuration for the buoy fusion library

use crate::calibration::Calibration;
use crate::registers;

/// Accelerometer full-scale range
///
/// Each range maps to a fixed resolution in g per ADC tick, see
/// [`accel_resolution`](crate::calibration::accel_resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelRange {
    /// ±2 g
    #[default]
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    /// All supported ranges, in register order
    pub const ALL: [AccelRange; 4] = [Self::G2, Self::G4, Self::G8, Self::G16];

    /// Two-bit `AFS_SEL` value
    pub fn bits(self) -> u8 {
        match self {
            Self::G2 => 0,
            Self::G4 => 1,
            Self::G8 => 2,
            Self::G16 => 3,
        }
    }
}

/// Gyroscope full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GyroRange {
    /// ±250 deg/s
    #[default]
    Dps250,
    /// ±500 deg/s
    Dps500,
    /// ±1000 deg/s
    Dps1000,
    /// ±2000 deg/s
    Dps2000,
}

impl GyroRange {
    /// All supported ranges, in register order
    pub const ALL: [GyroRange; 4] = [Self::Dps250, Self::Dps500, Self::Dps1000, Self::Dps2000];

    /// Two-bit `GYRO_FS_SEL` value
    pub fn bits(self) -> u8 {
        match self {
            Self::Dps250 => 0,
            Self::Dps500 => 1,
            Self::Dps1000 => 2,
            Self::Dps2000 => 3,
        }
    }
}

/// Magnetometer output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MagResolution {
    /// 14-bit output (0.6 µT/LSB)
    Bits14,
    /// 16-bit output (0.15 µT/LSB)
    #[default]
    Bits16,
}

impl MagResolution {
    /// Both supported resolutions
    pub const ALL: [MagResolution; 2] = [Self::Bits14, Self::Bits16];

    /// `BIT` field of the AK8963 `CNTL1` register
    pub fn bits(self) -> u8 {
        match self {
            Self::Bits14 => registers::AK8963_BIT_14BIT,
            Self::Bits16 => registers::AK8963_BIT_16BIT,
        }
    }
}

/// Magnetometer continuous measurement rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MagRate {
    /// Continuous mode 1, 8 Hz
    Hz8,
    /// Continuous mode 2, 100 Hz
    #[default]
    Hz100,
}

impl MagRate {
    /// `MODE` field of the AK8963 `CNTL1` register
    pub fn bits(self) -> u8 {
        match self {
            Self::Hz8 => registers::AK8963_MODE_CONT_MEASURE_1,
            Self::Hz100 => registers::AK8963_MODE_CONT_MEASURE_2,
        }
    }

    /// Number of reads making up a ~15 s magnetometer calibration sweep
    pub fn sweep_samples(self) -> u16 {
        match self {
            Self::Hz8 => 128,
            Self::Hz100 => 1500,
        }
    }

    /// Wait between reads during a calibration sweep, slightly longer than the output period
    pub fn sweep_interval_ms(self) -> u32 {
        match self {
            Self::Hz8 => 135,
            Self::Hz100 => 12,
        }
    }
}

/// Sensor configuration for the MPU-9250 and its AK8963 magnetometer
///
/// # Example
/// ```
/// use buoy_fusion::{AccelRange, SensorSettings};
///
/// let settings = SensorSettings {
///     accel_range: AccelRange::G4,
///     ..Default::default()
/// };
/// assert_eq!(settings.self_test_samples, 200);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SensorSettings {
    /// I2C address of the MPU-9250
    pub address: u8,
    /// Accelerometer full-scale range
    pub accel_range: AccelRange,
    /// Gyroscope full-scale range
    pub gyro_range: GyroRange,
    /// Magnetometer resolution
    pub mag_resolution: MagResolution,
    /// Magnetometer output data rate
    pub mag_rate: MagRate,
    /// Samples averaged for each phase of the self-test
    pub self_test_samples: u16,
    /// Biases and scale corrections applied to every sample
    pub calibration: Calibration,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            address: registers::MPU9250_ADDR,
            accel_range: AccelRange::default(),
            gyro_range: GyroRange::default(),
            mag_resolution: MagResolution::default(),
            mag_rate: MagRate::default(),
            self_test_samples: 200,
            calibration: Calibration::default(),
        }
    }
}

/// Attitude filter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterAlgorithm {
    /// Gradient-descent filter (Madgwick)
    #[default]
    Madgwick,
    /// Proportional-integral feedback filter (Mahony)
    Mahony,
}

/// Attitude fusion settings
///
/// # Example
/// ```
/// use buoy_fusion::{FilterAlgorithm, Fusion, FusionSettings};
///
/// let settings = FusionSettings {
///     algorithm: FilterAlgorithm::Mahony,
///     ki: 0.1,
///     ..Default::default()
/// };
/// let fusion = Fusion::with_settings(settings);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FusionSettings {
    /// Which attitude filter drives the quaternion
    pub algorithm: FilterAlgorithm,
    /// Assumed gyroscope measurement error in deg/s
    ///
    /// The gradient-descent gain is derived from it as `beta = sqrt(3/4) * error`.
    pub gyro_measurement_error: f32,
    /// Proportional gain of the feedback filter
    pub kp: f32,
    /// Integral gain of the feedback filter; zero disables integration
    pub ki: f32,
    /// Magnetic declination in degrees added to yaw
    pub magnetic_declination: f32,
    /// Interval in milliseconds between emitted motion samples
    pub output_interval_ms: u32,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            algorithm: FilterAlgorithm::default(),
            gyro_measurement_error: 4.0,
            kp: 10.0,
            ki: 0.0,
            magnetic_declination: 4.62,
            output_interval_ms: 10,
        }
    }
}

/// Low-pass filter order
///
/// Orders outside 1..=4 fall back to third order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterOrder {
    First,
    Second,
    #[default]
    Third,
    Fourth,
}

impl FilterOrder {
    /// Map a numeric order onto a supported one
    pub fn from_order(order: u8) -> Self {
        match order {
            1 => Self::First,
            2 => Self::Second,
            3 => Self::Third,
            4 => Self::Fourth,
            _ => Self::default(),
        }
    }

    pub fn order(self) -> usize {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
        }
    }
}

/// Upper bound on the number of full waves measured per result
pub const MAX_WAVES: usize = 50;

/// Default ring buffer capacity in samples
pub const DEFAULT_CAPACITY: usize = 3000;

/// Wave analysis settings
///
/// # Example
/// ```
/// use buoy_fusion::WaveSettings;
///
/// let settings = WaveSettings {
///     settle_delay_ms: 5_000,
///     wave_count: 3,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WaveSettings {
    /// Low-pass cutoff frequency in Hz
    pub cutoff_frequency: f32,
    /// Nominal sampling period in seconds, used until a measured period is known
    pub sampling_time: f32,
    /// Low-pass filter order
    pub filter_order: FilterOrder,
    /// Half-width of the gradient window in samples (clamped to capacity / 5)
    pub gradient_window: usize,
    /// Consecutive same-sign gradients needed to confirm a direction change
    pub debounce_count: usize,
    /// Settle delay in milliseconds before collection starts
    pub settle_delay_ms: u32,
    /// Number of full waves measured per result
    pub wave_count: usize,
    /// Heights at or above this value are excluded from the significant height
    pub max_height: f32,
    /// Heights at or above this multiple of the average are excluded from the significant height
    pub outlier_factor: f32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            cutoff_frequency: 0.4,
            sampling_time: 0.01,
            filter_order: FilterOrder::default(),
            gradient_window: 50,
            debounce_count: 20,
            settle_delay_ms: 120_000,
            wave_count: 5,
            max_height: 10.0,
            outlier_factor: 1.5,
        }
    }
}

/// Orientation as roll, pitch and yaw in degrees
///
/// Yaw includes the magnetic declination and lies in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_order_from_order() {
        assert_eq!(FilterOrder::from_order(1), FilterOrder::First);
        assert_eq!(FilterOrder::from_order(2), FilterOrder::Second);
        assert_eq!(FilterOrder::from_order(3), FilterOrder::Third);
        assert_eq!(FilterOrder::from_order(4), FilterOrder::Fourth);

        for order in 1..=4u8 {
            assert_eq!(FilterOrder::from_order(order).order(), order as usize);
        }
    }

    #[test]
    fn test_filter_order_out_of_range_falls_back_to_third() {
        for order in [0, 5, 8, 255] {
            assert_eq!(FilterOrder::from_order(order), FilterOrder::Third);
        }
    }
}
