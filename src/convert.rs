//! Conversion of raw sensor counts into calibrated physical units

use nalgebra::Vector3;

use crate::calibration::{
    Calibration, accel_resolution, calibrate_inertial, calibrate_magnetic, gyro_resolution,
    mag_resolution,
};
use crate::types::SensorSettings;

/// One set of raw ADC counts as read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub accel: Vector3<i16>,
    pub gyro: Vector3<i16>,
    pub mag: Vector3<i16>,
}

/// Calibrated reading in g, deg/s and milligauss
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibratedSample {
    pub accel: Vector3<f32>,
    pub gyro: Vector3<f32>,
    pub mag: Vector3<f32>,
}

/// Applies range resolution and calibration to raw counts
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use buoy_fusion::{Calibration, RawSample, SampleConverter, SensorSettings};
///
/// let converter = SampleConverter::new(&SensorSettings {
///     calibration: Calibration::identity(),
///     ..Default::default()
/// });
/// let sample = converter.convert(&RawSample {
///     accel: Vector3::new(0, 0, 16384),
///     ..Default::default()
/// });
/// assert!((sample.accel.z - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SampleConverter {
    accel_resolution: f32,
    gyro_resolution: f32,
    mag_resolution: f32,
    calibration: Calibration,
}

impl SampleConverter {
    pub fn new(settings: &SensorSettings) -> Self {
        Self {
            accel_resolution: accel_resolution(settings.accel_range),
            gyro_resolution: gyro_resolution(settings.gyro_range),
            mag_resolution: mag_resolution(settings.mag_resolution),
            calibration: settings.calibration,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn calibration_mut(&mut self) -> &mut Calibration {
        &mut self.calibration
    }

    /// Acceleration in g
    pub fn accel(&self, raw: Vector3<i16>) -> Vector3<f32> {
        calibrate_inertial(raw, self.accel_resolution, self.calibration.accel_bias)
    }

    /// Angular rate in deg/s
    pub fn gyro(&self, raw: Vector3<i16>) -> Vector3<f32> {
        calibrate_inertial(raw, self.gyro_resolution, self.calibration.gyro_bias)
    }

    /// Magnetic field in milligauss
    pub fn mag(&self, raw: Vector3<i16>) -> Vector3<f32> {
        calibrate_magnetic(raw, self.mag_resolution, &self.calibration)
    }

    pub fn convert(&self, raw: &RawSample) -> CalibratedSample {
        CalibratedSample {
            accel: self.accel(raw.accel),
            gyro: self.gyro(raw.gyro),
            mag: self.mag(raw.mag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccelRange, GyroRange, MagResolution};

    #[test]
    fn test_default_calibration_applied() {
        let converter = SampleConverter::new(&SensorSettings::default());
        let sample = converter.convert(&RawSample::default());

        let calibration = Calibration::default();
        assert!((sample.accel + calibration.accel_bias).magnitude() < 1e-6);
        assert!((sample.gyro + calibration.gyro_bias).magnitude() < 1e-6);
        let expected_mag = -calibration.mag_bias.component_mul(&calibration.mag_scale);
        assert!((sample.mag - expected_mag).magnitude() < 1e-3);
    }

    #[test]
    fn test_ranges_change_scale() {
        let converter = SampleConverter::new(&SensorSettings {
            accel_range: AccelRange::G8,
            gyro_range: GyroRange::Dps2000,
            mag_resolution: MagResolution::Bits14,
            calibration: Calibration::identity(),
            ..Default::default()
        });

        let accel = converter.accel(Vector3::new(4096, 0, 0));
        assert!((accel.x - 1.0).abs() < 1e-6);

        let gyro = converter.gyro(Vector3::new(0, -16384, 0));
        assert!((gyro.y + 1000.0).abs() < 1e-3);

        let mag = converter.mag(Vector3::new(0, 0, 8190));
        assert!((mag.z - 49120.0).abs() < 1e-1);
    }

    #[test]
    fn test_set_calibration() {
        let mut converter = SampleConverter::new(&SensorSettings::default());
        converter.set_calibration(Calibration::identity());
        assert_eq!(converter.calibration(), &Calibration::identity());
        converter.calibration_mut().gyro_bias = Vector3::new(1.0, 0.0, 0.0);
        assert!((converter.gyro(Vector3::zeros()).x + 1.0).abs() < 1e-6);
    }
}
