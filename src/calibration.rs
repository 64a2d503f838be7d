//! Sensor calibration for the MPU-9250 and AK8963
//!
//! Everything here is plain arithmetic on raw counts. The driver in
//! [`crate::mpu9250`] collects the counts; these functions turn them into
//! scale factors, biases and hardware offset register values.

#[allow(unused_imports)]
use nalgebra::ComplexField;
use nalgebra::Vector3;

use crate::types::{AccelRange, GyroRange, MagResolution};

/// Accelerometer sensitivity at ±2 g, LSB per g
pub const ACCEL_SENSITIVITY: i32 = 16384;

/// Gyroscope sensitivity at ±250 deg/s, LSB per deg/s
pub const GYRO_SENSITIVITY: i32 = 131;

/// Factory self-test response base value at the most sensitive range
pub const SELF_TEST_BASE: f32 = 2620.0;

/// Largest self-test deviation in percent still considered healthy
pub const SELF_TEST_TOLERANCE: f32 = 14.0;

/// Accelerometer resolution in g per ADC tick
///
/// # Example
/// ```
/// use buoy_fusion::AccelRange;
/// use buoy_fusion::calibration::accel_resolution;
///
/// assert_eq!(accel_resolution(AccelRange::G2), 2.0 / 32768.0);
/// ```
pub fn accel_resolution(range: AccelRange) -> f32 {
    match range {
        AccelRange::G2 => 2.0 / 32768.0,
        AccelRange::G4 => 4.0 / 32768.0,
        AccelRange::G8 => 8.0 / 32768.0,
        AccelRange::G16 => 16.0 / 32768.0,
    }
}

/// Gyroscope resolution in deg/s per ADC tick
pub fn gyro_resolution(range: GyroRange) -> f32 {
    match range {
        GyroRange::Dps250 => 250.0 / 32768.0,
        GyroRange::Dps500 => 500.0 / 32768.0,
        GyroRange::Dps1000 => 1000.0 / 32768.0,
        GyroRange::Dps2000 => 2000.0 / 32768.0,
    }
}

/// Magnetometer resolution in milligauss per ADC tick
pub fn mag_resolution(resolution: MagResolution) -> f32 {
    match resolution {
        MagResolution::Bits14 => 10.0 * 4912.0 / 8190.0,
        MagResolution::Bits16 => 10.0 * 4912.0 / 32760.0,
    }
}

/// AK8963 per-axis sensitivity adjustment from a fuse ROM `ASA` byte
pub fn sensitivity_adjustment(asa: u8) -> f32 {
    (asa as f32 - 128.0) / 256.0 + 1.0
}

/// Expected self-test response for a factory self-test code
pub fn factory_trim(code: u8) -> f32 {
    SELF_TEST_BASE * 1.01f32.powf(code as f32 - 1.0)
}

/// Self-test deviation in percent for one axis
///
/// Compares the change between normal and self-test averages with the
/// factory trim for that axis.
pub fn self_test_deviation(average: i32, self_test_average: i32, code: u8) -> f32 {
    100.0 * (self_test_average - average) as f32 / factory_trim(code) - 100.0
}

/// Per-axis self-test deviations in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfTestReport {
    pub accel: Vector3<f32>,
    pub gyro: Vector3<f32>,
}

impl SelfTestReport {
    /// Build the report from normal and self-test averages plus the six
    /// factory codes (accel x, y, z then gyro x, y, z)
    pub fn from_averages(
        accel: Vector3<i32>,
        accel_self_test: Vector3<i32>,
        gyro: Vector3<i32>,
        gyro_self_test: Vector3<i32>,
        codes: [u8; 6],
    ) -> Self {
        Self {
            accel: Vector3::from_fn(|i, _| {
                self_test_deviation(accel[i], accel_self_test[i], codes[i])
            }),
            gyro: Vector3::from_fn(|i, _| {
                self_test_deviation(gyro[i], gyro_self_test[i], codes[i + 3])
            }),
        }
    }

    /// All six axes within ±14 %
    pub fn is_healthy(&self) -> bool {
        self.accel
            .iter()
            .chain(self.gyro.iter())
            .all(|d| d.abs() <= SELF_TEST_TOLERANCE)
    }
}

/// Averaged stationary readings at ±2 g / ±250 deg/s with gravity removed
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use buoy_fusion::calibration::StationaryBias;
///
/// // 10 samples lying flat with a small offset on every axis
/// let bias = StationaryBias::from_sums(
///     Vector3::new(200, -100, 10 * 16484),
///     Vector3::new(1310, 0, -655),
///     10,
/// );
/// assert_eq!(bias.accel_counts, Vector3::new(20, -10, 100));
/// assert!((bias.gyro_dps().x - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StationaryBias {
    /// Accelerometer bias in counts (16384 LSB/g)
    pub accel_counts: Vector3<i32>,
    /// Gyroscope bias in counts (131 LSB/deg/s)
    pub gyro_counts: Vector3<i32>,
}

impl StationaryBias {
    /// Average summed FIFO packets and remove 1 g from the vertical axis
    ///
    /// The sign of the vertical average decides whether gravity is added or
    /// subtracted, so the device may lie on either face.
    pub fn from_sums(accel_sum: Vector3<i32>, gyro_sum: Vector3<i32>, count: u16) -> Self {
        if count == 0 {
            return Self::default();
        }

        let count = count as i32;
        let mut accel_counts = accel_sum / count;
        let gyro_counts = gyro_sum / count;
        if accel_counts.z > 0 {
            accel_counts.z -= ACCEL_SENSITIVITY;
        } else {
            accel_counts.z += ACCEL_SENSITIVITY;
        }

        Self {
            accel_counts,
            gyro_counts,
        }
    }

    /// Accelerometer bias in g
    pub fn accel_g(&self) -> Vector3<f32> {
        self.accel_counts.cast::<f32>() / ACCEL_SENSITIVITY as f32
    }

    /// Gyroscope bias in deg/s
    pub fn gyro_dps(&self) -> Vector3<f32> {
        self.gyro_counts.cast::<f32>() / GYRO_SENSITIVITY as f32
    }

    /// Values for `XG_OFFSET_H` .. `ZG_OFFSET_L`
    ///
    /// The offset registers take 32.8 LSB/deg/s and are added to the output,
    /// so the bias is divided by four and negated.
    pub fn gyro_offset_registers(&self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        for axis in 0..3 {
            let word = -self.gyro_counts[axis] / 4;
            bytes[2 * axis] = ((word >> 8) & 0xFF) as u8;
            bytes[2 * axis + 1] = (word & 0xFF) as u8;
        }
        bytes
    }

    /// Values for `XA_OFFSET_H` .. `ZA_OFFSET_L`
    ///
    /// `factory` holds the current register words, which carry the factory
    /// trim. The bias is converted to 2048 LSB/g and subtracted, and bit 0 of
    /// each low byte (temperature compensation) is kept as it was.
    pub fn accel_offset_registers(&self, factory: [i16; 3]) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        for axis in 0..3 {
            let temperature_bit = (factory[axis] & 0x01) as u8;
            let word = factory[axis] as i32 - self.accel_counts[axis] / 8;
            bytes[2 * axis] = ((word >> 8) & 0xFF) as u8;
            bytes[2 * axis + 1] = (word & 0xFF) as u8 | temperature_bit;
        }
        bytes
    }
}

/// Running min/max of raw magnetometer counts during a figure-eight sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagSweep {
    min: Vector3<i16>,
    max: Vector3<i16>,
    samples: u16,
}

impl Default for MagSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl MagSweep {
    pub fn new() -> Self {
        Self {
            min: Vector3::repeat(i16::MAX),
            max: Vector3::repeat(-i16::MAX),
            samples: 0,
        }
    }

    /// Widen the per-axis envelope with one reading
    pub fn update(&mut self, raw: Vector3<i16>) {
        self.min = self.min.zip_map(&raw, |lo, x| lo.min(x));
        self.max = self.max.zip_map(&raw, |hi, x| hi.max(x));
        self.samples = self.samples.saturating_add(1);
    }

    pub fn samples(&self) -> u16 {
        self.samples
    }

    pub fn min(&self) -> Vector3<i16> {
        self.min
    }

    pub fn max(&self) -> Vector3<i16> {
        self.max
    }

    /// Envelope midpoint per axis in counts
    pub fn center_counts(&self) -> Vector3<i32> {
        (self.max.cast::<i32>() + self.min.cast::<i32>()) / 2
    }

    /// Envelope half-width per axis in counts
    pub fn half_range_counts(&self) -> Vector3<i32> {
        (self.max.cast::<i32>() - self.min.cast::<i32>()) / 2
    }

    /// Hard-iron bias in milligauss
    pub fn hard_iron(&self, resolution: MagResolution, sensitivity: Vector3<f32>) -> Vector3<f32> {
        self.center_counts()
            .cast::<f32>()
            .component_mul(&sensitivity)
            * mag_resolution(resolution)
    }

    /// Soft-iron scale per axis: mean half-range over the axis half-range
    ///
    /// Axes that never moved keep a scale of one.
    pub fn soft_iron(&self) -> Vector3<f32> {
        let half = self.half_range_counts().cast::<f32>();
        let average = half.sum() / 3.0;
        half.map(|h| if h > 0.0 { average / h } else { 1.0 })
    }
}

/// Calibration set applied to every raw sample
///
/// The defaults are field values measured on the prototype buoy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Accelerometer bias in g, subtracted after scaling
    pub accel_bias: Vector3<f32>,
    /// Gyroscope bias in deg/s, subtracted after scaling
    pub gyro_bias: Vector3<f32>,
    /// Magnetometer hard-iron bias in milligauss
    pub mag_bias: Vector3<f32>,
    /// Magnetometer soft-iron scale, applied after the bias
    pub mag_scale: Vector3<f32>,
    /// AK8963 fuse ROM sensitivity adjustment
    pub mag_sensitivity: Vector3<f32>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            accel_bias: Vector3::new(-2.72, 13.91, 21.87) / 1000.0,
            gyro_bias: Vector3::new(0.77, 0.03, 0.09),
            mag_bias: Vector3::new(254.35, -148.14, -166.12),
            mag_scale: Vector3::new(1.03, 1.02, 0.95),
            mag_sensitivity: Vector3::repeat(1.0),
        }
    }
}

impl Calibration {
    /// Calibration with no corrections at all
    pub fn identity() -> Self {
        Self {
            accel_bias: Vector3::zeros(),
            gyro_bias: Vector3::zeros(),
            mag_bias: Vector3::zeros(),
            mag_scale: Vector3::repeat(1.0),
            mag_sensitivity: Vector3::repeat(1.0),
        }
    }
}

/// Scale raw inertial counts and remove the bias: `raw * resolution - bias`
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use buoy_fusion::calibration::calibrate_inertial;
///
/// let g = calibrate_inertial(Vector3::new(0, 0, 16384), 2.0 / 32768.0, Vector3::zeros());
/// assert!((g.z - 1.0).abs() < 1e-6);
/// ```
pub fn calibrate_inertial(raw: Vector3<i16>, resolution: f32, bias: Vector3<f32>) -> Vector3<f32> {
    raw.cast::<f32>() * resolution - bias
}

/// Hard- and soft-iron correction: `(raw * resolution * asa - bias) * scale`
pub fn calibrate_magnetic(
    raw: Vector3<i16>,
    resolution: f32,
    calibration: &Calibration,
) -> Vector3<f32> {
    (raw.cast::<f32>().component_mul(&calibration.mag_sensitivity) * resolution
        - calibration.mag_bias)
        .component_mul(&calibration.mag_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_tables() {
        let accel = AccelRange::ALL.map(accel_resolution);
        assert_eq!(accel, [2.0 / 32768.0, 4.0 / 32768.0, 8.0 / 32768.0, 16.0 / 32768.0]);

        let gyro = GyroRange::ALL.map(gyro_resolution);
        assert_eq!(
            gyro,
            [250.0 / 32768.0, 500.0 / 32768.0, 1000.0 / 32768.0, 2000.0 / 32768.0]
        );

        assert_eq!(mag_resolution(MagResolution::Bits14), 10.0 * 4912.0 / 8190.0);
        assert_eq!(mag_resolution(MagResolution::Bits16), 10.0 * 4912.0 / 32760.0);
    }

    #[test]
    fn test_sensitivity_adjustment() {
        assert_eq!(sensitivity_adjustment(128), 1.0);
        assert_eq!(sensitivity_adjustment(0), 0.5);
        assert!((sensitivity_adjustment(176) - 1.1875).abs() < 1e-6);
    }

    #[test]
    fn test_factory_trim() {
        assert!((factory_trim(1) - 2620.0).abs() < 1e-3);
        assert!((factory_trim(11) - 2620.0 * 1.01f32.powi(10)).abs() < 1e-2);
    }

    #[test]
    fn test_self_test_deviation() {
        // A response exactly equal to the trim is 0 % off
        let code = 50;
        let trim = factory_trim(code);
        let avg = 1000;
        let st = avg + trim.round() as i32;
        assert!(self_test_deviation(avg, st, code).abs() < 0.05);

        let report = SelfTestReport::from_averages(
            Vector3::repeat(avg),
            Vector3::repeat(st),
            Vector3::repeat(-20),
            Vector3::repeat(-20 + trim.round() as i32),
            [code; 6],
        );
        assert!(report.is_healthy());

        let weak = SelfTestReport::from_averages(
            Vector3::repeat(avg),
            Vector3::repeat(avg + (trim * 0.8) as i32),
            Vector3::zeros(),
            Vector3::repeat(trim as i32),
            [code; 6],
        );
        assert!(!weak.is_healthy());
    }

    #[test]
    fn test_stationary_bias_removes_gravity_either_face() {
        let up = StationaryBias::from_sums(Vector3::new(0, 0, 4 * 16400), Vector3::zeros(), 4);
        assert_eq!(up.accel_counts.z, 16);

        let down = StationaryBias::from_sums(Vector3::new(0, 0, -4 * 16400), Vector3::zeros(), 4);
        assert_eq!(down.accel_counts.z, -16);

        assert_eq!(
            StationaryBias::from_sums(Vector3::repeat(5), Vector3::repeat(5), 0),
            StationaryBias::default()
        );
    }

    #[test]
    fn test_gyro_offset_registers() {
        let bias = StationaryBias {
            accel_counts: Vector3::zeros(),
            gyro_counts: Vector3::new(400, -8, 0),
        };
        let bytes = bias.gyro_offset_registers();
        // -100 = 0xFF9C, +2 = 0x0002
        assert_eq!(bytes, [0xFF, 0x9C, 0x00, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_accel_offset_registers_keep_temperature_bit() {
        let bias = StationaryBias {
            accel_counts: Vector3::new(80, -16, 0),
            gyro_counts: Vector3::zeros(),
        };
        let bytes = bias.accel_offset_registers([0x1001, 0x0200, -3]);
        // 0x1001 - 10 = 0x0FF7, bit 0 already set
        assert_eq!(&bytes[0..2], &[0x0F, 0xF7]);
        // 0x0200 + 2 = 0x0202, bit 0 clear
        assert_eq!(&bytes[2..4], &[0x02, 0x02]);
        // -3 = 0xFFFD unchanged, bit 0 set
        assert_eq!(&bytes[4..6], &[0xFF, 0xFD]);
    }

    #[test]
    fn test_mag_sweep_hard_and_soft_iron() {
        let mut sweep = MagSweep::new();
        sweep.update(Vector3::new(100, -50, 20));
        sweep.update(Vector3::new(300, 150, 120));
        sweep.update(Vector3::new(200, 50, 70));
        assert_eq!(sweep.samples(), 3);
        assert_eq!(sweep.center_counts(), Vector3::new(200, 50, 70));
        assert_eq!(sweep.half_range_counts(), Vector3::new(100, 100, 50));

        let bias = sweep.hard_iron(MagResolution::Bits16, Vector3::repeat(1.0));
        let res = mag_resolution(MagResolution::Bits16);
        assert!((bias - Vector3::new(200.0, 50.0, 70.0) * res).magnitude() < 1e-3);

        let scale = sweep.soft_iron();
        let average = 250.0 / 3.0;
        assert!((scale.x - average / 100.0).abs() < 1e-6);
        assert!((scale.z - average / 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_mag_sweep_flat_axis_keeps_unit_scale() {
        let mut sweep = MagSweep::new();
        sweep.update(Vector3::new(10, 10, 10));
        assert_eq!(sweep.soft_iron(), Vector3::repeat(1.0));
    }

    #[test]
    fn test_inertial_calibration() {
        let raw = Vector3::new(16384i16, -16384, 0);
        let bias = Vector3::new(0.1, 0.0, -0.05);
        let calibrated = calibrate_inertial(raw, accel_resolution(AccelRange::G2), bias);
        let expected = Vector3::new(0.9, -1.0, 0.05);
        assert!((calibrated - expected).magnitude() < 1e-6);
    }

    #[test]
    fn test_magnetic_calibration() {
        let calibration = Calibration {
            mag_bias: Vector3::new(10.0, 20.0, 30.0),
            mag_scale: Vector3::new(1.0, 2.0, 0.5),
            mag_sensitivity: Vector3::new(1.0, 1.0, 2.0),
            ..Calibration::identity()
        };
        let calibrated = calibrate_magnetic(Vector3::new(100, 200, 300), 1.0, &calibration);
        let expected = Vector3::new(90.0, 360.0, 285.0);
        assert!((calibrated - expected).magnitude() < 1e-4);
    }
}
