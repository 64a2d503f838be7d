//! Gradient-descent attitude filter

#[allow(unused_imports)]
use nalgebra::ComplexField;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::fusion::AttitudeFilter;
use crate::math::{DEG_TO_RAD, QuaternionExt, Vector3Ext};

/// Madgwick filter
///
/// Corrects the gyroscope-driven quaternion rate with a normalized
/// steepest-descent step towards the orientation that best explains the
/// measured gravity and magnetic field directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Madgwick {
    beta: f32,
}

impl Madgwick {
    /// Create a filter from the expected gyroscope measurement error in deg/s
    pub fn new(gyro_measurement_error: f32) -> Self {
        Self::with_beta((3.0f32 / 4.0).sqrt() * gyro_measurement_error * DEG_TO_RAD)
    }

    /// Create a filter with an explicit correction gain
    pub fn with_beta(beta: f32) -> Self {
        Self { beta }
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }
}

impl AttitudeFilter for Madgwick {
    fn step(
        &mut self,
        orientation: &UnitQuaternion<f32>,
        accel: Vector3<f32>,
        gyro: Vector3<f32>,
        mag: Vector3<f32>,
        dt: f32,
    ) -> Option<UnitQuaternion<f32>> {
        let a = accel.unit()?;
        let m = mag.unit()?;

        let q = orientation.quaternion();
        let (q1, q2, q3, q4) = (q.w, q.i, q.j, q.k);

        let _2q1 = 2.0 * q1;
        let _2q2 = 2.0 * q2;
        let _2q3 = 2.0 * q3;
        let _2q4 = 2.0 * q4;
        let _2q1q3 = 2.0 * q1 * q3;
        let _2q3q4 = 2.0 * q3 * q4;
        let q1q1 = q1 * q1;
        let q1q2 = q1 * q2;
        let q1q3 = q1 * q3;
        let q1q4 = q1 * q4;
        let q2q2 = q2 * q2;
        let q2q3 = q2 * q3;
        let q2q4 = q2 * q4;
        let q3q3 = q3 * q3;
        let q3q4 = q3 * q4;
        let q4q4 = q4 * q4;

        // Earth field direction in the horizontal plane and vertical
        let _2q1mx = 2.0 * q1 * m.x;
        let _2q1my = 2.0 * q1 * m.y;
        let _2q1mz = 2.0 * q1 * m.z;
        let _2q2mx = 2.0 * q2 * m.x;
        let hx = m.x * q1q1 - _2q1my * q4 + _2q1mz * q3 + m.x * q2q2 + _2q2 * m.y * q3
            + _2q2 * m.z * q4
            - m.x * q3q3
            - m.x * q4q4;
        let hy = _2q1mx * q4 + m.y * q1q1 - _2q1mz * q2 + _2q2mx * q3 - m.y * q2q2
            + m.y * q3q3
            + _2q3 * m.z * q4
            - m.y * q4q4;
        let _2bx = (hx * hx + hy * hy).sqrt();
        let _2bz = -_2q1mx * q3 + _2q1my * q2 + m.z * q1q1 + _2q2mx * q4 - m.z * q2q2
            + _2q3 * m.y * q4
            - m.z * q3q3
            + m.z * q4q4;
        let _4bx = 2.0 * _2bx;
        let _4bz = 2.0 * _2bz;

        // Objective function residuals
        let fx = 2.0 * q2q4 - _2q1q3 - a.x;
        let fy = 2.0 * q1q2 + _2q3q4 - a.y;
        let fz = 1.0 - 2.0 * q2q2 - 2.0 * q3q3 - a.z;
        let mx_err = _2bx * (0.5 - q3q3 - q4q4) + _2bz * (q2q4 - q1q3) - m.x;
        let my_err = _2bx * (q2q3 - q1q4) + _2bz * (q1q2 + q3q4) - m.y;
        let mz_err = _2bx * (q1q3 + q2q4) + _2bz * (0.5 - q2q2 - q3q3) - m.z;

        let s1 = -_2q3 * fx + _2q2 * fy - _2bz * q3 * mx_err
            + (-_2bx * q4 + _2bz * q2) * my_err
            + _2bx * q3 * mz_err;
        let s2 = _2q4 * fx + _2q1 * fy - 4.0 * q2 * fz
            + _2bz * q4 * mx_err
            + (_2bx * q3 + _2bz * q1) * my_err
            + (_2bx * q4 - _4bz * q2) * mz_err;
        let s3 = -_2q1 * fx + _2q4 * fy - 4.0 * q3 * fz
            + (-_4bx * q3 - _2bz * q1) * mx_err
            + (_2bx * q2 + _2bz * q4) * my_err
            + (_2bx * q1 - _4bz * q3) * mz_err;
        let s4 = _2q2 * fx + _2q3 * fy
            + (-_4bx * q4 + _2bz * q2) * mx_err
            + (-_2bx * q1 + _2bz * q3) * my_err
            + _2bx * q2 * mz_err;

        // A zero gradient means the estimate already matches both references
        let norm = (s1 * s1 + s2 * s2 + s3 * s3 + s4 * s4).sqrt();
        let step = if norm > 0.0 {
            Quaternion::new(s1, s2, s3, s4) * (1.0 / norm)
        } else {
            Quaternion::new(0.0, 0.0, 0.0, 0.0)
        };

        let rate = q * Quaternion::from_imag(gyro) * 0.5 - step * self.beta;
        Some(orientation.integrate(rate, dt))
    }

    fn reset(&mut self) {}
}
