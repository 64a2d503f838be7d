//! Proportional-integral feedback attitude filter

#[allow(unused_imports)]
use nalgebra::ComplexField;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::fusion::AttitudeFilter;
use crate::math::{QuaternionExt, Vector3Ext};

/// Mahony filter
///
/// The error between measured and predicted gravity and field directions is
/// fed back into the angular rate through a PI controller. With `ki <= 0`
/// the integral term is held at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mahony {
    kp: f32,
    ki: f32,
    integral_error: Vector3<f32>,
}

impl Mahony {
    pub fn new(kp: f32, ki: f32) -> Self {
        Self {
            kp,
            ki,
            integral_error: Vector3::zeros(),
        }
    }

    pub fn kp(&self) -> f32 {
        self.kp
    }

    pub fn ki(&self) -> f32 {
        self.ki
    }

    /// Accumulated error driving the integral term
    pub fn integral_error(&self) -> Vector3<f32> {
        self.integral_error
    }
}

impl AttitudeFilter for Mahony {
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

        // Reference direction of the Earth's magnetic field
        let hx = 2.0 * m.x * (0.5 - q3q3 - q4q4)
            + 2.0 * m.y * (q2q3 - q1q4)
            + 2.0 * m.z * (q2q4 + q1q3);
        let hy = 2.0 * m.x * (q2q3 + q1q4)
            + 2.0 * m.y * (0.5 - q2q2 - q4q4)
            + 2.0 * m.z * (q3q4 - q1q2);
        let bx = (hx * hx + hy * hy).sqrt();
        let bz = 2.0 * m.x * (q2q4 - q1q3)
            + 2.0 * m.y * (q3q4 + q1q2)
            + 2.0 * m.z * (0.5 - q2q2 - q3q3);

        // Predicted gravity and field directions in the sensor frame
        let v = Vector3::new(
            2.0 * (q2q4 - q1q3),
            2.0 * (q1q2 + q3q4),
            q1q1 - q2q2 - q3q3 + q4q4,
        );
        let w = Vector3::new(
            2.0 * bx * (0.5 - q3q3 - q4q4) + 2.0 * bz * (q2q4 - q1q3),
            2.0 * bx * (q2q3 - q1q4) + 2.0 * bz * (q1q2 + q3q4),
            2.0 * bx * (q1q3 + q2q4) + 2.0 * bz * (0.5 - q2q2 - q3q3),
        );

        let error = a.cross(&v) + m.cross(&w);
        if self.ki > 0.0 {
            self.integral_error += error;
        } else {
            self.integral_error = Vector3::zeros();
        }

        let corrected = gyro + error * self.kp + self.integral_error * self.ki;
        let rate = q * Quaternion::from_imag(corrected) * 0.5;
        Some(orientation.integrate(rate, dt))
    }

    fn reset(&mut self) {
        self.integral_error = Vector3::zeros();
    }
}
