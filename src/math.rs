//! Mathematical utilities and nalgebra extensions for the buoy fusion library

#[allow(unused_imports)]
use nalgebra::ComplexField;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Standard gravity in m/s²
pub const GRAVITY: f32 = 9.80665;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Calculate the magnitude of the vector
    fn magnitude(&self) -> f32;

    /// Unit vector in the same direction, `None` when the magnitude is zero or not finite
    fn unit(&self) -> Option<Vector3<f32>>;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    fn unit(&self) -> Option<Vector3<f32>> {
        let mag = self.magnitude();
        if mag > 0.0 && mag.is_finite() {
            Some(*self / mag)
        } else {
            None
        }
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }
}

/// Rotation matrix entries used to derive Euler angles and remove gravity
///
/// Named after their row and column in the direction cosine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationCoefficients {
    pub a12: f32,
    pub a22: f32,
    pub a31: f32,
    pub a32: f32,
    pub a33: f32,
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Rotate a vector with the sandwich product `q·(0,v)·q⁻¹`
    fn rotate_vector(&self, v: Vector3<f32>) -> Vector3<f32>;

    /// Direction cosine entries needed for roll, pitch, yaw and gravity
    fn rotation_coefficients(&self) -> RotationCoefficients;

    /// Integrate a quaternion rate over `dt` and renormalize
    fn integrate(&self, rate: Quaternion<f32>, dt: f32) -> UnitQuaternion<f32>;

    /// Create quaternion from Euler angles in degrees
    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn rotate_vector(&self, v: Vector3<f32>) -> Vector3<f32> {
        let q = self.quaternion();
        let p = Quaternion::from_imag(v);
        (q * p * q.conjugate()).imag()
    }

    fn rotation_coefficients(&self) -> RotationCoefficients {
        let q = self.quaternion();
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        RotationCoefficients {
            a12: 2.0 * (x * y + w * z),
            a22: w * w + x * x - y * y - z * z,
            a31: 2.0 * (w * x + y * z),
            a32: 2.0 * (x * z - w * y),
            a33: w * w - x * x - y * y + z * z,
        }
    }

    fn integrate(&self, rate: Quaternion<f32>, dt: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_quaternion(self.quaternion() + rate * dt)
    }

    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        let euler_rad = Vector3::new(roll, pitch, yaw).deg_to_rad();
        UnitQuaternion::from_euler_angles(euler_rad.x, euler_rad.y, euler_rad.z)
    }
}

/// Wrap an angle in degrees into `[0, 360)`
pub fn wrap_degrees(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Arc-sine with the argument clamped to `[-1, 1]`
pub fn clamped_asin(x: f32) -> f32 {
    x.clamp(-1.0, 1.0).asin()
}
