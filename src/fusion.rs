//! Attitude fusion engine

#[allow(unused_imports)]
use nalgebra::RealField;
use nalgebra::{UnitQuaternion, Vector3};

use crate::madgwick::Madgwick;
use crate::mahony::Mahony;
use crate::math::{QuaternionExt, RAD_TO_DEG, Vector3Ext, clamped_asin, wrap_degrees};
use crate::types::{EulerAngles, FilterAlgorithm, FusionSettings};

/// One step of a quaternion attitude filter
///
/// `accel` and `mag` may be in any unit, `gyro` is in rad/s and `dt` in
/// seconds. Returns the renormalized orientation, or `None` when the
/// accelerometer or magnetometer vector has zero magnitude.
pub trait AttitudeFilter {
    fn step(
        &mut self,
        orientation: &UnitQuaternion<f32>,
        accel: Vector3<f32>,
        gyro: Vector3<f32>,
        mag: Vector3<f32>,
        dt: f32,
    ) -> Option<UnitQuaternion<f32>>;

    /// Clear any internal filter state
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Filter {
    Madgwick(Madgwick),
    Mahony(Mahony),
}

impl Filter {
    fn from_settings(settings: &FusionSettings) -> Self {
        match settings.algorithm {
            FilterAlgorithm::Madgwick => {
                Filter::Madgwick(Madgwick::new(settings.gyro_measurement_error))
            }
            FilterAlgorithm::Mahony => Filter::Mahony(Mahony::new(settings.kp, settings.ki)),
        }
    }

    fn as_attitude_filter(&mut self) -> &mut dyn AttitudeFilter {
        match self {
            Filter::Madgwick(filter) => filter,
            Filter::Mahony(filter) => filter,
        }
    }
}

/// Orientation estimate maintained from calibrated sensor vectors
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use buoy_fusion::Fusion;
///
/// let mut fusion = Fusion::new();
///
/// let accel = Vector3::new(0.0, 0.0, 1.0); // g
/// let gyro = Vector3::new(0.1, 0.2, 0.3); // deg/s
/// let mag = Vector3::new(200.0, 0.0, -400.0); // mG
///
/// assert!(fusion.update(accel, gyro, mag, 0.01));
/// let angles = fusion.euler_angles();
/// assert!(angles.yaw >= 0.0 && angles.yaw < 360.0);
/// ```
#[derive(Debug, Clone)]
pub struct Fusion {
    settings: FusionSettings,
    quaternion: UnitQuaternion<f32>,
    filter: Filter,
    accelerometer: Vector3<f32>,
}

impl Fusion {
    /// Create a fusion engine with default settings
    pub fn new() -> Self {
        Self::with_settings(FusionSettings::default())
    }

    pub fn with_settings(settings: FusionSettings) -> Self {
        Fusion {
            settings,
            quaternion: UnitQuaternion::identity(),
            filter: Filter::from_settings(&settings),
            accelerometer: Vector3::zeros(),
        }
    }

    pub fn settings(&self) -> FusionSettings {
        self.settings
    }

    /// Replace the settings and rebuild the filter, keeping the orientation
    pub fn set_settings(&mut self, settings: FusionSettings) {
        self.settings = settings;
        self.filter = Filter::from_settings(&settings);
    }

    pub fn algorithm(&self) -> FilterAlgorithm {
        self.settings.algorithm
    }

    /// Return to the identity orientation and clear filter state
    pub fn reset(&mut self) {
        self.quaternion = UnitQuaternion::identity();
        self.accelerometer = Vector3::zeros();
        self.filter.as_attitude_filter().reset();
    }

    /// Advance the orientation by one sample
    ///
    /// # Arguments
    /// * `accelerometer` - calibrated acceleration in g
    /// * `gyroscope` - calibrated angular rate in deg/s
    /// * `magnetometer` - calibrated field in mG, already aligned to the accelerometer axes
    /// * `delta_time` - seconds since the previous update
    ///
    /// Returns `false` when the sample was skipped because the accelerometer or
    /// magnetometer reading had zero magnitude.
    pub fn update(
        &mut self,
        accelerometer: Vector3<f32>,
        gyroscope: Vector3<f32>,
        magnetometer: Vector3<f32>,
        delta_time: f32,
    ) -> bool {
        self.accelerometer = accelerometer;

        let next = self.filter.as_attitude_filter().step(
            &self.quaternion,
            accelerometer,
            gyroscope.deg_to_rad(),
            magnetometer,
            delta_time,
        );

        match next {
            Some(quaternion) => {
                self.quaternion = quaternion;
                true
            }
            None => false,
        }
    }

    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>) {
        self.quaternion = quaternion;
    }

    /// Last accelerometer reading passed to [`update`](Self::update)
    pub fn accelerometer(&self) -> Vector3<f32> {
        self.accelerometer
    }

    /// Roll, pitch and yaw in degrees
    ///
    /// Yaw includes the magnetic declination and lies in `[0, 360)`.
    pub fn euler_angles(&self) -> EulerAngles {
        let c = self.quaternion.rotation_coefficients();
        let roll = c.a31.atan2(c.a33) * RAD_TO_DEG;
        let pitch = -clamped_asin(c.a32) * RAD_TO_DEG;
        let yaw = c.a12.atan2(c.a22) * RAD_TO_DEG + self.settings.magnetic_declination;

        EulerAngles {
            roll,
            pitch,
            yaw: wrap_degrees(yaw),
        }
    }

    /// Last accelerometer reading with the gravity direction removed, in g
    pub fn linear_acceleration(&self) -> Vector3<f32> {
        let c = self.quaternion.rotation_coefficients();
        Vector3::new(
            self.accelerometer.x + c.a32,
            self.accelerometer.y - c.a31,
            self.accelerometer.z - c.a33,
        )
    }

    /// Express a body-frame vector in the reference frame
    pub fn rotate_vector(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.quaternion.rotate_vector(v)
    }

    /// Last accelerometer reading rotated into the reference frame
    pub fn earth_acceleration(&self) -> Vector3<f32> {
        self.rotate_vector(self.accelerometer)
    }

    /// Integral error of the feedback filter, `None` for the gradient-descent filter
    pub fn integral_error(&self) -> Option<Vector3<f32>> {
        match &self.filter {
            Filter::Mahony(filter) => Some(filter.integral_error()),
            Filter::Madgwick(_) => None,
        }
    }
}

impl Default for Fusion {
    fn default() -> Self {
        Self::new()
    }
}
