//! Sensor-to-motion-sample pipeline
//!
//! Each poll reads whatever the device has ready, converts it to physical
//! units and advances the attitude filter. Once per output interval the
//! current acceleration is rotated into the reference frame and emitted as
//! one vertical sample for the wave analysis.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info, trace};
use nalgebra::Vector3;

use crate::convert::{CalibratedSample, RawSample, SampleConverter};
use crate::error::Error;
use crate::fusion::Fusion;
use crate::mpu9250::{Mpu9250, temperature_celsius};
use crate::types::{EulerAngles, FusionSettings, SensorSettings};

/// Vertical acceleration sample handed to the wave analysis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    /// Vertical acceleration in milli-g with gravity removed
    pub vertical: i16,
    /// Seconds covered since the previous sample
    pub dt: f32,
}

impl MotionSample {
    /// Vertical component of an earth-frame acceleration in g
    pub fn from_earth_acceleration(acceleration: Vector3<f32>, dt: f32) -> Self {
        Self {
            vertical: (1000.0 * acceleration.z - 1000.0) as i16,
            dt,
        }
    }
}

/// MPU-9250 driver, converter and attitude filter wired together
pub struct MotionSensor<I2C, D> {
    device: Mpu9250<I2C, D>,
    converter: SampleConverter,
    fusion: Fusion,
    raw: RawSample,
    sample: CalibratedSample,
    output_interval_ms: u64,
    last_update_us: Option<u64>,
    last_output_ms: u64,
    dt_sum: f32,
}

impl<I2C: I2c, D: DelayNs> MotionSensor<I2C, D> {
    pub fn new(
        i2c: I2C,
        delay: D,
        sensor_settings: &SensorSettings,
        fusion_settings: FusionSettings,
    ) -> Self {
        Self {
            device: Mpu9250::new(i2c, delay, sensor_settings),
            converter: SampleConverter::new(sensor_settings),
            fusion: Fusion::with_settings(fusion_settings),
            raw: RawSample::default(),
            sample: CalibratedSample::default(),
            output_interval_ms: fusion_settings.output_interval_ms as u64,
            last_update_us: None,
            last_output_ms: 0,
            dt_sum: 0.0,
        }
    }

    /// Identify, self-test and initialize both sensors
    ///
    /// Fails only when either sensor does not identify itself.
    pub fn setup(&mut self) -> Result<(), Error> {
        self.device.identify()?;
        self.device.self_test();

        let calibration = self.converter.calibration();
        info!(
            "Accel biases (mg): {:.2} {:.2} {:.2}",
            1000.0 * calibration.accel_bias.x,
            1000.0 * calibration.accel_bias.y,
            1000.0 * calibration.accel_bias.z
        );
        info!(
            "Gyro biases (dps): {:.2} {:.2} {:.2}",
            calibration.gyro_bias.x, calibration.gyro_bias.y, calibration.gyro_bias.z
        );

        self.device.init();
        self.device.identify_magnetometer()?;
        let sensitivity = self.device.init_magnetometer();
        self.converter.calibration_mut().mag_sensitivity = sensitivity;
        Ok(())
    }

    /// Poll the device and advance the filter
    ///
    /// Returns a motion sample once more than the output interval has passed
    /// since the previous one.
    pub fn update(&mut self, now_us: u64) -> Option<MotionSample> {
        if self.device.data_ready() {
            if let Ok((accel, gyro)) = self.device.read_accel_gyro() {
                self.raw.accel = accel;
                self.raw.gyro = gyro;
            }
            if let Ok(Some(mag)) = self.device.read_mag() {
                self.raw.mag = mag;
            }
            self.sample = self.converter.convert(&self.raw);
        }

        let dt = match self.last_update_us {
            Some(last) => now_us.saturating_sub(last) as f32 / 1_000_000.0,
            None => 0.0,
        };
        self.last_update_us = Some(now_us);
        self.dt_sum += dt;

        // AK8963 X and Y are swapped relative to the accelerometer
        let mag = Vector3::new(self.sample.mag.y, self.sample.mag.x, self.sample.mag.z);
        self.fusion.update(self.sample.accel, self.sample.gyro, mag, dt);

        let now_ms = now_us / 1000;
        if now_ms.saturating_sub(self.last_output_ms) <= self.output_interval_ms {
            return None;
        }

        let earth = self.fusion.earth_acceleration();
        let sample = MotionSample::from_earth_acceleration(earth, self.dt_sum);
        trace!(
            "{:.6}, {}, {}, {}",
            self.dt_sum,
            (earth.x * 1000.0) as i32,
            (earth.y * 1000.0) as i32,
            (earth.z * 1000.0) as i32
        );

        self.last_output_ms = now_ms;
        self.dt_sum = 0.0;
        Some(sample)
    }

    /// Measure stationary accelerometer and gyroscope bias, then re-initialize
    ///
    /// The gyroscope bias goes into the device offset registers, so only the
    /// accelerometer bias is kept in software.
    pub fn calibrate_accel_gyro(&mut self) {
        let bias = self.device.calibrate_accel_gyro();
        let calibration = self.converter.calibration_mut();
        calibration.accel_bias = bias.accel_g();
        calibration.gyro_bias = Vector3::zeros();
        self.device.init();
    }

    /// Run the figure-eight sweep and store hard- and soft-iron corrections
    ///
    /// A sweep without a single reading leaves the previous corrections in place.
    pub fn calibrate_mag(&mut self) {
        let sweep = self.device.calibrate_mag();
        if sweep.samples() == 0 {
            error!("Mag calibration got no readings, keeping previous calibration");
            return;
        }
        let resolution = self.device.settings().mag_resolution;
        let calibration = self.converter.calibration_mut();
        calibration.mag_bias = sweep.hard_iron(resolution, calibration.mag_sensitivity);
        calibration.mag_scale = sweep.soft_iron();
        info!(
            "Mag biases (mG): {:.2} {:.2} {:.2}",
            calibration.mag_bias.x, calibration.mag_bias.y, calibration.mag_bias.z
        );
        info!(
            "Mag scale: {:.2} {:.2} {:.2}",
            calibration.mag_scale.x, calibration.mag_scale.y, calibration.mag_scale.z
        );
    }

    pub fn sleep(&mut self) {
        self.device.sleep();
    }

    /// Bring both sensors back from [`sleep`](Self::sleep)
    pub fn wake(&mut self) {
        self.device.init();
        let sensitivity = self.device.init_magnetometer();
        self.converter.calibration_mut().mag_sensitivity = sensitivity;
    }

    /// Die temperature in degrees Celsius
    pub fn temperature(&mut self) -> Option<f32> {
        self.device.read_temperature_raw().ok().map(temperature_celsius)
    }

    pub fn euler_angles(&self) -> EulerAngles {
        self.fusion.euler_angles()
    }

    pub fn fusion(&self) -> &Fusion {
        &self.fusion
    }

    pub fn converter(&self) -> &SampleConverter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut SampleConverter {
        &mut self.converter
    }

    /// Last calibrated reading
    pub fn sample(&self) -> &CalibratedSample {
        &self.sample
    }

    pub fn device_mut(&mut self) -> &mut Mpu9250<I2C, D> {
        &mut self.device
    }

    pub fn release(self) -> (I2C, D) {
        self.device.release()
    }
}
