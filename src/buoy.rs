//! Wave buoy: sensor pipeline and wave analysis driven from one poll loop

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info};

use crate::clock::Clock;
use crate::error::Error;
use crate::imu::MotionSensor;
use crate::store::{LogStore, NullStore};
use crate::types::{DEFAULT_CAPACITY, EulerAngles, FusionSettings, SensorSettings, WaveSettings};
use crate::wave::{WaveAnalyser, WavePhase};

/// Configuration for every stage of the buoy
#[derive(Debug, Clone, Copy, Default)]
pub struct BuoySettings {
    pub sensor: SensorSettings,
    pub fusion: FusionSettings,
    pub wave: WaveSettings,
}

/// A floating wave sensor
///
/// Call [`setup`](Self::setup) once, then [`update`](Self::update) from the
/// main loop as often as possible. `update` returns `true` once per finished
/// measurement; the statistics getters then hold the result. The IMU is put
/// to sleep when a measurement completes, with or without waves.
/// [`restart`](Self::restart) and the calibration routines wake it again.
///
/// `N` is the number of motion samples per analysis window and `S` receives a
/// durable copy of the measurement log.
pub struct WaveBuoy<I2C, D, C, const N: usize = DEFAULT_CAPACITY, S: LogStore = NullStore> {
    sensor: MotionSensor<I2C, D>,
    analyser: WaveAnalyser<N, S>,
    clock: C,
    ready: bool,
    asleep: bool,
}

impl<I2C: I2c, D: DelayNs, C: Clock, const N: usize> WaveBuoy<I2C, D, C, N, NullStore> {
    pub fn new(i2c: I2C, delay: D, clock: C, settings: BuoySettings) -> Self {
        Self::with_store(i2c, delay, clock, settings, NullStore)
    }
}

impl<I2C: I2c, D: DelayNs, C: Clock, const N: usize, S: LogStore> WaveBuoy<I2C, D, C, N, S> {
    /// Create a buoy that mirrors its results into `store`
    pub fn with_store(i2c: I2C, delay: D, clock: C, settings: BuoySettings, store: S) -> Self {
        Self {
            sensor: MotionSensor::new(i2c, delay, &settings.sensor, settings.fusion),
            analyser: WaveAnalyser::with_store(settings.wave, store),
            clock,
            ready: false,
            asleep: false,
        }
    }

    /// Bring up the IMU and start the first measurement cycle
    ///
    /// An identification failure is returned unchanged; the caller is
    /// expected to halt. Nothing else fails.
    pub fn setup(&mut self) -> Result<(), Error> {
        if let Err(err) = self.sensor.setup() {
            error!("{}", err);
            return Err(err);
        }
        self.analyser.start(self.now_ms());
        self.ready = true;
        self.asleep = false;
        info!("Wave buoy ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Poll the sensor once and feed any new motion sample to the analysis
    ///
    /// Returns `true` on the call that completes a measurement. Does nothing
    /// before [`setup`](Self::setup) or after a measurement has completed.
    pub fn update(&mut self) -> bool {
        if !self.ready || self.analyser.is_done() {
            return false;
        }

        let now_us = self.clock.now_us();
        let Some(sample) = self.sensor.update(now_us) else {
            return false;
        };

        let done = self
            .analyser
            .push(sample.vertical, sample.dt, (now_us / 1000) as u32);
        if done {
            info!("MPU9250 to sleep");
            self.sleep();
        }
        done
    }

    /// Discard the last result and begin a new measurement cycle
    pub fn restart(&mut self) -> Result<(), Error> {
        if !self.ready {
            return Err(Error::NotReady);
        }
        self.wake();
        self.analyser.restart(self.now_ms());
        Ok(())
    }

    /// Put the IMU into its low-power state
    pub fn sleep(&mut self) {
        self.sensor.sleep();
        self.asleep = true;
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    fn wake(&mut self) {
        if self.asleep {
            info!("MPU9250 wake up");
            self.sensor.wake();
            self.asleep = false;
        }
    }

    /// Measure stationary accelerometer and gyroscope bias
    ///
    /// The buoy must lie still and level. The running measurement cycle is
    /// restarted afterwards.
    pub fn calibrate_accel_gyro(&mut self) -> Result<(), Error> {
        if !self.ready {
            return Err(Error::NotReady);
        }
        self.wake();
        self.sensor.calibrate_accel_gyro();
        self.analyser.restart(self.now_ms());
        Ok(())
    }

    /// Record the magnetometer range while the buoy is waved in a figure eight
    pub fn calibrate_mag(&mut self) -> Result<(), Error> {
        if !self.ready {
            return Err(Error::NotReady);
        }
        self.wake();
        self.sensor.calibrate_mag();
        self.analyser.restart(self.now_ms());
        Ok(())
    }

    /// Settle delay in milliseconds; out-of-range values are ignored
    pub fn set_settle_delay(&mut self, delay_ms: u32) {
        self.analyser.set_settle_delay(delay_ms);
    }

    /// Number of waves averaged per measurement; out-of-range values are ignored
    pub fn set_wave_count(&mut self, count: usize) {
        self.analyser.set_wave_count(count);
    }

    pub fn significant_wave_height(&self) -> f32 {
        self.analyser.significant_wave_height()
    }

    pub fn average_wave_height(&self) -> f32 {
        self.analyser.average_wave_height()
    }

    pub fn average_period(&self) -> f32 {
        self.analyser.average_period()
    }

    /// Whether the last completed window held no waves
    pub fn no_waves(&self) -> bool {
        self.analyser.no_waves()
    }

    pub fn phase(&self) -> WavePhase {
        self.analyser.phase()
    }

    pub fn euler_angles(&self) -> EulerAngles {
        self.sensor.euler_angles()
    }

    pub fn sensor(&self) -> &MotionSensor<I2C, D> {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut MotionSensor<I2C, D> {
        &mut self.sensor
    }

    pub fn analyser(&self) -> &WaveAnalyser<N, S> {
        &self.analyser
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn now_ms(&self) -> u32 {
        self.clock.now_ms() as u32
    }
}
