//! Blocking MPU-9250 / AK8963 driver
//!
//! Talks to the device through `embedded_hal::i2c::I2c` and waits with
//! `embedded_hal::delay::DelayNs`. Only identification reports a failure to
//! the caller; every other transport error is logged and the affected value
//! is left at zero or its previous state.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use log::{debug, error, info, trace};
use nalgebra::Vector3;

use crate::calibration::{MagSweep, SelfTestReport, StationaryBias, sensitivity_adjustment};
use crate::error::Error;
use crate::registers::*;
use crate::types::SensorSettings;

/// Temperature sensor sensitivity, LSB per degree Celsius
pub const TEMP_SENSITIVITY: f32 = 333.87;

/// Temperature at a raw reading of zero
pub const TEMP_OFFSET: f32 = 21.0;

/// Convert a raw `TEMP_OUT` reading to degrees Celsius
pub fn temperature_celsius(raw: i16) -> f32 {
    raw as f32 / TEMP_SENSITIVITY + TEMP_OFFSET
}

/// MPU-9250 with its AK8963 magnetometer reached through I2C bypass
pub struct Mpu9250<I2C, D> {
    i2c: I2C,
    delay: D,
    settings: SensorSettings,
}

impl<I2C: I2c, D: DelayNs> Mpu9250<I2C, D> {
    pub fn new(i2c: I2C, delay: D, settings: &SensorSettings) -> Self {
        Self {
            i2c,
            delay,
            settings: *settings,
        }
    }

    /// Give back the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Check the MPU-9250 `WHO_AM_I` register
    pub fn identify(&mut self) -> Result<(), Error> {
        let who_am_i = self.read_byte(self.settings.address, WHO_AM_I)?;
        debug!("MPU9250 WHO AM I = {:#04x}", who_am_i);
        if who_am_i != MPU9250_WHO_AM_I_VALUE {
            error!("Could not connect to MPU9250: {:#04x}", who_am_i);
            return Err(Error::ImuNotFound { who_am_i });
        }
        info!("MPU9250 is online");
        Ok(())
    }

    /// Check the AK8963 `WIA` register; needs the bypass enabled by [`init`](Self::init)
    pub fn identify_magnetometer(&mut self) -> Result<(), Error> {
        let who_am_i = self.read_byte(AK8963_ADDR, AK8963_WIA)?;
        debug!("AK8963 WHO AM I = {:#04x}", who_am_i);
        if who_am_i != AK8963_WHO_AM_I_VALUE {
            error!("Could not connect to AK8963: {:#04x}", who_am_i);
            return Err(Error::MagnetometerNotFound { who_am_i });
        }
        Ok(())
    }

    /// Compare self-test responses with the factory trim
    ///
    /// Leaves the device at ±2 g / ±250 deg/s; run [`init`](Self::init)
    /// afterwards.
    pub fn self_test(&mut self) -> SelfTestReport {
        let address = self.settings.address;
        self.write(address, SMPLRT_DIV, 0x00);
        self.write(address, CONFIG, DLPF_CFG_92HZ);
        self.write(address, GYRO_CONFIG, 0x00);
        self.write(address, ACCEL_CONFIG_2, ACCEL_DLPF_92HZ);
        self.write(address, ACCEL_CONFIG, 0x00);

        let samples = self.settings.self_test_samples.max(1);
        let (accel, gyro) = self.average_outputs(samples);

        self.write(address, ACCEL_CONFIG, SELF_TEST_ENABLE);
        self.write(address, GYRO_CONFIG, SELF_TEST_ENABLE);
        self.delay.delay_ms(25);

        let (accel_self_test, gyro_self_test) = self.average_outputs(samples);

        self.write(address, ACCEL_CONFIG, 0x00);
        self.write(address, GYRO_CONFIG, 0x00);
        self.delay.delay_ms(25);

        let mut codes = [0u8; 6];
        let code_registers = [
            SELF_TEST_X_ACCEL,
            SELF_TEST_Y_ACCEL,
            SELF_TEST_Z_ACCEL,
            SELF_TEST_X_GYRO,
            SELF_TEST_Y_GYRO,
            SELF_TEST_Z_GYRO,
        ];
        for (code, register) in codes.iter_mut().zip(code_registers) {
            *code = self.read_byte(address, register).unwrap_or(0);
        }

        let report =
            SelfTestReport::from_averages(accel, accel_self_test, gyro, gyro_self_test, codes);
        for (axis, name) in ["x", "y", "z"].iter().enumerate() {
            info!(
                "{}-axis self test: acceleration trim within {:.2}% of factory value",
                name, report.accel[axis]
            );
        }
        for (axis, name) in ["x", "y", "z"].iter().enumerate() {
            info!(
                "{}-axis self test: gyration trim within {:.2}% of factory value",
                name, report.gyro[axis]
            );
        }
        report
    }

    /// Bring the MPU-9250 into active mode
    ///
    /// 41 Hz DLPF, 200 Hz sample rate, configured full-scale ranges, latched
    /// data-ready interrupt and I2C bypass to the magnetometer.
    pub fn init(&mut self) {
        let address = self.settings.address;

        self.write(address, PWR_MGMT_1, 0x00);
        self.delay.delay_ms(100);
        self.write(address, PWR_MGMT_1, PWR_MGMT_1_CLKSEL_AUTO);
        self.delay.delay_ms(200);

        self.write(address, CONFIG, DLPF_CFG_41HZ);
        self.write(address, SMPLRT_DIV, SMPLRT_DIV_200HZ);

        let gyro_bits = self.settings.gyro_range.bits() << FS_SEL_SHIFT;
        let c = self.read_byte(address, GYRO_CONFIG).unwrap_or(0);
        self.write(
            address,
            GYRO_CONFIG,
            (c & !FCHOICE_B_MASK & !FS_SEL_MASK) | gyro_bits,
        );

        let accel_bits = self.settings.accel_range.bits() << FS_SEL_SHIFT;
        let c = self.read_byte(address, ACCEL_CONFIG).unwrap_or(0);
        self.write(address, ACCEL_CONFIG, (c & !FS_SEL_MASK) | accel_bits);

        let c = self.read_byte(address, ACCEL_CONFIG_2).unwrap_or(0);
        self.write(
            address,
            ACCEL_CONFIG_2,
            (c & !ACCEL_DLPF_MASK) | ACCEL_DLPF_41HZ,
        );

        self.write(address, INT_PIN_CFG, INT_PIN_CFG_LATCH_BYPASS);
        self.write(address, INT_ENABLE, INT_RAW_RDY_EN);
        self.delay.delay_ms(100);

        info!("MPU9250 initialized for active data mode");
    }

    /// Read the fuse ROM and start continuous measurement
    ///
    /// Returns the per-axis sensitivity adjustment.
    pub fn init_magnetometer(&mut self) -> Vector3<f32> {
        self.write(AK8963_ADDR, AK8963_CNTL1, AK8963_MODE_POWER_DOWN);
        self.delay.delay_ms(10);
        self.write(AK8963_ADDR, AK8963_CNTL1, AK8963_MODE_FUSE_ROM);
        self.delay.delay_ms(10);

        let mut asa = [128u8; 3];
        if self.read(AK8963_ADDR, AK8963_ASAX, &mut asa).is_err() {
            asa = [128; 3];
        }
        let sensitivity = Vector3::from_fn(|i, _| sensitivity_adjustment(asa[i]));

        self.write(AK8963_ADDR, AK8963_CNTL1, AK8963_MODE_POWER_DOWN);
        self.delay.delay_ms(10);
        let mode = self.settings.mag_resolution.bits() | self.settings.mag_rate.bits();
        self.write(AK8963_ADDR, AK8963_CNTL1, mode);
        self.delay.delay_ms(10);

        debug!(
            "AK8963 sensitivity adjustment: {:.3} {:.3} {:.3}",
            sensitivity.x, sensitivity.y, sensitivity.z
        );
        info!("AK8963 initialized for active data mode");
        sensitivity
    }

    /// Raw data-ready interrupt flag
    pub fn data_ready(&mut self) -> bool {
        self.read_byte(self.settings.address, INT_STATUS)
            .map(|status| status & INT_STATUS_RAW_DATA_RDY != 0)
            .unwrap_or(false)
    }

    /// Accelerometer and gyroscope counts from one burst read
    pub fn read_accel_gyro(&mut self) -> Result<(Vector3<i16>, Vector3<i16>), Error> {
        let mut buffer = [0u8; 14];
        self.read(self.settings.address, ACCEL_XOUT_H, &mut buffer)?;
        Ok((be_vector(&buffer[0..6]), be_vector(&buffer[8..14])))
    }

    pub fn read_temperature_raw(&mut self) -> Result<i16, Error> {
        let mut buffer = [0u8; 2];
        self.read(self.settings.address, TEMP_OUT_H, &mut buffer)?;
        Ok(i16::from_be_bytes(buffer))
    }

    /// Magnetometer counts, `None` when no new data is ready or the sensor overflowed
    pub fn read_mag(&mut self) -> Result<Option<Vector3<i16>>, Error> {
        let status = self.read_byte(AK8963_ADDR, AK8963_ST1)?;
        if status & AK8963_ST1_DRDY == 0 {
            return Ok(None);
        }

        // Six data bytes then ST2, which must be read to end the measurement
        let mut buffer = [0u8; 7];
        self.read(AK8963_ADDR, AK8963_HXL, &mut buffer)?;
        if buffer[6] & AK8963_ST2_HOFL != 0 {
            trace!("AK8963 overflow");
            return Ok(None);
        }

        Ok(Some(Vector3::new(
            i16::from_le_bytes([buffer[0], buffer[1]]),
            i16::from_le_bytes([buffer[2], buffer[3]]),
            i16::from_le_bytes([buffer[4], buffer[5]]),
        )))
    }

    /// Measure accelerometer and gyroscope bias from the hardware FIFO
    ///
    /// The device must lie still and level. The gyroscope offset registers
    /// are loaded with the result. The accelerometer offset words are
    /// computed against the factory trim but not written. The device is
    /// reset on the way, so [`init`](Self::init) must follow.
    pub fn calibrate_accel_gyro(&mut self) -> StationaryBias {
        let address = self.settings.address;

        self.write(address, PWR_MGMT_1, PWR_MGMT_1_H_RESET);
        self.delay.delay_ms(100);
        self.write(address, PWR_MGMT_1, PWR_MGMT_1_CLKSEL_AUTO);
        self.write(address, PWR_MGMT_2, 0x00);
        self.delay.delay_ms(200);

        self.write(address, INT_ENABLE, 0x00);
        self.write(address, FIFO_EN, 0x00);
        self.write(address, PWR_MGMT_1, 0x00);
        self.write(address, I2C_MST_CTRL, 0x00);
        self.write(address, USER_CTRL, 0x00);
        self.write(address, USER_CTRL, USER_CTRL_FIFO_RESET);
        self.delay.delay_ms(15);

        self.write(address, CONFIG, DLPF_CFG_184HZ);
        self.write(address, SMPLRT_DIV, 0x00);
        self.write(address, GYRO_CONFIG, 0x00);
        self.write(address, ACCEL_CONFIG, 0x00);

        // 40 ms at 1 kHz fills 480 of the 512 FIFO bytes
        self.write(address, USER_CTRL, USER_CTRL_FIFO_EN);
        self.write(address, FIFO_EN, FIFO_EN_GYRO_ACCEL);
        self.delay.delay_ms(40);
        self.write(address, FIFO_EN, 0x00);

        let mut count = [0u8; 2];
        if self.read(address, FIFO_COUNTH, &mut count).is_err() {
            count = [0; 2];
        }
        let packets = u16::from_be_bytes(count) / FIFO_PACKET_LEN as u16;

        let mut accel_sum = Vector3::<i32>::zeros();
        let mut gyro_sum = Vector3::<i32>::zeros();
        let mut packet = [0u8; FIFO_PACKET_LEN];
        for _ in 0..packets {
            if self.read(address, FIFO_R_W, &mut packet).is_ok() {
                accel_sum += be_vector(&packet[0..6]).cast::<i32>();
                gyro_sum += be_vector(&packet[6..12]).cast::<i32>();
            }
        }
        debug!("FIFO packets: {}", packets);

        let bias = StationaryBias::from_sums(accel_sum, gyro_sum, packets);

        for (offset, byte) in bias.gyro_offset_registers().iter().enumerate() {
            self.write(address, XG_OFFSET_H + offset as u8, *byte);
        }

        let mut factory = [0i16; 3];
        for (word, register) in factory.iter_mut().zip([XA_OFFSET_H, YA_OFFSET_H, ZA_OFFSET_H]) {
            let mut bytes = [0u8; 2];
            if self.read(address, register, &mut bytes).is_ok() {
                *word = i16::from_be_bytes(bytes);
            }
        }
        let accel_offsets = bias.accel_offset_registers(factory);
        trace!("Accel offset registers: {:02x?}", accel_offsets);

        let accel = bias.accel_g() * 1000.0;
        let gyro = bias.gyro_dps();
        info!(
            "Accel biases (mg): {:.2} {:.2} {:.2}",
            accel.x, accel.y, accel.z
        );
        info!("Gyro biases (dps): {:.2} {:.2} {:.2}", gyro.x, gyro.y, gyro.z);

        bias
    }

    /// Record the magnetometer envelope while the device is waved in a figure eight
    ///
    /// Blocks for about 19 s: a 4 s lead-in, then ~15 s of readings.
    pub fn calibrate_mag(&mut self) -> MagSweep {
        info!("Mag calibration: wave device in a figure eight until done!");
        self.delay.delay_ms(4000);

        let mut sweep = MagSweep::new();
        let rate = self.settings.mag_rate;
        for _ in 0..rate.sweep_samples() {
            if let Ok(Some(raw)) = self.read_mag() {
                sweep.update(raw);
            }
            self.delay.delay_ms(rate.sweep_interval_ms());
        }

        info!("Mag calibration done!");
        sweep
    }

    /// Put both sensors to sleep
    pub fn sleep(&mut self) {
        let address = self.settings.address;
        self.write(address, PWR_MGMT_1, PWR_MGMT_1_STANDBY);
        self.delay.delay_ms(100);
        self.write(address, PWR_MGMT_1, PWR_MGMT_1_SLEEP_CYCLE);
        self.delay.delay_ms(100);
        self.write(AK8963_ADDR, AK8963_CNTL1, AK8963_MODE_POWER_DOWN);
        self.delay.delay_ms(100);
        info!("Sensors asleep");
    }

    /// Mean accelerometer and gyroscope counts over `samples` reads
    fn average_outputs(&mut self, samples: u16) -> (Vector3<i32>, Vector3<i32>) {
        let address = self.settings.address;
        let mut accel = Vector3::<i32>::zeros();
        let mut gyro = Vector3::<i32>::zeros();
        let mut raw = [0u8; 6];

        for _ in 0..samples {
            if self.read(address, ACCEL_XOUT_H, &mut raw).is_ok() {
                accel += be_vector(&raw).cast::<i32>();
            }
            if self.read(address, GYRO_XOUT_H, &mut raw).is_ok() {
                gyro += be_vector(&raw).cast::<i32>();
            }
        }

        let samples = samples as i32;
        (accel / samples, gyro / samples)
    }

    fn write(&mut self, address: u8, register: u8, value: u8) {
        if let Err(err) = self.i2c.write(address, &[register, value]) {
            error!(
                "I2C write {:#04x}/{:#04x} failed: {:?}",
                address,
                register,
                err.kind()
            );
        }
    }

    fn read(&mut self, address: u8, register: u8, buffer: &mut [u8]) -> Result<(), Error> {
        self.i2c
            .write_read(address, &[register], buffer)
            .map_err(|err| {
                error!(
                    "I2C read {:#04x}/{:#04x} failed: {:?}",
                    address,
                    register,
                    err.kind()
                );
                Error::bus(err)
            })
    }

    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, Error> {
        let mut buffer = [0u8; 1];
        self.read(address, register, &mut buffer)?;
        Ok(buffer[0])
    }
}

/// Three big-endian words
fn be_vector(bytes: &[u8]) -> Vector3<i16> {
    Vector3::new(
        i16::from_be_bytes([bytes[0], bytes[1]]),
        i16::from_be_bytes([bytes[2], bytes[3]]),
        i16::from_be_bytes([bytes[4], bytes[5]]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_be_vector() {
        let v = be_vector(&[0x40, 0x00, 0xFF, 0xFE, 0x80, 0x00]);
        assert_eq!(v, Vector3::new(16384, -2, i16::MIN));
    }

    #[test]
    fn test_temperature_celsius() {
        assert_eq!(temperature_celsius(0), 21.0);
        assert!((temperature_celsius(3339) - 31.0).abs() < 0.01);
    }
}
