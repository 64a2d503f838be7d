//! In-memory MPU-9250 / AK8963 for driver and buoy tests

#![allow(dead_code)]

use std::collections::VecDeque;

use buoy_fusion::registers::*;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

/// Register file for both chips with an auto-incrementing pointer
///
/// Writes store their payload starting at the addressed register. Reads
/// return register contents, except for `FIFO_R_W` which drains the FIFO
/// queue and the 14-byte accel/gyro burst which takes its Z acceleration
/// from `accel_z` while that queue lasts.
#[derive(Debug)]
pub struct FakeBus {
    pub mpu: [u8; 128],
    pub mag: [u8; 32],
    pub writes: Vec<(u8, u8, u8)>,
    pub fifo: VecDeque<u8>,
    pub accel_z: VecDeque<i16>,
    pub offline: Option<u8>,
    pointer: u8,
}

impl FakeBus {
    /// A level, still device with a field in the accelerometer x-z plane
    pub fn new() -> Self {
        let mut bus = FakeBus {
            mpu: [0; 128],
            mag: [0; 32],
            writes: Vec::new(),
            fifo: VecDeque::new(),
            accel_z: VecDeque::new(),
            offline: None,
            pointer: 0,
        };
        bus.mpu[WHO_AM_I as usize] = MPU9250_WHO_AM_I_VALUE;
        bus.mpu[INT_STATUS as usize] = INT_STATUS_RAW_DATA_RDY;
        for register in [
            SELF_TEST_X_ACCEL,
            SELF_TEST_Y_ACCEL,
            SELF_TEST_Z_ACCEL,
            SELF_TEST_X_GYRO,
            SELF_TEST_Y_GYRO,
            SELF_TEST_Z_GYRO,
        ] {
            bus.mpu[register as usize] = 0x60;
        }
        bus.set_accel([0, 0, 16384]);
        bus.set_gyro([0, 0, 0]);

        bus.mag[AK8963_WIA as usize] = AK8963_WHO_AM_I_VALUE;
        bus.mag[AK8963_ST1 as usize] = AK8963_ST1_DRDY;
        for i in 0..3 {
            bus.mag[AK8963_ASAX as usize + i] = 128;
        }
        // X and Y are swapped on the AK8963, so the field sits on its Y axis
        bus.set_mag([0, 200, -400]);
        bus
    }

    pub fn set_accel(&mut self, counts: [i16; 3]) {
        self.set_be_words(ACCEL_XOUT_H, counts);
    }

    pub fn set_gyro(&mut self, counts: [i16; 3]) {
        self.set_be_words(GYRO_XOUT_H, counts);
    }

    pub fn set_temperature(&mut self, counts: i16) {
        let start = TEMP_OUT_H as usize;
        self.mpu[start..start + 2].copy_from_slice(&counts.to_be_bytes());
    }

    pub fn set_mag(&mut self, counts: [i16; 3]) {
        for (i, value) in counts.iter().enumerate() {
            let start = AK8963_HXL as usize + 2 * i;
            self.mag[start..start + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Queue one FIFO packet: accel then gyro, big-endian
    pub fn push_fifo_packet(&mut self, accel: [i16; 3], gyro: [i16; 3]) {
        for word in accel.iter().chain(gyro.iter()) {
            self.fifo.extend(word.to_be_bytes());
        }
        let count = self.fifo.len() as u16;
        let start = FIFO_COUNTH as usize;
        self.mpu[start..start + 2].copy_from_slice(&count.to_be_bytes());
    }

    /// Values written to `register` on `address`, oldest first
    pub fn writes_to(&self, address: u8, register: u8) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(a, r, _)| *a == address && *r == register)
            .map(|(_, _, v)| *v)
            .collect()
    }

    fn set_be_words(&mut self, register: u8, counts: [i16; 3]) {
        for (i, value) in counts.iter().enumerate() {
            let start = register as usize + 2 * i;
            self.mpu[start..start + 2].copy_from_slice(&value.to_be_bytes());
        }
    }

    fn registers(&mut self, address: u8) -> Result<&mut [u8], ErrorKind> {
        match address {
            MPU9250_ADDR | MPU9250_ADDR_ALT => Ok(&mut self.mpu[..]),
            AK8963_ADDR => Ok(&mut self.mag[..]),
            _ => Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        }
    }

    fn write_bytes(&mut self, address: u8, bytes: &[u8]) -> Result<(), ErrorKind> {
        let Some((&register, payload)) = bytes.split_first() else {
            return Ok(());
        };
        self.pointer = register;
        for (i, &value) in payload.iter().enumerate() {
            let index = register as usize + i;
            self.writes.push((address, index as u8, value));
            if let Some(slot) = self.registers(address)?.get_mut(index) {
                *slot = value;
            }
        }
        Ok(())
    }

    fn read_bytes(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), ErrorKind> {
        if address == MPU9250_ADDR && self.pointer == FIFO_R_W {
            for byte in buffer.iter_mut() {
                *byte = self.fifo.pop_front().unwrap_or(0);
            }
            return Ok(());
        }

        if address == MPU9250_ADDR && self.pointer == ACCEL_XOUT_H && buffer.len() == 14 {
            if let Some(z) = self.accel_z.pop_front() {
                let start = ACCEL_XOUT_H as usize + 4;
                self.mpu[start..start + 2].copy_from_slice(&z.to_be_bytes());
            }
        }

        let start = self.pointer as usize;
        let registers = self.registers(address)?;
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = registers.get(start + i).copied().unwrap_or(0);
        }
        Ok(())
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.offline == Some(address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write_bytes(address, bytes)?,
                Operation::Read(buffer) => self.read_bytes(address, buffer)?,
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and remembers how long it was asked to wait
#[derive(Debug, Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}
