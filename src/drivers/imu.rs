// TiltCue - MPU6050 IMU Driver
//
// Register-level driver over the shared I2C bus.

use std::fmt;

use thiserror::Error;

use crate::config::*;
use crate::drivers::bus::{I2cBus, SharedBus};
use crate::events::RawSample;
use crate::sampler::{InertialSensor, Sensitivity};

// MPU6050 register addresses
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte sensor burst
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

const DLPF_44HZ: u8 = 0x03;
const FS_SHIFT: u8 = 3;

#[derive(Debug, Error)]
pub enum ImuError<E: fmt::Debug + fmt::Display> {
    #[error("I2C bus error: {0}")]
    Bus(E),
    #[error("I2C bus lock poisoned")]
    BusPoisoned,
    #[error("unexpected WHO_AM_I 0x{0:02x}")]
    BadWhoAmI(u8),
}

/// Accelerometer full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelRange {
    G2 = 0,
    G4 = 1,
    G8 = 2,
    G16 = 3,
}

impl AccelRange {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::G2,
            1 => Self::G4,
            2 => Self::G8,
            _ => Self::G16,
        }
    }

    /// LSB per g.
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::G2 => 16384.0,
            Self::G4 => 8192.0,
            Self::G8 => 4096.0,
            Self::G16 => 2048.0,
        }
    }
}

/// Gyroscope full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroRange {
    Dps250 = 0,
    Dps500 = 1,
    Dps1000 = 2,
    Dps2000 = 3,
}

impl GyroRange {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Dps250,
            1 => Self::Dps500,
            2 => Self::Dps1000,
            _ => Self::Dps2000,
        }
    }

    /// LSB per degree/second.
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::Dps250 => 131.0,
            Self::Dps500 => 65.5,
            Self::Dps1000 => 32.8,
            Self::Dps2000 => 16.4,
        }
    }
}

pub struct Mpu6050<B: 'static> {
    bus: SharedBus<B>,
}

impl<B: I2cBus + 'static> Mpu6050<B> {
    pub fn new(bus: SharedBus<B>) -> Self {
        Self { bus }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        matches!(self.who_am_i(), Ok(WHO_AM_I_EXPECTED))
    }

    pub fn who_am_i(&self) -> Result<u8, ImuError<B::Error>> {
        let mut buf = [0u8; 1];
        self.read(REG_WHO_AM_I, &mut buf)?;
        Ok(buf[0])
    }

    /// Probe, wake the sensor and configure the full-scale ranges.
    pub fn init(&self, accel: AccelRange, gyro: GyroRange) -> Result<(), ImuError<B::Error>> {
        let id = self.who_am_i()?;
        if id != WHO_AM_I_EXPECTED {
            return Err(ImuError::BadWhoAmI(id));
        }

        // Wake up (clear SLEEP bit)
        self.write(REG_PWR_MGMT_1, 0x00)?;
        self.write(REG_CONFIG, DLPF_44HZ)?;
        self.write(REG_GYRO_CONFIG, (gyro as u8) << FS_SHIFT)?;
        self.write(REG_ACCEL_CONFIG, (accel as u8) << FS_SHIFT)?;

        log::info!("MPU6050 initialised ({:?}, {:?}, DLPF 44Hz)", accel, gyro);
        Ok(())
    }

    /// Full-scale ranges as currently configured in the device.
    pub fn ranges(&self) -> Result<(AccelRange, GyroRange), ImuError<B::Error>> {
        let mut gyro_cfg = [0u8; 1];
        let mut accel_cfg = [0u8; 1];
        self.read(REG_GYRO_CONFIG, &mut gyro_cfg)?;
        self.read(REG_ACCEL_CONFIG, &mut accel_cfg)?;
        Ok((
            AccelRange::from_bits(accel_cfg[0] >> FS_SHIFT),
            GyroRange::from_bits(gyro_cfg[0] >> FS_SHIFT),
        ))
    }

    /// Burst-read all 6 axes as raw counts.
    pub fn read_raw(&self) -> Result<RawSample, ImuError<B::Error>> {
        let mut raw = [0u8; 14];
        self.read(REG_ACCEL_XOUT_H, &mut raw)?;

        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);
        Ok(RawSample {
            accel: [word(0), word(2), word(4)],
            // raw[6..8] = temperature, skipped
            gyro: [word(8), word(10), word(12)],
        })
    }

    fn read(&self, reg: u8, buf: &mut [u8]) -> Result<(), ImuError<B::Error>> {
        let mut bus = self.bus.lock().map_err(|_| ImuError::BusPoisoned)?;
        bus.write_read(I2C_ADDR_MPU6050, &[reg], buf).map_err(ImuError::Bus)
    }

    fn write(&self, reg: u8, value: u8) -> Result<(), ImuError<B::Error>> {
        let mut bus = self.bus.lock().map_err(|_| ImuError::BusPoisoned)?;
        bus.write(I2C_ADDR_MPU6050, &[reg, value]).map_err(ImuError::Bus)
    }
}

impl<B: I2cBus + 'static> InertialSensor for Mpu6050<B> {
    type Error = ImuError<B::Error>;

    fn read_raw(&mut self) -> Result<RawSample, Self::Error> {
        Mpu6050::read_raw(self)
    }

    fn sensitivities(&mut self) -> Result<Sensitivity, Self::Error> {
        let (accel, gyro) = self.ranges()?;
        Ok(Sensitivity {
            accel_lsb_per_g: accel.sensitivity(),
            gyro_lsb_per_dps: gyro.sensitivity(),
        })
    }
}
