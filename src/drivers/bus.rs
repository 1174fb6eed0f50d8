// TiltCue - Shared I2C Bus
//
// The MPU6050 and the OLED sit on one bus.  Drivers hold a `'static` mutex
// around it and go through this trait, so they build on the host as well.

use std::fmt;
use std::sync::Mutex;

/// Register-level access to an I2C controller.
pub trait I2cBus {
    type Error: fmt::Debug + fmt::Display;

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Self::Error>;
    fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// Thread-safe handle to a shared I2C bus.
pub type SharedBus<B> = &'static Mutex<B>;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_hal::i2c::I2cDriver;
    use esp_idf_sys::EspError;

    use super::I2cBus;
    use crate::config::I2C_TIMEOUT_TICKS;

    impl I2cBus for I2cDriver<'_> {
        type Error = EspError;

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), EspError> {
            I2cDriver::write(self, addr, bytes, I2C_TIMEOUT_TICKS)
        }

        fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), EspError> {
            I2cDriver::write_read(self, addr, bytes, buffer, I2C_TIMEOUT_TICKS)
        }
    }
}
