// TiltCue - Sensor Sampler
//
// Pulls raw counts from the inertial sensor and converts them to g and
// degrees/second with scale factors fetched once at startup.

use std::fmt;

use crate::events::{PhysicalSample, RawSample};

/// Scale factors for the sensor's configured full-scale ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    pub accel_lsb_per_g: f32,
    pub gyro_lsb_per_dps: f32,
}

impl Sensitivity {
    pub fn convert(&self, raw: &RawSample) -> PhysicalSample {
        let a = |v: i16| v as f32 / self.accel_lsb_per_g;
        let g = |v: i16| v as f32 / self.gyro_lsb_per_dps;
        PhysicalSample {
            ax: a(raw.accel[0]),
            ay: a(raw.accel[1]),
            az: a(raw.accel[2]),
            gx: g(raw.gyro[0]),
            gy: g(raw.gyro[1]),
            gz: g(raw.gyro[2]),
        }
    }
}

/// The inertial sensor as seen by the sampling task.
pub trait InertialSensor {
    type Error: fmt::Debug + fmt::Display;

    fn read_raw(&mut self) -> Result<RawSample, Self::Error>;
    fn sensitivities(&mut self) -> Result<Sensitivity, Self::Error>;
}

pub struct Sampler<S> {
    sensor: S,
    sensitivity: Sensitivity,
}

impl<S: InertialSensor> Sampler<S> {
    /// Fetch the sensitivities once; they are cached for the sampler's lifetime.
    pub fn new(mut sensor: S) -> Result<Self, S::Error> {
        let sensitivity = sensor.sensitivities()?;
        log::info!(
            "Sensitivity: {} LSB/g, {} LSB/(°/s)",
            sensitivity.accel_lsb_per_g,
            sensitivity.gyro_lsb_per_dps
        );
        Ok(Self { sensor, sensitivity })
    }

    pub fn sample(&mut self) -> Result<PhysicalSample, S::Error> {
        let raw = self.sensor.read_raw()?;
        Ok(self.sensitivity.convert(&raw))
    }
}
