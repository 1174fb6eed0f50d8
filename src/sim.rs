// TiltCue - Simulated Ride
//
// Scripted stand-in for the MPU6050 used by the host build and the
// integration tests.  Roll is driven toward each phase's target at a bounded
// rate; the accelerometer reports the matching gravity vector and the gyro
// reports the actual roll rate, so the attitude filter sees a consistent
// device.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::drivers::imu::{AccelRange, GyroRange};
use crate::events::RawSample;
use crate::sampler::{InertialSensor, Sensitivity};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("simulated bus dropout on read {0}")]
    Dropout(u32),
}

/// One leg of a scripted ride.
#[derive(Debug, Clone, Copy)]
pub struct RidePhase {
    pub label: &'static str,
    pub duration: Duration,
    pub roll_deg: f32,
    /// Maximum roll rate while moving toward `roll_deg`.
    pub roll_rate_dps: f32,
    pub yaw_rate_dps: f32,
    /// Extra z-axis acceleration on top of gravity.
    pub surge_g: f32,
}

const fn phase(label: &'static str, ms: u64, roll_deg: f32, roll_rate_dps: f32, yaw_rate_dps: f32, surge_g: f32) -> RidePhase {
    RidePhase {
        label,
        duration: Duration::from_millis(ms),
        roll_deg,
        roll_rate_dps,
        yaw_rate_dps,
        surge_g,
    }
}

/// Right lean, hard left, a short burst, and a final lean that releases the
/// accelerate screen.
pub const DEMO_RIDE: [RidePhase; 9] = [
    phase("level", 1500, 0.0, 0.0, 0.0, 0.0),
    phase("lean right", 1500, 35.0, 50.0, 50.0, 0.0),
    phase("straighten", 2000, 0.0, 50.0, 0.0, 0.0),
    phase("hard left", 1000, -40.0, 150.0, -150.0, 0.0),
    phase("straighten", 2000, 0.0, 150.0, 0.0, 0.0),
    phase("accelerate", 200, 0.0, 0.0, 0.0, 0.35),
    phase("cruise", 1000, 0.0, 0.0, 0.0, 0.0),
    phase("lean right", 1000, 35.0, 50.0, 30.0, 0.0),
    phase("straighten", 2000, 0.0, 50.0, 0.0, 0.0),
];

pub struct SimulatedImu {
    script: Vec<RidePhase>,
    dt: f32,
    accel_range: AccelRange,
    gyro_range: GyroRange,
    phase: usize,
    ticks_in_phase: u32,
    roll_deg: f32,
    reads: u32,
    dropout_every: Option<u32>,
    noise: Option<(StdRng, f32, f32)>,
}

impl SimulatedImu {
    /// Noise-free replay of `script`, one step per read of length `period`.
    pub fn new(script: &[RidePhase], period: Duration) -> Self {
        Self {
            script: script.to_vec(),
            dt: period.as_secs_f32(),
            accel_range: AccelRange::G4,
            gyro_range: GyroRange::Dps500,
            phase: 0,
            ticks_in_phase: 0,
            roll_deg: 0.0,
            reads: 0,
            dropout_every: None,
            noise: None,
        }
    }

    /// The demo ride with a little sensor noise.
    pub fn demo(period: Duration, seed: u64) -> Self {
        Self::new(&DEMO_RIDE, period).with_noise(seed, 0.01, 0.5)
    }

    /// Add uniform noise of up to `accel_g` / `gyro_dps` to every axis.
    pub fn with_noise(mut self, seed: u64, accel_g: f32, gyro_dps: f32) -> Self {
        self.noise = Some((StdRng::seed_from_u64(seed), accel_g, gyro_dps));
        self
    }

    /// Fail every `n`th read.
    pub fn with_dropouts(mut self, n: u32) -> Self {
        self.dropout_every = (n > 0).then_some(n);
        self
    }

    pub fn script_duration(&self) -> Duration {
        self.script.iter().map(|p| p.duration).sum()
    }

    /// Name of the phase the next read falls in, `None` once the script is
    /// over (the device then stays level).
    pub fn current_phase(&self) -> Option<&'static str> {
        self.script.get(self.phase).map(|p| p.label)
    }

    pub fn roll_deg(&self) -> f32 {
        self.roll_deg
    }

    fn phase_ticks(&self, phase: &RidePhase) -> u32 {
        (phase.duration.as_secs_f32() / self.dt).round() as u32
    }

    /// Advance one period and return the true (physical) readings.
    fn step(&mut self) -> ([f32; 3], [f32; 3]) {
        let Some(current) = self.script.get(self.phase).copied() else {
            return ([0.0, self.roll_deg.to_radians().sin(), self.roll_deg.to_radians().cos()], [0.0; 3]);
        };

        let max_step = current.roll_rate_dps * self.dt;
        let delta = (current.roll_deg - self.roll_deg).clamp(-max_step, max_step);
        self.roll_deg += delta;

        let r = self.roll_deg.to_radians();
        let accel = [0.0, r.sin(), r.cos() + current.surge_g];
        let gyro = [delta / self.dt, 0.0, current.yaw_rate_dps];

        self.ticks_in_phase += 1;
        if self.ticks_in_phase >= self.phase_ticks(&current) {
            self.phase += 1;
            self.ticks_in_phase = 0;
            if let Some(next) = self.script.get(self.phase) {
                log::debug!("Ride phase: {}", next.label);
            }
        }
        (accel, gyro)
    }
}

fn to_counts(value: f32, lsb: f32) -> i16 {
    (value * lsb).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl InertialSensor for SimulatedImu {
    type Error = SimError;

    fn read_raw(&mut self) -> Result<RawSample, SimError> {
        self.reads += 1;
        if let Some(n) = self.dropout_every {
            if self.reads % n == 0 {
                return Err(SimError::Dropout(self.reads));
            }
        }

        let (mut accel, mut gyro) = self.step();
        if let Some((rng, accel_g, gyro_dps)) = self.noise.as_mut() {
            for a in accel.iter_mut() {
                *a += rng.random_range(-*accel_g..=*accel_g);
            }
            for g in gyro.iter_mut() {
                *g += rng.random_range(-*gyro_dps..=*gyro_dps);
            }
        }

        let a_lsb = self.accel_range.sensitivity();
        let g_lsb = self.gyro_range.sensitivity();
        Ok(RawSample {
            accel: accel.map(|v| to_counts(v, a_lsb)),
            gyro: gyro.map(|v| to_counts(v, g_lsb)),
        })
    }

    fn sensitivities(&mut self) -> Result<Sensitivity, SimError> {
        Ok(Sensitivity {
            accel_lsb_per_g: self.accel_range.sensitivity(),
            gyro_lsb_per_dps: self.gyro_range.sensitivity(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    #[test]
    fn test_level_device_reads_one_g() {
        let mut imu = SimulatedImu::new(&DEMO_RIDE, PERIOD);
        let raw = imu.read_raw().unwrap();
        assert_eq!(raw.accel, [0, 0, 8192]);
        assert_eq!(raw.gyro, [0, 0, 0]);
    }

    #[test]
    fn test_roll_ramps_at_bounded_rate() {
        let script = [phase("lean", 2000, 35.0, 50.0, 50.0, 0.0)];
        let mut imu = SimulatedImu::new(&script, PERIOD);
        for _ in 0..10 {
            let raw = imu.read_raw().unwrap();
            // 50 °/s at 65.5 LSB/(°/s)
            assert_eq!(raw.gyro[0], 3275);
            assert_eq!(raw.gyro[2], 3275);
        }
        assert!((imu.roll_deg() - 10.0).abs() < 1e-3);
        for _ in 0..40 {
            imu.read_raw().unwrap();
        }
        assert!((imu.roll_deg() - 35.0).abs() < 1e-3);
        assert_eq!(imu.read_raw().unwrap().gyro[0], 0);
    }

    #[test]
    fn test_phases_advance_and_end_level() {
        let script = [phase("a", 100, 0.0, 0.0, 0.0, 0.0), phase("b", 100, 0.0, 0.0, 0.0, 0.5)];
        let mut imu = SimulatedImu::new(&script, PERIOD);
        assert_eq!(imu.script_duration(), Duration::from_millis(200));
        for _ in 0..5 {
            imu.read_raw().unwrap();
        }
        assert_eq!(imu.current_phase(), Some("b"));
        assert_eq!(imu.read_raw().unwrap().accel[2], to_counts(1.5, 8192.0));
        for _ in 0..4 {
            imu.read_raw().unwrap();
        }
        assert_eq!(imu.current_phase(), None);
        assert_eq!(imu.read_raw().unwrap().accel, [0, 0, 8192]);
    }

    #[test]
    fn test_dropouts() {
        let mut imu = SimulatedImu::new(&DEMO_RIDE, PERIOD).with_dropouts(3);
        assert!(imu.read_raw().is_ok());
        assert!(imu.read_raw().is_ok());
        assert_eq!(imu.read_raw(), Err(SimError::Dropout(3)));
    }

    #[test]
    fn test_counts_saturate() {
        assert_eq!(to_counts(10.0, 8192.0), i16::MAX);
        assert_eq!(to_counts(-10.0, 8192.0), i16::MIN);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let mut a = SimulatedImu::demo(PERIOD, 42);
        let mut b = SimulatedImu::demo(PERIOD, 42);
        for _ in 0..20 {
            assert_eq!(a.read_raw(), b.read_raw());
        }
    }
}
