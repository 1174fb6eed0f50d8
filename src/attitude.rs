// TiltCue - Attitude Estimator
//
// Complementary filter: integrated gyro rate carries the short-term angle,
// accelerometer tilt slowly pulls it back against drift.

use crate::events::{Attitude, PhysicalSample};

/// Roll/pitch implied by the gravity vector alone, in degrees.
pub fn accel_tilt(sample: &PhysicalSample) -> Attitude {
    Attitude {
        roll: sample.ay.atan2(sample.az).to_degrees(),
        pitch: sample.ax.atan2(sample.az).to_degrees(),
    }
}

/// One filter step from `prev` given a new sample and `dt` seconds.
pub fn fuse(prev: Attitude, sample: &PhysicalSample, dt: f32, alpha: f32) -> Attitude {
    let tilt = accel_tilt(sample);
    Attitude {
        roll: alpha * (prev.roll + sample.gx * dt) + (1.0 - alpha) * tilt.roll,
        pitch: alpha * (prev.pitch + sample.gy * dt) + (1.0 - alpha) * tilt.pitch,
    }
}

pub struct ComplementaryFilter {
    attitude: Attitude,
    alpha: f32,
}

impl ComplementaryFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            attitude: Attitude::default(),
            alpha,
        }
    }

    /// Fold a sample into the running estimate and return it.
    pub fn update(&mut self, sample: &PhysicalSample, dt: f32) -> Attitude {
        self.attitude = fuse(self.attitude, sample, dt, self.alpha);
        self.attitude
    }

    pub fn attitude(&self) -> Attitude {
        self.attitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    fn level() -> PhysicalSample {
        PhysicalSample {
            az: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_level_device_stays_level() {
        let mut filter = ComplementaryFilter::new(0.99);
        for _ in 0..100 {
            filter.update(&level(), DT);
        }
        let att = filter.attitude();
        assert!(att.roll.abs() < 1e-4);
        assert!(att.pitch.abs() < 1e-4);
    }

    #[test]
    fn test_accel_tilt_angles() {
        let s = PhysicalSample {
            ay: 1.0,
            az: 1.0,
            ..Default::default()
        };
        assert!((accel_tilt(&s).roll - 45.0).abs() < 1e-3);
        assert!(accel_tilt(&s).pitch.abs() < 1e-3);
    }

    #[test]
    fn test_single_step_matches_formula() {
        let prev = Attitude { roll: 10.0, pitch: -5.0 };
        let s = PhysicalSample {
            ax: 0.0,
            ay: 0.5,
            az: 0.5,
            gx: 100.0,
            gy: -50.0,
            gz: 0.0,
        };
        let next = fuse(prev, &s, DT, 0.99);
        // roll: 0.99 * (10 + 2) + 0.01 * 45
        assert!((next.roll - (0.99 * 12.0 + 0.01 * 45.0)).abs() < 1e-3);
        // pitch: 0.99 * (-5 - 1) + 0.01 * 0
        assert!((next.pitch - (0.99 * -6.0)).abs() < 1e-3);
    }

    #[test]
    fn test_gyro_dominates_short_term() {
        let mut filter = ComplementaryFilter::new(0.99);
        // 90 deg/s roll rate for 0.2 s with the accelerometer still reading level.
        let s = PhysicalSample {
            az: 1.0,
            gx: 90.0,
            ..Default::default()
        };
        for _ in 0..10 {
            filter.update(&s, DT);
        }
        let roll = filter.attitude().roll;
        assert!(roll > 16.0 && roll < 18.0, "roll = {roll}");
    }

    #[test]
    fn test_converges_to_accel_tilt() {
        let mut filter = ComplementaryFilter::new(0.99);
        let tilted = PhysicalSample {
            ay: 0.5,
            az: 0.866,
            ..Default::default()
        };
        for _ in 0..2000 {
            filter.update(&tilted, DT);
        }
        assert!((filter.attitude().roll - 30.0).abs() < 0.1);
    }
}
