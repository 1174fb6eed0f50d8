// TiltCue - Sensor Task
//
// Every sample period: read the IMU, fuse into the attitude estimate,
// classify, and post the resulting events.  All four steps run in order on
// this task; nothing here blocks except the periodic wait.

use std::thread;
use std::time::{Duration, Instant};

use crate::attitude::ComplementaryFilter;
use crate::channel::EventSender;
use crate::events::Attitude;
use crate::motion::{MotionClassifier, MotionInput};
use crate::sampler::{InertialSensor, Sampler};

/// Absolute-deadline periodic wait (each deadline is the previous one plus
/// the period, so scheduling jitter does not accumulate).
pub struct PeriodicTicker {
    period: Duration,
    next: Instant,
}

impl PeriodicTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Sleep until the next deadline.  If more than a full period late, the
    /// schedule is re-anchored to now instead of bursting to catch up.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if let Some(remaining) = self.next.checked_duration_since(now) {
            thread::sleep(remaining);
            self.next += self.period;
        } else if now.duration_since(self.next) > self.period {
            log::debug!("Sampler overran by {:?}, re-anchoring", now.duration_since(self.next));
            self.next = now + self.period;
        } else {
            self.next += self.period;
        }
    }
}

/// Sampler, estimator and classifier owned by the sampling task.
pub struct MotionPipeline<S> {
    sampler: Sampler<S>,
    filter: ComplementaryFilter,
    classifier: MotionClassifier,
    dt: f32,
}

impl<S: InertialSensor> MotionPipeline<S> {
    pub fn new(sampler: Sampler<S>, filter: ComplementaryFilter, classifier: MotionClassifier, period: Duration) -> Self {
        Self {
            sampler,
            filter,
            classifier,
            dt: period.as_secs_f32(),
        }
    }

    /// Run one period.  On a read failure the estimate is held and nothing
    /// is classified.
    pub fn tick(&mut self, events: &EventSender) -> Attitude {
        let sample = match self.sampler.sample() {
            Ok(sample) => sample,
            Err(e) => {
                log::warn!("IMU read error: {}", e);
                return self.filter.attitude();
            }
        };

        let attitude = self.filter.update(&sample, self.dt);
        let classification = self.classifier.update(MotionInput::new(&attitude, &sample));
        for event in classification.events() {
            // Full queue is logged by the sender; the sampler never waits.
            let _ = events.post(event);
        }
        attitude
    }

    pub fn attitude(&self) -> Attitude {
        self.filter.attitude()
    }
}

pub fn sensor_task<S: InertialSensor>(mut pipeline: MotionPipeline<S>, events: EventSender, period: Duration) {
    log::info!("Sensor task started ({} ms period)", period.as_millis());

    let mut ticker = PeriodicTicker::new(period);
    loop {
        pipeline.tick(&events);
        ticker.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event_channel;
    use crate::events::{MotionEvent, RawSample};
    use crate::sampler::Sensitivity;

    /// Level sensor that fails on chosen reads and otherwise replays a roll
    /// rate.
    struct FlakySensor {
        reads: u32,
        fail_on: Vec<u32>,
        gyro_x: i16,
    }

    impl InertialSensor for FlakySensor {
        type Error = String;

        fn read_raw(&mut self) -> Result<RawSample, String> {
            self.reads += 1;
            if self.fail_on.contains(&self.reads) {
                return Err(format!("timeout on read {}", self.reads));
            }
            Ok(RawSample {
                accel: [0, 0, 1000],
                gyro: [self.gyro_x, 0, 0],
            })
        }

        fn sensitivities(&mut self) -> Result<Sensitivity, String> {
            Ok(Sensitivity {
                accel_lsb_per_g: 1000.0,
                gyro_lsb_per_dps: 1.0,
            })
        }
    }

    fn pipeline(fail_on: Vec<u32>, gyro_x: i16) -> MotionPipeline<FlakySensor> {
        let sampler = Sampler::new(FlakySensor {
            reads: 0,
            fail_on,
            gyro_x,
        })
        .unwrap();
        MotionPipeline::new(
            sampler,
            ComplementaryFilter::new(0.99),
            MotionClassifier::default(),
            Duration::from_millis(20),
        )
    }

    #[test]
    fn test_read_failure_holds_estimate() {
        let (tx, _rx) = event_channel(10);
        let mut p = pipeline(vec![3], 100);
        p.tick(&tx);
        let before = p.tick(&tx);
        let held = p.tick(&tx);
        assert_eq!(held, before);
        assert_eq!(p.attitude(), before);
        let after = p.tick(&tx);
        assert!(after.roll > before.roll);
    }

    #[test]
    fn test_roll_through_threshold_posts_turn() {
        let (tx, rx) = event_channel(10);
        // 500 °/s roll rate: ~10° per period, crosses 30° on the 4th tick.
        let mut p = pipeline(vec![], 500);
        for _ in 0..4 {
            p.tick(&tx);
        }
        assert_eq!(rx.try_recv(), Some(MotionEvent::TurnRightNormal));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_ticker_keeps_cadence() {
        let period = Duration::from_millis(5);
        let mut ticker = PeriodicTicker::new(period);
        let start = Instant::now();
        for _ in 0..6 {
            ticker.wait();
        }
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_ticker_reanchors_after_overrun() {
        let mut ticker = PeriodicTicker::new(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(30));
        ticker.wait();
        let start = Instant::now();
        ticker.wait();
        // Slept for a fresh period rather than returning immediately.
        assert!(start.elapsed() >= Duration::from_millis(3));
    }
}
