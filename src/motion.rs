// TiltCue - Motion Classifier
//
// Roll-angle state machine (straight / turning left / turning right) with
// hysteresis, a hard/normal discriminator sampled on the turn-entry edge, and
// an independent accelerate detector on z-axis acceleration.

use crate::config::*;
use crate::events::{Attitude, MotionEvent, PhysicalSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Straight,
    TurningLeft,
    TurningRight,
}

/// How the accelerate condition is turned into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelTrigger {
    /// Emit every period the threshold is exceeded.
    #[default]
    Level,
    /// Emit once per crossing above the threshold.
    Edge,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    pub turn_enter_deg: f32,     // |roll| to enter a turn
    pub turn_exit_deg: f32,      // |roll| below which a turn ends
    pub hard_turn_rate_dps: f32, // |yaw rate| at entry for the hard variant
    pub accelerate_g: f32,       // z-axis acceleration threshold
    pub accel_trigger: AccelTrigger,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            turn_enter_deg: TURN_ENTER_DEG,
            turn_exit_deg: TURN_EXIT_DEG,
            hard_turn_rate_dps: HARD_TURN_RATE_DPS,
            accelerate_g: ACCELERATE_THRESHOLD_G,
            accel_trigger: AccelTrigger::Level,
        }
    }
}

/// The signals the classifier looks at for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionInput {
    pub roll_deg: f32,
    pub yaw_rate_dps: f32,
    pub accel_z_g: f32,
}

impl MotionInput {
    pub fn new(attitude: &Attitude, sample: &PhysicalSample) -> Self {
        Self {
            roll_deg: attitude.roll,
            yaw_rate_dps: sample.gz,
            accel_z_g: sample.az,
        }
    }
}

/// Events produced by one classification step (at most one turn-related event
/// and one accelerate pulse).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub turn: Option<MotionEvent>,
    pub accelerate: Option<MotionEvent>,
}

impl Classification {
    /// Events in posting order: turn transition first, then the pulse.
    pub fn events(&self) -> impl Iterator<Item = MotionEvent> {
        [self.turn, self.accelerate].into_iter().flatten()
    }
}

/// Pure turn-state transition: the next state, or `None` if roll stays
/// inside the current state's band.
pub fn next_action_state(state: ActionState, roll: f32, config: &ClassifierConfig) -> Option<ActionState> {
    match state {
        ActionState::Straight if roll > config.turn_enter_deg => Some(ActionState::TurningRight),
        ActionState::Straight if roll < -config.turn_enter_deg => Some(ActionState::TurningLeft),
        ActionState::TurningLeft if roll > -config.turn_exit_deg => Some(ActionState::Straight),
        ActionState::TurningRight if roll < config.turn_exit_deg => Some(ActionState::Straight),
        _ => None,
    }
}

pub struct MotionClassifier {
    config: ClassifierConfig,
    state: ActionState,
    accel_active: bool,
}

impl MotionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            state: ActionState::Straight,
            accel_active: false,
        }
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Classify one period's signals.
    pub fn update(&mut self, input: MotionInput) -> Classification {
        let turn = next_action_state(self.state, input.roll_deg, &self.config).map(|next| {
            let prev = self.state;
            self.state = next;
            let event = self.turn_event(next, input.yaw_rate_dps);
            log::info!(
                "Action {:?} -> {:?} (roll {:.1}°, yaw {:.1}°/s) => {}",
                prev,
                next,
                input.roll_deg,
                input.yaw_rate_dps,
                event.name()
            );
            event
        });

        Classification {
            turn,
            accelerate: self.accelerate_pulse(input.accel_z_g),
        }
    }

    fn turn_event(&self, entered: ActionState, yaw_rate_dps: f32) -> MotionEvent {
        let hard = yaw_rate_dps.abs() > self.config.hard_turn_rate_dps;
        match (entered, hard) {
            (ActionState::Straight, _) => MotionEvent::MotionEnded,
            (ActionState::TurningLeft, false) => MotionEvent::TurnLeftNormal,
            (ActionState::TurningLeft, true) => MotionEvent::TurnLeftHard,
            (ActionState::TurningRight, false) => MotionEvent::TurnRightNormal,
            (ActionState::TurningRight, true) => MotionEvent::TurnRightHard,
        }
    }

    fn accelerate_pulse(&mut self, accel_z_g: f32) -> Option<MotionEvent> {
        let above = accel_z_g > self.config.accelerate_g;
        let was_above = std::mem::replace(&mut self.accel_active, above);
        let fire = match self.config.accel_trigger {
            AccelTrigger::Level => above,
            AccelTrigger::Edge => above && !was_above,
        };
        fire.then_some(MotionEvent::Accelerate)
    }
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
