// TiltCue - Application State Machine
//
// Device-level state (uniform speed / turning / accelerating / braking) with
// entry and exit side effects.  The transition table is a pure function so it
// can be checked without hardware; `StateMachine` executes the side effects
// against the display and rotation timer.

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::config::IDLE_VARIANT_COUNT;
use crate::events::{DisplayCue, MotionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    UniformSpeed,
    TurnLeft,
    TurnLeftHard,
    TurnRight,
    TurnRightHard,
    Accelerate,
    Brake,
}

/// A side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Show(DisplayCue),
    /// Show a randomly chosen idle screen.
    ShowIdle,
    StartRotationTimer,
    StopRotationTimer,
    /// Block the state-machine task for the configured hold.
    Hold,
}

impl AppState {
    pub fn on_enter(self) -> &'static [Effect] {
        match self {
            Self::UniformSpeed => &[Effect::ShowIdle, Effect::StartRotationTimer],
            Self::TurnLeft => &[Effect::Show(DisplayCue::TurnLeftStart)],
            Self::TurnLeftHard => &[Effect::Show(DisplayCue::TurnLeftHard)],
            Self::TurnRight => &[Effect::Show(DisplayCue::TurnRightStart)],
            Self::TurnRightHard => &[Effect::Show(DisplayCue::TurnRightHard)],
            Self::Accelerate => &[Effect::Show(DisplayCue::AccelerateStart)],
            Self::Brake => &[Effect::Show(DisplayCue::BrakeStart)],
        }
    }

    pub fn on_exit(self) -> &'static [Effect] {
        match self {
            Self::UniformSpeed => &[Effect::StopRotationTimer],
            Self::TurnLeft | Self::TurnLeftHard => &[Effect::Show(DisplayCue::TurnLeftEnd), Effect::Hold],
            Self::TurnRight | Self::TurnRightHard => &[Effect::Show(DisplayCue::TurnRightEnd), Effect::Hold],
            Self::Accelerate => &[Effect::Show(DisplayCue::AccelerateEnd), Effect::Hold],
            Self::Brake => &[Effect::Show(DisplayCue::BrakeEnd), Effect::Hold],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Pair not in the table.
    Ignore,
    /// Stay put, run side effects only.
    Refresh(&'static [Effect]),
    Change {
        to: AppState,
        exit: &'static [Effect],
        enter: &'static [Effect],
    },
}

impl Transition {
    pub fn next_state(&self, current: AppState) -> AppState {
        match self {
            Self::Change { to, .. } => *to,
            _ => current,
        }
    }

    /// Every side effect in execution order.
    pub fn effects(&self) -> Vec<Effect> {
        match self {
            Self::Ignore => Vec::new(),
            Self::Refresh(effects) => effects.to_vec(),
            Self::Change { exit, enter, .. } => exit.iter().chain(enter.iter()).copied().collect(),
        }
    }
}

/// The transition table.
pub fn transition(state: AppState, event: MotionEvent) -> Transition {
    use AppState as S;
    use MotionEvent as E;

    let to = match (state, event) {
        (S::UniformSpeed, E::TurnLeftNormal) => S::TurnLeft,
        (S::UniformSpeed, E::TurnLeftHard) => S::TurnLeftHard,
        (S::UniformSpeed, E::TurnRightNormal) => S::TurnRight,
        (S::UniformSpeed, E::TurnRightHard) => S::TurnRightHard,
        (S::UniformSpeed, E::Accelerate) => S::Accelerate,
        (S::UniformSpeed, E::Brake) => S::Brake,
        (S::UniformSpeed, E::UniformUiTimerTick) => return Transition::Refresh(&[Effect::ShowIdle]),
        (
            S::TurnLeft | S::TurnLeftHard | S::TurnRight | S::TurnRightHard | S::Accelerate | S::Brake,
            E::MotionEnded,
        ) => S::UniformSpeed,
        _ => return Transition::Ignore,
    };

    if to == state {
        return Transition::Ignore;
    }
    Transition::Change {
        to,
        exit: state.on_exit(),
        enter: to.on_enter(),
    }
}

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Fire-and-forget display commands.
pub trait DisplayService {
    fn show(&mut self, cue: DisplayCue);
}

/// Repeating idle-rotation timer.  `start` on a running timer restarts its
/// period.
pub trait RotationTimer {
    fn start(&mut self);
    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct StateMachine<D, T, R> {
    state: AppState,
    display: D,
    timer: T,
    rng: R,
    hold: Duration,
}

impl<D: DisplayService, T: RotationTimer, R: Rng> StateMachine<D, T, R> {
    pub fn new(initial: AppState, display: D, timer: T, rng: R, hold: Duration) -> Self {
        Self {
            state: initial,
            display,
            timer,
            rng,
            hold,
        }
    }

    /// Run the initial state's entry action.  Call once before feeding events.
    pub fn start(&mut self) {
        log::info!("Entering {:?}", self.state);
        self.run(self.state.on_enter());
    }

    /// Apply one event; returns the state after the transition.
    pub fn handle(&mut self, event: MotionEvent) -> AppState {
        match transition(self.state, event) {
            Transition::Ignore => {
                log::debug!("{:?} ignores {}", self.state, event.name());
            }
            Transition::Refresh(effects) => self.run(effects),
            Transition::Change { to, exit, enter } => {
                log::info!("Leaving {:?} on {}", self.state, event.name());
                self.run(exit);
                self.state = to;
                log::info!("Entering {:?}", self.state);
                self.run(enter);
            }
        }
        self.state
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    fn run(&mut self, effects: &[Effect]) {
        for effect in effects {
            match *effect {
                Effect::Show(cue) => self.display.show(cue),
                Effect::ShowIdle => {
                    let variant = self.rng.random_range(0..IDLE_VARIANT_COUNT);
                    self.display.show(DisplayCue::Idle(variant));
                }
                Effect::StartRotationTimer => self.timer.start(),
                Effect::StopRotationTimer => self.timer.stop(),
                Effect::Hold => {
                    if !self.hold.is_zero() {
                        thread::sleep(self.hold);
                    }
                }
            }
        }
    }
}
