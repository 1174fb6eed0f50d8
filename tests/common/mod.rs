#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use tiltcue::events::DisplayCue;
use tiltcue::statemachine::{AppState, DisplayService, RotationTimer, StateMachine};

/// Display double that records every cue; clones share the record.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    cues: Arc<Mutex<Vec<DisplayCue>>>,
}

impl RecordingDisplay {
    pub fn cues(&self) -> Vec<DisplayCue> {
        self.cues.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<DisplayCue> {
        self.cues.lock().unwrap().last().copied()
    }
}

impl DisplayService for RecordingDisplay {
    fn show(&mut self, cue: DisplayCue) {
        self.cues.lock().unwrap().push(cue);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerLog {
    pub running: bool,
    pub starts: u32,
    pub stops: u32,
}

/// Rotation timer double; clones share the log.
#[derive(Clone, Default)]
pub struct FakeTimer {
    log: Arc<Mutex<TimerLog>>,
}

impl FakeTimer {
    pub fn log(&self) -> TimerLog {
        *self.log.lock().unwrap()
    }
}

impl RotationTimer for FakeTimer {
    fn start(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.running = true;
        log.starts += 1;
    }

    fn stop(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.running = false;
        log.stops += 1;
    }
}

/// Started machine in UniformSpeed with a seeded RNG and no exit hold.
pub fn started_machine(
    display: &RecordingDisplay,
    timer: &FakeTimer,
) -> StateMachine<RecordingDisplay, FakeTimer, StdRng> {
    let mut machine = StateMachine::new(
        AppState::UniformSpeed,
        display.clone(),
        timer.clone(),
        StdRng::seed_from_u64(0xC0FFEE),
        Duration::ZERO,
    );
    machine.start();
    machine
}

pub fn is_idle(cue: DisplayCue) -> bool {
    matches!(cue, DisplayCue::Idle(v) if v < tiltcue::config::IDLE_VARIANT_COUNT)
}
