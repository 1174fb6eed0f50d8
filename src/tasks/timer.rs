// TiltCue - Periodic Software Timer
//
// Auto-reloading timer on its own thread.  Stopped timers sleep on a condvar;
// `start` (re)arms a full period, `stop` disarms without firing.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::channel::EventSender;
use crate::config::STACK_TIMER;
use crate::events::MotionEvent;
use crate::statemachine::RotationTimer;

#[derive(Default)]
struct TimerState {
    armed: bool,
    // Bumped on every start/stop so a pending wait knows it was superseded.
    generation: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct PeriodicTimer {
    shared: Arc<Shared>,
}

impl PeriodicTimer {
    /// Spawn the timer thread.  The timer starts disarmed.
    pub fn spawn<F>(name: &str, period: Duration, callback: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState::default()),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        thread::Builder::new()
            .name(name.into())
            .stack_size(STACK_TIMER)
            .spawn(move || timer_loop(&worker, period, callback))?;

        Ok(Self { shared })
    }

    /// Timer that posts `UniformUiTimerTick` to the event channel.
    pub fn ui_rotation(period: Duration, events: EventSender) -> std::io::Result<Self> {
        Self::spawn("ui_timer", period, move || {
            // Overflow is logged by the sender; the next period retries.
            let _ = events.post(MotionEvent::UniformUiTimerTick);
        })
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().armed
    }

    fn set_armed(&self, armed: bool) {
        let mut state = self.shared.lock();
        state.armed = armed;
        state.generation = state.generation.wrapping_add(1);
        self.shared.wake.notify_all();
    }
}

impl RotationTimer for PeriodicTimer {
    fn start(&mut self) {
        self.set_armed(true);
    }

    fn stop(&mut self) {
        self.set_armed(false);
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
    }
}

fn timer_loop<F: Fn()>(shared: &Shared, period: Duration, callback: F) {
    let mut state = shared.lock();
    loop {
        state = shared
            .wake
            .wait_while(state, |s| !s.armed && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        if state.shutdown {
            return;
        }

        let generation = state.generation;
        let (guard, timeout) = shared
            .wake
            .wait_timeout_while(state, period, |s| {
                s.armed && s.generation == generation && !s.shutdown
            })
            .unwrap_or_else(PoisonError::into_inner);
        state = guard;

        if timeout.timed_out() && state.armed && state.generation == generation && !state.shutdown {
            drop(state);
            callback();
            state = shared.lock();
        }
    }
}
