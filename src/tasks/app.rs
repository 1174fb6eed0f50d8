// TiltCue - Application Task
//
// Single consumer of the event channel.  Runs the initial entry action, then
// applies events in arrival order until every producer has gone away.

use rand::Rng;

use crate::channel::EventReceiver;
use crate::statemachine::{AppState, DisplayService, RotationTimer, StateMachine};

/// Returns the final state once the channel closes (only reachable on the
/// host; on the device the producers live forever).
pub fn app_task<D, T, R>(mut machine: StateMachine<D, T, R>, events: EventReceiver) -> AppState
where
    D: DisplayService,
    T: RotationTimer,
    R: Rng,
{
    log::info!("App task started");
    machine.start();

    let mut handled: u32 = 0;
    while let Some(event) = events.recv() {
        log::debug!("Event: {}", event.name());
        machine.handle(event);
        handled = handled.wrapping_add(1);
    }

    log::info!("Event channel closed after {} events, final state {:?}", handled, machine.state());
    machine.state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event_channel;
    use crate::events::{DisplayCue, MotionEvent};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedScreen(Arc<Mutex<Vec<DisplayCue>>>);

    impl DisplayService for SharedScreen {
        fn show(&mut self, cue: DisplayCue) {
            self.0.lock().unwrap().push(cue);
        }
    }

    struct NoTimer;

    impl RotationTimer for NoTimer {
        fn start(&mut self) {}
        fn stop(&mut self) {}
    }

    #[test]
    fn test_drains_in_order_and_returns_on_close() {
        let screen = SharedScreen::default();
        let machine = StateMachine::new(
            AppState::UniformSpeed,
            screen.clone(),
            NoTimer,
            StdRng::seed_from_u64(3),
            Duration::ZERO,
        );
        let (tx, rx) = event_channel(10);
        tx.post(MotionEvent::TurnRightNormal).unwrap();
        tx.post(MotionEvent::Accelerate).unwrap();
        tx.post(MotionEvent::MotionEnded).unwrap();
        tx.post(MotionEvent::Accelerate).unwrap();
        drop(tx);

        assert_eq!(app_task(machine, rx), AppState::Accelerate);

        let cues = screen.0.lock().unwrap();
        assert!(matches!(cues[0], DisplayCue::Idle(_)));
        assert_eq!(cues[1], DisplayCue::TurnRightStart);
        assert_eq!(cues[2], DisplayCue::TurnRightEnd);
        assert!(matches!(cues[3], DisplayCue::Idle(_)));
        assert_eq!(cues[4], DisplayCue::AccelerateStart);
        assert_eq!(cues.len(), 5);
    }
}
