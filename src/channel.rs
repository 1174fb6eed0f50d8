// TiltCue - Event Channel
//
// Bounded FIFO between the producers (sampling task, UI rotation timer) and
// the single state-machine consumer.  Producers never block: a full queue
// drops the event.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use thiserror::Error;

use crate::events::MotionEvent;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("event queue full, dropped {}", .0.name())]
    Full(MotionEvent),
    #[error("event consumer gone, dropped {}", .0.name())]
    Disconnected(MotionEvent),
}

/// Create a queue holding at most `capacity` undelivered events.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    let sender = EventSender {
        tx,
        dropped: Arc::new(AtomicU32::new(0)),
    };
    (sender, EventReceiver { rx })
}

/// Cloneable producer handle; clones share the drop counter.
#[derive(Clone)]
pub struct EventSender {
    tx: SyncSender<MotionEvent>,
    dropped: Arc<AtomicU32>,
}

impl EventSender {
    /// Enqueue without blocking.  Failures are logged and counted here, the
    /// error is returned for callers that care.
    pub fn post(&self, event: MotionEvent) -> Result<(), SendError> {
        let err = match self.tx.try_send(event) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(ev)) => SendError::Full(ev),
            Err(TrySendError::Disconnected(ev)) => SendError::Disconnected(ev),
        };
        self.dropped.fetch_add(1, Ordering::Relaxed);
        log::warn!("{}", err);
        Err(err)
    }

    /// Events dropped by this sender and its clones.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct EventReceiver {
    rx: Receiver<MotionEvent>,
}

impl EventReceiver {
    /// Block until the next event.  `None` once every sender is gone.
    pub fn recv(&self) -> Option<MotionEvent> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<MotionEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = event_channel(4);
        tx.post(MotionEvent::TurnLeftNormal).unwrap();
        tx.post(MotionEvent::MotionEnded).unwrap();
        tx.post(MotionEvent::Accelerate).unwrap();
        assert_eq!(rx.try_recv(), Some(MotionEvent::TurnLeftNormal));
        assert_eq!(rx.try_recv(), Some(MotionEvent::MotionEnded));
        assert_eq!(rx.try_recv(), Some(MotionEvent::Accelerate));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_overflow_drops_and_counts() {
        let (tx, rx) = event_channel(10);
        for _ in 0..10 {
            assert!(tx.post(MotionEvent::Accelerate).is_ok());
        }
        assert_eq!(
            tx.post(MotionEvent::MotionEnded),
            Err(SendError::Full(MotionEvent::MotionEnded))
        );
        assert_eq!(tx.dropped(), 1);

        let drained: Vec<_> = std::iter::from_fn(|| rx.try_recv()).collect();
        assert_eq!(drained, vec![MotionEvent::Accelerate; 10]);
    }

    #[test]
    fn test_clones_share_drop_counter() {
        let (tx, _rx) = event_channel(1);
        let timer_tx = tx.clone();
        tx.post(MotionEvent::Accelerate).unwrap();
        assert!(timer_tx.post(MotionEvent::UniformUiTimerTick).is_err());
        assert_eq!(tx.dropped(), 1);
    }

    #[test]
    fn test_disconnected_consumer() {
        let (tx, rx) = event_channel(2);
        drop(rx);
        assert_eq!(
            tx.post(MotionEvent::Brake),
            Err(SendError::Disconnected(MotionEvent::Brake))
        );
    }

    #[test]
    fn test_recv_blocks_until_event() {
        let (tx, rx) = event_channel(2);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            tx.post(MotionEvent::TurnRightHard).unwrap();
        });
        assert_eq!(rx.recv(), Some(MotionEvent::TurnRightHard));
        producer.join().unwrap();
        // Sender dropped with the producer thread.
        assert_eq!(rx.recv(), None);
    }
}
