//! Session notifications and the bus that fans them out.

use std::sync::mpsc::{Receiver, Sender, channel};

/// Notifications published by the break session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One second elapsed in the current phase.
    Tick { remaining: u32, total: u32 },
    /// A break began. `force` tells the break screen whether skipping is allowed.
    BreakStarted { duration: u32, force: bool },
    BreakEnded,
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
///
/// Subscribers that dropped their receiver are pruned on the next publish.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SessionEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: SessionEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_every_event() {
        let mut bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        bus.publish(SessionEvent::BreakEnded);
        assert_eq!(first.try_recv(), Ok(SessionEvent::BreakEnded));
        assert_eq!(second.try_recv(), Ok(SessionEvent::BreakEnded));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        bus.publish(SessionEvent::Tick {
            remaining: 4,
            total: 5,
        });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }
}
