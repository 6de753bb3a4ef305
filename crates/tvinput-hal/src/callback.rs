//! Notification delivery from the implementation to the consumer
//!
//! Implementations may call [`EventCallback::notify`] from any thread,
//! including synchronously from inside `initialize` or from inside the call
//! that caused the change. They never hold internal locks while doing so,
//! so a callback is free to call back into the device.

use crate::Event;
use tokio::sync::mpsc;

/// Consumer-side notification sink
///
/// The event is only borrowed for the duration of the call. Whatever state
/// the consumer needs alongside the notification is captured by the
/// implementor itself.
pub trait EventCallback: Send + Sync {
    fn notify(&self, event: &Event);
}

impl<F> EventCallback for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn notify(&self, event: &Event) {
        self(event)
    }
}

/// Callback that queues a copy of every event
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventCallback for EventSender {
    fn notify(&self, event: &Event) {
        if self.tx.send(*event).is_err() {
            tracing::debug!("Event receiver dropped, discarding {:?}", event);
        }
    }
}

/// Create a queueing callback and the receiver draining it
///
/// The receiver works both from async code (`recv().await`) and from plain
/// threads (`try_recv`, `blocking_recv`).
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
