//! Event Bus
//!
//! Carries [`TransportEvent`]s from the transport thread to a single
//! consumer. Publishing never blocks and never drops an event while the
//! bus is open; events from one publisher arrive in the order published.
//!
//! ```text
//! transport thread ──publish()──▶ [ unbounded FIFO ] ──next()──▶ consumer
//!                                         ▲
//!                            close() ─────┘ (drain ends once empty)
//! ```

use crate::domain::models::TransportEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("Event bus is closed")]
    Closed,
    #[error("Event bus already has an active consumer")]
    DrainBusy,
}

type Receiver = mpsc::UnboundedReceiver<TransportEvent>;

pub struct EventBus {
    sender: mpsc::UnboundedSender<TransportEvent>,
    receiver: Arc<Mutex<Receiver>>,
    closed: Arc<AtomicBool>,
    close_signal: watch::Sender<bool>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (close_signal, _) = watch::channel(false);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            closed: Arc::new(AtomicBool::new(false)),
            close_signal,
        }
    }

    /// Handle for the producing side. Cheap to clone, usable from any thread.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            sender: self.sender.clone(),
            closed: self.closed.clone(),
        }
    }

    pub fn publish(&self, event: TransportEvent) -> Result<(), BusError> {
        self.publisher().publish(event)
    }

    /// Take the consumer side.
    ///
    /// Only one drain may exist at a time. Dropping it releases the
    /// receiver, and the next `drain()` continues from where it stopped.
    pub fn drain(&self) -> Result<EventDrain, BusError> {
        let receiver = self
            .receiver
            .clone()
            .try_lock_owned()
            .map_err(|_| BusError::DrainBusy)?;

        Ok(EventDrain {
            receiver,
            close_signal: self.close_signal.subscribe(),
        })
    }

    /// Stop accepting events. Already published events are still delivered.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Closing event bus");

        // No active consumer: close the channel now. Otherwise the drain
        // closes it when it sees the signal.
        if let Ok(mut receiver) = self.receiver.try_lock() {
            receiver.close();
        }
        self.close_signal.send_replace(true);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct EventPublisher {
    sender: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl EventPublisher {
    pub fn publish(&self, event: TransportEvent) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        trace!("Publishing {:?}", event);
        self.sender.send(event).map_err(|_| BusError::Closed)
    }
}

/// Exclusive consumer handle.
pub struct EventDrain {
    receiver: OwnedMutexGuard<Receiver>,
    close_signal: watch::Receiver<bool>,
}

impl EventDrain {
    /// Next event in publish order, or `None` once the bus is closed and empty.
    pub async fn next(&mut self) -> Option<TransportEvent> {
        if !*self.close_signal.borrow() {
            tokio::select! {
                biased;
                event = self.receiver.recv() => return event,
                // Err means the bus itself was dropped, which also ends the stream
                _ = self.close_signal.changed() => {}
            }
        }

        self.receiver.close();
        self.receiver.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<TransportEvent> {
        if *self.close_signal.borrow() {
            self.receiver.close();
        }
        self.receiver.try_recv().ok()
    }
}
