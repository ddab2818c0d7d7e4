//! Pending-notification FIFO shared by drain producers and the dispatcher.

use parking_lot::Mutex;

use crate::config::NotificationPolicy;
use crate::template::TemplateData;

/// A ready-to-send notification: rendered payload, target policy, and the
/// number of delivery attempts already made.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub policy: NotificationPolicy,
    pub title: String,
    pub body: String,
    pub data: TemplateData,
    pub retry_count: u32,
}

/// Unbounded FIFO of [`Envelope`]s. Producers never block; the lock is
/// only held for the vector operation, never across I/O.
#[derive(Default)]
pub struct NotificationQueue {
    pending: Mutex<Vec<Envelope>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically remove and return everything currently queued.
    pub fn take_all(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Append a batch to the tail.
    pub fn append_all(&self, mut envelopes: Vec<Envelope>) {
        if envelopes.is_empty() {
            return;
        }
        self.pending.lock().append(&mut envelopes);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
