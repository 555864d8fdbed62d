//! Single-slot publish cells
//!
//! A [`Slot`] holds at most one value and is written by exactly one owner;
//! every write replaces the whole value. Readers always see the most recent
//! complete write. Backed by `tokio::sync::watch`, whose lock is held only
//! for the assignment.

use serial_distance::{DistanceReading, LinkState, ReadingSink};
use tokio::sync::watch;

/// Writer half; not `Clone`, so each slot has a single writer
#[derive(Debug)]
pub struct Slot<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Slot<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the held value
    pub fn publish(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    /// Most recent value, if any was published
    pub fn latest(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// New reader starting at the current value
    pub fn reader(&self) -> SlotReader<T> {
        SlotReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader half; cheap to clone
#[derive(Debug, Clone)]
pub struct SlotReader<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> SlotReader<T> {
    /// Most recent value without waiting
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next write and return it.
    ///
    /// Intermediate writes may be skipped. `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

/// Destination for the serial reader: the latest-distance slot plus the
/// link state
#[derive(Debug, Default)]
pub struct DistanceFeed {
    distance: Slot<DistanceReading>,
    link: Slot<LinkState>,
}

impl DistanceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance(&self) -> SlotReader<DistanceReading> {
        self.distance.reader()
    }

    pub fn link(&self) -> SlotReader<LinkState> {
        self.link.reader()
    }
}

impl ReadingSink for DistanceFeed {
    fn publish(&self, reading: DistanceReading) {
        self.distance.publish(reading);
    }

    fn link_changed(&self, state: LinkState) {
        self.link.publish(state);
    }
}
