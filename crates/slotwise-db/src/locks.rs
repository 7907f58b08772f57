//! # Per-Slot Locks
//!
//! In-process mutual exclusion for reservation commits, keyed by
//! `(business_id, date, time)`.
//!
//! ```text
//! reserve(A, Mon, 09:00) ──► lock(A/Mon/09:00) ──► conditional insert
//! reserve(A, Mon, 09:00) ──► lock(A/Mon/09:00) ... waits
//! reserve(A, Mon, 09:30) ──► lock(A/Mon/09:30) ──► runs in parallel
//! ```
//!
//! The database statement is what guarantees capacity; this table only
//! keeps same-process writers for one slot from piling onto SQLite's
//! busy handler. Entries are dropped once no task holds or waits on them.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Identity of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub business_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    pub fn new(business_id: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        SlotKey {
            business_id: business_id.into(),
            date,
            time,
        }
    }
}

/// Table of slot mutexes, shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct SlotLocks {
    slots: Arc<DashMap<SlotKey, Arc<Mutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        SlotLocks::default()
    }

    /// Waits for exclusive access to `key`.
    ///
    /// Cancel-safe: if the returned future is dropped while waiting, the
    /// unheld guard still prunes the entry.
    pub async fn acquire(&self, key: SlotKey) -> SlotGuard {
        let mutex = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let mut slot = SlotGuard {
            guard: None,
            key,
            slots: Arc::clone(&self.slots),
        };
        slot.guard = Some(mutex.lock_owned().await);
        slot
    }

    /// Number of slots currently locked or awaited.
    pub fn active(&self) -> usize {
        self.slots.len()
    }
}

/// Releases the slot on drop, or abandons the wait if never acquired.
#[derive(Debug)]
pub struct SlotGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: SlotKey,
    slots: Arc<DashMap<SlotKey, Arc<Mutex<()>>>>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table's own reference left: nobody is waiting.
        self.slots
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
