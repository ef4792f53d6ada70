//! In-memory `EventLog` implementation.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use crate::log::EventLog;
use crate::types::StoredEvent;

/// In-memory event log. Generates incrementing sequence numbers under a
/// single lock so batches stay contiguous. Thread-safe.
pub struct MemoryEventLog<E> {
    entries: Mutex<Vec<StoredEvent<E>>>,
}

impl<E> MemoryEventLog<E> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Build a log from externally supplied entries (e.g. an exported log).
    ///
    /// Entries must already be in strictly increasing `seq` order starting at 1;
    /// anything else is refused.
    pub fn from_entries(entries: Vec<StoredEvent<E>>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            let expected = i as u64 + 1;
            anyhow::ensure!(
                entry.seq == expected,
                "log entry {} has seq {}, expected {}",
                i,
                entry.seq,
                expected
            );
        }
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredEvent<E>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone> MemoryEventLog<E> {
    /// Snapshot of every entry (for test assertions).
    pub fn entries(&self) -> Vec<StoredEvent<E>> {
        self.lock().clone()
    }
}

impl<E> Default for MemoryEventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Clone + Send + Sync + 'static> EventLog<E> for MemoryEventLog<E> {
    async fn append(&self, events: Vec<E>) -> Result<Vec<StoredEvent<E>>> {
        let mut entries = self.lock();
        let first = entries.len() as u64 + 1;
        let stored: Vec<StoredEvent<E>> = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| StoredEvent::new(first + i as u64, event))
            .collect();
        entries.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn read_from(&self, seq_start: u64) -> Result<Vec<StoredEvent<E>>> {
        let entries = self.lock();
        // seq == index + 1, so the slice start is seq_start - 1.
        let start = (seq_start.max(1) - 1) as usize;
        Ok(entries.get(start..).map(<[_]>::to_vec).unwrap_or_default())
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.lock().len() as u64)
    }
}
