//! Core types for the event log. Domain-agnostic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event as stored in the log. Returned by all read methods.
///
/// `seq` starts at 1, is assigned at append time, strictly increases and is
/// never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent<E> {
    pub seq: u64,
    pub event: E,
    pub ts: DateTime<Utc>,
}

impl<E> StoredEvent<E> {
    pub fn new(seq: u64, event: E) -> Self {
        Self {
            seq,
            event,
            ts: Utc::now(),
        }
    }
}
