//! The backend contract every log implementation satisfies.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::StoredEvent;

/// Append-only event log.
///
/// Implementations preserve append order and assign gap-free, strictly
/// increasing sequence numbers starting at 1. A batch passed to `append`
/// lands contiguously or not at all.
#[async_trait]
pub trait EventLog<E: Clone + Send + Sync + 'static>: Send + Sync {
    /// Append a batch. Returns the stored entries in the same order.
    async fn append(&self, events: Vec<E>) -> Result<Vec<StoredEvent<E>>>;

    /// Read entries with `seq >= seq_start`, in sequence order.
    async fn read_from(&self, seq_start: u64) -> Result<Vec<StoredEvent<E>>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<u64>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Every entry, in sequence order.
    async fn read_all(&self) -> Result<Vec<StoredEvent<E>>> {
        self.read_from(1).await
    }
}

/// Fold every stored entry, in order, into an accumulator.
pub async fn replay<E, L, A, F>(log: &L, initial: A, mut fold: F) -> Result<A>
where
    E: Clone + Send + Sync + 'static,
    L: EventLog<E> + ?Sized,
    F: FnMut(A, &StoredEvent<E>) -> A,
{
    let entries = log.read_all().await?;
    tracing::debug!(entries = entries.len(), "Replaying event log");
    Ok(entries.iter().fold(initial, |acc, entry| fold(acc, entry)))
}

// ---------------------------------------------------------------------------
// Arc<L> blanket: lets runtimes and tests share one log
// ---------------------------------------------------------------------------

#[async_trait]
impl<E, L> EventLog<E> for std::sync::Arc<L>
where
    E: Clone + Send + Sync + 'static,
    L: EventLog<E> + ?Sized,
{
    async fn append(&self, events: Vec<E>) -> Result<Vec<StoredEvent<E>>> {
        (**self).append(events).await
    }

    async fn read_from(&self, seq_start: u64) -> Result<Vec<StoredEvent<E>>> {
        (**self).read_from(seq_start).await
    }

    async fn len(&self) -> Result<u64> {
        (**self).len().await
    }
}
