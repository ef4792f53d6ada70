//! Read models folded independently of the live state.

use anyhow::Result;

use crate::log::{replay, EventLog};
use crate::types::StoredEvent;

/// An independent fold over the log.
///
/// A projection may count things the domain state does not keep (totals
/// instead of net values, per-type histograms). Replaying the same log
/// through the same projection always yields the same output.
pub trait Projection<E> {
    type Output;

    fn initial(&self) -> Self::Output;

    fn apply(&self, acc: Self::Output, entry: &StoredEvent<E>) -> Self::Output;
}

/// Fold the whole log through `projection`.
pub async fn project<E, L, P>(log: &L, projection: &P) -> Result<P::Output>
where
    E: Clone + Send + Sync + 'static,
    L: EventLog<E> + ?Sized,
    P: Projection<E>,
{
    replay(log, projection.initial(), |acc, entry| projection.apply(acc, entry)).await
}
