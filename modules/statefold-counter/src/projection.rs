//! Read models over the counter log.

use statefold_events::{Projection, StoredEvent};

use crate::domain::CounterEvent;

/// Every `Inc` ever recorded. Unlike the live count, it ignores `Dec` and
/// `Reset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalIncrements;

impl Projection<CounterEvent> for TotalIncrements {
    type Output = u64;

    fn initial(&self) -> u64 {
        0
    }

    fn apply(&self, acc: u64, entry: &StoredEvent<CounterEvent>) -> u64 {
        match entry.event {
            CounterEvent::Inc => acc + 1,
            CounterEvent::Dec | CounterEvent::Reset => acc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub inc: u64,
    pub dec: u64,
    pub reset: u64,
    pub last_seq: u64,
}

/// Per-type event counts and the last sequence number seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTally;

impl Projection<CounterEvent> for EventTally {
    type Output = Tally;

    fn initial(&self) -> Tally {
        Tally::default()
    }

    fn apply(&self, mut acc: Tally, entry: &StoredEvent<CounterEvent>) -> Tally {
        match entry.event {
            CounterEvent::Inc => acc.inc += 1,
            CounterEvent::Dec => acc.dec += 1,
            CounterEvent::Reset => acc.reset += 1,
        }
        acc.last_seq = entry.seq;
        acc
    }
}
