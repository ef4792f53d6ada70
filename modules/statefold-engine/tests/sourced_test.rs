//! Event-sourced runtime tests: decide → fold → append, atomically.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use common::*;
use statefold_engine::{EventSourced, HandleError};
use statefold_events::{EventLog, MemoryEventLog, Projection, StoredEvent};
use statefold_kernel::fold_events;

fn deposit(amounts: &[i64]) -> ChainCommand {
    ChainCommand::Deposit(amounts.to_vec())
}

// =========================================================================
// handle
// =========================================================================

#[tokio::test]
async fn accepted_command_folds_and_appends_every_event() {
    let mut sourced = EventSourced::new(Chain);

    let state = sourced.handle(&deposit(&[1, 2, 3])).await.unwrap();

    assert_eq!(state.total, 6);
    assert_eq!(sourced.state(), &state);
    let entries = sourced.log().entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].event, ChainEvent::Add(3));
    assert_eq!(
        sourced.effects(),
        &[
            ChainEffect::Added(1),
            ChainEffect::Added(2),
            ChainEffect::Added(3)
        ]
    );
}

#[tokio::test]
async fn rejection_leaves_state_log_and_effects_untouched() {
    let mut sourced = EventSourced::new(Chain);
    sourced.handle(&deposit(&[5])).await.unwrap();

    let state_before = sourced.state().clone();
    let log_before = sourced.log().len().await.unwrap();
    let effects_before = sourced.effects().to_vec();

    // The first amount is valid; the batch is still rejected as a whole.
    let err = sourced.handle(&deposit(&[4, -2])).await.unwrap_err();

    assert!(matches!(
        err,
        HandleError::Rejected(ChainError::NotPositive { amount: -2 })
    ));
    assert_eq!(err.rejection(), Some(&ChainError::NotPositive { amount: -2 }));
    assert_eq!(sourced.state(), &state_before);
    assert_eq!(sourced.log().len().await.unwrap(), log_before);
    assert_eq!(sourced.effects(), effects_before.as_slice());
}

#[tokio::test]
async fn empty_acceptance_is_a_noop() {
    let mut sourced = EventSourced::new(Chain);
    sourced.handle(&deposit(&[1])).await.unwrap();

    let state = sourced.handle(&ChainCommand::Nothing).await.unwrap();

    assert_eq!(state.total, 1);
    assert_eq!(sourced.log().len().await.unwrap(), 1);
}

#[tokio::test]
async fn terminal_predicate_is_exposed_not_enforced() {
    let mut sourced = EventSourced::new(Chain);
    assert!(!sourced.is_terminal());

    sourced.handle(&deposit(&[1000])).await.unwrap();
    assert!(sourced.is_terminal());

    // Still accepts commands; refusing is the host's call.
    sourced.handle(&deposit(&[1])).await.unwrap();
    assert_eq!(sourced.state().total, 1001);
}

// =========================================================================
// Replay
// =========================================================================

#[tokio::test]
async fn rebuild_matches_live_state_after_every_command() {
    let mut sourced = EventSourced::new(Chain);
    let commands = [
        deposit(&[3]),
        deposit(&[0]),
        deposit(&[1, 1]),
        ChainCommand::Nothing,
        deposit(&[7, 8, 9]),
    ];

    for command in &commands {
        let _ = sourced.handle(command).await;
        assert_eq!(&sourced.rebuild().await.unwrap(), sourced.state());
    }
    assert_eq!(sourced.state().total, 29);
}

#[tokio::test]
async fn from_log_hydrates_without_deciding() {
    let log: Arc<MemoryEventLog<ChainEvent>> = Arc::new(MemoryEventLog::new());
    // Facts the decider would reject today are still replayed.
    log.append(vec![ChainEvent::Add(-5), ChainEvent::Add(2)])
        .await
        .unwrap();

    let mut sourced = EventSourced::from_log(Chain, log.clone()).await.unwrap();

    assert_eq!(sourced.state().total, -3);
    assert!(sourced.history().is_empty());
    assert!(sourced.effects().is_empty());

    sourced.handle(&deposit(&[4])).await.unwrap();
    assert_eq!(sourced.state().total, 1);
    assert_eq!(log.len().await.unwrap(), 3);
}

#[tokio::test]
async fn hydrated_instance_equals_original() {
    let mut original = EventSourced::new(Chain);
    original.handle(&deposit(&[2, 2])).await.unwrap();
    original.handle(&deposit(&[6])).await.unwrap();

    let copy = EventSourced::from_log(Chain, original.log().clone())
        .await
        .unwrap();

    assert_eq!(copy.state(), original.state());
}

// =========================================================================
// Sequencing
// =========================================================================

#[tokio::test]
async fn sequence_numbers_span_direct_and_batch_appends() {
    let mut sourced = EventSourced::new(Chain);

    let direct = sourced.append(vec![ChainEvent::Add(1)]).await.unwrap();
    sourced.handle(&deposit(&[2, 3])).await.unwrap();
    let direct_again = sourced
        .append(vec![ChainEvent::Start("x".into())])
        .await
        .unwrap();

    assert_eq!(direct[0].seq, 1);
    assert_eq!(direct_again[0].seq, 4);
    let seqs: Vec<u64> = sourced.log().entries().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);

    let events: Vec<ChainEvent> = sourced.log().entries().into_iter().map(|e| e.event).collect();
    assert_eq!(sourced.state(), &fold_events(&Chain, &events));
}

// =========================================================================
// Log failure
// =========================================================================

/// Memory log that refuses appends while `down` is set.
struct FlakyLog {
    inner: MemoryEventLog<ChainEvent>,
    down: AtomicBool,
}

#[async_trait]
impl EventLog<ChainEvent> for FlakyLog {
    async fn append(&self, events: Vec<ChainEvent>) -> Result<Vec<StoredEvent<ChainEvent>>> {
        if self.down.load(Ordering::SeqCst) {
            bail!("log backend unavailable");
        }
        self.inner.append(events).await
    }

    async fn read_from(&self, seq_start: u64) -> Result<Vec<StoredEvent<ChainEvent>>> {
        self.inner.read_from(seq_start).await
    }

    async fn len(&self) -> Result<u64> {
        self.inner.len().await
    }
}

#[tokio::test]
async fn failed_append_rolls_the_batch_back() {
    let log = Arc::new(FlakyLog {
        inner: MemoryEventLog::new(),
        down: AtomicBool::new(false),
    });
    let mut sourced = EventSourced::from_log(Chain, log.clone()).await.unwrap();
    sourced.handle(&deposit(&[1])).await.unwrap();

    log.down.store(true, Ordering::SeqCst);
    let err = sourced.handle(&deposit(&[2, 3])).await.unwrap_err();

    assert!(matches!(err, HandleError::Log(_)));
    assert_eq!(sourced.state().total, 1);
    assert_eq!(sourced.history().len(), 1);
    assert_eq!(sourced.effects(), &[ChainEffect::Added(1)]);

    // Recovers once the backend is back, with no leftover staged events.
    log.down.store(false, Ordering::SeqCst);
    sourced.handle(&deposit(&[4])).await.unwrap();
    assert_eq!(sourced.state().total, 5);
    assert_eq!(log.len().await.unwrap(), 2);
    assert_eq!(&sourced.rebuild().await.unwrap(), sourced.state());
}

// =========================================================================
// Projections
// =========================================================================

/// Sum of absolute amounts: a volume, not a balance.
struct Volume;

impl Projection<ChainEvent> for Volume {
    type Output = i64;

    fn initial(&self) -> i64 {
        0
    }

    fn apply(&self, acc: i64, entry: &StoredEvent<ChainEvent>) -> i64 {
        match entry.event {
            ChainEvent::Add(n) => acc + n.abs(),
            _ => acc,
        }
    }
}

#[tokio::test]
async fn projection_diverges_from_live_state() {
    let mut sourced = EventSourced::new(Chain);
    sourced.append(vec![ChainEvent::Add(10), ChainEvent::Add(-4)]).await.unwrap();

    let volume = sourced.project(&Volume).await.unwrap();

    assert_eq!(sourced.state().total, 6);
    assert_eq!(volume, 14);
    assert_eq!(sourced.project(&Volume).await.unwrap(), volume);
}
