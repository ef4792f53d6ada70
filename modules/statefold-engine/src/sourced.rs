//! Event-sourced runtime: validate, fold, then append.
//!
//! `decide` turns a command into a batch of events before anything is
//! applied. The batch is folded through the dispatch loop with an observer
//! that stages events and an interpreter that stages effects. Only when the
//! whole batch folded and the log accepted it are the staged effects kept;
//! any failure restores the pre-command state. A rejected command touches
//! nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use statefold_events::{project, replay, EventLog, MemoryEventLog, Projection, StoredEvent};
use statefold_kernel::{Automaton, Decider};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::engine::Runtime;
use crate::error::HandleError;
use crate::traits::{Interpreter, Observer};

// ---------------------------------------------------------------------------
// Staging buffers
// ---------------------------------------------------------------------------

struct Staged<T>(Arc<Mutex<Vec<T>>>);

impl<T> Staged<T> {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn share(&self) -> Self {
        Self(self.0.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, item: T) {
        self.lock().push(item);
    }

    fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }
}

/// Observer that stages each applied event for the batch append.
struct StageEvents<E>(Staged<E>);

#[async_trait]
impl<A, E> Observer<A> for StageEvents<E>
where
    A: Automaton<Event = E>,
    E: Clone + Send + Sync + 'static,
{
    async fn observe(&self, _: &A::State, event: &A::Event, _: &A::Effect) -> Result<()> {
        self.0.push(event.clone());
        Ok(())
    }
}

/// Interpreter that stages each effect and never yields feedback.
struct StageEffects<F>(Staged<F>);

#[async_trait]
impl<A, F> Interpreter<A> for StageEffects<F>
where
    A: Automaton<Effect = F>,
    F: Send + Sync + 'static,
{
    async fn interpret(&self, effect: A::Effect) -> Result<Vec<A::Event>> {
        self.0.push(effect);
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// EventSourced
// ---------------------------------------------------------------------------

/// A decider whose state is always `fold(transition, init, log)`.
///
/// Not safe for concurrent `handle` calls; `&mut self` serializes them.
pub struct EventSourced<D, L>
where
    D: Decider,
    L: EventLog<D::Event>,
{
    runtime: Runtime<D, StageEvents<D::Event>, StageEffects<D::Effect>>,
    log: Arc<L>,
    staged_events: Staged<D::Event>,
    staged_effects: Staged<D::Effect>,
    effects: Vec<D::Effect>,
}

impl<D> EventSourced<D, MemoryEventLog<D::Event>>
where
    D: Decider,
{
    /// Fresh instance over an empty in-memory log.
    pub fn new(kernel: D) -> Self {
        Self::assemble(kernel, Arc::new(MemoryEventLog::new()), RuntimeConfig::default())
    }
}

impl<D, L> EventSourced<D, L>
where
    D: Decider,
    L: EventLog<D::Event>,
{
    /// Hydrate from an existing log without calling `decide`: stored events
    /// are already-validated facts.
    pub async fn from_log(kernel: D, log: Arc<L>) -> Result<Self> {
        Self::from_log_with_config(kernel, log, RuntimeConfig::default()).await
    }

    pub async fn from_log_with_config(kernel: D, log: Arc<L>, config: RuntimeConfig) -> Result<Self> {
        let mut sourced = Self::assemble(kernel, log, config);
        let state = sourced.rebuild().await?;
        sourced.runtime.reset(state);
        let entries = sourced.log.as_ref().len().await?;
        info!(entries, "Hydrated from event log");
        Ok(sourced)
    }

    fn assemble(kernel: D, log: Arc<L>, config: RuntimeConfig) -> Self {
        let staged_events = Staged::new();
        let staged_effects = Staged::new();
        let runtime = Runtime::with_config(
            kernel,
            StageEvents(staged_events.share()),
            StageEffects(staged_effects.share()),
            config,
        );
        Self {
            runtime,
            log,
            staged_events,
            staged_effects,
            effects: Vec::new(),
        }
    }

    /// Validate `command` and, if accepted, fold and append its events.
    ///
    /// Returns the state after the whole batch. `Ok` with an unchanged state
    /// is an accepted no-op.
    pub async fn handle(&mut self, command: &D::Command) -> Result<D::State, HandleError<D::Error>> {
        let events = match self.runtime.kernel().decide(self.runtime.state(), command) {
            Ok(events) => events,
            Err(error) => {
                warn!(?error, "Command rejected");
                return Err(HandleError::Rejected(error));
            }
        };

        self.commit(events).await?;
        Ok(self.runtime.state().clone())
    }

    /// Append already-validated facts, folding them into the state.
    /// Shares sequence numbering with `handle`.
    pub async fn append(
        &mut self,
        events: Vec<D::Event>,
    ) -> Result<Vec<StoredEvent<D::Event>>, HandleError<D::Error>> {
        self.commit(events).await
    }

    /// Recompute the state from scratch by replaying the log.
    pub async fn rebuild(&self) -> Result<D::State> {
        let kernel = self.runtime.kernel();
        let (initial, _) = kernel.init();
        replay::<D::Event, L, _, _>(&self.log, initial, |state, entry| {
            kernel.transition(&state, &entry.event).0
        })
        .await
    }

    /// Fold the log through an independent read model.
    pub async fn project<P: Projection<D::Event>>(&self, projection: &P) -> Result<P::Output> {
        project::<D::Event, L, P>(&self.log, projection).await
    }

    pub fn state(&self) -> &D::State {
        self.runtime.state()
    }

    pub fn is_terminal(&self) -> bool {
        self.runtime.kernel().is_terminal(self.runtime.state())
    }

    /// Effects produced by committed batches, in order.
    pub fn effects(&self) -> &[D::Effect] {
        &self.effects
    }

    /// Events applied by this instance (hydrated entries excluded).
    pub fn history(&self) -> &[D::Event] {
        self.runtime.history()
    }

    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    pub fn kernel(&self) -> &D {
        self.runtime.kernel()
    }

    async fn commit(
        &mut self,
        events: Vec<D::Event>,
    ) -> Result<Vec<StoredEvent<D::Event>>, HandleError<D::Error>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.runtime.state().clone();
        let history_len = self.runtime.history().len();

        for event in events {
            if let Err(error) = self.runtime.dispatch(event).await {
                self.abort(snapshot, history_len);
                return Err(error.into());
            }
        }

        let batch = self.staged_events.take();
        match self.log.as_ref().append(batch).await {
            Ok(stored) => {
                self.effects.extend(self.staged_effects.take());
                debug!(
                    appended = stored.len(),
                    last_seq = stored.last().map(|e| e.seq),
                    "Batch committed"
                );
                Ok(stored)
            }
            Err(error) => {
                self.abort(snapshot, history_len);
                Err(HandleError::Log(error))
            }
        }
    }

    fn abort(&mut self, snapshot: D::State, history_len: usize) {
        self.runtime.rollback(snapshot, history_len);
        self.staged_events.take();
        self.staged_effects.take();
    }
}
