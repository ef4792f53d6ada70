//! Core traits for the dispatch loop.

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use statefold_kernel::Automaton;

/// Side-effecting callback invoked after every transition.
///
/// Receives the new state, the event that produced it and the effect the
/// transition emitted. The loop awaits it fully before interpreting the
/// effect. Errors are fatal for the current dispatch.
#[async_trait]
pub trait Observer<A: Automaton>: Send + Sync {
    async fn observe(&self, state: &A::State, event: &A::Event, effect: &A::Effect) -> Result<()>;
}

/// Turns an effect into zero or more feedback events.
///
/// May perform I/O. Returned events are dispatched depth-first, in order,
/// before the originating dispatch returns.
#[async_trait]
pub trait Interpreter<A: Automaton>: Send + Sync {
    async fn interpret(&self, effect: A::Effect) -> Result<Vec<A::Event>>;
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Two observers run in order: `first` completes before `second` starts.
pub struct Then<X, Y> {
    first: X,
    second: Y,
}

impl<X, Y> Then<X, Y> {
    pub fn new(first: X, second: Y) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<A, X, Y> Observer<A> for Then<X, Y>
where
    A: Automaton,
    X: Observer<A>,
    Y: Observer<A>,
{
    async fn observe(&self, state: &A::State, event: &A::Event, effect: &A::Effect) -> Result<()> {
        self.first.observe(state, event, effect).await?;
        self.second.observe(state, event, effect).await
    }
}

pub trait ObserverExt<A: Automaton>: Observer<A> + Sized {
    /// Run `self`, then `next`, for every triple.
    ///
    /// `a.then(b).then(c)` and `a.then(b.then(c))` observe identically.
    fn then<O: Observer<A>>(self, next: O) -> Then<Self, O> {
        Then::new(self, next)
    }
}

impl<A: Automaton, T: Observer<A>> ObserverExt<A> for T {}

// ---------------------------------------------------------------------------
// Ready-made implementations
// ---------------------------------------------------------------------------

/// Observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl<A: Automaton> Observer<A> for NoopObserver {
    async fn observe(&self, _: &A::State, _: &A::Event, _: &A::Effect) -> Result<()> {
        Ok(())
    }
}

/// Discards every effect and never yields feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterpreter;

#[async_trait]
impl<A: Automaton> Interpreter<A> for NoopInterpreter {
    async fn interpret(&self, _effect: A::Effect) -> Result<Vec<A::Event>> {
        Ok(Vec::new())
    }
}

/// Logs every transition at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl<A> Observer<A> for TracingObserver
where
    A: Automaton,
    A::State: Debug,
    A::Event: Debug,
    A::Effect: Debug,
{
    async fn observe(&self, state: &A::State, event: &A::Event, effect: &A::Effect) -> Result<()> {
        tracing::debug!(label = %self.label, ?event, ?effect, ?state, "Transition applied");
        Ok(())
    }
}

/// Synchronous closure as an observer.
pub struct FnObserver<F>(pub F);

#[async_trait]
impl<A, F> Observer<A> for FnObserver<F>
where
    A: Automaton,
    F: Fn(&A::State, &A::Event, &A::Effect) -> Result<()> + Send + Sync,
{
    async fn observe(&self, state: &A::State, event: &A::Event, effect: &A::Effect) -> Result<()> {
        (self.0)(state, event, effect)
    }
}

/// Synchronous closure as an interpreter.
pub struct FnInterpreter<F>(pub F);

#[async_trait]
impl<A, F> Interpreter<A> for FnInterpreter<F>
where
    A: Automaton,
    F: Fn(A::Effect) -> Result<Vec<A::Event>> + Send + Sync,
{
    async fn interpret(&self, effect: A::Effect) -> Result<Vec<A::Event>> {
        (self.0)(effect)
    }
}

// ---------------------------------------------------------------------------
// Arc<T> blankets: share an observer/interpreter with tests or other loops
// ---------------------------------------------------------------------------

#[async_trait]
impl<A: Automaton, O: Observer<A> + ?Sized> Observer<A> for Arc<O> {
    async fn observe(&self, state: &A::State, event: &A::Event, effect: &A::Effect) -> Result<()> {
        (**self).observe(state, event, effect).await
    }
}

#[async_trait]
impl<A: Automaton, I: Interpreter<A> + ?Sized> Interpreter<A> for Arc<I> {
    async fn interpret(&self, effect: A::Effect) -> Result<Vec<A::Event>> {
        (**self).interpret(effect).await
    }
}
