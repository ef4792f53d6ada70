//! Mailbox runtime.
//!
//! One background task owns the kernel's state and applies events strictly
//! one at a time from an unbounded multi-producer queue. Senders never wait
//! for processing. Effects are handed to an optional [`EffectHandler`]
//! together with a cloneable [`ActorRef`] to the same mailbox, so an actor
//! talks to itself (or to others) only by sending more messages.
//!
//! Quiescence is counter-based: `sent` is bumped inside `tell` before the
//! enqueue, `processed` after a dispatch has fully completed. `drain` waits
//! until `processed` catches up with `sent`. Queue emptiness is never
//! consulted, since a dequeued-but-unapplied message leaves the queue empty.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use statefold_kernel::Automaton;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::{EngineConfig, MailboxConfig};
use crate::engine::Runtime;
use crate::error::ActorError;
use crate::traits::{Interpreter, Observer};

/// Executes an actor's effects. May `tell` the actor itself through `me`,
/// or any other actor it holds a reference to.
#[async_trait]
pub trait EffectHandler<A: Automaton>: Send + Sync + 'static {
    async fn handle(&self, effect: A::Effect, me: &ActorRef<A>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorStats {
    pub sent: u64,
    pub processed: u64,
    /// Messages whose effect handler failed. Included in `processed`.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    stopping: AtomicBool,
    exited: AtomicBool,
    /// Set before `exited` when the loop ended without finishing cleanly.
    panicked: AtomicBool,
}

// ---------------------------------------------------------------------------
// ActorRef
// ---------------------------------------------------------------------------

/// Cloneable sending side of a mailbox.
pub struct ActorRef<A: Automaton> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<A::Event>,
    counters: Arc<Counters>,
    mailbox: MailboxConfig,
}

impl<A: Automaton> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
            counters: self.counters.clone(),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Automaton> ActorRef<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue an event and return immediately.
    pub fn tell(&self, event: A::Event) -> Result<(), ActorError> {
        if self.counters.stopping.load(Ordering::SeqCst) {
            return Err(self.closed());
        }

        self.counters.sent.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(event).is_err() {
            // Never enqueued, so it will never be processed.
            self.counters.sent.fetch_sub(1, Ordering::SeqCst);
            return Err(self.closed());
        }
        Ok(())
    }

    /// Wait until every event sent before this call has been applied.
    ///
    /// Fails if the loop exits with messages still unapplied: `Panicked` if
    /// it died mid-message, `Stopped` otherwise.
    pub async fn drain(&self) -> Result<(), ActorError> {
        loop {
            // `sent` first: anything counted there is already queued ahead of
            // whatever `processed` may have moved on to.
            let sent = self.counters.sent.load(Ordering::SeqCst);
            let processed = self.counters.processed.load(Ordering::SeqCst);
            if processed >= sent {
                return Ok(());
            }

            if self.counters.exited.load(Ordering::SeqCst) {
                let sent = self.counters.sent.load(Ordering::SeqCst);
                let processed = self.counters.processed.load(Ordering::SeqCst);
                if processed >= sent {
                    return Ok(());
                }
                return Err(self.closed());
            }

            pause(&self.mailbox).await;
        }
    }

    pub fn stats(&self) -> ActorStats {
        ActorStats {
            sent: self.counters.sent.load(Ordering::SeqCst),
            processed: self.counters.processed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Whether the processing loop has exited.
    pub fn is_stopped(&self) -> bool {
        self.counters.exited.load(Ordering::SeqCst)
    }

    /// A reference that does not keep the mailbox open.
    pub fn downgrade(&self) -> WeakActorRef<A> {
        WeakActorRef {
            name: self.name.clone(),
            tx: self.tx.downgrade(),
            counters: self.counters.clone(),
            mailbox: self.mailbox.clone(),
        }
    }

    fn closed(&self) -> ActorError {
        let name = self.name.to_string();
        if self.counters.panicked.load(Ordering::SeqCst) {
            ActorError::Panicked { name }
        } else {
            ActorError::Stopped { name }
        }
    }
}

/// Non-owning [`ActorRef`]. The loop holds one of these for its own effect
/// handler, so it shuts down once every external reference is gone.
pub struct WeakActorRef<A: Automaton> {
    name: Arc<str>,
    tx: mpsc::WeakUnboundedSender<A::Event>,
    counters: Arc<Counters>,
    mailbox: MailboxConfig,
}

impl<A: Automaton> Clone for WeakActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
            counters: self.counters.clone(),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Automaton> WeakActorRef<A> {
    pub fn upgrade(&self) -> Option<ActorRef<A>> {
        Some(ActorRef {
            name: self.name.clone(),
            tx: self.tx.upgrade()?,
            counters: self.counters.clone(),
            mailbox: self.mailbox.clone(),
        })
    }
}

async fn pause(config: &MailboxConfig) {
    if config.drain_poll_micros == 0 {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(Duration::from_micros(config.drain_poll_micros)).await;
    }
}

// ---------------------------------------------------------------------------
// Loop wiring: observer publishes snapshots, interpreter calls the handler
// ---------------------------------------------------------------------------

struct PublishState<S>(watch::Sender<S>);

#[async_trait]
impl<A, S> Observer<A> for PublishState<S>
where
    A: Automaton<State = S>,
    S: Clone + Send + Sync + 'static,
{
    async fn observe(&self, state: &A::State, _: &A::Event, _: &A::Effect) -> Result<()> {
        self.0.send_replace(state.clone());
        Ok(())
    }
}

struct HandlerInterpreter<A: Automaton> {
    me: WeakActorRef<A>,
    handler: Option<Arc<dyn EffectHandler<A>>>,
}

#[async_trait]
impl<A: Automaton> Interpreter<A> for HandlerInterpreter<A> {
    async fn interpret(&self, effect: A::Effect) -> Result<Vec<A::Event>> {
        let Some(handler) = &self.handler else {
            return Ok(Vec::new());
        };
        let Some(me) = self.me.upgrade() else {
            debug!(actor = %self.me.name, "No live references, dropping effect");
            return Ok(Vec::new());
        };
        handler.handle(effect, &me).await?;
        // Handlers talk through `tell`; there is no feedback channel.
        Ok(Vec::new())
    }
}

/// Closes the mailbox bookkeeping when the loop ends, on unwind too.
struct LoopExit {
    counters: Arc<Counters>,
    name: Arc<str>,
    clean: bool,
}

impl LoopExit {
    fn finish(mut self) {
        self.clean = true;
    }
}

impl Drop for LoopExit {
    fn drop(&mut self) {
        let counters = &self.counters;
        counters.panicked.store(!self.clean, Ordering::SeqCst);
        counters.stopping.store(true, Ordering::SeqCst);
        counters.exited.store(true, Ordering::SeqCst);

        let processed = counters.processed.load(Ordering::SeqCst);
        if self.clean {
            info!(actor = %self.name, processed, "Actor loop exited");
        } else {
            error!(actor = %self.name, processed, "Actor loop panicked");
        }
    }
}

type ActorRuntime<A> =
    Runtime<A, PublishState<<A as Automaton>::State>, HandlerInterpreter<A>>;

async fn run<A: Automaton>(
    mut runtime: ActorRuntime<A>,
    mut rx: mpsc::UnboundedReceiver<A::Event>,
    stop: Arc<Notify>,
    counters: Arc<Counters>,
    name: Arc<str>,
) {
    let exit = LoopExit {
        counters: counters.clone(),
        name: name.clone(),
        clean: false,
    };

    if let Err(err) = runtime.start().await {
        counters.failed.fetch_add(1, Ordering::SeqCst);
        error!(actor = %name, error = %err, "Init effect failed");
    }

    loop {
        let event = tokio::select! {
            biased;
            _ = stop.notified() => {
                debug!(actor = %name, "Stop requested");
                break;
            }
            next = rx.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };

        // Runs to completion outside the select: a stop request never
        // interrupts a transition or its effect handler.
        if let Err(err) = runtime.dispatch(event).await {
            counters.failed.fetch_add(1, Ordering::SeqCst);
            error!(actor = %name, error = %err, "Effect handling failed");
        }
        counters.processed.fetch_add(1, Ordering::SeqCst);
    }

    rx.close();
    exit.finish();
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Owning handle to a spawned mailbox loop.
pub struct Actor<A: Automaton> {
    me: ActorRef<A>,
    state: watch::Receiver<A::State>,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<A: Automaton> Actor<A> {
    /// Spawn without an effect handler: effects are dropped.
    pub fn spawn(name: impl Into<String>, kernel: A) -> Self {
        Self::spawn_with_config(name, kernel, None, EngineConfig::default())
    }

    pub fn spawn_with_handler<H: EffectHandler<A>>(
        name: impl Into<String>,
        kernel: A,
        handler: H,
    ) -> Self {
        Self::spawn_with_config(name, kernel, Some(Arc::new(handler)), EngineConfig::default())
    }

    /// Create the mailbox and start exactly one processing loop. Must be
    /// called from within a tokio runtime.
    pub fn spawn_with_config(
        name: impl Into<String>,
        kernel: A,
        handler: Option<Arc<dyn EffectHandler<A>>>,
        config: EngineConfig,
    ) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let me = ActorRef {
            name: name.clone(),
            tx,
            counters: counters.clone(),
            mailbox: config.mailbox,
        };

        let (initial, _) = kernel.init();
        let (state_tx, state_rx) = watch::channel(initial);
        let interpreter = HandlerInterpreter {
            me: me.downgrade(),
            handler,
        };
        let runtime =
            Runtime::with_config(kernel, PublishState(state_tx), interpreter, config.runtime);

        let stop = Arc::new(Notify::new());
        let task = tokio::spawn(run(runtime, rx, stop.clone(), counters, name.clone()));
        info!(actor = %name, "Actor spawned");

        Self {
            me,
            state: state_rx,
            stop,
            task,
        }
    }

    pub fn name(&self) -> &str {
        self.me.name()
    }

    pub fn tell(&self, event: A::Event) -> Result<(), ActorError> {
        self.me.tell(event)
    }

    /// A cloneable sender for other tasks or other actors' handlers.
    pub fn actor_ref(&self) -> ActorRef<A> {
        self.me.clone()
    }

    pub async fn drain(&self) -> Result<(), ActorError> {
        self.me.drain().await
    }

    /// Latest state published by the loop.
    pub fn state(&self) -> A::State {
        self.state.borrow().clone()
    }

    /// Watch every state the loop publishes.
    pub fn subscribe(&self) -> watch::Receiver<A::State> {
        self.state.clone()
    }

    pub fn stats(&self) -> ActorStats {
        self.me.stats()
    }

    /// Stop accepting messages and end the loop. A message already dequeued
    /// finishes; queued ones are abandoned. Cancellation is not an error.
    pub async fn stop(self) -> Result<(), ActorError> {
        self.me.counters.stopping.store(true, Ordering::SeqCst);
        self.stop.notify_one();

        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) if err.is_cancelled() => Ok(()),
            Err(_) => Err(ActorError::Panicked {
                name: self.me.name.to_string(),
            }),
        }
    }
}
