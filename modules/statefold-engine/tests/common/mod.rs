//! Shared test kernel and collaborators for the runtime tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use statefold_engine::{Interpreter, Observer};
use statefold_kernel::{Automaton, Decider, Decision};

// ---------------------------------------------------------------------------
// Test kernel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    Start(String),
    Middle(String),
    End(String),
    Add(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainState {
    pub seen: Vec<String>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEffect {
    Boot,
    Started(String),
    Reached(String),
    Finished(String),
    Added(i64),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chain;

impl Automaton for Chain {
    type State = ChainState;
    type Event = ChainEvent;
    type Effect = ChainEffect;

    fn init(&self) -> (ChainState, ChainEffect) {
        (ChainState::default(), ChainEffect::Boot)
    }

    fn transition(&self, state: &ChainState, event: &ChainEvent) -> (ChainState, ChainEffect) {
        let mut next = state.clone();
        let effect = match event {
            ChainEvent::Start(label) => {
                next.seen.push(label.clone());
                ChainEffect::Started(label.clone())
            }
            ChainEvent::Middle(label) => {
                next.seen.push(label.clone());
                ChainEffect::Reached(label.clone())
            }
            ChainEvent::End(label) => {
                next.seen.push(label.clone());
                ChainEffect::Finished(label.clone())
            }
            ChainEvent::Add(n) => {
                next.total = next.total.saturating_add(*n);
                next.seen.push(format!("add:{n}"));
                ChainEffect::Added(*n)
            }
        };
        (next, effect)
    }
}

// ---------------------------------------------------------------------------
// Decider over the same kernel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCommand {
    /// One `Add` per amount; every amount must be positive.
    Deposit(Vec<i64>),
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    NotPositive { amount: i64 },
}

impl Decider for Chain {
    type Command = ChainCommand;
    type Error = ChainError;

    fn decide(&self, _state: &ChainState, command: &ChainCommand) -> Decision<ChainEvent, ChainError> {
        match command {
            ChainCommand::Deposit(amounts) => amounts
                .iter()
                .map(|&amount| {
                    if amount > 0 {
                        Ok(ChainEvent::Add(amount))
                    } else {
                        Err(ChainError::NotPositive { amount })
                    }
                })
                .collect(),
            ChainCommand::Nothing => Ok(Vec::new()),
        }
    }

    fn is_terminal(&self, state: &ChainState) -> bool {
        state.total >= 1000
    }
}

// ---------------------------------------------------------------------------
// Interpreters
// ---------------------------------------------------------------------------

/// Start → Middle → End (chain of 3).
pub struct Chaining;

#[async_trait]
impl Interpreter<Chain> for Chaining {
    async fn interpret(&self, effect: ChainEffect) -> Result<Vec<ChainEvent>> {
        Ok(match effect {
            ChainEffect::Started(label) => vec![ChainEvent::Middle(format!("{label}→middle"))],
            ChainEffect::Reached(label) => vec![ChainEvent::End(format!("{label}→end"))],
            _ => vec![],
        })
    }
}

/// Start → [Middle A, Middle B]; each Middle → End.
pub struct FanOut;

#[async_trait]
impl Interpreter<Chain> for FanOut {
    async fn interpret(&self, effect: ChainEffect) -> Result<Vec<ChainEvent>> {
        Ok(match effect {
            ChainEffect::Started(_) => vec![
                ChainEvent::Middle("A".into()),
                ChainEvent::Middle("B".into()),
            ],
            ChainEffect::Reached(label) => vec![ChainEvent::End(format!("end-{label}"))],
            _ => vec![],
        })
    }
}

/// The init effect yields a deposit of 10.
pub struct Booting;

#[async_trait]
impl Interpreter<Chain> for Booting {
    async fn interpret(&self, effect: ChainEffect) -> Result<Vec<ChainEvent>> {
        Ok(match effect {
            ChainEffect::Boot => vec![ChainEvent::Add(10)],
            _ => vec![],
        })
    }
}

/// Every Add feeds back another Add. Never settles.
pub struct Divergent;

#[async_trait]
impl Interpreter<Chain> for Divergent {
    async fn interpret(&self, effect: ChainEffect) -> Result<Vec<ChainEvent>> {
        Ok(match effect {
            ChainEffect::Added(n) => vec![ChainEvent::Add(n)],
            _ => vec![],
        })
    }
}

/// Fails on any Finished effect.
pub struct FailOnFinish;

#[async_trait]
impl Interpreter<Chain> for FailOnFinish {
    async fn interpret(&self, effect: ChainEffect) -> Result<Vec<ChainEvent>> {
        match effect {
            ChainEffect::Finished(label) => bail!("cannot finish {label}"),
            ChainEffect::Started(label) => Ok(vec![ChainEvent::End(label)]),
            _ => Ok(vec![]),
        }
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Appends `tag:label-of-last-seen` to a shared journal.
#[derive(Clone)]
pub struct Journal {
    tag: &'static str,
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new(tag: &'static str, entries: Arc<Mutex<Vec<String>>>) -> Self {
        Self { tag, entries }
    }

    pub fn shared() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }
}

#[async_trait]
impl Observer<Chain> for Journal {
    async fn observe(&self, state: &ChainState, _: &ChainEvent, _: &ChainEffect) -> Result<()> {
        let last = state.seen.last().cloned().unwrap_or_default();
        self.entries.lock().unwrap().push(format!("{}:{last}", self.tag));
        Ok(())
    }
}

/// Observer that always fails.
pub struct Broken;

#[async_trait]
impl Observer<Chain> for Broken {
    async fn observe(&self, _: &ChainState, _: &ChainEvent, _: &ChainEffect) -> Result<()> {
        bail!("observer backend unavailable")
    }
}

pub fn labels(state: &ChainState) -> Vec<&str> {
    state.seen.iter().map(String::as_str).collect()
}
