//! Counter kernel and decider.

use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use statefold_kernel::{Automaton, Decider, Decision};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CounterEvent {
    Inc,
    Dec,
    Reset,
}

impl CounterEvent {
    /// The snake_case event type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            CounterEvent::Inc => "inc",
            CounterEvent::Dec => "dec",
            CounterEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCommand {
    Add(i64),
    Reset,
}

impl FromStr for CounterCommand {
    type Err = anyhow::Error;

    /// `reset`, or a signed amount such as `3`, `+3`, `-1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("reset") {
            return Ok(CounterCommand::Reset);
        }
        let amount = s
            .strip_prefix('+')
            .unwrap_or(s)
            .parse::<i64>()
            .with_context(|| format!("not a counter command: {s:?}"))?;
        Ok(CounterCommand::Add(amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterEffect {
    None,
    Changed { from: i64, to: i64 },
    Cleared { from: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    #[error("adding {amount} to {current} would exceed the maximum of {max}")]
    Overflow { current: i64, amount: i64, max: i64 },

    #[error("adding {amount} to {current} would fall below the minimum of {min}")]
    Underflow { current: i64, amount: i64, min: i64 },
}

/// Counter kernel. `max` bounds the count in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    max: i64,
}

impl Counter {
    pub const DEFAULT_MAX: i64 = 100;

    /// Ceiling for `max`. `decide` emits one unit event per step, so the
    /// limit also bounds the size of one accepted batch.
    pub const MAX_LIMIT: i64 = 1_000_000;

    /// `max` is taken by magnitude and clamped to [`Counter::MAX_LIMIT`].
    pub fn new(max: i64) -> Self {
        Self {
            max: max.saturating_abs().min(Self::MAX_LIMIT),
        }
    }

    pub fn max(&self) -> i64 {
        self.max
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

impl Automaton for Counter {
    type State = CounterState;
    type Event = CounterEvent;
    type Effect = CounterEffect;

    fn init(&self) -> (CounterState, CounterEffect) {
        (CounterState::default(), CounterEffect::None)
    }

    fn transition(&self, state: &CounterState, event: &CounterEvent) -> (CounterState, CounterEffect) {
        let from = state.count;
        match event {
            // Saturating: replayed or hand-fed events past i64 bounds still
            // yield a defined state.
            CounterEvent::Inc => {
                let to = from.saturating_add(1);
                (CounterState { count: to }, CounterEffect::Changed { from, to })
            }
            CounterEvent::Dec => {
                let to = from.saturating_sub(1);
                (CounterState { count: to }, CounterEffect::Changed { from, to })
            }
            CounterEvent::Reset => (CounterState { count: 0 }, CounterEffect::Cleared { from }),
        }
    }
}

impl Decider for Counter {
    type Command = CounterCommand;
    type Error = CounterError;

    fn decide(&self, state: &CounterState, command: &CounterCommand) -> Decision<CounterEvent, CounterError> {
        match *command {
            CounterCommand::Add(amount) => {
                let current = state.count;
                let target = current.checked_add(amount);
                match target {
                    Some(t) if t > self.max => Err(CounterError::Overflow {
                        current,
                        amount,
                        max: self.max,
                    }),
                    None if amount > 0 => Err(CounterError::Overflow {
                        current,
                        amount,
                        max: self.max,
                    }),
                    Some(t) if t < -self.max => Err(CounterError::Underflow {
                        current,
                        amount,
                        min: -self.max,
                    }),
                    None => Err(CounterError::Underflow {
                        current,
                        amount,
                        min: -self.max,
                    }),
                    Some(_) => {
                        let unit = if amount >= 0 {
                            CounterEvent::Inc
                        } else {
                            CounterEvent::Dec
                        };
                        Ok(vec![unit; amount.unsigned_abs() as usize])
                    }
                }
            }
            CounterCommand::Reset => Ok(vec![CounterEvent::Reset]),
        }
    }
}
