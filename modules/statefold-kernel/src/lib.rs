//! Pure transition kernel.
//!
//! A domain is an [`Automaton`]: a total, deterministic `(init, transition)`
//! pair over `(State, Event) -> (State, Effect)`. Domains that validate
//! commands also implement [`Decider`], which adds `decide` and a terminal
//! predicate on top of the same transition function.
//!
//! Nothing here performs I/O or suspends. Runtimes live in `statefold-engine`.

pub mod automaton;
pub mod decider;
pub mod decision;

pub use automaton::{fold_events, Automaton};
pub use decider::Decider;
pub use decision::{Decision, DecisionExt};
