//! Counter domain: the reference kernel driven by every runtime shape.
//!
//! Commands `Add(n)` and `Reset` are validated against a symmetric limit and
//! expand into unit events (`Inc`, `Dec`, `Reset`), so the same event stream
//! can be replayed, rendered or mailed to an actor.

pub mod config;
pub mod domain;
pub mod projection;
pub mod view;

pub use config::{load_config, CounterConfig, DemoConfig};
pub use domain::{Counter, CounterCommand, CounterEffect, CounterError, CounterEvent, CounterState};
pub use projection::{EventTally, Tally, TotalIncrements};
pub use view::TextView;
