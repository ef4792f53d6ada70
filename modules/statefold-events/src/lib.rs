//! Generic, domain-agnostic append-only event log.
//!
//! Stores opaque event values with a sequence number and a timestamp.
//! Zero knowledge of any domain. The log is the sole source of truth for
//! reconstructable state: replaying it through a kernel's `transition`
//! yields the live state, and replaying it through a [`Projection`] yields
//! an independent read model.
//!
//! [`MemoryEventLog`] is the reference implementation of the [`EventLog`]
//! contract. Durable backends implement the same trait.

pub mod log;
pub mod memory;
pub mod projection;
pub mod types;

pub use log::{replay, EventLog};
pub use memory::MemoryEventLog;
pub use projection::{project, Projection};
pub use types::StoredEvent;
