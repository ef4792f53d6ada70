//! Typed errors for the runtimes.
//!
//! Domain rejections are values ([`HandleError::Rejected`]); everything else
//! here is an infrastructure failure that aborts the current operation.

use thiserror::Error;

/// Failure while folding an event cascade.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Observer failed after a transition was applied
    #[error("observer failed: {0}")]
    Observer(#[source] anyhow::Error),

    /// Effect interpretation failed after a transition was applied
    #[error("interpreter failed: {0}")]
    Interpreter(#[source] anyhow::Error),

    /// One external dispatch cascaded into more events than allowed
    #[error("event cascade exceeded {limit} events")]
    CascadeLimit { limit: usize },
}

/// Failure of `EventSourced::handle` / `EventSourced::append`.
#[derive(Debug, Error)]
pub enum HandleError<E> {
    /// `decide` rejected the command. Nothing was applied.
    #[error("command rejected: {0:?}")]
    Rejected(E),

    /// Folding the accepted events failed. Rolled back.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The log refused the batch. Rolled back.
    #[error("log append failed: {0}")]
    Log(#[source] anyhow::Error),
}

impl<E> HandleError<E> {
    /// The domain rejection, if this is one.
    pub fn rejection(&self) -> Option<&E> {
        match self {
            HandleError::Rejected(error) => Some(error),
            _ => None,
        }
    }
}

/// Mailbox failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActorError {
    /// The actor no longer accepts or processes messages
    #[error("actor {name} is stopped")]
    Stopped { name: String },

    /// The processing loop panicked
    #[error("actor {name} panicked")]
    Panicked { name: String },
}
