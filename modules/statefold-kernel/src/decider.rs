//! Command validation on top of a kernel.

use crate::automaton::Automaton;
use crate::decision::Decision;

/// A kernel that can also validate commands.
///
/// `decide` must be pure. Anything it needs from the outside world
/// (timestamps, request ids) travels inside the command. `Ok(vec![])` is an
/// accepted no-op and is distinct from a rejection.
///
/// Every `Decider` is an [`Automaton`], so it can be handed to any runtime
/// that only needs `init`/`transition`.
pub trait Decider: Automaton {
    type Command: Send + Sync + 'static;
    type Error: std::fmt::Debug + Send + Sync + 'static;

    fn decide(
        &self,
        state: &Self::State,
        command: &Self::Command,
    ) -> Decision<Self::Event, Self::Error>;

    /// Whether the state accepts no further commands. Only exposed here;
    /// refusing commands is up to the host.
    fn is_terminal(&self, _state: &Self::State) -> bool {
        false
    }
}
