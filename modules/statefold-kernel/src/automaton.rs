//! The `(init, transition)` pair every runtime drives.

/// A deterministic state machine with effects.
///
/// Both functions must be total: a malformed event still yields a
/// well-defined `(state, effect)`, usually by recording the anomaly inside
/// the returned state. No I/O, no hidden state, no panics for domain
/// conditions. Replay and direct-call testing depend on this.
///
/// Static parameters (limits, names) may live on the implementing value;
/// they are part of the kernel's identity and must not change between calls.
pub trait Automaton: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;
    type Event: Clone + Send + Sync + 'static;
    type Effect: Send + Sync + 'static;

    /// Initial state and the effect to interpret on start.
    fn init(&self) -> (Self::State, Self::Effect);

    /// Apply one event. The returned state replaces the old one wholesale.
    fn transition(&self, state: &Self::State, event: &Self::Event) -> (Self::State, Self::Effect);
}

/// Standalone left fold of `events` through `transition`, starting from `init`.
///
/// Effects are discarded. This is the reference every runtime's live state
/// is compared against.
pub fn fold_events<'a, A, I>(kernel: &A, events: I) -> A::State
where
    A: Automaton,
    I: IntoIterator<Item = &'a A::Event>,
{
    let (initial, _) = kernel.init();
    events
        .into_iter()
        .fold(initial, |state, event| kernel.transition(&state, event).0)
}
