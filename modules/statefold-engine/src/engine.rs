//! The dispatch loop.

use statefold_kernel::Automaton;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::error::DispatchError;
use crate::traits::{Interpreter, Observer};

/// Generic executor for one kernel instance.
///
/// Record → transition → observe → interpret → recurse on feedback until
/// settled. The instance exclusively owns its state; callers must not
/// interleave `dispatch` calls on one instance (the `&mut self` receivers
/// enforce this).
pub struct Runtime<A, O, I>
where
    A: Automaton,
    O: Observer<A>,
    I: Interpreter<A>,
{
    kernel: A,
    observer: O,
    interpreter: I,
    state: A::State,
    history: Vec<A::Event>,
    config: RuntimeConfig,
}

impl<A, O, I> Runtime<A, O, I>
where
    A: Automaton,
    O: Observer<A>,
    I: Interpreter<A>,
{
    /// Build an instance holding the kernel's initial state. The init effect
    /// is not interpreted until [`Runtime::start`].
    pub fn new(kernel: A, observer: O, interpreter: I) -> Self {
        Self::with_config(kernel, observer, interpreter, RuntimeConfig::default())
    }

    pub fn with_config(kernel: A, observer: O, interpreter: I, config: RuntimeConfig) -> Self {
        let (state, _) = kernel.init();
        Self {
            kernel,
            observer,
            interpreter,
            state,
            history: Vec::new(),
            config,
        }
    }

    /// Re-initialise from `init()` and interpret the init effect, fully
    /// processing any feedback it yields before returning. History starts
    /// over, so it always folds from `init()` to the current state.
    pub async fn start(&mut self) -> Result<(), DispatchError> {
        let (state, effect) = self.kernel.init();
        self.state = state;
        self.history.clear();

        let feedback = self
            .interpreter
            .interpret(effect)
            .await
            .map_err(DispatchError::Interpreter)?;

        self.settle(feedback).await
    }

    /// Dispatch one external event and its whole feedback cascade.
    ///
    /// Feedback is processed depth-first: every event yielded by an effect is
    /// itself fully settled before the next sibling starts. On failure the
    /// transitions already applied stay applied.
    pub async fn dispatch(&mut self, event: A::Event) -> Result<(), DispatchError> {
        self.settle(vec![event]).await
    }

    /// Replace the state without running `transition` or the observer.
    /// Hydration only; history restarts from the hydrated state.
    pub fn reset(&mut self, state: A::State) {
        self.state = state;
        self.history.clear();
    }

    pub fn state(&self) -> &A::State {
        &self.state
    }

    /// Every event dispatched so far, feedback included, in application order.
    pub fn history(&self) -> &[A::Event] {
        &self.history
    }

    pub fn kernel(&self) -> &A {
        &self.kernel
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    /// Restore a snapshot taken before a failed batch.
    pub(crate) fn rollback(&mut self, state: A::State, history_len: usize) {
        self.state = state;
        self.history.truncate(history_len);
    }

    async fn settle(&mut self, roots: Vec<A::Event>) -> Result<(), DispatchError> {
        // Explicit stack instead of async recursion. Children are pushed in
        // reverse so they pop in emission order.
        let mut stack: Vec<(A::Event, usize)> = roots.into_iter().rev().map(|e| (e, 0)).collect();
        let mut applied = 0usize;

        while let Some((event, depth)) = stack.pop() {
            if applied >= self.config.max_cascade {
                return Err(DispatchError::CascadeLimit {
                    limit: self.config.max_cascade,
                });
            }
            applied += 1;

            let feedback = self.step(event, depth).await?;
            stack.extend(feedback.into_iter().rev().map(|e| (e, depth + 1)));
        }

        Ok(())
    }

    async fn step(&mut self, event: A::Event, depth: usize) -> Result<Vec<A::Event>, DispatchError> {
        // 1. Record
        self.history.push(event.clone());

        // 2. Transition (pure, replaces state wholesale)
        let (next, effect) = self.kernel.transition(&self.state, &event);
        self.state = next;
        debug!(depth, seq = self.history.len(), "Event applied");

        // 3. Observe
        self.observer
            .observe(&self.state, &event, &effect)
            .await
            .map_err(DispatchError::Observer)?;

        // 4. Interpret (may yield feedback)
        self.interpreter
            .interpret(effect)
            .await
            .map_err(DispatchError::Interpreter)
    }
}
