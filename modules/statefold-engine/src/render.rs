//! Render loop: observer appends a rendered view after every transition,
//! interpreter executes effects and may yield feedback events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use statefold_kernel::Automaton;

use crate::config::RuntimeConfig;
use crate::engine::Runtime;
use crate::error::DispatchError;
use crate::traits::{Interpreter, Observer};

/// Pure `State -> View` function.
pub trait Render<S>: Send + Sync {
    type View: Send + 'static;

    fn render(&self, state: &S) -> Self::View;
}

/// Shared, append-only list of rendered views.
pub struct RenderedViews<V> {
    inner: Arc<Mutex<Vec<V>>>,
}

impl<V> Clone for RenderedViews<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Default for RenderedViews<V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<V> RenderedViews<V> {
    fn lock(&self) -> MutexGuard<'_, Vec<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, view: V) {
        self.lock().push(view);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<V: Clone> RenderedViews<V> {
    pub fn snapshot(&self) -> Vec<V> {
        self.lock().clone()
    }

    pub fn latest(&self) -> Option<V> {
        self.lock().last().cloned()
    }
}

/// Observer that renders the new state and appends the view.
pub struct RenderObserver<R, V> {
    renderer: R,
    views: RenderedViews<V>,
}

impl<R, V> RenderObserver<R, V> {
    pub fn new(renderer: R, views: RenderedViews<V>) -> Self {
        Self { renderer, views }
    }
}

#[async_trait]
impl<A, R, V> Observer<A> for RenderObserver<R, V>
where
    A: Automaton,
    R: Render<A::State, View = V>,
    V: Send + 'static,
{
    async fn observe(&self, state: &A::State, _: &A::Event, _: &A::Effect) -> Result<()> {
        self.views.push(self.renderer.render(state));
        Ok(())
    }
}

/// A kernel driven by a renderer and an effect executor.
pub struct RenderLoop<A, R, X>
where
    A: Automaton,
    R: Render<A::State>,
    X: Interpreter<A>,
{
    runtime: Runtime<A, RenderObserver<R, R::View>, X>,
    views: RenderedViews<R::View>,
}

impl<A, R, X> RenderLoop<A, R, X>
where
    A: Automaton,
    R: Render<A::State>,
    X: Interpreter<A>,
{
    pub fn new(kernel: A, renderer: R, executor: X) -> Self {
        Self::with_config(kernel, renderer, executor, RuntimeConfig::default())
    }

    pub fn with_config(kernel: A, renderer: R, executor: X, config: RuntimeConfig) -> Self {
        let views = RenderedViews::default();
        let observer = RenderObserver::new(renderer, views.clone());
        Self {
            runtime: Runtime::with_config(kernel, observer, executor, config),
            views,
        }
    }

    /// Render the initial state, then interpret the init effect.
    pub async fn start(&mut self) -> Result<(), DispatchError> {
        let (initial, _) = self.runtime.kernel().init();
        self.views
            .push(self.runtime.observer().renderer.render(&initial));
        self.runtime.start().await
    }

    /// Hydrate with `state` without running `transition` or the executor.
    /// The hydrated state is rendered so the latest view matches it.
    pub fn reset(&mut self, state: A::State) {
        self.views
            .push(self.runtime.observer().renderer.render(&state));
        self.runtime.reset(state);
    }

    /// Dispatch an event; returns once the full feedback cascade has been
    /// rendered.
    pub async fn dispatch(&mut self, event: A::Event) -> Result<(), DispatchError> {
        self.runtime.dispatch(event).await
    }

    pub fn state(&self) -> &A::State {
        self.runtime.state()
    }

    pub fn history(&self) -> &[A::Event] {
        self.runtime.history()
    }

    /// Handle on the rendered views; stays valid after the loop is dropped.
    pub fn views(&self) -> RenderedViews<R::View> {
        self.views.clone()
    }
}
