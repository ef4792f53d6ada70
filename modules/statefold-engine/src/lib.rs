//! Generic execution loop for pure kernels.
//!
//! One executor, [`Runtime`], folds events through a kernel's `transition`:
//! event → transition → observe → interpret → (recursively) dispatch
//! feedback events until settled. The three application shapes are thin
//! parameterizations of it:
//!
//! - [`render::RenderLoop`]: observer appends a rendered view, interpreter
//!   executes effects and may yield feedback events.
//! - [`sourced::EventSourced`]: `decide` produces events, each is folded
//!   and the whole batch is appended to an [`statefold_events::EventLog`]
//!   only if everything succeeds.
//! - [`actor::Actor`]: a single background loop reading from an unbounded
//!   multi-producer mailbox; effects talk back through a cloneable
//!   [`actor::ActorRef`].

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod sourced;
pub mod traits;

pub use actor::{Actor, ActorRef, ActorStats, EffectHandler, WeakActorRef};
pub use config::{load_config, EngineConfig, MailboxConfig, RuntimeConfig};
pub use engine::Runtime;
pub use error::{ActorError, DispatchError, HandleError};
pub use render::{Render, RenderLoop, RenderObserver, RenderedViews};
pub use sourced::EventSourced;
pub use traits::{
    FnInterpreter, FnObserver, Interpreter, NoopInterpreter, NoopObserver, ObserverExt,
    Observer, Then, TracingObserver,
};
