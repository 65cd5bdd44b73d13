//! Animation Flow Core (engine-agnostic)
//!
//! A cooperative, frame-synchronized coroutine scheduler for sequencing and
//! composing time-based animation logic. Animation behaviors are suspendable
//! procedures that yield once per rendered frame; a [`Pool`] advances every
//! live thread in lockstep, one step per tick, so concurrent animations
//! interleave deterministically. The crate knows nothing about rendering or
//! pacing: the scene is whatever the coroutine bodies touch between yields,
//! and the clock is whoever calls [`Pool::tick`] once per output frame.

pub mod coroutine;
pub mod error;
pub mod flow;
pub mod ids;
pub mod pool;
pub mod promise;
pub mod thread;

// Re-exports for consumers
pub use coroutine::{
    await_promise, from_fn, join_thread, Coroutine, Outcome, Resume, Signal, Step, Task, Value,
};
pub use error::{FlowError, ThreadFailure};
pub use flow::{all, any, chain, delay, every, repeat, sequence};
pub use ids::ThreadId;
pub use pool::{Pool, PoolEvent, TickReport, UnhandledFailure};
pub use promise::{Promise, PromiseState};
pub use thread::{Thread, ThreadState};

/// Scheduler result type
pub type Result<T> = std::result::Result<T, FlowError>;
