//! Combinators for controlling the flow and timing of an animation.
//!
//! Every combinator is an ordinary coroutine expressed through the contract's
//! signals; none of them reaches into pool internals. They accept [`Task`]
//! values so plain coroutines, promises, and already-spawned handles compose
//! uniformly.
//!
//! [`Task`]: crate::coroutine::Task

mod chain;
mod delay;
mod every;
mod parallel;
mod repeat;
mod sequence;

pub use chain::chain;
pub use delay::delay;
pub use every::every;
pub use parallel::{all, any};
pub use repeat::repeat;
pub use sequence::sequence;
