//! The coroutine contract every thread body is written against.
//!
//! A coroutine is an explicit resumable state machine: each [`resume`] call
//! consumes one [`Resume`] input and produces exactly one [`Step`], either a
//! suspension carrying a [`Signal`] for the scheduler to classify, or a final
//! [`Outcome`]. The contract is pure control-flow plumbing; whatever a body
//! does to the scene between yields is invisible to the scheduler.
//!
//! [`resume`]: Coroutine::resume

use crate::error::ThreadFailure;
use crate::ids::ThreadId;
use crate::promise::Promise;

/// Opaque payload carried by awaits and final results.
pub type Value = serde_json::Value;

/// A suspendable unit of animation logic.
///
/// Implementations must be resumable until they return [`Step::Complete`];
/// resuming past completion is a contract violation (the pool reports it as
/// [`FlowError::InvalidState`](crate::error::FlowError::InvalidState)).
pub trait Coroutine {
    fn resume(&mut self, input: Resume) -> Step;
}

/// Result of one resumption.
#[derive(Debug)]
pub enum Step {
    /// Still running; suspended on the given signal.
    Yield(Signal),
    /// Finished; the coroutine must not be resumed again.
    Complete(Outcome),
}

/// What a coroutine may suspend on.
pub enum Signal {
    /// Advance one frame.
    Tick,
    /// Run the nested coroutine to completion before resuming me. The nested
    /// frames are charged to this thread; its result comes back as
    /// [`Resume::Delegated`].
    Delegate(Box<dyn Coroutine>),
    /// Register a concurrent child thread. Never suspends: the handle comes
    /// back immediately as [`Resume::Spawned`].
    Spawn(Box<dyn Coroutine>),
    /// Suspend until join targets reach a terminal state.
    Join {
        targets: Vec<ThreadId>,
        /// `true`: wait for every target (fail-fast on the first failure).
        /// `false`: wake on the first target to become terminal.
        wait_all: bool,
    },
    /// Unwind the target thread and its subtree. Canceling another thread
    /// resumes this one immediately; canceling self ends this thread.
    Cancel(ThreadId),
    /// Suspend until the promise settles. A rejection fails the thread with
    /// the rejection reason without resuming it.
    Await(Promise),
}

impl Signal {
    /// Join a single thread, delivering its exact terminal outcome.
    pub fn join(target: ThreadId) -> Self {
        Self::Join {
            targets: vec![target],
            wait_all: true,
        }
    }

    /// Join every target; wakes early with the first failure.
    pub fn join_all(targets: Vec<ThreadId>) -> Self {
        Self::Join {
            targets,
            wait_all: true,
        }
    }

    /// Wake on the first target to become terminal.
    pub fn join_any(targets: Vec<ThreadId>) -> Self {
        Self::Join {
            targets,
            wait_all: false,
        }
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tick => f.write_str("Tick"),
            Self::Delegate(_) => f.write_str("Delegate"),
            Self::Spawn(_) => f.write_str("Spawn"),
            Self::Join { targets, wait_all } => f
                .debug_struct("Join")
                .field("targets", targets)
                .field("wait_all", wait_all)
                .finish(),
            Self::Cancel(thread) => f.debug_tuple("Cancel").field(thread).finish(),
            Self::Await(promise) => f.debug_tuple("Await").field(promise).finish(),
        }
    }
}

/// What the scheduler feeds back into the next resumption.
#[derive(Clone, Debug)]
pub enum Resume {
    /// Plain frame resume; also the first input a fresh coroutine sees.
    Tick,
    /// Handle of the child registered by the previous `Spawn`.
    Spawned(ThreadId),
    /// Terminal outcome of the previous `Delegate`.
    Delegated(Outcome),
    /// A join target became terminal.
    Joined { thread: ThreadId, outcome: Outcome },
    /// The awaited promise resolved.
    Resolved(Value),
}

/// Terminal result of a thread or nested coroutine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Outcome {
    Done(Value),
    Failed(ThreadFailure),
    Canceled,
}

impl Outcome {
    /// Completed-with-no-payload, the usual case for animation procedures.
    pub fn done() -> Self {
        Self::Done(Value::Null)
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// The failure payload, if this outcome is one.
    pub fn failure(&self) -> Option<&ThreadFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Anything a combinator or the pool accepts as runnable work.
///
/// A sealed union over the known producer variants, so coroutines, promises,
/// and already-spawned handles are treated uniformly.
pub enum Task {
    Coroutine(Box<dyn Coroutine>),
    Promise(Promise),
    Handle(ThreadId),
}

impl Task {
    /// Normalize into something that can be delegated or spawned: a promise
    /// becomes an awaiting coroutine, a handle becomes a join on it.
    pub fn into_coroutine(self) -> Box<dyn Coroutine> {
        match self {
            Self::Coroutine(coroutine) => coroutine,
            Self::Promise(promise) => await_promise(promise),
            Self::Handle(thread) => join_thread(thread),
        }
    }
}

impl From<Box<dyn Coroutine>> for Task {
    fn from(coroutine: Box<dyn Coroutine>) -> Self {
        Self::Coroutine(coroutine)
    }
}

impl From<Promise> for Task {
    fn from(promise: Promise) -> Self {
        Self::Promise(promise)
    }
}

impl From<ThreadId> for Task {
    fn from(thread: ThreadId) -> Self {
        Self::Handle(thread)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coroutine(_) => f.write_str("Task::Coroutine"),
            Self::Promise(promise) => f.debug_tuple("Task::Promise").field(promise).finish(),
            Self::Handle(thread) => f.debug_tuple("Task::Handle").field(thread).finish(),
        }
    }
}

/// Wrap a closure as a coroutine.
///
/// The closure receives every [`Resume`] input and must keep honoring the
/// one-signal-per-resumption contract.
pub fn from_fn<F>(body: F) -> Box<dyn Coroutine>
where
    F: FnMut(Resume) -> Step + 'static,
{
    Box::new(FromFn { body })
}

struct FromFn<F> {
    body: F,
}

impl<F> Coroutine for FromFn<F>
where
    F: FnMut(Resume) -> Step,
{
    fn resume(&mut self, input: Resume) -> Step {
        (self.body)(input)
    }
}

/// Coroutine that joins an existing thread and completes with its outcome.
pub fn join_thread(target: ThreadId) -> Box<dyn Coroutine> {
    Box::new(JoinThread { target })
}

struct JoinThread {
    target: ThreadId,
}

impl Coroutine for JoinThread {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Joined { outcome, .. } => Step::Complete(outcome),
            _ => Step::Yield(Signal::join(self.target)),
        }
    }
}

/// Coroutine that awaits a promise and completes with the resolved value.
/// A rejection never reaches it; the pool fails the thread directly.
pub fn await_promise(promise: Promise) -> Box<dyn Coroutine> {
    Box::new(AwaitPromise {
        promise: Some(promise),
    })
}

struct AwaitPromise {
    promise: Option<Promise>,
}

impl Coroutine for AwaitPromise {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Resolved(value) => Step::Complete(Outcome::Done(value)),
            _ => match self.promise.take() {
                Some(promise) => Step::Yield(Signal::Await(promise)),
                // Resumed again without a resolution; nothing left to wait on.
                None => Step::Complete(Outcome::done()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_fn_drives_closure_state() {
        let mut ticks = 0u32;
        let mut coroutine = from_fn(move |_| {
            if ticks < 2 {
                ticks += 1;
                Step::Yield(Signal::Tick)
            } else {
                Step::Complete(Outcome::Done(json!(ticks)))
            }
        });
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Tick)
        ));
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Tick)
        ));
        match coroutine.resume(Resume::Tick) {
            Step::Complete(Outcome::Done(v)) => assert_eq!(v, json!(2)),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn task_normalizes_handle_to_join() {
        let mut joiner = Task::from(ThreadId(3)).into_coroutine();
        match joiner.resume(Resume::Tick) {
            Step::Yield(Signal::Join { targets, wait_all }) => {
                assert_eq!(targets, vec![ThreadId(3)]);
                assert!(wait_all);
            }
            other => panic!("expected join yield, got {other:?}"),
        }
        match joiner.resume(Resume::Joined {
            thread: ThreadId(3),
            outcome: Outcome::Canceled,
        }) {
            Step::Complete(Outcome::Canceled) => {}
            other => panic!("expected canceled outcome, got {other:?}"),
        }
    }

    #[test]
    fn task_normalizes_promise_to_await() {
        let promise = Promise::pending();
        let mut awaiter = Task::from(promise).into_coroutine();
        assert!(matches!(
            awaiter.resume(Resume::Tick),
            Step::Yield(Signal::Await(_))
        ));
        match awaiter.resume(Resume::Resolved(json!("value"))) {
            Step::Complete(Outcome::Done(v)) => assert_eq!(v, json!("value")),
            other => panic!("expected resolved completion, got {other:?}"),
        }
    }

    #[test]
    fn outcome_helpers() {
        assert!(Outcome::done().is_done());
        assert!(Outcome::Canceled.is_canceled());
        let failed = Outcome::Failed(ThreadFailure::new("x"));
        assert!(failed.is_failed());
        assert_eq!(failed.failure().unwrap().message, "x");
    }
}
