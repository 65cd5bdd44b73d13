//! A single cooperatively scheduled thread.
//!
//! Not an OS thread: a `Thread` wraps one coroutine plus the bookkeeping the
//! pool needs to single-step it, namely its delegation stack, its lifecycle
//! state, and the parent/child links that route cancellation through the tree.

use crate::coroutine::{Coroutine, Outcome};
use crate::ids::ThreadId;
use crate::promise::Promise;

/// Lifecycle state of a thread.
///
/// `Joining` and `Awaiting` are refinements of "suspended": the thread
/// consumes no step until the thing it waits on is ready. `Finished` carries
/// the terminal outcome and is never left.
#[derive(Debug)]
pub enum ThreadState {
    /// Parked until the next frame.
    Suspended,
    /// Being advanced right now. Only ever observed from within a step.
    Running,
    /// Parked until join targets become terminal.
    Joining {
        targets: Vec<ThreadId>,
        wait_all: bool,
    },
    /// Parked until the promise settles.
    Awaiting(Promise),
    /// Terminal.
    Finished(Outcome),
}

impl ThreadState {
    /// Short name for logs and diagnostics.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Suspended => "suspended",
            Self::Running => "running",
            Self::Joining { .. } => "joining",
            Self::Awaiting(_) => "awaiting",
            Self::Finished(Outcome::Done(_)) => "done",
            Self::Finished(Outcome::Failed(_)) => "failed",
            Self::Finished(Outcome::Canceled) => "canceled",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// The terminal outcome, if the thread has one.
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// One entry in the pool's thread table.
pub struct Thread {
    pub id: ThreadId,
    /// Weak back-link for routing only; never keeps the parent alive.
    pub parent: Option<ThreadId>,
    /// Owned concurrent children, canceled when this thread ends.
    pub children: Vec<ThreadId>,
    /// Delegation stack: bottom is the spawned coroutine, top is the
    /// innermost active delegate. Taken out of the table while stepping so a
    /// thread can never re-enter its own resumption.
    pub(crate) stack: Vec<Box<dyn Coroutine>>,
    pub state: ThreadState,
}

impl Thread {
    pub(crate) fn new(id: ThreadId, coroutine: Box<dyn Coroutine>, parent: Option<ThreadId>) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            stack: vec![coroutine],
            state: ThreadState::Suspended,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether this thread currently joins `target`.
    pub fn joins(&self, target: ThreadId) -> bool {
        match &self.state {
            ThreadState::Joining { targets, .. } => targets.contains(&target),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("state", &self.state.name())
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{from_fn, Step};

    fn idle() -> Box<dyn Coroutine> {
        from_fn(|_| Step::Complete(Outcome::done()))
    }

    #[test]
    fn state_predicates() {
        assert!(ThreadState::Suspended.is_live());
        assert!(ThreadState::Finished(Outcome::Canceled).is_terminal());
        assert_eq!(ThreadState::Finished(Outcome::Canceled).name(), "canceled");
        assert_eq!(
            ThreadState::Finished(Outcome::done())
                .outcome()
                .map(Outcome::is_done),
            Some(true)
        );
    }

    #[test]
    fn joins_checks_targets() {
        let mut thread = Thread::new(ThreadId(0), idle(), None);
        assert!(!thread.joins(ThreadId(1)));
        thread.state = ThreadState::Joining {
            targets: vec![ThreadId(1), ThreadId(2)],
            wait_all: false,
        };
        assert!(thread.joins(ThreadId(2)));
        assert!(!thread.joins(ThreadId(3)));
    }
}
