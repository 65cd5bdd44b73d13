//! Concurrent fan-out/fan-in: `all` and `any`.

use std::collections::VecDeque;

use crate::coroutine::{Coroutine, Outcome, Resume, Signal, Step, Task};
use crate::error::ThreadFailure;
use crate::ids::ThreadId;

/// Run every task concurrently and wait for all of them.
///
/// Resolves once every child is done. Fails as soon as any child fails: the
/// remaining siblings are canceled first, then the child's failure becomes
/// this coroutine's own. An empty input completes immediately.
pub fn all(tasks: Vec<Task>) -> Box<dyn Coroutine> {
    Box::new(All {
        pending: tasks.into_iter().collect(),
        handles: Vec::new(),
        wait: None,
    })
}

struct All {
    pending: VecDeque<Task>,
    handles: Vec<ThreadId>,
    wait: Option<FanIn>,
}

impl Coroutine for All {
    fn resume(&mut self, input: Resume) -> Step {
        if let Some(wait) = self.wait.as_mut() {
            return wait.resume(input);
        }
        if let Resume::Spawned(handle) = input {
            self.handles.push(handle);
        }
        loop {
            match self.pending.pop_front() {
                Some(Task::Handle(handle)) => self.handles.push(handle),
                Some(task) => return Step::Yield(Signal::Spawn(task.into_coroutine())),
                None => {
                    let mut wait = FanIn::new(std::mem::take(&mut self.handles));
                    let step = wait.resume(Resume::Tick);
                    self.wait = Some(wait);
                    return step;
                }
            }
        }
    }
}

/// Run every task concurrently and resolve with the first one to finish.
///
/// The winner's value becomes this coroutine's value; every other tracked
/// sibling is canceled in the same step. Failed (or externally canceled)
/// children are dropped from the race: `any` fails only when every child has
/// failed, reporting the last failure, and resolves canceled when every child
/// was canceled without any failure.
pub fn any(tasks: Vec<Task>) -> Box<dyn Coroutine> {
    Box::new(Any {
        pending: tasks.into_iter().collect(),
        remaining: Vec::new(),
        cancel_queue: VecDeque::new(),
        last_failure: None,
        result: None,
        phase: AnyPhase::Spawning,
    })
}

enum AnyPhase {
    Spawning,
    Watching,
    Cleanup,
}

struct Any {
    pending: VecDeque<Task>,
    remaining: Vec<ThreadId>,
    cancel_queue: VecDeque<ThreadId>,
    last_failure: Option<ThreadFailure>,
    result: Option<Outcome>,
    phase: AnyPhase,
}

impl Coroutine for Any {
    fn resume(&mut self, input: Resume) -> Step {
        match self.phase {
            AnyPhase::Spawning => {
                if let Resume::Spawned(handle) = input {
                    self.remaining.push(handle);
                }
                loop {
                    match self.pending.pop_front() {
                        Some(Task::Handle(handle)) => self.remaining.push(handle),
                        Some(task) => return Step::Yield(Signal::Spawn(task.into_coroutine())),
                        None => break,
                    }
                }
                if self.remaining.is_empty() {
                    return Step::Complete(Outcome::done());
                }
                self.phase = AnyPhase::Watching;
                self.watch()
            }
            AnyPhase::Watching => match input {
                Resume::Joined { thread, outcome } => match outcome {
                    Outcome::Done(value) => {
                        self.cancel_queue = self
                            .remaining
                            .iter()
                            .copied()
                            .filter(|handle| *handle != thread)
                            .collect();
                        self.result = Some(Outcome::Done(value));
                        self.phase = AnyPhase::Cleanup;
                        self.cleanup()
                    }
                    Outcome::Failed(failure) => {
                        self.last_failure = Some(failure);
                        self.remaining.retain(|handle| *handle != thread);
                        self.watch()
                    }
                    Outcome::Canceled => {
                        self.remaining.retain(|handle| *handle != thread);
                        self.watch()
                    }
                },
                _ => self.watch(),
            },
            AnyPhase::Cleanup => self.cleanup(),
        }
    }
}

impl Any {
    fn watch(&mut self) -> Step {
        if self.remaining.is_empty() {
            return match self.last_failure.clone() {
                Some(failure) => Step::Complete(Outcome::Failed(failure)),
                None => Step::Complete(Outcome::Canceled),
            };
        }
        Step::Yield(Signal::join_any(self.remaining.clone()))
    }

    fn cleanup(&mut self) -> Step {
        match self.cancel_queue.pop_front() {
            Some(handle) => Step::Yield(Signal::Cancel(handle)),
            None => match self.result.take() {
                Some(outcome) => Step::Complete(outcome),
                None => Step::Complete(Outcome::done()),
            },
        }
    }
}

/// Shared wait-all tail used by `all` and `sequence`: one wait-all join over
/// the spawned handles, fail-fast with sibling cancellation.
pub(crate) struct FanIn {
    handles: Vec<ThreadId>,
    failure: Option<ThreadFailure>,
    failed_thread: Option<ThreadId>,
    cancel_idx: usize,
}

impl FanIn {
    pub(crate) fn new(handles: Vec<ThreadId>) -> Self {
        Self {
            handles,
            failure: None,
            failed_thread: None,
            cancel_idx: 0,
        }
    }

    pub(crate) fn resume(&mut self, input: Resume) -> Step {
        if self.failure.is_none() {
            match input {
                Resume::Joined { thread, outcome } => match outcome {
                    Outcome::Failed(failure) => {
                        self.failure = Some(failure);
                        self.failed_thread = Some(thread);
                    }
                    Outcome::Canceled => return Step::Complete(Outcome::Canceled),
                    Outcome::Done(_) => return Step::Complete(Outcome::done()),
                },
                _ => {
                    if self.handles.is_empty() {
                        return Step::Complete(Outcome::done());
                    }
                    return Step::Yield(Signal::join_all(self.handles.clone()));
                }
            }
        }
        // fail-fast cleanup: cancel surviving siblings one signal at a time
        while self.cancel_idx < self.handles.len() {
            let handle = self.handles[self.cancel_idx];
            self.cancel_idx += 1;
            if Some(handle) != self.failed_thread {
                return Step::Yield(Signal::Cancel(handle));
            }
        }
        match self.failure.clone() {
            Some(failure) => Step::Complete(Outcome::Failed(failure)),
            None => Step::Complete(Outcome::done()),
        }
    }
}
