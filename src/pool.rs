//! Thread pool: owns every thread of one animation run and advances them in
//! lockstep, one step per thread per frame.
//!
//! The pool is an explicit object held by whatever drives the run (one pool
//! per run, never process-global). The clock collaborator calls [`Pool::tick`]
//! once per output frame; everything else happens through the coroutine
//! contract.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::coroutine::{Coroutine, Outcome, Resume, Signal, Step, Task, Value};
use crate::error::{FlowError, ThreadFailure};
use crate::ids::{IdAllocator, ThreadId};
use crate::promise::PromiseState;
use crate::thread::{Thread, ThreadState};

/// Discrete lifecycle signals emitted while ticking, in the order they
/// happened. Subtree cancellation emits children before their parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PoolEvent {
    Spawned {
        thread: ThreadId,
        parent: Option<ThreadId>,
    },
    Completed {
        thread: ThreadId,
        value: Value,
    },
    Failed {
        thread: ThreadId,
        failure: ThreadFailure,
    },
    Canceled {
        thread: ThreadId,
    },
}

impl PoolEvent {
    /// The thread the event is about.
    pub fn thread(&self) -> ThreadId {
        match self {
            Self::Spawned { thread, .. }
            | Self::Completed { thread, .. }
            | Self::Failed { thread, .. }
            | Self::Canceled { thread } => *thread,
        }
    }
}

/// A failure nobody was joined on when the tick that produced it ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnhandledFailure {
    pub thread: ThreadId,
    pub failure: ThreadFailure,
}

/// Outputs of one [`Pool::tick`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// Frame counter after this tick.
    pub frame: u64,
    /// Live threads remaining after the end-of-tick sweep.
    pub live: usize,
    #[serde(default)]
    pub events: Vec<PoolEvent>,
    #[serde(default)]
    pub unhandled: Vec<UnhandledFailure>,
}

impl TickReport {
    /// True once no thread remains to advance; the run is over.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.live == 0
    }
}

enum Gate {
    Skip,
    Run(Resume),
    Reject(String),
}

enum StepEnd {
    Park(ThreadState),
    Finish(Outcome),
}

/// Frame-synchronized scheduler over a table of cooperative threads.
pub struct Pool {
    threads: IndexMap<ThreadId, Thread>,
    ids: IdAllocator,
    frame: u64,
    events: Vec<PoolEvent>,
    failed_this_tick: Vec<ThreadId>,
}

impl Pool {
    pub fn new() -> Self {
        Self {
            threads: IndexMap::new(),
            ids: IdAllocator::new(),
            frame: 0,
            events: Vec::new(),
            failed_this_tick: Vec::new(),
        }
    }

    /// Register a root thread. A [`Task::Handle`] is already spawned and is
    /// returned unchanged; a promise is wrapped so the thread awaits it.
    pub fn spawn(&mut self, task: impl Into<Task>) -> ThreadId {
        match task.into() {
            Task::Handle(id) => id,
            task => self.register(task.into_coroutine(), None),
        }
    }

    /// Advance every live thread by one step, in registration order.
    ///
    /// The schedule is snapshotted at entry: threads spawned during this tick
    /// are appended to the pool but take their first step next tick. Threads
    /// gated on an unready join or promise consume no step. Returns the
    /// report for this frame; [`FlowError`] values are programming errors
    /// (bad handles), not animation failures.
    pub fn tick(&mut self) -> Result<TickReport, FlowError> {
        self.frame += 1;
        let scheduled: Vec<ThreadId> = self.threads.keys().copied().collect();
        for id in scheduled {
            let live = self
                .threads
                .get(&id)
                .map(|thread| thread.state.is_live())
                .unwrap_or(false);
            if live {
                self.step_thread(id)?;
            }
        }
        let unhandled = self.collect_unhandled();
        self.sweep();
        Ok(TickReport {
            frame: self.frame,
            live: self.live_count(),
            events: std::mem::take(&mut self.events),
            unhandled,
        })
    }

    /// Drive a single thread through one runtime step.
    ///
    /// This is the same protocol `tick` applies to every thread; resuming a
    /// terminal thread is an [`FlowError::InvalidState`] error.
    pub fn advance(&mut self, id: ThreadId) -> Result<(), FlowError> {
        self.step_thread(id)
    }

    /// Cancel a thread and its whole subtree, children first. A no-op on
    /// threads that are already terminal.
    pub fn cancel(&mut self, id: ThreadId) -> Result<(), FlowError> {
        if !self.threads.contains_key(&id) {
            return Err(FlowError::UnknownThread { thread: id });
        }
        self.cancel_subtree(id);
        Ok(())
    }

    /// Cancel every root thread and their subtrees.
    pub fn cancel_all(&mut self) {
        let roots: Vec<ThreadId> = self
            .threads
            .values()
            .filter(|thread| thread.parent.is_none())
            .map(|thread| thread.id)
            .collect();
        for root in roots {
            self.cancel_subtree(root);
        }
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn state(&self, id: ThreadId) -> Option<&ThreadState> {
        self.threads.get(&id).map(|thread| &thread.state)
    }

    /// Terminal outcome of a thread still present in the table.
    pub fn outcome(&self, id: ThreadId) -> Option<Outcome> {
        self.threads
            .get(&id)
            .and_then(|thread| thread.state.outcome())
            .cloned()
    }

    pub fn is_live(&self, id: ThreadId) -> bool {
        self.threads
            .get(&id)
            .map(|thread| thread.state.is_live())
            .unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.threads
            .values()
            .filter(|thread| thread.state.is_live())
            .count()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    fn register(&mut self, coroutine: Box<dyn Coroutine>, parent: Option<ThreadId>) -> ThreadId {
        let id = self.ids.alloc_thread();
        if let Some(parent_id) = parent {
            if let Some(parent_thread) = self.threads.get_mut(&parent_id) {
                parent_thread.children.push(id);
            }
        }
        self.threads.insert(id, Thread::new(id, coroutine, parent));
        log::trace!("spawned {:?} (parent {:?})", id, parent);
        self.events.push(PoolEvent::Spawned { thread: id, parent });
        id
    }

    /// One runtime step: gate, resume, classify, park or finish.
    fn step_thread(&mut self, id: ThreadId) -> Result<(), FlowError> {
        let gate = {
            let thread = self
                .threads
                .get(&id)
                .ok_or(FlowError::UnknownThread { thread: id })?;
            match &thread.state {
                ThreadState::Finished(_) | ThreadState::Running => {
                    return Err(FlowError::InvalidState { thread: id });
                }
                ThreadState::Suspended => Gate::Run(Resume::Tick),
                ThreadState::Joining { targets, wait_all } => {
                    match self.join_ready(targets, *wait_all) {
                        None => Gate::Skip,
                        Some((thread, outcome)) => Gate::Run(Resume::Joined { thread, outcome }),
                    }
                }
                ThreadState::Awaiting(promise) => match promise.poll() {
                    PromiseState::Pending => Gate::Skip,
                    PromiseState::Resolved(value) => Gate::Run(Resume::Resolved(value)),
                    PromiseState::Rejected(message) => Gate::Reject(message),
                },
            }
        };
        match gate {
            Gate::Skip => Ok(()),
            Gate::Reject(message) => {
                // a rejected promise fails the thread without resuming it
                self.finish_thread(id, Outcome::Failed(ThreadFailure::new(message)));
                Ok(())
            }
            Gate::Run(input) => self.drive(id, input),
        }
    }

    /// Whether a parked join can wake, and what to deliver if so.
    ///
    /// Wait-all wakes early on the first failed target (in target order) and
    /// otherwise delivers the last target's outcome once all are terminal.
    /// Wait-any delivers the first terminal target in target order. A target
    /// reclaimed from the table counts as settled-canceled.
    fn join_ready(&self, targets: &[ThreadId], wait_all: bool) -> Option<(ThreadId, Outcome)> {
        if wait_all {
            let mut last: Option<(ThreadId, Outcome)> = None;
            for target in targets {
                match self.threads.get(target) {
                    Some(thread) => match thread.state.outcome() {
                        Some(Outcome::Failed(failure)) => {
                            return Some((*target, Outcome::Failed(failure.clone())));
                        }
                        Some(outcome) => last = Some((*target, outcome.clone())),
                        None => return None,
                    },
                    None => last = Some((*target, Outcome::Canceled)),
                }
            }
            last
        } else {
            for target in targets {
                match self.threads.get(target) {
                    Some(thread) => {
                        if let Some(outcome) = thread.state.outcome() {
                            return Some((*target, outcome.clone()));
                        }
                    }
                    None => return Some((*target, Outcome::Canceled)),
                }
            }
            None
        }
    }

    /// Resume the thread's delegation stack until it parks or finishes.
    ///
    /// Delegation, spawning, and canceling other threads all continue inside
    /// the same step; only Tick, Join, and Await end it. The stack is taken
    /// out of the table for the duration, so a thread can never re-enter its
    /// own resumption, and a cancel that reaches this thread from an ancestor
    /// is detected by its table entry turning terminal mid-step.
    fn drive(&mut self, id: ThreadId, first: Resume) -> Result<(), FlowError> {
        let mut stack = match self.threads.get_mut(&id) {
            Some(thread) => {
                thread.state = ThreadState::Running;
                std::mem::take(&mut thread.stack)
            }
            None => return Err(FlowError::UnknownThread { thread: id }),
        };
        let mut input = first;
        let end = loop {
            let step = match stack.last_mut() {
                Some(top) => top.resume(input),
                None => break StepEnd::Finish(Outcome::done()),
            };
            match step {
                Step::Yield(Signal::Tick) => break StepEnd::Park(ThreadState::Suspended),
                Step::Yield(Signal::Delegate(inner)) => {
                    stack.push(inner);
                    input = Resume::Tick;
                }
                Step::Yield(Signal::Spawn(inner)) => {
                    let child = self.register(inner, Some(id));
                    input = Resume::Spawned(child);
                }
                Step::Yield(Signal::Join { targets, wait_all }) => {
                    let missing = targets
                        .iter()
                        .find(|target| !self.threads.contains_key(*target))
                        .copied();
                    if let Some(thread) = missing {
                        self.restore(id, stack, ThreadState::Suspended);
                        return Err(FlowError::UnknownThread { thread });
                    }
                    if targets.is_empty() {
                        // trivially satisfied; keep going this step
                        input = Resume::Tick;
                        continue;
                    }
                    break StepEnd::Park(ThreadState::Joining { targets, wait_all });
                }
                Step::Yield(Signal::Cancel(target)) => {
                    if !self.threads.contains_key(&target) {
                        self.restore(id, stack, ThreadState::Suspended);
                        return Err(FlowError::UnknownThread { thread: target });
                    }
                    self.cancel_subtree(target);
                    let self_terminal = self
                        .threads
                        .get(&id)
                        .map(|thread| thread.state.is_terminal())
                        .unwrap_or(true);
                    if self_terminal {
                        // canceled itself, or an ancestor of itself
                        return Ok(());
                    }
                    input = Resume::Tick;
                }
                Step::Yield(Signal::Await(promise)) => {
                    break StepEnd::Park(ThreadState::Awaiting(promise));
                }
                Step::Complete(outcome) => {
                    if stack.len() > 1 {
                        stack.pop();
                        input = Resume::Delegated(outcome);
                    } else {
                        break StepEnd::Finish(outcome);
                    }
                }
            }
        };
        match end {
            StepEnd::Park(state) => self.restore(id, stack, state),
            StepEnd::Finish(outcome) => {
                drop(stack);
                self.finish_thread(id, outcome);
            }
        }
        Ok(())
    }

    fn restore(&mut self, id: ThreadId, stack: Vec<Box<dyn Coroutine>>, state: ThreadState) {
        if let Some(thread) = self.threads.get_mut(&id) {
            thread.stack = stack;
            thread.state = state;
        }
    }

    /// Move a thread to a terminal state, unwinding its living children
    /// first. Children are owned: nothing of the subtree outlives the parent.
    fn finish_thread(&mut self, id: ThreadId, outcome: Outcome) {
        self.cancel_children(id);
        match self.threads.get_mut(&id) {
            Some(thread) => {
                thread.stack.clear();
                thread.state = ThreadState::Finished(outcome.clone());
            }
            None => return,
        }
        log::trace!("{:?} finished: {}", id, outcome_name(&outcome));
        match outcome {
            Outcome::Done(value) => self.events.push(PoolEvent::Completed { thread: id, value }),
            Outcome::Failed(failure) => {
                self.failed_this_tick.push(id);
                self.events.push(PoolEvent::Failed {
                    thread: id,
                    failure,
                });
            }
            Outcome::Canceled => self.events.push(PoolEvent::Canceled { thread: id }),
        }
    }

    fn cancel_subtree(&mut self, id: ThreadId) {
        let live = self
            .threads
            .get(&id)
            .map(|thread| thread.state.is_live())
            .unwrap_or(false);
        if live {
            self.finish_thread(id, Outcome::Canceled);
        }
    }

    fn cancel_children(&mut self, id: ThreadId) {
        let children = match self.threads.get(&id) {
            Some(thread) => thread.children.clone(),
            None => return,
        };
        for child in children {
            self.cancel_subtree(child);
        }
    }

    /// Failures from this tick that no live thread is joined on.
    fn collect_unhandled(&mut self) -> Vec<UnhandledFailure> {
        let failed = std::mem::take(&mut self.failed_this_tick);
        let mut unhandled = Vec::new();
        for id in failed {
            let joined = self
                .threads
                .values()
                .any(|thread| thread.state.is_live() && thread.joins(id));
            if joined {
                continue;
            }
            if let Some(Outcome::Failed(failure)) =
                self.threads.get(&id).and_then(|thread| thread.state.outcome())
            {
                log::warn!("unhandled failure in {:?}: {}", id, failure);
                unhandled.push(UnhandledFailure {
                    thread: id,
                    failure: failure.clone(),
                });
            }
        }
        unhandled
    }

    /// Reclaim terminal threads nobody is joined on. Outcomes survive only as
    /// long as a live join point references them.
    fn sweep(&mut self) {
        let mut pruned: Vec<ThreadId> = Vec::new();
        for (id, thread) in &self.threads {
            if !thread.is_terminal() {
                continue;
            }
            let joined = self
                .threads
                .values()
                .any(|other| other.state.is_live() && other.joins(*id));
            if !joined {
                pruned.push(*id);
            }
        }
        if pruned.is_empty() {
            return;
        }
        for id in &pruned {
            self.threads.shift_remove(id);
        }
        for thread in self.threads.values_mut() {
            thread.children.retain(|child| !pruned.contains(child));
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Done(_) => "done",
        Outcome::Failed(_) => "failed",
        Outcome::Canceled => "canceled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::from_fn;

    fn finish_now() -> Box<dyn Coroutine> {
        from_fn(|_| Step::Complete(Outcome::done()))
    }

    #[test]
    fn spawning_a_handle_is_identity() {
        let mut pool = Pool::new();
        let id = pool.spawn(finish_now());
        assert_eq!(pool.spawn(id), id);
        assert_eq!(pool.thread_count(), 1);
    }

    #[test]
    fn advance_past_terminal_is_invalid_state() {
        let mut pool = Pool::new();
        let id = pool.spawn(finish_now());
        pool.advance(id).unwrap();
        assert_eq!(
            pool.outcome(id),
            Some(Outcome::done()),
            "outcome retained until sweep"
        );
        assert_eq!(
            pool.advance(id),
            Err(FlowError::InvalidState { thread: id })
        );
    }

    #[test]
    fn cancel_unknown_handle_errors() {
        let mut pool = Pool::new();
        assert_eq!(
            pool.cancel(ThreadId(42)),
            Err(FlowError::UnknownThread {
                thread: ThreadId(42)
            })
        );
    }
}
