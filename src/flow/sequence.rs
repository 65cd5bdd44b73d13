use std::collections::VecDeque;

use crate::coroutine::{Coroutine, Resume, Signal, Step, Task};
use crate::flow::parallel::FanIn;
use crate::ids::ThreadId;

/// Staggered fan-out: start each task `interval` frames after the previous
/// one *started*, all running concurrently, then wait for every one of them.
///
/// The tail behaves like [`all`](crate::flow::all): the first child failure
/// cancels the surviving siblings and fails the sequence.
pub fn sequence(interval: u32, tasks: Vec<Task>) -> Box<dyn Coroutine> {
    Box::new(Sequence {
        interval,
        countdown: 0,
        pending: tasks.into_iter().collect(),
        handles: Vec::new(),
        wait: None,
    })
}

struct Sequence {
    interval: u32,
    countdown: u32,
    pending: VecDeque<Task>,
    handles: Vec<ThreadId>,
    wait: Option<FanIn>,
}

impl Coroutine for Sequence {
    fn resume(&mut self, input: Resume) -> Step {
        if let Some(wait) = self.wait.as_mut() {
            return wait.resume(input);
        }
        if let Resume::Spawned(handle) = input {
            self.handles.push(handle);
            self.countdown = self.interval;
        }
        loop {
            if self.pending.is_empty() {
                let mut wait = FanIn::new(std::mem::take(&mut self.handles));
                let step = wait.resume(Resume::Tick);
                self.wait = Some(wait);
                return step;
            }
            if self.countdown > 0 {
                self.countdown -= 1;
                return Step::Yield(Signal::Tick);
            }
            match self.pending.pop_front() {
                Some(Task::Handle(handle)) => {
                    self.handles.push(handle);
                    self.countdown = self.interval;
                }
                Some(task) => return Step::Yield(Signal::Spawn(task.into_coroutine())),
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::delay;

    #[test]
    fn staggers_starts_by_the_interval() {
        let mut coroutine = sequence(2, vec![delay(1).into(), delay(1).into()]);
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Spawn(_))
        ));
        assert!(matches!(
            coroutine.resume(Resume::Spawned(ThreadId(1))),
            Step::Yield(Signal::Tick)
        ));
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Tick)
        ));
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Spawn(_))
        ));
        match coroutine.resume(Resume::Spawned(ThreadId(2))) {
            Step::Yield(Signal::Join { targets, wait_all }) => {
                assert_eq!(targets, vec![ThreadId(1), ThreadId(2)]);
                assert!(wait_all);
            }
            other => panic!("expected wait-all tail, got {other:?}"),
        }
    }

    #[test]
    fn zero_interval_degenerates_to_all() {
        let mut coroutine = sequence(0, vec![delay(1).into(), delay(1).into()]);
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Spawn(_))
        ));
        assert!(matches!(
            coroutine.resume(Resume::Spawned(ThreadId(1))),
            Step::Yield(Signal::Spawn(_))
        ));
        assert!(matches!(
            coroutine.resume(Resume::Spawned(ThreadId(2))),
            Step::Yield(Signal::Join { .. })
        ));
    }
}
