use crate::coroutine::{Coroutine, Resume, Signal, Step};

/// Spawn `factory(iteration)` immediately and then every `interval` frames,
/// forever. Invocations run concurrently and are never joined; a run still in
/// flight when the next fires simply overlaps it.
///
/// Never completes on its own; stop it by canceling its thread. An interval
/// of zero is treated as one (a frame must pass between invocations).
pub fn every<F>(interval: u32, factory: F) -> Box<dyn Coroutine>
where
    F: FnMut(usize) -> Box<dyn Coroutine> + 'static,
{
    Box::new(Every {
        interval: interval.max(1),
        until_next: 0,
        iteration: 0,
        factory: Box::new(factory),
    })
}

struct Every {
    interval: u32,
    until_next: u32,
    iteration: usize,
    factory: Box<dyn FnMut(usize) -> Box<dyn Coroutine>>,
}

impl Coroutine for Every {
    fn resume(&mut self, _input: Resume) -> Step {
        if self.until_next == 0 {
            let invocation = (self.factory)(self.iteration);
            self.iteration += 1;
            self.until_next = self.interval;
            return Step::Yield(Signal::Spawn(invocation));
        }
        self.until_next -= 1;
        Step::Yield(Signal::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::delay;
    use crate::ids::ThreadId;

    #[test]
    fn spawns_then_waits_the_interval() {
        let mut coroutine = every(2, |_| delay(0));
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
    }

    #[test]
    fn factory_sees_the_iteration_counter() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut coroutine = every(1, move |iteration| {
            sink.borrow_mut().push(iteration);
            delay(0)
        });
        let _ = coroutine.resume(Resume::Tick);
        let _ = coroutine.resume(Resume::Spawned(ThreadId(0)));
        let _ = coroutine.resume(Resume::Tick);
        let _ = coroutine.resume(Resume::Spawned(ThreadId(1)));
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut coroutine = every(0, |_| delay(0));
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Spawn(_))
        ));
        assert!(matches!(
            coroutine.resume(Resume::Spawned(ThreadId(0))),
            Step::Yield(Signal::Tick)
        ));
    }
}
