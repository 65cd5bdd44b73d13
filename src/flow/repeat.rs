use crate::coroutine::{Coroutine, Outcome, Resume, Signal, Step};

/// Delegate into `factory(iteration)` to completion, then repeat.
///
/// Bounded by `times`, or infinite when `None` (an infinite loop never
/// completes on its own; it ends only through cancellation). A failed
/// iteration fails the loop and stops it.
pub fn repeat<F>(times: Option<usize>, factory: F) -> Box<dyn Coroutine>
where
    F: FnMut(usize) -> Box<dyn Coroutine> + 'static,
{
    Box::new(Repeat {
        times,
        iteration: 0,
        factory: Box::new(factory),
    })
}

struct Repeat {
    times: Option<usize>,
    iteration: usize,
    factory: Box<dyn FnMut(usize) -> Box<dyn Coroutine>>,
}

impl Coroutine for Repeat {
    fn resume(&mut self, input: Resume) -> Step {
        if let Resume::Delegated(Outcome::Failed(failure)) = input {
            return Step::Complete(Outcome::Failed(failure));
        }
        if let Some(times) = self.times {
            if self.iteration >= times {
                return Step::Complete(Outcome::done());
            }
        }
        let body = (self.factory)(self.iteration);
        self.iteration += 1;
        Step::Yield(Signal::Delegate(body))
    }
}
