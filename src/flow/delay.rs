use crate::coroutine::{Coroutine, Outcome, Resume, Signal, Step};

/// Wait a fixed number of frames, then complete.
///
/// `delay(0)` completes on its first resumption without yielding.
pub fn delay(frames: u32) -> Box<dyn Coroutine> {
    Box::new(Delay { remaining: frames })
}

struct Delay {
    remaining: u32,
}

impl Coroutine for Delay {
    fn resume(&mut self, _input: Resume) -> Step {
        if self.remaining == 0 {
            Step::Complete(Outcome::done())
        } else {
            self.remaining -= 1;
            Step::Yield(Signal::Tick)
        }
    }
}
