use std::collections::VecDeque;

use crate::coroutine::{Coroutine, Outcome, Resume, Signal, Step, Task};

/// Run each segment to completion in order by delegating into it.
///
/// Total duration is the sum of the segments'. A failed segment aborts the
/// rest and becomes the chain's own failure; a segment that resolves as
/// canceled (a joined handle whose thread was canceled) is not an error and
/// the chain moves on. The last segment's value is passed through.
pub fn chain(segments: Vec<Task>) -> Box<dyn Coroutine> {
    Box::new(Chain {
        pending: segments.into_iter().collect(),
    })
}

struct Chain {
    pending: VecDeque<Task>,
}

impl Coroutine for Chain {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Delegated(Outcome::Failed(failure)) => {
                Step::Complete(Outcome::Failed(failure))
            }
            input => match self.pending.pop_front() {
                Some(task) => Step::Yield(Signal::Delegate(task.into_coroutine())),
                None => match input {
                    Resume::Delegated(Outcome::Done(value)) => Step::Complete(Outcome::Done(value)),
                    _ => Step::Complete(Outcome::done()),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThreadFailure;
    use crate::flow::delay;
    use serde_json::json;

    #[test]
    fn delegates_in_order_then_completes() {
        let mut coroutine = chain(vec![delay(1).into(), delay(1).into()]);
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Yield(Signal::Delegate(_))
        ));
        assert!(matches!(
            coroutine.resume(Resume::Delegated(Outcome::done())),
            Step::Yield(Signal::Delegate(_))
        ));
        assert!(matches!(
            coroutine.resume(Resume::Delegated(Outcome::Done(json!(7)))),
            Step::Complete(Outcome::Done(v)) if v == json!(7)
        ));
    }

    #[test]
    fn failed_segment_aborts_the_rest() {
        let mut coroutine = chain(vec![delay(1).into(), delay(1).into()]);
        let _ = coroutine.resume(Resume::Tick);
        let failure = ThreadFailure::new("segment blew up");
        match coroutine.resume(Resume::Delegated(Outcome::Failed(failure.clone()))) {
            Step::Complete(Outcome::Failed(f)) => assert_eq!(f, failure),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_chain_completes_immediately() {
        let mut coroutine = chain(Vec::new());
        assert!(matches!(
            coroutine.resume(Resume::Tick),
            Step::Complete(Outcome::Done(_))
        ));
    }
}
