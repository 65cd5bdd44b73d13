//! Bridge to external asynchronous work.
//!
//! The scheduler accepts anything that "eventually resolves or rejects" as an
//! await payload. Scheduling is single-threaded and frame-quantized, so a
//! promise is a cheap clonable cell: the owner of the animation run settles
//! it between ticks and the pool polls it when gating awaiting threads.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coroutine::Value;

/// Settlement state of a [`Promise`].
#[derive(Clone, Debug, PartialEq)]
pub enum PromiseState {
    Pending,
    Resolved(Value),
    Rejected(String),
}

impl PromiseState {
    #[inline]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Shared handle to an eventually-available value.
///
/// Clones observe the same settlement. The first `resolve`/`reject` wins;
/// later settlement attempts are ignored.
#[derive(Clone, Debug)]
pub struct Promise {
    inner: Rc<RefCell<PromiseState>>,
}

impl Promise {
    /// A promise nobody has settled yet.
    pub fn pending() -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseState::Pending)),
        }
    }

    /// An already-resolved promise.
    pub fn resolved(value: Value) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseState::Resolved(value))),
        }
    }

    /// An already-rejected promise.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseState::Rejected(message.into()))),
        }
    }

    /// Settle with a value. No-op if already settled.
    pub fn resolve(&self, value: Value) {
        let mut state = self.inner.borrow_mut();
        if !state.is_settled() {
            *state = PromiseState::Resolved(value);
        }
    }

    /// Settle with a rejection reason. No-op if already settled.
    pub fn reject(&self, message: impl Into<String>) {
        let mut state = self.inner.borrow_mut();
        if !state.is_settled() {
            *state = PromiseState::Rejected(message.into());
        }
    }

    /// Snapshot the current settlement state.
    pub fn poll(&self) -> PromiseState {
        self.inner.borrow().clone()
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.inner.borrow().is_settled()
    }
}

impl Default for Promise {
    fn default() -> Self {
        Self::pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_settlement_wins() {
        let promise = Promise::pending();
        assert!(!promise.is_settled());

        promise.resolve(json!(1));
        promise.reject("too late");
        assert_eq!(promise.poll(), PromiseState::Resolved(json!(1)));
    }

    #[test]
    fn clones_share_state() {
        let promise = Promise::pending();
        let observer = promise.clone();
        promise.reject("boom");
        assert_eq!(observer.poll(), PromiseState::Rejected("boom".to_string()));
    }

    #[test]
    fn preset_constructors() {
        assert_eq!(
            Promise::resolved(json!("ok")).poll(),
            PromiseState::Resolved(json!("ok"))
        );
        assert!(Promise::rejected("no").is_settled());
    }
}
