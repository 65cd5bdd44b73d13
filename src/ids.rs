//! Identifiers for pool-registered threads.

use serde::{Deserialize, Serialize};

/// Opaque handle to a thread registered in a [`Pool`](crate::pool::Pool).
///
/// Handles are lookup keys into the pool's thread table, never owning
/// references, so parent/child links cannot form ownership cycles.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u32);

/// Monotonic allocator for [`ThreadId`].
/// Dense ids keep the registry compact; ids are opaque externally.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_thread: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_thread(&mut self) -> ThreadId {
        let id = ThreadId(self.next_thread);
        self.next_thread = self.next_thread.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_thread(), ThreadId(0));
        assert_eq!(alloc.alloc_thread(), ThreadId(1));
        alloc.reset();
        assert_eq!(alloc.alloc_thread(), ThreadId(0));
    }
}
