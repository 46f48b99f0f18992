//! Monotonic container id allocation.

use super::ContainerId;

/// Hands out container ids in increasing order.
///
/// Owned by a `Vault`.  The watermark only moves up, so an id that was
/// handed out (or observed while loading) is never handed out again,
/// even after the container holding it is removed.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: ContainerId,
}

impl IdAllocator {
    /// Start allocating at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next free id and advance the watermark.
    pub fn next_id(&mut self) -> ContainerId {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    /// Record an id that already exists so it is never reissued.
    pub fn observe(&mut self, id: ContainerId) {
        self.next = self.next.max(id.saturating_add(1));
    }

    /// The id the next call to `next_id` will return.
    pub fn watermark(&self) -> ContainerId {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequentially_from_zero() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn observe_raises_watermark() {
        let mut ids = IdAllocator::new();
        ids.observe(7);
        assert_eq!(ids.next_id(), 8);
    }

    #[test]
    fn observe_saturates_at_the_largest_id() {
        let mut ids = IdAllocator::new();
        ids.observe(ContainerId::MAX);
        assert_eq!(ids.watermark(), ContainerId::MAX);
        assert_eq!(ids.next_id(), ContainerId::MAX);
    }

    #[test]
    fn observe_never_lowers_watermark() {
        let mut ids = IdAllocator::new();
        ids.observe(10);
        ids.observe(3);
        ids.observe(-2);
        assert_eq!(ids.watermark(), 11);
    }
}
