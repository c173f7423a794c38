//! Settlement idempotency guard: prevents settling a pool batch twice.
//!
//! Each `(pool, batch index)` pair can only be settled once. Attempting to
//! settle it a second time returns [`AmmbatchError::BatchAlreadySettled`].
//!
//! The guard maintains an LRU-style bounded cache so memory usage stays
//! predictable in long-running engines.

use std::collections::{HashSet, VecDeque};

use ammbatch_types::{AmmbatchError, BatchIndex, PoolId, Result};

type BatchKey = (PoolId, BatchIndex);

/// Prevents double-settlement of the same pool batch.
///
/// When the set reaches `max_size`, the oldest entry is evicted to make room.
#[derive(Debug, Clone)]
pub struct BatchGuard {
    settled: HashSet<BatchKey>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<BatchKey>,
    max_size: usize,
}

impl BatchGuard {
    /// Create a guard remembering at most `max_size` batches (at least one).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            settled: HashSet::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Fail if this batch was already settled.
    pub fn check(&self, pool_id: PoolId, batch_index: BatchIndex) -> Result<()> {
        if self.is_settled(pool_id, batch_index) {
            return Err(AmmbatchError::BatchAlreadySettled {
                pool_id,
                batch_index,
            });
        }
        Ok(())
    }

    /// Mark a batch as settled.
    ///
    /// # Errors
    /// Returns [`AmmbatchError::BatchAlreadySettled`] if it already was.
    pub fn mark_settled(&mut self, pool_id: PoolId, batch_index: BatchIndex) -> Result<()> {
        self.check(pool_id, batch_index)?;

        if self.settled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }

        self.settled.insert((pool_id, batch_index));
        self.order.push_back((pool_id, batch_index));
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, pool_id: PoolId, batch_index: BatchIndex) -> bool {
        self.settled.contains(&(pool_id, batch_index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_settle_ok() {
        let mut guard = BatchGuard::new(100);
        assert!(guard.mark_settled(PoolId(1), BatchIndex(1)).is_ok());
        assert!(guard.is_settled(PoolId(1), BatchIndex(1)));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn double_settle_blocked() {
        let mut guard = BatchGuard::new(100);
        guard.mark_settled(PoolId(1), BatchIndex(4)).unwrap();

        let err = guard.mark_settled(PoolId(1), BatchIndex(4)).unwrap_err();
        assert!(
            matches!(
                err,
                AmmbatchError::BatchAlreadySettled { pool_id, batch_index }
                    if pool_id == PoolId(1) && batch_index == BatchIndex(4)
            ),
            "Expected BatchAlreadySettled, got: {err:?}"
        );
    }

    #[test]
    fn same_index_other_pool_ok() {
        let mut guard = BatchGuard::new(100);
        guard.mark_settled(PoolId(1), BatchIndex(1)).unwrap();
        guard.mark_settled(PoolId(2), BatchIndex(1)).unwrap();
        guard.mark_settled(PoolId(1), BatchIndex(2)).unwrap();
        assert_eq!(guard.len(), 3);
    }

    #[test]
    fn evicts_oldest() {
        let mut guard = BatchGuard::new(2);
        guard.mark_settled(PoolId(1), BatchIndex(1)).unwrap();
        guard.mark_settled(PoolId(1), BatchIndex(2)).unwrap();
        guard.mark_settled(PoolId(1), BatchIndex(3)).unwrap();
        assert_eq!(guard.len(), 2);
        assert!(!guard.is_settled(PoolId(1), BatchIndex(1)), "oldest should have been evicted");
        assert!(guard.is_settled(PoolId(1), BatchIndex(3)));
    }

    #[test]
    fn zero_size_keeps_one() {
        let mut guard = BatchGuard::new(0);
        assert!(guard.is_empty());
        guard.mark_settled(PoolId(1), BatchIndex(1)).unwrap();
        assert_eq!(guard.len(), 1);
    }
}
