/// Backpressure over concurrent isolated executions.
///
/// A bounded token bucket caps how many child processes may exist at once
/// across all concurrent evaluations. This protects the host from resource
/// exhaustion under burst load; it is not a correctness requirement.
use crate::config::types::{JudgeError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};

/// Fixed-size pool of execution slots.
///
/// Cloning shares the same pool; all clones draw from one token supply.
#[derive(Clone)]
pub struct SlotPool {
    tokens: Receiver<()>,
    returns: Sender<()>,
}

/// Held slot; returned to the pool on drop.
pub struct SlotGuard {
    returns: Sender<()>,
}

impl SlotPool {
    /// Create a pool with `capacity` simultaneous execution slots.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (returns, tokens) = bounded(capacity);
        for _ in 0..capacity {
            // Channel was sized for exactly these tokens.
            let _ = returns.send(());
        }
        SlotPool { tokens, returns }
    }

    /// Pool sized to the host's available parallelism.
    pub fn for_host() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        SlotPool::new(cores)
    }

    /// Acquire a slot, blocking until one is free.
    pub fn acquire(&self) -> Result<SlotGuard> {
        self.tokens
            .recv()
            .map_err(|_| JudgeError::Host("execution slot pool disconnected".to_string()))?;
        Ok(SlotGuard {
            returns: self.returns.clone(),
        })
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.tokens.len()
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // Send only fails if the pool itself is gone, in which case there
        // is nothing left to return the token to.
        let _ = self.returns.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_capacity_respected() {
        let pool = SlotPool::new(2);
        assert_eq!(pool.available(), 2);
        let a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert_eq!(pool.available(), 0);
        drop(a);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_guard_release_is_idempotent_across_clones() {
        let pool = SlotPool::new(1);
        let cloned = pool.clone();
        {
            let _guard = cloned.acquire().unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_zero_capacity_coerced_to_one() {
        let pool = SlotPool::new(0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let pool = SlotPool::new(1);
        let guard = pool.acquire().unwrap();
        let contender = pool.clone();
        let handle = std::thread::spawn(move || {
            let _slot = contender.acquire().unwrap();
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        drop(guard);
        handle.join().unwrap();
        assert_eq!(pool.available(), 1);
    }
}
