//! Nonce generation for signed actions.
//!
//! The exchange keeps the highest nonces it has seen per signer and rejects
//! reused or stale values, so two actions signed within the same millisecond
//! must still get distinct nonces. `NonceManager` hands out
//! `max(last + 1, now_ms)`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for obtaining current time, enabling testability.
pub trait Clock: Send + Sync {
    /// Returns current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Strictly increasing nonce source seeded from the clock.
///
/// Thread-safe; concurrent callers never observe the same value.
pub struct NonceManager<C: Clock> {
    /// Last issued nonce.
    counter: AtomicU64,
    clock: C,
}

impl<C: Clock> NonceManager<C> {
    /// Creates a new `NonceManager` with the given clock.
    ///
    /// The counter starts one below the current time so the first nonce is
    /// exactly `now_ms`.
    #[must_use]
    pub fn new(clock: C) -> Self {
        let now = clock.now_ms();
        Self {
            counter: AtomicU64::new(now.saturating_sub(1)),
            clock,
        }
    }

    /// Generates the next nonce: `max(last + 1, now_ms)`.
    pub fn next(&self) -> u64 {
        let now = self.clock.now_ms();

        loop {
            let current = self.counter.load(Ordering::Acquire);
            let next_val = current.saturating_add(1).max(now);

            match self.counter.compare_exchange_weak(
                current,
                next_val,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_val,
                Err(_) => continue,
            }
        }
    }

    /// Last nonce handed out (or the seed if none yet).
    #[must_use]
    pub fn last(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

impl NonceManager<SystemClock> {
    /// Creates a new `NonceManager` with the system clock.
    #[must_use]
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock)
    }
}

impl Default for NonceManager<SystemClock> {
    fn default() -> Self {
        Self::with_system_clock()
    }
}
