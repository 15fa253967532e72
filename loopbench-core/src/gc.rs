//! Deferred-Reclamation Collector
//!
//! Process-wide switch controlling when discarded benchmark values are freed.
//! While the collector is enabled, [`dispose`] drops a value immediately.
//! While it is disabled, disposed values are parked in a global queue and
//! only freed by the next [`collect`] or [`enable`], so deallocation work never
//! lands inside a measured region.
//!
//! The switch is shared mutable state. Measurements take ownership of it
//! through [`CollectorGuard`], which serialises concurrent measurements and
//! restores the previous state on every exit path.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

static ENABLED: AtomicBool = AtomicBool::new(true);
static GARBAGE: Mutex<Vec<Box<dyn Any + Send>>> = Mutex::new(Vec::new());
static OWNER: Mutex<()> = Mutex::new(());

/// Whether disposed values are currently freed immediately.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

/// Enable immediate reclamation and free everything parked so far.
pub fn enable() {
    ENABLED.store(true, Ordering::SeqCst);
    collect();
}

/// Park disposed values until the next collection.
pub fn disable() {
    ENABLED.store(false, Ordering::SeqCst);
}

/// Hand a discarded value to the collector.
pub fn dispose<T: Send + 'static>(value: T) {
    if is_enabled() {
        drop(value);
    } else {
        lock(&GARBAGE).push(Box::new(value));
    }
}

/// Free all parked values, returning how many were freed.
pub fn collect() -> usize {
    // Drop outside the lock so destructors cannot deadlock on the queue
    let parked = std::mem::take(&mut *lock(&GARBAGE));
    let freed = parked.len();
    drop(parked);
    freed
}

/// Number of values waiting for collection.
pub fn pending() -> usize {
    lock(&GARBAGE).len()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive, scoped control over the collector state.
///
/// Acquiring records the current state and forces the requested one; dropping
/// restores the recorded state, including during unwinding. Only one guard can
/// exist at a time; a second acquisition blocks until the first is released.
pub struct CollectorGuard {
    prior: bool,
    _owner: MutexGuard<'static, ()>,
}

impl CollectorGuard {
    /// Take ownership of the collector and force it to `enabled`.
    pub fn acquire(enabled: bool) -> Self {
        let owner = lock(&OWNER);
        let prior = is_enabled();
        if enabled {
            enable();
        } else {
            disable();
        }
        tracing::debug!(prior, requested = enabled, "collector acquired");
        Self {
            prior,
            _owner: owner,
        }
    }

    /// State the collector had before this guard was acquired.
    pub fn prior(&self) -> bool {
        self.prior
    }
}

impl Drop for CollectorGuard {
    fn drop(&mut self) {
        if self.prior {
            enable();
        } else {
            disable();
        }
        tracing::debug!(restored = self.prior, "collector released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_forces_and_restores_state() {
        {
            let guard = CollectorGuard::acquire(false);
            assert!(guard.prior());
            assert!(!is_enabled());
        }

        let guard = CollectorGuard::acquire(true);
        assert!(guard.prior(), "disabled state must not leak past the guard");
        assert!(is_enabled());
    }

    #[test]
    fn test_disposed_values_wait_for_collection() {
        let _guard = CollectorGuard::acquire(false);
        let before = pending();
        dispose(vec![1u8; 64]);
        dispose(String::from("parked"));
        assert!(pending() >= before + 2);
        assert!(collect() >= 2);
    }

    #[test]
    fn test_enabled_collector_drops_immediately() {
        let _guard = CollectorGuard::acquire(true);
        let before = pending();
        dispose(vec![0u64; 8]);
        assert_eq!(pending(), before);
    }

    #[test]
    fn test_restore_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = CollectorGuard::acquire(false);
            panic!("measurement failed");
        });
        assert!(result.is_err());

        let guard = CollectorGuard::acquire(true);
        assert!(guard.prior(), "state must be restored after unwinding");
    }
}
