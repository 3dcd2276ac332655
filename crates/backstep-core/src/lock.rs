//! Mutual exclusion between migration runs.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Named lock guarding a migration against concurrent runs.
///
/// Implementations backed by a shared service provide cross-process
/// exclusion; [`LocalLock`] only excludes runs within one process.
pub trait DistributedLock: Send + Sync {
    /// Try to take `key`, waiting up to `timeout`. Returns whether the lock
    /// was acquired.
    fn acquire(&self, key: &str, timeout: Duration) -> bool;

    /// Release `key`. Releasing a key that is not held does nothing.
    fn release(&self, key: &str);
}

/// In-process lock table.
#[derive(Debug, Default)]
pub struct LocalLock {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl LocalLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held.
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }
}

impl DistributedLock for LocalLock {
    fn acquire(&self, key: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        while held.contains(key) {
            if self.released.wait_until(&mut held, deadline).timed_out() {
                if held.contains(key) {
                    return false;
                }
                break;
            }
        }
        held.insert(key.to_string());
        true
    }

    fn release(&self, key: &str) {
        if self.held.lock().remove(key) {
            self.released.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_exclusive_per_key() {
        let lock = LocalLock::new();
        assert!(lock.acquire("migration:a", Duration::ZERO));
        assert!(!lock.acquire("migration:a", Duration::from_millis(10)));
        assert!(lock.acquire("migration:b", Duration::ZERO));

        lock.release("migration:a");
        assert!(!lock.is_held("migration:a"));
        assert!(lock.acquire("migration:a", Duration::ZERO));
    }

    #[test]
    fn test_waiter_acquires_after_release() {
        let lock = Arc::new(LocalLock::new());
        assert!(lock.acquire("migration:x", Duration::ZERO));

        let waiter = {
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || lock.acquire("migration:x", Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(20));
        lock.release("migration:x");

        assert!(waiter.join().unwrap());
        assert!(lock.is_held("migration:x"));
    }

    #[test]
    fn test_release_unknown_key_is_noop() {
        let lock = LocalLock::new();
        lock.release("missing");
        assert!(!lock.is_held("missing"));
    }
}
