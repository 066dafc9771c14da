//! # Readiness Latch
//!
//! One-shot "setup complete" signal shared between a stager running on a
//! background thread and the controlling thread waiting for it.
//!
//! The flag only ever moves from `false` to `true`. Setting it twice is a no-op,
//! and waiters re-check the flag after every wake so spurious wake-ups never
//! release a waiter early. The mutex hand-off gives `signal()` a happens-before
//! edge with the return of `wait()`.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct LatchState {
    ready: Mutex<bool>,
    condvar: Condvar,
}

/// Clonable handle to a single readiness flag
///
/// Clones share the same flag, so a clone handed to a background thread
/// signals the waiter holding the original.
#[derive(Debug, Clone, Default)]
pub struct ReadinessLatch {
    state: Arc<LatchState>,
}

impl ReadinessLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiter. Idempotent.
    pub fn signal(&self) {
        let mut ready = self.state.ready.lock();
        if !*ready {
            *ready = true;
            debug!("Readiness signalled");
        }
        self.state.condvar.notify_all();
    }

    /// Block until the flag is set; returns immediately if it already is.
    ///
    /// There is no timeout. A stager that fails before signalling leaves the
    /// caller blocked here indefinitely.
    pub fn wait(&self) {
        let mut ready = self.state.ready.lock();
        while !*ready {
            self.state.condvar.wait(&mut ready);
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.state.ready.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_latch_is_not_ready() {
        let latch = ReadinessLatch::new();
        assert!(!latch.is_ready());
    }

    #[test]
    fn test_signal_is_idempotent() {
        let latch = ReadinessLatch::new();
        latch.signal();
        latch.signal();
        latch.signal();
        assert!(latch.is_ready());
    }

    #[test]
    fn test_wait_after_signal_returns_immediately() {
        let latch = ReadinessLatch::new();
        latch.signal();
        latch.wait();
        assert!(latch.is_ready());
    }

    #[test]
    fn test_clone_shares_flag() {
        let latch = ReadinessLatch::new();
        let other = latch.clone();
        other.signal();
        assert!(latch.is_ready());
    }

    #[test]
    fn test_wait_does_not_return_before_signal() {
        let latch = ReadinessLatch::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let signaller = {
            let latch = latch.clone();
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                counter.fetch_add(1, Ordering::SeqCst);
                latch.signal();
            })
        };

        latch.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        signaller.join().unwrap();
    }

    #[test]
    fn test_signal_wakes_all_waiters() {
        let latch = ReadinessLatch::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || {
                    latch.wait();
                    latch.is_ready()
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        latch.signal();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }
}
