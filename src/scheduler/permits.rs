//! Counting semaphore bounding concurrently active partition workers.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A fixed pool of worker slots.
///
/// The dispatcher blocks in [`WorkerPermits::acquire`] until a slot is free;
/// the returned [`Permit`] travels into the worker thread and frees its slot
/// on drop, including when the worker panics.
#[derive(Debug)]
pub struct WorkerPermits {
    capacity: usize,
    available: Mutex<usize>,
    freed: Condvar,
}

impl WorkerPermits {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            available: Mutex::new(capacity),
            freed: Condvar::new(),
        })
    }

    /// Take a slot, blocking while all are in use.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut available = self.available.lock();
        while *available == 0 {
            self.freed.wait(&mut available);
        }
        *available -= 1;
        Permit {
            pool: Arc::clone(self),
        }
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.capacity - *self.available.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        self.freed.notify_one();
    }
}

/// One held slot of a [`WorkerPermits`] pool.
#[derive(Debug)]
pub struct Permit {
    pool: Arc<WorkerPermits>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.pool.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn permits_are_returned_on_drop() {
        let pool = WorkerPermits::new(2);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.active(), 2);
        drop(a);
        assert_eq!(pool.active(), 1);
        drop(b);
        assert_eq!(pool.active(), 0);
    }

    #[test]
    fn never_exceeds_capacity() {
        let pool = WorkerPermits::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let permit = pool.acquire();
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _permit = permit;
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.active(), 0);
    }
}
