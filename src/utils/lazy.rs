//! Lazy-initialization cells with fallible initializers.
//!
//! `std::sync::OnceLock` cannot propagate an initializer error, so a failed
//! init would have to be memoized or panic. `Deferred` serializes
//! initializers behind a mutex and only stores successful values: a failed
//! init leaves the cell empty and the next access tries again.

use std::fmt;
use std::sync::OnceLock;

use parking_lot::Mutex;

pub struct Deferred<T> {
    cell: OnceLock<T>,
    init: Mutex<()>,
}

impl<T> Deferred<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// The value, if already initialized.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        match self.get_or_try_init(|| Ok::<T, std::convert::Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Initialize at most once; concurrent callers wait for the winner.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let _guard = self.init.lock();
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = init()?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Deferred").field(value).finish(),
            None => f.write_str("Deferred(<uninit>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_init_once() {
        let cell = Deferred::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cell.get_or_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                42
            });
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_init_is_retried() {
        let cell: Deferred<u32> = Deferred::new();
        assert!(cell.get_or_try_init(|| Err("nope")).is_err());
        assert!(!cell.is_initialized());
        assert_eq!(*cell.get_or_try_init(|| Ok::<_, &str>(7)).unwrap(), 7);
        assert_eq!(cell.get(), Some(&7));
    }

    #[test]
    fn test_concurrent_init_runs_once() {
        let cell = Arc::new(Deferred::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    *cell.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        1usize
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
