//! Shared-state helpers for the capture worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock a mutex, taking the inner value back if a worker panicked while holding it.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        crate::log_debug(&format!("{context}: mutex poisoned, continuing with inner value"));
        poisoned.into_inner()
    })
}

/// One-way "please stop" signal shared between an owner and its worker thread.
#[derive(Clone, Debug, Default)]
pub(crate) struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn stop_flag_is_shared_between_clones() {
        let flag = StopFlag::new();
        let worker = flag.clone();
        assert!(!worker.is_raised());
        flag.raise();
        assert!(worker.is_raised());
    }

    #[test]
    fn lock_or_recover_returns_inner_value_after_panic() {
        let shared = Arc::new(Mutex::new(7u32));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(shared.is_poisoned());
        assert_eq!(*lock_or_recover(&shared, "test"), 7);
    }
}
