//! Cancellable single-shot timers keyed by entity id.
//!
//! Giveaway auto-close, drop expiry, and explicit cancellation are three
//! call sites into the same state-transition functions; this map only
//! guarantees that a pending callback can be replaced or aborted by key.
//! Timers live in memory only and are lost on restart.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A keyed set of pending single-shot tasks.
#[derive(Debug, Default)]
pub struct TimerMap<K> {
    tasks: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K: Eq + Hash> TimerMap<K> {
    /// Creates an empty timer map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Schedules `job` to run after `delay`, replacing (and aborting) any
    /// timer already pending under the same key.
    pub fn schedule<F>(&self, key: K, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(old) = tasks.insert(key, handle) {
            old.abort();
        }
    }

    /// Aborts the pending timer for `key`, if any. Returns whether a timer
    /// was registered; an already-fired timer still counts as registered,
    /// which is why the callbacks themselves must be idempotent.
    pub fn cancel(&self, key: &K) -> bool {
        match self.tasks.lock().unwrap().remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}
