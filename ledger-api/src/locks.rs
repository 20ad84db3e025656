//! Per-key async critical sections

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key, created on demand and dropped once unused
#[derive(Default)]
pub struct KeyedLocks {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while the caller owns the critical section for `key`
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds `key`
    pub async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let entry = {
            let mut entries = self.entries();
            sweep(&mut entries);
            entries.entry(key.to_string()).or_default().clone()
        };
        let guard = entry.lock_owned().await;
        KeyedGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drop entries only the map still refers to: no holder, no waiter.
/// A waiter cancelled after the holder released leaves one of these behind.
fn sweep(entries: &mut HashMap<String, Arc<AsyncMutex<()>>>) {
    entries.retain(|_, entry| Arc::strong_count(entry) > 1);
}

impl KeyedGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        sweep(&mut self.locks.entries());
    }
}


