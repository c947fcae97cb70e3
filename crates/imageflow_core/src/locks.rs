//! Per-key async mutexes serializing read-modify-write cycles on KV keys.
//!
//! Lock order, outermost first: image record, tag registry, list keys. When
//! several list keys are needed at once they are taken through
//! [`KeyLocks::lock_many`], which sorts them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of one async mutex per key. Slots are created on demand and
/// dropped once no task holds or waits on them.
#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<Slots>,
}

/// Held lock on a single key. Released on drop.
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots();
        // Two references left means the map and this guard: nobody waits.
        let idle = slots
            .get(&self.key)
            .map(|slot| Arc::strong_count(slot) <= 2)
            .unwrap_or(false);
        if idle {
            slots.remove(&self.key);
        }
        drop(slots);
        self.guard.take();
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        // Slot map only holds Arcs; a panic elsewhere cannot leave it torn.
        self.slots.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Key lock registry poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let slot = self
            .slots()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let guard = slot.lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Lock several keys in sorted order, skipping duplicates.
    pub async fn lock_many<S: AsRef<str>>(&self, keys: &[S]) -> Vec<KeyGuard<'_>> {
        let mut ordered: Vec<&str> = keys.iter().map(|key| key.as_ref()).collect();
        ordered.sort_unstable();
        ordered.dedup();
        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys currently locked or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots().len()
    }
}
