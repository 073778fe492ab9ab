use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// One async mutex per key, created on demand and dropped once no task holds
/// or waits for it.
pub struct KeyedLocks<K: Eq + Hash> {
    slots: Slots<K>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn lock(&self, key: K) -> KeyGuard<K> {
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();
        let guard = slot.clone().lock_owned().await;
        KeyGuard {
            key,
            slot,
            guard: Some(guard),
            slots: self.slots.clone(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct KeyGuard<K: Eq + Hash> {
    key: K,
    slot: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots<K>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock();
        // Only the map and this guard still reference the slot.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}
