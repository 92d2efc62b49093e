use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes work per key while letting distinct keys proceed
/// concurrently. Used to order state transitions of a single anchor.
#[derive(Debug, Default)]
pub struct KeyLock {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
