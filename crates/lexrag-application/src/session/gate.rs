use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Per-session single-writer gate.
///
/// Queries holding the guard for one key run one at a time, in arrival
/// order; different keys never wait on each other.
pub struct SessionGate {
    /// Session ID -> that session's lock
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionGate {
    /// Creates a gate with no registered sessions.
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Waits for exclusive access to `session_id`.
    ///
    /// The registry lock is released before waiting on the session lock.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self.lock_for(session_id).await;
        lock.lock_owned().await
    }

    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(session_id) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops locks that nobody holds or waits on.
    pub async fn prune(&self) {
        let mut locks = self.locks.write().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of registered session locks.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}
