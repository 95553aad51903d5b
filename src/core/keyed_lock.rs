use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

// Far longer than any guarded section, which is bounded by HTTP timeouts
const LOCK_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Async mutexes keyed by entity id, e.g. `tg:<telegram id>` or `invite:<code>`.
///
/// Idle entries are evicted so the table does not grow with every id ever seen.
#[derive(Clone)]
pub struct KeyedLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            locks: Cache::builder().time_to_idle(LOCK_IDLE_TTL).build(),
        }
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .get_with(key.to_string(), || Arc::new(Mutex::new(())));
        mutex.lock_owned().await
    }

    pub async fn lock_telegram_id(&self, telegram_id: i64) -> OwnedMutexGuard<()> {
        self.lock(&format!("tg:{telegram_id}")).await
    }

    pub async fn lock_invite_code(&self, code: &str) -> OwnedMutexGuard<()> {
        self.lock(&format!("invite:{code}")).await
    }
}
