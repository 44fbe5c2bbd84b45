//! Session-keyed recall store
//!
//! Remembers the most recent value per session key so follow-up requests
//! ("give me another one") can refer back to what a session was last
//! given. Entries expire after a TTL and are evicted lazily on access.
//! The store is shared by handle; callers receive it at construction
//! time instead of reaching for process-wide state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Default entry lifetime in hours
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

/// Thread-safe per-session store with a TTL
#[derive(Debug)]
pub struct SessionStore<T> {
    entries: Arc<RwLock<HashMap<String, Entry<T>>>>,
    ttl: Duration,
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<T: Clone> Default for SessionStore<T> {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}

impl<T: Clone> SessionStore<T> {
    /// Create a store whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Remember `value` for `key`, replacing any previous entry
    pub fn remember(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        if let Ok(mut entries) = self.entries.write() {
            debug!(session = %key, "remembering session entry");
            entries.insert(
                key,
                Entry {
                    value,
                    stored_at: Utc::now(),
                },
            );
        }
    }

    /// Recall the value for `key` if it has not expired
    ///
    /// An expired entry is removed on the way out.
    pub fn recall(&self, key: &str) -> Option<T> {
        let stored_at = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).map(|e| e.stored_at))?;

        if Utc::now() - stored_at > self.ttl {
            debug!(session = %key, "session entry expired");
            self.forget(key);
            return None;
        }

        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).map(|e| e.value.clone()))
    }

    /// Drop the entry for `key`, reporting whether one existed
    pub fn forget(&self, key: &str) -> bool {
        self.entries
            .write()
            .ok()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            entries.retain(|_, e| now - e.stored_at <= self.ttl);
            let removed = before - entries.len();
            if removed > 0 {
                debug!(removed, "pruned expired session entries");
            }
            removed
        } else {
            0
        }
    }

    /// Number of entries, including any not yet evicted
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
