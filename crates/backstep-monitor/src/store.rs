//! Persistent session storage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};
use crate::error::{MonitorError, Result};
use crate::session::MonitorSession;

/// Where sessions are persisted so other processes can observe them.
pub trait SessionStore: Send + Sync {
    /// Read a session, `None` when missing or expired.
    fn get(&self, key: &str) -> Result<Option<MonitorSession>>;

    /// Write a session that expires after `ttl`.
    fn set(&self, key: &str, session: &MonitorSession, ttl: Duration) -> Result<()>;

    /// Delete a session.
    fn remove(&self, key: &str) -> Result<()>;
}

struct Entry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// In-memory store holding sessions as JSON documents.
pub struct MemorySessionStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` to decide expiry.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drop expired entries, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<MonitorSession>> {
        let now = self.clock.now();
        let found = self
            .entries
            .get(key)
            .map(|entry| (entry.payload.clone(), entry.expires_at));
        let payload = match found {
            Some((payload, expires_at)) if expires_at > now => payload,
            Some(_) => {
                self.entries.remove(key);
                return Ok(None);
            }
            None => return Ok(None),
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    fn set(&self, key: &str, session: &MonitorSession, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| MonitorError::Store(format!("invalid ttl: {e}")))?;
        let entry = Entry {
            payload: serde_json::to_string(session)?,
            expires_at: self.clock.now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::SessionHandle;

    #[test]
    fn test_round_trip_and_remove() {
        let store = MemorySessionStore::new();
        let session = MonitorSession::new(SessionHandle::new(), "import", 10, Utc::now());
        let key = session.handle.store_key();

        store.set(&key, &session, Duration::from_secs(60)).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(session));

        store.remove(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let store = MemorySessionStore::with_clock(clock.clone());
        let session = MonitorSession::new(SessionHandle::new(), "import", 10, clock.now());
        let key = session.handle.store_key();

        store.set(&key, &session, Duration::from_secs(3600)).unwrap();
        clock.advance(Duration::from_secs(3599));
        assert!(store.get(&key).unwrap().is_some());

        clock.advance(Duration::from_secs(2));
        assert!(store.get(&key).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let clock = Arc::new(ManualClock::default());
        let store = MemorySessionStore::with_clock(clock.clone());
        for ttl in [10, 20, 30] {
            let session = MonitorSession::new(SessionHandle::new(), "s", 0, clock.now());
            store
                .set(&session.handle.store_key(), &session, Duration::from_secs(ttl))
                .unwrap();
        }

        clock.advance(Duration::from_secs(25));
        assert_eq!(store.cleanup_expired(), 2);
        assert_eq!(store.len(), 1);
    }
}
