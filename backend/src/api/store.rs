//! Open sessions, keyed by id.
//!
//! Each session sits behind its own lock, so edits on one session never wait
//! on another and commands against the same session run one at a time.
//! The store is bounded: past [`StoreOptions::max_sessions`] the least
//! recently used session is closed, and [`SessionStore::evict_idle`] closes
//! sessions untouched for longer than [`StoreOptions::idle_timeout`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::logs::log_info;
use crate::edit::{Session, SessionOptions};
use crate::error::{ServerError, ServerResult};

/// Environment variable overriding [`StoreOptions::max_sessions`].
pub const MAX_SESSIONS_ENV: &str = "CSVEDIT_MAX_SESSIONS";

/// Environment variable overriding [`StoreOptions::idle_timeout`], in seconds.
pub const SESSION_TTL_ENV: &str = "CSVEDIT_SESSION_TTL_SECS";

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Bounds on the session store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Most sessions kept open at once
    pub max_sessions: usize,
    /// Sessions unused for this long are closed by the sweeper
    pub idle_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

impl StoreOptions {
    /// Defaults, overridden by `CSVEDIT_MAX_SESSIONS` and
    /// `CSVEDIT_SESSION_TTL_SECS` when they hold positive numbers.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(n) = env_number(MAX_SESSIONS_ENV) {
            options.max_sessions = n as usize;
        }
        if let Some(secs) = env_number(SESSION_TTL_ENV) {
            options.idle_timeout = Duration::from_secs(secs);
        }
        options
    }
}

fn env_number(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
}

struct Entry {
    handle: SessionHandle,
    last_used: Instant,
}

/// In-memory registry of open sessions
#[derive(Default)]
pub struct SessionStore {
    options: SessionOptions,
    limits: StoreOptions,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionStore {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_limits(options, StoreOptions::default())
    }

    pub fn with_limits(options: SessionOptions, limits: StoreOptions) -> Self {
        Self {
            options,
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Options applied to every session opened through this store.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn limits(&self) -> &StoreOptions {
        &self.limits
    }

    /// Register a session under a fresh id and return the id.
    ///
    /// When the store is full the least recently used session is closed first.
    pub async fn insert(&self, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        let session = session
            .with_options(self.options.clone())
            .with_tag(short_id(&id));

        let mut sessions = self.sessions.write().await;
        while !sessions.is_empty() && sessions.len() >= self.limits.max_sessions.max(1) {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    sessions.remove(&key);
                    log_info(format!("Closed session {} (store full)", key));
                }
                None => break,
            }
        }

        sessions.insert(
            id.clone(),
            Entry {
                handle: Arc::new(Mutex::new(session)),
                last_used: Instant::now(),
            },
        );
        id
    }

    /// Look a session up and mark it as used.
    pub async fn get(&self, id: &str) -> ServerResult<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))?;
        entry.last_used = Instant::now();
        Ok(entry.handle.clone())
    }

    pub async fn remove(&self, id: &str) -> ServerResult<()> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    /// Close sessions idle for longer than the configured timeout.
    /// Returns the number closed.
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    async fn evict_idle_at(&self, now: Instant) -> usize {
        let timeout = self.limits.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| now.saturating_duration_since(e.last_used) < timeout);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// First block of a uuid, used to tag log lines.
fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::from_text("data.csv", "a,b\n1,2").unwrap()
    }

    fn limited(max_sessions: usize) -> SessionStore {
        SessionStore::with_limits(
            SessionOptions::default(),
            StoreOptions {
                max_sessions,
                idle_timeout: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = SessionStore::new(SessionOptions { preview_rows: 7 });
        let id = store.insert(session()).await;

        let handle = store.get(&id).await.unwrap();
        assert_eq!(handle.lock().await.options().preview_rows, 7);
        assert_eq!(store.len().await, 1);

        store.remove(&id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.get(&id).await,
            Err(ServerError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::default();
        let first = store.insert(session()).await;
        let second = store.insert(session()).await;
        assert_ne!(first, second);

        store
            .get(&first)
            .await
            .unwrap()
            .lock()
            .await
            .drop_columns(&["a".to_string()]);

        let other = store.get(&second).await.unwrap();
        assert_eq!(other.lock().await.dataset().column_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_unknown() {
        let store = SessionStore::default();
        assert!(store.remove("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_full_store_closes_least_recently_used() {
        let store = limited(2);
        let first = store.insert(session()).await;
        let second = store.insert(session()).await;

        // Touch the first so the second becomes the oldest.
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get(&first).await.unwrap();

        let third = store.insert(session()).await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(&first).await.is_ok());
        assert!(store.get(&third).await.is_ok());
        assert!(store.get(&second).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let store = limited(10);
        let id = store.insert(session()).await;

        assert_eq!(store.evict_idle().await, 0);
        assert!(store.get(&id).await.is_ok());

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.evict_idle_at(later).await, 1);
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_store_options_default() {
        let options = StoreOptions::default();
        assert_eq!(options.max_sessions, 100);
        assert_eq!(options.idle_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("1234abcd-ef00-4000-8000-000000000000"), "1234abcd");
    }
}
