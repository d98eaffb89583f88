//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-session state that lives
//! between requests.

use crate::config::Config;
use crate::session::{AuthError, SessionCredential, SessionProvider};
use chrono::{DateTime, Duration, Utc};
use mood_journal_core::domain::Session;
use mood_journal_core::ports::{JournalStore, WeatherService};
use mood_journal_core::refresh::RefreshToken;
use mood_journal_core::weather::WeatherTracker;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionProvider,
    pub weather_service: Arc<dyn WeatherService>,
    pub registry: SessionRegistry,
}

//=========================================================================================
// Per-Session State
//=========================================================================================

/// Everything a session keeps between requests: the store chosen for it at
/// session start, its last known weather and its refresh counter.
pub struct SessionAmbient {
    pub store: Arc<dyn JournalStore>,
    pub weather: WeatherTracker,
    pub refresh: RefreshToken,
    /// Unix seconds of the last request that used this session.
    last_seen: AtomicI64,
}

impl SessionAmbient {
    pub fn new(store: Arc<dyn JournalStore>) -> Self {
        Self {
            store,
            weather: WeatherTracker::default(),
            refresh: RefreshToken::default(),
            last_seen: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    pub fn touch(&self, now: DateTime<Utc>) {
        self.last_seen.fetch_max(now.timestamp(), Ordering::Relaxed);
    }

    fn idle_since(&self) -> i64 {
        self.last_seen.load(Ordering::Relaxed)
    }
}

/// Live sessions keyed by [`SessionCredential::registry_key`].
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionAmbient>>>,
}

impl SessionRegistry {
    /// Returns the session's state, opening its store the first time it is seen.
    pub async fn get_or_open<F>(&self, key: &str, open: F) -> Result<Arc<SessionAmbient>, AuthError>
    where
        F: FnOnce() -> Result<Arc<dyn JournalStore>, AuthError>,
    {
        if let Some(ambient) = self.sessions.read().await.get(key) {
            return Ok(ambient.clone());
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have opened it while we waited for the write lock.
        if let Some(ambient) = sessions.get(key) {
            return Ok(ambient.clone());
        }
        let ambient = Arc::new(SessionAmbient::new(open()?));
        sessions.insert(key.to_string(), ambient.clone());
        Ok(ambient)
    }

    pub async fn get(&self, key: &str) -> Option<Arc<SessionAmbient>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Drops the session's state. Lookups still in flight keep their own handle
    /// and their results go nowhere.
    pub async fn remove(&self, key: &str) -> Option<Arc<SessionAmbient>> {
        self.sessions.write().await.remove(key)
    }

    /// Drops every session not used within `max_idle` of `now` and returns how
    /// many went. A dropped session that is still valid reopens on its next
    /// request with a fresh weather cell and refresh counter.
    pub async fn sweep_idle(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let cutoff = (now - max_idle).timestamp();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, ambient| ambient.idle_since() >= cutoff);
        before - sessions.len()
    }
}

//=========================================================================================
// SessionContext (Inserted Into Every Authenticated Request)
//=========================================================================================

/// The explicit session handed to every journal handler by the middleware.
#[derive(Clone)]
pub struct SessionContext {
    pub session: Session,
    pub credential: SessionCredential,
    pub ambient: Arc<SessionAmbient>,
}

impl SessionContext {
    pub fn store(&self) -> &dyn JournalStore {
        self.ambient.store.as_ref()
    }
}
