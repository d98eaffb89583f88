//! Port fakes and app-state builders shared by the unit tests of this crate.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use mood_journal_core::domain::{
    Coordinates, CustomEmotion, EmotionVisibility, Entry, ImageUpload, NewEntry, Session,
    SessionMode, User, UserCredentials, WeatherReport,
};
use mood_journal_core::ports::{
    AccountService, JournalStore, LocalStorage, PortError, PortResult, RemoteJournals,
    WeatherService,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

use crate::adapters::{GuestJournalStore, LocalStorageRoot};
use crate::config::Config;
use crate::session::{SessionCredential, SessionProvider};
use crate::web::state::{AppState, SessionAmbient, SessionContext, SessionRegistry};

/// Accounts kept in memory. `offline` makes every session lookup fail the way
/// an unreachable database would.
#[derive(Default)]
pub struct MemoryAccounts {
    users: Mutex<Vec<UserCredentials>>,
    sessions: Mutex<HashMap<String, Uuid>>,
    pub offline: AtomicBool,
}

impl MemoryAccounts {
    /// Lets a token lapse without the client signing out.
    pub fn expire(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }
}

#[async_trait]
impl AccountService for MemoryAccounts {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(PortError::Conflict(email.to_string()));
        }
        let user_id = Uuid::new_v4();
        users.push(UserCredentials {
            user_id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| User {
                user_id,
                email: Some(u.email.clone()),
            })
            .ok_or_else(|| PortError::NotFound(user_id.to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), user_id);
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }
}

/// Remote journals backed by guest stores in a separate directory, one
/// namespace per user.
pub struct DirRemoteJournals(pub LocalStorageRoot);

impl RemoteJournals for DirRemoteJournals {
    fn journal_for(&self, user_id: Uuid) -> Arc<dyn JournalStore> {
        let storage: Arc<dyn LocalStorage> = self.0.open(user_id);
        Arc::new(GuestJournalStore::new(storage))
    }
}

pub fn provider(temp_dir: &TempDir, accounts: Arc<MemoryAccounts>) -> SessionProvider {
    SessionProvider::new(
        accounts,
        Arc::new(DirRemoteJournals(LocalStorageRoot::new(
            temp_dir.path().join("remote"),
        ))),
        Arc::new(LocalStorageRoot::new(temp_dir.path().join("guest"))),
    )
}

/// A journal whose every call fails.
pub struct OfflineJournalStore;

fn offline<T>() -> PortResult<T> {
    Err(PortError::Unexpected("store offline".to_string()))
}

#[async_trait]
impl JournalStore for OfflineJournalStore {
    fn mode(&self) -> SessionMode {
        SessionMode::Guest
    }

    async fn list_entries(&self, _limit: Option<usize>) -> PortResult<Vec<Entry>> {
        offline()
    }

    async fn get_entry(&self, _entry_id: Uuid) -> PortResult<Entry> {
        offline()
    }

    async fn create_entry(&self, _entry: NewEntry) -> PortResult<Entry> {
        offline()
    }

    async fn list_custom_emotions(&self) -> PortResult<Vec<CustomEmotion>> {
        offline()
    }

    async fn create_custom_emotion(
        &self,
        _name: &str,
        _image: ImageUpload,
    ) -> PortResult<CustomEmotion> {
        offline()
    }

    async fn delete_custom_emotion(&self, _emotion_id: Uuid) -> PortResult<()> {
        offline()
    }

    async fn list_visibility(&self) -> PortResult<Vec<EmotionVisibility>> {
        offline()
    }

    async fn set_visibility(&self, _setting: EmotionVisibility) -> PortResult<()> {
        offline()
    }
}

/// Weather that is never available.
pub struct NoWeather;

#[async_trait]
impl WeatherService for NoWeather {
    async fn current_conditions(&self, _location: Coordinates) -> PortResult<WeatherReport> {
        Err(PortError::Unexpected("no weather in tests".to_string()))
    }
}

pub fn config(temp_dir: &TempDir) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        guest_storage_path: temp_dir.path().join("guest"),
        image_storage_path: temp_dir.path().join("images"),
        public_base_url: "http://localhost:3000".to_string(),
        openweather_api_key: None,
        weather_api_base: "http://localhost:0".to_string(),
        local_offset: FixedOffset::east_opt(9 * 3600).unwrap(),
        cors_origin: "http://localhost:5173".to_string(),
    }
}

pub fn app_state(temp_dir: &TempDir, accounts: Arc<MemoryAccounts>) -> Arc<AppState> {
    Arc::new(AppState {
        config: Arc::new(config(temp_dir)),
        sessions: provider(temp_dir, accounts),
        weather_service: Arc::new(NoWeather),
        registry: SessionRegistry::default(),
    })
}

/// A guest session whose store cannot be read or written.
pub fn offline_context() -> SessionContext {
    SessionContext {
        session: Session::guest(),
        credential: SessionCredential::Guest(Uuid::new_v4()),
        ambient: Arc::new(SessionAmbient::new(Arc::new(OfflineJournalStore))),
    }
}
