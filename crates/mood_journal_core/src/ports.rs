//! crates/mood_journal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the journal's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the remote database, the guest storage or the weather API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    Coordinates, CustomEmotion, Entry, EmotionVisibility, ImageUpload, NewEntry, SessionMode,
    User, UserCredentials, WeatherReport,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Gateway
//=========================================================================================

/// Uniform read/write interface over one session's journal.
///
/// An instance is already scoped to a single identity when it is handed out, so
/// callers never pass a user id and two sessions can never see each other's rows.
#[async_trait]
pub trait JournalStore: Send + Sync {
    fn mode(&self) -> SessionMode;

    // --- Entries ---
    /// Newest first. `None` means no cap.
    async fn list_entries(&self, limit: Option<usize>) -> PortResult<Vec<Entry>>;

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<Entry>;

    async fn create_entry(&self, entry: NewEntry) -> PortResult<Entry>;

    // --- Custom Emotions ---
    /// Newest first.
    async fn list_custom_emotions(&self) -> PortResult<Vec<CustomEmotion>>;

    /// Stores the image asset, then the metadata record.
    async fn create_custom_emotion(
        &self,
        name: &str,
        image: ImageUpload,
    ) -> PortResult<CustomEmotion>;

    /// Removes the image asset, then the metadata record.
    async fn delete_custom_emotion(&self, emotion_id: Uuid) -> PortResult<()>;

    // --- Default Emotion Visibility ---
    /// Only the rows that were ever written; missing emotions are enabled.
    async fn list_visibility(&self) -> PortResult<Vec<EmotionVisibility>>;

    async fn set_visibility(&self, setting: EmotionVisibility) -> PortResult<()>;
}

/// Hands out remote journals scoped to one registered user.
pub trait RemoteJournals: Send + Sync {
    fn journal_for(&self, user_id: Uuid) -> Arc<dyn JournalStore>;
}

//=========================================================================================
// Remote Auth
//=========================================================================================

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user of a live (unexpired) auth session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

//=========================================================================================
// Local Storage (guest mode)
//=========================================================================================

/// A string-to-string key/value store owned by a single device, the way a
/// browser's local storage is.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove_item(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// Object Storage
//=========================================================================================

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `bytes` at `path` inside the bucket.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> PortResult<()>;

    /// Removing an object that does not exist succeeds.
    async fn remove(&self, path: &str) -> PortResult<()>;

    fn public_url(&self, path: &str) -> String;
}

//=========================================================================================
// Weather
//=========================================================================================

#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Current conditions at the given coordinates.
    async fn current_conditions(&self, location: Coordinates) -> PortResult<WeatherReport>;
}
