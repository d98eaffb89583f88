//! services/api/src/session.rs
//!
//! The session provider: sign-up, sign-in, guest activation and sign-out, plus
//! the one place where a session's persistence backing is chosen.
//!
//! A client holds at most one session. Remote sessions are rows in
//! `auth_sessions` named by the `session` cookie; guest sessions are a flag in
//! the local storage of the device named by the `guest_device` cookie.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use mood_journal_core::domain::{Identity, Session, SessionMode};
use mood_journal_core::ports::{AccountService, JournalStore, LocalStorage, PortError, RemoteJournals};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::adapters::guest::{GuestJournalStore, GUEST_MODE_KEY};
use crate::adapters::local_storage::LocalStorageRoot;

pub const SESSION_COOKIE: &str = "session";
pub const GUEST_DEVICE_COOKIE: &str = "guest_device";

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Errors
//=========================================================================================

/// Authentication failures. The display text is shown inline on the form.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,
    #[error("Password should be at least 6 characters")]
    WeakPassword,
    #[error("Not signed in")]
    NoSession,
    #[error("Authentication service unavailable")]
    Backend(#[source] PortError),
}

//=========================================================================================
// Credentials
//=========================================================================================

/// What a request presents to prove which session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCredential {
    Remote(String),
    Guest(Uuid),
}

impl SessionCredential {
    /// A remote session cookie wins over a guest device cookie.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        if let Some(token) = cookie_value(headers, SESSION_COOKIE).filter(|t| !t.is_empty()) {
            return Some(SessionCredential::Remote(token.to_string()));
        }
        guest_device(headers).map(SessionCredential::Guest)
    }

    /// Key of the per-session state kept in memory.
    pub fn registry_key(&self) -> String {
        match self {
            SessionCredential::Remote(token) => format!("remote:{}", token),
            SessionCredential::Guest(device) => format!("guest:{}", device),
        }
    }
}

/// The device id from the `guest_device` cookie, if it is well formed.
pub fn guest_device(headers: &HeaderMap) -> Option<Uuid> {
    cookie_value(headers, GUEST_DEVICE_COOKIE).and_then(|v| Uuid::parse_str(v).ok())
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

//=========================================================================================
// The Provider
//=========================================================================================

/// A freshly created remote session and the token naming it.
#[derive(Debug)]
pub struct RemoteSignIn {
    pub session: Session,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionProvider {
    accounts: Arc<dyn AccountService>,
    remote_journals: Arc<dyn RemoteJournals>,
    guest_storage: Arc<LocalStorageRoot>,
    session_ttl: Duration,
}

impl SessionProvider {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        remote_journals: Arc<dyn RemoteJournals>,
        guest_storage: Arc<LocalStorageRoot>,
    ) -> Self {
        Self {
            accounts,
            remote_journals,
            guest_storage,
            session_ttl: Duration::days(30),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<RemoteSignIn, AuthError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                AuthError::Backend(PortError::Unexpected("Failed to hash password".to_string()))
            })?
            .to_string();

        let user = self
            .accounts
            .create_user_with_email(email, &password_hash)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => AuthError::AlreadyRegistered,
                other => AuthError::Backend(other),
            })?;

        info!("Registered user {}", user.user_id);
        self.open_remote_session(user.user_id, user.email).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<RemoteSignIn, AuthError> {
        let credentials = self
            .accounts
            .get_user_by_email(email.trim())
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => AuthError::InvalidCredentials,
                other => AuthError::Backend(other),
            })?;

        let parsed_hash = PasswordHash::new(&credentials.hashed_password).map_err(|e| {
            error!("Failed to parse password hash: {:?}", e);
            AuthError::Backend(PortError::Unexpected("Corrupt password hash".to_string()))
        })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.open_remote_session(credentials.user_id, Some(credentials.email))
            .await
    }

    async fn open_remote_session(
        &self,
        user_id: Uuid,
        email: Option<String>,
    ) -> Result<RemoteSignIn, AuthError> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        self.accounts
            .create_auth_session(&token, user_id, expires_at)
            .await
            .map_err(AuthError::Backend)?;
        Ok(RemoteSignIn {
            session: Session::remote(user_id, email),
            token,
            expires_at,
        })
    }

    /// Sets the durable guest flag on the device, allocating a device if the
    /// client has none yet. No network or database call is made.
    pub async fn sign_in_as_guest(
        &self,
        device: Option<Uuid>,
    ) -> Result<(Session, Uuid), AuthError> {
        let device = device.unwrap_or_else(Uuid::new_v4);
        self.guest_storage
            .open(device)
            .set_item(GUEST_MODE_KEY, "true")
            .await
            .map_err(AuthError::Backend)?;
        info!("Guest mode enabled on device {}", device);
        Ok((Session::guest(), device))
    }

    /// Clears the guest flag of a device; used when a remote session starts there.
    pub async fn end_guest_mode(&self, device: Uuid) -> Result<(), AuthError> {
        self.guest_storage
            .open(device)
            .remove_item(GUEST_MODE_KEY)
            .await
            .map_err(AuthError::Backend)
    }

    /// Recreates the session a credential names, if it is still live.
    pub async fn restore(&self, credential: &SessionCredential) -> Result<Session, AuthError> {
        match credential {
            SessionCredential::Remote(token) => {
                let user_id = self
                    .accounts
                    .validate_auth_session(token)
                    .await
                    .map_err(|e| match e {
                        PortError::Unauthorized | PortError::NotFound(_) => AuthError::NoSession,
                        other => AuthError::Backend(other),
                    })?;
                let email = self.accounts.get_user(user_id).await.ok().and_then(|u| u.email);
                Ok(Session::remote(user_id, email))
            }
            SessionCredential::Guest(device) => {
                let flag = self
                    .guest_storage
                    .open(*device)
                    .get_item(GUEST_MODE_KEY)
                    .await
                    .map_err(AuthError::Backend)?;
                if flag.as_deref() == Some("true") {
                    Ok(Session::guest())
                } else {
                    Err(AuthError::NoSession)
                }
            }
        }
    }

    /// Ends the session: deletes the auth row, or clears the device's guest flag.
    /// Guest data stays on the device.
    pub async fn sign_out(&self, credential: &SessionCredential) -> Result<(), AuthError> {
        match credential {
            SessionCredential::Remote(token) => self
                .accounts
                .delete_auth_session(token)
                .await
                .map_err(AuthError::Backend),
            SessionCredential::Guest(device) => self.end_guest_mode(*device).await,
        }
    }

    /// Picks the persistence backing for a session. Called once per session.
    pub fn open_journal(
        &self,
        session: &Session,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn JournalStore>, AuthError> {
        match (session.mode, session.identity, credential) {
            (SessionMode::Remote, Identity::User(user_id), _) => {
                Ok(self.remote_journals.journal_for(user_id))
            }
            (SessionMode::Guest, _, SessionCredential::Guest(device)) => {
                let storage: Arc<dyn LocalStorage> = self.guest_storage.open(*device);
                Ok(Arc::new(GuestJournalStore::new(storage)))
            }
            _ => Err(AuthError::NoSession),
        }
    }
}
