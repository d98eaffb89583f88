//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for sign-up, login, guest mode, logout and the
//! current-session lookup.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Duration;
use mood_journal_core::domain::{Identity, Session, SessionMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::session::{
    guest_device, AuthError, RemoteSignIn, SessionCredential, GUEST_DEVICE_COOKIE, SESSION_COOKIE,
};
use crate::web::rest::{failure, ErrorBody, Failure};
use crate::web::state::AppState;

/// Guest devices outlive any single session; the browser caps cookies at 400 days.
const GUEST_DEVICE_MAX_AGE_DAYS: i64 = 400;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    /// `remote` or `guest`.
    pub mode: String,
    /// The user id, or `guest-user` in guest mode.
    pub identity: String,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            mode: match session.mode {
                SessionMode::Remote => "remote".to_string(),
                SessionMode::Guest => "guest".to_string(),
            },
            identity: session.identity.to_string(),
            user_id: match session.identity {
                Identity::User(user_id) => Some(user_id),
                Identity::Guest => None,
            },
            email: session.email.clone(),
        }
    }
}

fn auth_failure(e: AuthError) -> Failure {
    let status = match e {
        AuthError::InvalidCredentials | AuthError::NoSession => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
        AuthError::Backend(ref source) => {
            error!("Authentication backend failed: {:?}", source);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    failure(status, e.to_string())
}

//=========================================================================================
// Cookies
//=========================================================================================

fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age.num_seconds()
    )
}

fn cleared_session_cookie() -> String {
    session_cookie("", Duration::zero())
}

fn guest_device_cookie(device: Uuid) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        GUEST_DEVICE_COOKIE,
        device,
        Duration::days(GUEST_DEVICE_MAX_AGE_DAYS).num_seconds()
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Starting a remote session on a device ends any guest session there.
async fn finish_remote_sign_in(
    state: &AppState,
    headers: &HeaderMap,
    signed_in: RemoteSignIn,
    status: StatusCode,
) -> impl IntoResponse {
    if let Some(device) = guest_device(headers) {
        if let Err(e) = state.sessions.end_guest_mode(device).await {
            warn!("Failed to clear guest flag on device {}: {:?}", device, e);
        }
        state
            .registry
            .remove(&SessionCredential::Guest(device).registry_key())
            .await;
    }

    let cookie = session_cookie(&signed_in.token, state.sessions.session_ttl());
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::from(&signed_in.session)),
    )
}

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created successfully", body = SessionResponse),
        (status = 400, description = "Invalid email or password", body = ErrorBody),
        (status = 409, description = "User already registered", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse, Failure> {
    let signed_up = state
        .sessions
        .sign_up(&req.email, &req.password)
        .await
        .map_err(auth_failure)?;
    Ok(finish_remote_sign_in(&state, &headers, signed_up, StatusCode::CREATED).await)
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid login credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse, Failure> {
    let signed_in = state
        .sessions
        .sign_in(&req.email, &req.password)
        .await
        .map_err(auth_failure)?;
    Ok(finish_remote_sign_in(&state, &headers, signed_in, StatusCode::OK).await)
}

/// POST /auth/guest - Continue as guest on this device
#[utoipa::path(
    post,
    path = "/auth/guest",
    responses(
        (status = 200, description = "Guest mode enabled", body = SessionResponse),
        (status = 500, description = "Device storage unavailable", body = ErrorBody)
    )
)]
pub async fn guest_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Failure> {
    // A remote session on this client ends first; only one session may hold.
    if let Some(SessionCredential::Remote(token)) = SessionCredential::from_headers(&headers) {
        let credential = SessionCredential::Remote(token);
        if let Err(e) = state.sessions.sign_out(&credential).await {
            warn!("Failed to end remote session before guest mode: {:?}", e);
        }
        state.registry.remove(&credential.registry_key()).await;
    }

    let (session, device) = state
        .sessions
        .sign_in_as_guest(guest_device(&headers))
        .await
        .map_err(auth_failure)?;

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, guest_device_cookie(device)),
            (header::SET_COOKIE, cleared_session_cookie()),
        ]),
        Json(SessionResponse::from(&session)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Failure> {
    // 1. Find the credential the request presents
    let credential = SessionCredential::from_headers(&headers)
        .ok_or_else(|| auth_failure(AuthError::NoSession))?;

    // 2. End it (auth row or guest flag); guest data stays on the device
    state
        .sessions
        .sign_out(&credential)
        .await
        .map_err(auth_failure)?;

    // 3. Forget the in-memory session state
    state.registry.remove(&credential.registry_key()).await;
    info!("Session ended");

    // 4. Clear the session cookie; the device cookie stays so guest data can be found again
    Ok((StatusCode::OK, [(header::SET_COOKIE, cleared_session_cookie())]))
}

/// GET /auth/session - The session this client currently holds
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Active session", body = SessionResponse),
        (status = 401, description = "No active session", body = ErrorBody)
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, Failure> {
    let credential = SessionCredential::from_headers(&headers)
        .ok_or_else(|| auth_failure(AuthError::NoSession))?;
    let session = state
        .sessions
        .restore(&credential)
        .await
        .map_err(auth_failure)?;
    Ok(Json(SessionResponse::from(&session)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_keep_their_messages() {
        let (status, body) = auth_failure(AuthError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.0.error, "Invalid login credentials");

        let (status, body) = auth_failure(AuthError::AlreadyRegistered);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.0.error, "User already registered");

        let (status, _) = auth_failure(AuthError::WeakPassword);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn guest_sessions_report_the_fixed_identity() {
        let body = SessionResponse::from(&Session::guest());
        assert_eq!(body.mode, "guest");
        assert_eq!(body.identity, "guest-user");
        assert_eq!(body.user_id, None);
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        assert_eq!(
            cleared_session_cookie(),
            "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0"
        );
    }
}
