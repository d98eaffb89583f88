//! services/api/src/web/middleware.rs
//!
//! Session middleware for protecting the journal routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};

use crate::session::{AuthError, SessionCredential};
use crate::web::state::{AppState, SessionContext};

/// Middleware that resolves the session cookie (remote or guest) into a
/// [`SessionContext`].
///
/// If valid, inserts the context into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized. If the session backend
/// cannot be reached, returns 500 so the client does not fall back to sign-in.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Pick the credential the request presents
    let credential =
        SessionCredential::from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Validate it and look up (or start) the session's state
    let ctx = resolve_session(&state, credential).await?;

    // 3. Insert the context into request extensions
    req.extensions_mut().insert(ctx);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

/// Validates a credential against the auth table or the device's guest flag and
/// returns its live session state.
///
/// A credential that no longer names a session has its state dropped.
pub async fn resolve_session(
    state: &AppState,
    credential: SessionCredential,
) -> Result<SessionContext, StatusCode> {
    let key = credential.registry_key();

    let session = match state.sessions.restore(&credential).await {
        Ok(session) => session,
        Err(AuthError::NoSession) => {
            if state.registry.remove(&key).await.is_some() {
                debug!("Dropped state of ended session {}", key);
            }
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            error!("Failed to restore session: {:?}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let ambient = state
        .registry
        .get_or_open(&key, || state.sessions.open_journal(&session, &credential))
        .await
        .map_err(|e| {
            error!("Failed to open journal for session: {:?}", e);
            match e {
                AuthError::NoSession => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        })?;
    ambient.touch(Utc::now());

    Ok(SessionContext {
        session,
        credential,
        ambient,
    })
}
