//! services/api/src/web/entries.rs
//!
//! Entry capture, the recent-entries list and single-entry detail.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use mood_journal_core::capture::{capture_entry, EntryDraft};
use mood_journal_core::domain::{DefaultEmotion, EmotionChoice, EmotionKey};
use mood_journal_core::ports::PortError;
use mood_journal_core::JournalError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{journal_failure, loaded_or_empty, EntryView, ErrorBody, Failure};
use crate::web::state::{AppState, SessionContext};

/// The list view shows this many of the most recent entries.
pub const LIST_LIMIT: usize = 30;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema, Default)]
pub struct CaptureRequest {
    /// A default emotion key, or `custom` together with `custom_emotion_id`.
    pub emotion: Option<String>,
    pub custom_emotion_id: Option<Uuid>,
    #[serde(default)]
    pub note: String,
}

impl CaptureRequest {
    fn into_draft(self) -> Result<EntryDraft, JournalError> {
        let emotion = match (self.emotion.as_deref(), self.custom_emotion_id) {
            (None, None) => None,
            (None | Some(EmotionKey::CUSTOM), Some(id)) => Some(EmotionChoice::Custom(id)),
            (Some(EmotionKey::CUSTOM), None) => None,
            (Some(key), _) => Some(EmotionChoice::Default(
                key.parse::<DefaultEmotion>()
                    .map_err(|_| JournalError::EmotionRequired)?,
            )),
        };
        Ok(EntryDraft {
            emotion,
            note: self.note,
        })
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The most recent entries, newest first.
///
/// A failed read is logged and rendered as an empty list.
#[utoipa::path(
    get,
    path = "/entries",
    responses(
        (status = 200, description = "Up to 30 entries, newest first", body = [EntryView]),
        (status = 401, description = "No active session")
    )
)]
pub async fn list_entries_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Json<Vec<EntryView>> {
    let entries = loaded_or_empty(
        ctx.store().list_entries(Some(LIST_LIMIT)).await,
        "entries",
        &ctx,
    );
    let offset = state.config.local_offset;
    Json(
        entries
            .into_iter()
            .map(|entry| EntryView::new(entry, offset))
            .collect(),
    )
}

/// Capture a new entry, stamped with the session's current weather.
#[utoipa::path(
    post,
    path = "/entries",
    request_body = CaptureRequest,
    responses(
        (status = 201, description = "Entry saved", body = EntryView),
        (status = 400, description = "No emotion selected", body = ErrorBody),
        (status = 401, description = "No active session"),
        (status = 500, description = "Save failed", body = ErrorBody)
    )
)]
pub async fn capture_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<CaptureRequest>,
) -> Result<impl IntoResponse, Failure> {
    let draft = req.into_draft().map_err(journal_failure)?;
    let weather = ctx.ambient.weather.current().await;

    let entry = capture_entry(ctx.store(), draft, &weather.description, Utc::now())
        .await
        .map_err(journal_failure)?;

    let token = ctx.ambient.refresh.bump();
    info!(entry_id = %entry.id, refresh = token, "Entry captured");

    Ok((
        StatusCode::CREATED,
        Json(EntryView::new(entry, state.config.local_offset)),
    ))
}

/// One entry, for the calendar drill-in.
#[utoipa::path(
    get,
    path = "/entries/{id}",
    params(
        ("id" = Uuid, Path, description = "Entry id")
    ),
    responses(
        (status = 200, description = "The entry", body = EntryView),
        (status = 401, description = "No active session"),
        (status = 404, description = "No such entry in this session", body = ErrorBody)
    )
)]
pub async fn entry_detail_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<EntryView>, Failure> {
    let entry = ctx
        .store()
        .get_entry(entry_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => journal_failure(JournalError::NotFound),
            other => journal_failure(JournalError::LoadFailed(other)),
        })?;
    Ok(Json(EntryView::new(entry, state.config.local_offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{app_state, offline_context, MemoryAccounts};
    use tempfile::TempDir;

    fn request(emotion: Option<&str>, custom: Option<Uuid>) -> CaptureRequest {
        CaptureRequest {
            emotion: emotion.map(str::to_string),
            custom_emotion_id: custom,
            note: "テスト".to_string(),
        }
    }

    #[test]
    fn default_emotions_parse_by_key() {
        let draft = request(Some("joy"), None).into_draft().unwrap();
        assert_eq!(draft.emotion, Some(EmotionChoice::Default(DefaultEmotion::Joy)));
        assert_eq!(draft.note, "テスト");
    }

    #[test]
    fn custom_selection_needs_an_id() {
        let id = Uuid::new_v4();
        assert_eq!(
            request(Some("custom"), Some(id)).into_draft().unwrap().emotion,
            Some(EmotionChoice::Custom(id))
        );
        assert_eq!(
            request(None, Some(id)).into_draft().unwrap().emotion,
            Some(EmotionChoice::Custom(id))
        );
        assert_eq!(request(Some("custom"), None).into_draft().unwrap().emotion, None);
    }

    #[test]
    fn missing_or_unknown_emotion_is_rejected() {
        assert_eq!(request(None, None).into_draft().unwrap().emotion, None);
        assert!(matches!(
            request(Some("ennui"), None).into_draft(),
            Err(JournalError::EmotionRequired)
        ));
    }

    #[tokio::test]
    async fn unreadable_store_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let state = app_state(&temp_dir, Arc::new(MemoryAccounts::default()));

        let Json(entries) = list_entries_handler(State(state), Extension(offline_context())).await;
        assert!(entries.is_empty());
    }
}
