//! services/api/src/web/emotions.rs
//!
//! Emotion configuration: the capture picker, default-emotion visibility and
//! custom emotion upload/delete.

use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use mood_journal_core::domain::{CustomEmotion, DefaultEmotion, EmotionVisibility, ImageUpload};
use mood_journal_core::emotions::{
    add_custom_emotion, delete_custom_emotion, picker_options, toggle_default_emotion,
    visibility_settings, CustomEmotionDraft, PickerOption,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{failure, journal_failure, loaded_or_empty, ErrorBody, Failure};
use crate::web::state::SessionContext;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickerOptionView {
    Default {
        emotion: String,
        label: String,
    },
    Custom {
        id: Uuid,
        name: String,
        image_url: String,
    },
}

impl From<PickerOption> for PickerOptionView {
    fn from(option: PickerOption) -> Self {
        match option {
            PickerOption::Default(emotion) => PickerOptionView::Default {
                emotion: emotion.as_str().to_string(),
                label: emotion.label().to_string(),
            },
            PickerOption::Custom(custom) => PickerOptionView::Custom {
                id: custom.id,
                name: custom.name,
                image_url: custom.image_url,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct VisibilityView {
    pub emotion: String,
    pub label: String,
    pub enabled: bool,
}

impl From<EmotionVisibility> for VisibilityView {
    fn from(setting: EmotionVisibility) -> Self {
        Self {
            emotion: setting.emotion.as_str().to_string(),
            label: setting.emotion.label().to_string(),
            enabled: setting.enabled,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CustomEmotionView {
    pub id: Uuid,
    pub name: String,
    /// A public bucket URL, or an inline data URL in guest mode.
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<CustomEmotion> for CustomEmotionView {
    fn from(custom: CustomEmotion) -> Self {
        Self {
            id: custom.id,
            name: custom.name,
            image_url: custom.image_url,
            created_at: custom.created_at,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

//=========================================================================================
// Picker & Visibility Handlers
//=========================================================================================

/// Options for the capture picker: enabled defaults, then custom emotions newest first.
#[utoipa::path(
    get,
    path = "/emotions",
    responses(
        (status = 200, description = "Picker options", body = [PickerOptionView]),
        (status = 401, description = "No active session")
    )
)]
pub async fn picker_handler(Extension(ctx): Extension<SessionContext>) -> Json<Vec<PickerOptionView>> {
    let options = loaded_or_empty(picker_options(ctx.store()).await, "picker options", &ctx);
    Json(options.into_iter().map(PickerOptionView::from).collect())
}

/// Visibility of every default emotion.
#[utoipa::path(
    get,
    path = "/emotions/settings",
    responses(
        (status = 200, description = "One row per default emotion", body = [VisibilityView]),
        (status = 401, description = "No active session")
    )
)]
pub async fn visibility_handler(Extension(ctx): Extension<SessionContext>) -> Json<Vec<VisibilityView>> {
    let settings = loaded_or_empty(
        visibility_settings(ctx.store()).await,
        "emotion settings",
        &ctx,
    );
    Json(settings.into_iter().map(VisibilityView::from).collect())
}

/// Flips one default emotion on or off. Past entries are unaffected.
#[utoipa::path(
    put,
    path = "/emotions/settings/{emotion}",
    params(
        ("emotion" = String, Path, description = "joy, anger, sadness, pleasure or calm")
    ),
    responses(
        (status = 200, description = "The new setting", body = VisibilityView),
        (status = 401, description = "No active session"),
        (status = 404, description = "Not a default emotion", body = ErrorBody),
        (status = 500, description = "Update failed", body = ErrorBody)
    )
)]
pub async fn toggle_visibility_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(emotion): Path<String>,
) -> Result<Json<VisibilityView>, Failure> {
    let emotion = emotion
        .parse::<DefaultEmotion>()
        .map_err(|e| failure(StatusCode::NOT_FOUND, e.to_string()))?;
    let setting = toggle_default_emotion(ctx.store(), emotion)
        .await
        .map_err(journal_failure)?;
    Ok(Json(setting.into()))
}

//=========================================================================================
// Custom Emotion Handlers
//=========================================================================================

/// The session's custom emotions, newest first.
#[utoipa::path(
    get,
    path = "/emotions/custom",
    responses(
        (status = 200, description = "Custom emotions", body = [CustomEmotionView]),
        (status = 401, description = "No active session")
    )
)]
pub async fn list_custom_handler(
    Extension(ctx): Extension<SessionContext>,
) -> Json<Vec<CustomEmotionView>> {
    let custom = loaded_or_empty(
        ctx.store().list_custom_emotions().await,
        "custom emotions",
        &ctx,
    );
    Json(custom.into_iter().map(CustomEmotionView::from).collect())
}

/// Add a custom emotion.
///
/// Accepts a multipart/form-data request with a `name` text part and an
/// `image` file part. The image must be PNG, JPEG, GIF or WebP and at most 2MB.
#[utoipa::path(
    post,
    path = "/emotions/custom",
    request_body(content_type = "multipart/form-data", description = "`name` and `image` parts."),
    responses(
        (status = 201, description = "Custom emotion created", body = CustomEmotionView),
        (status = 400, description = "Missing name or image, or the image was rejected", body = ErrorBody),
        (status = 401, description = "No active session"),
        (status = 500, description = "Upload failed", body = ErrorBody)
    )
)]
pub async fn add_custom_handler(
    Extension(ctx): Extension<SessionContext>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Failure> {
    let mut draft = CustomEmotionDraft::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        failure(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        match field.name() {
            Some("name") => {
                draft.name = field.text().await.map_err(|e| {
                    failure(StatusCode::BAD_REQUEST, format!("Failed to read name: {}", e))
                })?;
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    failure(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file bytes: {}", e),
                    )
                })?;
                if !bytes.is_empty() {
                    draft.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let created = add_custom_emotion(ctx.store(), draft)
        .await
        .map_err(journal_failure)?;
    info!(custom_emotion_id = %created.id, "Custom emotion added");

    Ok((StatusCode::CREATED, Json(CustomEmotionView::from(created))))
}

/// Delete a custom emotion. Requires `confirm=true`.
///
/// Entries that used it are kept and stop showing its image.
#[utoipa::path(
    delete,
    path = "/emotions/custom/{id}",
    params(
        ("id" = Uuid, Path, description = "Custom emotion id"),
        ("confirm" = Option<bool>, Query, description = "Must be true")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Not confirmed", body = ErrorBody),
        (status = 401, description = "No active session"),
        (status = 404, description = "No such custom emotion", body = ErrorBody),
        (status = 500, description = "Delete failed", body = ErrorBody)
    )
)]
pub async fn delete_custom_handler(
    Extension(ctx): Extension<SessionContext>,
    Path(emotion_id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, Failure> {
    delete_custom_emotion(ctx.store(), emotion_id, query.confirm)
        .await
        .map_err(journal_failure)?;
    info!(custom_emotion_id = %emotion_id, "Custom emotion deleted");
    Ok(StatusCode::NO_CONTENT)
}
