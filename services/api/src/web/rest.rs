//! services/api/src/web/rest.rs
//!
//! Shared REST plumbing: the master definition for the OpenAPI specification,
//! the error body every handler returns, and the view types that more than
//! one resource renders.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use mood_journal_core::calendar::format_entry_date;
use mood_journal_core::domain::{Entry, Glyph, WeatherReport};
use mood_journal_core::ports::PortResult;
use mood_journal_core::JournalError;
use serde::Serialize;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::state::SessionContext;
use crate::web::{auth, calendar, emotions, entries, weather};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::guest_handler,
        auth::logout_handler,
        auth::session_handler,
        entries::list_entries_handler,
        entries::capture_entry_handler,
        entries::entry_detail_handler,
        calendar::calendar_handler,
        emotions::picker_handler,
        emotions::visibility_handler,
        emotions::toggle_visibility_handler,
        emotions::list_custom_handler,
        emotions::add_custom_handler,
        emotions::delete_custom_handler,
        weather::report_location_handler,
        weather::current_weather_handler,
        refresh_handler,
    ),
    components(
        schemas(
            ErrorBody,
            GlyphView,
            EntryView,
            WeatherView,
            RefreshResponse,
            auth::Credentials,
            auth::SessionResponse,
            entries::CaptureRequest,
            calendar::CalendarResponse,
            calendar::DayView,
            calendar::MonthRef,
            emotions::PickerOptionView,
            emotions::VisibilityView,
            emotions::CustomEmotionView,
            weather::LocationReport,
        )
    ),
    tags(
        (name = "Mood Journal API", description = "Mood journal entries, calendar, emotions and ambient weather.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Errors
//=========================================================================================

/// The body of every non-2xx response. `error` is shown to the user as is.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorBody {
    pub error: String,
}

pub type Failure = (StatusCode, Json<ErrorBody>);

pub fn failure(status: StatusCode, message: impl Into<String>) -> Failure {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Validation problems are 400, unknown ids 404, storage failures 500.
pub fn journal_failure(e: JournalError) -> Failure {
    let status = if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(e, JournalError::NotFound) {
        StatusCode::NOT_FOUND
    } else {
        error!("Journal operation failed: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    failure(status, e.to_string())
}

/// Views render a failed read as their empty state. The failure is only logged.
pub fn loaded_or_empty<T: Default>(
    result: PortResult<T>,
    what: &str,
    ctx: &SessionContext,
) -> T {
    result.unwrap_or_else(|e| {
        error!("Failed to load {} for {}: {:?}", what, ctx.session.identity, e);
        T::default()
    })
}

//=========================================================================================
// Shared Views
//=========================================================================================

/// How an entry's emotion is drawn.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GlyphView {
    /// One of the five defaults, drawn as its kanji label.
    Default { emotion: String, label: String },
    /// A custom emotion, drawn as its image.
    Image { name: String, image_url: String },
    /// A custom emotion that has since been deleted.
    Missing,
}

impl From<Glyph> for GlyphView {
    fn from(glyph: Glyph) -> Self {
        match glyph {
            Glyph::Default(emotion) => GlyphView::Default {
                emotion: emotion.as_str().to_string(),
                label: emotion.label().to_string(),
            },
            Glyph::Image(summary) => GlyphView::Image {
                name: summary.name,
                image_url: summary.image_url,
            },
            Glyph::Missing => GlyphView::Missing,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct EntryView {
    pub id: Uuid,
    pub emotion: String,
    pub custom_emotion_id: Option<Uuid>,
    pub glyph: GlyphView,
    pub note: Option<String>,
    pub weather: String,
    pub created_at: DateTime<Utc>,
    /// `2025年1月5日 09:03` in the server's local offset.
    pub date_label: String,
}

impl EntryView {
    pub fn new(entry: Entry, offset: FixedOffset) -> Self {
        Self {
            id: entry.id,
            emotion: entry.emotion.as_str().to_string(),
            custom_emotion_id: entry.custom_emotion_id,
            glyph: entry.glyph().into(),
            date_label: format_entry_date(entry.created_at, offset),
            note: entry.note,
            weather: entry.weather,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct WeatherView {
    /// Background category: `sunny`, `cloudy`, `rainy`, `snowy` or `default`.
    pub kind: String,
    pub description: String,
}

impl From<WeatherReport> for WeatherView {
    fn from(report: WeatherReport) -> Self {
        Self {
            kind: report.kind.as_str().to_string(),
            description: report.description,
        }
    }
}

//=========================================================================================
// Refresh Token
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Grows by one after every successful capture.
    pub token: u64,
}

/// Current refresh token; views re-fetch when it changes.
#[utoipa::path(
    get,
    path = "/refresh",
    responses(
        (status = 200, description = "Current refresh token", body = RefreshResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn refresh_handler(Extension(ctx): Extension<SessionContext>) -> Json<RefreshResponse> {
    Json(RefreshResponse {
        token: ctx.ambient.refresh.current(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::offline_context;
    use mood_journal_core::domain::{CustomEmotionSummary, DefaultEmotion, EmotionKey};
    use mood_journal_core::ports::PortError;

    fn tokyo() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn journal_errors_map_to_status_codes() {
        let (status, body) = journal_failure(JournalError::EmotionRequired);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error, JournalError::EmotionRequired.to_string());

        let (status, _) = journal_failure(JournalError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = journal_failure(JournalError::SaveFailed(PortError::Unexpected(
            "offline".to_string(),
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0.error, "保存に失敗しました。もう一度お試しください。");
    }

    #[test]
    fn entry_view_renders_default_and_missing_glyphs() {
        let created_at = DateTime::parse_from_rfc3339("2025-01-05T00:03:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let joy = Entry {
            id: Uuid::new_v4(),
            emotion: EmotionKey::Default(DefaultEmotion::Joy),
            custom_emotion_id: None,
            custom_emotion: None,
            note: Some("テスト".to_string()),
            weather: "晴れ".to_string(),
            created_at,
        };
        let view = EntryView::new(joy, tokyo());
        assert_eq!(view.emotion, "joy");
        assert_eq!(view.date_label, "2025年1月5日 09:03");
        assert_eq!(
            view.glyph,
            GlyphView::Default {
                emotion: "joy".to_string(),
                label: "喜".to_string()
            }
        );

        let orphan = Entry {
            id: Uuid::new_v4(),
            emotion: EmotionKey::Custom,
            custom_emotion_id: Some(Uuid::new_v4()),
            custom_emotion: None,
            note: None,
            weather: "晴れ".to_string(),
            created_at,
        };
        assert_eq!(EntryView::new(orphan, tokyo()).glyph, GlyphView::Missing);

        let pictured = Entry {
            id: Uuid::new_v4(),
            emotion: EmotionKey::Custom,
            custom_emotion_id: Some(Uuid::new_v4()),
            custom_emotion: Some(CustomEmotionSummary {
                name: "眠い".to_string(),
                image_url: "data:image/png;base64,AA==".to_string(),
            }),
            note: None,
            weather: "晴れ".to_string(),
            created_at,
        };
        let json = serde_json::to_value(EntryView::new(pictured, tokyo()).glyph).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["name"], "眠い");
    }

    #[test]
    fn loaded_or_empty_keeps_reads_and_blanks_failures() {
        let ctx = offline_context();
        assert_eq!(loaded_or_empty(Ok(vec![1, 2]), "numbers", &ctx), vec![1, 2]);

        let failed: PortResult<Vec<u8>> = Err(PortError::Unexpected("offline".to_string()));
        assert!(loaded_or_empty(failed, "numbers", &ctx).is_empty());
    }
}
