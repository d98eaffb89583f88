//! services/api/src/web/calendar.rs
//!
//! The month grid view.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{FixedOffset, NaiveDate, Utc};
use mood_journal_core::calendar::{build_month, local_day, CalendarMonth, DayCell, MonthCursor};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{failure, loaded_or_empty, ErrorBody, Failure, GlyphView};
use crate::web::state::{AppState, SessionContext};

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl From<MonthCursor> for MonthRef {
    fn from(cursor: MonthCursor) -> Self {
        Self {
            year: cursor.year(),
            month: cursor.month(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DayView {
    pub day: u32,
    pub date: NaiveDate,
    pub is_today: bool,
    /// Glyph of the earliest entry written that day.
    pub glyph: Option<GlyphView>,
    /// Every entry of the day, earliest first, for drill-in.
    pub entry_ids: Vec<Uuid>,
    pub overflow: usize,
    /// At most three.
    pub overflow_dots: usize,
}

impl From<DayCell> for DayView {
    fn from(cell: DayCell) -> Self {
        Self {
            day: cell.day(),
            date: cell.date,
            is_today: cell.is_today,
            glyph: cell.first().map(|entry| entry.glyph().into()),
            overflow: cell.overflow(),
            overflow_dots: cell.overflow_dots(),
            entry_ids: cell.entries.into_iter().map(|entry| entry.id).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CalendarResponse {
    pub year: i32,
    pub month: u32,
    pub prev: MonthRef,
    pub next: MonthRef,
    /// Sunday-first weeks; `null` pads days outside the month.
    pub weeks: Vec<Vec<Option<DayView>>>,
}

impl From<CalendarMonth> for CalendarResponse {
    fn from(month: CalendarMonth) -> Self {
        let cursor = month.cursor;
        Self {
            year: cursor.year(),
            month: cursor.month(),
            prev: cursor.prev().into(),
            next: cursor.next().into(),
            weeks: month
                .weeks
                .into_iter()
                .map(|week| week.into_iter().map(|cell| cell.map(DayView::from)).collect())
                .collect(),
        }
    }
}

fn today(offset: FixedOffset) -> NaiveDate {
    local_day(Utc::now(), offset)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The grid for one month. A failed read is logged and rendered as an empty grid.
#[utoipa::path(
    get,
    path = "/calendar/{year}/{month}",
    params(
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = u32, Path, description = "Month, 1-12")
    ),
    responses(
        (status = 200, description = "The month grid", body = CalendarResponse),
        (status = 400, description = "No such month", body = ErrorBody),
        (status = 401, description = "No active session")
    )
)]
pub async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<CalendarResponse>, Failure> {
    let cursor = MonthCursor::new(year, month)
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Invalid month"))?;

    let entries = loaded_or_empty(
        ctx.store().list_entries(None).await,
        "calendar entries",
        &ctx,
    );

    let offset = state.config.local_offset;
    let month = build_month(cursor, &entries, offset, today(offset));
    Ok(Json(month.into()))
}
