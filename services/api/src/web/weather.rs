//! services/api/src/web/weather.rs
//!
//! Ambient weather: the client reports its location (or that it has none) and
//! the lookup runs in the background; capture reads whatever is current.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use mood_journal_core::domain::Coordinates;
use mood_journal_core::weather::LookupFailure;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::web::rest::WeatherView;
use crate::web::state::{AppState, SessionContext};

#[derive(Deserialize, ToSchema, Default)]
pub struct LocationReport {
    /// Both coordinates are omitted when geolocation was denied or unavailable.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationReport {
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Starts a weather lookup for the session. Returns immediately with the
/// report known so far.
#[utoipa::path(
    post,
    path = "/weather",
    request_body = LocationReport,
    responses(
        (status = 202, description = "Lookup started", body = WeatherView),
        (status = 401, description = "No active session")
    )
)]
pub async fn report_location_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(report): Json<LocationReport>,
) -> impl IntoResponse {
    let location = report.coordinates();
    let ambient = ctx.ambient.clone();
    let service = state.weather_service.clone();

    // If the session ends before this finishes, the result lands in a tracker
    // nobody reads any more.
    tokio::spawn(async move {
        let (weather, failure) = ambient.weather.refresh(service.as_ref(), location).await;
        match failure {
            None => info!(kind = weather.kind.as_str(), "Weather updated"),
            Some(LookupFailure::NoLocation) => {
                info!("No location available, using fallback weather")
            }
            Some(LookupFailure::Service(e)) => {
                warn!("Weather lookup failed, using fallback: {:?}", e)
            }
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(WeatherView::from(ctx.ambient.weather.current().await)),
    )
}

/// The session's current weather: a placeholder until the first lookup completes.
#[utoipa::path(
    get,
    path = "/weather",
    responses(
        (status = 200, description = "Current weather", body = WeatherView),
        (status = 401, description = "No active session")
    )
)]
pub async fn current_weather_handler(Extension(ctx): Extension<SessionContext>) -> Json<WeatherView> {
    Json(ctx.ambient.weather.current().await.into())
}
