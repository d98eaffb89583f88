//! crates/mood_journal_core/src/weather.rs
//!
//! Best-effort ambient weather. A lookup never fails from the caller's point of
//! view: every error collapses into the fallback report.

use tokio::sync::RwLock;

use crate::domain::{Coordinates, WeatherKind, WeatherReport};
use crate::ports::{PortError, WeatherService};

/// Shown (and stamped on entries) until the first lookup completes.
pub const PLACEHOLDER_DESCRIPTION: &str = "天気情報を取得中...";

/// Used whenever the lookup cannot produce a real report.
pub const FALLBACK_DESCRIPTION: &str = "晴れ";

impl WeatherReport {
    pub fn placeholder() -> Self {
        Self {
            kind: WeatherKind::Default,
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        }
    }

    pub fn fallback() -> Self {
        Self {
            kind: WeatherKind::Default,
            description: FALLBACK_DESCRIPTION.to_string(),
        }
    }
}

/// Maps the API's primary condition keyword onto a background category.
pub fn classify(main: &str) -> WeatherKind {
    let main = main.to_lowercase();
    if main.contains("clear") {
        WeatherKind::Sunny
    } else if main.contains("cloud") {
        WeatherKind::Cloudy
    } else if main.contains("rain") || main.contains("drizzle") {
        WeatherKind::Rainy
    } else if main.contains("snow") {
        WeatherKind::Snowy
    } else {
        WeatherKind::Default
    }
}

/// Why a lookup fell back.
#[derive(Debug)]
pub enum LookupFailure {
    /// The device did not grant (or could not provide) a location.
    NoLocation,
    Service(PortError),
}

/// The most recent weather known for one session.
pub struct WeatherTracker {
    report: RwLock<WeatherReport>,
}

impl Default for WeatherTracker {
    fn default() -> Self {
        Self {
            report: RwLock::new(WeatherReport::placeholder()),
        }
    }
}

impl WeatherTracker {
    pub async fn current(&self) -> WeatherReport {
        self.report.read().await.clone()
    }

    /// Looks the weather up and stores the result, or the fallback on failure.
    /// The failure, if any, is returned alongside for diagnostics.
    pub async fn refresh(
        &self,
        service: &dyn WeatherService,
        location: Option<Coordinates>,
    ) -> (WeatherReport, Option<LookupFailure>) {
        let outcome = match location {
            None => Err(LookupFailure::NoLocation),
            Some(location) => service
                .current_conditions(location)
                .await
                .map_err(LookupFailure::Service),
        };

        let (report, failure) = match outcome {
            Ok(report) => (report, None),
            Err(failure) => (WeatherReport::fallback(), Some(failure)),
        };

        *self.report.write().await = report.clone();
        (report, failure)
    }
}
