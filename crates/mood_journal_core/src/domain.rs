//! crates/mood_journal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the mood journal.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Sessions and Identities
//=========================================================================================

/// The fixed identity every guest session is given.
pub const GUEST_IDENTITY: &str = "guest-user";

/// Which backing a session's data lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Remote,
    Guest,
}

/// An opaque user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    User(Uuid),
    Guest,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(id) => write!(f, "{}", id),
            Identity::Guest => f.write_str(GUEST_IDENTITY),
        }
    }
}

/// The signed-in state of one client. Created on sign-in or guest activation,
/// destroyed on sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub mode: SessionMode,
    pub email: Option<String>,
}

impl Session {
    pub fn remote(user_id: Uuid, email: Option<String>) -> Self {
        Self {
            identity: Identity::User(user_id),
            mode: SessionMode::Remote,
            email,
        }
    }

    pub fn guest() -> Self {
        Self {
            identity: Identity::Guest,
            mode: SessionMode::Guest,
            email: Some("guest@local".to_string()),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.mode == SessionMode::Guest
    }
}

// Represents a registered user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Emotions
//=========================================================================================

/// The five built-in emotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DefaultEmotion {
    Joy,
    Anger,
    Sadness,
    Pleasure,
    Calm,
}

impl DefaultEmotion {
    /// Picker order.
    pub const ALL: [DefaultEmotion; 5] = [
        DefaultEmotion::Joy,
        DefaultEmotion::Anger,
        DefaultEmotion::Sadness,
        DefaultEmotion::Pleasure,
        DefaultEmotion::Calm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultEmotion::Joy => "joy",
            DefaultEmotion::Anger => "anger",
            DefaultEmotion::Sadness => "sadness",
            DefaultEmotion::Pleasure => "pleasure",
            DefaultEmotion::Calm => "calm",
        }
    }

    /// The single-kanji label shown under the glyph.
    pub fn label(&self) -> &'static str {
        match self {
            DefaultEmotion::Joy => "喜",
            DefaultEmotion::Anger => "怒",
            DefaultEmotion::Sadness => "哀",
            DefaultEmotion::Pleasure => "楽",
            DefaultEmotion::Calm => "平",
        }
    }
}

impl fmt::Display for DefaultEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown emotion: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for DefaultEmotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DefaultEmotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// What the user picked when capturing an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionChoice {
    Default(DefaultEmotion),
    Custom(Uuid),
}

/// The `emotion` column of a stored entry: a default key or the `custom` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionKey {
    Default(DefaultEmotion),
    Custom,
}

impl EmotionKey {
    pub const CUSTOM: &'static str = "custom";

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionKey::Default(e) => e.as_str(),
            EmotionKey::Custom => Self::CUSTOM,
        }
    }
}

impl FromStr for EmotionKey {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::CUSTOM {
            Ok(EmotionKey::Custom)
        } else {
            s.parse().map(EmotionKey::Default)
        }
    }
}

/// A user-uploaded image/name pair usable as an emotion selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEmotion {
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// The denormalised bits of a custom emotion an entry needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEmotionSummary {
    pub name: String,
    pub image_url: String,
}

impl From<&CustomEmotion> for CustomEmotionSummary {
    fn from(emotion: &CustomEmotion) -> Self {
        Self {
            name: emotion.name.clone(),
            image_url: emotion.image_url.clone(),
        }
    }
}

/// An image picked for upload, before it is stored anywhere.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Extension used for the stored object, derived from the declared MIME
    /// type. `None` for anything outside the accepted raster formats; the
    /// client's file name never decides it.
    pub fn extension(&self) -> Option<&'static str> {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some("png"),
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    }
}

/// Per-user visibility of one default emotion. Missing rows mean enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmotionVisibility {
    pub emotion: DefaultEmotion,
    pub enabled: bool,
}

//=========================================================================================
// Entries
//=========================================================================================

/// One mood-journal record as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: Uuid,
    pub emotion: EmotionKey,
    pub custom_emotion_id: Option<Uuid>,
    /// Resolved from `custom_emotion_id`; `None` once the custom emotion is deleted.
    pub custom_emotion: Option<CustomEmotionSummary>,
    pub note: Option<String>,
    pub weather: String,
    pub created_at: DateTime<Utc>,
}

/// What an entry looks like on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    Default(DefaultEmotion),
    Image(CustomEmotionSummary),
    /// A custom entry whose emotion no longer exists.
    Missing,
}

impl Entry {
    pub fn glyph(&self) -> Glyph {
        match (&self.emotion, &self.custom_emotion) {
            (EmotionKey::Default(e), _) => Glyph::Default(*e),
            (EmotionKey::Custom, Some(summary)) => Glyph::Image(summary.clone()),
            (EmotionKey::Custom, None) => Glyph::Missing,
        }
    }
}

/// An entry ready to be written; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub emotion: EmotionChoice,
    pub note: Option<String>,
    pub weather: String,
    pub created_at: DateTime<Utc>,
}

impl NewEntry {
    pub fn emotion_key(&self) -> EmotionKey {
        match self.emotion {
            EmotionChoice::Default(e) => EmotionKey::Default(e),
            EmotionChoice::Custom(_) => EmotionKey::Custom,
        }
    }

    pub fn custom_emotion_id(&self) -> Option<Uuid> {
        match self.emotion {
            EmotionChoice::Default(_) => None,
            EmotionChoice::Custom(id) => Some(id),
        }
    }
}

//=========================================================================================
// Weather
//=========================================================================================

/// Coarse weather category driving the decorative background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Default,
}

impl WeatherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "sunny",
            WeatherKind::Cloudy => "cloudy",
            WeatherKind::Rainy => "rainy",
            WeatherKind::Snowy => "snowy",
            WeatherKind::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    pub kind: WeatherKind,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_emotions_parse_from_their_keys() {
        for emotion in DefaultEmotion::ALL {
            assert_eq!(emotion.as_str().parse::<DefaultEmotion>(), Ok(emotion));
        }
        assert!("excited".parse::<DefaultEmotion>().is_err());
    }

    #[test]
    fn custom_marker_is_not_a_default_emotion() {
        assert_eq!("custom".parse::<EmotionKey>(), Ok(EmotionKey::Custom));
        assert!("custom".parse::<DefaultEmotion>().is_err());
    }

    #[test]
    fn new_entry_splits_choice_into_key_and_reference() {
        let id = Uuid::new_v4();
        let entry = NewEntry {
            emotion: EmotionChoice::Custom(id),
            note: None,
            weather: "晴れ".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(entry.emotion_key(), EmotionKey::Custom);
        assert_eq!(entry.custom_emotion_id(), Some(id));
    }

    #[test]
    fn image_extension_follows_the_mime_type_not_the_file_name() {
        let mut upload = ImageUpload {
            file_name: "smile.html".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"<script>alert(1)</script>".to_vec(),
        };
        assert_eq!(upload.extension(), Some("png"));

        upload.content_type = "image/JPEG; charset=binary".to_string();
        assert_eq!(upload.extension(), Some("jpg"));

        upload.file_name = "face".to_string();
        upload.content_type = "image/webp".to_string();
        assert_eq!(upload.extension(), Some("webp"));

        upload.content_type = "image/svg+xml".to_string();
        assert_eq!(upload.extension(), None);
        upload.content_type = "text/html".to_string();
        assert_eq!(upload.extension(), None);
    }

    #[test]
    fn guest_identity_displays_as_fixed_id() {
        assert_eq!(Session::guest().identity.to_string(), "guest-user");
    }
}
