//! crates/mood_journal_core/src/capture.rs
//!
//! Entry capture: turns a picker selection and an optional note into a stored entry.

use chrono::{DateTime, Utc};

use crate::domain::{EmotionChoice, Entry, NewEntry};
use crate::error::{JournalError, JournalResult};
use crate::ports::JournalStore;

/// Notes longer than this are cut off as they are typed.
pub const NOTE_MAX_CHARS: usize = 140;

/// The capture form as submitted.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub emotion: Option<EmotionChoice>,
    pub note: String,
}

/// Truncates to [`NOTE_MAX_CHARS`] characters and trims; blank notes are dropped.
pub fn normalize_note(raw: &str) -> Option<String> {
    let truncated: String = raw.chars().take(NOTE_MAX_CHARS).collect();
    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Validates the draft and writes it through the store, stamped with `now`
/// and whatever weather descriptor is currently known.
pub async fn capture_entry(
    store: &dyn JournalStore,
    draft: EntryDraft,
    weather: &str,
    now: DateTime<Utc>,
) -> JournalResult<Entry> {
    let emotion = draft.emotion.ok_or(JournalError::EmotionRequired)?;

    if let EmotionChoice::Custom(id) = emotion {
        let known = store
            .list_custom_emotions()
            .await
            .map_err(JournalError::SaveFailed)?;
        if !known.iter().any(|c| c.id == id) {
            return Err(JournalError::UnknownCustomEmotion);
        }
    }

    let entry = NewEntry {
        emotion,
        note: normalize_note(&draft.note),
        weather: weather.to_string(),
        created_at: now,
    };

    store
        .create_entry(entry)
        .await
        .map_err(JournalError::SaveFailed)
}
