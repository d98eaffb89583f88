//! crates/mood_journal_core/src/emotions.rs
//!
//! Emotion configuration: default-emotion visibility, the capture picker, and
//! custom emotion upload/delete.

use uuid::Uuid;

use crate::domain::{CustomEmotion, DefaultEmotion, EmotionVisibility, ImageUpload};
use crate::error::{JournalError, JournalResult};
use crate::ports::{JournalStore, PortError, PortResult};

/// Custom emotion names are cut off at this many characters.
pub const CUSTOM_NAME_MAX_CHARS: usize = 20;

/// Largest accepted custom emotion image (2 MiB).
pub const IMAGE_MAX_BYTES: usize = 2 * 1024 * 1024;

/// One selectable option in the capture picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOption {
    Default(DefaultEmotion),
    Custom(CustomEmotion),
}

/// Fills in every default emotion; emotions without a stored row are enabled.
pub fn resolve_visibility(rows: &[EmotionVisibility]) -> Vec<EmotionVisibility> {
    DefaultEmotion::ALL
        .into_iter()
        .map(|emotion| EmotionVisibility {
            emotion,
            enabled: rows
                .iter()
                .find(|row| row.emotion == emotion)
                .map_or(true, |row| row.enabled),
        })
        .collect()
}

pub async fn visibility_settings(store: &dyn JournalStore) -> PortResult<Vec<EmotionVisibility>> {
    Ok(resolve_visibility(&store.list_visibility().await?))
}

/// Flips one default emotion's visibility and returns the new setting.
pub async fn toggle_default_emotion(
    store: &dyn JournalStore,
    emotion: DefaultEmotion,
) -> JournalResult<EmotionVisibility> {
    let current = visibility_settings(store)
        .await
        .map_err(JournalError::SettingsFailed)?;
    let enabled = current
        .iter()
        .find(|row| row.emotion == emotion)
        .map_or(true, |row| row.enabled);

    let setting = EmotionVisibility {
        emotion,
        enabled: !enabled,
    };
    store
        .set_visibility(setting)
        .await
        .map_err(JournalError::SettingsFailed)?;
    Ok(setting)
}

/// Enabled defaults in their fixed order, followed by custom emotions newest first.
pub async fn picker_options(store: &dyn JournalStore) -> PortResult<Vec<PickerOption>> {
    let settings = visibility_settings(store).await?;
    let custom = store.list_custom_emotions().await?;

    Ok(settings
        .into_iter()
        .filter(|row| row.enabled)
        .map(|row| PickerOption::Default(row.emotion))
        .chain(custom.into_iter().map(PickerOption::Custom))
        .collect())
}

/// Checks size and MIME type before anything is uploaded. Only PNG, JPEG,
/// GIF and WebP are accepted; SVG can carry script and is refused.
pub fn validate_image(image: &ImageUpload) -> JournalResult<()> {
    if image.bytes.len() > IMAGE_MAX_BYTES {
        return Err(JournalError::ImageTooLarge);
    }
    if image.extension().is_none() {
        return Err(JournalError::NotAnImage);
    }
    Ok(())
}

/// The add-custom-emotion form as submitted.
#[derive(Debug, Clone, Default)]
pub struct CustomEmotionDraft {
    pub name: String,
    pub image: Option<ImageUpload>,
}

pub async fn add_custom_emotion(
    store: &dyn JournalStore,
    draft: CustomEmotionDraft,
) -> JournalResult<CustomEmotion> {
    let name: String = draft.name.chars().take(CUSTOM_NAME_MAX_CHARS).collect();
    let name = name.trim();
    let image = match draft.image {
        Some(image) if !name.is_empty() => image,
        _ => return Err(JournalError::MissingNameOrImage),
    };
    validate_image(&image)?;

    store
        .create_custom_emotion(name, image)
        .await
        .map_err(JournalError::UploadFailed)
}

/// Deletes a custom emotion once the user has confirmed.
///
/// Entries that used it are kept; they simply stop resolving the emotion.
pub async fn delete_custom_emotion(
    store: &dyn JournalStore,
    emotion_id: Uuid,
    confirmed: bool,
) -> JournalResult<()> {
    if !confirmed {
        return Err(JournalError::ConfirmationRequired);
    }
    store
        .delete_custom_emotion(emotion_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => JournalError::NotFound,
            other => JournalError::DeleteFailed(other),
        })
}
