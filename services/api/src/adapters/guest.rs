//! services/api/src/adapters/guest.rs
//!
//! The guest-mode implementation of the `JournalStore` port. Everything lives in
//! the device's local storage as JSON under fixed keys, so nothing here ever
//! touches the network or the database.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use mood_journal_core::domain::{
    CustomEmotion, CustomEmotionSummary, EmotionKey, EmotionVisibility, Entry, ImageUpload,
    NewEntry, SessionMode, GUEST_IDENTITY,
};
use mood_journal_core::ports::{JournalStore, LocalStorage, PortError, PortResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Local storage key of the durable guest flag.
pub const GUEST_MODE_KEY: &str = "diary_guest_mode";
pub const ENTRIES_KEY: &str = "guest_entries";
pub const CUSTOM_EMOTIONS_KEY: &str = "guest_custom_emotions";
pub const EMOTION_SETTINGS_KEY: &str = "guest_emotion_settings";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A journal kept in one device's local storage.
pub struct GuestJournalStore {
    storage: Arc<dyn LocalStorage>,
    /// Serialises read-modify-write cycles on the JSON arrays.
    writes: Mutex<()>,
}

impl GuestJournalStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            writes: Mutex::new(()),
        }
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> PortResult<T> {
        match self.storage.get_item(key).await? {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                PortError::Unexpected(format!("Corrupt local storage under {}: {}", key, e))
            }),
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) -> PortResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.storage.set_item(key, &raw).await
    }
}

//=========================================================================================
// Local Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Clone)]
struct GuestEntryRecord {
    id: Uuid,
    user_id: String,
    emotion: String,
    #[serde(default)]
    custom_emotion_id: Option<Uuid>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    weather: Option<String>,
    created_at: DateTime<Utc>,
}

impl GuestEntryRecord {
    fn to_domain(self, custom: &[GuestCustomEmotionRecord]) -> PortResult<Entry> {
        let emotion = self
            .emotion
            .parse::<EmotionKey>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let custom_emotion = self.custom_emotion_id.and_then(|id| {
            custom
                .iter()
                .find(|c| c.id == id)
                .map(|c| CustomEmotionSummary {
                    name: c.name.clone(),
                    image_url: c.image_url.clone(),
                })
        });
        Ok(Entry {
            id: self.id,
            emotion,
            custom_emotion_id: self.custom_emotion_id,
            custom_emotion,
            note: self.note,
            weather: self.weather.unwrap_or_default(),
            created_at: self.created_at,
        })
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct GuestCustomEmotionRecord {
    id: Uuid,
    name: String,
    image_url: String,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl GuestCustomEmotionRecord {
    fn to_domain(self) -> CustomEmotion {
        CustomEmotion {
            id: self.id,
            name: self.name,
            image_url: self.image_url,
            created_at: self.created_at,
        }
    }
}

fn data_url(image: &ImageUpload) -> String {
    format!("data:{};base64,{}", image.content_type, STANDARD.encode(&image.bytes))
}

//=========================================================================================
// `JournalStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl JournalStore for GuestJournalStore {
    fn mode(&self) -> SessionMode {
        SessionMode::Guest
    }

    async fn list_entries(&self, limit: Option<usize>) -> PortResult<Vec<Entry>> {
        let records: Vec<GuestEntryRecord> = self.load(ENTRIES_KEY).await?;
        let custom: Vec<GuestCustomEmotionRecord> = self.load(CUSTOM_EMOTIONS_KEY).await?;

        let mut entries = records
            .into_iter()
            .map(|r| r.to_domain(&custom))
            .collect::<PortResult<Vec<_>>>()?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<Entry> {
        self.list_entries(None)
            .await?
            .into_iter()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| PortError::NotFound(format!("Entry {} not found", entry_id)))
    }

    async fn create_entry(&self, entry: NewEntry) -> PortResult<Entry> {
        let _guard = self.writes.lock().await;
        let mut records: Vec<GuestEntryRecord> = self.load(ENTRIES_KEY).await?;
        let record = GuestEntryRecord {
            id: Uuid::new_v4(),
            user_id: GUEST_IDENTITY.to_string(),
            emotion: entry.emotion_key().as_str().to_string(),
            custom_emotion_id: entry.custom_emotion_id(),
            note: entry.note.clone(),
            weather: Some(entry.weather.clone()),
            created_at: entry.created_at,
        };
        records.insert(0, record.clone());
        self.store(ENTRIES_KEY, &records).await?;

        let custom: Vec<GuestCustomEmotionRecord> = self.load(CUSTOM_EMOTIONS_KEY).await?;
        record.to_domain(&custom)
    }

    async fn list_custom_emotions(&self) -> PortResult<Vec<CustomEmotion>> {
        let records: Vec<GuestCustomEmotionRecord> = self.load(CUSTOM_EMOTIONS_KEY).await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_custom_emotion(
        &self,
        name: &str,
        image: ImageUpload,
    ) -> PortResult<CustomEmotion> {
        let _guard = self.writes.lock().await;
        let mut records: Vec<GuestCustomEmotionRecord> = self.load(CUSTOM_EMOTIONS_KEY).await?;
        let record = GuestCustomEmotionRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            image_url: data_url(&image),
            created_at: Utc::now(),
        };
        records.insert(0, record.clone());
        self.store(CUSTOM_EMOTIONS_KEY, &records).await?;
        Ok(record.to_domain())
    }

    async fn delete_custom_emotion(&self, emotion_id: Uuid) -> PortResult<()> {
        // The image is inline in the record, so removing the record removes the asset.
        let _guard = self.writes.lock().await;
        let mut records: Vec<GuestCustomEmotionRecord> = self.load(CUSTOM_EMOTIONS_KEY).await?;
        let before = records.len();
        records.retain(|r| r.id != emotion_id);
        if records.len() == before {
            return Err(PortError::NotFound(format!(
                "Custom emotion {} not found",
                emotion_id
            )));
        }
        self.store(CUSTOM_EMOTIONS_KEY, &records).await
    }

    async fn list_visibility(&self) -> PortResult<Vec<EmotionVisibility>> {
        let settings: BTreeMap<String, bool> = self.load(EMOTION_SETTINGS_KEY).await?;
        Ok(settings
            .into_iter()
            .filter_map(|(key, enabled)| {
                key.parse()
                    .ok()
                    .map(|emotion| EmotionVisibility { emotion, enabled })
            })
            .collect())
    }

    async fn set_visibility(&self, setting: EmotionVisibility) -> PortResult<()> {
        let _guard = self.writes.lock().await;
        let mut settings: BTreeMap<String, bool> = self.load(EMOTION_SETTINGS_KEY).await?;
        settings.insert(setting.emotion.as_str().to_string(), setting.enabled);
        self.store(EMOTION_SETTINGS_KEY, &settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local_storage::LocalStorageRoot;
    use mood_journal_core::domain::{DefaultEmotion, EmotionChoice, Glyph};
    use tempfile::TempDir;

    fn store_in(temp_dir: &TempDir, device: Uuid) -> (GuestJournalStore, Arc<dyn LocalStorage>) {
        let storage: Arc<dyn LocalStorage> =
            LocalStorageRoot::new(temp_dir.path().to_path_buf()).open(device);
        (GuestJournalStore::new(storage.clone()), storage)
    }

    fn joy(note: &str, at: DateTime<Utc>) -> NewEntry {
        NewEntry {
            emotion: EmotionChoice::Default(DefaultEmotion::Joy),
            note: Some(note.to_string()),
            weather: "晴れ".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn entry_is_stored_as_json_under_fixed_key() {
        let temp_dir = TempDir::new().unwrap();
        let (store, storage) = store_in(&temp_dir, Uuid::new_v4());

        store.create_entry(joy("テスト", Utc::now())).await.unwrap();

        let raw = storage.get_item(ENTRIES_KEY).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["emotion"], "joy");
        assert_eq!(json[0]["note"], "テスト");
        assert_eq!(json[0]["weather"], "晴れ");
        assert_eq!(json[0]["user_id"], "guest-user");
        assert!(json[0]["custom_emotion_id"].is_null());
    }

    #[tokio::test]
    async fn entries_list_newest_first_and_respect_the_cap() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir, Uuid::new_v4());
        let start = Utc::now() - chrono::Duration::days(40);

        for day in 0..35 {
            store
                .create_entry(joy(&day.to_string(), start + chrono::Duration::days(day)))
                .await
                .unwrap();
        }

        let listed = store.list_entries(Some(30)).await.unwrap();
        assert_eq!(listed.len(), 30);
        assert_eq!(listed[0].note.as_deref(), Some("34"));
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(store.list_entries(None).await.unwrap().len(), 35);
    }

    #[tokio::test]
    async fn custom_image_is_kept_inline_as_data_url() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir, Uuid::new_v4());

        let created = store
            .create_custom_emotion(
                "もやもや",
                ImageUpload {
                    file_name: "m.png".to_string(),
                    content_type: "image/png".to_string(),
                    bytes: vec![0x89, 0x50, 0x4e, 0x47],
                },
            )
            .await
            .unwrap();
        assert_eq!(created.image_url, "data:image/png;base64,iVBORw==");
        assert_eq!(store.list_custom_emotions().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn deleting_custom_emotion_unlinks_existing_entries() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir, Uuid::new_v4());
        let created = store
            .create_custom_emotion(
                "もやもや",
                ImageUpload {
                    file_name: "m.png".to_string(),
                    content_type: "image/png".to_string(),
                    bytes: vec![1],
                },
            )
            .await
            .unwrap();
        let entry = store
            .create_entry(NewEntry {
                emotion: EmotionChoice::Custom(created.id),
                note: None,
                weather: "曇り".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(entry.custom_emotion.as_ref().unwrap().name, "もやもや");

        store.delete_custom_emotion(created.id).await.unwrap();

        let after = store.get_entry(entry.id).await.unwrap();
        assert_eq!(after.emotion, EmotionKey::Custom);
        assert_eq!(after.custom_emotion_id, Some(created.id));
        assert_eq!(after.glyph(), Glyph::Missing);
        assert!(matches!(
            store.delete_custom_emotion(created.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn visibility_is_stored_as_map() {
        let temp_dir = TempDir::new().unwrap();
        let (store, storage) = store_in(&temp_dir, Uuid::new_v4());

        store
            .set_visibility(EmotionVisibility {
                emotion: DefaultEmotion::Anger,
                enabled: false,
            })
            .await
            .unwrap();

        let raw = storage.get_item(EMOTION_SETTINGS_KEY).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"anger":false}"#);
        assert_eq!(
            store.list_visibility().await.unwrap(),
            vec![EmotionVisibility {
                emotion: DefaultEmotion::Anger,
                enabled: false
            }]
        );
    }

    #[tokio::test]
    async fn devices_are_isolated_namespaces() {
        let temp_dir = TempDir::new().unwrap();
        let (first, _) = store_in(&temp_dir, Uuid::new_v4());
        let (second, _) = store_in(&temp_dir, Uuid::new_v4());

        first.create_entry(joy("mine", Utc::now())).await.unwrap();
        assert!(second.list_entries(None).await.unwrap().is_empty());
    }
}
