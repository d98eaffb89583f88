//! In-memory fakes of the ports, used by the unit tests of this crate.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    Coordinates, CustomEmotion, CustomEmotionSummary, EmotionVisibility, Entry, ImageUpload,
    NewEntry, SessionMode, WeatherReport,
};
use crate::ports::{JournalStore, PortError, PortResult, WeatherService};

#[derive(Default)]
struct Tables {
    entries: Vec<(Uuid, NewEntry)>,
    custom: Vec<CustomEmotion>,
    visibility: HashMap<crate::domain::DefaultEmotion, bool>,
}

/// A journal kept in memory, newest-first like the real stores.
#[derive(Default)]
pub struct MemoryJournalStore {
    tables: Mutex<Tables>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryJournalStore {
    fn check(&self, flag: &AtomicBool) -> PortResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(PortError::Unexpected("store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn to_entry(tables: &Tables, id: Uuid, new: &NewEntry) -> Entry {
        let custom_emotion_id = new.custom_emotion_id();
        Entry {
            id,
            emotion: new.emotion_key(),
            custom_emotion_id,
            custom_emotion: custom_emotion_id.and_then(|cid| {
                tables
                    .custom
                    .iter()
                    .find(|c| c.id == cid)
                    .map(CustomEmotionSummary::from)
            }),
            note: new.note.clone(),
            weather: new.weather.clone(),
            created_at: new.created_at,
        }
    }
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
    fn mode(&self) -> SessionMode {
        SessionMode::Guest
    }

    async fn list_entries(&self, limit: Option<usize>) -> PortResult<Vec<Entry>> {
        self.check(&self.fail_reads)?;
        let tables = self.tables.lock().await;
        let mut entries: Vec<Entry> = tables
            .entries
            .iter()
            .rev()
            .map(|(id, new)| Self::to_entry(&tables, *id, new))
            .collect();
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
        self.check(&self.fail_writes)?;
        let mut tables = self.tables.lock().await;
        let id = Uuid::new_v4();
        tables.entries.push((id, entry.clone()));
        Ok(Self::to_entry(&tables, id, &entry))
    }

    async fn list_custom_emotions(&self) -> PortResult<Vec<CustomEmotion>> {
        self.check(&self.fail_reads)?;
        Ok(self.tables.lock().await.custom.clone())
    }

    async fn create_custom_emotion(
        &self,
        name: &str,
        image: ImageUpload,
    ) -> PortResult<CustomEmotion> {
        self.check(&self.fail_writes)?;
        let emotion = CustomEmotion {
            id: Uuid::new_v4(),
            name: name.to_string(),
            image_url: format!("memory://{}", image.file_name),
            created_at: Utc::now(),
        };
        self.tables.lock().await.custom.insert(0, emotion.clone());
        Ok(emotion)
    }

    async fn delete_custom_emotion(&self, emotion_id: Uuid) -> PortResult<()> {
        self.check(&self.fail_writes)?;
        self.tables.lock().await.custom.retain(|c| c.id != emotion_id);
        Ok(())
    }

    async fn list_visibility(&self) -> PortResult<Vec<EmotionVisibility>> {
        self.check(&self.fail_reads)?;
        Ok(self
            .tables
            .lock()
            .await
            .visibility
            .iter()
            .map(|(emotion, enabled)| EmotionVisibility {
                emotion: *emotion,
                enabled: *enabled,
            })
            .collect())
    }

    async fn set_visibility(&self, setting: EmotionVisibility) -> PortResult<()> {
        self.check(&self.fail_writes)?;
        self.tables
            .lock()
            .await
            .visibility
            .insert(setting.emotion, setting.enabled);
        Ok(())
    }
}

/// Answers every lookup with a fixed report, or fails.
pub struct FixedWeather(pub Option<WeatherReport>);

#[async_trait]
impl WeatherService for FixedWeather {
    async fn current_conditions(&self, _location: Coordinates) -> PortResult<WeatherReport> {
        self.0
            .clone()
            .ok_or_else(|| PortError::Unexpected("weather API unreachable".to_string()))
    }
}
