//! services/api/src/adapters/journal_db.rs
//!
//! The remote implementation of the `JournalStore` port. Every query is scoped
//! by the `user_id` the store was opened for.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mood_journal_core::domain::{
    CustomEmotion, CustomEmotionSummary, EmotionKey, EmotionVisibility, Entry, ImageUpload,
    NewEntry, SessionMode,
};
use mood_journal_core::ports::{ImageStore, JournalStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::adapters::db::not_found_or_unexpected;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct PgJournalStore {
    pool: PgPool,
    images: Arc<dyn ImageStore>,
    user_id: Uuid,
}

impl PgJournalStore {
    pub fn new(pool: PgPool, images: Arc<dyn ImageStore>, user_id: Uuid) -> Self {
        Self {
            pool,
            images,
            user_id,
        }
    }
}

const ENTRY_COLUMNS: &str = "e.id, e.emotion, e.custom_emotion_id, e.note, e.weather, e.created_at, \
     c.name AS custom_name, c.image_url AS custom_image_url \
     FROM entries e LEFT JOIN custom_emotions c ON c.id = e.custom_emotion_id";

/// Newest first. Entries sharing a timestamp fall back to insertion order,
/// latest insert first, matching the guest store.
const ENTRY_ORDER: &str = "ORDER BY e.created_at DESC, e.seq DESC";

/// Storage key for an uploaded image: `{user}/{millis}.{ext}`, where the
/// extension comes from the validated MIME type.
fn object_path(user_id: Uuid, image: &ImageUpload, now: DateTime<Utc>) -> PortResult<String> {
    let extension = image.extension().ok_or_else(|| {
        PortError::Unexpected(format!("unsupported image type '{}'", image.content_type))
    })?;
    Ok(format!("{}/{}.{}", user_id, now.timestamp_millis(), extension))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct EntryRecord {
    id: Uuid,
    emotion: String,
    custom_emotion_id: Option<Uuid>,
    note: Option<String>,
    weather: Option<String>,
    created_at: DateTime<Utc>,
    custom_name: Option<String>,
    custom_image_url: Option<String>,
}
impl EntryRecord {
    fn to_domain(self) -> PortResult<Entry> {
        let emotion = self
            .emotion
            .parse::<EmotionKey>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let custom_emotion = match (self.custom_name, self.custom_image_url) {
            (Some(name), Some(image_url)) => Some(CustomEmotionSummary { name, image_url }),
            _ => None,
        };
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

#[derive(FromRow)]
struct CustomEmotionRecord {
    id: Uuid,
    name: String,
    image_url: String,
    created_at: DateTime<Utc>,
}
impl CustomEmotionRecord {
    fn to_domain(self) -> CustomEmotion {
        CustomEmotion {
            id: self.id,
            name: self.name,
            image_url: self.image_url,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct VisibilityRecord {
    emotion: String,
    is_enabled: bool,
}

//=========================================================================================
// `JournalStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl JournalStore for PgJournalStore {
    fn mode(&self) -> SessionMode {
        SessionMode::Remote
    }

    async fn list_entries(&self, limit: Option<usize>) -> PortResult<Vec<Entry>> {
        // LIMIT NULL is no limit in PostgreSQL.
        let records = sqlx::query_as::<_, EntryRecord>(&format!(
            "SELECT {} WHERE e.user_id = $1 {} LIMIT $2",
            ENTRY_COLUMNS, ENTRY_ORDER
        ))
        .bind(self.user_id)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_entry(&self, entry_id: Uuid) -> PortResult<Entry> {
        let record = sqlx::query_as::<_, EntryRecord>(&format!(
            "SELECT {} WHERE e.user_id = $1 AND e.id = $2",
            ENTRY_COLUMNS
        ))
        .bind(self.user_id)
        .bind(entry_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Entry {} not found", entry_id)))?;
        record.to_domain()
    }

    async fn create_entry(&self, entry: NewEntry) -> PortResult<Entry> {
        let entry_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO entries (id, user_id, emotion, custom_emotion_id, note, weather, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry_id)
        .bind(self.user_id)
        .bind(entry.emotion_key().as_str())
        .bind(entry.custom_emotion_id())
        .bind(&entry.note)
        .bind(&entry.weather)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.get_entry(entry_id).await
    }

    async fn list_custom_emotions(&self) -> PortResult<Vec<CustomEmotion>> {
        let records = sqlx::query_as::<_, CustomEmotionRecord>(
            "SELECT id, name, image_url, created_at FROM custom_emotions WHERE user_id = $1 ORDER BY created_at DESC, seq DESC",
        )
        .bind(self.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_custom_emotion(
        &self,
        name: &str,
        image: ImageUpload,
    ) -> PortResult<CustomEmotion> {
        let image_path = object_path(self.user_id, &image, Utc::now())?;
        self.images
            .upload(&image_path, &image.bytes, &image.content_type)
            .await?;
        let image_url = self.images.public_url(&image_path);

        let inserted = sqlx::query_as::<_, CustomEmotionRecord>(
            "INSERT INTO custom_emotions (id, user_id, name, image_url, image_path) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, name, image_url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(self.user_id)
        .bind(name)
        .bind(&image_url)
        .bind(&image_path)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(record) => Ok(record.to_domain()),
            Err(e) => {
                if let Err(cleanup) = self.images.remove(&image_path).await {
                    warn!("Orphaned image {} after failed insert: {}", image_path, cleanup);
                }
                Err(PortError::Unexpected(e.to_string()))
            }
        }
    }

    async fn delete_custom_emotion(&self, emotion_id: Uuid) -> PortResult<()> {
        let image_path = sqlx::query_scalar::<_, String>(
            "SELECT image_path FROM custom_emotions WHERE id = $1 AND user_id = $2",
        )
        .bind(emotion_id)
        .bind(self.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            not_found_or_unexpected(e, format!("Custom emotion {} not found", emotion_id))
        })?;

        // Asset first, then metadata. A missing asset counts as removed, so a
        // retry after a failed metadata delete finishes the job.
        self.images.remove(&image_path).await?;

        sqlx::query("DELETE FROM custom_emotions WHERE id = $1 AND user_id = $2")
            .bind(emotion_id)
            .bind(self.user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn list_visibility(&self) -> PortResult<Vec<EmotionVisibility>> {
        let records = sqlx::query_as::<_, VisibilityRecord>(
            "SELECT emotion, is_enabled FROM user_emotion_settings WHERE user_id = $1",
        )
        .bind(self.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records
            .into_iter()
            .filter_map(|r| {
                r.emotion.parse().ok().map(|emotion| EmotionVisibility {
                    emotion,
                    enabled: r.is_enabled,
                })
            })
            .collect())
    }

    async fn set_visibility(&self, setting: EmotionVisibility) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_emotion_settings (user_id, emotion, is_enabled) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, emotion) DO UPDATE SET is_enabled = EXCLUDED.is_enabled",
        )
        .bind(self.user_id)
        .bind(setting.emotion.as_str())
        .bind(setting.enabled)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
