//! crates/mood_journal_core/src/error.rs
//!
//! Errors surfaced by the journal operations. The display text of every variant
//! is the message shown to the user.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    // --- Validation (rejected before any storage call) ---
    #[error("今の気持ちを選んでください")]
    EmotionRequired,
    #[error("選択した表情が見つかりません")]
    UnknownCustomEmotion,
    #[error("名前と画像を選択してください")]
    MissingNameOrImage,
    #[error("画像サイズは2MB以下にしてください")]
    ImageTooLarge,
    #[error("画像ファイルを選択してください")]
    NotAnImage,
    #[error("削除するには確認が必要です")]
    ConfirmationRequired,

    #[error("記録が見つかりません")]
    NotFound,

    // --- Storage failures on write ---
    #[error("保存に失敗しました。もう一度お試しください。")]
    SaveFailed(#[source] PortError),
    #[error("設定の更新に失敗しました")]
    SettingsFailed(#[source] PortError),
    #[error("アップロードに失敗しました")]
    UploadFailed(#[source] PortError),
    #[error("削除に失敗しました")]
    DeleteFailed(#[source] PortError),

    /// A read failed; views render their empty state instead.
    #[error("読み込みに失敗しました")]
    LoadFailed(#[source] PortError),
}

impl JournalError {
    /// True for failures detected before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            JournalError::EmotionRequired
                | JournalError::UnknownCustomEmotion
                | JournalError::MissingNameOrImage
                | JournalError::ImageTooLarge
                | JournalError::NotAnImage
                | JournalError::ConfirmationRequired
        )
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
