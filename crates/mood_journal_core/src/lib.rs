pub mod calendar;
pub mod capture;
pub mod domain;
pub mod emotions;
pub mod error;
pub mod ports;
pub mod refresh;
pub mod weather;

#[cfg(test)]
mod testing;

pub use domain::{
    Coordinates, CustomEmotion, CustomEmotionSummary, DefaultEmotion, EmotionChoice, EmotionKey,
    EmotionVisibility, Entry, Glyph, Identity, ImageUpload, NewEntry, Session, SessionMode, User,
    UserCredentials, WeatherKind, WeatherReport, GUEST_IDENTITY,
};
pub use error::{JournalError, JournalResult};
pub use ports::{
    AccountService, ImageStore, JournalStore, LocalStorage, PortError, PortResult,
    RemoteJournals, WeatherService,
};
