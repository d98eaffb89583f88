pub mod db;
pub mod guest;
pub mod images;
pub mod journal_db;
pub mod local_storage;
pub mod weather;

pub use db::DbAdapter;
pub use guest::GuestJournalStore;
pub use images::FsImageStore;
pub use journal_db::PgJournalStore;
pub use local_storage::{FileLocalStorage, LocalStorageRoot};
pub use weather::OpenWeatherAdapter;
