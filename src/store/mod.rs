pub mod history;
pub mod json_store;
pub mod schema;

pub use history::HistoryStore;
pub use json_store::{JsonStore, KeyValueStore, MemoryStore};
pub use schema::{HistoryData, HistoryEntry};
