//! Common library for the dashboard services
//!
//! This crate provides shared functionality used by the session and
//! dashboard crates, including client-local key-value storage, settings
//! loading, and error handling.

pub mod error;
pub mod settings;
pub mod storage;

pub use error::{SettingsError, StorageError};
pub use settings::Settings;
pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Example usage of the storage module
///
/// ```rust,no_run
/// use common::{FileStore, KeyValueStore, Settings};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let settings = Settings::from_env()?;
///     let store = FileStore::new(&settings.storage.path);
///     store.set("greeting", "hello")?;
///     println!("Stored value: {:?}", store.get("greeting")?);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
