//! JSON key-value store for the persisted collections.
//!
//! Each logical key (`recipientsList`, `emailTemplates`, ...) lives in its
//! own `<key>.json` file under the data directory. Operations take the
//! store explicitly and follow a load -> transform -> persist cycle.

pub mod error;

pub use error::StoreError;

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

pub const RECIPIENTS_KEY: &str = "recipientsList";
pub const TEMPLATES_KEY: &str = "emailTemplates";
pub const BATCH_SETTINGS_KEY: &str = "batchSettings";
pub const DEFAULT_SCHEDULE_TIME_KEY: &str = "defaultScheduleTime";
pub const EMAILS_SENT_COUNT_KEY: &str = "emailsSentCount";

pub type SharedStore = Arc<Store>;

/// Every read and write goes through one lock, so a reader never observes
/// a key while another task is replacing it.
#[derive(Debug)]
pub struct Store {
    directory: PathBuf,
    lock: Mutex<()>,
}

impl Store {
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        if !directory.exists() {
            info!("Creating data directory: {:?}", directory);
            fs::create_dir_all(&directory).await?;
        }

        Ok(Self {
            directory,
            lock: Mutex::new(()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Holds the store lock until the returned guard is dropped.
    ///
    /// Use this when several keys must be read or written together.
    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            store: self,
            _guard: self.lock.lock().await,
        }
    }

    /// Reads `key`, writing `initial` when it is absent or unreadable.
    pub async fn load_or_init<T>(&self, key: &str, initial: T) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.lock().await.load_or_init(key, initial).await
    }

    pub async fn save<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        self.lock().await.save(key, value).await
    }

    /// Loads `key`, applies `f` and persists the result.
    ///
    /// The whole cycle runs under the store lock. Nothing is written if `f`
    /// fails.
    pub async fn update<T, R, E, F>(&self, key: &str, initial: T, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let guard = self.lock().await;
        let mut value = guard.load_or_init(key, initial).await?;
        let result = f(&mut value)?;
        guard.save(key, &value).await?;
        Ok(result)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json.tmp", key))
    }
}

/// Exclusive access to the store, obtained from [`Store::lock`].
pub struct StoreGuard<'a> {
    store: &'a Store,
    _guard: MutexGuard<'a, ()>,
}

impl StoreGuard<'_> {
    pub async fn load_or_init<T>(&self, key: &str, initial: T) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.store.path_for(key);

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Key '{}' not found, initializing", key);
                self.save(key, &initial).await?;
                return Ok(initial);
            }
            Err(e) => return Err(StoreError::IoError(e)),
        };

        match serde_json::from_str::<T>(&contents) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!("Error reading key '{}', resetting to initial value: {}", key, e);
                self.save(key, &initial).await?;
                Ok(initial)
            }
        }
    }

    /// Writes `value` to a temporary file and renames it over the key, so the
    /// key file is always either the old or the new contents.
    pub async fn save<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string_pretty(value).map_err(|source| {
            StoreError::SerializeError {
                key: key.to_string(),
                source,
            }
        })?;

        let temp_path = self.store.temp_path_for(key);
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, self.store.path_for(key)).await?;
        debug!("Saved key '{}'", key);
        Ok(())
    }
}
