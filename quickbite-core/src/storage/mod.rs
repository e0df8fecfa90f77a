use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

mod file;
mod memory;

pub use file::*;
pub use memory::*;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The key contains characters the backend cannot represent
    #[error("invalid storage key: {key}")]
    InvalidKey { key: String },
}

/// Represents a durable string key-value store that survives process restarts.
///
/// No transactional guarantees are assumed. A missing key reads as [None], and
/// callers are expected to treat a malformed value the same way.
pub trait Storage: Send + Sync + 'static {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads and deserializes a value, degrading to [None] when the key is absent
/// or the stored value is corrupt.
pub fn read_json<T, S>(storage: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: Storage,
{
    let raw = match storage.read(key) {
        Ok(raw) => raw?,
        Err(e) => {
            log::warn!("failed to read {key} from storage: {e}");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("discarding corrupt value for {key}: {e}");
            None
        }
    }
}

/// Serializes and writes a value. Write failures are logged, not propagated,
/// since durable writes are post-commit side effects of in-memory mutations.
pub fn write_json<T, S>(storage: &S, key: &str, value: &T)
where
    T: Serialize,
    S: Storage,
{
    let raw = serde_json::to_string(value).expect("value serializes");

    if let Err(e) = storage.write(key, &raw) {
        log::warn!("failed to persist {key}: {e}");
    }
}
