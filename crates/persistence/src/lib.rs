use serde::{Deserialize, Serialize};

/// Storage key of the overlay offset record.
pub const DEFAULT_OFFSET_KEY: &str = "floorplanPosition";

/// Saved overlay position: centroid longitude/latitude in degrees, epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayOffset {
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: u64,
}

impl OverlayOffset {
    pub fn from_json_str(raw: &str) -> Result<Self, StorageError> {
        let offset = serde_json::from_str::<OverlayOffset>(raw)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        if !offset.longitude.is_finite() || !offset.latitude.is_finite() {
            return Err(StorageError::Corrupt(
                "offset coordinates are not finite".to_string(),
            ));
        }
        Ok(offset)
    }

    pub fn to_json_string(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Io(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Unavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "offset storage unavailable"),
            StorageError::Corrupt(msg) => write!(f, "offset storage corrupt: {msg}"),
            StorageError::Io(msg) => write!(f, "offset storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Durable home of the single overlay offset record.
pub trait OffsetStore {
    fn load(&self) -> Result<Option<OverlayOffset>, StorageError>;
    /// Overwrites any previous record.
    fn save(&mut self, offset: &OverlayOffset) -> Result<(), StorageError>;
    /// Returns whether a record was removed.
    fn clear(&mut self) -> Result<bool, StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryOffsetStore {
    offset: Option<OverlayOffset>,
}

impl InMemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: OverlayOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl OffsetStore for InMemoryOffsetStore {
    fn load(&self) -> Result<Option<OverlayOffset>, StorageError> {
        Ok(self.offset)
    }

    fn save(&mut self, offset: &OverlayOffset) -> Result<(), StorageError> {
        self.offset = Some(*offset);
        Ok(())
    }

    fn clear(&mut self) -> Result<bool, StorageError> {
        Ok(self.offset.take().is_some())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod file_storage {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use super::{OffsetStore, OverlayOffset, StorageError};

    /// JSON file of `key -> raw record` pairs, the native stand-in for browser storage.
    ///
    /// Records are kept as their raw JSON text so one corrupt record does not
    /// hide the others.
    #[derive(Debug)]
    pub struct FileOffsetStore {
        path: PathBuf,
        key: String,
    }

    impl FileOffsetStore {
        pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                key: key.into(),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
            let raw = match std::fs::read_to_string(&self.path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
                Err(e) => return Err(StorageError::Io(e.to_string())),
            };
            if raw.trim().is_empty() {
                return Ok(BTreeMap::new());
            }
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
        }

        /// Existing records, or an empty map flagged `true` when the file
        /// cannot be parsed and must be rewritten.
        fn read_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StorageError> {
            match self.read_all() {
                Ok(items) => Ok((items, false)),
                Err(StorageError::Corrupt(reason)) => {
                    tracing::warn!(path = %self.path.display(), %reason, "offsets file corrupt, starting over");
                    Ok((BTreeMap::new(), true))
                }
                Err(e) => Err(e),
            }
        }

        fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
            let raw =
                serde_json::to_string_pretty(items).map_err(|e| StorageError::Io(e.to_string()))?;
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
            let tmp = self.path.with_extension("tmp");
            std::fs::write(&tmp, raw).map_err(|e| StorageError::Io(e.to_string()))?;
            std::fs::rename(&tmp, &self.path).map_err(|e| StorageError::Io(e.to_string()))
        }
    }

    impl OffsetStore for FileOffsetStore {
        fn load(&self) -> Result<Option<OverlayOffset>, StorageError> {
            let items = self.read_all()?;
            match items.get(&self.key) {
                Some(raw) => OverlayOffset::from_json_str(raw).map(Some),
                None => Ok(None),
            }
        }

        fn save(&mut self, offset: &OverlayOffset) -> Result<(), StorageError> {
            let (mut items, _) = self.read_for_write()?;
            items.insert(self.key.clone(), offset.to_json_string()?);
            self.write_all(&items)?;
            tracing::debug!(path = %self.path.display(), key = %self.key, "offset saved");
            Ok(())
        }

        fn clear(&mut self) -> Result<bool, StorageError> {
            let (mut items, corrupt) = self.read_for_write()?;
            let removed = items.remove(&self.key).is_some();
            if removed || corrupt {
                self.write_all(&items)?;
            }
            Ok(removed)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_storage::FileOffsetStore;

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{OffsetStore, OverlayOffset, StorageError};

    #[derive(Debug)]
    pub struct LocalStorageOffsetStore {
        key: String,
    }

    impl LocalStorageOffsetStore {
        pub fn new(key: impl Into<String>) -> Self {
            Self { key: key.into() }
        }
    }

    impl OffsetStore for LocalStorageOffsetStore {
        fn load(&self) -> Result<Option<OverlayOffset>, StorageError> {
            let storage = window_local_storage()?;
            let raw = storage
                .get_item(&self.key)
                .map_err(|e| StorageError::Io(format!("get_item failed: {:?}", e)))?;
            let Some(raw) = raw else {
                return Ok(None);
            };
            if raw.trim().is_empty() {
                return Ok(None);
            }
            OverlayOffset::from_json_str(&raw).map(Some)
        }

        fn save(&mut self, offset: &OverlayOffset) -> Result<(), StorageError> {
            let storage = window_local_storage()?;
            let raw = offset.to_json_string()?;
            storage
                .set_item(&self.key, &raw)
                .map_err(|e| StorageError::Io(format!("set_item failed: {:?}", e)))
        }

        fn clear(&mut self) -> Result<bool, StorageError> {
            let storage = window_local_storage()?;
            let existed = storage
                .get_item(&self.key)
                .map_err(|e| StorageError::Io(format!("get_item failed: {:?}", e)))?
                .is_some();
            storage
                .remove_item(&self.key)
                .map_err(|e| StorageError::Io(format!("remove_item failed: {:?}", e)))?;
            Ok(existed)
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, StorageError> {
        let win = web_sys::window().ok_or(StorageError::Unavailable)?;
        win.local_storage()
            .map_err(|e| StorageError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(StorageError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageOffsetStore;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> OverlayOffset {
        OverlayOffset {
            longitude: -1.489934,
            latitude: 53.422742,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn record_uses_plain_field_names() {
        let json = sample().to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "longitude": -1.489934,
                "latitude": 53.422742,
                "timestamp": 1_700_000_000_000u64
            })
        );
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(matches!(
            OverlayOffset::from_json_str("{\"longitude\":1}"),
            Err(StorageError::Corrupt(_))
        ));
        assert!(matches!(
            OverlayOffset::from_json_str("not json"),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn in_memory_save_overwrites_and_clear_reports() {
        let mut store = InMemoryOffsetStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        let newer = OverlayOffset {
            timestamp: 1_700_000_000_500,
            ..sample()
        };
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap(), Some(newer));
        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("offsets.json");

        let mut store = FileOffsetStore::new(&path, DEFAULT_OFFSET_KEY);
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();

        let mut reopened = FileOffsetStore::new(&path, DEFAULT_OFFSET_KEY);
        assert_eq!(reopened.load().unwrap(), Some(sample()));

        let other = FileOffsetStore::new(&path, "otherKey");
        assert_eq!(other.load().unwrap(), None);

        assert!(reopened.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_reports_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.json");
        std::fs::write(&path, r#"{"floorplanPosition": "{\"longitude\": \"east\"}"}"#).unwrap();

        let store = FileOffsetStore::new(&path, DEFAULT_OFFSET_KEY);
        assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_replaces_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let mut store = FileOffsetStore::new(&path, DEFAULT_OFFSET_KEY);
        assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        std::fs::write(&path, "{ truncated").unwrap();
        assert!(!store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }
}
