//! Durable client state.
//!
//! Stores the credential and theme keys in `<base>/state.json` with restricted
//! permissions (0600). Values are never logged.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

use crate::config::paths;

/// Key holding the bearer credential (absent = logged out).
pub const CREDENTIAL_KEY: &str = "access_token";
/// Key holding the selected visual theme.
pub const THEME_KEY: &str = "theme";

/// Key/value storage that survives process restarts.
pub trait DurableStore: Send + Sync {
    /// Reads a key.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a key.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON file store.
///
/// The whole map is rewritten on every change; the file is small and owned by
/// a single process at a time.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at the default location (`${SHIFTPLAN_HOME}/state.json`).
    pub fn open_default() -> Self {
        Self::new(paths::state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state from {}", self.path.display()))
    }

    /// Writes the map to a private temp file, then renames it over the state
    /// file so a failed write leaves the previous state intact.
    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(map).context("Failed to serialize state")?;

        let tmp_path = self.path.with_extension("json.tmp");
        if tmp_path.exists() {
            // Permissions only apply on creation; never reuse a leftover file.
            fs::remove_file(&tmp_path)
                .with_context(|| format!("Failed to remove {}", tmp_path.display()))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })
    }

    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_poisoned| anyhow!("state file lock poisoned"))?;
        let mut map = self.read_map()?;
        if apply(&mut map) {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| map.remove(key).is_some())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a single key.
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_poisoned| anyhow!("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_poisoned| anyhow!("memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_poisoned| anyhow!("memory store lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_get_remove_round_trip_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("state.json"));

        store.set(CREDENTIAL_KEY, "tok-1").unwrap();
        store.set(THEME_KEY, "dark").unwrap();
        store.remove(CREDENTIAL_KEY).unwrap();

        let reopened = FileStore::new(store.path());
        assert_eq!(reopened.get(CREDENTIAL_KEY).unwrap(), None);
        assert_eq!(reopened.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_remove_missing_key_does_not_create_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::new(&path);

        store.remove(CREDENTIAL_KEY).unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_state_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        FileStore::new(&path).set(CREDENTIAL_KEY, "secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::new(&path);

        store.set(CREDENTIAL_KEY, "tok-1").unwrap();
        store.set(CREDENTIAL_KEY, "tok-2").unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_leftover_temp_file_does_not_leak_into_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, "{\"access_token\": \"half-written\"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o644)).unwrap();
        }

        let store = FileStore::new(&path);
        store.set(THEME_KEY, "dark").unwrap();

        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        assert!(FileStore::new(&path).get(CREDENTIAL_KEY).is_err());
    }

    #[test]
    fn test_memory_store_seeded() {
        let store = MemoryStore::with(CREDENTIAL_KEY, "abc");
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("abc"));
        store.remove(CREDENTIAL_KEY).unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
    }
}
