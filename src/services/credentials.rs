use crate::error::{PagerError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

/// Name the API key is stored under.
pub const API_KEY_NAME: &str = "openaiApiKey";

/// Masks an API key for logging: first 7 chars + "***" + last 4 chars.
/// Keys of 11 characters or fewer are fully masked.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Key-value persistence for credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Stores values as a flat JSON object on disk.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/article-pager/credentials.json`
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| PagerError::Credential {
            reason: "Cannot determine the user config directory".to_string(),
        })?;
        Ok(base.join("article-pager").join("credentials.json"))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PagerError::Credential {
                reason: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)?;
        debug!("Wrote credential store {}", self.path.display());
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.values.lock().map_err(|_| PagerError::Credential {
            reason: "Credential store lock poisoned".to_string(),
        })
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// The API key, read once from a store at startup and written back on
/// every change.
pub struct Credentials<S: CredentialStore> {
    store: S,
    api_key: Option<String>,
}

impl<S: CredentialStore> Credentials<S> {
    pub fn load(store: S) -> Result<Self> {
        let api_key = store.get(API_KEY_NAME)?.filter(|key| !key.is_empty());
        info!(
            "Loaded credentials (api key {})",
            if api_key.is_some() { "present" } else { "absent" }
        );
        Ok(Self { store, api_key })
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// An empty value clears the stored key.
    pub fn set_api_key(&mut self, value: &str) -> Result<()> {
        if value.is_empty() {
            self.store.remove(API_KEY_NAME)?;
            self.api_key = None;
        } else {
            self.store.set(API_KEY_NAME, value)?;
            self.api_key = Some(value.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "***");
        assert_eq!(mask_token("sk-12345"), "***");
        assert_eq!(mask_token("sk-proj-abcdefghijklmnop"), "sk-proj***mnop");
    }

    #[test]
    fn test_memory_store_write_through() {
        let mut credentials = Credentials::load(MemoryCredentialStore::default()).unwrap();
        assert_eq!(credentials.api_key(), None);

        credentials.set_api_key("sk-abc").unwrap();
        assert_eq!(credentials.api_key(), Some("sk-abc"));
        assert_eq!(
            credentials.store.get(API_KEY_NAME).unwrap().as_deref(),
            Some("sk-abc")
        );

        credentials.set_api_key("").unwrap();
        assert_eq!(credentials.api_key(), None);
        assert_eq!(credentials.store.get(API_KEY_NAME).unwrap(), None);
    }

    #[test]
    fn test_file_store_round_trip_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let mut credentials = Credentials::load(FileCredentialStore::new(&path)).unwrap();
        assert_eq!(credentials.api_key(), None);
        credentials.set_api_key("sk-persisted").unwrap();
        assert!(path.exists());

        let reloaded = Credentials::load(FileCredentialStore::new(&path)).unwrap();
        assert_eq!(reloaded.api_key(), Some("sk-persisted"));
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.set("other", "value").unwrap();
        store.set(API_KEY_NAME, "sk-1").unwrap();
        store.remove(API_KEY_NAME).unwrap();

        assert_eq!(store.get("other").unwrap().as_deref(), Some("value"));
        assert_eq!(store.get(API_KEY_NAME).unwrap(), None);
    }

    #[test]
    fn test_empty_stored_key_counts_as_absent() {
        let store = MemoryCredentialStore::default();
        store.set(API_KEY_NAME, "").unwrap();
        let credentials = Credentials::load(store).unwrap();
        assert_eq!(credentials.api_key(), None);
    }
}
