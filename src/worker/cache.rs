//! Named, versioned response caches.

use super::fetch::Response;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache name: {0:?}")]
    InvalidName(String),

    #[error("Cache not found: {0}")]
    NotFound(String),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: super::fetch::FetchError,
    },

    #[error("Bad response for {url}: status {status}")]
    BadStatus { url: String, status: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Index(#[from] serde_json::Error),
}

/// Storage for every cache the worker owns, keyed by cache name.
#[async_trait(?Send)]
pub trait CacheStorage {
    /// Create the named cache if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), CacheError>;

    /// Store every entry in the named cache in one step.
    async fn put_all(&self, name: &str, entries: Vec<Response>) -> Result<(), CacheError>;

    /// Look `url` up across all caches.
    async fn match_url(&self, url: &str) -> Result<Option<Response>, CacheError>;

    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Remove the named cache. `Ok(false)` if there was nothing to remove.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// URLs stored in the named cache.
    async fn entries(&self, name: &str) -> Result<Vec<String>, CacheError>;
}

fn validate_name(name: &str) -> Result<(), CacheError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidName(name.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RefCell<BTreeMap<String, BTreeMap<String, Response>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        validate_name(name)?;
        self.caches.borrow_mut().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<Response>) -> Result<(), CacheError> {
        validate_name(name)?;
        let mut caches = self.caches.borrow_mut();
        let cache = caches.entry(name.to_string()).or_default();
        for response in entries {
            cache.insert(response.url.clone(), response);
        }
        Ok(())
    }

    async fn match_url(&self, url: &str) -> Result<Option<Response>, CacheError> {
        Ok(self
            .caches
            .borrow()
            .values()
            .find_map(|cache| cache.get(url).cloned()))
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.caches.borrow().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.caches.borrow_mut().remove(name).is_some())
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, CacheError> {
        self.caches
            .borrow()
            .get(name)
            .map(|cache| cache.keys().cloned().collect())
            .ok_or_else(|| CacheError::NotFound(name.to_string()))
    }
}

const INDEX_FILE: &str = "index.json";
const INDEX_TEMP_FILE: &str = "index.json.tmp";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: BTreeMap<String, StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    body_file: String,
    response: Response,
}

/// Caches persisted under a root directory.
///
/// Each cache is a directory holding `index.json` and one body file per URL,
/// named after the SHA-256 of the URL.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, name: &str) -> Result<PathBuf, CacheError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    fn body_file(url: &str) -> String {
        format!("{:x}", Sha256::digest(url.as_bytes()))
    }

    async fn read_index(dir: &Path) -> Result<CacheIndex, CacheError> {
        match tokio::fs::read(dir.join(INDEX_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(CacheIndex::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_index(dir: &Path, index: &CacheIndex) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(index)?;
        let temp = dir.join(INDEX_TEMP_FILE);
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, dir.join(INDEX_FILE)).await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        let dir = self.cache_dir(name)?;
        tokio::fs::create_dir_all(&dir).await?;
        if !tokio::fs::try_exists(dir.join(INDEX_FILE)).await? {
            Self::write_index(&dir, &CacheIndex::default()).await?;
        }
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<Response>) -> Result<(), CacheError> {
        let dir = self.cache_dir(name)?;
        tokio::fs::create_dir_all(&dir).await?;
        let mut index = Self::read_index(&dir).await?;

        for response in entries {
            let body_file = Self::body_file(&response.url);
            tokio::fs::write(dir.join(&body_file), &response.body).await?;
            index
                .entries
                .insert(response.url.clone(), StoredEntry { body_file, response });
        }

        // The index goes last so a half-written batch is never visible.
        Self::write_index(&dir, &index).await
    }

    async fn match_url(&self, url: &str) -> Result<Option<Response>, CacheError> {
        for name in self.keys().await? {
            let dir = self.root.join(&name);
            // One unreadable cache must not hide the others.
            let index = match Self::read_index(&dir).await {
                Ok(index) => index,
                Err(err) => {
                    warn!(%err, cache = %name, "skipping cache with unreadable index");
                    continue;
                }
            };
            if let Some(entry) = index.entries.get(url) {
                let mut response = entry.response.clone();
                response.body = tokio::fs::read(dir.join(&entry.body_file)).await?;
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let dir = self.cache_dir(name)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, CacheError> {
        let dir = self.cache_dir(name)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(CacheError::NotFound(name.to_string()));
        }
        let index = Self::read_index(&dir).await?;
        Ok(index.entries.into_keys().collect())
    }
}
