//! Durable key → bytes store with time-based expiration.
//!
//! Every entry is one file under `<root>/<namespace>/`, named by the
//! URL-encoded key. The file starts with an RFC 3339 `created_at` line and
//! the payload follows verbatim. Anything that cannot be read back, for any
//! reason, is a miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::CacheError;

/// Four weeks, the expiration the tool has always used.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(4 * 7 * 24 * 60 * 60);

pub const DEFAULT_NAMESPACE: &str = "thirdparty-notice";

/// Where the cache lives and how long entries stay valid. Fixed for a run.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub root: PathBuf,
    pub namespace: String,
    pub expiration: Duration,
}

impl CacheConfig {
    pub fn new(root: PathBuf, namespace: impl Into<String>, expiration: Duration) -> Self {
        Self {
            root,
            namespace: namespace.into(),
            expiration,
        }
    }

    /// Platform cache directory (`~/.cache` on Linux), or the temp dir when
    /// the platform has none.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(std::env::temp_dir)
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.namespace)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Self::default_root(), DEFAULT_NAMESPACE, DEFAULT_EXPIRATION)
    }
}

/// A stored payload together with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Valid while `now - created_at < expiration`. Timestamps from the
    /// future count as expired.
    pub fn is_valid(&self, expiration: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        if age < chrono::Duration::zero() {
            return false;
        }
        match chrono::Duration::from_std(expiration) {
            Ok(limit) => age < limit,
            Err(_) => true,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = self.created_at.to_rfc3339().into_bytes();
        bytes.push(b'\n');
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<Self, CacheError> {
        let split = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| CacheError::Corrupt(format!("{key}: missing header")))?;
        let header = std::str::from_utf8(&bytes[..split])
            .map_err(|e| CacheError::Corrupt(format!("{key}: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(header.trim())
            .map_err(|e| CacheError::Corrupt(format!("{key}: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            key: key.to_string(),
            payload: bytes[split + 1..].to_vec(),
            created_at,
        })
    }
}

/// File-backed content cache.
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
    expiration: Duration,
    read_enabled: bool,
}

impl ContentCache {
    pub fn open(config: &CacheConfig) -> Self {
        Self::at(config.dir(), config.expiration)
    }

    pub fn at(dir: impl Into<PathBuf>, expiration: Duration) -> Self {
        Self {
            dir: dir.into(),
            expiration,
            read_enabled: true,
        }
    }

    /// A cache that never reports hits but still records new entries.
    pub fn without_reads(mut self) -> Self {
        self.read_enabled = false;
        self
    }

    /// A nested cache stored under `<dir>/<name>`, sharing the expiration.
    pub fn child(&self, name: &str) -> Self {
        Self {
            dir: self.dir.join(name),
            expiration: self.expiration,
            read_enabled: self.read_enabled,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Payload for `key`, or `None` if absent, expired, or unreadable.
    pub fn load(&self, key: &str) -> Option<Vec<u8>> {
        if !self.read_enabled {
            return None;
        }
        let entry = self.entry(key)?;
        if entry.is_valid(self.expiration, Utc::now()) {
            Some(entry.payload)
        } else {
            log::debug!("cache entry {key} expired at {}", entry.created_at);
            None
        }
    }

    /// Raw entry for `key`, expired or not.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        match self.read_entry(key) {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("cache miss for {key}: {err}");
                None
            }
        }
    }

    /// Overwrites `key` with `payload`, stamped now. Errors are logged and dropped.
    pub fn save(&self, key: &str, payload: &[u8]) {
        let entry = CacheEntry {
            key: key.to_string(),
            payload: payload.to_vec(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.write_entry(&entry) {
            log::debug!("failed to write cache entry {key}: {err}");
        }
    }

    #[cfg(test)]
    pub(crate) fn save_entry(&self, entry: &CacheEntry) {
        self.write_entry(entry).unwrap();
    }

    /// Removes every entry in this cache.
    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(urlencoding::encode(key).as_ref())
    }

    fn read_entry(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        CacheEntry::decode(key, &bytes).map(Some)
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&entry.key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, entry.encode())?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
