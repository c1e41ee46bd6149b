//! Result caching interface.
//!
//! Summaries are cached per `(kind, project, session)` together with the
//! fingerprints needed to tell whether they are still valid: the session
//! file's content hash, the hash of the module that registered the checks,
//! and the registered item names. The on-disk backend lives outside this
//! crate; [`MemoryCacheBackend`] serves tests and single-process runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend failed: {0}")]
    Backend(String),

    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Fingerprints stored alongside a cached value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    /// RFC 3339 timestamp.
    pub cached_at: String,
    pub content_hash: String,
    pub evals_module_hash: String,
    pub registered_names: Vec<String>,
}

impl CacheMeta {
    /// Meta stamped with the current time.
    pub fn now(
        content_hash: impl Into<String>,
        evals_module_hash: impl Into<String>,
        registered_names: Vec<String>,
    ) -> Self {
        Self {
            cached_at: Utc::now().to_rfc3339(),
            content_hash: content_hash.into(),
            evals_module_hash: evals_module_hash.into(),
            registered_names,
        }
    }

    /// Whether this entry was produced from the same inputs.
    pub fn matches(&self, content_hash: &str, module_hash: &str, names: &[String]) -> bool {
        self.content_hash == content_hash
            && self.evals_module_hash == module_hash
            && self.registered_names == names
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub meta: CacheMeta,
}

/// Pluggable storage for cached summaries.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    async fn set(&self, key: &str, value: Value, meta: CacheMeta) -> CacheResult<()>;

    async fn invalidate(&self, key: &str) -> CacheResult<()>;

    /// Drop every key starting with `prefix`.
    async fn invalidate_by_prefix(&self, prefix: &str) -> CacheResult<()>;

    async fn close(&self) -> CacheResult<()>;
}

/// In-memory backend backed by a `HashMap<key, entry>`.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value, meta: CacheMeta) -> CacheResult<()> {
        self.lock().insert(key.to_string(), CacheEntry { value, meta });
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn invalidate_by_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.lock().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint of a session file from its modification time and size.
pub fn content_hash(mtime_ms: u64, size: u64) -> String {
    sha256_hex(format!("{mtime_ms}:{size}").as_bytes())
}

/// Fingerprint of the module that registered the checks.
pub fn module_hash(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}

/// Cache key for one summary kind of one session.
pub fn cache_key(kind: &str, project_name: &str, session_id: &str) -> String {
    format!("{kind}/{project_name}/{session_id}")
}

/// Whether the cache is consulted at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    #[default]
    On,
    Off,
}

/// Typed read-through cache over a [`CacheBackend`].
#[derive(Clone)]
pub struct SummaryCache {
    backend: Arc<dyn CacheBackend>,
    module_hash: String,
    mode: CacheMode,
}

impl std::fmt::Debug for SummaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryCache")
            .field("module_hash", &self.module_hash)
            .field("mode", &self.mode)
            .finish()
    }
}

impl SummaryCache {
    pub fn new(backend: Arc<dyn CacheBackend>, module_hash: impl Into<String>, mode: CacheMode) -> Self {
        Self {
            backend,
            module_hash: module_hash.into(),
            mode,
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Return the cached summary under `key` if its fingerprints match,
    /// otherwise run `compute`, store the result and return it.
    ///
    /// Backend failures never fail the call; they are logged and the value
    /// is computed fresh.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        content_hash: &str,
        registered_names: &[String],
        compute: F,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.mode == CacheMode::Off {
            return compute().await;
        }

        match self.backend.get(key).await {
            Ok(Some(entry))
                if entry
                    .meta
                    .matches(content_hash, &self.module_hash, registered_names) =>
            {
                match serde_json::from_value::<T>(entry.value) {
                    Ok(value) => {
                        debug!(key = %key, "cache hit");
                        return value;
                    }
                    Err(e) => warn!(key = %key, error = %e, "cached value unreadable; recomputing"),
                }
            }
            Ok(Some(_)) => debug!(key = %key, "cache entry stale"),
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(e) => warn!(key = %key, error = %e, "cache read failed; recomputing"),
        }

        let value = compute().await;
        match serde_json::to_value(&value) {
            Ok(json) => {
                let meta = CacheMeta::now(content_hash, &self.module_hash, registered_names.to_vec());
                if let Err(e) = self.backend.set(key, json, meta).await {
                    warn!(key = %key, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "summary not serializable; not cached"),
        }
        value
    }
}
