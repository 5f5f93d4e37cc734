//! HTTP Cache implementation.
//!
//! Chromium mapping: net/http/http_cache.h (simple disk backend)
//!
//! Each entry lives in its own JSON file under the cache directory, named
//! by a digest of its key, and carries the key itself so the in-memory
//! index is rebuilt by scanning the directory on open. Caches opened on the
//! same directory agree on one file per key. Provides:
//! - Cache-Control parsing (max-age, no-store)
//! - A hard byte budget across all entry files
//! - Least-recently-used eviction
//! - Thread-safe concurrent access

use crate::base::neterror::NetError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use dashmap::DashMap;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use url::Url;

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Distinguishes in-flight temp files across every cache in the process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cache key components.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// URL without fragment
    url: String,
    /// HTTP method (only GET/HEAD are cacheable)
    method: String,
}

impl CacheKey {
    pub fn new(url: &Url, method: &str) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            url: url.into(),
            method: method.to_uppercase(),
        }
    }

    /// File name stem shared by every cache opened on the same directory.
    fn file_stem(&self) -> String {
        let digest = Sha256::new()
            .chain_update(self.method.as_bytes())
            .chain_update(b" ")
            .chain_update(self.url.as_bytes())
            .finalize();
        digest[..16].iter().fold(String::with_capacity(32), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }
}

/// Cached response entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Response status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
    /// When this entry was written
    pub stored_at: OffsetDateTime,
    /// Time-to-live from max-age
    pub ttl: Duration,
    file: PathBuf,
    size: usize,
    last_used: u64,
}

impl CacheEntry {
    /// Check if the entry is still fresh at `now`.
    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        is_fresh(self.stored_at, self.ttl, now)
    }
}

fn is_fresh(stored_at: OffsetDateTime, ttl: Duration, now: OffsetDateTime) -> bool {
    // A negative age means the wall clock stepped back; count it as zero.
    let age = Duration::try_from(now - stored_at).unwrap_or(Duration::ZERO);
    age < ttl
}

/// On-disk form of an entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    url: String,
    method: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    #[serde(with = "time::serde::timestamp")]
    stored_at: OffsetDateTime,
    max_age: u64,
}

/// Disk-backed HTTP cache bounded by a byte budget.
pub struct HttpCache {
    dir: PathBuf,
    entries: DashMap<CacheKey, CacheEntry>,
    current_size: AtomicUsize,
    max_size_bytes: usize,
    tick: AtomicU64,
}

impl HttpCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    ///
    /// Expired and unreadable entry files are deleted while loading, along
    /// with temp files left behind by an interrupted write.
    pub fn open(dir: impl Into<PathBuf>, max_size_bytes: usize) -> Result<Self, NetError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot create cache directory");
            NetError::CacheWriteFailure
        })?;

        let cache = Self {
            dir,
            entries: DashMap::new(),
            current_size: AtomicUsize::new(0),
            max_size_bytes,
            tick: AtomicU64::new(0),
        };
        cache.load(OffsetDateTime::now_utc())?;
        Ok(cache)
    }

    fn load(&self, now: OffsetDateTime) -> Result<(), NetError> {
        let listing = fs::read_dir(&self.dir).map_err(|_| NetError::CacheReadFailure)?;

        let mut loaded = Vec::new();
        for dirent in listing.flatten() {
            let path = dirent.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some(ENTRY_EXTENSION) => {}
                Some(TEMP_EXTENSION) => {
                    tracing::trace!(file = %path.display(), "removing stale temp file");
                    let _ = fs::remove_file(&path);
                    continue;
                }
                _ => continue,
            }

            match read_entry(&path) {
                Some((key, entry)) if entry.is_fresh_at(now) => loaded.push((key, entry)),
                _ => {
                    let _ = fs::remove_file(&path);
                }
            }
        }

        // Older writes count as less recently used.
        loaded.sort_by_key(|(_, entry)| entry.stored_at);
        for (key, mut entry) in loaded {
            entry.last_used = self.tick.fetch_add(1, Ordering::Relaxed);
            self.maybe_evict(entry.size);
            self.insert_entry(key, entry);
        }

        tracing::debug!(
            dir = %self.dir.display(),
            entries = self.entries.len(),
            bytes = self.size_bytes(),
            "cache loaded"
        );
        Ok(())
    }

    /// Maximum bytes the entry files may occupy.
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Look up a cached response.
    ///
    /// Returns the cached entry if found and still fresh.
    pub fn get(&self, url: &Url, method: &str) -> Option<CacheEntry> {
        self.get_at(url, method, OffsetDateTime::now_utc())
    }

    pub(crate) fn get_at(&self, url: &Url, method: &str, now: OffsetDateTime) -> Option<CacheEntry> {
        if !is_cacheable_method(method) {
            return None;
        }

        let key = CacheKey::new(url, method);
        let mut entry = self.entries.get_mut(&key)?;

        if entry.is_fresh_at(now) {
            entry.last_used = self.tick.fetch_add(1, Ordering::Relaxed);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Store a response in the cache.
    ///
    /// Returns `Ok(false)` when the response is not cacheable or does not
    /// fit in the budget at all.
    pub fn store(
        &self,
        url: &Url,
        method: &str,
        status: StatusCode,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<bool, NetError> {
        self.store_at(url, method, status, headers, body, OffsetDateTime::now_utc())
    }

    pub(crate) fn store_at(
        &self,
        url: &Url,
        method: &str,
        status: StatusCode,
        headers: &HeaderMap,
        body: Bytes,
        now: OffsetDateTime,
    ) -> Result<bool, NetError> {
        if !is_cacheable_method(method) || !status.is_success() {
            return Ok(false);
        }

        let cache_control = parse_cache_control(headers);
        if cache_control.no_store {
            return Ok(false);
        }
        let Some(max_age) = cache_control.max_age.filter(|age| *age > 0) else {
            return Ok(false);
        };

        let key = CacheKey::new(url, method);
        let stored = StoredEntry {
            url: key.url.clone(),
            method: key.method.clone(),
            status: status.as_u16(),
            headers: headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect(),
            body: BASE64.encode(&body),
            stored_at: now,
            max_age,
        };
        let encoded = serde_json::to_vec(&stored).map_err(|_| NetError::CacheWriteFailure)?;
        let size = encoded.len();
        if size > self.max_size_bytes {
            tracing::debug!(url = %key.url, size, "response larger than cache budget");
            return Ok(false);
        }

        // Replace any previous version of this entry.
        self.remove_by_key(&key);
        self.maybe_evict(size);

        let file = self
            .dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.file_stem()));
        write_atomically(&file, &encoded)?;

        let entry = CacheEntry {
            status,
            headers: headers.clone(),
            body,
            stored_at: now,
            ttl: Duration::from_secs(max_age),
            file,
            size,
            last_used: self.tick.fetch_add(1, Ordering::Relaxed),
        };
        self.insert_entry(key, entry);
        Ok(true)
    }

    /// Remove an entry from the cache.
    pub fn remove(&self, url: &Url, method: &str) {
        self.remove_by_key(&CacheKey::new(url, method));
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        let keys: Vec<CacheKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.remove_by_key(&key);
        }
    }

    /// Get the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get current cache size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.current_size.load(Ordering::Relaxed)
    }

    fn insert_entry(&self, key: CacheKey, entry: CacheEntry) {
        let file = entry.file.clone();
        self.current_size.fetch_add(entry.size, Ordering::Relaxed);
        if let Some(old) = self.entries.insert(key, entry) {
            self.current_size.fetch_sub(old.size, Ordering::Relaxed);
            // Same key usually means same file, which now holds the new entry.
            if old.file != file {
                let _ = fs::remove_file(&old.file);
            }
        }
    }

    /// Evict entries until `new_entry_size` more bytes fit.
    fn maybe_evict(&self, new_entry_size: usize) {
        while self.current_size.load(Ordering::Relaxed) + new_entry_size > self.max_size_bytes
            && !self.entries.is_empty()
        {
            self.evict_one();
        }
    }

    /// Evict the least recently used entry.
    fn evict_one(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_used)
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            tracing::trace!(url = %key.url, "evicting cache entry");
            self.remove_by_key(&key);
        }
    }

    fn remove_by_key(&self, key: &CacheKey) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.current_size.fetch_sub(entry.size, Ordering::Relaxed);
            if let Err(e) = fs::remove_file(&entry.file) {
                tracing::debug!(file = %entry.file.display(), error = %e, "cannot remove cache file");
            }
        }
    }
}

fn is_cacheable_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}

fn read_entry(path: &Path) -> Option<(CacheKey, CacheEntry)> {
    let raw = fs::read(path).ok()?;
    let stored: StoredEntry = serde_json::from_slice(&raw).ok()?;

    let mut headers = HeaderMap::new();
    for (name, value) in &stored.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
        let value = HeaderValue::from_str(value).ok()?;
        headers.append(name, value);
    }

    let entry = CacheEntry {
        status: StatusCode::from_u16(stored.status).ok()?,
        headers,
        body: Bytes::from(BASE64.decode(stored.body.as_bytes()).ok()?),
        stored_at: stored.stored_at,
        ttl: Duration::from_secs(stored.max_age),
        file: path.to_path_buf(),
        size: raw.len(),
        last_used: 0,
    };
    let key = CacheKey {
        url: stored.url,
        method: stored.method,
    };
    Some((key, entry))
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), NetError> {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("{}-{seq}.{TEMP_EXTENSION}", std::process::id()));
    fs::write(&tmp, contents)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|e| {
            let _ = fs::remove_file(&tmp);
            tracing::debug!(file = %path.display(), error = %e, "cache write failed");
            NetError::CacheWriteFailure
        })
}

/// Parsed Cache-Control directive.
#[derive(Debug, Default)]
struct CacheControl {
    no_store: bool,
    max_age: Option<u64>,
}

/// Parse Cache-Control header.
fn parse_cache_control(headers: &HeaderMap) -> CacheControl {
    let mut cc = CacheControl::default();

    for value in headers.get_all(http::header::CACHE_CONTROL) {
        let Ok(value) = value.to_str() else { continue };

        for directive in value.split(',') {
            let directive = directive.trim().to_lowercase();

            if directive == "no-store" {
                cc.no_store = true;
            } else if let Some(age_str) = directive.strip_prefix("max-age=") {
                if let Ok(age) = age_str.parse::<u64>() {
                    cc.max_age = Some(age);
                }
            }
        }
    }

    cc
}
