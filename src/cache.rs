//! # Persistent URI Content Cache
//!
//! [`ContentCache`] maps a URI to its raw text content, fetching each
//! unique canonical URI at most once per cache lifetime.
//!
//! ## Design
//!
//! Three layers sit in front of the network:
//!
//! - an in-memory memo, so one process never re-reads the disk store for
//!   a URI it already served;
//! - a persistent on-disk store (one content file per canonical URI plus
//!   an `index.json` mapping canonical URI to file name), surviving
//!   across processes;
//! - a per-key single-flight lock, so concurrent fetches of one canonical
//!   URI perform exactly one underlying retrieval whose result all
//!   callers share.
//!
//! Local `file:` URIs are read directly and never stored; the
//! filesystem already is their store.
//!
//! Remote transport is hidden behind the [`RemoteFetch`] trait so tests
//! can inject mocks; the default implementation shells out to the system
//! `curl`, which brings redirect handling and proxy configuration along
//! without any transport code here. Content and index files are written
//! to a temporary sibling and renamed into place, so a failed or
//! cancelled fetch never publishes a torn entry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::uri;

/// Trait for remote content retrieval - allows mocking in tests
pub trait RemoteFetch: Send + Sync {
    /// Retrieve the text content behind `url`, within `timeout`.
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<String>;
}

/// The default implementation of [`RemoteFetch`], which uses the system's
/// `curl` command.
///
/// Using the system binary means proxy settings, CA bundles and netrc
/// credentials configured on the host all apply without any transport
/// logic in this crate.
pub struct CurlFetch;

impl RemoteFetch for CurlFetch {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<String> {
        let output = Command::new("curl")
            .args(["--silent", "--show-error", "--fail", "--location", "--max-time"])
            .arg(timeout.as_secs().max(1).to_string())
            .arg(url.as_str())
            .output()
            .map_err(|e| Error::Fetch {
                uri: url.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Fetch {
                uri: url.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| Error::Fetch {
            uri: url.to_string(),
            message: "response is not valid UTF-8".to_string(),
        })
    }
}

/// On-disk index of the store: canonical URI -> content file name.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: HashMap<String, String>,
}

const INDEX_FILE: &str = "index.json";

/// Persistent, single-flighted URI content cache.
///
/// Shared by reference (`Arc`) between all components that fetch
/// content; its lifecycle is owned by the caller that opened it.
pub struct ContentCache {
    dir: PathBuf,
    fetch_timeout: Duration,
    fetcher: Box<dyn RemoteFetch>,
    memory: Mutex<HashMap<String, String>>,
    index: Mutex<CacheIndex>,
    // Per-key flight locks; entries live for the cache lifetime.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContentCache {
    /// Open (creating if needed) the store under `config.cache_dir` with
    /// the default `curl` transport.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_fetcher(config, Box::new(CurlFetch))
    }

    /// Open the store with a custom transport implementation.
    pub fn with_fetcher(config: &Config, fetcher: Box<dyn RemoteFetch>) -> Result<Self> {
        let dir = config.cache_dir.clone();
        fs::create_dir_all(&dir).map_err(|e| Error::Cache {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        let index = Self::load_index(&dir)?;
        Ok(Self {
            dir,
            fetch_timeout: config.fetch_timeout,
            fetcher,
            memory: Mutex::new(HashMap::new()),
            index: Mutex::new(index),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch the text content of `url`.
    ///
    /// Local `file:` URLs are read straight from disk. Anything else is
    /// served from memory, then from the persistent store, and only on a
    /// true miss from the remote source, at most once per canonical URI
    /// per cache lifetime.
    pub fn fetch(&self, url: &Url) -> Result<String> {
        if !uri::is_remote(url) {
            return self.read_local(url);
        }

        let key = uri::canonical_key(url);

        if let Some(text) = self.memory_get(&key)? {
            debug!("memory hit for {}", key);
            return Ok(text);
        }

        // Single-flight: all concurrent fetches of one key serialize here,
        // and late arrivals find the memo populated.
        let flight = self.flight_lock(&key)?;
        let _flight = flight.lock().map_err(|_| Error::LockPoisoned {
            context: format!("in-flight fetch of {}", key),
        })?;

        if let Some(text) = self.memory_get(&key)? {
            return Ok(text);
        }

        if let Some(text) = self.store_get(&key)? {
            debug!("store hit for {}", key);
            self.memory_put(&key, &text)?;
            return Ok(text);
        }

        debug!("fetching {}", key);
        let text = self.fetcher.fetch(url, self.fetch_timeout)?;
        self.store_put(&key, &text)?;
        self.memory_put(&key, &text)?;
        Ok(text)
    }

    /// All canonical URIs currently present in the persistent store.
    pub fn cached_uris(&self) -> Result<Vec<String>> {
        let index = self.index.lock().map_err(|_| Error::LockPoisoned {
            context: "cache index".to_string(),
        })?;
        let mut uris: Vec<String> = index.entries.keys().cloned().collect();
        uris.sort();
        Ok(uris)
    }

    /// Wipe the persistent store and all in-process state.
    pub fn clear(&self) -> Result<()> {
        let mut index = self.index.lock().map_err(|_| Error::LockPoisoned {
            context: "cache index".to_string(),
        })?;
        for name in index.entries.values() {
            let path = self.dir.join(name);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| Error::Cache {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }
        index.entries.clear();
        Self::persist_index(&self.dir, &index)?;
        drop(index);

        let mut memory = self.memory.lock().map_err(|_| Error::LockPoisoned {
            context: "cache memory".to_string(),
        })?;
        memory.clear();
        Ok(())
    }

    fn read_local(&self, url: &Url) -> Result<String> {
        let path = url.to_file_path().map_err(|_| Error::Fetch {
            uri: url.to_string(),
            message: "not a local filesystem path".to_string(),
        })?;
        fs::read_to_string(&path).map_err(|e| Error::Fetch {
            uri: url.to_string(),
            message: e.to_string(),
        })
    }

    fn memory_get(&self, key: &str) -> Result<Option<String>> {
        let memory = self.memory.lock().map_err(|_| Error::LockPoisoned {
            context: "cache memory".to_string(),
        })?;
        Ok(memory.get(key).cloned())
    }

    fn memory_put(&self, key: &str, text: &str) -> Result<()> {
        let mut memory = self.memory.lock().map_err(|_| Error::LockPoisoned {
            context: "cache memory".to_string(),
        })?;
        memory.insert(key.to_string(), text.to_string());
        Ok(())
    }

    fn flight_lock(&self, key: &str) -> Result<Arc<Mutex<()>>> {
        let mut in_flight = self.in_flight.lock().map_err(|_| Error::LockPoisoned {
            context: "in-flight table".to_string(),
        })?;
        Ok(in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn store_get(&self, key: &str) -> Result<Option<String>> {
        let index = self.index.lock().map_err(|_| Error::LockPoisoned {
            context: "cache index".to_string(),
        })?;
        let Some(name) = index.entries.get(key) else {
            return Ok(None);
        };
        let path = self.dir.join(name);
        if !path.exists() {
            // The store was pruned externally; treat as a miss.
            warn!("cache index names missing file {} for {}", name, key);
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| Error::Cache {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(text))
    }

    fn store_put(&self, key: &str, text: &str) -> Result<()> {
        let mut index = self.index.lock().map_err(|_| Error::LockPoisoned {
            context: "cache index".to_string(),
        })?;
        let name = Self::content_file_name(&index, key);
        let path = self.dir.join(&name);
        Self::write_atomic(&path, text)?;
        index.entries.insert(key.to_string(), name);
        Self::persist_index(&self.dir, &index)
    }

    /// Pick a content file name for `key`, disambiguating when the lossy
    /// filesystem encoding collides with an existing entry.
    fn content_file_name(index: &CacheIndex, key: &str) -> String {
        let base = uri::encode_cache_key(key);
        let mut name = base.clone();
        let mut n = 1;
        while index.entries.values().any(|existing| existing == &name) {
            n += 1;
            name = format!("{}-{}", base, n);
        }
        name
    }

    fn load_index(dir: &Path) -> Result<CacheIndex> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(CacheIndex::default());
        }
        let raw = fs::read_to_string(&path).map_err(|e| Error::Cache {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Cache {
            path: path.display().to_string(),
            message: format!("corrupt index: {}", e),
        })
    }

    fn persist_index(dir: &Path, index: &CacheIndex) -> Result<()> {
        let path = dir.join(INDEX_FILE);
        let raw = serde_json::to_string_pretty(index).map_err(|e| Error::Cache {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::write_atomic(&path, &raw)
    }

    /// Write to a temporary sibling and rename into place, so readers
    /// never observe a partially written entry.
    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "entry".to_string());
        let tmp = path.with_file_name(format!("{}.tmp", file_name));
        fs::write(&tmp, contents).map_err(|e| Error::Cache {
            path: tmp.display().to_string(),
            message: e.to_string(),
        })?;
        fs::rename(&tmp, path).map_err(|e| Error::Cache {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
