//! Resolution configuration.
//!
//! A small value object handed explicitly to the components that need it.
//! There is no file-based configuration loading here; the surrounding tool
//! owns that and passes the result in.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for one resolver instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory backing the persistent URI content cache.
    pub cache_dir: PathBuf,
    /// Upper bound for a single remote fetch.
    pub fetch_timeout: Duration,
}

impl Config {
    /// Create a configuration with an explicit cache directory.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            fetch_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration rooted in the platform cache directory.
    ///
    /// Falls back to `.scriptweave-cache` under the current directory when
    /// the platform reports no cache location (e.g. stripped-down CI
    /// containers).
    pub fn with_default_dirs() -> Self {
        let cache_dir = dirs::cache_dir()
            .map(|dir| dir.join("scriptweave").join("uri-cache"))
            .unwrap_or_else(|| PathBuf::from(".scriptweave-cache"));
        Self::new(cache_dir)
    }

    /// Override the remote fetch timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
