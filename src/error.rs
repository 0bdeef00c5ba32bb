//! # Error Handling
//!
//! Centralized error type for the resolution core, built on `thiserror`.
//!
//! Every failure that can abort a `resolve` call is a variant of [`Error`],
//! and every variant that can occur while walking an include graph carries
//! the URI that was being processed at the time. A consolidated script may
//! span dozens of sources, so an error that cannot be located is useless.
//!
//! Cycles in the include graph are deliberately *not* represented here:
//! they are absorbed by the resolver's visited set and never surface as
//! errors.

use thiserror::Error;

/// Main error type for script resolution operations
#[derive(Error, Debug)]
pub enum Error {
    /// Content could not be obtained for a URI.
    ///
    /// Covers unreachable remotes, non-success HTTP statuses, missing
    /// local files and permission problems.
    #[error("Failed to fetch {uri}: {message}")]
    Fetch { uri: String, message: String },

    /// The persistent content store could not be read or written.
    ///
    /// This is a hard failure: falling back to re-fetching on every call
    /// would defeat the cache and hammer a possibly flaky remote.
    #[error("Cache storage error at {path}: {message}")]
    Cache { path: String, message: String },

    /// A declaration line did not match its expected micro-grammar.
    #[error("Parse error in {uri}: {message}\n  line: {line}")]
    Parse {
        uri: String,
        line: String,
        message: String,
    },

    /// An entry point or include reference could not be turned into a URI.
    #[error("Invalid URI reference {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
