//! # Scriptweave
//!
//! The resolution core of a script-preprocessing tool: given an entry
//! script, produce a single self-contained compilation unit by
//! recursively discovering, fetching, parsing, deduplicating and
//! textually consolidating everything the entry point transitively
//! declares: includes, imports, dependency coordinates, repositories
//! and compiler/runtime options.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use scriptweave::cache::ContentCache;
//! use scriptweave::config::Config;
//! use scriptweave::parser::Parser;
//! use scriptweave::resolver::{ScriptResolver, SectionResolver};
//!
//! let config = Config::new(std::env::temp_dir().join("scriptweave-doc"));
//! let cache = Arc::new(ContentCache::open(&config).unwrap());
//! let resolver = ScriptResolver::new(SectionResolver::new(Parser::new(), cache));
//!
//! // Literal text is a valid entry point; paths and URLs work the same way.
//! let script = resolver
//!     .resolve("import java.time.LocalDate\nprintln(LocalDate.now())\n")
//!     .unwrap();
//! assert_eq!(script.imports.len(), 1);
//! assert!(script.resolved_code.starts_with("import java.time.LocalDate\n"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Content Cache (`cache`)**: fetches the raw text behind a URI at
//!   most once per canonical URI, persists it on disk, and single-flights
//!   concurrent fetches of the same key.
//! - **Annotation Parser (`parser`)**: extracts the line-oriented
//!   declaration grammar (includes, imports, dependency coordinates,
//!   repositories, options, package, entry point) from free-form script
//!   text, passing everything else through verbatim.
//! - **Section Resolver (`resolver::SectionResolver`)**: turns one URI
//!   into one parsed [`model::Section`], classified by source and script
//!   kind and tagged with its context URI.
//! - **Script Resolver (`resolver::ScriptResolver`)**: walks the include
//!   graph depth-first with a visited-set guard, merges every section's
//!   declarations, splices bodies at their include positions and returns
//!   the consolidated [`model::Script`].
//!
//! Compilation, CLI handling, and dependency-coordinate-to-artifact
//! resolution are the surrounding tool's business; this crate only
//! resolves and consolidates.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod uri;

#[cfg(test)]
mod uri_proptest;
