//! URI handling utilities: entry-point detection, canonicalization,
//! context derivation and cache-key encoding.
//!
//! All location identity in this crate flows through [`canonical_key`]:
//! the visited set of a resolution walk and the persistent content cache
//! both key on the canonical form, so `./x`, `x` and `a//b` spellings of
//! one location compare equal everywhere.

use std::path::Path;

use url::Url;

use crate::error::{Error, Result};

/// Turn a caller-supplied entry string into a URL, when it names one.
///
/// Returns `Ok(Some(url))` for a remote locator or an existing local file,
/// `Ok(None)` when the input should be treated as literal script text.
/// A malformed remote locator is an error, not inline text: silently
/// compiling a typo'd URL as code would be hostile.
pub fn entry_url(input: &str) -> Result<Option<Url>> {
    if input.contains('\n') {
        return Ok(None);
    }
    if input.contains("://") {
        let url = Url::parse(input).map_err(|e| Error::InvalidUri {
            uri: input.to_string(),
            message: e.to_string(),
        })?;
        return Ok(Some(canonicalize(&url)));
    }
    let path = Path::new(input);
    if path.is_file() {
        return from_file_path(path).map(Some);
    }
    Ok(None)
}

/// Convert a filesystem path into a canonical `file:` URL.
///
/// Relative paths are made absolute against the current working
/// directory; no symlink resolution is performed, so identity stays
/// deterministic across runs.
pub fn from_file_path(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let url = Url::from_file_path(&absolute).map_err(|_| Error::InvalidUri {
        uri: path.display().to_string(),
        message: "cannot be represented as a file URL".to_string(),
    })?;
    Ok(canonicalize(&url))
}

/// Convert a directory path into a canonical `file:` URL with a trailing
/// slash, suitable as a join base for relative references.
pub fn from_dir_path(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let url = Url::from_directory_path(&absolute).map_err(|_| Error::InvalidUri {
        uri: path.display().to_string(),
        message: "cannot be represented as a directory URL".to_string(),
    })?;
    Ok(canonicalize_dir(&url))
}

/// Canonicalize a directory URL, preserving its trailing slash.
fn canonicalize_dir(url: &Url) -> Url {
    let mut out = canonicalize(url);
    if !out.path().ends_with('/') {
        let path = format!("{}/", out.path());
        out.set_path(&path);
    }
    out
}

/// Whether a URL points outside the local filesystem.
pub fn is_remote(url: &Url) -> bool {
    url.scheme() != "file"
}

/// The base URL against which relative references inside `url` resolve:
/// its parent "directory".
pub fn context_of(url: &Url) -> Result<Url> {
    url.join(".").map_err(|e| Error::InvalidUri {
        uri: url.to_string(),
        message: format!("cannot derive context: {}", e),
    })
}

/// The display name of the resource: its last path segment.
pub fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or("script")
        .to_string()
}

/// The lowercase file extension of the resource, if any.
pub fn extension(url: &Url) -> Option<String> {
    let name = file_name(url);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolve a declared include reference against its section's context.
///
/// Absolute references (anything with a scheme) replace the context
/// entirely; everything else resolves relative to it.
pub fn resolve_include(context: &Url, reference: &str) -> Result<Url> {
    let joined = context.join(reference).map_err(|e| Error::InvalidUri {
        uri: reference.to_string(),
        message: e.to_string(),
    })?;
    Ok(canonicalize(&joined))
}

/// The one canonicalization function of this crate.
///
/// `Url` parsing already applies the standard remove-dot-segments
/// algorithm, so `.` and `..` segments only survive in hand-built URLs;
/// this pass drops empty and `.` segments, resolves remaining `..`
/// against their parent (a `..` at the root is dropped, per the same
/// algorithm), and strips fragments. Queries are kept: they are part of
/// a remote resource's identity. Idempotent.
pub fn canonicalize(url: &Url) -> Url {
    let mut out = url.clone();
    if let Some(segments) = url.path_segments() {
        let mut stack: Vec<&str> = Vec::new();
        for segment in segments {
            match segment {
                "" | "." => {}
                ".." => {
                    stack.pop();
                }
                other => stack.push(other),
            }
        }
        out.set_path(&format!("/{}", stack.join("/")));
    }
    out.set_fragment(None);
    out
}

/// The string form used as the visited-set and cache key.
pub fn canonical_key(url: &Url) -> String {
    canonicalize(url).to_string()
}

/// Encode a canonical URI into a filesystem-safe cache file name.
pub fn encode_cache_key(uri: &str) -> String {
    uri.chars()
        .map(|c| match c {
            '/' => '-',
            '\\' => '-',
            ':' => '_',
            '*' => '_',
            '?' => '_',
            '"' => '_',
            '<' => '_',
            '>' => '_',
            '|' => '_',
            // Keep alphanumeric, dots, dashes, underscores as-is
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            // Replace other characters with underscores
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_url_remote() {
        let url = entry_url("https://example.com/scripts/util.kts")
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/scripts/util.kts");
    }

    #[test]
    fn test_entry_url_existing_file() {
        let url = entry_url("Cargo.toml").unwrap().unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/Cargo.toml"));
    }

    #[test]
    fn test_entry_url_inline_text() {
        assert!(entry_url("println(\"hi\")\nprintln(\"there\")")
            .unwrap()
            .is_none());
        assert!(entry_url("no_such_file.kts").unwrap().is_none());
    }

    #[test]
    fn test_entry_url_malformed_remote_is_an_error() {
        let result = entry_url("http://[broken/script.kts");
        assert!(matches!(result, Err(Error::InvalidUri { .. })));
    }

    #[test]
    fn test_context_of() {
        let url = Url::parse("file:///work/scripts/template.kts").unwrap();
        assert_eq!(context_of(&url).unwrap().as_str(), "file:///work/scripts/");

        let root = Url::parse("file:///template.kts").unwrap();
        assert_eq!(context_of(&root).unwrap().as_str(), "file:///");
    }

    #[test]
    fn test_file_name_and_extension() {
        let url = Url::parse("https://example.com/a/b/util.test.KTS").unwrap();
        assert_eq!(file_name(&url), "util.test.KTS");
        assert_eq!(extension(&url).as_deref(), Some("kts"));

        let bare = Url::parse("https://example.com/scripts/README").unwrap();
        assert_eq!(extension(&bare), None);
    }

    #[test]
    fn test_resolve_include_relative_spellings_agree() {
        let context = Url::parse("file:///work/scripts/").unwrap();
        let plain = resolve_include(&context, "x.kts").unwrap();
        let dotted = resolve_include(&context, "./x.kts").unwrap();
        let doubled = resolve_include(&context, ".//x.kts").unwrap();
        assert_eq!(canonical_key(&plain), canonical_key(&dotted));
        assert_eq!(canonical_key(&plain), canonical_key(&doubled));
        assert_eq!(plain.as_str(), "file:///work/scripts/x.kts");
    }

    #[test]
    fn test_resolve_include_parent_and_subdir() {
        let context = Url::parse("file:///work/scripts/").unwrap();
        assert_eq!(
            resolve_include(&context, "../common.kts").unwrap().as_str(),
            "file:///work/common.kts"
        );
        assert_eq!(
            resolve_include(&context, "lib//helper.kts").unwrap().as_str(),
            "file:///work/scripts/lib/helper.kts"
        );
    }

    #[test]
    fn test_resolve_include_absolute_reference_replaces_context() {
        let context = Url::parse("file:///work/scripts/").unwrap();
        let resolved = resolve_include(&context, "https://example.com/shared.kts").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/shared.kts");
    }

    #[test]
    fn test_canonicalize_drops_fragment_keeps_query() {
        let url = Url::parse("https://example.com/a//b/./c.kts?rev=3#frag").unwrap();
        let canonical = canonicalize(&url);
        assert_eq!(canonical.as_str(), "https://example.com/a/b/c.kts?rev=3");
    }

    #[test]
    fn test_canonicalize_idempotent_on_plain_url() {
        let url = Url::parse("file:///work/scripts/x.kts").unwrap();
        assert_eq!(canonicalize(&url), url);
    }

    #[test]
    fn test_encode_cache_key() {
        assert_eq!(
            encode_cache_key("https://github.com/user/repo.kts"),
            "https_--github.com-user-repo.kts"
        );
        assert_eq!(
            encode_cache_key("file:///path/to/script.kts"),
            "file_---path-to-script.kts"
        );
    }
}
