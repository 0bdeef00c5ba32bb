//! # Resolution Data Model
//!
//! Value types shared by the parser and the resolvers.
//!
//! The declaration tokens ([`Include`], [`Dependency`], [`ImportName`],
//! [`Repository`], [`CompilerOpt`], [`RuntimeOpt`]) are thin newtypes over
//! strings with value equality. A dependency coordinate is an opaque token
//! here, never a semantically compared version.
//!
//! [`Section`] is the parse result of exactly one source file;
//! [`Script`] is the fully consolidated artifact in which every
//! collection field has been merged across the whole transitive include
//! graph.

use std::collections::HashSet;

use url::Url;

/// Where the entry source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A local file on disk.
    File,
    /// A remote locator (anything with a non-`file` scheme).
    Remote,
    /// Literal script text handed to the resolver with no URI of its own.
    Inline,
    /// Script text read from standard input.
    Stdin,
}

/// The script flavor, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// A plain `.kt` source file.
    Kt,
    /// A `.kts` script. Unrecognized extensions fall back to this kind.
    Kts,
}

impl ScriptKind {
    /// Classify by file extension, defaulting to `Kts`.
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some("kt") => ScriptKind::Kt,
            _ => ScriptKind::Kts,
        }
    }

    /// The canonical extension for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            ScriptKind::Kt => "kt",
            ScriptKind::Kts => "kts",
        }
    }
}

/// A raw include reference exactly as declared in the source.
///
/// Normalization into a resolvable URI happens at resolution time; two
/// `Include`s compare equal only when their declared spellings match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Include(pub String);

/// A dependency coordinate (`group:artifact:version`, optionally with a
/// fourth classifier part). Opaque value-equality token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency(pub String);

/// A fully qualified import path. Equality is exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportName(pub String);

/// A raw compiler option string, passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompilerOpt(pub String);

/// A raw runtime option string, passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeOpt(pub String);

/// A declared package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(pub String);

/// A declared entry-point class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoint(pub String);

/// An artifact repository declaration with optional credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Repository {
    pub fn new(url: impl Into<String>) -> Self {
        Repository {
            url: url.into(),
            user: None,
            password: None,
        }
    }
}

/// One line-position of a section body.
///
/// `Code` lines are preserved byte-for-byte (blank lines included) so that
/// consolidated line numbers stay predictable for downstream compiler
/// diagnostics. An `Include` marks the position where the target's
/// resolved body is spliced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Code(String),
    Include(Include),
}

/// The parse result of a single source file, before graph-wide merging.
///
/// Collection fields keep declaration order; deduplication across the
/// include graph is the resolver's job.
#[derive(Debug, Clone)]
pub struct Section {
    pub source_kind: SourceKind,
    pub script_kind: ScriptKind,
    /// The resolved URI of this source.
    pub uri: Url,
    /// The base URI against which relative includes in this source resolve.
    pub context_uri: Url,
    /// Display name (file name for file/remote sources).
    pub name: String,
    pub package_name: Option<PackageName>,
    pub entry_point: Option<EntryPoint>,
    pub imports: Vec<ImportName>,
    pub includes: Vec<Include>,
    pub dependencies: Vec<Dependency>,
    pub repositories: Vec<Repository>,
    pub compiler_opts: Vec<CompilerOpt>,
    pub runtime_opts: Vec<RuntimeOpt>,
    pub body: Vec<BodyItem>,
}

/// The fully consolidated artifact for one entry point.
///
/// Invariant: every collection field reflects the entire transitive
/// include graph, not just the entry file. `package_name` and
/// `entry_point` come strictly from the entry section.
#[derive(Debug, Clone)]
pub struct Script {
    pub source_kind: SourceKind,
    pub script_kind: ScriptKind,
    pub uri: Url,
    pub context_uri: Url,
    pub name: String,
    pub package_name: Option<PackageName>,
    pub entry_point: Option<EntryPoint>,
    /// Merged import names, first-occurrence order, duplicates removed.
    pub imports: Vec<ImportName>,
    /// Raw declared include strings from all visited sections.
    pub includes: HashSet<Include>,
    pub dependencies: HashSet<Dependency>,
    pub repositories: HashSet<Repository>,
    pub compiler_opts: HashSet<CompilerOpt>,
    pub runtime_opts: HashSet<RuntimeOpt>,
    /// The final consolidated source text.
    pub resolved_code: String,
}
