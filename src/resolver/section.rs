//! Resolution of a single URI into a parsed section.

use std::sync::Arc;

use log::debug;
use url::Url;

use crate::cache::ContentCache;
use crate::error::Result;
use crate::model::{ScriptKind, Section, SourceKind};
use crate::parser::Parser;
use crate::uri;

/// Resolves one URI into one [`Section`]: classify the source, derive
/// its context, fetch its content through the cache, parse it.
///
/// A pure function of the URI given cache state. No recursion happens
/// here; walking discovered includes is the script resolver's job.
pub struct SectionResolver {
    parser: Parser,
    cache: Arc<ContentCache>,
}

impl SectionResolver {
    pub fn new(parser: Parser, cache: Arc<ContentCache>) -> Self {
        Self { parser, cache }
    }

    pub fn resolve_section(&self, url: &Url) -> Result<Section> {
        let source_kind = if uri::is_remote(url) {
            SourceKind::Remote
        } else {
            SourceKind::File
        };
        let script_kind = ScriptKind::from_extension(uri::extension(url).as_deref());
        let context_uri = uri::context_of(url)?;
        let text = self.cache.fetch(url)?;
        debug!("resolved section {} ({} bytes)", url, text.len());
        self.section_from_text(&text, url, &context_uri, source_kind, script_kind)
    }

    /// Build a section from text that did not come through a fetch
    /// (inline and stdin entry points).
    pub(crate) fn section_from_text(
        &self,
        text: &str,
        url: &Url,
        context: &Url,
        source_kind: SourceKind,
        script_kind: ScriptKind,
    ) -> Result<Section> {
        let parsed = self.parser.parse(text, url)?;
        Ok(Section {
            source_kind,
            script_kind,
            uri: url.clone(),
            context_uri: context.clone(),
            name: uri::file_name(url),
            package_name: parsed.package_name,
            entry_point: parsed.entry_point,
            imports: parsed.imports,
            includes: parsed.includes,
            dependencies: parsed.dependencies,
            repositories: parsed.repositories,
            compiler_opts: parsed.compiler_opts,
            runtime_opts: parsed.runtime_opts,
            body: parsed.body,
        })
    }
}
