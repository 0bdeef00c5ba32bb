//! Include-graph walk and consolidation into a single script.
//!
//! The graph may contain cycles, so it is never materialized as owning
//! parent-to-child links. The walk is a sequential depth-first traversal
//! carrying a [`ResolutionContext`]: a visited set keyed by canonical URI
//! absorbs duplicate includes and cycles, and accumulators collect the
//! merged metadata. Ordering is part of the observable contract: body
//! lines are spliced in at the position their include directive occupied,
//! and imports keep first-seen order across the whole graph.

use std::collections::HashSet;

use log::debug;

use crate::error::Result;
use crate::model::{
    BodyItem, CompilerOpt, Dependency, Include, ImportName, PackageName, Repository, RuntimeOpt,
    Script, ScriptKind, Section, SourceKind,
};
use crate::uri;

use super::SectionResolver;

/// Per-`resolve`-call walk state. Created when a resolve call starts,
/// discarded when it returns; never shared across calls.
#[derive(Default)]
struct ResolutionContext {
    visited: HashSet<String>,
    imports: Vec<ImportName>,
    seen_imports: HashSet<ImportName>,
    includes: HashSet<Include>,
    dependencies: HashSet<Dependency>,
    repositories: HashSet<Repository>,
    compiler_opts: HashSet<CompilerOpt>,
    runtime_opts: HashSet<RuntimeOpt>,
}

/// Consolidates an entry point and everything it transitively includes
/// into one [`Script`].
pub struct ScriptResolver {
    sections: SectionResolver,
}

impl ScriptResolver {
    pub fn new(sections: SectionResolver) -> Self {
        Self { sections }
    }

    /// Resolve an entry point given as a local path, a remote URI, or
    /// literal script text (detected in that order).
    pub fn resolve(&self, input: &str) -> Result<Script> {
        match uri::entry_url(input)? {
            Some(url) => {
                let root = self.sections.resolve_section(&url)?;
                self.consolidate(root)
            }
            None => self.resolve_text(input, SourceKind::Inline),
        }
    }

    /// Resolve script text read from standard input.
    pub fn resolve_stdin(&self, text: &str) -> Result<Script> {
        self.resolve_text(text, SourceKind::Stdin)
    }

    fn resolve_text(&self, text: &str, source_kind: SourceKind) -> Result<Script> {
        // Includes inside URI-less text resolve against the working
        // directory, under a pseudo-name for error attribution.
        let context = uri::from_dir_path(&std::env::current_dir()?)?;
        let name = match source_kind {
            SourceKind::Stdin => "stdin.kts",
            _ => "inline.kts",
        };
        let pseudo = uri::resolve_include(&context, name)?;
        let root = self.sections.section_from_text(
            text,
            &pseudo,
            &context,
            source_kind,
            ScriptKind::Kts,
        )?;
        self.consolidate(root)
    }

    fn consolidate(&self, root: Section) -> Result<Script> {
        let mut ctx = ResolutionContext::default();
        ctx.visited.insert(uri::canonical_key(&root.uri));

        let body = self.walk(&root, &mut ctx)?;
        debug!(
            "consolidated {}: {} imports, {} dependencies, {} includes",
            root.uri,
            ctx.imports.len(),
            ctx.dependencies.len(),
            ctx.includes.len()
        );
        let resolved_code = assemble(root.package_name.as_ref(), &ctx.imports, &body);

        Ok(Script {
            source_kind: root.source_kind,
            script_kind: root.script_kind,
            uri: root.uri,
            context_uri: root.context_uri,
            name: root.name,
            // Script-level scalars come strictly from the entry section.
            package_name: root.package_name,
            entry_point: root.entry_point,
            imports: ctx.imports,
            includes: ctx.includes,
            dependencies: ctx.dependencies,
            repositories: ctx.repositories,
            compiler_opts: ctx.compiler_opts,
            runtime_opts: ctx.runtime_opts,
            resolved_code,
        })
    }

    /// Depth-first walk: merge this section's declarations, then splice
    /// each include's resolved body in at the position its directive
    /// occupied. A URI already in the visited set is a no-op; that one
    /// check is both the duplicate-include guard and the cycle guard.
    fn walk(&self, section: &Section, ctx: &mut ResolutionContext) -> Result<Vec<String>> {
        for import in &section.imports {
            if ctx.seen_imports.insert(import.clone()) {
                ctx.imports.push(import.clone());
            }
        }
        ctx.dependencies.extend(section.dependencies.iter().cloned());
        ctx.repositories.extend(section.repositories.iter().cloned());
        ctx.compiler_opts.extend(section.compiler_opts.iter().cloned());
        ctx.runtime_opts.extend(section.runtime_opts.iter().cloned());

        let mut lines = Vec::new();
        for item in &section.body {
            match item {
                BodyItem::Code(line) => lines.push(line.clone()),
                BodyItem::Include(include) => {
                    ctx.includes.insert(include.clone());
                    let child_url = uri::resolve_include(&section.context_uri, &include.0)?;
                    if !ctx.visited.insert(uri::canonical_key(&child_url)) {
                        debug!("skipping already-included {}", child_url);
                        continue;
                    }
                    let child = self.sections.resolve_section(&child_url)?;
                    lines.extend(self.walk(&child, ctx)?);
                }
            }
        }
        Ok(lines)
    }
}

/// Assemble the consolidated source: the entry's package declaration,
/// the merged imports in first-seen order, then the spliced body.
/// Output is always newline-terminated.
fn assemble(package: Option<&PackageName>, imports: &[ImportName], body: &[String]) -> String {
    let mut out = String::new();
    if let Some(package) = package {
        out.push_str("package ");
        out.push_str(&package.0);
        out.push_str("\n\n");
    }
    for import in imports {
        out.push_str("import ");
        out.push_str(&import.0);
        out.push('\n');
    }
    if !imports.is_empty() {
        out.push('\n');
    }
    for line in body {
        out.push_str(line);
        out.push('\n');
    }
    out
}
