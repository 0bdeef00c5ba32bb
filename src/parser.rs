//! # Annotation Parser
//!
//! Extracts structured declarations from otherwise free-form script text.
//!
//! The grammar is line-oriented: every physical line is classified on its
//! own into exactly one [`Directive`] variant, recognized lines are
//! removed from the body, and everything else (code, comments, blank
//! lines) passes through verbatim and in original order. Blank and
//! whitespace-only lines are preserved byte-for-byte so consolidated line
//! numbers stay predictable for downstream compiler diagnostics.
//!
//! Recognized forms:
//!
//! - `package a.b.c`
//! - `import a.b.c` (comma-separated multi-target lists are split)
//! - `@file:Include("p1", "p2")` / `//INCLUDE p`
//! - `@file:DependsOn("g:a:v", …)` / `//DEPS g:a:v,g2:a2:v2`
//! - `@file:Repository("url", user="u", password="p")`
//! - `@file:CompilerOpts("-x", …)` / `//COMPILER_OPTS -x -y`
//! - `@file:KotlinOpts("-j", …)` / `//KOTLIN_OPTS -j`
//! - `@file:EntryPoint("pkg.Cls")` / `//ENTRY pkg.Cls`
//! - a shebang line at the very top, which is elided
//!
//! Unknown `@file:` annotations (e.g. `@file:Suppress`) are not ours and
//! pass through untouched. Malformed recognized declarations fail with
//! [`Error::Parse`] naming the source URI and the offending line; nothing
//! is silently dropped.

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::model::{
    BodyItem, CompilerOpt, Dependency, EntryPoint, Include, ImportName, PackageName, Repository,
    RuntimeOpt,
};

/// Classification of a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Package(String),
    Imports(Vec<String>),
    Includes(Vec<String>),
    Dependencies(Vec<String>),
    Repository(Repository),
    CompilerOpts(Vec<String>),
    RuntimeOpts(Vec<String>),
    EntryPoint(String),
    Shebang,
    /// Anything the grammar does not claim; passes through verbatim.
    Code,
}

/// The structured outcome of parsing one source, before the resolver
/// tags it with location and kind.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
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

/// Line-oriented annotation parser with compiled-once patterns.
pub struct Parser {
    annotation: Regex,
    comment_directive: Regex,
    package_decl: Regex,
    annotation_arg: Regex,
    coordinate: Regex,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            annotation: Regex::new(r"^@file\s*:\s*(\w+)\s*\((.*)\)\s*$").unwrap(),
            // The marker must follow `//` directly; `// DEPS …` is prose.
            comment_directive: Regex::new(
                r"^//(DEPS|INCLUDE|ENTRY|COMPILER_OPTS|KOTLIN_OPTS)\s+(\S.*)$",
            )
            .unwrap(),
            package_decl: Regex::new(r"^package\s+([A-Za-z_][\w]*(?:\.[A-Za-z_][\w]*)*)\s*;?\s*$")
                .unwrap(),
            annotation_arg: Regex::new(
                r#"^\s*(?:([A-Za-z_][A-Za-z0-9_]*)\s*=\s*)?"([^"]*)"\s*(,)?"#,
            )
            .unwrap(),
            coordinate: Regex::new(r"^[^:\s]+:[^:\s]+:[^:\s]+(?::[^:\s]+)?$").unwrap(),
        }
    }

    /// Parse `text` into declarations plus residual body.
    ///
    /// `source_uri` is used only to attribute errors; include targets are
    /// kept raw and resolved against their context later.
    pub fn parse(&self, text: &str, source_uri: &Url) -> Result<ParsedSource> {
        let mut parsed = ParsedSource::default();

        for (number, line) in text.lines().enumerate() {
            match self.classify(line, number, source_uri)? {
                Directive::Package(name) => {
                    if parsed.package_name.is_none() {
                        parsed.package_name = Some(PackageName(name));
                    }
                }
                Directive::EntryPoint(class) => {
                    if parsed.entry_point.is_none() {
                        parsed.entry_point = Some(EntryPoint(class));
                    }
                }
                Directive::Imports(names) => {
                    parsed.imports.extend(names.into_iter().map(ImportName));
                }
                Directive::Includes(targets) => {
                    for target in targets {
                        let include = Include(target);
                        parsed.includes.push(include.clone());
                        parsed.body.push(BodyItem::Include(include));
                    }
                }
                Directive::Dependencies(coords) => {
                    parsed.dependencies.extend(coords.into_iter().map(Dependency));
                }
                Directive::Repository(repository) => {
                    parsed.repositories.push(repository);
                }
                Directive::CompilerOpts(opts) => {
                    parsed.compiler_opts.extend(opts.into_iter().map(CompilerOpt));
                }
                Directive::RuntimeOpts(opts) => {
                    parsed.runtime_opts.extend(opts.into_iter().map(RuntimeOpt));
                }
                Directive::Shebang => {}
                Directive::Code => {
                    parsed.body.push(BodyItem::Code(line.to_string()));
                }
            }
        }

        Ok(parsed)
    }

    fn classify(&self, line: &str, number: usize, uri: &Url) -> Result<Directive> {
        let trimmed = line.trim();

        if number == 0 && trimmed.starts_with("#!") {
            return Ok(Directive::Shebang);
        }

        if let Some(caps) = self.annotation.captures(trimmed) {
            let marker = caps.get(1).unwrap().as_str();
            let raw_args = caps.get(2).unwrap().as_str();
            return self.classify_annotation(marker, raw_args, line, uri);
        }

        if let Some(caps) = self.comment_directive.captures(trimmed) {
            let marker = caps.get(1).unwrap().as_str();
            let value = caps.get(2).unwrap().as_str().trim();
            return self.classify_comment_directive(marker, value, line, uri);
        }

        if trimmed.starts_with("package ") || trimmed == "package" {
            let caps = self.package_decl.captures(trimmed).ok_or_else(|| {
                parse_error(uri, line, "invalid package declaration")
            })?;
            return Ok(Directive::Package(caps.get(1).unwrap().as_str().to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("import ") {
            let rest = rest.trim().trim_end_matches(';').trim();
            let mut names = Vec::new();
            for target in rest.split(',') {
                let target = target.trim();
                if target.is_empty() {
                    return Err(parse_error(uri, line, "empty import target"));
                }
                names.push(target.to_string());
            }
            return Ok(Directive::Imports(names));
        }

        Ok(Directive::Code)
    }

    fn classify_annotation(
        &self,
        marker: &str,
        raw_args: &str,
        line: &str,
        uri: &Url,
    ) -> Result<Directive> {
        // Only our markers are claimed; other file-level annotations are
        // ordinary code.
        let recognized = matches!(
            marker,
            "Include" | "DependsOn" | "Repository" | "CompilerOpts" | "KotlinOpts" | "EntryPoint"
        );
        if !recognized {
            return Ok(Directive::Code);
        }

        let args = self
            .split_annotation_args(raw_args)
            .ok_or_else(|| parse_error(uri, line, "malformed annotation arguments"))?;

        match marker {
            "Include" => {
                let targets = positional(&args)
                    .ok_or_else(|| parse_error(uri, line, "Include takes only quoted targets"))?;
                if targets.is_empty() {
                    return Err(parse_error(uri, line, "Include expects at least one target"));
                }
                Ok(Directive::Includes(targets))
            }
            "DependsOn" => {
                let values = positional(&args).ok_or_else(|| {
                    parse_error(uri, line, "DependsOn takes only quoted coordinates")
                })?;
                if values.is_empty() {
                    return Err(parse_error(
                        uri,
                        line,
                        "DependsOn expects at least one coordinate",
                    ));
                }
                // Each argument may itself carry a comma-separated list.
                let mut coords = Vec::new();
                for value in values {
                    for coord in value.split(',') {
                        let coord = coord.trim();
                        self.validate_coordinate(coord, line, uri)?;
                        coords.push(coord.to_string());
                    }
                }
                Ok(Directive::Dependencies(coords))
            }
            "Repository" => {
                let mut url = None;
                let mut user = None;
                let mut password = None;
                for (name, value) in &args {
                    match name.as_deref() {
                        None if url.is_none() => url = Some(value.clone()),
                        None => {
                            return Err(parse_error(
                                uri,
                                line,
                                "Repository takes one positional url",
                            ))
                        }
                        Some("user") => user = Some(value.clone()),
                        Some("password") => password = Some(value.clone()),
                        Some(other) => {
                            return Err(parse_error(
                                uri,
                                line,
                                &format!("unknown Repository argument '{}'", other),
                            ))
                        }
                    }
                }
                let url =
                    url.ok_or_else(|| parse_error(uri, line, "Repository expects a url"))?;
                Ok(Directive::Repository(Repository { url, user, password }))
            }
            "CompilerOpts" => {
                let opts = positional(&args).ok_or_else(|| {
                    parse_error(uri, line, "CompilerOpts takes only quoted options")
                })?;
                if opts.is_empty() {
                    return Err(parse_error(
                        uri,
                        line,
                        "CompilerOpts expects at least one option",
                    ));
                }
                Ok(Directive::CompilerOpts(opts))
            }
            "KotlinOpts" => {
                let opts = positional(&args).ok_or_else(|| {
                    parse_error(uri, line, "KotlinOpts takes only quoted options")
                })?;
                if opts.is_empty() {
                    return Err(parse_error(
                        uri,
                        line,
                        "KotlinOpts expects at least one option",
                    ));
                }
                Ok(Directive::RuntimeOpts(opts))
            }
            "EntryPoint" => {
                let targets = positional(&args).ok_or_else(|| {
                    parse_error(uri, line, "EntryPoint takes one quoted class name")
                })?;
                if targets.len() != 1 {
                    return Err(parse_error(
                        uri,
                        line,
                        "EntryPoint expects exactly one class name",
                    ));
                }
                Ok(Directive::EntryPoint(targets.into_iter().next().unwrap()))
            }
            _ => unreachable!("marker recognition checked above"),
        }
    }

    fn classify_comment_directive(
        &self,
        marker: &str,
        value: &str,
        line: &str,
        uri: &Url,
    ) -> Result<Directive> {
        match marker {
            "INCLUDE" => Ok(Directive::Includes(vec![value.to_string()])),
            "ENTRY" => Ok(Directive::EntryPoint(value.to_string())),
            "DEPS" => {
                let mut coords = Vec::new();
                for coord in value.split(',') {
                    let coord = coord.trim();
                    self.validate_coordinate(coord, line, uri)?;
                    coords.push(coord.to_string());
                }
                Ok(Directive::Dependencies(coords))
            }
            "COMPILER_OPTS" => Ok(Directive::CompilerOpts(
                value.split_whitespace().map(str::to_string).collect(),
            )),
            "KOTLIN_OPTS" => Ok(Directive::RuntimeOpts(
                value.split_whitespace().map(str::to_string).collect(),
            )),
            _ => unreachable!("marker set fixed by the regex"),
        }
    }

    fn validate_coordinate(&self, coord: &str, line: &str, uri: &Url) -> Result<()> {
        if self.coordinate.is_match(coord) {
            Ok(())
        } else {
            Err(parse_error(
                uri,
                line,
                &format!("invalid dependency coordinate '{}'", coord),
            ))
        }
    }

    /// Split an annotation argument list into (name, value) pairs.
    ///
    /// Returns `None` when the list does not consist of quoted values
    /// (optionally `name="value"`) separated by commas.
    fn split_annotation_args(&self, raw: &str) -> Option<Vec<(Option<String>, String)>> {
        let mut args = Vec::new();
        let mut rest = raw.trim();
        if rest.is_empty() {
            return Some(args);
        }
        loop {
            let caps = self.annotation_arg.captures(rest)?;
            let name = caps.get(1).map(|m| m.as_str().to_string());
            let value = caps.get(2).unwrap().as_str().to_string();
            let had_comma = caps.get(3).is_some();
            args.push((name, value));

            rest = &rest[caps.get(0).unwrap().end()..];
            if had_comma {
                continue;
            }
            if rest.trim().is_empty() {
                return Some(args);
            }
            return None;
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of purely positional arguments; `None` when any arg is named.
fn positional(args: &[(Option<String>, String)]) -> Option<Vec<String>> {
    if args.iter().any(|(name, _)| name.is_some()) {
        return None;
    }
    Some(args.iter().map(|(_, value)| value.clone()).collect())
}

fn parse_error(uri: &Url, line: &str, message: &str) -> Error {
    Error::Parse {
        uri: uri.to_string(),
        line: line.to_string(),
        message: message.to_string(),
    }
}
