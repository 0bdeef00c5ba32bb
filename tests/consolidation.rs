//! End-to-end resolution tests over real temp directories.
//!
//! The fixture mirrors the regression corpus of the surrounding tool:
//! three include files with overlapping imports and dependency
//! coordinates, reached from different entry points, must always merge to
//! the same sets, and a target included twice must contribute once.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scriptweave::cache::{ContentCache, RemoteFetch};
use scriptweave::config::Config;
use scriptweave::error::Result;
use scriptweave::model::{Dependency, Include, ScriptKind, SourceKind};
use scriptweave::parser::Parser;
use scriptweave::resolver::{ScriptResolver, SectionResolver};
use url::Url;

const FILE1: &str = "\
import java.io.BufferedReader
import java.io.File
//DEPS com.eclipsesource.minimal-json:minimal-json:0.9.4
fun file1() = \"one\"
";

const FILE2: &str = "\
import java.io.File
import java.io.InputStream
//DEPS log4j:log4j:1.2.14
fun file2() = \"two\"
";

const FILE3: &str = "\
import java.io.InputStream
import java.net.URL
//DEPS com.eclipsesource.minimal-json:minimal-json:0.9.4,log4j:log4j:1.2.14
fun file3() = \"three\"
";

const TEMPLATE: &str = "\
@file:Include(\"file1.kts\")
@file:Include(\"file2.kts\")
@file:Include(\"file3.kts\")

fun consolidated() = listOf(file1(), file2(), file3())
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn write_corpus(dir: &Path) {
    write(dir, "file1.kts", FILE1);
    write(dir, "file2.kts", FILE2);
    write(dir, "file3.kts", FILE3);
    write(dir, "template.kts", TEMPLATE);
}

fn resolver_over(cache_dir: &Path) -> ScriptResolver {
    let _ = env_logger::builder().is_test(true).try_init();
    let cache = Arc::new(ContentCache::open(&Config::new(cache_dir.to_path_buf())).unwrap());
    ScriptResolver::new(SectionResolver::new(Parser::new(), cache))
}

fn import_set(script: &scriptweave::model::Script) -> HashSet<String> {
    script.imports.iter().map(|i| i.0.clone()).collect()
}

#[test]
fn includes_consolidation() {
    let tmp = tempfile::tempdir().unwrap();
    write_corpus(tmp.path());

    let resolver = resolver_over(&tmp.path().join("cache"));
    let entry = tmp.path().join("template.kts");
    let script = resolver.resolve(entry.to_str().unwrap()).unwrap();

    assert_eq!(script.source_kind, SourceKind::File);
    assert_eq!(script.script_kind, ScriptKind::Kts);
    assert!(script.uri.as_str().ends_with("/template.kts"));
    assert!(script.context_uri.as_str().ends_with('/'));
    assert_eq!(script.name, "template.kts");
    assert_eq!(script.package_name, None);
    assert_eq!(script.entry_point, None);

    let imports: Vec<&str> = script.imports.iter().map(|i| i.0.as_str()).collect();
    assert_eq!(
        imports,
        vec![
            "java.io.BufferedReader",
            "java.io.File",
            "java.io.InputStream",
            "java.net.URL",
        ]
    );

    let includes: HashSet<Include> = ["file1.kts", "file2.kts", "file3.kts"]
        .iter()
        .map(|s| Include(s.to_string()))
        .collect();
    assert_eq!(script.includes, includes);

    let dependencies: HashSet<Dependency> = [
        "com.eclipsesource.minimal-json:minimal-json:0.9.4",
        "log4j:log4j:1.2.14",
    ]
    .iter()
    .map(|s| Dependency(s.to_string()))
    .collect();
    assert_eq!(script.dependencies, dependencies);

    assert!(script.repositories.is_empty());
    assert!(script.compiler_opts.is_empty());
    assert!(script.runtime_opts.is_empty());

    let expected = "\
import java.io.BufferedReader
import java.io.File
import java.io.InputStream
import java.net.URL

fun file1() = \"one\"
fun file2() = \"two\"
fun file3() = \"three\"

fun consolidated() = listOf(file1(), file2(), file3())
";
    assert_eq!(script.resolved_code, expected);
}

#[test]
fn duplicate_include_contributes_once() {
    let tmp = tempfile::tempdir().unwrap();
    write_corpus(tmp.path());
    write(
        tmp.path(),
        "nested.kts",
        "@file:Include(\"./file1.kts\")\nfun nested() = file1()\n",
    );
    write(
        tmp.path(),
        "dup_include.kts",
        "@file:Include(\"file1.kts\")\n@file:Include(\"file1.kts\")\n@file:Include(\"nested.kts\")\nfun dup() = nested()\n",
    );

    let resolver = resolver_over(&tmp.path().join("cache"));
    let entry = tmp.path().join("dup_include.kts");
    let script = resolver.resolve(entry.to_str().unwrap()).unwrap();

    // file1 is reachable three ways (twice directly, once transitively
    // under a different spelling) and still contributes exactly once.
    assert_eq!(
        script.resolved_code,
        "\
import java.io.BufferedReader
import java.io.File

fun file1() = \"one\"
fun nested() = file1()
fun dup() = nested()
"
    );
    assert_eq!(
        script.dependencies,
        [Dependency(
            "com.eclipsesource.minimal-json:minimal-json:0.9.4".to_string()
        )]
        .into_iter()
        .collect::<HashSet<_>>()
    );

    let includes: HashSet<Include> = ["file1.kts", "./file1.kts", "nested.kts"]
        .iter()
        .map(|s| Include(s.to_string()))
        .collect();
    assert_eq!(script.includes, includes);
}

#[test]
fn different_entries_same_includes_merge_identically() {
    let tmp = tempfile::tempdir().unwrap();
    write_corpus(tmp.path());
    write(
        tmp.path(),
        "alternative.kts",
        "@file:Include(\"file3.kts\")\n@file:Include(\"file1.kts\")\n@file:Include(\"file2.kts\")\nfun alt() = file3()\n",
    );

    let resolver = resolver_over(&tmp.path().join("cache"));
    let first = resolver
        .resolve(tmp.path().join("template.kts").to_str().unwrap())
        .unwrap();
    let second = resolver
        .resolve(tmp.path().join("alternative.kts").to_str().unwrap())
        .unwrap();

    assert_eq!(import_set(&first).len(), 4);
    assert_eq!(first.dependencies.len(), 2);
    assert_eq!(import_set(&first), import_set(&second));
    assert_eq!(first.dependencies, second.dependencies);
}

#[test]
fn resolving_the_same_entry_twice_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    write_corpus(tmp.path());

    let resolver = resolver_over(&tmp.path().join("cache"));
    let entry = tmp.path().join("template.kts");
    let first = resolver.resolve(entry.to_str().unwrap()).unwrap();
    let second = resolver.resolve(entry.to_str().unwrap()).unwrap();

    assert_eq!(first.resolved_code, second.resolved_code);
    assert_eq!(first.imports, second.imports);
    assert_eq!(first.dependencies, second.dependencies);
}

struct CountingRemote {
    content: String,
    calls: Arc<AtomicUsize>,
}

impl RemoteFetch for CountingRemote {
    fn fetch(&self, _url: &Url, _timeout: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.content.clone())
    }
}

#[test]
fn shared_remote_include_fetched_once_across_resolutions() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "entry_a.kts",
        "@file:Include(\"https://scripts.example.com/shared.kts\")\nfun a() = shared()\n",
    );
    write(
        tmp.path(),
        "entry_b.kts",
        "@file:Include(\"https://scripts.example.com/shared.kts\")\nfun b() = shared()\n",
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let remote = CountingRemote {
        content: "import java.net.URL\nfun shared() = URL(\"https://x\").toString()\n".to_string(),
        calls: calls.clone(),
    };
    let config = Config::new(tmp.path().join("cache"));
    let cache = Arc::new(ContentCache::with_fetcher(&config, Box::new(remote)).unwrap());
    let resolver = ScriptResolver::new(SectionResolver::new(Parser::new(), cache));

    let first = resolver
        .resolve(tmp.path().join("entry_a.kts").to_str().unwrap())
        .unwrap();
    let second = resolver
        .resolve(tmp.path().join("entry_b.kts").to_str().unwrap())
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(first.resolved_code.contains("fun shared()"));
    assert!(second.resolved_code.contains("fun shared()"));
}

#[test]
fn remote_entry_with_relative_remote_include() {
    struct TwoFiles {
        calls: Arc<AtomicUsize>,
    }

    impl RemoteFetch for TwoFiles {
        fn fetch(&self, url: &Url, _timeout: Duration) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match url.as_str() {
                "https://scripts.example.com/tools/main.kts" => {
                    "@file:Include(\"lib/util.kts\")\nfun main() = util()\n".to_string()
                }
                "https://scripts.example.com/tools/lib/util.kts" => {
                    "fun util() = 42\n".to_string()
                }
                other => panic!("unexpected fetch of {}", other),
            })
        }
    }

    let tmp = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let config = Config::new(tmp.path().join("cache"));
    let cache = Arc::new(
        ContentCache::with_fetcher(&config, Box::new(TwoFiles { calls: calls.clone() })).unwrap(),
    );
    let resolver = ScriptResolver::new(SectionResolver::new(Parser::new(), cache));

    let script = resolver
        .resolve("https://scripts.example.com/tools/main.kts")
        .unwrap();

    assert_eq!(script.source_kind, SourceKind::Remote);
    assert_eq!(script.name, "main.kts");
    assert_eq!(script.resolved_code, "fun util() = 42\nfun main() = util()\n");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
