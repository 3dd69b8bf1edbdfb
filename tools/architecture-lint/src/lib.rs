//! Boundary checks for the Lingo backend's ports-and-adapters layout.
//!
//! Each file under `backend/src/{domain,inbound,outbound,middleware}` is
//! parsed with `syn` and every path it mentions is resolved to either a
//! sibling module of the library crate or an external crate. A file fails
//! when it names something its layer may not see:
//!
//! | layer        | modules it may not name          | crates it may not name            |
//! |--------------|----------------------------------|-----------------------------------|
//! | `domain`     | inbound, outbound, middleware    | actix, diesel, reqwest, jwt       |
//! | `inbound`    | outbound                         | diesel, reqwest, jwt              |
//! | `outbound`   | inbound, middleware              | actix                             |
//! | `middleware` | inbound, outbound                | diesel, reqwest, jwt              |
//!
//! `server` is private to the binary: no layer may name it and `lib.rs`
//! may not declare it.
//!
//! Run with `cargo run -p architecture-lint`.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

const LIBRARY_CRATE: &str = "lingo";
const BINARY_ONLY_MODULE: &str = "server";

const WEB_CRATES: &[&str] = &["actix", "actix_service", "actix_web", "actix_web_prom"];
const ADAPTER_CRATES: &[&str] = &[
    "diesel",
    "diesel_async",
    "diesel_migrations",
    "jsonwebtoken",
    "reqwest",
];

/// A rule broken by one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

#[derive(Debug)]
pub enum ArchitectureLintError {
    Io(io::Error),
    Parse { file: PathBuf, message: String },
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read backend sources: {err}"),
            Self::Parse { file, message } => {
                write!(f, "cannot parse {}: {message}", file.display())
            }
            Self::Violations(violations) => {
                writeln!(f, "{} architecture violation(s):", violations.len())?;
                violations
                    .iter()
                    .try_for_each(|violation| writeln!(f, "  {violation}"))
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse { .. } | Self::Violations(_) => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust file to check, keyed by its path under `backend/src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    pub file: PathBuf,
    pub contents: String,
}

/// Where a file sits in the crate, which decides the rules it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    CrateRoot,
    Layer(Layer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
    Middleware,
}

impl Layer {
    const ALL: [Self; 4] = [Self::Domain, Self::Inbound, Self::Outbound, Self::Middleware];

    const fn dir(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
            Self::Middleware => "middleware",
        }
    }

    fn from_dir(dir: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.dir() == dir)
    }

    const fn hidden_modules(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &["inbound", "outbound", "middleware", BINARY_ONLY_MODULE],
            Self::Inbound => &["outbound", BINARY_ONLY_MODULE],
            Self::Outbound => &["inbound", "middleware", BINARY_ONLY_MODULE],
            Self::Middleware => &["inbound", "outbound", BINARY_ONLY_MODULE],
        }
    }

    fn hidden_crates(self) -> impl Iterator<Item = &'static str> {
        let (web, adapters) = match self {
            Self::Domain => (WEB_CRATES, ADAPTER_CRATES),
            Self::Inbound | Self::Middleware => (&[][..], ADAPTER_CRATES),
            Self::Outbound => (WEB_CRATES, &[][..]),
        };
        web.iter().chain(adapters).copied()
    }

    fn is_sibling(segment: &str) -> bool {
        segment == BINARY_ONLY_MODULE || Self::from_dir(segment).is_some()
    }
}

impl Scope {
    fn of(file: &Path) -> Option<Self> {
        if file == Path::new("lib.rs") {
            return Some(Self::CrateRoot);
        }
        let first = file.components().next()?.as_os_str().to_str()?;
        Layer::from_dir(first).map(Self::Layer)
    }
}

/// What a path points at once `crate::`/`super::`/`lingo::` prefixes are
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Target {
    Module(String),
    Crate(String),
}

impl Target {
    fn resolve(segments: &[String]) -> Option<Self> {
        let mut rest = segments.iter().map(String::as_str);
        let first = rest.next()?;
        match first {
            "crate" | "self" | "super" | LIBRARY_CRATE => rest
                .find(|segment| !matches!(*segment, "self" | "super"))
                .map(|module| Self::Module(module.to_owned())),
            sibling if segments.len() > 1 && Layer::is_sibling(sibling) => {
                Some(Self::Module(sibling.to_owned()))
            }
            external => Some(Self::Crate(external.to_owned())),
        }
    }
}

/// Lint every layer file plus `lib.rs` under `backend_dir/src`.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src = backend_dir.join("src");
    let mut sources = Vec::new();
    let root = src.join("lib.rs");
    if root.is_file() {
        sources.push(LintSource {
            file: PathBuf::from("lib.rs"),
            contents: fs::read_to_string(root)?,
        });
    }
    for layer in Layer::ALL {
        let dir = src.join(layer.dir());
        if dir.is_dir() {
            read_tree(&src, &dir, &mut sources)?;
        }
    }
    lint_sources(&sources)
}

/// Lint in-memory sources. Files outside the layers and `lib.rs` are ignored.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let Some(scope) = Scope::of(&source.file) else {
            continue;
        };
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        let messages = match scope {
            Scope::CrateRoot => check_crate_root(&parsed),
            Scope::Layer(layer) => check_layer(layer, &parsed),
        };
        violations.extend(messages.into_iter().map(|message| Violation {
            file: source.file.clone(),
            message,
        }));
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

fn check_crate_root(parsed: &syn::File) -> BTreeSet<String> {
    parsed
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Mod(module) if module.ident == BINARY_ONLY_MODULE => Some(format!(
                "`{BINARY_ONLY_MODULE}` must stay in the binary crate, not the library"
            )),
            _ => None,
        })
        .collect()
}

fn check_layer(layer: Layer, parsed: &syn::File) -> BTreeSet<String> {
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);
    let name = layer.dir();
    collector
        .targets
        .iter()
        .filter_map(|target| match target {
            Target::Module(module) if layer.hidden_modules().contains(&module.as_str()) => {
                Some(format!("{name} must not depend on crate::{module}"))
            }
            Target::Crate(krate) if layer.hidden_crates().any(|hidden| hidden == krate.as_str()) => {
                Some(format!("{name} must not depend on external crate `{krate}`"))
            }
            _ => None,
        })
        .collect()
}

#[derive(Default)]
struct PathCollector {
    targets: BTreeSet<Target>,
}

impl PathCollector {
    fn record(&mut self, segments: &[String]) {
        self.targets.extend(Target::resolve(segments));
    }

    fn record_use(&mut self, tree: &syn::UseTree, prefix: &mut Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use(&path.tree, prefix);
                prefix.pop();
            }
            syn::UseTree::Name(syn::UseName { ident })
            | syn::UseTree::Rename(syn::UseRename { ident, .. }) => {
                prefix.push(ident.to_string());
                self.record(prefix);
                prefix.pop();
            }
            syn::UseTree::Glob(_) => self.record(prefix),
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use(item, prefix);
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        self.record(&segments);
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use(&node.tree, &mut Vec::new());
    }
}

fn read_tree(
    src: &Path,
    dir: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            read_tree(src, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let file = path
                .strip_prefix(src)
                .map_or_else(|_| path.clone(), Path::to_path_buf);
            sources.push(LintSource {
                contents: fs::read_to_string(&path)?,
                file,
            });
        }
    }
    Ok(())
}
