//! CLI entry point for the repo-local architecture lint.
//!
//! Usage: `architecture-lint [BACKEND_DIR]`. Without an argument the
//! `backend/` directory of the enclosing Cargo workspace is linted.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let backend_dir = match std::env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => match workspace_root() {
            Ok(root) => root.join("backend"),
            Err(err) => return report(&err),
        },
    };
    match architecture_lint::lint_backend_sources(&backend_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &dyn std::error::Error) -> ExitCode {
    let mut stderr = io::stderr().lock();
    if writeln!(stderr, "{err}").is_err() {
        return ExitCode::from(2);
    }
    ExitCode::FAILURE
}

#[derive(Debug, Clone, Copy)]
struct WorkspaceRootError;

impl fmt::Display for WorkspaceRootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unable to locate the workspace root; pass the backend directory explicitly"
        )
    }
}

impl std::error::Error for WorkspaceRootError {}

/// First workspace manifest found above `CARGO_WORKSPACE_DIR`, the current
/// directory or this crate, in that order.
fn workspace_root() -> Result<PathBuf, WorkspaceRootError> {
    let candidates = [
        std::env::var_os("CARGO_WORKSPACE_DIR").map(PathBuf::from),
        std::env::current_dir().ok(),
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|start| find_workspace_root(start))
        .ok_or(WorkspaceRootError)
}

fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| declares_workspace(&dir.join("Cargo.toml")))
        .map(Path::to_path_buf)
}

fn declares_workspace(manifest: &Path) -> bool {
    fs::read_to_string(manifest)
        .ok()
        .is_some_and(|contents| contents.contains("[workspace]"))
}
