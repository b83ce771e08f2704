//
//  scan.rs
//  RouteLinter
//

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{LintError, Result};
use crate::parser::{SourceUnit, SupportedLanguage};

/// Directories that are never scanned, even without .gitignore.
const BUILTIN_IGNORE: &[&str] = &[
    "node_modules",
    "bower_components",
    "vendor",
    "dist",
    "build",
    "out",
    ".git",
    ".svn",
    ".hg",
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".output",
    ".turbo",
    ".cache",
    "coverage",
    "target",
];

/// Check if a path contains any built-in ignored directory.
fn is_builtin_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        if let std::path::Component::Normal(name) = c {
            BUILTIN_IGNORE.contains(&name.to_str().unwrap_or(""))
        } else {
            false
        }
    })
}

/// Collect every supported source file under `root`, sorted by path.
///
/// Respects .gitignore and `.routelinterignore`. Files that can't be read
/// as UTF-8 are skipped with a warning.
pub fn collect_units(root: &Path) -> Result<Vec<SourceUnit>> {
    if !root.is_dir() {
        return Err(LintError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", root.display()),
        )));
    }

    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .add_custom_ignore_filename(".routelinterignore")
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| !is_builtin_ignored(entry.path().strip_prefix(root).unwrap_or(entry.path())))
        .filter(|entry| SupportedLanguage::from_path(entry.path()).is_some())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let units: Vec<SourceUnit> = files
        .par_iter()
        .filter_map(|path| match fs::read_to_string(path) {
            Ok(text) => Some(SourceUnit::new(path.clone(), text)),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable file");
                None
            }
        })
        .collect();

    debug!(root = %root.display(), file_count = units.len(), "collected source units");
    Ok(units)
}
