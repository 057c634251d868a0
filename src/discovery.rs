//! Host-side file discovery: walk the project, keep configured suffixes.

use crate::host::SourceFile;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|n| SKIPPED_DIRS.contains(&n))
            .unwrap_or(false)
}

/// Every file under `root` whose name ends with one of `suffixes`, sorted.
pub fn discover(root: &Path, suffixes: &[String]) -> Vec<SourceFile> {
    let mut paths: Vec<_> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            // declaration files carry no code to analyze
            !name.ends_with(".d.ts") && suffixes.iter().any(|s| name.ends_with(s.as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths.into_iter().map(SourceFile::new).collect()
}
