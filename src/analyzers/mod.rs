//! Static checks over a directory of generated tests.

pub mod coverage;
pub mod standards;

pub use coverage::{CoverageAnalyzer, CoverageEntry, CoverageReport};
pub use standards::{StandardsChecker, StandardsIssue, StandardsReport};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `test_*.py` files under `root`, sorted for stable reports.
pub(crate) fn test_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.starts_with("test_") && name.ends_with(".py")
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
