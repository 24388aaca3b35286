use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::{display_name, test_files};
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct CoverageEntry {
    /// `UI` or `API`, from the directory name.
    pub scope: String,
    pub total_tests: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub root_dir: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<CoverageEntry>,
}

/// Counts `def test_*` functions per file.
pub struct CoverageAnalyzer {
    test_fn: Regex,
}

impl CoverageAnalyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            test_fn: Regex::new(r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+test_\w*[ \t]*\(")?,
        })
    }

    pub fn count_tests(&self, source: &str) -> usize {
        self.test_fn.find_iter(source).count()
    }

    pub fn analyze_dir(&self, root: &Path) -> Result<CoverageReport> {
        let root = root.canonicalize()?;
        let scope = if display_name(&root).to_lowercase().contains("api") {
            "API"
        } else {
            "UI"
        };

        let mut total_tests = 0;
        let mut files = Vec::new();
        for file in test_files(&root) {
            let source = match std::fs::read_to_string(&file) {
                Ok(source) => source,
                Err(e) => {
                    debug!(file = %file.display(), error = %e, "Unreadable test file skipped");
                    continue;
                }
            };
            let count = self.count_tests(&source);
            if count > 0 {
                total_tests += count;
                files.push(display_name(&file));
            }
        }

        info!(root = %root.display(), scope, total_tests, files = files.len(), "Coverage analyzed");
        Ok(CoverageReport {
            root_dir: root.display().to_string(),
            generated_at: Utc::now(),
            entries: vec![CoverageEntry {
                scope: scope.to_string(),
                total_tests,
                files,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_only_test_functions() {
        let analyzer = CoverageAnalyzer::new().unwrap();
        let source = r#"
class CalcTests:
    def test_one(self) -> None:
        ...

    def helper(self):
        pass

async def test_async():
    pass

def test_two(page):
    # def test_in_comment()
    pass
"#;
        assert_eq!(analyzer.count_tests(source), 3);
    }
}
