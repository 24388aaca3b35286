use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::analyzers::{display_name, test_files};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardsIssue {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardsReport {
    pub root_dir: String,
    pub generated_at: DateTime<Utc>,
    pub issues: Vec<StandardsIssue>,
    pub ok_files: Vec<String>,
}

/// Checks each test file for an Allure title, a priority marker and all
/// three Arrange/Act/Assert steps.
#[derive(Debug, Default)]
pub struct StandardsChecker;

impl StandardsChecker {
    pub fn new() -> Self {
        Self
    }

    /// Missing items for one file; empty when it conforms.
    pub fn check_source(&self, source: &str) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !source.contains("@allure.title") {
            missing.push("missing @allure.title");
        }
        let has_priority = source.contains("label(\"priority\"")
            || source.contains("label('priority'")
            || source.contains("@allure.tag(");
        if !has_priority {
            missing.push("missing priority label");
        }
        let has_aaa = ["Arrange:", "Act:", "Assert:"]
            .iter()
            .all(|step| source.contains(step));
        if !has_aaa {
            missing.push("incomplete AAA (Arrange/Act/Assert)");
        }
        missing
    }

    pub fn check_dir(&self, root: &Path) -> Result<StandardsReport> {
        let root = root.canonicalize()?;
        let mut issues = Vec::new();
        let mut ok_files = Vec::new();

        for file in test_files(&root) {
            let source = std::fs::read_to_string(&file)?;
            let missing = self.check_source(&source);
            if missing.is_empty() {
                ok_files.push(display_name(&file));
            } else {
                issues.push(StandardsIssue {
                    file: display_name(&file),
                    message: missing.join(", "),
                });
            }
        }

        info!(
            root = %root.display(),
            issues = issues.len(),
            ok = ok_files.len(),
            "Standards checked"
        );
        Ok(StandardsReport {
            root_dir: root.display().to_string(),
            generated_at: Utc::now(),
            issues,
            ok_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_dir_splits_ok_and_issues() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("test_good.py"),
            "@allure.title(\"x\")\n@allure.tag(\"NORMAL\")\nArrange: a\nAct: b\nAssert: c\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("test_bad.py"), "def test_bad():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("helper.py"), "nothing here").unwrap();

        let report = StandardsChecker::new().check_dir(dir.path()).unwrap();

        assert_eq!(report.ok_files, vec!["test_good.py"]);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].file, "test_bad.py");
        assert_eq!(
            report.issues[0].message,
            "missing @allure.title, missing priority label, incomplete AAA (Arrange/Act/Assert)"
        );
    }
}
