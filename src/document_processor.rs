use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "rst"];
const BINARY_EXTENSIONS: [&str; 3] = ["pdf", "docx", "xlsx"];

/// Pulls plain requirement text out of the document formats analysts
/// usually hand over.
#[derive(Debug, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn extract_text_from_file(&self, path: &Path) -> Result<String> {
        let extension = extension_of(path)
            .ok_or_else(|| Error::Document(format!("{} has no file extension", path.display())))?;

        let text = match extension.as_str() {
            "pdf" => {
                let bytes = fs::read(path).await?;
                pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| Error::Document(format!("failed to extract PDF text: {}", e)))?
            }
            "docx" => {
                let bytes = fs::read(path).await?;
                docx_text(&bytes)?
            }
            "xlsx" => xlsx_text(path)?,
            ext if TEXT_EXTENSIONS.contains(&ext) => fs::read_to_string(path).await?,
            other => {
                return Err(Error::Document(format!(
                    "unsupported requirements format: .{}",
                    other
                )))
            }
        };

        let cleaned = clean_text(&text);
        debug!(chars = cleaned.len(), "Requirement text extracted");
        if cleaned.is_empty() {
            return Err(Error::Document(format!("{} contains no text", path.display())));
        }
        Ok(cleaned)
    }

    pub fn is_supported_format(&self, path: &Path) -> bool {
        extension_of(path).map_or(false, |ext| {
            TEXT_EXTENSIONS.contains(&ext.as_str()) || BINARY_EXTENSIONS.contains(&ext.as_str())
        })
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

fn docx_text(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| Error::Document(format!("failed to read DOCX file: {}", e)))?;

    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(para) = child {
            for run in para.children {
                if let docx_rs::ParagraphChild::Run(run) = run {
                    for run_child in run.children {
                        if let docx_rs::RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

// One line per non-empty row, cells joined with " | ".
fn xlsx_text(path: &Path) -> Result<String> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| Error::Document(format!("failed to open XLSX file: {}", e)))?;

    let mut text = String::new();
    for sheet_name in workbook.sheet_names() {
        let Ok(range) = workbook.worksheet_range(&sheet_name) else {
            continue;
        };
        text.push_str(&format!("{}\n", sheet_name));
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .filter_map(|cell| match cell {
                    Data::Empty | Data::Error(_) => None,
                    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
                    Data::Float(f) => Some(f.to_string()),
                    Data::Int(i) => Some(i.to_string()),
                    Data::Bool(b) => Some(b.to_string()),
                    Data::DateTime(dt) => Some(format!("{:?}", dt)),
                })
                .filter(|s| !s.trim().is_empty())
                .collect();
            if !cells.is_empty() {
                text.push_str(&cells.join(" | "));
                text.push('\n');
            }
        }
        text.push('\n');
    }
    Ok(text)
}

/// Trims every line and collapses runs of blank lines to one, so paragraph
/// boundaries survive.
fn clean_text(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().map_or(false, |l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_supported_format() {
        let processor = DocumentProcessor::new();

        assert!(processor.is_supported_format(Path::new("reqs.pdf")));
        assert!(processor.is_supported_format(Path::new("reqs.DOCX")));
        assert!(processor.is_supported_format(Path::new("reqs.xlsx")));
        assert!(processor.is_supported_format(Path::new("reqs.md")));

        assert!(!processor.is_supported_format(Path::new("reqs.doc")));
        assert!(!processor.is_supported_format(Path::new("reqs")));
    }

    #[test]
    fn test_clean_text_keeps_paragraphs() {
        assert_eq!(
            clean_text("\n  First line  \n\n\n Second\nThird \n\n"),
            "First line\n\nSecond\nThird"
        );
    }

    #[tokio::test]
    async fn test_reads_markdown_and_rejects_unknown() {
        let dir = TempDir::new().unwrap();
        let md = dir.path().join("reqs.md");
        std::fs::write(&md, "# Calculator\n\nThe page shows a total.\n").unwrap();
        let unknown = dir.path().join("reqs.odt");
        std::fs::write(&unknown, "x").unwrap();

        let processor = DocumentProcessor::new();
        let text = processor.extract_text_from_file(&md).await.unwrap();
        assert_eq!(text, "# Calculator\n\nThe page shows a total.");

        let err = processor.extract_text_from_file(&unknown).await.unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }
}
