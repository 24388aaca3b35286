use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::generators::{AaaNarration, ArtifactTemplates, GenerationReport};
use crate::llm::GenerationClient;
use crate::models::{ApiRequirement, ApiRequirementsDocument, UiRequirement, UiRequirementsDocument};
use crate::naming::artifact_file_name;

/// Writes Allure "TestOps as code" manual cases: metadata and three inert
/// Arrange/Act/Assert steps per requirement.
pub struct ManualCaseGenerator {
    templates: ArtifactTemplates,
    concurrency: usize,
}

impl ManualCaseGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            templates: ArtifactTemplates::new()?,
            concurrency: 1,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip_all, fields(feature = %doc.feature, out = %out_dir.display()))]
    pub async fn generate_ui(
        &self,
        doc: &UiRequirementsDocument,
        out_dir: &Path,
        client: Option<&dyn GenerationClient>,
    ) -> Result<GenerationReport> {
        fs::create_dir_all(out_dir).await?;

        let results = stream::iter(&doc.requirements)
            .map(|req| async move {
                let outcome = self.write_ui_case(&doc.feature, req, out_dir, client).await;
                (req.id.clone(), outcome)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = collect_report(results);
        info!(
            written = report.written.len(),
            failed = report.failed.len(),
            fallbacks = report.fallbacks.len(),
            "Manual UI cases generated"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(feature = %doc.feature, out = %out_dir.display()))]
    pub async fn generate_api(
        &self,
        doc: &ApiRequirementsDocument,
        out_dir: &Path,
        client: Option<&dyn GenerationClient>,
    ) -> Result<GenerationReport> {
        fs::create_dir_all(out_dir).await?;

        let results = stream::iter(&doc.requirements)
            .map(|req| async move {
                let outcome = self.write_api_case(&doc.feature, req, out_dir, client).await;
                (req.id.clone(), outcome)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = collect_report(results);
        info!(
            written = report.written.len(),
            failed = report.failed.len(),
            fallbacks = report.fallbacks.len(),
            "Manual API cases generated"
        );
        Ok(report)
    }

    async fn write_ui_case(
        &self,
        feature: &str,
        req: &UiRequirement,
        out_dir: &Path,
        client: Option<&dyn GenerationClient>,
    ) -> Result<(PathBuf, bool)> {
        let fallback = AaaNarration::ui_fallback(req);
        let (steps, used_fallback) = match client {
            Some(client) => AaaNarration::resolve(client.ui_narration(req).await, fallback),
            None => (fallback, true),
        };
        let content = self.templates.manual_ui(feature, req, &steps)?;
        let path = out_dir.join(artifact_file_name(&req.id));
        fs::write(&path, content).await?;
        Ok((path, used_fallback))
    }

    async fn write_api_case(
        &self,
        feature: &str,
        req: &ApiRequirement,
        out_dir: &Path,
        client: Option<&dyn GenerationClient>,
    ) -> Result<(PathBuf, bool)> {
        let fallback = AaaNarration::api_fallback(req);
        let (steps, used_fallback) = match client {
            Some(client) => AaaNarration::resolve(client.api_narration(req).await, fallback),
            None => (fallback, true),
        };
        let content = self.templates.manual_api(feature, req, &steps)?;
        let path = out_dir.join(artifact_file_name(&req.id));
        fs::write(&path, content).await?;
        Ok((path, used_fallback))
    }
}

/// Folds per-requirement results into a report, logging each failure.
pub(crate) fn collect_report(results: Vec<(String, Result<(PathBuf, bool)>)>) -> GenerationReport {
    let mut report = GenerationReport::default();
    for (id, result) in results {
        match result {
            Ok((path, used_fallback)) => {
                if used_fallback {
                    report.fallbacks.push(id);
                }
                report.written.push(path);
            }
            Err(e) => {
                error!(id = %id, error = %e, "Failed to write test artifact");
                report.failed.push((id, e.to_string()));
            }
        }
    }
    report
}
