use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::generators::manual::collect_report;
use crate::generators::{AaaNarration, ArtifactTemplates, CodeSteps, GenerationReport};
use crate::llm::{GenerationClient, Outcome};
use crate::models::{ApiRequirement, ApiRequirementsDocument, UiRequirement, UiRequirementsDocument};
use crate::naming::artifact_file_name;

/// Writes executable pytest modules: Playwright for UI requirements,
/// `requests` for API requirements.
pub struct AutomationGenerator {
    templates: ArtifactTemplates,
    ui_base_url: String,
    concurrency: usize,
}

impl AutomationGenerator {
    pub fn new(ui_base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            templates: ArtifactTemplates::new()?,
            ui_base_url: ui_base_url.into(),
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
                let outcome = self.write_ui_test(&doc.feature, req, out_dir, client).await;
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
            "UI automation generated"
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
                let outcome = self.write_api_test(doc, req, out_dir, client).await;
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
            "API automation generated"
        );
        Ok(report)
    }

    async fn write_ui_test(
        &self,
        feature: &str,
        req: &UiRequirement,
        out_dir: &Path,
        client: Option<&dyn GenerationClient>,
    ) -> Result<(PathBuf, bool)> {
        let fallback = AaaNarration::ui_fallback(req);
        let ((steps, narration_fallback), (code, code_fallback)) = match client {
            Some(client) => (
                AaaNarration::resolve(client.ui_narration(req).await, fallback),
                CodeSteps::resolve_ui(client.ui_automation(feature, req).await),
            ),
            None => (
                (fallback, true),
                CodeSteps::resolve_ui(Outcome::Ok(Default::default())),
            ),
        };
        if code_fallback {
            debug!(id = %req.id, "UI test left with placeholder steps");
        }

        let content = self
            .templates
            .auto_ui(&self.ui_base_url, feature, req, &steps, &code)?;
        let path = out_dir.join(artifact_file_name(&req.id));
        fs::write(&path, content).await?;
        Ok((path, narration_fallback || code_fallback))
    }

    async fn write_api_test(
        &self,
        doc: &ApiRequirementsDocument,
        req: &ApiRequirement,
        out_dir: &Path,
        client: Option<&dyn GenerationClient>,
    ) -> Result<(PathBuf, bool)> {
        let fallback = AaaNarration::api_fallback(req);
        let ((steps, narration_fallback), (code, code_fallback)) = match client {
            Some(client) => (
                AaaNarration::resolve(client.api_narration(req).await, fallback),
                CodeSteps::resolve_api(client.api_automation(doc, req).await, req),
            ),
            None => ((fallback, true), (CodeSteps::api_fallback(req), true)),
        };

        let content = self
            .templates
            .auto_api(&doc.base_url, &doc.feature, req, &steps, &code)?;
        let path = out_dir.join(artifact_file_name(&req.id));
        fs::write(&path, content).await?;
        Ok((path, narration_fallback || code_fallback))
    }
}
