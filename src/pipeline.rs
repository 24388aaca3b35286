//! End-to-end runs: requirements in, manual cases and reviewed automation
//! out.
//!
//! ```text
//! Extracting → ManualGenerating → AutoGenerating → Reviewing → Refining → Done
//! ```
//!
//! Only fatal errors (configuration, unreadable OpenAPI, failed requirement
//! extraction) leave a run early. Everything else is absorbed per
//! requirement and shows up in the [`PipelineReport`].

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, GenerationConfig};
use crate::error::Result;
use crate::generators::{AutomationGenerator, GenerationReport, ManualCaseGenerator, PLACEHOLDER_MARKER};
use crate::llm::{FallbackReason, GenerationClient, LlmGenerationClient, Outcome, ReviewVerdict};
use crate::models::{ApiRequirementsDocument, RequirementRef, UiRequirementsDocument};
use crate::naming::artifact_file_name;
use crate::parsers::{openapi, ui_requirements};

pub const MANUAL_UI_DIR: &str = "manual_ui";
pub const AUTO_UI_DIR: &str = "auto_ui";
pub const MANUAL_API_DIR: &str = "manual_api";
pub const AUTO_API_DIR: &str = "auto_api";

const INCOMPLETE_TEST_PROBLEM: &str = "The test still contains placeholder steps: generation could not build the Act/Assert code, so the test is incomplete.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    ManualGenerating,
    AutoGenerating,
    Reviewing,
    Refining,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extracting => "extracting",
            Stage::ManualGenerating => "manual_generating",
            Stage::AutoGenerating => "auto_generating",
            Stage::Reviewing => "reviewing",
            Stage::Refining => "refining",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the review pass did to one automation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// No file under the expected name.
    Missing,
    /// Reviewer had no objections; file untouched.
    Accepted,
    /// Reviewer unreachable; file untouched.
    Skipped { reason: String },
    /// File rewritten `attempts` times; `problems` are from the last review.
    Refined { attempts: u32, problems: Vec<String> },
    /// Rejected but never rewritten.
    Unresolved { problems: Vec<String>, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRecord {
    pub id: String,
    pub file: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub feature: String,
    pub requirements: usize,
    pub manual: GenerationReport,
    pub automation: GenerationReport,
    pub reviews: Vec<ReviewRecord>,
}

impl PipelineReport {
    pub fn count(&self, matches: impl Fn(&FileOutcome) -> bool) -> usize {
        self.reviews.iter().filter(|r| matches(&r.outcome)).count()
    }

    pub fn refined(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Refined { .. }))
    }

    pub fn unresolved(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unresolved { .. }))
    }
}

/// Comment block put in front of a rewritten test.
pub fn auto_fix_header(problems: &[String]) -> String {
    if problems.is_empty() {
        return "# REVIEW AUTO-FIX: test improved automatically by reviewer\n\n".to_string();
    }
    let mut header = String::from(
        "# REVIEW AUTO-FIX: test rewritten automatically from reviewer feedback\n# Problems found:\n",
    );
    for problem in problems {
        let flat = problem.lines().map(str::trim).collect::<Vec<_>>().join(" ");
        header.push_str(&format!("# - {}\n", flat));
    }
    header.push('\n');
    header
}

pub struct GenerationPipeline {
    client: Arc<dyn GenerationClient>,
    manual: ManualCaseGenerator,
    automation: AutomationGenerator,
    feature: Option<String>,
    concurrency: usize,
    max_refine_attempts: u32,
}

impl GenerationPipeline {
    pub fn new(client: Arc<dyn GenerationClient>, settings: &GenerationConfig) -> Result<Self> {
        let concurrency = settings.concurrency.max(1);
        Ok(Self {
            client,
            manual: ManualCaseGenerator::new()?.with_concurrency(concurrency),
            automation: AutomationGenerator::new(settings.ui_base_url.clone())?
                .with_concurrency(concurrency),
            feature: settings.feature.clone().filter(|f| !f.trim().is_empty()),
            concurrency,
            max_refine_attempts: settings.max_refine_attempts,
        })
    }

    /// Builds the HTTP-backed client; a missing API key fails here.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = LlmGenerationClient::from_config(&config.llm)?;
        Self::new(Arc::new(client), &config.generation)
    }

    fn enter(&self, stage: Stage) {
        info!(stage = %stage, "Pipeline stage");
    }

    #[instrument(skip_all, fields(chars = text.len(), out = %output_dir.display()))]
    pub async fn run_ui_from_text(&self, text: &str, output_dir: &Path) -> Result<PipelineReport> {
        self.enter(Stage::Extracting);
        let doc = self
            .client
            .requirements_from_text(text, self.feature.as_deref())
            .await?;
        self.run_ui_document(&doc, output_dir).await
    }

    pub async fn run_ui_document(
        &self,
        doc: &UiRequirementsDocument,
        output_dir: &Path,
    ) -> Result<PipelineReport> {
        let manual_dir = output_dir.join(MANUAL_UI_DIR);
        let auto_dir = output_dir.join(AUTO_UI_DIR);
        let client = Some(self.client.as_ref());

        self.enter(Stage::ManualGenerating);
        let manual = self.manual.generate_ui(doc, &manual_dir, client).await?;

        self.enter(Stage::AutoGenerating);
        let automation = self.automation.generate_ui(doc, &auto_dir, client).await?;

        self.enter(Stage::Reviewing);
        let subjects = doc.requirements.iter().map(RequirementRef::Ui).collect();
        let reviews = self.review_all(&doc.feature, subjects, &auto_dir).await;

        self.enter(Stage::Done);
        Ok(PipelineReport {
            feature: doc.feature.clone(),
            requirements: doc.requirements.len(),
            manual,
            automation,
            reviews,
        })
    }

    #[instrument(skip_all, fields(out = %output_dir.display()))]
    pub async fn run_api_from_spec_text(&self, text: &str, output_dir: &Path) -> Result<PipelineReport> {
        self.enter(Stage::Extracting);
        let doc = openapi::parse_text(text)?;
        self.run_api_document(&doc, output_dir).await
    }

    #[instrument(skip_all, fields(spec = %path.display(), out = %output_dir.display()))]
    pub async fn run_api_from_spec_file(&self, path: &Path, output_dir: &Path) -> Result<PipelineReport> {
        self.enter(Stage::Extracting);
        let text = fs::read_to_string(path).await?;
        let doc = openapi::parse_text(&text)?;
        self.run_api_document(&doc, output_dir).await
    }

    pub async fn run_api_document(
        &self,
        doc: &ApiRequirementsDocument,
        output_dir: &Path,
    ) -> Result<PipelineReport> {
        let manual_dir = output_dir.join(MANUAL_API_DIR);
        let auto_dir = output_dir.join(AUTO_API_DIR);
        let client = Some(self.client.as_ref());

        self.enter(Stage::ManualGenerating);
        let manual = self.manual.generate_api(doc, &manual_dir, client).await?;

        self.enter(Stage::AutoGenerating);
        let automation = self.automation.generate_api(doc, &auto_dir, client).await?;

        self.enter(Stage::Reviewing);
        let subjects = doc.requirements.iter().map(RequirementRef::Api).collect();
        let reviews = self.review_all(&doc.feature, subjects, &auto_dir).await;

        self.enter(Stage::Done);
        Ok(PipelineReport {
            feature: doc.feature.clone(),
            requirements: doc.requirements.len(),
            manual,
            automation,
            reviews,
        })
    }

    pub async fn ui_manual_from_file(&self, path: &Path, out_dir: &Path) -> Result<GenerationReport> {
        let doc = self.load_ui_file(path)?;
        self.manual
            .generate_ui(&doc, out_dir, Some(self.client.as_ref()))
            .await
    }

    pub async fn ui_automation_from_file(&self, path: &Path, out_dir: &Path) -> Result<GenerationReport> {
        let doc = self.load_ui_file(path)?;
        self.automation
            .generate_ui(&doc, out_dir, Some(self.client.as_ref()))
            .await
    }

    pub async fn api_manual_from_file(&self, path: &Path, out_dir: &Path) -> Result<GenerationReport> {
        let doc = openapi::parse_file(path)?;
        self.manual
            .generate_api(&doc, out_dir, Some(self.client.as_ref()))
            .await
    }

    pub async fn api_automation_from_file(&self, path: &Path, out_dir: &Path) -> Result<GenerationReport> {
        let doc = openapi::parse_file(path)?;
        self.automation
            .generate_api(&doc, out_dir, Some(self.client.as_ref()))
            .await
    }

    fn load_ui_file(&self, path: &Path) -> Result<UiRequirementsDocument> {
        let mut doc = ui_requirements::parse_file(path)?;
        if let Some(feature) = &self.feature {
            doc.feature = feature.clone();
        }
        Ok(doc)
    }

    async fn review_all(
        &self,
        feature: &str,
        subjects: Vec<RequirementRef<'_>>,
        auto_dir: &Path,
    ) -> Vec<ReviewRecord> {
        let reviews: Vec<ReviewRecord> = stream::iter(subjects)
            .map(|subject| self.review_and_refine(feature, subject, auto_dir))
            .buffered(self.concurrency)
            .collect()
            .await;

        let refined = reviews
            .iter()
            .filter(|r| matches!(r.outcome, FileOutcome::Refined { .. }))
            .count();
        info!(files = reviews.len(), refined, "Review pass finished");
        reviews
    }

    /// Reviews one automation file and rewrites it while the reviewer
    /// objects, up to `max_refine_attempts` rewrites.
    #[instrument(skip_all, fields(id = %requirement.id()))]
    pub async fn review_and_refine(
        &self,
        feature: &str,
        requirement: RequirementRef<'_>,
        auto_dir: &Path,
    ) -> ReviewRecord {
        let file = auto_dir.join(artifact_file_name(requirement.id()));
        let outcome = self.review_file(feature, requirement, &file).await;
        debug!(file = %file.display(), outcome = ?outcome, "Review finished");
        ReviewRecord {
            id: requirement.id().to_string(),
            file,
            outcome,
        }
    }

    async fn review_file(&self, feature: &str, requirement: RequirementRef<'_>, file: &Path) -> FileOutcome {
        let mut code = match fs::read_to_string(file).await {
            Ok(code) => code,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(file = %file.display(), "Automation file not found, review skipped");
                return FileOutcome::Missing;
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Automation file unreadable, review skipped");
                return FileOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let mut rewrites = 0u32;
        let mut last_problems = Vec::new();
        let refined = |attempts: u32, problems: Vec<String>| FileOutcome::Refined { attempts, problems };

        loop {
            let verdict = match self.classify(requirement, &code).await {
                Ok(verdict) => verdict,
                Err(reason) if rewrites == 0 => {
                    return FileOutcome::Skipped {
                        reason: reason.to_string(),
                    }
                }
                Err(_) => return refined(rewrites, last_problems),
            };

            if verdict.ok {
                return if rewrites == 0 {
                    FileOutcome::Accepted
                } else {
                    refined(rewrites, last_problems)
                };
            }

            if self.max_refine_attempts == 0 {
                return FileOutcome::Unresolved {
                    problems: verdict.problems,
                    reason: "refine attempts disabled".to_string(),
                };
            }

            debug!(stage = %Stage::Refining, problems = verdict.problems.len(), "Refining test");
            let body = match self.client.refine(feature, requirement, &code, &verdict).await {
                Ok(new_code) => new_code.trim_start().to_string(),
                Err(e) if rewrites == 0 => {
                    warn!(error = %e, "Refine failed, test left as generated");
                    return FileOutcome::Unresolved {
                        problems: verdict.problems,
                        reason: e.to_string(),
                    };
                }
                Err(e) => {
                    warn!(error = %e, "Further refine failed, keeping previous rewrite");
                    return refined(rewrites, last_problems);
                }
            };

            let rewritten = format!("{}{}", auto_fix_header(&verdict.problems), body);
            if let Err(e) = fs::write(file, &rewritten).await {
                warn!(error = %e, "Could not write refined test");
                return if rewrites == 0 {
                    FileOutcome::Unresolved {
                        problems: verdict.problems,
                        reason: e.to_string(),
                    }
                } else {
                    refined(rewrites, last_problems)
                };
            }

            rewrites += 1;
            last_problems = verdict.problems;
            info!(attempt = rewrites, "Test rewritten from review");

            if rewrites >= self.max_refine_attempts {
                return refined(rewrites, last_problems);
            }
            // Header excluded: it quotes the previous problems.
            code = body;
        }
    }

    /// Placeholder files are rejected without asking the reviewer. A
    /// malformed review counts as no objection; an unreachable reviewer is
    /// reported back.
    async fn classify(
        &self,
        requirement: RequirementRef<'_>,
        code: &str,
    ) -> std::result::Result<ReviewVerdict, FallbackReason> {
        if code.contains(PLACEHOLDER_MARKER) {
            debug!("Placeholder marker found, review short-circuited");
            return Ok(ReviewVerdict::rejected(vec![INCOMPLETE_TEST_PROBLEM.to_string()]));
        }
        match self.client.review(requirement, code).await {
            Outcome::Ok(verdict) => Ok(verdict),
            Outcome::Fallback(FallbackReason::Malformed(reason)) => {
                debug!(%reason, "Unreadable review treated as accepted");
                Ok(ReviewVerdict::accepted())
            }
            Outcome::Fallback(reason @ FallbackReason::Provider(_)) => {
                warn!(%reason, "Reviewer unavailable, refine skipped");
                Err(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lists_every_problem() {
        let header = auto_fix_header(&["no assertions".to_string(), "wrong\nselector".to_string()]);
        assert_eq!(
            header,
            "# REVIEW AUTO-FIX: test rewritten automatically from reviewer feedback\n\
             # Problems found:\n\
             # - no assertions\n\
             # - wrong selector\n\n"
        );
    }

    #[test]
    fn test_header_without_problems() {
        assert_eq!(
            auto_fix_header(&[]),
            "# REVIEW AUTO-FIX: test improved automatically by reviewer\n\n"
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::ManualGenerating.to_string(), "manual_generating");
        assert_eq!(Stage::Done.to_string(), "done");
    }
}
