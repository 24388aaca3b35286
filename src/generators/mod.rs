//! Manual case and automation file generators.
//!
//! Both generators take a requirement document and an optional
//! [`GenerationClient`](crate::llm::GenerationClient); without a client, or
//! when the client falls back, deterministic text and code are used so every
//! requirement still gets a file.

pub mod automation;
pub mod manual;
pub mod templates;

use serde::Serialize;
use std::path::PathBuf;

use crate::llm::{CodeDraft, NarrationDraft, Outcome};
use crate::models::{ApiRequirement, UiRequirement};

pub use automation::AutomationGenerator;
pub use manual::ManualCaseGenerator;
pub use templates::ArtifactTemplates;

/// Token left in generated code where a step could not be synthesized.
/// The pipeline treats any file containing it as incomplete.
pub const PLACEHOLDER_MARKER: &str = "FIXME";

const CODE_INDENT: &str = "        ";

/// Human-readable Arrange/Act/Assert step titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AaaNarration {
    pub arrange: String,
    pub act: String,
    pub assertion: String,
}

impl AaaNarration {
    pub fn ui_fallback(req: &UiRequirement) -> Self {
        Self {
            arrange: "open the product page".to_string(),
            act: format!("perform the user actions for: {}", req.title),
            assertion: format!("verify that {}", req.title),
        }
    }

    pub fn api_fallback(req: &ApiRequirement) -> Self {
        Self {
            arrange: format!("prepare an authorized request to {}", req.endpoint()),
            act: format!("send the request {}", req.endpoint()),
            assertion: format!(
                "receive HTTP {} and check the response body against the specification",
                req.success_code
            ),
        }
    }

    /// Fills whatever the draft is missing from `fallback`. Returns the
    /// narration and whether any field came from the fallback.
    pub fn resolve(outcome: Outcome<NarrationDraft>, fallback: AaaNarration) -> (Self, bool) {
        let draft = match outcome {
            Outcome::Ok(draft) => draft,
            Outcome::Fallback(_) => return (fallback, true),
        };
        let used_fallback =
            draft.arrange.is_none() || draft.act.is_none() || draft.assertion.is_none();
        let narration = Self {
            arrange: draft.arrange.unwrap_or(fallback.arrange),
            act: draft.act.unwrap_or(fallback.act),
            assertion: draft.assertion.unwrap_or(fallback.assertion),
        };
        (narration, used_fallback)
    }
}

/// Executable step bodies, one line per entry, not yet indented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSteps {
    pub arrange: Vec<String>,
    pub act: Vec<String>,
    pub assertion: Vec<String>,
}

impl CodeSteps {
    pub fn ui_navigation() -> String {
        "page.goto(BASE_URL)".to_string()
    }

    /// Navigation is guaranteed in arrange; empty act/assert become
    /// placeholder lines carrying [`PLACEHOLDER_MARKER`]. The flag is set
    /// when the client fell back or a placeholder was inserted.
    pub fn resolve_ui(outcome: Outcome<CodeDraft>) -> (Self, bool) {
        let (draft, fell_back) = match outcome {
            Outcome::Ok(draft) => (draft, false),
            Outcome::Fallback(_) => (CodeDraft::default(), true),
        };

        let mut arrange = draft.arrange;
        if !arrange.iter().any(|line| line.contains("page.goto(")) {
            arrange.insert(0, Self::ui_navigation());
        }

        let incomplete = draft.act.is_empty() || draft.assertion.is_empty();
        let act = or_placeholder(draft.act, "act");
        let assertion = or_placeholder(draft.assertion, "assert");

        (
            Self {
                arrange,
                act,
                assertion,
            },
            fell_back || incomplete,
        )
    }

    /// Each empty list is replaced by its deterministic request code.
    pub fn resolve_api(outcome: Outcome<CodeDraft>, req: &ApiRequirement) -> (Self, bool) {
        let (draft, fell_back) = match outcome {
            Outcome::Ok(draft) => (draft, false),
            Outcome::Fallback(_) => (CodeDraft::default(), true),
        };
        let fallback = Self::api_fallback(req);
        let used_fallback = fell_back
            || draft.arrange.is_empty()
            || draft.act.is_empty()
            || draft.assertion.is_empty();

        let pick = |lines: Vec<String>, default: Vec<String>| {
            if lines.is_empty() {
                default
            } else {
                lines
            }
        };

        (
            Self {
                arrange: pick(draft.arrange, fallback.arrange),
                act: pick(draft.act, fallback.act),
                assertion: pick(draft.assertion, fallback.assertion),
            },
            used_fallback,
        )
    }

    pub fn api_fallback(req: &ApiRequirement) -> Self {
        Self {
            arrange: vec![
                format!("url = BASE_URL + \"{}\"", req.path.replace('"', "\\\"")),
                "headers = {\"Authorization\": f\"Bearer {userPlaneApiToken}\"}".to_string(),
            ],
            act: vec![format!(
                "response = requests.{}(url, headers=headers)",
                req.method.to_lowercase()
            )],
            assertion: vec![format!(
                "assert response.status_code == {}",
                req.success_code
            )],
        }
    }

    pub(crate) fn indented(&self) -> IndentedCode {
        IndentedCode {
            arrange: indent(&self.arrange),
            act: indent(&self.act),
            assertion: indent(&self.assertion),
        }
    }
}

/// Step bodies ready to drop into a `with allure.step(...)` block.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct IndentedCode {
    pub arrange: String,
    pub act: String,
    pub assertion: String,
}

fn or_placeholder(lines: Vec<String>, step: &str) -> Vec<String> {
    if lines.is_empty() {
        vec![format!(
            "pass  # {}: {} step was not generated",
            PLACEHOLDER_MARKER, step
        )]
    } else {
        lines
    }
}

fn indent(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("{}{}", CODE_INDENT, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Files written and requirements that could not be written in one
/// generator run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub written: Vec<PathBuf>,
    /// `(requirement id, error message)`
    pub failed: Vec<(String, String)>,
    /// Requirements where at least one step used deterministic fallback.
    pub fallbacks: Vec<String>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
