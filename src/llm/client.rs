use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::llm::outcome::{FallbackReason, Outcome};
use crate::llm::prompts;
use crate::llm::provider::{ChatMessage, ChatProvider, ChatRequest, OpenAiCompatibleProvider};
use crate::models::{
    ApiRequirement, ApiRequirementsDocument, RequirementRef, UiRequirement, UiRequirementsDocument,
};

/// Arrange/Act/Assert texts as the model returned them; blank or missing
/// fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrationDraft {
    pub arrange: Option<String>,
    pub act: Option<String>,
    pub assertion: Option<String>,
}

/// Code lines per step as the model returned them, with ellipsis/`pass`/TODO
/// filler removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeDraft {
    pub arrange: Vec<String>,
    pub act: Vec<String>,
    pub assertion: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewVerdict {
    pub ok: bool,
    pub problems: Vec<String>,
}

impl ReviewVerdict {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            problems: Vec::new(),
        }
    }

    pub fn rejected(problems: Vec<String>) -> Self {
        Self { ok: false, problems }
    }
}

/// Typed operations over the language model.
///
/// Only [`requirements_from_text`](GenerationClient::requirements_from_text)
/// and [`refine`](GenerationClient::refine) can fail; every other operation
/// reports problems through [`Outcome::Fallback`].
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn requirements_from_text(
        &self,
        text: &str,
        feature: Option<&str>,
    ) -> Result<UiRequirementsDocument>;

    async fn ui_narration(&self, req: &UiRequirement) -> Outcome<NarrationDraft>;

    async fn api_narration(&self, req: &ApiRequirement) -> Outcome<NarrationDraft>;

    async fn ui_automation(&self, feature: &str, req: &UiRequirement) -> Outcome<CodeDraft>;

    async fn api_automation(
        &self,
        doc: &ApiRequirementsDocument,
        req: &ApiRequirement,
    ) -> Outcome<CodeDraft>;

    async fn review(&self, requirement: RequirementRef<'_>, code: &str) -> Outcome<ReviewVerdict>;

    /// Complete replacement source for the test file.
    async fn refine(
        &self,
        feature: &str,
        requirement: RequirementRef<'_>,
        old_code: &str,
        verdict: &ReviewVerdict,
    ) -> Result<String>;
}

pub struct LlmGenerationClient {
    provider: Arc<dyn ChatProvider>,
    gen_model: String,
    review_model: String,
}

impl LlmGenerationClient {
    /// Fails with [`Error::MissingApiKey`] before any request is made.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider = OpenAiCompatibleProvider::new(config)?;
        Ok(Self::with_provider(
            Arc::new(provider),
            config.gen_model.clone(),
            config.review_model().to_string(),
        ))
    }

    pub fn with_provider(
        provider: Arc<dyn ChatProvider>,
        gen_model: impl Into<String>,
        review_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            gen_model: gen_model.into(),
            review_model: review_model.into(),
        }
    }

    async fn chat(
        &self,
        model: &str,
        (system, user): (String, String),
        json_response: bool,
        temperature: f32,
    ) -> Result<String> {
        self.provider
            .complete(ChatRequest {
                model: model.to_string(),
                messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
                json_response,
                temperature,
            })
            .await
    }

    async fn json_call(
        &self,
        model: &str,
        prompt: (String, String),
        temperature: f32,
    ) -> std::result::Result<Map<String, Value>, FallbackReason> {
        let raw = self
            .chat(model, prompt, true, temperature)
            .await
            .map_err(|e| FallbackReason::Provider(e.to_string()))?;
        parse_json_object(&raw).map_err(FallbackReason::Malformed)
    }
}

#[async_trait]
impl GenerationClient for LlmGenerationClient {
    #[instrument(skip_all, fields(chars = text.len()))]
    async fn requirements_from_text(
        &self,
        text: &str,
        feature: Option<&str>,
    ) -> Result<UiRequirementsDocument> {
        let raw = self
            .chat(&self.gen_model, prompts::requirements_from_text(text, feature), true, 0.2)
            .await?;
        let mut doc = parse_requirements(&raw)?;
        if let Some(feature) = feature.filter(|f| !f.trim().is_empty()) {
            doc.feature = feature.to_string();
        }
        debug!(requirements = doc.requirements.len(), "Requirements extracted");
        Ok(doc)
    }

    #[instrument(skip_all, fields(id = %req.id))]
    async fn ui_narration(&self, req: &UiRequirement) -> Outcome<NarrationDraft> {
        match self.json_call(&self.gen_model, prompts::ui_narration(req), 0.3).await {
            Ok(map) => Outcome::Ok(narration_from_map(&map)),
            Err(reason) => {
                warn!(%reason, "UI narration fell back");
                Outcome::Fallback(reason)
            }
        }
    }

    #[instrument(skip_all, fields(id = %req.id))]
    async fn api_narration(&self, req: &ApiRequirement) -> Outcome<NarrationDraft> {
        match self.json_call(&self.gen_model, prompts::api_narration(req), 0.2).await {
            Ok(map) => Outcome::Ok(narration_from_map(&map)),
            Err(reason) => {
                warn!(%reason, "API narration fell back");
                Outcome::Fallback(reason)
            }
        }
    }

    #[instrument(skip_all, fields(id = %req.id))]
    async fn ui_automation(&self, feature: &str, req: &UiRequirement) -> Outcome<CodeDraft> {
        match self
            .json_call(&self.gen_model, prompts::ui_automation(feature, req), 0.2)
            .await
        {
            Ok(map) => Outcome::Ok(code_from_map(&map)),
            Err(reason) => {
                warn!(%reason, "UI code synthesis fell back");
                Outcome::Fallback(reason)
            }
        }
    }

    #[instrument(skip_all, fields(id = %req.id))]
    async fn api_automation(
        &self,
        doc: &ApiRequirementsDocument,
        req: &ApiRequirement,
    ) -> Outcome<CodeDraft> {
        match self
            .json_call(&self.gen_model, prompts::api_automation(doc, req), 0.2)
            .await
        {
            Ok(map) => Outcome::Ok(code_from_map(&map)),
            Err(reason) => {
                warn!(%reason, "API code synthesis fell back");
                Outcome::Fallback(reason)
            }
        }
    }

    #[instrument(skip_all, fields(id = %requirement.id()))]
    async fn review(&self, requirement: RequirementRef<'_>, code: &str) -> Outcome<ReviewVerdict> {
        let prompt = prompts::review(&requirement.details(), code);
        match self.json_call(&self.review_model, prompt, 0.0).await {
            Ok(map) => Outcome::Ok(verdict_from_map(&map)),
            Err(reason) => {
                warn!(%reason, "Review fell back");
                Outcome::Fallback(reason)
            }
        }
    }

    #[instrument(skip_all, fields(id = %requirement.id()))]
    async fn refine(
        &self,
        feature: &str,
        requirement: RequirementRef<'_>,
        old_code: &str,
        verdict: &ReviewVerdict,
    ) -> Result<String> {
        let prompt = prompts::refine(feature, &requirement.details(), old_code, &verdict.problems);
        let raw = self.chat(&self.gen_model, prompt, false, 0.2).await?;
        let code = strip_code_fences(&raw);
        if code.trim().is_empty() {
            return Err(Error::EmptyRefinement);
        }
        Ok(code)
    }
}

fn parse_requirements(raw: &str) -> Result<UiRequirementsDocument> {
    let map = parse_json_object(raw).map_err(Error::RequirementsParse)?;
    serde_json::from_value(Value::Object(map))
        .map_err(|e| Error::RequirementsParse(format!("unexpected requirements shape: {}", e)))
}

/// Strips markdown fences around a JSON payload.
pub(crate) fn extract_json(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else {
        response.trim()
    }
}

fn parse_json_object(response: &str) -> std::result::Result<Map<String, Value>, String> {
    let candidate = extract_json(response);
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => {
            // Chatty models wrap the object in prose.
            if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
                if start < end {
                    if let Ok(Value::Object(map)) = serde_json::from_str(&candidate[start..=end]) {
                        return Ok(map);
                    }
                }
            }
            Err(format!("{} (raw response: {})", e, truncate(candidate, 200)))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match map.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn narration_from_map(map: &Map<String, Value>) -> NarrationDraft {
    NarrationDraft {
        arrange: text_field(map, "arrange"),
        act: text_field(map, "act"),
        assertion: text_field(map, "assert"),
    }
}

fn is_filler(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed == "..."
        || trimmed == "pass"
        || trimmed.starts_with("pass ")
        || (trimmed.starts_with('#') && trimmed.contains("TODO"))
}

fn code_lines(map: &Map<String, Value>, key: &str) -> Vec<String> {
    let raw: Vec<String> = match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(str::lines)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !is_filler(line))
        .collect()
}

fn code_from_map(map: &Map<String, Value>) -> CodeDraft {
    CodeDraft {
        arrange: code_lines(map, "arrange"),
        act: code_lines(map, "act"),
        assertion: code_lines(map, "assert"),
    }
}

// Missing or non-boolean "ok" counts as no objection.
fn verdict_from_map(map: &Map<String, Value>) -> ReviewVerdict {
    let ok = map.get("ok").and_then(Value::as_bool).unwrap_or(true);
    let problems = match map.get("problems") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };
    ReviewVerdict { ok, problems }
}

/// Code between the first pair of markdown fences, or the whole text.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed.to_string();
    };
    let after = &trimmed[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(after.len());
    let body = &after[body_start..];
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim_matches('\n').trim_end().to_string()
}
