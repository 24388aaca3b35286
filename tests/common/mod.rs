#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use qagen::config::{Config, GenerationConfig};
use qagen::llm::{
    CodeDraft, FallbackReason, GenerationClient, NarrationDraft, Outcome, ReviewVerdict,
};
use qagen::models::{
    ApiRequirement, ApiRequirementsDocument, Priority, RequirementRef, UiRequirement,
    UiRequirementsDocument,
};
use qagen::{Error, GenerationPipeline, Result};

#[derive(Debug, Clone)]
pub enum ReviewBehaviour {
    Accept,
    Reject(Vec<String>),
    Unavailable,
    Malformed,
}

/// Deterministic [`GenerationClient`] with per-operation call counters.
pub struct StubClient {
    pub requirements: Option<UiRequirementsDocument>,
    pub narration: Option<NarrationDraft>,
    pub code: Option<CodeDraft>,
    pub review: ReviewBehaviour,
    pub refined_code: Option<String>,
    /// Delay UI calls by an id-dependent amount so buffered work finishes
    /// out of order.
    pub stagger: bool,

    pub extract_calls: AtomicUsize,
    pub narration_calls: AtomicUsize,
    pub automation_calls: AtomicUsize,
    pub review_calls: AtomicUsize,
    pub refine_calls: AtomicUsize,
}

impl StubClient {
    pub fn new() -> Self {
        Self {
            requirements: Some(login_document()),
            narration: Some(NarrationDraft {
                arrange: Some("Open the login page".into()),
                act: Some("Submit valid credentials".into()),
                assertion: Some("The success banner is shown".into()),
            }),
            code: Some(login_code()),
            review: ReviewBehaviour::Accept,
            refined_code: Some(
                "import allure\n\n\ndef test_fixed(page) -> None:\n    assert page is not None\n".into(),
            ),
            stagger: false,
            extract_calls: AtomicUsize::new(0),
            narration_calls: AtomicUsize::new(0),
            automation_calls: AtomicUsize::new(0),
            review_calls: AtomicUsize::new(0),
            refine_calls: AtomicUsize::new(0),
        }
    }

    /// Every operation fails the way an unreachable provider would.
    pub fn failing() -> Self {
        Self {
            requirements: None,
            narration: None,
            code: None,
            review: ReviewBehaviour::Unavailable,
            refined_code: None,
            ..Self::new()
        }
    }

    pub fn with_code(mut self, code: Option<CodeDraft>) -> Self {
        self.code = code;
        self
    }

    pub fn with_review(mut self, review: ReviewBehaviour) -> Self {
        self.review = review;
        self
    }

    pub fn with_refined_code(mut self, code: Option<&str>) -> Self {
        self.refined_code = code.map(str::to_string);
        self
    }

    pub fn with_stagger(mut self) -> Self {
        self.stagger = true;
        self
    }

    async fn pause(&self, id: &str) {
        if self.stagger {
            let millis = id.bytes().map(u64::from).sum::<u64>() % 7 * 4;
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn unavailable<T>() -> Outcome<T> {
        Outcome::Fallback(FallbackReason::Provider("connection refused".into()))
    }
}

#[async_trait]
impl GenerationClient for StubClient {
    async fn requirements_from_text(
        &self,
        _text: &str,
        feature: Option<&str>,
    ) -> Result<UiRequirementsDocument> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let mut doc = self
            .requirements
            .clone()
            .ok_or_else(|| Error::RequirementsParse("model returned no JSON".into()))?;
        if let Some(feature) = feature {
            doc.feature = feature.to_string();
        }
        Ok(doc)
    }

    async fn ui_narration(&self, req: &UiRequirement) -> Outcome<NarrationDraft> {
        self.pause(&req.id).await;
        self.narration_calls.fetch_add(1, Ordering::SeqCst);
        self.narration.clone().map_or_else(Self::unavailable, Outcome::Ok)
    }

    async fn api_narration(&self, _req: &ApiRequirement) -> Outcome<NarrationDraft> {
        self.narration_calls.fetch_add(1, Ordering::SeqCst);
        self.narration.clone().map_or_else(Self::unavailable, Outcome::Ok)
    }

    async fn ui_automation(&self, _feature: &str, req: &UiRequirement) -> Outcome<CodeDraft> {
        self.pause(&req.id).await;
        self.automation_calls.fetch_add(1, Ordering::SeqCst);
        self.code.clone().map_or_else(Self::unavailable, Outcome::Ok)
    }

    async fn api_automation(
        &self,
        _doc: &ApiRequirementsDocument,
        _req: &ApiRequirement,
    ) -> Outcome<CodeDraft> {
        self.automation_calls.fetch_add(1, Ordering::SeqCst);
        self.code.clone().map_or_else(Self::unavailable, Outcome::Ok)
    }

    async fn review(&self, requirement: RequirementRef<'_>, _code: &str) -> Outcome<ReviewVerdict> {
        self.pause(requirement.id()).await;
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        match &self.review {
            ReviewBehaviour::Accept => Outcome::Ok(ReviewVerdict::accepted()),
            ReviewBehaviour::Reject(problems) => Outcome::Ok(ReviewVerdict::rejected(problems.clone())),
            ReviewBehaviour::Unavailable => Self::unavailable(),
            ReviewBehaviour::Malformed => {
                Outcome::Fallback(FallbackReason::Malformed("expected value at line 1".into()))
            }
        }
    }

    async fn refine(
        &self,
        _feature: &str,
        _requirement: RequirementRef<'_>,
        _old_code: &str,
        _verdict: &ReviewVerdict,
    ) -> Result<String> {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        self.refined_code.clone().ok_or(Error::EmptyRefinement)
    }
}

pub fn login_requirement() -> UiRequirement {
    UiRequirement::new("REQ_LOGIN", "BLOCK_1", "User can log in").with_priority(Priority::Critical)
}

pub fn login_document() -> UiRequirementsDocument {
    UiRequirementsDocument::new("Cloud.ru Console", vec![login_requirement()])
}

pub fn login_code() -> CodeDraft {
    CodeDraft {
        arrange: vec!["page.goto(BASE_URL)".into()],
        act: vec!["click login".into()],
        assertion: vec!["expect success banner".into()],
    }
}

pub fn generation_settings() -> GenerationConfig {
    Config::default().generation
}

pub fn pipeline(client: Arc<StubClient>) -> GenerationPipeline {
    GenerationPipeline::new(client, &generation_settings()).unwrap()
}

pub fn pipeline_with(client: Arc<StubClient>, settings: GenerationConfig) -> GenerationPipeline {
    GenerationPipeline::new(client, &settings).unwrap()
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

pub const COMPUTE_SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Evolution Compute API
  version: "3"
servers:
  - url: https://compute.api.cloud.ru
paths:
  /v3/vms:
    get:
      tags: [VMs]
      summary: List virtual machines
      responses:
        200:
          description: OK
        404:
          description: Not found
  /v3/disks:
    post:
      tags: [Disks]
      operationId: createDisk
      summary: Create disk
      responses:
        "201":
          description: Created
        "4XX":
          description: Client error
  /v3/networks:
    get:
      tags: [Networks]
      summary: List networks
      responses:
        "200":
          description: OK
"#;
