//! Prompt texts for every generation operation.
//!
//! Each builder returns `(system, user)`.

use crate::models::{ApiRequirement, ApiRequirementsDocument, UiRequirement};

pub fn requirements_from_text(text: &str, feature: Option<&str>) -> (String, String) {
    let feature_line = feature
        .map(|f| format!("The product under test is \"{}\"; use it as the feature value.\n", f))
        .unwrap_or_default();

    let system = format!(
        r#"You are an experienced QA lead. Split the UI requirement text you are given into atomic, individually testable requirements.
{feature_line}Return STRICTLY valid JSON, no comments, in this shape:
{{
  "feature": "Product name",
  "requirements": [
    {{
      "id": "REQ_SOME_ID",
      "block": "BLOCK_1_START_PAGE",
      "title": "Short requirement title",
      "description": "Extended description",
      "priority": "CRITICAL" | "NORMAL" | "LOW"
    }}
  ]
}}
Rules:
- id is SCREAMING_SNAKE_CASE, latin letters only, short and unique.
- block names the screen or section of the UI the requirement belongs to.
- Output nothing except the JSON object."#
    );

    let user = format!(
        "Here is the UI requirement text. Split it into separate requirements:\n\n{}",
        text
    );

    (system, user)
}

pub fn ui_narration(req: &UiRequirement) -> (String, String) {
    let system = r#"You are an experienced QA engineer. For each UI requirement write clear steps following the Arrange-Act-Assert pattern.
Answer STRICTLY with JSON, no comments:
{
  "arrange": "...",
  "act": "...",
  "assert": "..."
}
Steps are short, imperative, in the language of the requirement."#
        .to_string();

    let user = format!(
        "Requirement ID: {}\nBlock: {}\nTitle: {}\nDescription: {}\nPriority: {}\n",
        req.id,
        req.block,
        req.title,
        req.description.as_deref().unwrap_or("-"),
        req.priority
    );

    (system, user)
}

pub fn api_narration(req: &ApiRequirement) -> (String, String) {
    let system = r#"You are an experienced API QA engineer.
You get the description of one HTTP endpoint and write understandable step-by-step actions following the AAA pattern.

Return JSON:
{
  "arrange": "what to prepare before the call",
  "act": "what exactly to call",
  "assert": "what to check in the response"
}

One or two sentences per step."#
        .to_string();

    let user = format!(
        "Section: {}\nMethod: {}\nPath: {}\nSummary: {}\nSuccess status code: {}\nError status codes: {:?}",
        req.section, req.method, req.path, req.summary, req.success_code, req.error_codes
    );

    (system, user)
}

pub fn ui_automation(feature: &str, req: &UiRequirement) -> (String, String) {
    let system = r#"You are a senior QA automation engineer.
Write a minimal but working fragment of an automated test in Python + Playwright (sync API).

Context:
- The test module already imports: from playwright.sync_api import Page, expect
- The test function receives a parameter page: Page.
- The module declares a constant BASE_URL with the product URL.
- allure.step blocks already wrap the code, do not write them.

Response requirements:
- Return a JSON object with keys "arrange", "act", "assert".
- Every value is a list of Python code lines (no indentation, no with blocks, no function definitions).
- arrange MUST contain the call page.goto(BASE_URL).
- act describes user actions (locating elements, clicks, typing, ...).
- assert contains real checks via expect or assert.
- Do not use '...', 'pass' or TODO comments.
- Prefer Playwright text/role selectors (get_by_role, get_by_text, ...)."#
        .to_string();

    let user = format!(
        "Feature/product: {}\nBlock/screen: {}\nRequirement ID: {}\nRequirement: {}\nDescription: {}\nPriority: {}\n\nGenerate the Python code for this requirement.",
        feature,
        req.block,
        req.id,
        req.title,
        req.description.as_deref().unwrap_or("-"),
        req.priority
    );

    (system, user)
}

pub fn api_automation(doc: &ApiRequirementsDocument, req: &ApiRequirement) -> (String, String) {
    let system = r#"You are a senior QA automation engineer.
Write a minimal but working fragment of a pytest API test using the requests library.

Context:
- The module already imports requests and declares BASE_URL.
- The test function receives a fixture userPlaneApiToken: str with a bearer token.
- allure.step blocks already wrap the code, do not write them.

Response requirements:
- Return a JSON object with keys "arrange", "act", "assert".
- Every value is a list of Python code lines (no indentation, no with blocks, no function definitions).
- arrange builds url, headers (Authorization: Bearer) and, when needed, the payload.
- act sends the request and stores it in a variable named response.
- assert checks response.status_code and the key fields of the body.
- Do not use '...', 'pass' or TODO comments."#
        .to_string();

    let user = format!(
        "Service: {}\nBase URL: {}\nSection: {}\nEndpoint: {} {}\nSummary: {}\nOperation id: {}\nSuccess status code: {}\nError status codes: {:?}\n\nGenerate the Python code for this endpoint.",
        doc.feature,
        doc.base_url,
        req.section,
        req.method,
        req.path,
        req.summary,
        req.operation_id.as_deref().unwrap_or("-"),
        req.success_code,
        req.error_codes
    );

    (system, user)
}

pub fn review(requirement: &str, test_code: &str) -> (String, String) {
    let system = r#"You are a reviewer of automated tests (senior QA lead).
Given a requirement and the code of its test, judge whether the test really verifies the requirement.

Pay attention to:
- navigation to the right screen or request setup (Arrange),
- the key user actions or the request itself (Act),
- checks that match the essence of the requirement (Assert),
- tests without any expect/assert at all.

Answer strictly in JSON:
{
  "ok": true/false,
  "problems": ["short description of a problem", ...]
}"#
        .to_string();

    let user = format!("Requirement:\n{}\n\nTest code:\n```python\n{}\n```", requirement, test_code);

    (system, user)
}

pub fn refine(feature: &str, details: &str, old_code: &str, problems: &[String]) -> (String, String) {
    let system = r#"You are a senior QA automation engineer.

You receive:
- the requirement,
- an existing automated test in Python,
- the list of problems found by the reviewer.

REWRITE the test so that:
- every reviewer remark is fixed;
- the Arrange / Act / Assert structure with allure.step contexts is kept;
- the same imports and the BASE_URL constant are used;
- there is no '...', 'pass', TODO or redundant comments.

Important:
- Do not write markdown, do not wrap the code in ```python.
- Return ONLY the final Python test code."#
        .to_string();

    let problems_text = if problems.is_empty() {
        "no explicit problems, but make the test a bit better".to_string()
    } else {
        problems
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let user = format!(
        "Feature / product: {}\n{}\n\nExisting test code:\n```python\n{}\n```\n\nReviewer problems:\n{}\n\nRewrite the test taking every remark into account.",
        feature, details, old_code, problems_text
    );

    (system, user)
}
