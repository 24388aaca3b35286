use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::Serialize;

use crate::error::Result;
use crate::generators::{AaaNarration, CodeSteps, IndentedCode};
use crate::models::{ApiRequirement, Priority, Section, UiRequirement};
use crate::naming::artifact_stem;

const MANUAL_UI: &str = "manual_ui";
const MANUAL_API: &str = "manual_api";
const AUTO_UI: &str = "auto_ui";
const AUTO_API: &str = "auto_api";

// Body of a double-quoted Python string literal.
handlebars_helper!(py_str: |s: str| escape_py(s));
handlebars_helper!(lower: |s: str| s.to_lowercase());

pub fn escape_py(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// `BLOCK_1_START_PAGE` → `Block1StartPageTests`.
pub fn ui_class_name(block: &str) -> String {
    let mut name: String = block
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lowered = part.to_ascii_lowercase();
            let mut chars = lowered.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if name.is_empty() {
        name.push_str("General");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Block");
    }
    name.push_str("Tests");
    name
}

pub fn api_class_name(section: Section) -> String {
    format!("{}ApiTests", section)
}

#[derive(Serialize)]
struct ManualUiContext<'a> {
    feature: &'a str,
    block: &'a str,
    class_name: String,
    title: &'a str,
    priority: Priority,
    id: &'a str,
    stem: String,
    steps: &'a AaaNarration,
}

#[derive(Serialize)]
struct ManualApiContext<'a> {
    feature: &'a str,
    section: Section,
    class_name: String,
    title: String,
    priority: Priority,
    method: &'a str,
    path: &'a str,
    id: &'a str,
    stem: String,
    steps: &'a AaaNarration,
}

#[derive(Serialize)]
struct AutoUiContext<'a> {
    base_url: &'a str,
    feature: &'a str,
    block: &'a str,
    title: &'a str,
    priority: Priority,
    id: &'a str,
    stem: String,
    steps: &'a AaaNarration,
    code: IndentedCode,
}

#[derive(Serialize)]
struct AutoApiContext<'a> {
    base_url: &'a str,
    feature: &'a str,
    section: Section,
    title: String,
    summary: String,
    priority: Priority,
    method: &'a str,
    path: &'a str,
    id: &'a str,
    stem: String,
    steps: &'a AaaNarration,
    code: IndentedCode,
}

/// The four Python file layouts, compiled once.
pub struct ArtifactTemplates {
    handlebars: Handlebars<'static>,
}

impl ArtifactTemplates {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(no_escape);
        handlebars.register_helper("py_str", Box::new(py_str));
        handlebars.register_helper("lower", Box::new(lower));

        handlebars.register_template_string(MANUAL_UI, include_str!("../../templates/manual_ui.py.hbs"))?;
        handlebars.register_template_string(MANUAL_API, include_str!("../../templates/manual_api.py.hbs"))?;
        handlebars.register_template_string(AUTO_UI, include_str!("../../templates/auto_ui.py.hbs"))?;
        handlebars.register_template_string(AUTO_API, include_str!("../../templates/auto_api.py.hbs"))?;

        Ok(Self { handlebars })
    }

    pub fn manual_ui(&self, feature: &str, req: &UiRequirement, steps: &AaaNarration) -> Result<String> {
        let context = ManualUiContext {
            feature,
            block: &req.block,
            class_name: ui_class_name(&req.block),
            title: &req.title,
            priority: req.priority,
            id: &req.id,
            stem: artifact_stem(&req.id),
            steps,
        };
        Ok(self.handlebars.render(MANUAL_UI, &context)?)
    }

    pub fn manual_api(&self, feature: &str, req: &ApiRequirement, steps: &AaaNarration) -> Result<String> {
        let context = ManualApiContext {
            feature,
            section: req.section,
            class_name: api_class_name(req.section),
            title: format!("{} ({})", req.summary, req.endpoint()),
            priority: req.priority,
            method: &req.method,
            path: &req.path,
            id: &req.id,
            stem: artifact_stem(&req.id),
            steps,
        };
        Ok(self.handlebars.render(MANUAL_API, &context)?)
    }

    pub fn auto_ui(
        &self,
        base_url: &str,
        feature: &str,
        req: &UiRequirement,
        steps: &AaaNarration,
        code: &CodeSteps,
    ) -> Result<String> {
        let context = AutoUiContext {
            base_url,
            feature,
            block: &req.block,
            title: &req.title,
            priority: req.priority,
            id: &req.id,
            stem: artifact_stem(&req.id),
            steps,
            code: code.indented(),
        };
        Ok(self.handlebars.render(AUTO_UI, &context)?)
    }

    pub fn auto_api(
        &self,
        base_url: &str,
        feature: &str,
        req: &ApiRequirement,
        steps: &AaaNarration,
        code: &CodeSteps,
    ) -> Result<String> {
        let context = AutoApiContext {
            base_url,
            feature,
            section: req.section,
            title: format!("{} ({})", req.summary, req.endpoint()),
            summary: req.summary.replace("\"\"\"", "'''").replace('\\', "\\\\"),
            priority: req.priority,
            method: &req.method,
            path: &req.path,
            id: &req.id,
            stem: artifact_stem(&req.id),
            steps,
            code: code.indented(),
        };
        Ok(self.handlebars.render(AUTO_API, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CodeDraft, Outcome};

    fn narration() -> AaaNarration {
        AaaNarration {
            arrange: "Open \"Calculator\"".into(),
            act: "Add a VM".into(),
            assertion: "Total is shown".into(),
        }
    }

    #[test]
    fn test_class_names() {
        assert_eq!(ui_class_name("BLOCK_1_START_PAGE"), "Block1StartPageTests");
        assert_eq!(ui_class_name("main page"), "MainPageTests");
        assert_eq!(ui_class_name("1_intro"), "Block1IntroTests");
        assert_eq!(ui_class_name("___"), "GeneralTests");
        assert_eq!(api_class_name(Section::Vms), "VMsApiTests");
    }

    #[test]
    fn test_escape_py() {
        assert_eq!(escape_py(r#"say "hi"\n"#), r#"say \"hi\"\\n"#);
        assert_eq!(escape_py("two\nlines"), "two\\nlines");
    }

    #[test]
    fn test_manual_ui_render() {
        let templates = ArtifactTemplates::new().unwrap();
        let req = UiRequirement::new("REQ_LOGIN", "BLOCK_1", "User can log in")
            .with_priority(Priority::Critical);
        let content = templates.manual_ui("Calc", &req, &narration()).unwrap();

        assert!(content.contains("class Block1Tests:"));
        assert!(content.contains("@allure.title(\"User can log in\")"));
        assert!(content.contains("@allure.label(\"priority\", \"CRITICAL\")"));
        assert!(content.contains("def test_req_login(self) -> None:"));
        assert!(content.contains("with allure.step(\"Arrange: Open \\\"Calculator\\\"\"):"));
        assert_eq!(content.matches("            ...").count(), 3);
    }

    #[test]
    fn test_auto_ui_render_keeps_code_lines() {
        let templates = ArtifactTemplates::new().unwrap();
        let req = UiRequirement::new("REQ_LOGIN", "BLOCK_1", "User can log in");
        let (code, _) = CodeSteps::resolve_ui(Outcome::Ok(CodeDraft {
            arrange: vec!["page.goto(BASE_URL)".into()],
            act: vec!["page.get_by_role(\"button\", name=\"Log in\").click()".into()],
            assertion: vec!["expect(page.get_by_text(\"Welcome\")).to_be_visible()".into()],
        }));
        let content = templates
            .auto_ui("https://cloud.ru/calculator", "Calc", &req, &narration(), &code)
            .unwrap();

        assert!(content.contains("BASE_URL = \"https://cloud.ru/calculator\""));
        assert!(content.contains("def test_req_login(page: Page) -> None:"));
        assert!(content.contains("        page.get_by_role(\"button\", name=\"Log in\").click()\n"));
        assert!(!content.contains("FIXME"));
    }
}
