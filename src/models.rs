use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::naming::artifact_stem;

pub const DEFAULT_UI_FEATURE: &str = "Cloud.ru Price Calculator";
pub const DEFAULT_BLOCK: &str = "GENERAL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    #[default]
    Normal,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "CRITICAL"),
            Priority::Normal => write!(f, "NORMAL"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Ok(Priority::Critical),
            "NORMAL" => Ok(Priority::Normal),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

// Models answer with all sorts of casing; anything unrecognised is NORMAL.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or_default())
    }
}

fn default_block() -> String {
    DEFAULT_BLOCK.to_string()
}

fn default_ui_feature() -> String {
    DEFAULT_UI_FEATURE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiRequirement {
    pub id: String,
    #[serde(default = "default_block")]
    pub block: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl UiRequirement {
    pub fn new(id: impl Into<String>, block: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block: block.into(),
            title: title.into(),
            description: None,
            priority: Priority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiRequirementsDocument {
    pub feature: String,
    pub requirements: Vec<UiRequirement>,
}

#[derive(Deserialize)]
struct RawUiDocument {
    #[serde(default = "default_ui_feature")]
    feature: String,
    #[serde(default)]
    requirements: Vec<UiRequirement>,
}

impl<'de> Deserialize<'de> for UiRequirementsDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawUiDocument::deserialize(deserializer)?;
        Ok(UiRequirementsDocument::new(raw.feature, raw.requirements))
    }
}

impl UiRequirementsDocument {
    pub fn new(feature: impl Into<String>, requirements: Vec<UiRequirement>) -> Self {
        let mut requirements = requirements;
        let ids = dedupe_ids(requirements.iter().map(|r| r.id.clone()).collect());
        for (req, id) in requirements.iter_mut().zip(ids) {
            req.id = id;
        }
        Self {
            feature: feature.into(),
            requirements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "VMs")]
    Vms,
    Disks,
    Flavors,
    Other,
}

impl Section {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Section::Other)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Vms => write!(f, "VMs"),
            Section::Disks => write!(f, "Disks"),
            Section::Flavors => write!(f, "Flavors"),
            Section::Other => write!(f, "Other"),
        }
    }
}

fn default_success_code() -> u16 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequirement {
    pub id: String,
    pub section: Section,
    pub method: String,
    pub path: String,
    pub summary: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default = "default_success_code")]
    pub success_code: u16,
    #[serde(default)]
    pub error_codes: Vec<u16>,
}

impl ApiRequirement {
    pub fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequirementsDocument {
    pub feature: String,
    pub base_url: String,
    pub requirements: Vec<ApiRequirement>,
}

impl ApiRequirementsDocument {
    /// Drops `Other` sections and makes ids unique by artifact name.
    pub fn new(
        feature: impl Into<String>,
        base_url: impl Into<String>,
        requirements: Vec<ApiRequirement>,
    ) -> Self {
        let mut requirements: Vec<ApiRequirement> = requirements
            .into_iter()
            .filter(|r| r.section.is_supported())
            .collect();
        let ids = dedupe_ids(requirements.iter().map(|r| r.id.clone()).collect());
        for (req, id) in requirements.iter_mut().zip(ids) {
            req.id = id;
        }
        Self {
            feature: feature.into(),
            base_url: base_url.into(),
            requirements,
        }
    }
}

/// Either kind of requirement, for code that only needs the common surface.
#[derive(Debug, Clone, Copy)]
pub enum RequirementRef<'a> {
    Ui(&'a UiRequirement),
    Api(&'a ApiRequirement),
}

impl<'a> RequirementRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            RequirementRef::Ui(r) => &r.id,
            RequirementRef::Api(r) => &r.id,
        }
    }

    pub fn title(&self) -> String {
        match self {
            RequirementRef::Ui(r) => r.title.clone(),
            RequirementRef::Api(r) => format!("{} ({})", r.summary, r.endpoint()),
        }
    }

    /// Multi-line description handed to the reviewer and the fixer.
    pub fn details(&self) -> String {
        match self {
            RequirementRef::Ui(r) => format!(
                "Block: {}\nRequirement ID: {}\nTitle: {}\nDescription: {}\nPriority: {}",
                r.block,
                r.id,
                r.title,
                r.description.as_deref().unwrap_or("-"),
                r.priority
            ),
            RequirementRef::Api(r) => format!(
                "Section: {}\nRequirement ID: {}\nEndpoint: {}\nSummary: {}\nExpected status: {}\nError codes: {:?}",
                r.section,
                r.id,
                r.endpoint(),
                r.summary,
                r.success_code,
                r.error_codes
            ),
        }
    }
}

// Suffixes ids whose artifact stem was already taken: REQ, REQ_2, REQ_3...
fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut taken = HashSet::new();
    ids.into_iter()
        .map(|id| {
            if taken.insert(artifact_stem(&id)) {
                return id;
            }
            let mut n = 2;
            loop {
                let candidate = format!("{}_{}", id, n);
                if taken.insert(artifact_stem(&candidate)) {
                    warn!(original = %id, renamed = %candidate, "Duplicate requirement id renamed");
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parsing_is_lenient() {
        let req: UiRequirement =
            serde_json::from_str(r#"{"id":"R1","title":"t","priority":"critical"}"#).unwrap();
        assert_eq!(req.priority, Priority::Critical);
        assert_eq!(req.block, DEFAULT_BLOCK);

        let req: UiRequirement =
            serde_json::from_str(r#"{"id":"R1","title":"t","priority":"urgent"}"#).unwrap();
        assert_eq!(req.priority, Priority::Normal);

        let req: UiRequirement =
            serde_json::from_str(r#"{"id":"R1","title":"t","priority":null}"#).unwrap();
        assert_eq!(req.priority, Priority::Normal);
    }

    #[test]
    fn test_document_defaults_feature() {
        let doc: UiRequirementsDocument =
            serde_json::from_str(r#"{"requirements":[{"id":"A","title":"x"}]}"#).unwrap();
        assert_eq!(doc.feature, DEFAULT_UI_FEATURE);
        assert_eq!(doc.requirements.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_renamed() {
        let doc = UiRequirementsDocument::new(
            "f",
            vec![
                UiRequirement::new("REQ_A", "B", "one"),
                UiRequirement::new("req-a", "B", "two"),
                UiRequirement::new("REQ_A", "B", "three"),
            ],
        );
        let ids: Vec<_> = doc.requirements.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["REQ_A", "req-a_2", "REQ_A_3"]);
        let names: HashSet<_> = doc
            .requirements
            .iter()
            .map(|r| crate::naming::artifact_file_name(&r.id))
            .collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_api_document_drops_other_sections() {
        let make = |id: &str, section| ApiRequirement {
            id: id.to_string(),
            section,
            method: "GET".into(),
            path: "/x".into(),
            summary: "s".into(),
            priority: Priority::Normal,
            tag: None,
            operation_id: None,
            success_code: 200,
            error_codes: vec![],
        };
        let doc = ApiRequirementsDocument::new(
            "api",
            "https://example",
            vec![make("A", Section::Vms), make("B", Section::Other)],
        );
        assert_eq!(doc.requirements.len(), 1);
        assert_eq!(doc.requirements[0].id, "A");
    }
}
