//! OpenAPI 3 → [`ApiRequirementsDocument`].
//!
//! Only what test generation needs is read: method, path, summary, tags and
//! response codes.

use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{ApiRequirement, ApiRequirementsDocument, Priority, Section};

pub const DEFAULT_FEATURE: &str = "Evolution Compute API v3";
pub const DEFAULT_BASE_URL: &str = "https://compute.api.cloud.ru";

const METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];
const PREFERRED_SUCCESS: [u16; 4] = [200, 201, 202, 204];

pub fn parse_file(path: &Path) -> Result<ApiRequirementsDocument> {
    let text = std::fs::read_to_string(path)?;
    parse_text(&text)
}

/// YAML first, then JSON. A document that is not a mapping under either
/// reading is rejected.
pub fn parse_text(text: &str) -> Result<ApiRequirementsDocument> {
    let root = match serde_yaml::from_str::<Value>(text) {
        Ok(value @ Value::Mapping(_)) => value,
        yaml_result => {
            let yaml_error = match yaml_result {
                Ok(_) => "document is not a mapping".to_string(),
                Err(e) => e.to_string(),
            };
            match serde_json::from_str::<Value>(text) {
                Ok(value @ Value::Mapping(_)) => value,
                Ok(_) => {
                    return Err(Error::SpecParse {
                        yaml: yaml_error,
                        json: "document is not an object".to_string(),
                    })
                }
                Err(e) => {
                    return Err(Error::SpecParse {
                        yaml: yaml_error,
                        json: e.to_string(),
                    })
                }
            }
        }
    };
    Ok(parse_value(&root))
}

fn parse_value(root: &Value) -> ApiRequirementsDocument {
    let feature = root
        .get("info")
        .and_then(|info| info.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_FEATURE)
        .to_string();

    let base_url = root
        .get("servers")
        .and_then(Value::as_sequence)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string();

    let mut requirements = Vec::new();
    let mut skipped = 0usize;

    if let Some(paths) = root.get("paths").and_then(Value::as_mapping) {
        for (path_key, path_item) in paths {
            let Some(path) = path_key.as_str() else { continue };
            for method in METHODS {
                let Some(op) = path_item.get(method).filter(|op| op.is_mapping()) else {
                    continue;
                };
                match requirement_for(path, method, op) {
                    Some(req) => requirements.push(req),
                    None => skipped += 1,
                }
            }
        }
    }

    info!(
        feature = %feature,
        requirements = requirements.len(),
        skipped,
        "Parsed OpenAPI specification"
    );

    ApiRequirementsDocument::new(feature, base_url, requirements)
}

fn requirement_for(path: &str, method: &str, op: &Value) -> Option<ApiRequirement> {
    let tags: Vec<String> = op
        .get("tags")
        .and_then(Value::as_sequence)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let section = infer_section(&tags, path);
    if !section.is_supported() {
        debug!(path, method, "Operation outside VMs/Disks/Flavors skipped");
        return None;
    }

    let non_empty = |key: &str| {
        op.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let summary = non_empty("summary")
        .or_else(|| non_empty("description"))
        .unwrap_or_else(|| format!("{} {}", method.to_uppercase(), path));
    let operation_id = non_empty("operationId");

    let codes = response_codes(op.get("responses").and_then(Value::as_mapping));
    let success_code = pick_success_code(&codes);
    let error_codes = codes
        .iter()
        .filter(|code| code.starts_with('4') || code.starts_with('5'))
        .filter_map(|code| code.parse::<u16>().ok())
        .collect();

    let priority = if method == "get" {
        Priority::Normal
    } else {
        Priority::Critical
    };

    Some(ApiRequirement {
        id: make_requirement_id(section, method, path, operation_id.as_deref()),
        section,
        method: method.to_uppercase(),
        path: path.to_string(),
        summary,
        priority,
        tag: tags.first().cloned(),
        operation_id,
        success_code,
        error_codes,
    })
}

// Response keys are integers when unquoted in YAML.
fn response_codes(responses: Option<&Mapping>) -> Vec<String> {
    responses
        .map(|responses| {
            responses
                .keys()
                .filter_map(|key| match key {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn infer_section(tags: &[String], path: &str) -> Section {
    let joined_tags = tags.join(" ").to_lowercase();
    let path_lower = path.to_lowercase();

    if joined_tags.contains("vm") || path_lower.contains("/vms") {
        Section::Vms
    } else if joined_tags.contains("disk") || path_lower.contains("/disks") {
        Section::Disks
    } else if joined_tags.contains("flavor") || path_lower.contains("/flavors") {
        Section::Flavors
    } else {
        Section::Other
    }
}

/// 200, 201, 202, 204 in that order; else the first numeric code below 400;
/// else 200.
pub fn pick_success_code(codes: &[String]) -> u16 {
    for candidate in PREFERRED_SUCCESS {
        if codes.iter().any(|code| code == &candidate.to_string()) {
            return candidate;
        }
    }
    codes
        .iter()
        .filter_map(|code| code.parse::<u16>().ok())
        .find(|code| *code < 400)
        .unwrap_or(200)
}

pub fn make_requirement_id(
    section: Section,
    method: &str,
    path: &str,
    operation_id: Option<&str>,
) -> String {
    let base = match operation_id {
        Some(op_id) => op_id.to_string(),
        None => format!("{}_{}_{}", section, method, path),
    };
    let mut id = String::from("API");
    let mut pending_sep = true;
    for c in base.chars().flat_map(char::to_uppercase) {
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            if pending_sep {
                id.push('_');
            }
            pending_sep = false;
            id.push(c);
        } else {
            pending_sep = true;
        }
    }
    id
}
