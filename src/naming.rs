//! Artifact file naming.
//!
//! Generators write and the pipeline re-opens files by this name alone, so
//! there is exactly one implementation of the rule.

/// Lowercase token derived from a requirement id: every run of characters
/// outside `[a-z0-9]` becomes a single `_`, with no leading or trailing `_`.
pub fn artifact_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    let mut pending_sep = false;
    for c in id.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !stem.is_empty() {
                stem.push('_');
            }
            pending_sep = false;
            stem.push(c);
        } else {
            pending_sep = true;
        }
    }
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// `test_<stem>.py`
pub fn artifact_file_name(id: &str) -> String {
    format!("test_{}.py", artifact_stem(id))
}
