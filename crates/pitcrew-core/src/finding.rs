use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical issue record produced by a tool adapter.
///
/// `file` is always a forward-slash path relative to the repository root
/// of the checked-out head revision; `line` is 1-based with `0` meaning
/// the finding applies to the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Name of the producing adapter ("slither", "mythril", ...).
    pub tool: String,

    /// Tool-native rule or detector identifier.
    #[serde(rename = "type")]
    pub rule: String,

    /// Normalized severity.
    pub severity: Severity,

    /// Tool-reported confidence, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,

    /// Short human label.
    pub title: String,

    /// Free-text description.
    pub description: String,

    /// Repository-relative POSIX path.
    pub file: String,

    /// 1-based line; 0 = file-level.
    pub line: u32,

    /// The tool's original record, preserved for debugging only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Finding {
    /// Deterministic identity of this finding across runs.
    ///
    /// The tool name is part of the identity by policy: the same logical
    /// vulnerability surfaced by two analyzers stays attributed to each.
    pub fn fingerprint(&self) -> String {
        format!("{}|{}|{}|{}", self.tool, self.rule, self.file, self.line)
    }
}

/// Normalize a path reported by a tool to a repo-relative POSIX path.
///
/// Backslashes become forward slashes; leading `./` and `/` are stripped.
pub fn normalize_repo_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    let mut rest = forward.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.to_string()
}

/// Drop findings below the severity floor.
pub fn filter_min_severity(findings: Vec<Finding>, min: Severity) -> Vec<Finding> {
    findings
        .into_iter()
        .filter(|f| f.severity.at_least(min))
        .collect()
}

/// Deduplicate by fingerprint, order-preserving: first occurrence wins.
pub fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert(f.fingerprint()))
        .collect()
}
