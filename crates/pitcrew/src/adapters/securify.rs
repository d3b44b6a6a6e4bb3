//! Securify: comprehensive whole-tree analysis, one long invocation per
//! repository. Optional in minimal deployments.

use super::{ToolAdapter, ToolError, ToolReport};
use crate::exec;
use pitcrew_core::{filter_min_severity, normalize_repo_path, Finding, ScanConfig, Severity};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Whole-tree analysis is by far the slowest adapter.
const TIMEOUT: Duration = Duration::from_secs(600);

pub struct SecurifyAdapter;

#[derive(Debug, Deserialize)]
struct SecurifyOutput {
    #[serde(default)]
    results: Vec<SecurifyResult>,
}

#[derive(Debug, Deserialize)]
struct SecurifyResult {
    pattern: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    description: String,
}

impl SecurifyAdapter {
    fn findings_from_json(&self, stdout: &str) -> Result<Vec<Finding>, ToolError> {
        let output: SecurifyOutput =
            serde_json::from_str(stdout).map_err(|e| ToolError::Unparseable {
                tool: "securify",
                reason: e.to_string(),
            })?;

        let findings = output
            .results
            .into_iter()
            .map(|result| {
                let raw = serde_json::json!({
                    "pattern": result.pattern.clone(),
                    "severity": result.severity.clone(),
                });
                Finding {
                    tool: "securify".to_string(),
                    rule: result.pattern.clone(),
                    severity: self.map_severity(&result.severity),
                    confidence: None,
                    title: result.pattern,
                    description: result.description.trim().to_string(),
                    file: result
                        .file
                        .as_deref()
                        .map(normalize_repo_path)
                        .unwrap_or_default(),
                    line: result.line.unwrap_or(0),
                    raw: Some(raw),
                }
            })
            .collect();
        Ok(findings)
    }
}

#[async_trait::async_trait]
impl ToolAdapter for SecurifyAdapter {
    fn name(&self) -> &'static str {
        "securify"
    }

    /// Securify classifies matches rather than grading them.
    fn map_severity(&self, native: &str) -> Severity {
        match native.to_ascii_lowercase().as_str() {
            "violation" => Severity::High,
            "warning" => Severity::Medium,
            "conflict" => Severity::Low,
            "safe" => Severity::Informational,
            other => Severity::parse(other),
        }
    }

    async fn run(
        &self,
        repo_root: &Path,
        _files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<ToolReport, ToolError> {
        // Tree analyzer: always runs over the workspace root and ignores
        // the candidate list.
        let args = [".", "--json"];
        let out = exec::run_command("securify", &args, repo_root, TIMEOUT)
            .await
            .map_err(|source| ToolError::Exec {
                tool: "securify",
                source,
            })?;
        if !out.success() {
            return Err(ToolError::Failed {
                tool: "securify",
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            });
        }

        let findings = self.findings_from_json(&out.stdout)?;
        debug!(count = findings.len(), "securify reported findings");

        Ok(ToolReport {
            findings: filter_min_severity(findings, config.min_severity),
            logs: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results() {
        let stdout = serde_json::json!({
            "results": [{
                "pattern": "DAOConstantGas",
                "severity": "Violation",
                "file": "contracts/Vault.sol",
                "line": 17,
                "description": "Gas-dependent reentrancy guard."
            }]
        })
        .to_string();

        let findings = SecurifyAdapter.findings_from_json(&stdout).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "DAOConstantGas");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].line, 17);
    }

    #[test]
    fn classification_vocabulary_maps_to_scale() {
        let adapter = SecurifyAdapter;
        assert_eq!(adapter.map_severity("Violation"), Severity::High);
        assert_eq!(adapter.map_severity("Warning"), Severity::Medium);
        assert_eq!(adapter.map_severity("safe"), Severity::Informational);
    }
}
