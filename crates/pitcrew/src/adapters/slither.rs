//! Slither: AST-pattern analysis over Solidity sources.

use super::{ToolAdapter, ToolError, ToolReport};
use crate::exec;
use pitcrew_core::{filter_min_severity, normalize_repo_path, Finding, ScanConfig, Severity};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const TIMEOUT: Duration = Duration::from_secs(300);

/// Fast AST-pattern analyzer. Runs over the whole tree, or once per file
/// when the orchestrator supplies the changed-file list.
pub struct SlitherAdapter;

#[derive(Debug, Deserialize)]
struct SlitherOutput {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: SlitherResults,
}

#[derive(Debug, Default, Deserialize)]
struct SlitherResults {
    #[serde(default)]
    detectors: Vec<SlitherDetector>,
}

#[derive(Debug, Deserialize)]
struct SlitherDetector {
    check: String,
    impact: String,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    elements: Vec<SlitherElement>,
}

#[derive(Debug, Deserialize)]
struct SlitherElement {
    #[serde(default)]
    source_mapping: Option<SourceMapping>,
}

#[derive(Debug, Deserialize)]
struct SourceMapping {
    #[serde(default)]
    filename_relative: Option<String>,
    #[serde(default)]
    lines: Vec<u32>,
}

impl SlitherAdapter {
    fn findings_from_json(&self, stdout: &str) -> Result<Vec<Finding>, ToolError> {
        let output: SlitherOutput =
            serde_json::from_str(stdout).map_err(|e| ToolError::Unparseable {
                tool: "slither",
                reason: e.to_string(),
            })?;
        if !output.success {
            return Err(ToolError::Unparseable {
                tool: "slither",
                reason: output.error.unwrap_or_else(|| "tool reported failure".to_string()),
            });
        }

        let findings = output
            .results
            .detectors
            .into_iter()
            .map(|det| {
                let raw = serde_json::json!({
                    "check": det.check.clone(),
                    "impact": det.impact.clone(),
                    "description": det.description.clone(),
                });
                let (file, line) = det
                    .elements
                    .first()
                    .and_then(|el| el.source_mapping.as_ref())
                    .map(|sm| {
                        (
                            sm.filename_relative
                                .as_deref()
                                .map(normalize_repo_path)
                                .unwrap_or_default(),
                            sm.lines.first().copied().unwrap_or(0),
                        )
                    })
                    .unwrap_or_default();
                Finding {
                    tool: "slither".to_string(),
                    rule: det.check.clone(),
                    severity: self.map_severity(&det.impact),
                    confidence: det.confidence,
                    title: det.check,
                    description: det.description.trim().to_string(),
                    file,
                    line,
                    raw: Some(raw),
                }
            })
            .collect();
        Ok(findings)
    }
}

#[async_trait::async_trait]
impl ToolAdapter for SlitherAdapter {
    fn name(&self) -> &'static str {
        "slither"
    }

    fn map_severity(&self, native: &str) -> Severity {
        match native.to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "informational" | "optimization" => Severity::Informational,
            other => Severity::parse(other),
        }
    }

    async fn run(
        &self,
        repo_root: &Path,
        files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<ToolReport, ToolError> {
        let targets: Vec<String> = match files {
            Some(files) => files.to_vec(),
            None => vec![".".to_string()],
        };

        let mut findings = Vec::new();
        for target in &targets {
            let args = [target.as_str(), "--json", "-"];
            let out = exec::run_command("slither", &args, repo_root, TIMEOUT)
                .await
                .map_err(|source| ToolError::Exec {
                    tool: "slither",
                    source,
                })?;

            // Slither signals findings through its exit code, so parse
            // the JSON first and only treat the run as failed when the
            // output is not interpretable either.
            match self.findings_from_json(&out.stdout) {
                Ok(batch) => {
                    debug!(%target, count = batch.len(), "slither reported findings");
                    findings.extend(batch);
                }
                Err(_) if !out.success() => {
                    return Err(ToolError::Failed {
                        tool: "slither",
                        exit_code: out.exit_code,
                        stderr: out.stderr.trim().to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(ToolReport {
            findings: filter_min_severity(findings, config.min_severity),
            logs: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> String {
        serde_json::json!({
            "success": true,
            "error": null,
            "results": {
                "detectors": [
                    {
                        "check": "reentrancy-eth",
                        "impact": "High",
                        "confidence": "Medium",
                        "description": "Reentrancy in Vault.withdraw()",
                        "elements": [
                            {"source_mapping": {"filename_relative": "./contracts/Vault.sol", "lines": [42, 43]}}
                        ]
                    },
                    {
                        "check": "pragma",
                        "impact": "Informational",
                        "confidence": "High",
                        "description": "Different pragma versions",
                        "elements": []
                    }
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn parses_detectors_into_findings() {
        let findings = SlitherAdapter.findings_from_json(&sample_output()).unwrap();
        assert_eq!(findings.len(), 2);

        let first = &findings[0];
        assert_eq!(first.tool, "slither");
        assert_eq!(first.rule, "reentrancy-eth");
        assert_eq!(first.severity, Severity::High);
        assert_eq!(first.file, "contracts/Vault.sol");
        assert_eq!(first.line, 42);

        // Location-less detector degrades to a file-level finding.
        assert_eq!(findings[1].file, "");
        assert_eq!(findings[1].line, 0);
        assert_eq!(findings[1].severity, Severity::Informational);
    }

    #[test]
    fn tool_reported_failure_is_unparseable() {
        let out = serde_json::json!({"success": false, "error": "solc crashed", "results": {}});
        let err = SlitherAdapter
            .findings_from_json(&out.to_string())
            .unwrap_err();
        assert!(matches!(err, ToolError::Unparseable { .. }));
    }

    #[test]
    fn garbage_output_is_unparseable() {
        assert!(SlitherAdapter.findings_from_json("not json").is_err());
    }

    #[test]
    fn severity_map_covers_native_vocabulary() {
        let adapter = SlitherAdapter;
        assert_eq!(adapter.map_severity("High"), Severity::High);
        assert_eq!(adapter.map_severity("Optimization"), Severity::Informational);
        // Unknown vocabulary falls back to the lenient parser.
        assert_eq!(adapter.map_severity("weird"), Severity::Low);
    }
}
