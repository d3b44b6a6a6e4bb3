//! Mythril: symbolic execution over compiled bytecode, one file at a
//! time, with a bounded exploration depth.

use super::{collect_solidity_files, ToolAdapter, ToolError, ToolReport};
use crate::exec;
use pitcrew_core::{filter_min_severity, normalize_repo_path, Finding, ScanConfig, Severity};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const TIMEOUT: Duration = Duration::from_secs(300);

/// Symbolic-execution depth bound: deep enough to reach nested calls,
/// shallow enough to keep per-file latency inside the timeout.
const MAX_DEPTH: &str = "22";

/// Transaction-exploration budget passed to the solver, in seconds.
const EXECUTION_TIMEOUT: &str = "240";

pub struct MythrilAdapter;

#[derive(Debug, Deserialize)]
struct MythrilOutput {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    issues: Vec<MythrilIssue>,
}

#[derive(Debug, Deserialize)]
struct MythrilIssue {
    #[serde(default)]
    title: String,
    #[serde(rename = "swc-id", default)]
    swc_id: Option<String>,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    lineno: Option<u32>,
}

impl MythrilAdapter {
    fn findings_from_json(&self, stdout: &str, fallback_file: &str) -> Result<Vec<Finding>, ToolError> {
        let output: MythrilOutput =
            serde_json::from_str(stdout).map_err(|e| ToolError::Unparseable {
                tool: "mythril",
                reason: e.to_string(),
            })?;
        if !output.success {
            return Err(ToolError::Unparseable {
                tool: "mythril",
                reason: output.error.unwrap_or_else(|| "tool reported failure".to_string()),
            });
        }

        let findings = output
            .issues
            .into_iter()
            .map(|issue| {
                let raw = Some(serde_json::json!({
                    "title": issue.title.clone(),
                    "swc-id": issue.swc_id.clone(),
                    "severity": issue.severity.clone(),
                }));
                let rule = match &issue.swc_id {
                    Some(id) if !id.is_empty() => format!("SWC-{id}"),
                    _ => issue.title.to_ascii_lowercase().replace(' ', "-"),
                };
                let file = issue
                    .filename
                    .as_deref()
                    .map(normalize_repo_path)
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| fallback_file.to_string());
                Finding {
                    tool: "mythril".to_string(),
                    rule,
                    severity: self.map_severity(&issue.severity),
                    confidence: None,
                    title: issue.title,
                    description: issue.description.trim().to_string(),
                    file,
                    line: issue.lineno.unwrap_or(0),
                    raw,
                }
            })
            .collect();
        Ok(findings)
    }
}

#[async_trait::async_trait]
impl ToolAdapter for MythrilAdapter {
    fn name(&self) -> &'static str {
        "mythril"
    }

    fn binary(&self) -> &'static str {
        "myth"
    }

    fn map_severity(&self, native: &str) -> Severity {
        match native.to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            other => Severity::parse(other),
        }
    }

    async fn run(
        &self,
        repo_root: &Path,
        files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<ToolReport, ToolError> {
        let targets = match files {
            Some(files) => files.to_vec(),
            None => collect_solidity_files(repo_root, config),
        };

        let mut findings = Vec::new();
        for target in &targets {
            if !repo_root.join(target).is_file() {
                warn!(%target, "mythril target missing on disk, skipping");
                continue;
            }
            let args = [
                "analyze",
                target.as_str(),
                "-o",
                "json",
                "--execution-timeout",
                EXECUTION_TIMEOUT,
                "--max-depth",
                MAX_DEPTH,
            ];
            let out = exec::run_command("myth", &args, repo_root, TIMEOUT)
                .await
                .map_err(|source| ToolError::Exec {
                    tool: "mythril",
                    source,
                })?;

            // Mythril exits 1 when issues are found; judge the run by
            // whether the JSON is interpretable.
            match self.findings_from_json(&out.stdout, target) {
                Ok(batch) => {
                    debug!(%target, count = batch.len(), "mythril reported issues");
                    findings.extend(batch);
                }
                Err(_) if !out.success() => {
                    return Err(ToolError::Failed {
                        tool: "mythril",
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
