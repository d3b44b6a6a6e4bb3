//! Oyente: bytecode-pattern analysis, one independent invocation per
//! file.

use super::{collect_solidity_files, ToolAdapter, ToolError, ToolReport};
use crate::exec;
use pitcrew_core::{filter_min_severity, Finding, ScanConfig, Severity};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const TIMEOUT: Duration = Duration::from_secs(300);

pub struct OyenteAdapter;

impl OyenteAdapter {
    /// Oyente groups findings per vulnerability category:
    /// `{"vulnerabilities": {"reentrancy": [entry, ...], ...}}` where an
    /// entry is either a bare message or an object with `line`/`message`.
    fn findings_from_json(&self, stdout: &str, file: &str) -> Result<Vec<Finding>, ToolError> {
        let value: serde_json::Value =
            serde_json::from_str(stdout).map_err(|e| ToolError::Unparseable {
                tool: "oyente",
                reason: e.to_string(),
            })?;
        let vulnerabilities =
            value
                .get("vulnerabilities")
                .and_then(|v| v.as_object())
                .ok_or_else(|| ToolError::Unparseable {
                    tool: "oyente",
                    reason: "missing 'vulnerabilities' object".to_string(),
                })?;

        let mut findings = Vec::new();
        for (rule, entries) in vulnerabilities {
            let Some(entries) = entries.as_array() else {
                continue;
            };
            for entry in entries {
                let (line, message) = match entry {
                    serde_json::Value::String(message) => (0, message.clone()),
                    serde_json::Value::Object(obj) => (
                        obj.get("line").and_then(|l| l.as_u64()).unwrap_or(0) as u32,
                        obj.get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    ),
                    _ => continue,
                };
                findings.push(Finding {
                    tool: "oyente".to_string(),
                    rule: rule.clone(),
                    severity: self.map_severity(rule),
                    confidence: None,
                    title: rule.replace('_', " "),
                    description: message,
                    file: file.to_string(),
                    line,
                    raw: Some(entry.clone()),
                });
            }
        }
        Ok(findings)
    }
}

#[async_trait::async_trait]
impl ToolAdapter for OyenteAdapter {
    fn name(&self) -> &'static str {
        "oyente"
    }

    /// Oyente's vocabulary is its category names.
    fn map_severity(&self, native: &str) -> Severity {
        match native.to_ascii_lowercase().as_str() {
            "reentrancy" | "integer_overflow" | "integer_underflow" => Severity::High,
            "callstack" | "timestamp_dependency" | "transaction_ordering_dependence" => {
                Severity::Medium
            }
            "assertion_failure" => Severity::Low,
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
            // Each file invocation is independent; a file that vanished
            // between diff and scan is skipped, not fatal.
            if !repo_root.join(target).is_file() {
                warn!(%target, "oyente target missing on disk, skipping");
                continue;
            }
            let args = ["-s", target.as_str(), "-j"];
            let out = exec::run_command("oyente", &args, repo_root, TIMEOUT)
                .await
                .map_err(|source| ToolError::Exec {
                    tool: "oyente",
                    source,
                })?;
            if !out.success() {
                return Err(ToolError::Failed {
                    tool: "oyente",
                    exit_code: out.exit_code,
                    stderr: out.stderr.trim().to_string(),
                });
            }
            let batch = self.findings_from_json(&out.stdout, target)?;
            debug!(%target, count = batch.len(), "oyente reported findings");
            findings.extend(batch);
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

    #[test]
    fn parses_category_map() {
        let stdout = serde_json::json!({
            "evm_code_coverage": "82.3%",
            "vulnerabilities": {
                "reentrancy": [{"line": 42, "message": "state written after call"}],
                "timestamp_dependency": ["block timestamp used in branch"],
                "callstack": []
            }
        })
        .to_string();

        let mut findings = OyenteAdapter
            .findings_from_json(&stdout, "contracts/Vault.sol")
            .unwrap();
        findings.sort_by(|a, b| a.rule.cmp(&b.rule));
        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].rule, "reentrancy");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].line, 42);
        assert_eq!(findings[0].file, "contracts/Vault.sol");

        assert_eq!(findings[1].rule, "timestamp_dependency");
        assert_eq!(findings[1].severity, Severity::Medium);
        assert_eq!(findings[1].line, 0);
    }

    #[test]
    fn missing_vulnerabilities_key_is_unparseable() {
        let err = OyenteAdapter
            .findings_from_json("{\"oops\": 1}", "a.sol")
            .unwrap_err();
        assert!(matches!(err, ToolError::Unparseable { .. }));
    }
}
