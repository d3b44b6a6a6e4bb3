//! Unified scanner: runs every enabled adapter over a workspace,
//! isolates their failures, times them, and aggregates the findings.

use crate::adapters::{adapter_by_name, ToolAdapter};
use futures::FutureExt;
use pitcrew_core::{dedup_findings, Finding, ScanConfig};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// A defect inside the scanner framework itself (an adapter panicking
/// out of its guard). Unlike a [`crate::adapters::ToolError`], this is
/// fatal to the job.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("scanner defect in adapter {tool}: {message}")]
    Fatal { tool: String, message: String },
}

/// Runs adapters sequentially in declared order. One instance per job;
/// instances never share workspaces.
pub struct UnifiedScanner {
    adapters: Vec<Box<dyn ToolAdapter>>,
}

impl UnifiedScanner {
    /// Build the adapter list from the manifest's `enabled_tools`.
    /// Unknown names are logged and skipped, preserving order.
    pub fn from_config(config: &ScanConfig) -> Self {
        let mut adapters = Vec::new();
        for name in &config.enabled_tools {
            match adapter_by_name(name) {
                Some(adapter) => adapters.push(adapter),
                None => warn!(tool = %name, "unknown tool in enabled_tools, skipping"),
            }
        }
        Self { adapters }
    }

    /// Inject a fixed adapter set (tests).
    pub fn with_adapters(adapters: Vec<Box<dyn ToolAdapter>>) -> Self {
        Self { adapters }
    }

    /// Run all adapters and return the deduplicated aggregate.
    ///
    /// A `ToolError` from one adapter is logged and the rest still run;
    /// if every adapter fails the scan yields an empty list with a
    /// warning. Only a panic escaping an adapter aborts the run.
    pub async fn run(
        &self,
        repo_root: &Path,
        files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<Vec<Finding>, ScannerError> {
        let run_started = Instant::now();
        let mut findings = Vec::new();
        let mut timings = Vec::new();
        let mut attempted = 0usize;
        let mut succeeded = 0usize;

        for adapter in &self.adapters {
            let tool = adapter.name();

            if !adapter.is_available(repo_root).await {
                warn!(tool, "analyzer binary not available, skipping");
                continue;
            }

            attempted += 1;
            let started = Instant::now();
            let outcome = std::panic::AssertUnwindSafe(adapter.run(repo_root, files, config))
                .catch_unwind()
                .await;
            let elapsed = started.elapsed();
            timings.push(format!("{tool}={:.1}s", elapsed.as_secs_f64()));

            match outcome {
                Ok(Ok(report)) => {
                    succeeded += 1;
                    findings.extend(report.findings);
                }
                Ok(Err(err)) => {
                    error!(tool, %err, "adapter failed, continuing with remaining tools");
                }
                Err(panic) => {
                    return Err(ScannerError::Fatal {
                        tool: tool.to_string(),
                        message: panic_message(panic),
                    });
                }
            }
        }

        if attempted > 0 && succeeded == 0 {
            warn!("all adapters failed, returning empty findings");
        }

        let findings = dedup_findings(findings);
        info!(
            tools = %timings.join(" "),
            total_secs = run_started.elapsed().as_secs_f64(),
            findings = findings.len(),
            "scan complete"
        );
        Ok(findings)
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
