//! Uniform adapter interface over heterogeneous external analyzers.
//!
//! Each adapter wraps one binary: it builds an explicit argv, runs it
//! with a bounded timeout, parses the native output, and normalizes every
//! record into a canonical [`Finding`] (repo-relative POSIX path, mapped
//! severity, `line = 0` when the tool gave no location). A tool that
//! exits non-zero without interpretable output, or whose output cannot
//! be parsed, raises a [`ToolError`] — never a silent empty list.

mod mythril;
mod oyente;
mod securify;
mod slither;

pub use mythril::MythrilAdapter;
pub use oyente::OyenteAdapter;
pub use securify::SecurifyAdapter;
pub use slither::SlitherAdapter;

use crate::exec::{self, ExecError};
use crate::git;
use pitcrew_core::{Finding, ScanConfig, Severity};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// What one adapter invocation produced: canonical findings plus paths
/// to any file-based artifacts kept for diagnostics.
#[derive(Debug, Default)]
pub struct ToolReport {
    pub findings: Vec<Finding>,
    pub logs: HashMap<String, PathBuf>,
}

/// Per-adapter failures. Caught by the unified scanner so one broken
/// analyzer never takes the others down.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} exited with {exit_code}: {stderr}")]
    Failed {
        tool: &'static str,
        exit_code: i32,
        stderr: String,
    },

    #[error("{tool} produced unparseable output: {reason}")]
    Unparseable { tool: &'static str, reason: String },

    #[error("{tool} execution failed: {source}")]
    Exec {
        tool: &'static str,
        #[source]
        source: ExecError,
    },
}

/// The capability every analyzer wrapper implements.
#[async_trait::async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Stable identifier used in `Finding.tool` and `enabled_tools`.
    fn name(&self) -> &'static str;

    /// Executable looked up on PATH; defaults to the adapter name.
    fn binary(&self) -> &'static str {
        self.name()
    }

    /// Map this tool's native severity vocabulary onto the canonical
    /// scale.
    fn map_severity(&self, native: &str) -> Severity;

    /// Probe whether the external binary is present. Adapters with an
    /// absent binary are skipped with a warning, never a failure.
    async fn is_available(&self, repo_root: &Path) -> bool {
        probe_binary(self.binary(), repo_root).await
    }

    /// Run the analyzer over the workspace.
    ///
    /// `files`, when given, is the pre-filtered candidate list; per-file
    /// adapters iterate it, tree adapters ignore it and scan the root.
    /// Findings below `config.min_severity` are filtered before return.
    async fn run(
        &self,
        repo_root: &Path,
        files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<ToolReport, ToolError>;
}

/// Look up a registered adapter by its config name.
pub fn adapter_by_name(name: &str) -> Option<Box<dyn ToolAdapter>> {
    match name {
        "slither" => Some(Box::new(SlitherAdapter)),
        "mythril" => Some(Box::new(MythrilAdapter)),
        "oyente" => Some(Box::new(OyenteAdapter)),
        "securify" => Some(Box::new(SecurifyAdapter)),
        _ => None,
    }
}

/// Quick `--version` probe with a short timeout.
pub(crate) async fn probe_binary(binary: &str, cwd: &Path) -> bool {
    matches!(
        exec::run_command(binary, &["--version"], cwd, Duration::from_secs(10)).await,
        Ok(out) if out.success()
    )
}

/// Candidate files for per-file adapters when no diff list was supplied
/// (baseline scans): every `.sol` under `contracts_path` that the
/// manifest does not ignore, in walk order.
pub(crate) fn collect_solidity_files(repo_root: &Path, config: &ScanConfig) -> Vec<String> {
    let base = if config.contracts_path == "." {
        repo_root.to_path_buf()
    } else {
        repo_root.join(&config.contracts_path)
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(&base).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(repo_root) else {
            continue;
        };
        let path = relative.to_string_lossy().replace('\\', "/");
        if !path.ends_with(".sol") {
            continue;
        }
        if git::is_ignored(&path, config) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    files
}
