use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

/// Fixed manifest filename, looked up at the repository root only.
pub const MANIFEST_FILE: &str = "audit-pit-crew.yml";

/// Per-repository scan manifest (the `scan:` section of
/// `audit-pit-crew.yml`). All fields optional in the file; missing fields
/// take the defaults below. Unknown fields reject the whole manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScanConfig {
    /// Repository-relative root of the sources to scan.
    pub contracts_path: String,

    /// Shell-style glob patterns; matching files are never scanned.
    pub ignore_paths: Vec<String>,

    /// Findings below this severity are not reported.
    pub min_severity: Severity,

    /// Findings at or above this severity fail the gating check.
    pub block_on_severity: Severity,

    /// Adapter names to run, in order.
    pub enabled_tools: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            contracts_path: ".".to_string(),
            ignore_paths: vec!["node_modules/**".to_string(), "test/**".to_string()],
            min_severity: Severity::Low,
            block_on_severity: Severity::High,
            enabled_tools: vec!["slither".to_string(), "mythril".to_string()],
        }
    }
}

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    scan: Option<ScanConfig>,
}

impl ScanConfig {
    /// Load the manifest from a checked-out repository root.
    ///
    /// This never fails: a missing file, a parse error, or a schema
    /// violation all degrade to the default configuration. A committed
    /// manifest must not be able to jam the pipeline.
    pub fn load(repo_root: &Path) -> ScanConfig {
        let path = repo_root.join(MANIFEST_FILE);
        let contents = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no scan manifest, using defaults");
                return ScanConfig::default();
            }
            Err(err) => {
                error!(path = %path.display(), %err, "failed to read scan manifest, using defaults");
                return ScanConfig::default();
            }
        };
        ScanConfig::parse_manifest(&contents)
    }

    /// Parse manifest bytes; any failure yields the defaults.
    pub fn parse_manifest(bytes: &[u8]) -> ScanConfig {
        match serde_yaml::from_slice::<Manifest>(bytes) {
            Ok(manifest) => manifest.scan.unwrap_or_default(),
            Err(err) => {
                error!(%err, "invalid scan manifest, using defaults");
                ScanConfig::default()
            }
        }
    }
}
