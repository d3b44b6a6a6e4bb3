//! Report publication: PR comment, error comment, and the gating check
//! run. Every call here is best-effort — a publication failure is logged
//! and never changes the job outcome, because the scan work is already
//! committed by the time the reporter runs.

use crate::hosting::HostingApi;
use pitcrew_core::{Finding, PrContext, Severity};
use pitcrew_github::{CheckConclusion, CheckRunOutput, CheckRunUpdate, CheckStatus, InstallationToken};
use std::cmp::Reverse;
use tracing::{error, info};

/// Name of the gating check shown on the PR.
pub const CHECK_NAME: &str = "pit-crew / security scan";

/// Publishes scan results for one PR job.
pub struct Reporter<'a, H: HostingApi> {
    hosting: &'a H,
    token: &'a InstallationToken,
    owner: &'a str,
    repo: &'a str,
    pr: &'a PrContext,
}

impl<'a, H: HostingApi> Reporter<'a, H> {
    pub fn new(
        hosting: &'a H,
        token: &'a InstallationToken,
        owner: &'a str,
        repo: &'a str,
        pr: &'a PrContext,
    ) -> Self {
        Self {
            hosting,
            token,
            owner,
            repo,
            pr,
        }
    }

    /// Open the check run as `in_progress`. Returns its id, or `None`
    /// when creation failed (later updates are then skipped).
    pub async fn start_check(&self) -> Option<u64> {
        match self
            .hosting
            .create_check_run(
                self.owner,
                self.repo,
                &self.pr.head_sha,
                CHECK_NAME,
                CheckStatus::InProgress,
                self.token,
            )
            .await
        {
            Ok(id) => Some(id),
            Err(err) => {
                error!(%err, "failed to create check run");
                None
            }
        }
    }

    /// Complete the check run with a terminal conclusion.
    pub async fn complete_check(
        &self,
        check_run_id: Option<u64>,
        conclusion: CheckConclusion,
        summary: &str,
    ) {
        let Some(check_run_id) = check_run_id else {
            return;
        };
        let update = CheckRunUpdate {
            status: Some(CheckStatus::Completed),
            conclusion: Some(conclusion),
            output: Some(CheckRunOutput {
                title: CHECK_NAME.to_string(),
                summary: summary.to_string(),
            }),
        };
        if let Err(err) = self
            .hosting
            .update_check_run(self.owner, self.repo, check_run_id, update, self.token)
            .await
        {
            error!(%err, check_run_id, "failed to complete check run");
        }
    }

    /// Publish the findings summary comment (affirmative when empty).
    pub async fn post_report(&self, findings: &[Finding]) {
        let body = format_report(findings);
        if let Err(err) = self
            .hosting
            .post_issue_comment(self.owner, self.repo, self.pr.number, &body, self.token)
            .await
        {
            error!(%err, "failed to post report comment");
        } else {
            info!(new_issues = findings.len(), "posted report comment");
        }
    }

    /// Publish a scan-failure comment with the operator-visible reason.
    pub async fn post_error_report(&self, message: &str) {
        let body = format!(
            "### :warning: pit crew could not complete the security scan\n\n{message}\n\n\
             The merge gate was marked as failed; re-run the check once the underlying \
             problem is fixed."
        );
        if let Err(err) = self
            .hosting
            .post_issue_comment(self.owner, self.repo, self.pr.number, &body, self.token)
            .await
        {
            error!(%err, "failed to post error comment");
        }
    }
}

/// Gate decision: fail the check iff any finding reaches the blocking
/// severity.
pub fn gate_conclusion(findings: &[Finding], block_on: Severity) -> CheckConclusion {
    if findings.iter().any(|f| f.severity.at_least(block_on)) {
        CheckConclusion::Failure
    } else {
        CheckConclusion::Success
    }
}

/// One-line check summary for the PR checks tab.
pub fn check_summary(findings: &[Finding]) -> String {
    match findings.len() {
        0 => "No new security issues.".to_string(),
        1 => "1 new security issue.".to_string(),
        n => format!("{n} new security issues."),
    }
}

/// Render the PR comment: severity groups descending, files ascending,
/// lines ascending within a file.
pub fn format_report(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "### :white_check_mark: pit crew security scan\n\n\
                No new security issues were introduced by this pull request."
            .to_string();
    }

    let mut ordered: Vec<&Finding> = findings.iter().collect();
    ordered.sort_by_key(|f| (Reverse(f.severity), f.file.clone(), f.line));

    let mut body = String::from("### :rotating_light: pit crew security scan\n\n");
    body.push_str(&format!(
        "{} — review before merging.\n",
        check_summary(findings)
    ));

    let mut current: Option<Severity> = None;
    for finding in ordered {
        if current != Some(finding.severity) {
            current = Some(finding.severity);
            body.push_str(&format!("\n#### {}\n\n", finding.severity));
        }
        let location = if finding.line > 0 {
            format!("`{}:{}`", finding.file, finding.line)
        } else {
            format!("`{}`", finding.file)
        };
        body.push_str(&format!(
            "- **{}** ({}) — {} at {}\n",
            finding.rule, finding.tool, finding.title, location
        ));
        let description = finding.description.trim();
        if !description.is_empty() {
            for line in description.lines() {
                body.push_str(&format!("  > {line}\n"));
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(tool: &str, rule: &str, file: &str, line: u32, severity: Severity) -> Finding {
        Finding {
            tool: tool.to_string(),
            rule: rule.to_string(),
            severity,
            confidence: None,
            title: format!("{rule} issue"),
            description: "details".to_string(),
            file: file.to_string(),
            line,
            raw: None,
        }
    }

    #[test]
    fn empty_report_is_affirmative_and_deterministic() {
        let body = format_report(&[]);
        assert!(body.contains("No new security issues"));
        assert_eq!(body, format_report(&[]));
    }

    #[test]
    fn report_orders_by_severity_then_file_then_line() {
        let findings = vec![
            finding("mythril", "SWC-104", "contracts/Vault.sol", 55, Severity::Medium),
            finding("slither", "reentrancy", "contracts/Vault.sol", 42, Severity::High),
            finding("slither", "tx-origin", "contracts/Auth.sol", 9, Severity::High),
        ];
        let body = format_report(&findings);

        let high = body.find("#### High").unwrap();
        let medium = body.find("#### Medium").unwrap();
        assert!(high < medium);

        let auth = body.find("contracts/Auth.sol").unwrap();
        let vault_42 = body.find("contracts/Vault.sol:42").unwrap();
        let vault_55 = body.find("contracts/Vault.sol:55").unwrap();
        assert!(auth < vault_42);
        assert!(vault_42 < vault_55);
    }

    #[test]
    fn file_level_findings_render_without_line() {
        let body = format_report(&[finding("slither", "pragma", "contracts/A.sol", 0, Severity::Low)]);
        assert!(body.contains("`contracts/A.sol`"));
        assert!(!body.contains("contracts/A.sol:0"));
    }

    #[test]
    fn gate_fails_only_at_or_above_blocking_severity() {
        let high = vec![finding("t", "r", "f.sol", 1, Severity::High)];
        let medium = vec![finding("t", "r", "f.sol", 1, Severity::Medium)];
        let informational = vec![finding("t", "r", "f.sol", 1, Severity::Informational)];

        assert_eq!(gate_conclusion(&high, Severity::High), CheckConclusion::Failure);
        assert_eq!(gate_conclusion(&medium, Severity::High), CheckConclusion::Success);
        assert_eq!(gate_conclusion(&[], Severity::High), CheckConclusion::Success);
        // Informational sits below Low on the scale, so it never trips
        // a Low gate.
        assert_eq!(
            gate_conclusion(&informational, Severity::Low),
            CheckConclusion::Success
        );
    }

    #[test]
    fn summary_counts() {
        assert_eq!(check_summary(&[]), "No new security issues.");
        let one = vec![finding("t", "r", "f.sol", 1, Severity::Low)];
        assert_eq!(check_summary(&one), "1 new security issue.");
    }
}
