// Presentation of scan progress and results

use crate::scan::ScanSummary;

/// Where user-facing messages go. The CLI prints them; tests record them.
pub trait Reporter: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn success(&self, msg: &str);
    fn error(&self, msg: &str);

    /// Called for each page before it is fetched.
    fn progress(&self, _visited: usize, _url: &str) {}
}

/// Discards everything.
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn success(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn render_report(summary: &ScanSummary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_scan_report(summary)),
        ReportFormat::Json => serde_json::to_string_pretty(summary),
    }
}

/// Generate a text report from a scan summary
pub fn generate_scan_report(summary: &ScanSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Targets scanned: {}\n", summary.targets.len()));
    if !summary.failures.is_empty() {
        report.push_str(&format!("  Targets failed: {}\n", summary.failures.len()));
    }

    let pages: usize = summary.targets.iter().map(|t| t.pages_visited).sum();
    report.push_str(&format!("  Pages crawled: {}\n", pages));

    let parameters: usize = summary.targets.iter().map(|t| t.parameters).sum();
    report.push_str(&format!("  Parameters tested: {}\n", parameters));
    report.push_str(&format!("  Reflected parameters: {}\n", summary.total_findings()));
    report.push_str(&format!("  Marker: {}\n", summary.marker));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for target in &summary.targets {
        report.push_str(&format!("## {}\n", target.host));
        report.push_str(&format!(
            "  {} pages, {} endpoints, {} parameters\n",
            target.pages_visited, target.endpoints, target.parameters
        ));
        if target.inconclusive > 0 {
            report.push_str(&format!("  {} probes inconclusive\n", target.inconclusive));
        }
        report.push_str(&format!("  Output: {}\n\n", target.output_folder));

        if target.findings.is_empty() {
            report.push_str("  No reflected parameters found.\n");
        } else {
            for finding in &target.findings {
                report.push_str(&format!("  [Reflected] {}\n", finding.url));
            }
        }
        report.push('\n');
    }

    for failure in &summary.failures {
        report.push_str(&format!("## {} (failed)\n", failure.target));
        report.push_str(&format!("  {}\n\n", failure.error));
    }

    report
}
