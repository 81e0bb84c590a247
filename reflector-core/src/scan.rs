use crate::report::Reporter;
use reflector_scanner::fetcher::DEFAULT_USER_AGENT;
use reflector_scanner::orchestrator::DEFAULT_CONCURRENCY;
use reflector_scanner::prober::DEFAULT_MARKER;
use reflector_scanner::scope::parse_target;
use reflector_scanner::{
    Crawler, FetchOptions, Fetcher, FileSink, Finding, ProbeOrchestrator, Prober, ResultSink,
    ScanError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for configuring a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub targets: Vec<String>,
    pub allow_subdomains: bool,
    pub max_pages: Option<usize>,
    /// Probes in flight at once. `0` means no limit.
    pub concurrency: usize,
    pub timeout: Option<Duration>,
    pub output_root: PathBuf,
    pub marker: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            allow_subdomains: false,
            max_pages: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            output_root: PathBuf::from("."),
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: String,
    pub host: String,
    pub output_folder: String,
    pub pages_visited: usize,
    pub fetch_failures: usize,
    pub endpoints: usize,
    pub parameters: usize,
    pub findings: Vec<Finding>,
    pub not_reflected: usize,
    pub inconclusive: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetFailure {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub marker: String,
    pub targets: Vec<TargetReport>,
    pub failures: Vec<TargetFailure>,
}

impl ScanSummary {
    pub fn total_findings(&self) -> usize {
        self.targets.iter().map(|t| t.findings.len()).sum()
    }
}

/// Crawl and probe every target in turn.
///
/// A target that cannot be parsed, or whose output folder cannot be created, is
/// recorded as a failure and the remaining targets still run. A blank marker
/// fails the whole scan before any request is sent.
pub async fn execute_scan(
    options: ScanOptions,
    reporter: Arc<dyn Reporter>,
) -> Result<ScanSummary, ScanError> {
    let fetcher = Fetcher::new(&FetchOptions {
        user_agent: DEFAULT_USER_AGENT.to_string(),
        timeout: options.timeout,
    })?;
    let prober = Prober::new(fetcher.clone()).with_marker(options.marker.clone())?;

    let mut summary = ScanSummary {
        marker: prober.marker().to_string(),
        ..ScanSummary::default()
    };

    for (idx, target) in options.targets.iter().enumerate() {
        if options.targets.len() > 1 {
            reporter.info(&format!(
                "Scanning target {}/{}: {}",
                idx + 1,
                options.targets.len(),
                target
            ));
        }

        match scan_target(target, &options, &fetcher, &prober, reporter.clone()).await {
            Ok(report) => summary.targets.push(report),
            Err(e) => {
                reporter.error(&format!("Skipping {}: {}", target, e));
                summary.failures.push(TargetFailure {
                    target: target.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

async fn scan_target(
    target: &str,
    options: &ScanOptions,
    fetcher: &Fetcher,
    prober: &Prober,
    reporter: Arc<dyn Reporter>,
) -> Result<TargetReport, ScanError> {
    let url = parse_target(target)?;
    let host = url.host_str().unwrap_or_default().to_string();

    let file_sink = FileSink::create(&options.output_root, &host)?;
    let sink: Arc<dyn ResultSink> = Arc::new(file_sink);

    reporter.info("Crawling the domain for pages and parameters...");

    let progress_reporter = reporter.clone();
    let crawler = Crawler::new(fetcher.clone())
        .with_subdomains(options.allow_subdomains)
        .with_max_pages(options.max_pages)
        .with_progress_callback(Arc::new(move |visited, url| {
            progress_reporter.progress(visited, &url);
        }));

    let crawl = crawler.crawl(&url, sink.as_ref()).await?;
    let pages_visited = crawl.visited.len();
    let fetch_failures = crawl.fetch_failures;
    let endpoints = crawl.parameters.endpoint_count();
    let parameters = crawl.parameters.pair_count();
    let output_folder = crawl.destination.clone();

    reporter.info(&format!("Crawled {} unique pages", pages_visited));
    if fetch_failures > 0 {
        reporter.warn(&format!("{} pages could not be fetched", fetch_failures));
    }
    reporter.info(&format!(
        "Found {} unique parameters across {} endpoints",
        parameters, endpoints
    ));

    reporter.info("Testing for reflected parameters...");
    let finding_reporter = reporter.clone();
    let orchestrator = ProbeOrchestrator::new(prober.clone())
        .with_concurrency(options.concurrency)
        .with_finding_callback(Arc::new(move |finding: &Finding| {
            finding_reporter.success(&format!("[Reflected] {}", finding.url));
        }));

    let probes = orchestrator
        .run(crawl.parameters.into_tasks(), sink.clone())
        .await?;

    if probes.findings.is_empty() {
        reporter.warn("No reflected parameters found.");
    } else {
        reporter.success(&format!(
            "{} reflected parameters found, saved to {}",
            probes.findings.len(),
            output_folder
        ));
    }
    if probes.inconclusive > 0 {
        reporter.warn(&format!(
            "{} probes failed and could not be tested",
            probes.inconclusive
        ));
    }

    info!("Finished {}", url);

    Ok(TargetReport {
        target: url.to_string(),
        host,
        output_folder,
        pages_visited,
        fetch_failures,
        endpoints,
        parameters,
        findings: probes.findings,
        not_reflected: probes.not_reflected,
        inconclusive: probes.inconclusive,
    })
}
