pub mod report;
pub mod scan;

pub use report::{ReportFormat, Reporter, SilentReporter, generate_scan_report, render_report};
pub use scan::{ScanOptions, ScanSummary, TargetFailure, TargetReport, execute_scan};

pub use reflector_scanner::orchestrator::DEFAULT_CONCURRENCY;
pub use reflector_scanner::prober::DEFAULT_MARKER;
