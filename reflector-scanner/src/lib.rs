pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod params;
pub mod prober;
pub mod result;
pub mod scope;
pub mod sink;

pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use fetcher::{FetchOptions, Fetcher};
pub use orchestrator::{FindingCallback, ProbeOrchestrator, ProbeSummary};
pub use params::ParameterIndex;
pub use prober::{ProbeOutcome, Prober};
pub use result::{CrawlResult, Finding, ProbeTask};
pub use sink::{FileSink, ResultSink};
