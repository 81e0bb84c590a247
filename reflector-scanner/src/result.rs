use crate::params::ParameterIndex;
use serde::{Deserialize, Serialize};

/// Terminal state of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// Every URL dequeued and fetched (or attempted), in visit order.
    pub visited: Vec<String>,
    pub fetch_failures: usize,
    pub parameters: ParameterIndex,
    /// Where the sink stores pages and findings for this target.
    pub destination: String,
}

impl CrawlResult {
    pub fn new(destination: String) -> Self {
        Self {
            visited: Vec::new(),
            fetch_failures: 0,
            parameters: ParameterIndex::new(),
            destination,
        }
    }
}

/// Unit of probe work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeTask {
    pub endpoint: String,
    pub parameter: String,
}

/// A probe URL whose marker value came back verbatim in the response body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub url: String,
    pub endpoint: String,
    pub parameter: String,
}
