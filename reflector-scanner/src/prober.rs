use crate::error::{Result, ScanError};
use crate::fetcher::Fetcher;
use crate::result::Finding;
use tracing::debug;
use url::Url;

pub const DEFAULT_MARKER: &str = "reflect_test_parameter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reflected(Finding),
    NotReflected,
    /// The probe request itself failed, so nothing is known about reflection.
    Unknown(String),
}

impl ProbeOutcome {
    pub fn finding(self) -> Option<Finding> {
        match self {
            ProbeOutcome::Reflected(finding) => Some(finding),
            _ => None,
        }
    }
}

/// Sends the marker in one parameter and looks for it in the response body.
///
/// Plain substring match: HTML, attribute and script contexts are not told apart.
#[derive(Debug, Clone)]
pub struct Prober {
    fetcher: Fetcher,
    marker: String,
}

impl Prober {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            marker: DEFAULT_MARKER.to_string(),
        }
    }

    /// Fails on a blank marker: every body contains the empty string.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.trim().is_empty() {
            return Err(ScanError::Other(
                "reflection marker must not be empty".to_string(),
            ));
        }
        self.marker = marker;
        Ok(self)
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// `endpoint?parameter=<marker>`, with every other parameter omitted.
    pub fn probe_url(&self, endpoint: &str, parameter: &str) -> Result<Url> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| ScanError::MalformedUrl(format!("'{}': {}", endpoint, e)))?;
        url.set_fragment(None);
        url.set_query(None);
        url.query_pairs_mut().append_pair(parameter, &self.marker);
        Ok(url)
    }

    pub async fn probe(&self, endpoint: &str, parameter: &str) -> ProbeOutcome {
        let url = match self.probe_url(endpoint, parameter) {
            Ok(url) => url,
            Err(e) => return ProbeOutcome::Unknown(e.to_string()),
        };

        match self.fetcher.fetch(&url).await {
            Ok(body) if body.contains(&self.marker) => {
                debug!("Reflected: {}", url);
                ProbeOutcome::Reflected(Finding {
                    url: url.to_string(),
                    endpoint: endpoint.to_string(),
                    parameter: parameter.to_string(),
                })
            }
            Ok(_) => ProbeOutcome::NotReflected,
            Err(e) => {
                debug!("Probe of {} failed: {}", url, e);
                ProbeOutcome::Unknown(e.to_string())
            }
        }
    }
}
