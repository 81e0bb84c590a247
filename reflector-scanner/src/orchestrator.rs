use crate::error::Result;
use crate::prober::{ProbeOutcome, Prober};
use crate::result::{Finding, ProbeTask};
use crate::sink::ResultSink;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 20;

/// Called once for each distinct finding, as soon as it is seen.
pub type FindingCallback = Arc<dyn Fn(&Finding) + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeSummary {
    /// Distinct findings, sorted by URL.
    pub findings: Vec<Finding>,
    pub not_reflected: usize,
    /// Probes whose request failed.
    pub inconclusive: usize,
}

#[derive(Default)]
struct Aggregate {
    findings: HashMap<String, Finding>,
    not_reflected: usize,
    inconclusive: usize,
}

/// Runs one probe per task on the tokio runtime.
///
/// `concurrency` caps in-flight probes with a semaphore; `0` removes the cap
/// and lets every task hit the network at once.
pub struct ProbeOrchestrator {
    prober: Arc<Prober>,
    concurrency: usize,
    finding_callback: Option<FindingCallback>,
}

impl ProbeOrchestrator {
    pub fn new(prober: Prober) -> Self {
        Self {
            prober: Arc::new(prober),
            concurrency: DEFAULT_CONCURRENCY,
            finding_callback: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_finding_callback(mut self, callback: FindingCallback) -> Self {
        self.finding_callback = Some(callback);
        self
    }

    /// Returns only once every task has finished.
    pub async fn run(&self, tasks: Vec<ProbeTask>, sink: Arc<dyn ResultSink>) -> Result<ProbeSummary> {
        info!(
            "Probing {} parameters (concurrency: {})",
            tasks.len(),
            if self.concurrency == 0 {
                "unbounded".to_string()
            } else {
                self.concurrency.to_string()
            }
        );

        let semaphore = (self.concurrency > 0).then(|| Arc::new(Semaphore::new(self.concurrency)));
        let aggregate = Arc::new(Mutex::new(Aggregate::default()));

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let prober = self.prober.clone();
            let semaphore = semaphore.clone();
            let aggregate = aggregate.clone();
            let sink = sink.clone();
            let callback = self.finding_callback.clone();

            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let outcome = prober.probe(&task.endpoint, &task.parameter).await;

                let mut aggregate = aggregate.lock().await;
                match outcome {
                    ProbeOutcome::Reflected(finding) => {
                        if aggregate.findings.contains_key(&finding.url) {
                            return;
                        }
                        if let Err(e) = sink.append_finding(&finding) {
                            warn!("Could not record finding {}: {}", finding.url, e);
                        }
                        if let Some(ref callback) = callback {
                            callback(&finding);
                        }
                        aggregate.findings.insert(finding.url.clone(), finding);
                    }
                    ProbeOutcome::NotReflected => aggregate.not_reflected += 1,
                    ProbeOutcome::Unknown(reason) => {
                        debug!("Inconclusive probe {}={}: {}", task.endpoint, task.parameter, reason);
                        aggregate.inconclusive += 1;
                    }
                }
            }));
        }

        for joined in join_all(handles).await {
            joined?;
        }

        let mut aggregate = aggregate.lock().await;
        let mut findings: Vec<Finding> = aggregate.findings.drain().map(|(_, f)| f).collect();
        findings.sort_by(|a, b| a.url.cmp(&b.url));

        info!(
            "Probing complete: {} reflected, {} not reflected, {} inconclusive",
            findings.len(),
            aggregate.not_reflected,
            aggregate.inconclusive
        );

        Ok(ProbeSummary {
            findings,
            not_reflected: aggregate.not_reflected,
            inconclusive: aggregate.inconclusive,
        })
    }
}
