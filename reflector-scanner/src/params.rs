use crate::result::ProbeTask;
use std::collections::HashMap;

/// Distinct query parameter names seen per endpoint, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ParameterIndex {
    endpoints: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
}

impl ParameterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: a pair already present is left alone.
    pub fn register(&mut self, endpoint: &str, parameter: &str) {
        let idx = match self.positions.get(endpoint) {
            Some(&idx) => idx,
            None => {
                self.endpoints.push((endpoint.to_string(), Vec::new()));
                let idx = self.endpoints.len() - 1;
                self.positions.insert(endpoint.to_string(), idx);
                idx
            }
        };

        let names = &mut self.endpoints[idx].1;
        if !names.iter().any(|n| n == parameter) {
            names.push(parameter.to_string());
        }
    }

    pub fn parameters_for(&self, endpoint: &str) -> Option<&[String]> {
        self.positions
            .get(endpoint)
            .map(|&idx| self.endpoints[idx].1.as_slice())
    }

    pub fn all_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.endpoints.iter().flat_map(|(endpoint, names)| {
            names
                .iter()
                .map(move |name| (endpoint.as_str(), name.as_str()))
        })
    }

    /// Consumes the index, producing one task per distinct pair.
    pub fn into_tasks(self) -> Vec<ProbeTask> {
        self.endpoints
            .into_iter()
            .flat_map(|(endpoint, names)| {
                names.into_iter().map(move |parameter| ProbeTask {
                    endpoint: endpoint.clone(),
                    parameter,
                })
            })
            .collect()
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn pair_count(&self) -> usize {
        self.endpoints.iter().map(|(_, names)| names.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
