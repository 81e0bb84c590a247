use crate::error::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Reflector/0.1 (https://github.com/trapdoorsec/reflector)";

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    /// No timeout unless set. A hung server stalls the crawl.
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

/// Single GET requests returning the body as text.
///
/// No retries. Redirects follow reqwest's default policy. Non-2xx responses
/// are not errors: their body is returned like any other.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_str())
            .pool_max_idle_per_host(50) // Connection pooling
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{} -> {} ({} bytes)", url, status.as_u16(), body.len());
        Ok(body)
    }
}
