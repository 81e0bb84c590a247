use crate::error::{Result, ScanError};
use crate::fetcher::Fetcher;
use crate::result::CrawlResult;
use crate::scope::{endpoint_of, in_scope, is_web_url, resolve};
use crate::sink::ResultSink;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Called with the running visit count and the URL about to be fetched.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Breadth-first, single flow of control. The frontier and visited set live
/// inside one `crawl` call and are dropped when it returns.
pub struct Crawler {
    fetcher: Fetcher,
    allow_subdomains: bool,
    max_pages: Option<usize>,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            allow_subdomains: false,
            max_pages: None,
            progress_callback: None,
        }
    }

    pub fn with_subdomains(mut self, allow_subdomains: bool) -> Self {
        self.allow_subdomains = allow_subdomains;
        self
    }

    /// Stop after this many visits. Unbounded by default.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, target: &Url, sink: &dyn ResultSink) -> Result<CrawlResult> {
        let target_host = target
            .host_str()
            .ok_or_else(|| ScanError::MalformedUrl(format!("'{}': missing host", target)))?
            .to_string();

        info!(
            "Starting crawl of {} (subdomains: {})",
            target, self.allow_subdomains
        );

        let mut result = CrawlResult::new(sink.destination());
        let mut visited: HashSet<String> = HashSet::new();
        let mut pending: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<Url> = VecDeque::new();

        let mut seed = target.clone();
        seed.set_fragment(None);
        pending.insert(seed.to_string());
        frontier.push_back(seed);

        while let Some(url) = frontier.pop_front() {
            let key = url.to_string();
            pending.remove(&key);

            if visited.contains(&key) {
                continue;
            }

            if let Some(max_pages) = self.max_pages
                && result.visited.len() >= max_pages
            {
                info!(
                    "Page limit of {} reached, {} URLs left unvisited",
                    max_pages,
                    frontier.len() + 1
                );
                break;
            }

            visited.insert(key.clone());
            result.visited.push(key.clone());

            if let Some(ref callback) = self.progress_callback {
                callback(result.visited.len(), key.clone());
            }

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    result.fetch_failures += 1;
                    continue;
                }
            };

            if let Err(e) = sink.save_page(&url, &body) {
                warn!("Could not save page {}: {}", url, e);
            }

            for href in extract_links(&body) {
                let link = match resolve(&url, &href) {
                    Ok(link) => link,
                    Err(e) => {
                        debug!("Ignoring link on {}: {}", url, e);
                        continue;
                    }
                };

                if !is_web_url(&link) {
                    continue;
                }

                if in_scope(&link, &target_host, self.allow_subdomains) {
                    let link_key = link.to_string();
                    if !visited.contains(&link_key) && pending.insert(link_key) {
                        debug!("Queuing {}", link);
                        frontier.push_back(link.clone());
                    }
                }

                // Parameters count whether or not the link is followed
                let endpoint = endpoint_of(&link);
                for (name, _) in link.query_pairs() {
                    if !name.is_empty() {
                        result.parameters.register(&endpoint, &name);
                    }
                }
            }
        }

        info!(
            "Crawl of {} complete. Visited {} pages, {} endpoints with parameters",
            target,
            result.visited.len(),
            result.parameters.endpoint_count()
        );

        Ok(result)
    }
}

/// `href` of every anchor in the document, in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").expect("static selector");

    document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchOptions;
    use crate::sink::FileSink;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><body>{}</body></html>", body))
    }

    async fn page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(body))
            .mount(server)
            .await;
    }

    fn crawler() -> Crawler {
        Crawler::new(Fetcher::new(&FetchOptions::default()).unwrap())
    }

    fn sink(dir: &TempDir, server: &MockServer) -> FileSink {
        let url = Url::parse(&server.uri()).unwrap();
        FileSink::create(dir.path(), url.host_str().unwrap()).unwrap()
    }

    #[test]
    fn test_extract_links() {
        let links = extract_links(
            r##"<a href="/a">A</a><a>no href</a><a href="  b?x=1 ">B</a>
                <a href="">empty</a><link href="/style.css"><a href="#top">top</a>"##,
        );
        assert_eq!(links, vec!["/a", "b?x=1", "#top"]);
    }

    #[tokio::test]
    async fn test_links_and_parameters_discovered() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<a href="/a?id=1">A</a><a href="/b?name=foo&id=2">B</a><a href="/a?id=3&sort=asc">A2</a>"#,
        )
        .await;
        page(&server, "/a", "a").await;
        page(&server, "/b", "b").await;

        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, &server);
        let target = Url::parse(&server.uri()).unwrap();
        let result = crawler().crawl(&target, &sink).await.unwrap();

        assert_eq!(result.visited.len(), 4);
        let a = format!("{}/a", server.uri());
        let b = format!("{}/b", server.uri());
        assert_eq!(
            result.parameters.parameters_for(&a).unwrap(),
            &["id".to_string(), "sort".to_string()]
        );
        assert_eq!(
            result.parameters.parameters_for(&b).unwrap(),
            &["name".to_string(), "id".to_string()]
        );
        assert_eq!(result.parameters.pair_count(), 4);
        assert_eq!(result.destination, sink.destination());

        // Page files are named after their path
        assert!(sink.dir().join("index.html").exists());
        assert!(sink.dir().join("a").exists());
        assert!(sink.dir().join("b").exists());
    }

    #[tokio::test]
    async fn test_same_url_enqueued_twice_is_visited_once() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r##"<a href="/a">A</a><a href="/a#frag">A again</a><a href="/b">B</a>"##,
        )
        .await;
        page(&server, "/b", r#"<a href="/a">A from B</a><a href="/">home</a>"#).await;

        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(html("leaf"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, &server);
        let target = Url::parse(&server.uri()).unwrap();
        let result = crawler().crawl(&target, &sink).await.unwrap();

        assert_eq!(result.visited.len(), 3);
        let unique: HashSet<_> = result.visited.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
        page(&server, "/a", r#"<a href="/c">C</a>"#).await;
        page(&server, "/b", "b").await;
        page(&server, "/c", "c").await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let order_clone = order.clone();

        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, &server);
        let target = Url::parse(&server.uri()).unwrap();
        let result = crawler()
            .with_progress_callback(Arc::new(move |_count, url| {
                order_clone.lock().unwrap().push(url);
            }))
            .crawl(&target, &sink)
            .await
            .unwrap();

        let uri = server.uri();
        let expected = vec![
            format!("{}/", uri),
            format!("{}/a", uri),
            format!("{}/b", uri),
            format!("{}/c", uri),
        ];
        assert_eq!(result.visited, expected);
        assert_eq!(*order.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_out_of_scope_links_not_followed_but_parameters_kept() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<a href="http://elsewhere.invalid/search?q=x">ext</a>
               <a href="mailto:someone@example.com?subject=hi">mail</a>"#,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, &server);
        let target = Url::parse(&server.uri()).unwrap();
        let result = crawler().crawl(&target, &sink).await.unwrap();

        assert_eq!(result.visited, vec![format!("{}/", server.uri())]);
        assert_eq!(result.fetch_failures, 0);
        assert_eq!(
            result
                .parameters
                .parameters_for("http://elsewhere.invalid/search")
                .unwrap(),
            &["q".to_string()]
        );
        assert_eq!(result.parameters.pair_count(), 1);
    }

    #[tokio::test]
    async fn test_subdomain_scope_matches_whole_labels() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<a href="http://sub.localhost:1/x?a=1">sub</a>
               <a href="http://evillocalhost:1/y?b=2">lookalike</a>"#,
        )
        .await;

        let target = Url::parse(&server.uri().replace("127.0.0.1", "localhost")).unwrap();
        let seed = target.to_string();
        let options = FetchOptions {
            timeout: Some(std::time::Duration::from_secs(5)),
            ..FetchOptions::default()
        };

        for allow_subdomains in [true, false] {
            let dir = TempDir::new().unwrap();
            let sink = FileSink::create(dir.path(), "localhost").unwrap();
            let result = Crawler::new(Fetcher::new(&options).unwrap())
                .with_subdomains(allow_subdomains)
                .crawl(&target, &sink)
                .await
                .unwrap();

            if allow_subdomains {
                // Followed, though nothing listens on port 1
                let expected = vec![seed.clone(), "http://sub.localhost:1/x?a=1".to_string()];
                assert_eq!(result.visited, expected);
                assert_eq!(result.fetch_failures, 1);
            } else {
                assert_eq!(result.visited, vec![seed.clone()]);
                assert_eq!(result.fetch_failures, 0);
            }
            assert!(!result.visited.iter().any(|u| u.contains("evillocalhost")));
            assert_eq!(result.parameters.pair_count(), 2);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_crawl() {
        let server = MockServer::start().await;
        // Same host on a closed port: in scope, but the fetch fails
        page(
            &server,
            "/",
            r#"<a href="http://127.0.0.1:1/dead">dead</a><a href="/alive">alive</a>"#,
        )
        .await;
        page(&server, "/alive", "ok").await;

        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, &server);
        let target = Url::parse(&server.uri()).unwrap();
        let result = crawler().crawl(&target, &sink).await.unwrap();

        assert_eq!(result.visited.len(), 3);
        assert_eq!(result.fetch_failures, 1);
        assert!(result.visited.contains(&format!("{}/alive", server.uri())));
    }

    #[tokio::test]
    async fn test_max_pages_limits_visits() {
        let server = MockServer::start().await;
        let links: String = (1..=5)
            .map(|i| format!(r#"<a href="/p{}">P</a>"#, i))
            .collect();
        page(&server, "/", &links).await;
        for i in 1..=5 {
            page(&server, &format!("/p{}", i), "leaf").await;
        }

        let dir = TempDir::new().unwrap();
        let sink = sink(&dir, &server);
        let target = Url::parse(&server.uri()).unwrap();
        let result = crawler()
            .with_max_pages(Some(3))
            .crawl(&target, &sink)
            .await
            .unwrap();

        assert_eq!(result.visited.len(), 3);
    }
}
