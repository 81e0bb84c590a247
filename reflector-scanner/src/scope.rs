// URL resolution and crawl scoping

use crate::error::{Result, ScanError};
use url::Url;

/// Parse a user supplied target. The scheme must be spelled out as `http://` or
/// `https://` and the URL must carry a host.
pub fn parse_target(input: &str) -> Result<Url> {
    let input = input.trim();
    let url = Url::parse(input)
        .map_err(|e| ScanError::MalformedUrl(format!("'{}': {} (use http:// or https://)", input, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::MalformedUrl(format!(
            "'{}': unsupported scheme '{}' (use http:// or https://)",
            input,
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ScanError::MalformedUrl(format!("'{}': missing host", input)));
    }

    Ok(url)
}

/// Resolve a possibly relative reference against `base`.
///
/// Scheme-relative (`//host/x`), path-relative (`../x`) and fragment-only (`#top`)
/// references are all handled by standard URL joining. The fragment is dropped
/// from the result so `/page#a` and `/page#b` name the same page.
pub fn resolve(base: &Url, href: &str) -> Result<Url> {
    let mut resolved = base
        .join(href)
        .map_err(|e| ScanError::MalformedUrl(format!("'{}': {}", href, e)))?;
    resolved.set_fragment(None);
    Ok(resolved)
}

/// Whether `host` belongs to the crawl.
///
/// With subdomains allowed, `host` must be `target_host` itself or end with
/// `.target_host`, so matching happens on whole labels and `evilexample.com`
/// never matches `example.com`.
pub fn host_in_scope(host: &str, target_host: &str, allow_subdomains: bool) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let target_host = target_host.trim_end_matches('.').to_ascii_lowercase();

    if host == target_host {
        return true;
    }

    allow_subdomains
        && host
            .strip_suffix(target_host.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub fn in_scope(url: &Url, target_host: &str, allow_subdomains: bool) -> bool {
    match url.host_str() {
        Some(host) => host_in_scope(host, target_host, allow_subdomains),
        None => false,
    }
}

/// The URL with its query (and fragment) removed. Parameters are grouped under this key.
pub fn endpoint_of(url: &Url) -> String {
    let mut endpoint = url.clone();
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    endpoint.to_string()
}

/// Only http(s) links can be fetched or probed.
pub fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_subdomain_in_scope_when_allowed() {
        assert!(host_in_scope("sub.example.com", "example.com", true));
        assert!(host_in_scope("a.b.example.com", "example.com", true));
        assert!(host_in_scope("example.com", "example.com", true));
    }

    #[test]
    fn test_suffix_without_label_boundary_is_out_of_scope() {
        assert!(!host_in_scope("notexample.com", "example.com", true));
        assert!(!host_in_scope("evilexample.com", "example.com", true));
        assert!(!host_in_scope("example.com.evil.net", "example.com", true));
    }

    #[test]
    fn test_subdomain_out_of_scope_when_not_allowed() {
        assert!(!host_in_scope("sub.example.com", "example.com", false));
        assert!(host_in_scope("example.com", "example.com", false));
        assert!(host_in_scope("EXAMPLE.com", "example.com", false));
    }

    #[test]
    fn test_in_scope_ignores_port_and_scheme() {
        assert!(in_scope(&url("https://example.com:8443/x"), "example.com", false));
        assert!(!in_scope(&url("mailto:someone@example.com"), "example.com", true));
    }

    #[test]
    fn test_resolve_relative_forms() {
        let base = url("http://example.com/dir/page.html?x=1");
        assert_eq!(
            resolve(&base, "other.html").unwrap().as_str(),
            "http://example.com/dir/other.html"
        );
        assert_eq!(
            resolve(&base, "../up?id=2").unwrap().as_str(),
            "http://example.com/up?id=2"
        );
        assert_eq!(
            resolve(&base, "//cdn.example.com/a.js").unwrap().as_str(),
            "http://cdn.example.com/a.js"
        );
        assert_eq!(
            resolve(&base, "/root").unwrap().as_str(),
            "http://example.com/root"
        );
    }

    #[test]
    fn test_resolve_fragment_only_points_back_at_base() {
        let base = url("http://example.com/dir/page.html?x=1");
        assert_eq!(
            resolve(&base, "#section").unwrap().as_str(),
            "http://example.com/dir/page.html?x=1"
        );
    }

    #[test]
    fn test_resolve_unparseable_href_fails() {
        let base = url("http://example.com/");
        let err = resolve(&base, "http://[::1").unwrap_err();
        assert!(matches!(err, ScanError::MalformedUrl(_)));
    }

    #[test]
    fn test_endpoint_of_strips_query_and_fragment() {
        assert_eq!(
            endpoint_of(&url("http://example.com/x?a=1&b=2#frag")),
            "http://example.com/x"
        );
        assert_eq!(endpoint_of(&url("http://example.com")), "http://example.com/");
    }

    #[test]
    fn test_parse_target_requires_scheme() {
        assert!(parse_target("http://example.com").is_ok());
        assert!(parse_target("  https://example.com/start  ").is_ok());
        assert!(matches!(
            parse_target("example.com"),
            Err(ScanError::MalformedUrl(_))
        ));
        assert!(matches!(
            parse_target("ftp://example.com"),
            Err(ScanError::MalformedUrl(_))
        ));
        assert!(matches!(
            parse_target("example.com:8080"),
            Err(ScanError::MalformedUrl(_))
        ));
    }
}
