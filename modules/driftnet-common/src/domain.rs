use url::{Host, Url};

use crate::error::{RecordError, RecordResult};

/// Parse a page URL, accepting only http and https.
pub fn parse_web_url(raw: &str) -> RecordResult<Url> {
    let parsed = Url::parse(raw).map_err(|e| RecordError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(RecordError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("only http/https URLs allowed, got {other}"),
        }),
    }
}

/// Registrable-ish domain of a URL: the last two dot-separated labels of its host.
///
/// `https://cooking.nytimes.com/recipes/x` → `nytimes.com`. Single-label hosts
/// and IP literals come back whole.
pub fn derive_domain(natural_key: &str) -> RecordResult<String> {
    let invalid = |reason: &str| RecordError::InvalidUrl {
        url: natural_key.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(natural_key).map_err(|e| invalid(&e.to_string()))?;

    match parsed.host() {
        Some(Host::Domain(host)) => {
            let host = host.trim_end_matches('.').to_lowercase();
            if host.is_empty() {
                return Err(invalid("empty host"));
            }
            let labels: Vec<&str> = host.split('.').collect();
            let start = labels.len().saturating_sub(2);
            Ok(labels[start..].join("."))
        }
        Some(Host::Ipv4(ip)) => Ok(ip.to_string()),
        Some(Host::Ipv6(ip)) => Ok(ip.to_string()),
        None => Err(invalid("URL has no host")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_urls_must_be_http() {
        assert!(parse_web_url("https://www.nytimes.com/a").is_ok());
        assert!(parse_web_url("http://localhost:8080/").is_ok());
        assert!(matches!(
            parse_web_url("javascript://x.com/%0Aalert(1)"),
            Err(RecordError::InvalidUrl { .. })
        ));
        assert!(parse_web_url("file:///etc/passwd").is_err());
        assert!(parse_web_url("not a url").is_err());
    }

    #[test]
    fn keeps_last_two_labels() {
        assert_eq!(
            derive_domain("https://cooking.nytimes.com/recipes/x").unwrap(),
            "nytimes.com"
        );
        assert_eq!(
            derive_domain("https://www.nytimes.com/2024/09/19/nyregion/a.html").unwrap(),
            "nytimes.com"
        );
        assert_eq!(
            derive_domain("https://astrorobotic.medium.com/post").unwrap(),
            "medium.com"
        );
    }

    #[test]
    fn bare_domain_unchanged() {
        assert_eq!(derive_domain("https://example.com").unwrap(), "example.com");
    }

    #[test]
    fn lowercases_and_ignores_port_and_trailing_dot() {
        assert_eq!(derive_domain("http://WWW.Example.COM:8080/").unwrap(), "example.com");
        assert_eq!(derive_domain("http://www.example.com./").unwrap(), "example.com");
    }

    #[test]
    fn single_label_and_ip_hosts_are_whole() {
        assert_eq!(derive_domain("http://localhost:3000/x").unwrap(), "localhost");
        assert_eq!(derive_domain("http://127.0.0.1/x").unwrap(), "127.0.0.1");
        assert_eq!(derive_domain("http://[::1]/x").unwrap(), "::1");
    }

    #[test]
    fn no_host_is_an_error() {
        assert!(derive_domain("mailto:someone@example.com").is_err());
        assert!(derive_domain("not a url").is_err());
    }
}
