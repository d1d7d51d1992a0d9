// src/crawl/normalize.rs
// =============================================================================
// URL normalization.
//
// Every URL the crawler sees is reduced to a canonical string key:
//   https://<host><path without trailing slashes>
//
// - The scheme is always forced to https (whether a link is followed at all
//   is decided by the link extractor, not here)
// - Query strings and fragments are dropped
// - A port is kept unless it is 443, the https default
// - Hostnames come out lowercased because the url crate folds them when it
//   parses http(s) URLs
//
// Two URLs that normalize to the same string are the same page as far as
// the crawl is concerned.
// =============================================================================

use url::{ParseError, Url};

use super::error::{CrawlError, Result};

/// The only scheme the crawler follows, and the one forced onto every key
pub const CANONICAL_SCHEME: &str = "https";

const CANONICAL_PORT: u16 = 443;

// Schemes that never carry a host. A seed using one of these is rejected
// rather than read as "host:port".
const HOSTLESS_SCHEMES: &[&str] = &["about", "data", "file", "javascript", "mailto", "tel", "urn"];

// Builds the canonical key for a parsed URL
//
// Examples:
//   https://foo.com/         -> https://foo.com
//   http://foo.com/a/b/c/    -> https://foo.com/a/b/c
//   https://foo.com/?a=b#tag -> https://foo.com
//   http://foo.com:8080/a    -> https://foo.com:8080/a
pub fn normalize(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    let path = url.path().trim_end_matches('/');
    match url.port() {
        Some(port) if port != CANONICAL_PORT => {
            format!("{}://{}:{}{}", CANONICAL_SCHEME, host, port, path)
        }
        _ => format!("{}://{}{}", CANONICAL_SCHEME, host, path),
    }
}

// Parses the seed URL given on the command line
//
// Users often type "foo.com" instead of "https://foo.com". The url crate
// rejects that as a relative URL, so we retry with the canonical scheme
// in front before giving up. "localhost:3000" does parse, but as scheme
// "localhost" with no host, so that shape gets the same retry.
pub fn parse_seed(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_scheme = || Url::parse(&format!("{}://{}", CANONICAL_SCHEME, trimmed));

    let parsed = match Url::parse(trimmed) {
        Ok(url) if looks_like_host_and_port(&url) => with_scheme(),
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => with_scheme(),
        Err(e) => Err(e),
    };

    let url = parsed.map_err(|source| CrawlError::InvalidSeed {
        url: raw.to_string(),
        source,
    })?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(CrawlError::SeedWithoutHost(raw.to_string()));
    }

    Ok(url)
}

// "foo.com:8080/a" parses as scheme "foo.com" with path "8080/a"
fn looks_like_host_and_port(url: &Url) -> bool {
    url.host_str().is_none()
        && !HOSTLESS_SCHEMES.contains(&url.scheme())
        && url.path().starts_with(|c: char| c.is_ascii_digit())
}
