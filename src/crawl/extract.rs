// src/crawl/extract.rs
// =============================================================================
// Turns a fetched page into the list of links worth crawling next.
//
// We use the `scraper` crate to build the DOM, then walk it ourselves:
// - Nodes are visited depth-first in document order
// - Only <a> elements with an href attribute are considered
// - The href is trimmed and parsed with the `url` crate
// - Only absolute https URLs survive; relative links, http:, mailto:, ...
//   are skipped
// - Survivors are normalized and deduplicated within the page, keeping the
//   order in which they first appear
//
// Deduplicating across pages is not done here. The aggregator owns that.
// =============================================================================

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use super::error::{CrawlError, Result};
use super::normalize::{normalize, CANONICAL_SCHEME};

// Builds a document tree from a response body
//
// html5ever itself never rejects markup, so the only way a body fails here
// is when it isn't text we can hand to the parser.
pub fn parse_document(url: &str, body: &[u8]) -> Result<Html> {
    let text = std::str::from_utf8(body).map_err(|e| CrawlError::Parse {
        url: url.to_string(),
        reason: format!("body is not valid UTF-8: {}", e),
    })?;

    Ok(Html::parse_document(text))
}

// Extracts the normalized outbound links of a document
//
// Returns each link once, in first-occurrence order.
pub fn extract_links(document: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    // descendants() is an iterative pre-order walk, so very deep documents
    // can't blow the stack
    for node in document.tree.root().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if element.value().name() != "a" {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let href = href.trim();
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(e) => {
                debug!(href, error = %e, "skipping unparseable link");
                continue;
            }
        };

        if url.scheme() != CANONICAL_SCHEME {
            debug!(href, scheme = url.scheme(), "skipping non-https link");
            continue;
        }

        let normalized = normalize(&url);
        if seen.insert(normalized.clone()) {
            links.push(normalized);
        }
    }

    links
}
