//! `Link` response header parsing for pagination.
//!
//! List endpoints paginate via an RFC 5988-style `Link` header:
//!
//! ```text
//! Link: <https://host/api/0/projects/x/builds/?page=2>; rel="next",
//!       <https://host/api/0/projects/x/builds/?page=0>; rel="previous"
//! ```
//!
//! Only the `next` and `previous` relations are meaningful to the
//! dashboard. Malformed segments and unknown relations are skipped
//! rather than treated as errors: a page without working pagination is
//! still a page.

use std::collections::BTreeMap;

/// Ordered query parameter map, the unit of paging/filter state.
pub type QueryParams = BTreeMap<String, String>;

/// One pagination target extracted from a `Link` relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    /// The full target URL as sent by the server.
    pub url: String,
    /// The target URL's query parameters, ready to merge into the
    /// current query state.
    pub params: QueryParams,
}

impl PageRef {
    /// Build a page reference from a raw URL.
    fn from_url(url: &str) -> Self {
        let params = url
            .split_once('?')
            .map(|(_, query)| parse_query(query))
            .unwrap_or_default();
        Self {
            url: url.to_owned(),
            params,
        }
    }
}

/// Forward/back pagination targets for one response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLinks {
    /// The next page, when the server advertised one.
    pub next: Option<PageRef>,
    /// The previous page, when the server advertised one.
    pub previous: Option<PageRef>,
}

impl PageLinks {
    /// Whether the response advertised any pagination target.
    pub const fn any(&self) -> bool {
        self.next.is_some() || self.previous.is_some()
    }
}

/// Parse a `Link` header value into pagination targets.
pub fn parse_link_header(header: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for segment in header.split(',') {
        let segment = segment.trim();
        let Some((url_part, attrs)) = segment.split_once(';') else {
            continue;
        };
        let Some(url) = url_part
            .trim()
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
        else {
            continue;
        };
        let rel = attrs
            .split(';')
            .find_map(|attr| attr.trim().strip_prefix("rel="))
            .map(|value| value.trim_matches('"'));

        match rel {
            Some("next") => links.next = Some(PageRef::from_url(url)),
            Some("previous" | "prev") => links.previous = Some(PageRef::from_url(url)),
            _ => {}
        }
    }

    links
}

/// Parse a raw query string into an ordered parameter map.
///
/// Values are taken verbatim; the server's pagination cursors do not
/// use characters that require percent-decoding.
fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => params.insert(key.to_owned(), value.to_owned()),
            None => params.insert(pair.to_owned(), String::new()),
        };
    }
    params
}
