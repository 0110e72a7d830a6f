use lb_routes::Route;
use lb_routes::RouteTable;
use std::fmt;
use url::Origin;
use url::Url;

const NON_NAVIGATIONAL_PREFIXES: [&str; 4] = ["mailto:", "tel:", "javascript:", "#"];

/// Navigation handed to the host router: a canonical route plus the
/// original query and fragment (each with its leading `?`/`#`, or empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub route: Route,
    pub search: String,
    pub hash: String,
}

impl NavigationRequest {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            search: String::new(),
            hash: String::new(),
        }
    }

    /// `route + search + hash`, the value written back into rewritten anchors.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.route, self.search, self.hash)
    }
}

impl fmt::Display for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.route, self.search, self.hash)
    }
}

/// Maps an anchor href found in an embedded document to a host navigation.
///
/// Returns `None` for non-navigational schemes, hrefs that fail to parse,
/// cross-origin targets and same-origin paths the route table does not know.
pub fn map_href_to_route(
    href: &str,
    base: &Url,
    host_origin: &Origin,
    table: &RouteTable,
) -> Option<NavigationRequest> {
    if href.is_empty() || is_non_navigational(href) {
        return None;
    }

    let resolved = match base.join(href) {
        Ok(resolved) => resolved,
        Err(error) => {
            log::trace!(target: "lb::patch", "ignoring malformed href `{href}`: {error}");
            return None;
        }
    };

    if resolved.origin() != *host_origin {
        return None;
    }

    let route = table.resolve(resolved.path())?.clone();
    Some(NavigationRequest {
        route,
        search: non_empty_prefixed('?', resolved.query()),
        hash: non_empty_prefixed('#', resolved.fragment()),
    })
}

fn is_non_navigational(href: &str) -> bool {
    NON_NAVIGATIONAL_PREFIXES.iter().any(|prefix| {
        href.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

fn non_empty_prefixed(prefix: char, part: Option<&str>) -> String {
    match part {
        Some(part) if !part.is_empty() => format!("{prefix}{part}"),
        _ => String::new(),
    }
}
