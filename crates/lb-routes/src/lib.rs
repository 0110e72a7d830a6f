//! Bidirectional mapping between canonical application routes and legacy
//! document filenames.
//!
//! Every consumer (host router, patch protocol, navigation delegate) resolves
//! paths through [`RouteTable::resolve`], so a path is never interpreted two
//! different ways. Three historical addressing styles are accepted for the
//! same page: the clean route (`/topo8esia`, with or without a trailing
//! slash), the bare filename (`topo8esia.html`) and a filename behind any
//! leading path (`/legacy/site/topo8esia.html`).

use lb_core::BridgeError;
use lb_core::BridgeResult;
use std::collections::HashSet;
use std::fmt;

mod builtin;
mod load;

pub use builtin::SITE_NAME;

const ROOT_ROUTE: &str = "/";
const ROOT_DOCUMENT_ALIAS: &str = "/index.html";

/// Canonical, normalized absolute path of a page. Only issued by a
/// [`RouteTable`], so every `Route` names a known page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route(String);

impl Route {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ROUTE
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Route {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Route {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Filename of a pre-existing static document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegacyDocumentId(String);

impl LegacyDocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LegacyDocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    route: Route,
    document: LegacyDocumentId,
    title: String,
}

impl RouteEntry {
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn document_id(&self) -> &LegacyDocumentId {
        &self.document
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Per-route display titles, keyed off the resolved route.
pub trait TitleSource {
    fn title_for(&self, route: &Route) -> Option<&str>;

    /// Title used when no route resolves.
    fn fallback_title(&self) -> &str;
}

/// Ordered bijection between routes and legacy documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    site_name: String,
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Validates `(route, document, title)` rows into a table.
    pub fn new(
        site_name: impl Into<String>,
        rows: impl IntoIterator<Item = (String, String, String)>,
    ) -> BridgeResult<Self> {
        let entries = rows
            .into_iter()
            .map(|(route, document, title)| RouteEntry {
                route: Route(route),
                document: LegacyDocumentId(document),
                title,
            })
            .collect::<Vec<_>>();

        validate_entries(&entries)?;

        Ok(Self {
            site_name: site_name.into(),
            entries,
        })
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.entries.iter().map(RouteEntry::route)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, route: &Route) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.route == *route)
    }

    /// Resolves any supported addressing style to its canonical route.
    pub fn resolve(&self, pathname: &str) -> Option<&Route> {
        self.resolve_entry(pathname).map(RouteEntry::route)
    }

    pub fn resolve_entry(&self, pathname: &str) -> Option<&RouteEntry> {
        let normalized = normalize_pathname(pathname);

        if let Some(entry) = self.entry_by_route(normalized) {
            return Some(entry);
        }

        if normalized == ROOT_DOCUMENT_ALIAS {
            if let Some(entry) = self.entry_by_route(ROOT_ROUTE) {
                return Some(entry);
            }
        }

        let last_segment = normalized.rsplit('/').find(|segment| !segment.is_empty())?;
        let resolved = self.entry_by_document(last_segment);
        if resolved.is_none() {
            log::trace!(target: "lb::routes", "no route for `{pathname}`");
        }
        resolved
    }

    /// Document for a route. `None` only for a route issued by another table.
    pub fn to_document_id(&self, route: &Route) -> Option<&LegacyDocumentId> {
        self.entry(route).map(RouteEntry::document_id)
    }

    pub fn to_title(&self, route: &Route) -> Option<&str> {
        self.entry(route).map(RouteEntry::title)
    }

    fn entry_by_route(&self, route: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.route.0 == route)
    }

    fn entry_by_document(&self, document_id: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|entry| entry.document.0 == document_id)
    }
}

impl TitleSource for RouteTable {
    fn title_for(&self, route: &Route) -> Option<&str> {
        self.to_title(route)
    }

    fn fallback_title(&self) -> &str {
        &self.site_name
    }
}

/// Strips trailing slashes from everything longer than one character. An
/// empty input is the root; `//` and longer runs of slashes become empty and
/// resolve to nothing.
pub fn normalize_pathname(pathname: &str) -> &str {
    match pathname.len() {
        0 => ROOT_ROUTE,
        1 => pathname,
        _ => pathname.trim_end_matches('/'),
    }
}

fn validate_entries(entries: &[RouteEntry]) -> BridgeResult<()> {
    if entries.is_empty() {
        return Err(BridgeError::new(
            "routes.table.empty",
            "route table has no entries",
        ));
    }

    let mut routes = HashSet::new();
    let mut documents = HashSet::new();

    for entry in entries {
        let route = entry.route.as_str();
        if !route.starts_with('/')
            || normalize_pathname(route) != route
            || route.contains(['?', '#'])
        {
            return Err(BridgeError::new(
                "routes.table.route_not_canonical",
                format!("route `{route}` is not a normalized absolute path"),
            ));
        }

        let document = entry.document.as_str();
        if document.is_empty() || document.contains(['/', '\\', '?', '#']) {
            return Err(BridgeError::new(
                "routes.table.document_invalid",
                format!("document `{document}` for route `{route}` is not a bare filename"),
            ));
        }

        if !routes.insert(route) {
            return Err(BridgeError::new(
                "routes.table.duplicate_route",
                format!("route `{route}` appears more than once"),
            ));
        }

        if !documents.insert(document) {
            return Err(BridgeError::new(
                "routes.table.duplicate_document",
                format!("document `{document}` is mapped by more than one route"),
            ));
        }
    }

    // `/<document>` must resolve to the document's own route, not to a
    // different route that happens to share the spelling.
    for entry in entries {
        let spelled = format!("/{}", entry.document.as_str());
        if let Some(other) = entries
            .iter()
            .find(|other| other.route.as_str() == spelled && other.route != entry.route)
        {
            return Err(BridgeError::new(
                "routes.table.ambiguous_document",
                format!(
                    "document `{}` collides with route `{}`",
                    entry.document, other.route
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::RouteTable;
    use super::TitleSource;
    use super::normalize_pathname;

    fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String, String)> {
        pairs
            .iter()
            .map(|(route, document)| {
                (
                    (*route).to_owned(),
                    (*document).to_owned(),
                    format!("Title of {route}"),
                )
            })
            .collect()
    }

    #[test]
    fn normalizes_trailing_slashes_except_root() {
        assert_eq!(normalize_pathname(""), "/");
        assert_eq!(normalize_pathname("/"), "/");
        assert_eq!(normalize_pathname("//"), "");
        assert_eq!(normalize_pathname("/topo8esia/"), "/topo8esia");
        assert_eq!(normalize_pathname("/topo8esia///"), "/topo8esia");
        assert_eq!(normalize_pathname("/topo8esia"), "/topo8esia");
    }

    #[test]
    fn document_and_route_round_trip_for_every_entry() {
        let table = RouteTable::builtin();
        for entry in table.entries() {
            let route = entry.route();
            let document = table.to_document_id(route);
            assert_eq!(document, Some(entry.document_id()));
            assert_eq!(table.resolve(entry.document_id().as_str()), Some(route));
            let resolved = table.resolve(route.as_str());
            assert_eq!(resolved.and_then(|route| table.to_document_id(route)), document);
        }
    }

    #[test]
    fn every_addressing_style_resolves_to_the_same_route() {
        let table = RouteTable::builtin();
        let expected = table.resolve("/topo8esia").cloned();
        assert!(expected.is_some());
        for style in [
            "/topo8esia",
            "/topo8esia/",
            "topo8esia.html",
            "/topo8esia.html",
            "/legacy/CentralKastoriaHouses.gr/centralkastoriahouses.gr/topo8esia.html",
        ] {
            assert_eq!(table.resolve(style).cloned(), expected, "style {style}");
        }
    }

    #[test]
    fn index_document_aliases_root() {
        let table = RouteTable::builtin();
        for path in ["/", "", "/index.html", "index.html", "/some/dir/index.html"] {
            assert!(
                table.resolve(path).is_some_and(|route| route.is_root()),
                "path {path}"
            );
        }
    }

    #[test]
    fn unknown_paths_do_not_resolve() {
        let table = RouteTable::builtin();
        assert!(table.resolve("/unknown-page").is_none());
        assert!(table.resolve("/legacy/unknown.html").is_none());
        assert!(table.resolve("/Topo8esia").is_none());
        assert!(table.resolve("//").is_none());
        assert!(table.resolve("///").is_none());
    }

    #[test]
    fn titles_come_from_the_table() {
        let table = RouteTable::builtin();
        let Some(route) = table.resolve("/epikoinwnia") else {
            panic!("contact route missing");
        };
        assert!(
            table
                .title_for(route)
                .is_some_and(|title| title.starts_with("Contact"))
        );
        assert_eq!(table.fallback_title(), "CentralKastoriaHouses");
    }

    #[test]
    fn rejects_duplicate_documents() {
        let result = RouteTable::new(
            "Site",
            rows(&[("/", "index.html"), ("/home", "index.html")]),
        );
        assert_eq!(
            result.err().map(|error| error.code),
            Some("routes.table.duplicate_document")
        );
    }

    #[test]
    fn rejects_non_canonical_routes() {
        for bad in ["/about/", "about", "/about?x=1", "/about#top"] {
            let result = RouteTable::new("Site", rows(&[("/", "index.html"), (bad, "about.html")]));
            assert_eq!(
                result.err().map(|error| error.code),
                Some("routes.table.route_not_canonical"),
                "route {bad}"
            );
        }
    }

    #[test]
    fn rejects_document_spelled_like_another_route() {
        let result = RouteTable::new(
            "Site",
            rows(&[("/", "index.html"), ("/a.html", "b.html"), ("/b", "a.html")]),
        );
        assert_eq!(
            result.err().map(|error| error.code),
            Some("routes.table.ambiguous_document")
        );
    }
}
