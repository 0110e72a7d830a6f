//! Host page shell: maps the host location to a view, keeps the document
//! title in sync and owns the in-memory history the bridge navigates.

use crate::FrameHost;
use crate::HostRouter;
use lb_core::BridgeConfig;
use lb_core::BridgeResult;
use lb_dom::ScrollState;
use lb_patch::NavigationRequest;
use lb_routes::Route;
use lb_routes::RouteTable;
use lb_routes::TitleSource;
use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

/// Host address split the way the router sees it. `search` and `hash`
/// keep their leading `?`/`#` and are empty when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostLocation {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl HostLocation {
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.find('#') {
            Some(at) => href.split_at(at),
            None => (href, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(at) => rest.split_at(at),
            None => (rest, ""),
        };
        Self {
            pathname: if pathname.is_empty() { "/".to_owned() } else { pathname.to_owned() },
            search: if search == "?" { String::new() } else { search.to_owned() },
            hash: if hash == "#" { String::new() } else { hash.to_owned() },
        }
    }

    pub fn from_route(route: &Route) -> Self {
        Self {
            pathname: route.as_str().to_owned(),
            ..Self::default()
        }
    }

    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

impl From<&NavigationRequest> for HostLocation {
    fn from(request: &NavigationRequest) -> Self {
        Self {
            pathname: request.route.as_str().to_owned(),
            search: request.search.clone(),
            hash: request.hash.clone(),
        }
    }
}

/// What the shell renders for a host pathname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteView {
    Frame { route: Route, title: String },
    /// The pathname names a page but is not spelled canonically; replace
    /// the current history entry with `to`.
    Redirect { to: Route },
    NotFound,
}

pub fn resolve_view(table: &RouteTable, pathname: &str) -> RouteView {
    let Some(entry) = table.resolve_entry(pathname) else {
        return RouteView::NotFound;
    };

    if entry.route() != pathname {
        return RouteView::Redirect {
            to: entry.route().clone(),
        };
    }

    RouteView::Frame {
        route: entry.route().clone(),
        title: entry.title().to_owned(),
    }
}

/// Host document title for a pathname: the page title, or the site name.
pub fn document_title(titles: &dyn TitleSource, route: Option<&Route>) -> String {
    route
        .and_then(|route| titles.title_for(route))
        .unwrap_or_else(|| titles.fallback_title())
        .to_owned()
}

/// In-memory history stack.
#[derive(Debug)]
pub struct HistoryRouter {
    entries: RefCell<Vec<HostLocation>>,
    index: Cell<usize>,
}

impl HistoryRouter {
    pub fn new(initial: HostLocation) -> Self {
        Self {
            entries: RefCell::new(vec![initial]),
            index: Cell::new(0),
        }
    }

    pub fn current(&self) -> HostLocation {
        self.entries
            .borrow()
            .get(self.index.get())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Pushes a new entry, discarding any forward entries.
    pub fn push(&self, location: HostLocation) {
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.index.get() + 1);
        entries.push(location);
        self.index.set(entries.len() - 1);
    }

    pub fn replace(&self, location: HostLocation) {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(self.index.get()) {
            Some(current) => *current = location,
            None => entries.push(location),
        }
    }

    pub fn back(&self) -> bool {
        let index = self.index.get();
        if index == 0 {
            return false;
        }
        self.index.set(index - 1);
        true
    }

    pub fn forward(&self) -> bool {
        let index = self.index.get();
        if index + 1 >= self.len() {
            return false;
        }
        self.index.set(index + 1);
        true
    }
}

impl HostRouter for HistoryRouter {
    fn navigate(&self, request: &NavigationRequest) {
        self.push(HostLocation::from(request));
    }
}

/// The single-page host: history, frame host, title and host scroll.
#[derive(Debug)]
pub struct HostShell {
    router: Rc<HistoryRouter>,
    frames: FrameHost,
    document_title: String,
    scroll: ScrollState,
    manual_scroll_restoration: bool,
    rendered: Option<HostLocation>,
}

impl HostShell {
    pub fn new(
        host_url: &Url,
        table: Rc<RouteTable>,
        config: BridgeConfig,
        initial: HostLocation,
    ) -> BridgeResult<Self> {
        let router = Rc::new(HistoryRouter::new(initial));
        let frames = FrameHost::mount(host_url, Rc::clone(&table), config, router.clone())?;
        let document_title = table.fallback_title().to_owned();
        Ok(Self {
            router,
            frames,
            document_title,
            scroll: ScrollState::default(),
            manual_scroll_restoration: false,
            rendered: None,
        })
    }

    pub fn router(&self) -> &HistoryRouter {
        &self.router
    }

    pub fn frames(&self) -> &FrameHost {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut FrameHost {
        &mut self.frames
    }

    pub fn document_title(&self) -> &str {
        &self.document_title
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollState {
        &mut self.scroll
    }

    pub fn manual_scroll_restoration(&self) -> bool {
        self.manual_scroll_restoration
    }

    /// Renders the current history entry. Non-canonical spellings of a page
    /// are replaced in history before rendering.
    pub fn sync(&mut self) -> RouteView {
        let mut location = self.router.current();
        let mut view = resolve_view(self.frames.table(), &location.pathname);

        if let RouteView::Redirect { to } = &view {
            log::debug!(target: "lb::frame", "redirecting {} to {to}", location.pathname);
            let target = HostLocation::from_route(to);
            self.router.replace(target);
            location = self.router.current();
            view = resolve_view(self.frames.table(), &location.pathname);
        }

        let route = match &view {
            RouteView::Frame { route, .. } => Some(route.clone()),
            RouteView::Redirect { .. } | RouteView::NotFound => None,
        };
        self.document_title = document_title(self.frames.table(), route.as_ref());
        self.frames.set_resolved_route(route);

        let moved = self.rendered.as_ref().is_none_or(|previous| {
            previous.pathname != location.pathname || previous.hash != location.hash
        });
        if moved {
            self.manual_scroll_restoration = true;
            self.scroll.reset();
        }
        self.rendered = Some(location);

        view
    }
}
