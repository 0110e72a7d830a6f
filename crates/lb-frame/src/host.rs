use crate::HostRouter;
use crate::NavigationDelegate;
use crate::timers::TimerQueue;
use crate::timers::TimerTask;
use lb_core::BridgeConfig;
use lb_core::BridgeError;
use lb_core::BridgeResult;
use lb_dom::Document;
use lb_dom::DomEvent;
use lb_dom::EventKind;
use lb_dom::NodeId;
use lb_html::DocumentStore;
use lb_html::HtmlParser;
use lb_patch::PatchContext;
use lb_patch::PatchPipeline;
use lb_patch::PatchState;
use lb_patch::StructuralWatcher;
use lb_routes::LegacyDocumentId;
use lb_routes::Route;
use lb_routes::RouteTable;
use std::rc::Rc;
use std::time::Duration;
use url::Origin;
use url::Url;

/// What a slot currently embeds.
#[derive(Debug, Default)]
pub enum EmbeddedContent {
    #[default]
    Unloaded,
    Loaded(Document),
    /// Loaded, but not readable from the host (origin policy).
    Opaque,
}

impl EmbeddedContent {
    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Loaded(document) => Some(document),
            _ => None,
        }
    }
}

/// One mounted embedded-document instance, bound to a single route.
#[derive(Debug)]
pub struct FrameSlot {
    route: Route,
    document_id: LegacyDocumentId,
    src: Url,
    title: String,
    content: EmbeddedContent,
    generation: u64,
    state: PatchState,
    watcher: Option<StructuralWatcher>,
}

impl FrameSlot {
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn document_id(&self) -> &LegacyDocumentId {
        &self.document_id
    }

    pub fn src(&self) -> &Url {
        &self.src
    }

    /// Accessible title of the embedded frame.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &EmbeddedContent {
        &self.content
    }

    pub fn document(&self) -> Option<&Document> {
        self.content.document()
    }

    /// Load generation; bumped on every load event.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn patch_state(&self) -> &PatchState {
        &self.state
    }

    pub fn watcher(&self) -> Option<&StructuralWatcher> {
        self.watcher.as_ref()
    }
}

/// Keeps one embedded document mounted per known route and runs the patch
/// protocol whenever one of them loads.
pub struct FrameHost {
    table: Rc<RouteTable>,
    config: BridgeConfig,
    host_origin: Origin,
    router: Rc<dyn HostRouter>,
    pipeline: PatchPipeline,
    slots: Vec<FrameSlot>,
    active: Option<Route>,
    timers: TimerQueue,
}

impl std::fmt::Debug for FrameHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHost")
            .field("host_origin", &self.host_origin.ascii_serialization())
            .field("slots", &self.slots.len())
            .field("active", &self.active)
            .field("now", &self.timers.now())
            .finish_non_exhaustive()
    }
}

impl FrameHost {
    /// Mounts one slot per table entry, in table order.
    pub fn mount(
        host_url: &Url,
        table: Rc<RouteTable>,
        config: BridgeConfig,
        router: Rc<dyn HostRouter>,
    ) -> BridgeResult<Self> {
        config.validate()?;

        let slots = table
            .entries()
            .iter()
            .map(|entry| -> BridgeResult<FrameSlot> {
                let path = config.document_path(entry.document_id().as_str());
                let src = host_url.join(&path).map_err(|error| {
                    BridgeError::new(
                        "frame.source_invalid",
                        format!("cannot build source for `{}` from `{path}`: {error}", entry.route()),
                    )
                })?;
                Ok(FrameSlot {
                    route: entry.route().clone(),
                    document_id: entry.document_id().clone(),
                    src,
                    title: entry.title().to_owned(),
                    content: EmbeddedContent::Unloaded,
                    generation: 0,
                    state: PatchState::new(0),
                    watcher: None,
                })
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        log::debug!(target: "lb::frame", "mounted {} frame slots for {host_url}", slots.len());

        Ok(Self {
            table,
            config,
            host_origin: host_url.origin(),
            router,
            pipeline: PatchPipeline::standard(),
            slots,
            active: None,
            timers: TimerQueue::default(),
        })
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    pub fn slot(&self, route: &Route) -> Option<&FrameSlot> {
        self.slot_index(route).map(|index| &self.slots[index])
    }

    pub fn document(&self, route: &Route) -> Option<&Document> {
        self.slot(route).and_then(FrameSlot::document)
    }

    /// Mutable access for the embedded page's own scripts and for tests.
    /// Structural changes are picked up by [`Self::deliver_mutation_records`].
    pub fn document_mut(&mut self, route: &Route) -> Option<&mut Document> {
        let index = self.slot_index(route)?;
        match &mut self.slots[index].content {
            EmbeddedContent::Loaded(document) => Some(document),
            _ => None,
        }
    }

    /// Virtual time since mount.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn active_route(&self) -> Option<&Route> {
        self.active.as_ref()
    }

    /// Sets the currently resolved route. `None` hides every slot.
    pub fn set_resolved_route(&mut self, route: Option<Route>) {
        if self.active != route {
            log::debug!(
                target: "lb::frame",
                "active frame: {}",
                route.as_ref().map_or("none", Route::as_str)
            );
        }
        self.active = route;
    }

    pub fn is_active(&self, route: &Route) -> bool {
        self.active.as_ref() == Some(route)
    }

    pub fn is_aria_hidden(&self, route: &Route) -> bool {
        !self.is_active(route)
    }

    pub fn active_slot(&self) -> Option<&FrameSlot> {
        self.active.as_ref().and_then(|route| self.slot(route))
    }

    /// Replaces a slot's content and fires its load event.
    ///
    /// Every load starts a fresh generation with empty patch state. The old
    /// watcher and any timers of the previous load are discarded.
    /// Returns false for a route this host has no slot for.
    pub fn load(&mut self, route: &Route, content: EmbeddedContent) -> bool {
        let Some(index) = self.slot_index(route) else {
            log::debug!(target: "lb::frame", "no frame slot for {route}");
            return false;
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.saturating_add(1);
        slot.state = PatchState::new(slot.generation);
        slot.watcher = None;
        slot.content = content;
        let generation = slot.generation;

        let dropped = self.timers.drop_stale(index, generation);
        if dropped > 0 {
            log::trace!(target: "lb::frame", "dropped {dropped} timers of the previous load of {route}");
        }

        self.on_embedded_load(index);
        true
    }

    /// Fetches a slot's legacy document from `store`, parses it and loads it.
    pub fn load_from_store(&mut self, route: &Route, store: &dyn DocumentStore) -> BridgeResult<()> {
        let slot = self.slot(route).ok_or_else(|| {
            BridgeError::new("frame.unknown_route", format!("no frame slot for {route}"))
        })?;
        let bytes = store.load(slot.document_id.as_str())?;
        let document = HtmlParser.parse_bytes(&bytes, slot.src.clone());
        self.load(route, EmbeddedContent::Loaded(document));
        Ok(())
    }

    fn on_embedded_load(&mut self, index: usize) {
        let now = self.timers.now();
        let slot = &mut self.slots[index];
        let generation = slot.generation;

        let EmbeddedContent::Loaded(document) = &mut slot.content else {
            log::debug!(target: "lb::frame", "{} loaded but is not accessible, skipping patches", slot.src);
            return;
        };

        let ctx = PatchContext::for_document(&self.table, &self.host_origin, &self.config, document);
        self.pipeline.run(document, &mut slot.state, &ctx);

        if slot.state.mark_delegate_attached() {
            let delegate = NavigationDelegate::new(
                Rc::clone(&self.router),
                Rc::clone(&self.table),
                self.host_origin.clone(),
            );
            document.add_event_listener(EventKind::Click, true, Rc::new(delegate));
        }

        document.scroll.reset();
        for delay in &self.config.scroll_reset_delays {
            self.timers
                .schedule(*delay, TimerTask::ScrollReset { slot: index, generation });
        }

        // The watcher starts observing after the initial pass.
        document.take_records();
        slot.watcher = Some(StructuralWatcher::attach(now, self.config.watcher_timeout));
        self.timers.schedule(
            self.config.watcher_timeout,
            TimerTask::WatcherExpiry { slot: index, generation },
        );

        log::debug!(target: "lb::frame", "{} loaded (generation {generation})", slot.route);
    }

    /// Delivers pending structural-change records to each slot's watcher,
    /// rerunning the patch pass where the watcher is still live. Returns the
    /// number of reruns.
    pub fn deliver_mutation_records(&mut self) -> usize {
        let now = self.timers.now();
        let mut reruns = 0;

        for slot in &mut self.slots {
            let EmbeddedContent::Loaded(document) = &mut slot.content else {
                continue;
            };
            if document.take_records().is_empty() {
                continue;
            }

            let rerun = slot
                .watcher
                .as_mut()
                .is_some_and(|watcher| watcher.on_structural_change(now));
            if !rerun {
                continue;
            }

            let ctx =
                PatchContext::for_document(&self.table, &self.host_origin, &self.config, document);
            let report = self.pipeline.run(document, &mut slot.state, &ctx);
            // Records caused by the pass itself lead to a no-op pass.
            document.take_records();
            log::trace!(target: "lb::frame", "rerun on {} changed {} nodes", slot.route, report.total());
            reruns += 1;
        }

        reruns
    }

    /// Advances virtual time, delivering pending mutation records first and
    /// then firing every timer that falls due.
    pub fn advance(&mut self, by: Duration) {
        self.deliver_mutation_records();
        let until = self.timers.now().saturating_add(by);

        while let Some(task) = self.timers.pop_due(until) {
            self.run_timer(task);
        }
        self.timers.advance_to(until);
    }

    fn run_timer(&mut self, task: TimerTask) {
        let Some(slot) = self.slots.get_mut(task.slot()) else {
            return;
        };
        if slot.generation != task.generation() {
            return;
        }

        match task {
            TimerTask::ScrollReset { .. } => {
                if let EmbeddedContent::Loaded(document) = &mut slot.content {
                    document.scroll.reset();
                }
            }
            TimerTask::WatcherExpiry { .. } => {
                if let Some(watcher) = slot.watcher.as_mut() {
                    watcher.disconnect();
                    log::debug!(
                        target: "lb::frame",
                        "structural watcher for {} disconnected after {} reruns",
                        slot.route,
                        watcher.reruns()
                    );
                }
            }
        }
    }

    /// Dispatches a click at `target` inside a slot's document. `None` when
    /// the slot has no accessible document.
    pub fn dispatch_click(&self, route: &Route, target: NodeId) -> Option<DomEvent> {
        let document = self.document(route)?;
        Some(document.dispatch(DomEvent::click(target)))
    }

    fn slot_index(&self, route: &Route) -> Option<usize> {
        self.slots.iter().position(|slot| slot.route == *route)
    }
}

#[cfg(test)]
mod tests {
    use super::EmbeddedContent;
    use super::FrameHost;
    use crate::HostRouter;
    use lb_core::BridgeConfig;
    use lb_dom::EventKind;
    use lb_html::HtmlParser;
    use lb_html::MemoryDocumentStore;
    use lb_patch::NavigationRequest;
    use lb_routes::Route;
    use lb_routes::RouteTable;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use url::Url;

    #[derive(Default)]
    struct Calls(RefCell<Vec<String>>);

    impl HostRouter for Calls {
        fn navigate(&self, request: &NavigationRequest) {
            self.0.borrow_mut().push(request.href());
        }
    }

    const PAGE: &str = r#"<html><head><title>Home</title></head><body>
<img alt="logo" src="/old.png"><a href="diamerismata.html">Rooms</a><div id="gallery"></div>
</body></html>"#;

    fn host() -> (FrameHost, Rc<Calls>) {
        let url = match Url::parse("https://centralkastoriahouses.gr/") {
            Ok(url) => url,
            Err(error) => panic!("{error}"),
        };
        let calls = Rc::new(Calls::default());
        let host = FrameHost::mount(
            &url,
            Rc::new(RouteTable::builtin()),
            BridgeConfig::default(),
            calls.clone(),
        );
        match host {
            Ok(host) => (host, calls),
            Err(error) => panic!("{error}"),
        }
    }

    fn route(host: &FrameHost, path: &str) -> Route {
        match host.table().resolve(path) {
            Some(route) => route.clone(),
            None => panic!("{path} does not resolve"),
        }
    }

    fn load_page(host: &mut FrameHost, route: &Route) {
        let src = match host.slot(route) {
            Some(slot) => slot.src().clone(),
            None => panic!("no slot for {route}"),
        };
        let document = HtmlParser.parse(PAGE, src);
        assert!(host.load(route, EmbeddedContent::Loaded(document)));
    }

    #[test]
    fn mounts_one_slot_per_route_with_legacy_source() {
        let (host, _) = host();
        assert_eq!(host.slots().len(), 6);
        let topo = route(&host, "/topo8esia");
        let slot = match host.slot(&topo) {
            Some(slot) => slot,
            None => panic!("missing slot"),
        };
        assert_eq!(
            slot.src().as_str(),
            "https://centralkastoriahouses.gr/legacy/CentralKastoriaHouses.gr/centralkastoriahouses.gr/topo8esia.html"
        );
        assert!(slot.title().starts_with("Central Kastoria Houses - Rent Apartments"));
    }

    #[test]
    fn exactly_one_slot_is_active() {
        let (mut host, _) = host();
        let home = route(&host, "/");
        host.set_resolved_route(Some(home.clone()));

        let active = host
            .slots()
            .iter()
            .filter(|slot| host.is_active(slot.route()))
            .count();
        assert_eq!(active, 1);
        assert!(!host.is_aria_hidden(&home));
        assert!(host.is_aria_hidden(&route(&host, "/epikoinwnia")));

        host.set_resolved_route(None);
        assert!(host.active_slot().is_none());
    }

    #[test]
    fn load_patches_and_attaches_delegate_once() {
        let (mut host, _) = host();
        let home = route(&host, "/");
        load_page(&mut host, &home);

        let Some(document) = host.document(&home) else {
            panic!("home not loaded");
        };
        assert_eq!(document.listener_count(EventKind::Click), 1);
        assert!(document.element_by_id("legacy-motion-override").is_some());
        let anchor = document.elements_by_tag("a")[0];
        assert_eq!(document.attribute(anchor, "href"), Some("/diamerismata"));

        let slot = match host.slot(&home) {
            Some(slot) => slot,
            None => panic!("missing slot"),
        };
        assert!(slot.patch_state().delegate_attached());
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn load_from_store_fetches_the_slot_document() {
        let (mut host, _) = host();
        let contact = route(&host, "/epikoinwnia");
        let store = MemoryDocumentStore::default().with_document("epikoinwnia.html", PAGE);

        if let Err(error) = host.load_from_store(&contact, &store) {
            panic!("{error}");
        }
        let Some(document) = host.document(&contact) else {
            panic!("contact not loaded");
        };
        assert_eq!(document.title().as_deref(), Some("Home"));
        assert!(document.url().as_str().ends_with("/centralkastoriahouses.gr/epikoinwnia.html"));

        let home = route(&host, "/");
        assert_eq!(
            host.load_from_store(&home, &store).err().map(|error| error.code),
            Some("html.store.missing_document")
        );
        assert!(host.document(&home).is_none());
    }

    #[test]
    fn opaque_content_is_left_alone() {
        let (mut host, _) = host();
        let home = route(&host, "/");
        assert!(host.load(&home, EmbeddedContent::Opaque));
        let slot = match host.slot(&home) {
            Some(slot) => slot,
            None => panic!("missing slot"),
        };
        assert!(!slot.patch_state().delegate_attached());
        assert!(slot.watcher().is_none());
        assert!(host.dispatch_click(&home, 1).is_none());
    }

    #[test]
    fn scroll_resets_fire_at_scheduled_delays() {
        let (mut host, _) = host();
        let home = route(&host, "/");
        load_page(&mut host, &home);

        let scroll = |host: &mut FrameHost, y: u32| {
            if let Some(document) = host.document_mut(&home) {
                document.scroll.window_y = y;
                document.scroll.body_top = y;
            }
        };
        let at_origin = |host: &FrameHost| {
            host.document(&home)
                .is_some_and(|document| document.scroll.is_at_origin())
        };

        assert!(at_origin(&host));
        scroll(&mut host, 300);
        host.advance(Duration::from_millis(119));
        assert!(!at_origin(&host));
        host.advance(Duration::from_millis(1));
        assert!(at_origin(&host));

        scroll(&mut host, 800);
        host.advance(Duration::from_millis(380));
        assert!(at_origin(&host));

        scroll(&mut host, 50);
        host.advance(Duration::from_secs(10));
        assert!(!at_origin(&host));
    }

    #[test]
    fn watcher_reruns_pass_until_timeout() {
        let (mut host, _) = host();
        let home = route(&host, "/");
        load_page(&mut host, &home);

        let inject = |host: &mut FrameHost, href: &str| {
            let Some(document) = host.document_mut(&home) else {
                panic!("home not loaded");
            };
            let gallery = match document.element_by_id("gallery") {
                Some(node) => node,
                None => panic!("gallery missing"),
            };
            let anchor = document.create_element("a");
            document.set_attribute(anchor, "href", href);
            document.append_child(gallery, anchor);
            anchor
        };

        let early = inject(&mut host, "topo8esia.html");
        host.advance(Duration::from_millis(1_000));
        assert_eq!(
            host.document(&home).and_then(|doc| doc.attribute(early, "href")),
            Some("/topo8esia")
        );

        host.advance(Duration::from_millis(3_000));
        let late = inject(&mut host, "epikoinwnia.html");
        assert_eq!(host.deliver_mutation_records(), 0);
        assert_eq!(
            host.document(&home).and_then(|doc| doc.attribute(late, "href")),
            Some("epikoinwnia.html")
        );
        let reruns = host
            .slot(&home)
            .and_then(|slot| slot.watcher())
            .map(|watcher| watcher.reruns());
        assert_eq!(reruns, Some(1));
    }

    #[test]
    fn reload_starts_a_fresh_generation() {
        let (mut host, _) = host();
        let home = route(&host, "/");
        load_page(&mut host, &home);
        host.advance(Duration::from_millis(50));
        load_page(&mut host, &home);

        let slot = match host.slot(&home) {
            Some(slot) => slot,
            None => panic!("missing slot"),
        };
        assert_eq!(slot.generation(), 2);
        assert_eq!(slot.patch_state().generation(), 2);
        let deadline = slot.watcher().map(|watcher| watcher.deadline());
        assert_eq!(deadline, Some(Duration::from_millis(4_050)));

        // The first load's expiry at 4000 ms must not disconnect the new watcher.
        host.advance(Duration::from_millis(3_990));
        let active = host
            .slot(&home)
            .and_then(|slot| slot.watcher())
            .is_some_and(|watcher| watcher.is_active(host.now()));
        assert!(active);
    }

    #[test]
    fn delegate_routes_clicks_to_host_router() {
        let (mut host, calls) = host();
        let home = route(&host, "/");
        load_page(&mut host, &home);

        let anchor = match host.document(&home) {
            Some(document) => document.elements_by_tag("a")[0],
            None => panic!("home not loaded"),
        };
        let event = host.dispatch_click(&home, anchor);
        assert!(event.is_some_and(|event| event.default_prevented()));
        assert_eq!(*calls.0.borrow(), vec!["/diamerismata".to_owned()]);
    }
}
