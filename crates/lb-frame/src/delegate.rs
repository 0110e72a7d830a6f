use crate::HostRouter;
use lb_dom::Document;
use lb_dom::DomEvent;
use lb_dom::EventListener;
use lb_dom::NodeId;
use lb_patch::map_href_to_route;
use lb_routes::RouteTable;
use std::rc::Rc;
use url::Origin;

/// Capturing click listener that hands internal link activation to the
/// host router instead of letting the embedded document navigate itself.
pub struct NavigationDelegate {
    router: Rc<dyn HostRouter>,
    table: Rc<RouteTable>,
    host_origin: Origin,
}

impl NavigationDelegate {
    pub fn new(router: Rc<dyn HostRouter>, table: Rc<RouteTable>, host_origin: Origin) -> Self {
        Self {
            router,
            table,
            host_origin,
        }
    }
}

impl EventListener for NavigationDelegate {
    fn handle_event(&self, document: &Document, event: &mut DomEvent) {
        let Some(anchor) = document.closest(event.target, is_link) else {
            return;
        };
        let Some(href) = document.attribute(anchor, "href") else {
            return;
        };

        let Some(request) =
            map_href_to_route(href, &document.base_url(), &self.host_origin, &self.table)
        else {
            log::trace!(target: "lb::frame", "click on `{href}` proceeds natively");
            return;
        };

        event.prevent_default();
        event.stop_propagation();
        log::debug!(target: "lb::frame", "intercepted click on `{href}`, navigating to {request}");
        self.router.navigate(&request);
    }
}

fn is_link(document: &Document, node: NodeId) -> bool {
    document.is_element(node, "a") && document.has_attribute(node, "href")
}

#[cfg(test)]
mod tests {
    use super::NavigationDelegate;
    use crate::HostRouter;
    use lb_dom::Document;
    use lb_dom::DomEvent;
    use lb_dom::EventKind;
    use lb_html::HtmlParser;
    use lb_patch::NavigationRequest;
    use lb_routes::RouteTable;
    use std::cell::RefCell;
    use std::rc::Rc;
    use url::Url;

    #[derive(Default)]
    struct Calls(RefCell<Vec<String>>);

    impl HostRouter for Calls {
        fn navigate(&self, request: &NavigationRequest) {
            self.0.borrow_mut().push(request.href());
        }
    }

    fn delegated(source: &str) -> (Document, Rc<Calls>) {
        let url = match Url::parse("https://centralkastoriahouses.gr/legacy/site/index.html") {
            Ok(url) => url,
            Err(error) => panic!("{error}"),
        };
        let calls = Rc::new(Calls::default());
        let mut doc = HtmlParser.parse(source, url.clone());
        let delegate = NavigationDelegate::new(
            calls.clone(),
            Rc::new(RouteTable::builtin()),
            url.origin(),
        );
        doc.add_event_listener(EventKind::Click, true, Rc::new(delegate));
        (doc, calls)
    }

    #[test]
    fn click_inside_internal_anchor_navigates_once() {
        let (doc, calls) = delegated(
            r#"<body><a href="topo8esia.html#map"><span>Location</span></a></body>"#,
        );
        let span = doc.elements_by_tag("span")[0];

        let event = doc.dispatch(DomEvent::click(span));
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
        assert_eq!(*calls.0.borrow(), vec!["/topo8esia#map".to_owned()]);
    }

    #[test]
    fn unmapped_and_external_clicks_proceed_natively() {
        let (doc, calls) = delegated(
            r#"<body><a href="https://www.airbnb.com/">Airbnb</a><a href="tel:+30">Call</a><a href="/nowhere">X</a><p>text</p></body>"#,
        );
        let mut targets = doc.elements_by_tag("a");
        targets.extend(doc.elements_by_tag("p"));

        for target in targets {
            let event = doc.dispatch(DomEvent::click(target));
            assert!(!event.default_prevented());
            assert!(!event.propagation_stopped());
        }
        assert!(calls.0.borrow().is_empty());
    }
}
