//! DOM tree data structures for embedded legacy documents.
//!
//! A [`Document`] is an arena of nodes addressed by [`NodeId`]. Child-list
//! changes are queued as [`MutationRecord`]s so an observer can react to
//! structural changes, and every effective mutation bumps a counter that
//! callers use to check idempotence.

use std::fmt;
use std::rc::Rc;
use url::Url;

mod event;

pub use event::DomEvent;
pub use event::EventKind;
pub use event::EventListener;

use event::RegisteredListener;

/// ID used to address nodes in the DOM arena.
pub type NodeId = u32;

/// Payload of a single DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

/// Element tag plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Child-list change observed under a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Scroll offsets of the document's window, root element and body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub window_x: u32,
    pub window_y: u32,
    pub document_element_top: u32,
    pub body_top: u32,
}

impl ScrollState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_at_origin(&self) -> bool {
        *self == Self::default()
    }
}

/// Embedded document instance.
pub struct Document {
    url: Url,
    nodes: Vec<Node>,
    mutation_count: u64,
    records: Vec<MutationRecord>,
    listeners: Vec<RegisteredListener>,
    pub scroll: ScrollState,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url.as_str())
            .field("nodes", &self.nodes.len())
            .field("mutation_count", &self.mutation_count)
            .field("pending_records", &self.records.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Document {
    pub const ROOT: NodeId = 0;

    pub fn new(url: Url) -> Self {
        Self {
            url,
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            mutation_count: 0,
            records: Vec::new(),
            listeners: Vec::new(),
            scroll: ScrollState::default(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Base URL for resolving relative references: the first `<base href>`
    /// that parses, otherwise the document URL.
    pub fn base_url(&self) -> Url {
        self.elements_by_tag("base")
            .into_iter()
            .filter_map(|node| self.attribute(node, "href"))
            .find_map(|href| self.url.join(href).ok())
            .unwrap_or_else(|| self.url.clone())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.node(node).map(|node| &node.data)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.data(node) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    pub fn is_element(&self, node: NodeId, tag: &str) -> bool {
        self.tag_name(node)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|node| node.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|element| element.attr(name))
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    /// True when the node is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == Self::ROOT {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(Self::ROOT)
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.is_element(*child, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.is_element(*child, "body"))
    }

    pub fn title(&self) -> Option<String> {
        let title = self.elements_by_tag("title").into_iter().next()?;
        let collapsed = self
            .text_content(title)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed)
        }
    }

    /// Descendants of `node` in tree order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.children(node).iter().rev().copied().collect::<Vec<_>>();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Connected elements in tree order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(Self::ROOT)
            .into_iter()
            .filter(|node| self.element(*node).is_some())
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(Self::ROOT)
            .into_iter()
            .filter(|node| self.is_element(*node, tag))
            .collect()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(Self::ROOT)
            .into_iter()
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// Nearest inclusive ancestor matching `predicate`.
    pub fn closest(
        &self,
        node: NodeId,
        predicate: impl Fn(&Self, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if predicate(self, current) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeData::Text(text)) = self.data(node) {
            out.push_str(text);
        }
        for descendant in self.descendants(node) {
            if let Some(NodeData::Text(text)) = self.data(descendant) {
                out.push_str(text);
            }
        }
        out
    }

    /// Creates a detached element. Not a mutation until it is inserted.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    /// Appends `child` to `parent`, detaching it from any previous parent.
    ///
    /// Returns false without mutating when either id is unknown, the parent
    /// cannot hold children, or the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if child == Self::ROOT || self.node(child).is_none() {
            return false;
        }
        if !matches!(
            self.data(parent),
            Some(NodeData::Document | NodeData::Element(_))
        ) {
            return false;
        }
        if self.closest(parent, |_, node| node == child).is_some() {
            return false;
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child);
        }

        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        self.mutation_count = self.mutation_count.saturating_add(1);
        self.records.push(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        true
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }

        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|existing| *existing != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
        self.mutation_count = self.mutation_count.saturating_add(1);
        self.records.push(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
        });
        true
    }

    /// Sets an attribute. Returns true only when the stored value changed.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(element) = self.element_mut(node) else {
            return false;
        };

        match element
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) if existing == value => return false,
            Some((_, existing)) => *existing = value.to_owned(),
            None => element
                .attrs
                .push((name.to_ascii_lowercase(), value.to_owned())),
        }

        self.mutation_count = self.mutation_count.saturating_add(1);
        true
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
        let Some(element) = self.element_mut(node) else {
            return false;
        };

        let before = element.attrs.len();
        element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        if element.attrs.len() == before {
            return false;
        }

        self.mutation_count = self.mutation_count.saturating_add(1);
        true
    }

    /// Number of effective mutations applied since the document was created.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Drains queued child-list records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn add_event_listener(
        &mut self,
        kind: EventKind,
        capture: bool,
        listener: Rc<dyn EventListener>,
    ) {
        self.listeners.push(RegisteredListener {
            kind,
            capture,
            listener,
        });
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|registered| registered.kind == kind)
            .count()
    }

    /// Dispatches an event through the document-level listeners: capturing
    /// listeners first, then bubbling ones unless propagation was stopped.
    pub fn dispatch(&self, mut event: DomEvent) -> DomEvent {
        let snapshot = self
            .listeners
            .iter()
            .filter(|registered| registered.kind == event.kind)
            .map(|registered| (registered.capture, Rc::clone(&registered.listener)))
            .collect::<Vec<_>>();

        for capture in [true, false] {
            for (listener_capture, listener) in &snapshot {
                if *listener_capture != capture {
                    continue;
                }
                listener.handle_event(self, &mut event);
            }
            if event.propagation_stopped() {
                break;
            }
        }

        event
    }

    fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node as usize)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node as usize)
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.node_mut(node).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::try_from(self.nodes.len()).unwrap_or(NodeId::MAX);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }
}
