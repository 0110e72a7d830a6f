use crate::Document;
use crate::NodeId;
use std::rc::Rc;

/// Event types the bridge dispatches into embedded documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
}

/// In-flight event state shared with listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    pub fn click(target: NodeId) -> Self {
        Self {
            kind: EventKind::Click,
            target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Document-level event listener.
pub trait EventListener {
    fn handle_event(&self, document: &Document, event: &mut DomEvent);
}

pub(crate) struct RegisteredListener {
    pub(crate) kind: EventKind,
    pub(crate) capture: bool,
    pub(crate) listener: Rc<dyn EventListener>,
}
