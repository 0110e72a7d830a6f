//! Idempotent post-load patches applied to embedded legacy documents.
//!
//! A pass runs the [`PatchPipeline`] over a document: branding-image
//! correction, anchor rewriting to canonical routes and the motion-timing
//! override, in that order. What has already been applied is tracked in a
//! [`PatchState`] owned by whoever owns the document, so a second pass over
//! an unchanged document performs no mutations.

use lb_core::BridgeConfig;
use lb_dom::Document;
use lb_dom::NodeId;
use lb_routes::RouteTable;
use std::collections::HashSet;
use url::Origin;
use url::Url;

mod href;
mod patches;
mod pipeline;
mod watcher;

pub use href::NavigationRequest;
pub use href::map_href_to_route;
pub use patches::MOTION_OVERRIDE_CSS;
pub use pipeline::PassReport;
pub use pipeline::PatchDescriptor;
pub use pipeline::PatchKind;
pub use pipeline::PatchPipeline;
pub use watcher::StructuralWatcher;

/// Inputs shared by every patch in a pass.
///
/// Built once per pass for one document, so `base_url` reflects the
/// document's `<base>` at the start of the pass.
#[derive(Debug, Clone)]
pub struct PatchContext<'a> {
    pub table: &'a RouteTable,
    pub host_origin: &'a Origin,
    pub base_url: Url,
    pub branding_asset: &'a str,
    pub motion_style_id: &'a str,
}

impl<'a> PatchContext<'a> {
    pub fn for_document(
        table: &'a RouteTable,
        host_origin: &'a Origin,
        config: &'a BridgeConfig,
        document: &Document,
    ) -> Self {
        Self {
            table,
            host_origin,
            base_url: document.base_url(),
            branding_asset: &config.branding_asset,
            motion_style_id: &config.motion_style_id,
        }
    }
}

/// Per-document record of applied patches.
///
/// Tied to one load generation of one document. A reload replaces it with a
/// fresh record; nothing is ever un-marked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchState {
    generation: u64,
    branding_fixed: HashSet<NodeId>,
    motion_applied: bool,
    delegate_attached: bool,
}

impl PatchState {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_branding_fixed(&self, node: NodeId) -> bool {
        self.branding_fixed.contains(&node)
    }

    pub fn mark_branding_fixed(&mut self, node: NodeId) {
        self.branding_fixed.insert(node);
    }

    pub fn branding_fixed_count(&self) -> usize {
        self.branding_fixed.len()
    }

    pub fn motion_applied(&self) -> bool {
        self.motion_applied
    }

    pub fn mark_motion_applied(&mut self) {
        self.motion_applied = true;
    }

    pub fn delegate_attached(&self) -> bool {
        self.delegate_attached
    }

    /// Records the delegate as attached. Returns false if it already was.
    pub fn mark_delegate_attached(&mut self) -> bool {
        !std::mem::replace(&mut self.delegate_attached, true)
    }
}
