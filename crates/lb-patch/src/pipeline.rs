use crate::PatchContext;
use crate::PatchState;
use crate::patches;
use lb_dom::Document;
use lb_dom::NodeId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    Branding,
    Anchors,
    Motion,
}

impl PatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branding => "branding",
            Self::Anchors => "anchors",
            Self::Motion => "motion",
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation kind, split into the four steps every patch goes through.
///
/// `select` lists candidate nodes, `is_applied` filters out the ones already
/// done, `mutate` applies the change (returning whether the DOM changed) and
/// `mark_applied` records the node in the pass state.
#[derive(Clone, Copy)]
pub struct PatchDescriptor {
    pub kind: PatchKind,
    pub select: fn(&Document, &PatchContext<'_>) -> Vec<NodeId>,
    pub is_applied: fn(&Document, NodeId, &PatchState, &PatchContext<'_>) -> bool,
    pub mutate: fn(&mut Document, NodeId, &PatchContext<'_>) -> bool,
    pub mark_applied: fn(&mut PatchState, NodeId),
}

impl fmt::Debug for PatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchDescriptor")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Count of nodes each patch kind changed during one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub branding: usize,
    pub anchors: usize,
    pub motion: usize,
}

impl PassReport {
    pub fn total(&self) -> usize {
        self.branding + self.anchors + self.motion
    }

    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }

    fn record(&mut self, kind: PatchKind) {
        match kind {
            PatchKind::Branding => self.branding += 1,
            PatchKind::Anchors => self.anchors += 1,
            PatchKind::Motion => self.motion += 1,
        }
    }
}

/// Ordered list of patches run as one pass.
#[derive(Debug, Clone)]
pub struct PatchPipeline {
    descriptors: Vec<PatchDescriptor>,
}

impl Default for PatchPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl PatchPipeline {
    /// Branding, then anchors, then the motion override.
    pub fn standard() -> Self {
        Self {
            descriptors: vec![patches::BRANDING, patches::ANCHORS, patches::MOTION],
        }
    }

    pub fn descriptors(&self) -> &[PatchDescriptor] {
        &self.descriptors
    }

    pub fn run(
        &self,
        document: &mut Document,
        state: &mut PatchState,
        ctx: &PatchContext<'_>,
    ) -> PassReport {
        let mut report = PassReport::default();

        for descriptor in &self.descriptors {
            for node in (descriptor.select)(document, ctx) {
                if (descriptor.is_applied)(document, node, state, ctx) {
                    continue;
                }
                if (descriptor.mutate)(document, node, ctx) {
                    report.record(descriptor.kind);
                }
                (descriptor.mark_applied)(state, node);
            }
        }

        log::debug!(
            target: "lb::patch",
            "pass on {} (generation {}): branding={} anchors={} motion={}",
            document.url(),
            state.generation(),
            report.branding,
            report.anchors,
            report.motion
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::PatchKind;
    use super::PatchPipeline;
    use crate::PatchContext;
    use crate::PatchState;
    use lb_core::BridgeConfig;
    use lb_dom::Document;
    use lb_html::HtmlParser;
    use lb_routes::RouteTable;
    use url::Url;

    const PAGE: &str = r#"<!doctype html>
<html><head><title>Home</title></head>
<body>
  <img class="block-header-logo__image" src="/old-logo.png" srcset="/old-logo@2x.png 2x" sizes="136px">
  <a href="/diamerismata.html?lang=en#gallery">Apartments</a>
  <a href="https://www.booking.com/hotel/gr/central-kastoria.html">Book</a>
</body></html>"#;

    fn parse(source: &str) -> Document {
        match Url::parse(
            "https://centralkastoriahouses.gr/legacy/CentralKastoriaHouses.gr/centralkastoriahouses.gr/index.html",
        ) {
            Ok(url) => HtmlParser.parse(source, url),
            Err(error) => panic!("{error}"),
        }
    }

    fn run_pass(doc: &mut Document, state: &mut PatchState) -> super::PassReport {
        let table = RouteTable::builtin();
        let origin = doc.url().origin();
        let config = BridgeConfig::default();
        let ctx = PatchContext::for_document(&table, &origin, &config, doc);
        PatchPipeline::standard().run(doc, state, &ctx)
    }

    #[test]
    fn standard_pipeline_order_is_fixed() {
        let kinds = PatchPipeline::standard()
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![PatchKind::Branding, PatchKind::Anchors, PatchKind::Motion]
        );
    }

    #[test]
    fn first_pass_applies_every_patch_kind() {
        let mut doc = parse(PAGE);
        let mut state = PatchState::new(1);
        let report = run_pass(&mut doc, &mut state);

        assert_eq!(report.branding, 1);
        assert_eq!(report.anchors, 1);
        assert_eq!(report.motion, 1);
        assert!(state.motion_applied());
        assert_eq!(state.branding_fixed_count(), 1);
    }

    #[test]
    fn second_pass_produces_no_mutations() {
        let mut doc = parse(PAGE);
        let mut state = PatchState::new(1);
        run_pass(&mut doc, &mut state);
        doc.take_records();

        let before = doc.mutation_count();
        let report = run_pass(&mut doc, &mut state);
        assert!(report.is_noop());
        assert_eq!(doc.mutation_count(), before);
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn fresh_state_on_patched_document_changes_nothing_but_marks() {
        let mut doc = parse(PAGE);
        let mut state = PatchState::new(1);
        run_pass(&mut doc, &mut state);

        // The style node and rewritten anchors are recognised from the DOM.
        let before = doc.mutation_count();
        let mut reloaded_state = PatchState::new(2);
        let report = run_pass(&mut doc, &mut reloaded_state);
        assert_eq!(report.anchors, 0);
        assert_eq!(report.motion, 0);
        assert_eq!(report.branding, 0);
        assert_eq!(doc.mutation_count(), before);
        assert_eq!(reloaded_state.branding_fixed_count(), 1);
    }
}
