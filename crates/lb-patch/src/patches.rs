use crate::PatchContext;
use crate::PatchDescriptor;
use crate::PatchKind;
use crate::PatchState;
use crate::map_href_to_route;
use lb_dom::Document;
use lb_dom::NodeId;

const BRANDING_CLASS: &str = "block-header-logo__image";

/// Relaxed reveal timing for the site builder's fade/slide/scale transitions.
pub const MOTION_OVERRIDE_CSS: &str = r#"
.transition.transition--fade:not(.transition--root-hidden)[data-animation-state="active"],
.transition.transition--fade.transition--root-hidden [data-animation-role="image"][data-animation-state="active"].loaded,
.transition.transition--fade.transition--root-hidden [data-animation-role="block-element"][data-animation-state="active"]{
  transition-duration: 1.8s !important;
  transition-delay: 0.02s !important;
  transition-timing-function: ease-out !important;
}

.transition.transition--slide:not(.transition--root-hidden)[data-animation-state="active"],
.transition.transition--slide.transition--root-hidden [data-animation-role="image"][data-animation-state="active"].loaded,
.transition.transition--slide.transition--root-hidden [data-animation-role="block-element"][data-animation-state="active"]{
  transition-duration: 1.8s !important;
  transition-delay: 0.02s !important;
  transition-timing-function: ease-out !important;
}

.transition.transition--scale:not(.transition--root-hidden)[data-animation-state="active"],
.transition.transition--scale.transition--root-hidden [data-animation-role="image"][data-animation-state="active"].loaded,
.transition.transition--scale.transition--root-hidden [data-animation-role="block-element"][data-animation-state="active"]{
  transition-duration: 1.8s !important;
  transition-delay: 0.02s !important;
  transition-timing-function: ease-out !important;
}
"#;

pub(crate) const BRANDING: PatchDescriptor = PatchDescriptor {
    kind: PatchKind::Branding,
    select: select_branding_images,
    is_applied: branding_is_applied,
    mutate: fix_branding_image,
    mark_applied: mark_branding,
};

pub(crate) const ANCHORS: PatchDescriptor = PatchDescriptor {
    kind: PatchKind::Anchors,
    select: select_mappable_anchors,
    is_applied: anchor_is_applied,
    mutate: rewrite_anchor,
    mark_applied: mark_anchor,
};

pub(crate) const MOTION: PatchDescriptor = PatchDescriptor {
    kind: PatchKind::Motion,
    select: select_head,
    is_applied: motion_is_applied,
    mutate: append_motion_override,
    mark_applied: mark_motion,
};

fn select_branding_images(document: &Document, _ctx: &PatchContext<'_>) -> Vec<NodeId> {
    document
        .elements_by_tag("img")
        .into_iter()
        .filter(|node| {
            document.has_class(*node, BRANDING_CLASS)
                || document
                    .attribute(*node, "alt")
                    .is_some_and(|alt| alt.to_ascii_lowercase().contains("logo"))
        })
        .collect()
}

fn branding_is_applied(
    _document: &Document,
    node: NodeId,
    state: &PatchState,
    _ctx: &PatchContext<'_>,
) -> bool {
    state.is_branding_fixed(node)
}

fn fix_branding_image(document: &mut Document, node: NodeId, ctx: &PatchContext<'_>) -> bool {
    // Non-short-circuiting: all three edits always run.
    let src = document.set_attribute(node, "src", ctx.branding_asset);
    let srcset = document.remove_attribute(node, "srcset");
    let sizes = document.remove_attribute(node, "sizes");
    src | srcset | sizes
}

fn mark_branding(state: &mut PatchState, node: NodeId) {
    state.mark_branding_fixed(node);
}

fn mapped_href(document: &Document, node: NodeId, ctx: &PatchContext<'_>) -> Option<String> {
    let href = document.attribute(node, "href")?;
    map_href_to_route(href, &ctx.base_url, ctx.host_origin, ctx.table)
        .map(|request| request.href())
}

fn select_mappable_anchors(document: &Document, ctx: &PatchContext<'_>) -> Vec<NodeId> {
    document
        .elements_by_tag("a")
        .into_iter()
        .filter(|node| {
            document.attribute(*node, "href").is_some_and(|href| {
                let mapped = map_href_to_route(href, &ctx.base_url, ctx.host_origin, ctx.table);
                if mapped.is_none() {
                    log::trace!(target: "lb::patch", "leaving anchor `{href}` untouched");
                }
                mapped.is_some()
            })
        })
        .collect()
}

// Anchors are recognised as done from the DOM alone, so anchors whose href
// is changed by the page again are rewritten on the next pass.
fn anchor_is_applied(
    document: &Document,
    node: NodeId,
    _state: &PatchState,
    ctx: &PatchContext<'_>,
) -> bool {
    let Some(mapped) = mapped_href(document, node, ctx) else {
        return true;
    };
    document.attribute(node, "href") == Some(mapped.as_str())
        && document.attribute(node, "target") == Some("_top")
        && document.attribute(node, "rel") == Some("noopener")
}

fn rewrite_anchor(document: &mut Document, node: NodeId, ctx: &PatchContext<'_>) -> bool {
    let Some(mapped) = mapped_href(document, node, ctx) else {
        return false;
    };
    let href = document.set_attribute(node, "href", &mapped);
    let target = document.set_attribute(node, "target", "_top");
    let rel = document.set_attribute(node, "rel", "noopener");
    href | target | rel
}

// Nothing to record: see `anchor_is_applied`.
fn mark_anchor(_state: &mut PatchState, _node: NodeId) {}

fn select_head(document: &Document, _ctx: &PatchContext<'_>) -> Vec<NodeId> {
    match document.head() {
        Some(head) => vec![head],
        None => {
            log::trace!(target: "lb::patch", "{} has no head, skipping motion override", document.url());
            Vec::new()
        }
    }
}

fn motion_is_applied(
    document: &Document,
    _head: NodeId,
    state: &PatchState,
    ctx: &PatchContext<'_>,
) -> bool {
    state.motion_applied() || document.element_by_id(ctx.motion_style_id).is_some()
}

fn append_motion_override(document: &mut Document, head: NodeId, ctx: &PatchContext<'_>) -> bool {
    let style = document.create_element("style");
    document.set_attribute(style, "id", ctx.motion_style_id);
    let css = document.create_text(MOTION_OVERRIDE_CSS);
    document.append_child(style, css);
    document.append_child(head, style)
}

fn mark_motion(state: &mut PatchState, _head: NodeId) {
    state.mark_motion_applied();
}
