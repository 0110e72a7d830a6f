use lb_patch::NavigationRequest;

/// Receiver of navigations intercepted inside embedded documents.
///
/// Implementations own history; the bridge only ever asks for a push.
pub trait HostRouter {
    fn navigate(&self, request: &NavigationRequest);
}
