//! Frame host, navigation delegate and host shell of the legacy bridge.
//!
//! [`FrameHost`] keeps one embedded legacy document per route mounted and
//! runs the patch protocol on each load. A [`NavigationDelegate`] inside
//! every loaded document turns internal link clicks into [`HostRouter`]
//! calls. [`HostShell`] ties both to an in-memory history.

mod delegate;
mod host;
mod router;
pub mod shell;
mod timers;

pub use delegate::NavigationDelegate;
pub use host::EmbeddedContent;
pub use host::FrameHost;
pub use host::FrameSlot;
pub use router::HostRouter;
pub use shell::HistoryRouter;
pub use shell::HostLocation;
pub use shell::HostShell;
pub use shell::RouteView;
pub use timers::TimerQueue;
pub use timers::TimerTask;
