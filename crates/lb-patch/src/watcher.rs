use std::time::Duration;

/// Bounded-lifetime observer of structural changes in one document.
///
/// Times are offsets on the owner's clock. The watcher is live from
/// `attached_at` until `attached_at + timeout` and disconnects itself once
/// it notices the deadline has passed; it never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralWatcher {
    attached_at: Duration,
    timeout: Duration,
    connected: bool,
    reruns: u32,
}

impl StructuralWatcher {
    pub fn attach(now: Duration, timeout: Duration) -> Self {
        Self {
            attached_at: now,
            timeout,
            connected: true,
            reruns: 0,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.attached_at.saturating_add(self.timeout)
    }

    pub fn is_active(&self, now: Duration) -> bool {
        self.connected && now < self.deadline()
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Number of patch passes triggered by structural signals.
    pub fn reruns(&self) -> u32 {
        self.reruns
    }

    /// Handles one structural-change signal. Returns true when the owner
    /// should rerun the patch pass.
    pub fn on_structural_change(&mut self, now: Duration) -> bool {
        if !self.is_active(now) {
            if self.connected {
                log::debug!(target: "lb::patch", "structural watcher expired after {:?}", self.timeout);
            }
            self.connected = false;
            return false;
        }

        self.reruns = self.reruns.saturating_add(1);
        true
    }
}
