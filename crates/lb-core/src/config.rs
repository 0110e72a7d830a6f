//! Runtime knobs for the frame host and patch protocol.

use crate::BridgeError;
use crate::BridgeResult;
use std::time::Duration;

/// Where the migrated static site lives on the host origin.
pub const DEFAULT_LEGACY_BASE_PATH: &str =
    "/legacy/CentralKastoriaHouses.gr/centralkastoriahouses.gr";

/// Locally mirrored logo that replaces the legacy documents' own references.
pub const DEFAULT_BRANDING_ASSET: &str = "/assets.zyrosite.com/cdn-cgi/image/format=auto,w=136,fit=crop,q=95/AGB64eZ1E0H835lp/logo-YbNv9KnJOOUPq2BE.png";

/// Id of the style node appended by the motion override.
pub const MOTION_OVERRIDE_STYLE_ID: &str = "legacy-motion-override";

const DEFAULT_SCROLL_RESET_DELAYS_MS: [u64; 2] = [120, 500];
const DEFAULT_WATCHER_TIMEOUT_MS: u64 = 4_000;
const MAX_WATCHER_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_SCROLL_RESETS: usize = 8;
const MAX_SCROLL_RESET_DELAY: Duration = Duration::from_secs(10);

const ENV_WATCHER_TIMEOUT_MS: &str = "LEGACY_BRIDGE_WATCHER_TIMEOUT_MS";
const ENV_SCROLL_RESET_DELAYS_MS: &str = "LEGACY_BRIDGE_SCROLL_RESET_DELAYS_MS";
const ENV_BASE_PATH: &str = "LEGACY_BRIDGE_BASE_PATH";

/// Frame host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Offsets after load at which the embedded scroll position is forced
    /// back to the origin.
    pub scroll_reset_delays: Vec<Duration>,
    /// Lifetime of the structural watcher. Content that changes after this
    /// window is not re-patched.
    pub watcher_timeout: Duration,
    pub legacy_base_path: String,
    pub branding_asset: String,
    pub motion_style_id: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scroll_reset_delays: DEFAULT_SCROLL_RESET_DELAYS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            watcher_timeout: Duration::from_millis(DEFAULT_WATCHER_TIMEOUT_MS),
            legacy_base_path: DEFAULT_LEGACY_BASE_PATH.to_owned(),
            branding_asset: DEFAULT_BRANDING_ASSET.to_owned(),
            motion_style_id: MOTION_OVERRIDE_STYLE_ID.to_owned(),
        }
    }
}

impl BridgeConfig {
    /// Defaults with environment overrides applied, validated.
    pub fn from_env() -> BridgeResult<Self> {
        let config = Self::default().with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides looked up by variable name. Unparseable values are
    /// logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_WATCHER_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.watcher_timeout = Duration::from_millis(ms),
                Err(error) => log::warn!(
                    target: "lb::config",
                    "ignoring {ENV_WATCHER_TIMEOUT_MS}=`{raw}`: {error}"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_SCROLL_RESET_DELAYS_MS) {
            match parse_delay_list(&raw) {
                Some(delays) => self.scroll_reset_delays = delays,
                None => log::warn!(
                    target: "lb::config",
                    "ignoring {ENV_SCROLL_RESET_DELAYS_MS}=`{raw}`: expected comma-separated milliseconds"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_BASE_PATH) {
            let raw = raw.trim();
            // The site root itself keeps its single slash.
            let trimmed = match raw.trim_end_matches('/') {
                "" if raw.starts_with('/') => "/",
                trimmed => trimmed,
            };
            self.legacy_base_path = trimmed.to_owned();
        }

        self
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.watcher_timeout.is_zero() {
            return Err(BridgeError::new(
                "config.watcher_timeout_invalid",
                "structural watcher timeout must be greater than zero",
            ));
        }

        if self.watcher_timeout > MAX_WATCHER_TIMEOUT {
            return Err(BridgeError::new(
                "config.watcher_timeout_too_large",
                format!(
                    "structural watcher timeout exceeds hard limit ({} s)",
                    MAX_WATCHER_TIMEOUT.as_secs()
                ),
            ));
        }

        if self.scroll_reset_delays.len() > MAX_SCROLL_RESETS {
            return Err(BridgeError::new(
                "config.scroll_resets_too_many",
                format!(
                    "at most {MAX_SCROLL_RESETS} scheduled scroll resets are allowed, got {}",
                    self.scroll_reset_delays.len()
                ),
            ));
        }

        if let Some(delay) = self
            .scroll_reset_delays
            .iter()
            .find(|delay| **delay > MAX_SCROLL_RESET_DELAY)
        {
            return Err(BridgeError::new(
                "config.scroll_reset_delay_too_large",
                format!(
                    "scroll reset at {} ms is past the {} s limit",
                    delay.as_millis(),
                    MAX_SCROLL_RESET_DELAY.as_secs()
                ),
            ));
        }

        if !self.legacy_base_path.starts_with('/') {
            return Err(BridgeError::new(
                "config.base_path_invalid",
                format!(
                    "legacy base path `{}` must be an absolute path",
                    self.legacy_base_path
                ),
            ));
        }

        if self.motion_style_id.trim().is_empty() {
            return Err(BridgeError::new(
                "config.motion_style_id_empty",
                "motion override style id must not be empty",
            ));
        }

        Ok(())
    }

    /// Source path of a legacy document on the host origin.
    pub fn document_path(&self, document_id: &str) -> String {
        let base = self.legacy_base_path.trim_end_matches('/');
        format!("{base}/{document_id}")
    }
}

fn parse_delay_list(raw: &str) -> Option<Vec<Duration>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }

    trimmed
        .split(',')
        .map(|part| part.trim().parse::<u64>().ok().map(Duration::from_millis))
        .collect()
}
