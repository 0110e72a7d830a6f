//! Shared primitives used across legacy-bridge crates.

use core::fmt;

mod config;

pub use config::BridgeConfig;
pub use config::DEFAULT_BRANDING_ASSET;
pub use config::DEFAULT_LEGACY_BASE_PATH;
pub use config::MOTION_OVERRIDE_STYLE_ID;

/// Result alias used across the workspace.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error raised while configuring the bridge or loading its inputs.
///
/// The patch and navigation protocol never return this; they degrade to
/// unmodified legacy behaviour instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    pub code: &'static str,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for BridgeError {}

#[cfg(test)]
mod tests {
    use super::BridgeError;

    #[test]
    fn display_includes_code_and_message() {
        let error = BridgeError::new("routes.table.empty", "route table has no entries");
        assert_eq!(
            error.to_string(),
            "routes.table.empty: route table has no entries"
        );
    }
}
