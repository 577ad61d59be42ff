//! Server configuration, read once from LSP `initializationOptions`.

use serde::Deserialize;

/// Tunables the client may override at initialize time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Quiet period after the last edit before diagnostics are computed and
    /// published. A force-validate request bypasses it.
    pub debounce_ms: u64,
    /// Whether to report section-level-skip style diagnostics.
    pub style_checks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 350,
            style_checks: true,
        }
    }
}

impl Config {
    /// Parse from `initializationOptions`, falling back to defaults on
    /// missing or malformed input.
    #[must_use]
    pub fn from_initialization_options(options: Option<&serde_json::Value>) -> Self {
        match options {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|error| {
                tracing::warn!("invalid initializationOptions, using defaults: {error}");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
