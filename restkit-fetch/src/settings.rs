//! Client settings.
//!
//! Settings are plain serde data so an application can embed them in its own
//! configuration file; the library itself never reads files or environment
//! variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default SDK name written to the `User-Agent`.
pub const DEFAULT_SDK_NAME: &str = "restkit";

/// Settings for a `RestClient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// SDK name in the `User-Agent`.
    #[serde(default = "default_sdk_name")]
    pub sdk_name: String,
    /// SDK version in the `User-Agent`.
    #[serde(default = "default_sdk_version")]
    pub sdk_version: String,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub allow_insecure_connections: bool,
}

fn default_sdk_name() -> String {
    DEFAULT_SDK_NAME.to_string()
}

fn default_sdk_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}

/// Whole milliseconds, rounded up so a non-zero duration never becomes 0.
fn to_millis(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// A zero deadline would fail every request, so 0 reads as 1 ms.
fn from_millis(millis: u64) -> Duration {
    Duration::from_millis(millis.max(1))
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            sdk_name: default_sdk_name(),
            sdk_version: default_sdk_version(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            allow_insecure_connections: false,
        }
    }
}

impl ClientSettings {
    /// Sets the SDK name and version reported in the `User-Agent`.
    #[must_use]
    pub fn with_sdk(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.sdk_name = name.into();
        self.sdk_version = version.into();
        self
    }

    /// Sets the whole-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = to_millis(timeout);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = to_millis(timeout);
        self
    }

    /// Whole-request timeout.
    pub fn timeout(&self) -> Duration {
        from_millis(self.timeout_ms)
    }

    /// Connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        from_millis(self.connect_timeout_ms)
    }
}
