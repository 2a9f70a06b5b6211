//! # Client configuration — `safewalk.toml`
//!
//! Defines the TOML configuration file read at startup (filename:
//! [`SafewalkConfig::filename`] = `"safewalk.toml"`).
//!
//! ## Structure
//!
//! ```toml
//! [server]
//! base_url = "https://safewalk.example.edu"
//! socket_url = "wss://safewalk.example.edu/socket"
//!
//! [walk]
//! pending_timeout_secs = 30   # auto-cancel an unanswered request
//! ```
//!
//! All sections derive `Default` with production defaults, so a missing or
//! empty config file is equivalent to the default configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration stored in `safewalk.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SafewalkConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub walk: WalkConfig,
}

/// Backend endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_socket_url")]
    pub socket_url: String,
}

/// Walk lifecycle tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalkConfig {
    /// How long an unanswered request waits before it is auto-canceled.
    #[serde(default = "default_pending_timeout")]
    pub pending_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_socket_url() -> String {
    "ws://localhost:5000/socket".to_string()
}

fn default_pending_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            socket_url: default_socket_url(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            pending_timeout_secs: default_pending_timeout(),
        }
    }
}

impl WalkConfig {
    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }
}

impl SafewalkConfig {
    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "safewalk.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read a config file, falling back to defaults when it is missing or
    /// malformed.
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match Self::from_toml(&text) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "invalid config file, using defaults");
                Self::default()
            }
        }
    }
}
