//! User settings for connections and interactive sessions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Tunables read from `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout for each TCP dial and SSH handshake
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Idle time before the transport sends a `keepalive@openssh.com` request
    #[serde(with = "duration_secs")]
    pub keepalive_interval: Duration,

    /// How often the local terminal size is polled
    #[serde(with = "duration_secs")]
    pub resize_poll_interval: Duration,

    /// Terminal type sent with the PTY request
    pub term: String,

    /// Private key tried when a profile has no `keypath`
    pub default_key_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(10),
            resize_poll_interval: Duration::from_secs(1),
            term: "xterm".to_string(),
            default_key_path: dirs::home_dir()
                .unwrap_or_default()
                .join(".ssh")
                .join("id_rsa"),
        }
    }
}

impl Settings {
    /// Replace zero durations with their defaults
    pub fn normalized(mut self) -> Self {
        let defaults = Settings::default();
        for (name, value, default) in [
            ("connect_timeout", &mut self.connect_timeout, defaults.connect_timeout),
            ("keepalive_interval", &mut self.keepalive_interval, defaults.keepalive_interval),
            (
                "resize_poll_interval",
                &mut self.resize_poll_interval,
                defaults.resize_poll_interval,
            ),
        ] {
            if value.is_zero() {
                tracing::warn!("{} must be greater than zero, using {:?}", name, default);
                *value = default;
            }
        }
        self
    }
}
