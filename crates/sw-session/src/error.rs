//! Session error types

use std::time::Duration;
use thiserror::Error;

/// Errors from establishing or running an SSH session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Profile secrets are still cipher tokens
    #[error("Profile '{profile}' is encrypted; decrypt it before connecting")]
    EncryptedProfile { profile: String },

    /// More than one jump host configured
    #[error("Profile '{profile}' has {hops} jump hosts; only one is supported")]
    UnsupportedJumpChain { profile: String, hops: usize },

    /// TCP connection failed
    #[error("Failed to connect to {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Dial or handshake exceeded the connect timeout
    #[error("Connection to {addr} timed out after {after:?}")]
    Timeout { addr: String, after: Duration },

    /// The jump host could not carry the connection
    #[error("Jump host {via} failed: {source}")]
    Proxy {
        via: String,
        #[source]
        source: Box<SessionError>,
    },

    /// SSH protocol failure during handshake or authentication
    #[error("SSH handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        #[source]
        source: russh::Error,
    },

    /// Every authentication method was rejected
    #[error("Authentication failed for {user}@{host}")]
    AuthenticationFailed {
        user: String,
        host: String,
        password_tried: bool,
    },

    /// A channel request failed
    #[error("Failed to {action}: {source}")]
    Channel {
        action: &'static str,
        #[source]
        source: russh::Error,
    },

    /// Local terminal could not be queried or configured
    #[error("Terminal error: {0}")]
    Terminal(#[source] std::io::Error),

    /// Reading an interactive answer failed
    #[error("Failed to read input: {0}")]
    Prompt(#[source] std::io::Error),
}

impl SessionError {
    pub(crate) fn channel(action: &'static str) -> impl FnOnce(russh::Error) -> Self {
        move |source| SessionError::Channel { action, source }
    }
}
