//! sw-session: SSH connections and interactive shells for sshw
//!
//! [`SessionEstablisher`] turns a plaintext [`sw_core::Profile`] into an
//! authenticated [`Connection`], dialing through a jump host when the
//! profile has one. [`InteractiveSession`] then runs a remote shell on that
//! connection, wired to the local terminal.

pub mod auth;
pub mod connector;
pub mod error;
pub mod handler;
pub mod interactive;
pub mod marker;
pub mod tasks;
pub mod terminal;

pub use connector::{ConnectOptions, Connection, Route, SessionEstablisher};
pub use error::SessionError;
pub use interactive::{InteractiveSession, SessionOptions, SessionOutcome, SessionState};
