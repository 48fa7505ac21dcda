//! sshw: SSH client wrapper for automatic login
//!
//! Command implementations, the host picker and `~/.ssh/config` import for
//! the `sshw` binary.

pub mod commands;
pub mod output;
pub mod picker;
pub mod ssh_config;
