//! Login marker written on the remote host
//!
//! When a profile enables it, each login appends an audit line to
//! `~/.sshw_logs/login.log` on the server, prunes lines older than
//! [`RETENTION_DAYS`], and tags the bash prompt with `[SSHW]` once.

use chrono::{DateTime, Duration, Local};
use russh::client::Handle;
use russh::ChannelMsg;

use crate::error::SessionError;
use crate::handler::ClientHandler;

pub const RETENTION_DAYS: i64 = 30;

const LOG_DIR: &str = "~/.sshw_logs";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PROMPT_TAG: &str = r#"export PS1="\[\033[1;32m\][SSHW]\[\033[0m\] $PS1""#;

/// Who logged in, from where, with which client version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginMarker {
    pub user: String,
    pub host: String,
    pub version: String,
}

impl LoginMarker {
    pub fn new(user: impl Into<String>, host: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            version: version.into(),
        }
    }

    /// Marker for the local user and machine
    pub fn local(version: impl Into<String>) -> Self {
        Self::new(
            whoami::username(),
            gethostname::gethostname().to_string_lossy().into_owned(),
            version,
        )
    }

    /// The audit line for a login at `now`
    pub fn entry(&self, now: DateTime<Local>) -> String {
        format!(
            "[{}] SSHW Login: User={}, Host={}, Version={}",
            now.format(TIMESTAMP_FORMAT),
            self.user,
            self.host,
            self.version
        )
    }

    /// Shell script that records a login at `now`
    pub fn script(&self, now: DateTime<Local>) -> String {
        let log = format!("{}/login.log", LOG_DIR);
        let cutoff = (now - Duration::days(RETENTION_DAYS)).format(TIMESTAMP_FORMAT);
        [
            format!("mkdir -p {}", LOG_DIR),
            format!("echo {} >> {}", shell_quote(&self.entry(now)), log),
            format!(
                "awk -v cutoff={} 'substr($0, 2, 19) >= cutoff' {log} > {log}.tmp && mv {log}.tmp {log}",
                shell_quote(&cutoff.to_string()),
                log = log
            ),
            format!(
                "if [ -f ~/.bashrc ] && ! grep -qF '[SSHW]' ~/.bashrc; then echo {} >> ~/.bashrc; fi",
                shell_quote(PROMPT_TAG)
            ),
        ]
        .join("\n")
    }

    /// Run the marker script on its own exec channel
    ///
    /// Returns the script's exit status when the server reports one.
    pub async fn record(&self, handle: &Handle<ClientHandler>) -> Result<Option<u32>, SessionError> {
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(SessionError::channel("open marker channel"))?;
        channel
            .exec(true, self.script(Local::now()))
            .await
            .map_err(SessionError::channel("run login marker"))?;

        let mut status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::ExitStatus { exit_status } => status = Some(exit_status),
                ChannelMsg::Close => break,
                _ => {}
            }
        }
        Ok(status)
    }
}

/// Wrap `value` in single quotes for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
