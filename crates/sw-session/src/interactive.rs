//! Interactive shell over an established connection

use std::io::{self, Write};
use std::time::Duration;

use russh::client::Msg;
use russh::{Channel, ChannelMsg, Pty};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sw_core::config::Settings;
use sw_core::Profile;

use crate::connector::Connection;
use crate::error::SessionError;
use crate::marker::LoginMarker;
use crate::tasks::{self, TermSize};
use crate::terminal::{self, RawModeGuard};

const PTY_MODES: &[(Pty, u32)] = &[
    (Pty::ECHO, 1),
    (Pty::TTY_OP_ISPEED, 14400),
    (Pty::TTY_OP_OSPEED, 14400),
];

const RESIZE_CHANNEL_CAPACITY: usize = 8;
const MARKER_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of an interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Dialing,
    Authenticated,
    PtyRequested,
    ShellRunning,
    Closed,
}

impl SessionState {
    /// Whether moving to `next` is allowed
    ///
    /// States advance one step at a time; any open state may close.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Dialing, Authenticated)
                | (Authenticated, PtyRequested)
                | (PtyRequested, ShellRunning)
                | (Dialing | Authenticated | PtyRequested | ShellRunning, Closed)
        )
    }
}

/// Terminal and timing parameters for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub term: String,
    pub resize_poll_interval: Duration,
    /// Client version recorded by the login marker
    pub version: String,
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings, version: impl Into<String>) -> Self {
        Self {
            term: settings.term.clone(),
            resize_poll_interval: settings.resize_poll_interval,
            version: version.into(),
        }
    }
}

/// How the remote shell ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOutcome {
    /// Exit status, when the server reported one
    pub exit_status: Option<u32>,
}

/// Runs a remote shell attached to the local terminal
pub struct InteractiveSession {
    connection: Connection,
    options: SessionOptions,
    state: SessionState,
}

impl InteractiveSession {
    pub fn new(connection: Connection, options: SessionOptions) -> Self {
        Self {
            connection,
            options,
            state: SessionState::Authenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the shell until the remote side exits or local input ends
    pub async fn run(mut self, profile: &Profile) -> Result<SessionOutcome, SessionError> {
        let result = self.run_shell(profile).await;
        self.advance(SessionState::Closed);
        self.connection.close().await;
        result
    }

    async fn run_shell(&mut self, profile: &Profile) -> Result<SessionOutcome, SessionError> {
        let handle = self.connection.handle();
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(SessionError::channel("open session channel"))?;

        let size = terminal::size().map_err(SessionError::Terminal)?;
        channel
            .request_pty(
                false,
                &self.options.term,
                u32::from(size.0),
                u32::from(size.1),
                0,
                0,
                PTY_MODES,
            )
            .await
            .map_err(SessionError::channel("request pty"))?;
        self.advance(SessionState::PtyRequested);

        let _raw = RawModeGuard::enter().map_err(SessionError::Terminal)?;

        channel
            .request_shell(false)
            .await
            .map_err(SessionError::channel("start shell"))?;
        self.advance(SessionState::ShellRunning);
        tracing::info!("Shell started on {}", self.connection.addr());

        let cancel = CancellationToken::new();
        let (resize_tx, resizes) = mpsc::channel(RESIZE_CHANNEL_CAPACITY);
        let (typist, callbacks) =
            tasks::spawn_callback_typist(cancel.clone(), profile.callback_shells.clone());
        let mut background = vec![
            typist,
            tasks::spawn_resize_watcher(
                cancel.clone(),
                self.options.resize_poll_interval,
                size,
                terminal::size,
                resize_tx,
            ),
        ];
        if profile.enable_login_marker {
            let marker = LoginMarker::local(self.options.version.clone());
            let handle = handle.clone();
            let cancel = cancel.clone();
            background.push(tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    result = tokio::time::timeout(MARKER_TIMEOUT, marker.record(&handle)) => match result {
                        Ok(Ok(Some(0))) | Ok(Ok(None)) => tracing::debug!("Login marker recorded"),
                        Ok(Ok(Some(status))) => tracing::warn!("Login marker script exited with {}", status),
                        Ok(Err(e)) => tracing::warn!("Failed to set login marker: {}", e),
                        Err(_) => tracing::warn!("Login marker timed out"),
                    },
                }
            }));
        }

        let input = LocalInput {
            callbacks,
            stdin: tasks::spawn_input_reader(io::stdin()),
            resizes,
        };
        let outcome = pump(&mut channel, input, &mut io::stdout(), &mut io::stderr()).await;

        cancel.cancel();
        for task in background {
            if let Err(e) = task.await {
                tracing::debug!("Background task ended abnormally: {}", e);
            }
        }
        if let Err(e) = channel.close().await {
            tracing::debug!("Channel close failed: {}", e);
        }
        Ok(outcome)
    }
}

/// Local sources feeding the remote shell
struct LocalInput {
    callbacks: mpsc::Receiver<Vec<u8>>,
    stdin: mpsc::Receiver<Vec<u8>>,
    resizes: mpsc::Receiver<TermSize>,
}

/// Move bytes between the channel and the local terminal
///
/// Remote output is written as soon as it arrives. Stdin is held back until
/// the callback queue is drained.
async fn pump<O: Write, E: Write>(
    channel: &mut Channel<Msg>,
    input: LocalInput,
    stdout: &mut O,
    stderr: &mut E,
) -> SessionOutcome {
    let LocalInput {
        mut callbacks,
        mut stdin,
        mut resizes,
    } = input;
    let mut outcome = SessionOutcome::default();
    let mut callbacks_pending = true;
    let mut resizes_open = true;

    loop {
        tokio::select! {
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { data }) => write_out(&mut *stdout, &data),
                Some(ChannelMsg::ExtendedData { data, ext: 1 }) => write_out(&mut *stderr, &data),
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    tracing::debug!("Remote shell exited with {}", exit_status);
                    outcome.exit_status = Some(exit_status);
                }
                Some(ChannelMsg::Eof) => tracing::debug!("Remote EOF"),
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            },
            line = callbacks.recv(), if callbacks_pending => match line {
                Some(line) => {
                    if let Err(e) = channel.data(&line[..]).await {
                        tracing::warn!("Failed to type callback command: {}", e);
                        break;
                    }
                }
                None => callbacks_pending = false,
            },
            chunk = stdin.recv(), if !callbacks_pending => match chunk {
                Some(bytes) => {
                    if let Err(e) = channel.data(&bytes[..]).await {
                        tracing::warn!("Failed to forward input: {}", e);
                        break;
                    }
                }
                None => {
                    tracing::debug!("Local input closed, ending session");
                    if let Err(e) = channel.eof().await {
                        tracing::debug!("Sending EOF failed: {}", e);
                    }
                    break;
                }
            },
            size = resizes.recv(), if resizes_open => match size {
                Some((cols, rows)) => {
                    if let Err(e) = channel.window_change(u32::from(cols), u32::from(rows), 0, 0).await {
                        tracing::warn!("Failed to propagate resize: {}", e);
                    }
                }
                None => resizes_open = false,
            },
        }
    }
    outcome
}

fn write_out(out: &mut impl Write, data: &[u8]) {
    if let Err(e) = out.write_all(data).and_then(|_| out.flush()) {
        tracing::debug!("Local write failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sw_core::CallbackShell;

    #[test]
    fn test_states_advance_in_order() {
        use SessionState::*;
        assert!(Dialing.can_transition_to(Authenticated));
        assert!(Authenticated.can_transition_to(PtyRequested));
        assert!(PtyRequested.can_transition_to(ShellRunning));
        assert!(ShellRunning.can_transition_to(Closed));
    }

    #[test]
    fn test_states_never_go_back_or_skip() {
        use SessionState::*;
        assert!(!ShellRunning.can_transition_to(PtyRequested));
        assert!(!Authenticated.can_transition_to(ShellRunning));
        assert!(!Closed.can_transition_to(Dialing));
        assert!(!Closed.can_transition_to(Closed));
    }

    #[test]
    fn test_any_open_state_may_close() {
        use SessionState::*;
        for state in [Dialing, Authenticated, PtyRequested, ShellRunning] {
            assert!(state.can_transition_to(Closed));
        }
    }

    #[test]
    fn test_options_from_settings() {
        let options = SessionOptions::from_settings(&Settings::default(), "1.2.3");
        assert_eq!(options.term, "xterm");
        assert_eq!(options.resize_poll_interval, Duration::from_secs(1));
        assert_eq!(options.version, "1.2.3");
    }

    mod shell {
        use std::sync::{Arc, Mutex};

        use async_trait::async_trait;
        use russh::server::{self, Auth, Session};
        use russh::{ChannelId, CryptoVec};
        use russh_keys::key::KeyPair;
        use tokio::net::TcpListener;

        use crate::handler::ClientHandler;

        /// Shell that greets on start and exits with 7 after `exit\r`
        #[derive(Clone, Default)]
        pub struct EchoShell {
            pub received: Arc<Mutex<Vec<u8>>>,
        }

        #[async_trait]
        impl server::Handler for EchoShell {
            type Error = russh::Error;

            async fn auth_none(&mut self, _user: &str) -> Result<Auth, Self::Error> {
                Ok(Auth::Accept)
            }

            async fn channel_open_session(
                &mut self,
                _channel: russh::Channel<server::Msg>,
                _session: &mut Session,
            ) -> Result<bool, Self::Error> {
                Ok(true)
            }

            async fn shell_request(
                &mut self,
                channel: ChannelId,
                session: &mut Session,
            ) -> Result<(), Self::Error> {
                session.data(channel, CryptoVec::from_slice(b"welcome\r\n"));
                Ok(())
            }

            async fn data(
                &mut self,
                channel: ChannelId,
                data: &[u8],
                session: &mut Session,
            ) -> Result<(), Self::Error> {
                let done = {
                    let mut received = self.received.lock().unwrap();
                    received.extend_from_slice(data);
                    received.ends_with(b"exit\r")
                };
                if done {
                    session.exit_status_request(channel, 7);
                    session.eof(channel);
                    session.close(channel);
                }
                Ok(())
            }
        }

        /// Serve one connection and return an authenticated client handle
        pub async fn connect(shell: EchoShell) -> russh::client::Handle<ClientHandler> {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let mut config = server::Config {
                auth_rejection_time: std::time::Duration::from_millis(10),
                auth_rejection_time_initial: Some(std::time::Duration::ZERO),
                ..Default::default()
            };
            config.keys.push(KeyPair::generate_ed25519().unwrap());
            let config = Arc::new(config);
            tokio::spawn(async move {
                let (socket, _) = listener.accept().await.unwrap();
                let session = server::run_stream(config, socket, shell).await.unwrap();
                let _ = session.await;
            });

            let mut handle = russh::client::connect(
                Arc::new(russh::client::Config::default()),
                addr,
                ClientHandler::new(addr.to_string()),
            )
            .await
            .unwrap();
            assert!(handle.authenticate_none("root").await.unwrap());
            handle
        }
    }

    /// Records when the first byte arrived
    struct Recorder {
        start: std::time::Instant,
        first_write: Option<Duration>,
        bytes: Vec<u8>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                start: std::time::Instant::now(),
                first_write: None,
                bytes: Vec::new(),
            }
        }
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let start = self.start;
            self.first_write.get_or_insert_with(|| start.elapsed());
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_flows_while_callbacks_wait_and_stdin_follows_them() {
        let shell = shell::EchoShell::default();
        let received = Arc::clone(&shell.received);
        let handle = shell::connect(shell).await;
        let mut channel = handle.channel_open_session().await.unwrap();
        channel.request_shell(false).await.unwrap();

        let delay = Duration::from_millis(1_000);
        let (typist, callbacks) = tasks::spawn_callback_typist(
            CancellationToken::new(),
            vec![CallbackShell {
                cmd: "first".into(),
                delay,
            }],
        );
        let (stdin_tx, stdin) = mpsc::channel(4);
        stdin_tx.send(b"exit\r".to_vec()).await.unwrap();
        let (_resize_tx, resizes) = mpsc::channel(1);

        let mut stdout = Recorder::new();
        let outcome = pump(
            &mut channel,
            LocalInput {
                callbacks,
                stdin,
                resizes,
            },
            &mut stdout,
            &mut io::sink(),
        )
        .await;
        typist.await.unwrap();
        drop(stdin_tx);

        assert_eq!(outcome.exit_status, Some(7));
        assert!(stdout.bytes.starts_with(b"welcome\r\n"));
        assert!(stdout.first_write.unwrap() < delay);
        assert_eq!(received.lock().unwrap().as_slice(), b"first\rexit\r");
    }
}
