//! Session establishment
//!
//! Dials a profile's host directly or through its jump host and runs the
//! authentication plan against it.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Config, Handle};
use russh::Disconnect;
use zeroize::Zeroizing;

use sw_core::config::Settings;
use sw_core::traits::Prompter;
use sw_core::Profile;

use crate::auth::AuthPlan;
use crate::error::SessionError;
use crate::handler::ClientHandler;

/// Unanswered keepalives tolerated before the transport gives up
const KEEPALIVE_MAX: usize = 3;

/// Connection parameters taken from [`Settings`]
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Bound on each TCP dial plus SSH handshake
    pub connect_timeout: Duration,
    /// Idle time before the transport sends a keepalive; zero disables it
    pub keepalive_interval: Duration,
    /// Key tried when a profile has no `keypath`
    pub default_key_path: PathBuf,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ConnectOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            keepalive_interval: settings.keepalive_interval,
            default_key_path: settings.default_key_path.clone(),
        }
    }
}

/// How the target was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    Jumped { via: String },
}

/// An authenticated connection to the target host
///
/// Holds the jump connection, if any, for as long as the target is in use.
pub struct Connection {
    handle: Arc<Handle<ClientHandler>>,
    jump: Option<Handle<ClientHandler>>,
    route: Route,
    addr: String,
}

impl Connection {
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// `host:port` of the target
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub(crate) fn handle(&self) -> Arc<Handle<ClientHandler>> {
        Arc::clone(&self.handle)
    }

    /// Disconnect from the target, then from the jump host
    pub async fn close(self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::debug!("Disconnect from {} failed: {}", self.addr, e);
        }
        if let Some(jump) = self.jump {
            if let Err(e) = jump.disconnect(Disconnect::ByApplication, "", "en").await {
                tracing::debug!("Disconnect from jump host failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("route", &self.route)
            .finish()
    }
}

/// Turns a plaintext profile into an authenticated [`Connection`]
pub struct SessionEstablisher {
    options: ConnectOptions,
    prompter: Arc<dyn Prompter>,
}

impl SessionEstablisher {
    pub fn new(options: ConnectOptions, prompter: Arc<dyn Prompter>) -> Self {
        Self { options, prompter }
    }

    /// Dial and authenticate the profile's host
    ///
    /// Fails before any network activity when the profile is encrypted or
    /// names more than one jump host.
    pub async fn establish(&self, profile: &Profile) -> Result<Connection, SessionError> {
        let jump = check_profile(profile)?;
        match jump {
            Some(jump) => self.establish_jumped(profile, jump).await,
            None => self.establish_direct(profile).await,
        }
    }

    async fn establish_direct(&self, profile: &Profile) -> Result<Connection, SessionError> {
        let addr = addr_of(profile);
        let plan = AuthPlan::for_profile(profile, &self.options.default_key_path);

        let mut handle = self.dial(&profile.host, profile.port()).await?;
        if self.authenticate(&mut handle, &plan, &addr).await? {
            return Ok(direct(handle, addr));
        }

        if plan.tries_password() {
            return Err(auth_failed(profile, true));
        }

        tracing::debug!("Authentication exhausted for {}, prompting for password", addr);
        if let Err(e) = handle.disconnect(Disconnect::ByApplication, "", "en").await {
            tracing::debug!("Disconnect from {} failed: {}", addr, e);
        }
        let password = self
            .prompter
            .read_secret(&format!("{}@{}'s password: ", profile.user(), profile.host))
            .map_err(SessionError::Prompt)?;
        if password.is_empty() {
            return Err(auth_failed(profile, false));
        }
        let plan = plan.with_password(Zeroizing::new(password.as_str().to_string()));

        let mut handle = self.dial(&profile.host, profile.port()).await?;
        if self.authenticate(&mut handle, &plan, &addr).await? {
            Ok(direct(handle, addr))
        } else {
            Err(auth_failed(profile, true))
        }
    }

    async fn establish_jumped(
        &self,
        profile: &Profile,
        jump: &Profile,
    ) -> Result<Connection, SessionError> {
        let via = addr_of(jump);
        let addr = addr_of(profile);
        let proxy = |source: SessionError| SessionError::Proxy {
            via: via.clone(),
            source: Box::new(source),
        };

        tracing::info!("Connecting to {} via {}", addr, via);
        let jump_plan = AuthPlan::for_profile(jump, &self.options.default_key_path);
        let mut jump_handle = self.dial(&jump.host, jump.port()).await.map_err(proxy)?;
        if !self
            .authenticate(&mut jump_handle, &jump_plan, &via)
            .await
            .map_err(proxy)?
        {
            return Err(proxy(auth_failed(jump, jump_plan.tries_password())));
        }

        let channel = jump_handle
            .channel_open_direct_tcpip(profile.host.as_str(), u32::from(profile.port()), "127.0.0.1", 0)
            .await
            .map_err(|source| {
                proxy(SessionError::Channel {
                    action: "open direct-tcpip channel",
                    source,
                })
            })?;

        let handler = ClientHandler::new(addr.clone());
        let mut handle = self
            .within_timeout(
                &addr,
                client::connect_stream(self.ssh_config(), channel.into_stream(), handler),
            )
            .await?
            .map_err(|source| SessionError::Handshake {
                addr: addr.clone(),
                source,
            })?;

        let plan = AuthPlan::for_profile(profile, &self.options.default_key_path);
        if !self.authenticate(&mut handle, &plan, &addr).await? {
            return Err(auth_failed(profile, plan.tries_password()));
        }

        Ok(Connection {
            handle: Arc::new(handle),
            jump: Some(jump_handle),
            route: Route::Jumped { via },
            addr,
        })
    }

    async fn dial(&self, host: &str, port: u16) -> Result<Handle<ClientHandler>, SessionError> {
        let addr = format!("{}:{}", host, port);
        tracing::debug!("Dialing {}", addr);

        let handler = ClientHandler::new(addr.clone());
        self.within_timeout(&addr, client::connect(self.ssh_config(), (host, port), handler))
            .await?
            .map_err(|e| match e {
                russh::Error::IO(source) => SessionError::Dial { addr, source },
                source => SessionError::Handshake { addr, source },
            })
    }

    async fn authenticate(
        &self,
        handle: &mut Handle<ClientHandler>,
        plan: &AuthPlan,
        addr: &str,
    ) -> Result<bool, SessionError> {
        plan.authenticate(handle, self.prompter.as_ref())
            .await
            .map_err(|source| SessionError::Handshake {
                addr: addr.to_string(),
                source,
            })
    }

    async fn within_timeout<F, T>(&self, addr: &str, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.options.connect_timeout, fut)
            .await
            .map_err(|_| SessionError::Timeout {
                addr: addr.to_string(),
                after: self.options.connect_timeout,
            })
    }

    /// Transport settings shared by every hop
    ///
    /// Keepalives are sent by the russh session loop after
    /// `keepalive_interval` of silence; `keepalive_max` unanswered ones
    /// drop the connection.
    fn ssh_config(&self) -> Arc<Config> {
        Arc::new(Config {
            keepalive_interval: Some(self.options.keepalive_interval)
                .filter(|interval| !interval.is_zero()),
            keepalive_max: KEEPALIVE_MAX,
            ..Config::default()
        })
    }
}

/// Validate a profile before dialing, returning its jump host if any
fn check_profile(profile: &Profile) -> Result<Option<&Profile>, SessionError> {
    if profile.is_encrypted {
        return Err(SessionError::EncryptedProfile {
            profile: profile.name.clone(),
        });
    }
    match profile.jump.as_slice() {
        [] => Ok(None),
        [jump] if jump.is_encrypted => Err(SessionError::EncryptedProfile {
            profile: jump.name.clone(),
        }),
        [jump] => Ok(Some(jump)),
        hops => Err(SessionError::UnsupportedJumpChain {
            profile: profile.name.clone(),
            hops: hops.len(),
        }),
    }
}

fn addr_of(profile: &Profile) -> String {
    format!("{}:{}", profile.host, profile.port())
}

fn direct(handle: Handle<ClientHandler>, addr: String) -> Connection {
    tracing::info!("Connected to {}", addr);
    Connection {
        handle: Arc::new(handle),
        jump: None,
        route: Route::Direct,
        addr,
    }
}

fn auth_failed(profile: &Profile, password_tried: bool) -> SessionError {
    SessionError::AuthenticationFailed {
        user: profile.user().to_string(),
        host: profile.host.clone(),
        password_tried,
    }
}
