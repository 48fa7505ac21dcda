//! Authentication candidates and the order they are tried in

use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::client::{self, Handle, KeyboardInteractiveAuthResponse};
use russh_keys::key::KeyPair;
use zeroize::Zeroizing;

use sw_core::traits::Prompter;
use sw_core::Profile;

/// One way of proving identity to the server
pub enum AuthMethod {
    PublicKey(Arc<KeyPair>),
    Password(Zeroizing<String>),
    KeyboardInteractive,
}

impl AuthMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::PublicKey(_) => "publickey",
            AuthMethod::Password(_) => "password",
            AuthMethod::KeyboardInteractive => "keyboard-interactive",
        }
    }
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered authentication methods for one user
///
/// Built from a profile as: public key (when the key loads), password (when
/// set), then keyboard-interactive.
#[derive(Debug)]
pub struct AuthPlan {
    user: String,
    methods: Vec<AuthMethod>,
}

impl AuthPlan {
    pub fn for_profile(profile: &Profile, default_key_path: &Path) -> Self {
        let mut methods = Vec::new();

        let (key_path, explicit) = if profile.key_path.is_empty() {
            (default_key_path.to_path_buf(), false)
        } else {
            (expand_home(&profile.key_path), true)
        };
        if let Some(key) = load_key(&key_path, &profile.passphrase, explicit) {
            methods.push(AuthMethod::PublicKey(Arc::new(key)));
        }

        if !profile.password.is_empty() {
            methods.push(AuthMethod::Password(Zeroizing::new(profile.password.clone())));
        }

        methods.push(AuthMethod::KeyboardInteractive);

        Self {
            user: profile.user().to_string(),
            methods,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn methods(&self) -> &[AuthMethod] {
        &self.methods
    }

    /// Whether a password is among the methods
    pub fn tries_password(&self) -> bool {
        self.methods
            .iter()
            .any(|m| matches!(m, AuthMethod::Password(_)))
    }

    /// Append a password method after the existing ones
    pub fn with_password(mut self, password: Zeroizing<String>) -> Self {
        self.methods.push(AuthMethod::Password(password));
        self
    }

    /// Try each method in order until one is accepted
    pub async fn authenticate<H>(
        &self,
        handle: &mut Handle<H>,
        prompter: &dyn Prompter,
    ) -> Result<bool, russh::Error>
    where
        H: client::Handler,
    {
        for method in &self.methods {
            tracing::debug!("Trying {} authentication as '{}'", method.name(), self.user);
            let accepted = match method {
                AuthMethod::PublicKey(key) => {
                    handle
                        .authenticate_publickey(&self.user, Arc::clone(key))
                        .await?
                }
                AuthMethod::Password(password) => {
                    handle
                        .authenticate_password(&self.user, password.as_str())
                        .await?
                }
                AuthMethod::KeyboardInteractive => {
                    keyboard_interactive(handle, &self.user, prompter).await?
                }
            };
            if accepted {
                tracing::info!("Authenticated as '{}' with {}", self.user, method.name());
                return Ok(true);
            }
        }
        Ok(false)
    }
}

async fn keyboard_interactive<H>(
    handle: &mut Handle<H>,
    user: &str,
    prompter: &dyn Prompter,
) -> Result<bool, russh::Error>
where
    H: client::Handler,
{
    let mut response = handle
        .authenticate_keyboard_interactive_start(user, None::<String>)
        .await?;
    loop {
        match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::Failure => return Ok(false),
            KeyboardInteractiveAuthResponse::InfoRequest {
                name,
                instructions,
                prompts,
            } => {
                if !name.is_empty() {
                    println!("{}", name);
                }
                if !instructions.is_empty() {
                    println!("{}", instructions);
                }

                let mut answers = Vec::with_capacity(prompts.len());
                for prompt in &prompts {
                    let answer = if prompt.echo {
                        prompter.read_line(&prompt.prompt)
                    } else {
                        prompter
                            .read_secret(&prompt.prompt)
                            .map(|secret| secret.as_str().to_string())
                    };
                    match answer {
                        Ok(answer) => answers.push(answer),
                        Err(e) => {
                            tracing::warn!("Keyboard-interactive prompt failed: {}", e);
                            return Ok(false);
                        }
                    }
                }
                response = handle
                    .authenticate_keyboard_interactive_respond(answers)
                    .await?;
            }
        }
    }
}

/// Load a private key, logging and skipping it on failure
fn load_key(path: &Path, passphrase: &str, explicit: bool) -> Option<KeyPair> {
    if !path.exists() {
        if explicit {
            tracing::warn!("Private key {:?} not found, skipping publickey", path);
        } else {
            tracing::debug!("No default key at {:?}", path);
        }
        return None;
    }

    let passphrase = (!passphrase.is_empty()).then_some(passphrase);
    match russh_keys::load_secret_key(path, passphrase) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!("Failed to load private key {:?}: {}", path, e);
            None
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().unwrap_or_default().join(rest),
        None if path == "~" => dirs::home_dir().unwrap_or_default(),
        None => PathBuf::from(path),
    }
}
