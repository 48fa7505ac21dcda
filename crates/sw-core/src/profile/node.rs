//! A single host profile and its field-level transforms

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::cipher::CredentialCipher;
use crate::config::serde_utils::duration_millis;
use crate::error::ProfileError;

/// Login user when a profile leaves `user` empty
pub const DEFAULT_USER: &str = "root";
/// SSH port when a profile leaves `port` unset
pub const DEFAULT_PORT: u16 = 22;

fn is_zero(port: &u16) -> bool {
    *port == 0
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A command typed into the remote shell after it starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackShell {
    /// Command text, sent followed by a carriage return
    pub cmd: String,

    /// Wait before typing the command
    #[serde(default, with = "duration_millis")]
    pub delay: Duration,
}

/// One SSH destination in the profile tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name in the picker
    pub name: String,

    /// Short name for direct login
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,

    #[serde(default)]
    pub host: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub port: u16,

    /// Private key file
    #[serde(default, rename = "keypath", skip_serializing_if = "String::is_empty")]
    pub key_path: String,

    /// Passphrase for the private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub passphrase: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Whether `password` and `passphrase` currently hold cipher tokens
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_encrypted: bool,

    #[serde(default, rename = "callback-shells", skip_serializing_if = "Vec::is_empty")]
    pub callback_shells: Vec<CallbackShell>,

    /// Sub-menu entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Profile>,

    /// Proxy chain; only a single hop is supported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jump: Vec<Profile>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub mask_host: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub show_host: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_login_marker: bool,
}

/// Direction of a field transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Encrypt,
    Decrypt,
}

impl Transform {
    fn action(self) -> &'static str {
        match self {
            Transform::Encrypt => "encrypt",
            Transform::Decrypt => "decrypt",
        }
    }

    fn target_state(self) -> bool {
        matches!(self, Transform::Encrypt)
    }
}

impl Profile {
    /// Create a profile with just a name and host
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            ..Default::default()
        }
    }

    /// Login user, defaulting to `root`
    pub fn user(&self) -> &str {
        if self.user.is_empty() {
            DEFAULT_USER
        } else {
            &self.user
        }
    }

    /// SSH port, defaulting to 22
    pub fn port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// Whether the profile carries a password or key passphrase
    pub fn has_secrets(&self) -> bool {
        !self.password.is_empty() || !self.passphrase.is_empty()
    }

    /// Encrypt `password` and `passphrase` here and in every descendant
    ///
    /// A no-op when already encrypted. Not transactional: on error, nodes
    /// visited before the failure stay encrypted. Use
    /// [`ProfileTree::encrypted`](super::ProfileTree::encrypted) for an
    /// all-or-nothing transform.
    pub fn encrypt_fields(&mut self, cipher: &CredentialCipher) -> Result<(), ProfileError> {
        self.transform(cipher, Transform::Encrypt)
    }

    /// Decrypt `password` and `passphrase` here and in every descendant
    ///
    /// A no-op when already decrypted. Same partial-failure caveat as
    /// [`Profile::encrypt_fields`].
    pub fn decrypt_fields(&mut self, cipher: &CredentialCipher) -> Result<(), ProfileError> {
        self.transform(cipher, Transform::Decrypt)
    }

    fn transform(&mut self, cipher: &CredentialCipher, op: Transform) -> Result<(), ProfileError> {
        if self.is_encrypted == op.target_state() {
            return Ok(());
        }

        let name = self.name.clone();
        for (field, value) in [
            ("password", &mut self.password),
            ("passphrase", &mut self.passphrase),
        ] {
            if value.is_empty() {
                continue;
            }
            let result = match op {
                Transform::Encrypt => cipher.encrypt_str(value),
                Transform::Decrypt => cipher.decrypt_str(value),
            };
            *value = result.map_err(|source| ProfileError::Field {
                profile: name.clone(),
                action: op.action(),
                field,
                source,
            })?;
        }
        self.is_encrypted = op.target_state();

        for child in &mut self.children {
            child.transform(cipher, op)?;
        }
        for jump in &mut self.jump {
            jump.transform(cipher, op)?;
        }
        Ok(())
    }

    /// Host as shown in the picker
    ///
    /// `None` unless `show_host` is set. With `mask_host`, an IPv4 address
    /// hides its third octet and a domain name hides the middle of its
    /// second-to-last label.
    pub fn masked_host(&self) -> Option<String> {
        if !self.show_host {
            return None;
        }
        if !self.mask_host {
            return Some(self.host.clone());
        }
        Some(mask_host(&self.host))
    }
}

fn mask_host(host: &str) -> String {
    if let Ok(ip) = host.parse::<IpAddr>() {
        let parts: Vec<&str> = host.split('.').collect();
        return match (ip, parts.as_slice()) {
            (IpAddr::V4(_), [a, b, _, d]) => format!("{}.{}.*.{}", a, b, d),
            _ => host.to_string(),
        };
    }

    let mut labels: Vec<String> = host.split('.').map(str::to_string).collect();
    if labels.len() >= 2 {
        let idx = labels.len() - 2;
        let chars: Vec<char> = labels[idx].chars().collect();
        if chars.len() > 2 {
            labels[idx] = format!("{}*{}", chars[0], chars[chars.len() - 1]);
            return labels.join(".");
        }
    }
    host.to_string()
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
