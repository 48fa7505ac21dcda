//! Core error types for sshw

use std::path::PathBuf;
use thiserror::Error;

/// Profile store and settings errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// None of the default profile store locations exist
    #[error("No profile store found (searched {})", format_paths(.searched))]
    NoProfileStore { searched: Vec<PathBuf> },

    /// Reading a file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Both profile encodings rejected the input
    #[error("Failed to parse profile store: as YAML: {yaml}; as JSON: {json}")]
    Parse { yaml: String, json: String },

    /// Profile store could not be encoded
    #[error("Failed to encode profile store: {0}")]
    Serialize(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Credential cipher errors
#[derive(Error, Debug)]
pub enum CipherError {
    /// Token is not valid base64
    #[error("Encrypted value is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Token is shorter than salt, nonce and tag combined
    #[error("Encrypted value too short ({len} bytes)")]
    TooShort { len: usize },

    /// Tag verification failed (wrong master password or corrupted data)
    #[error("Decryption failed: wrong master password or corrupted data")]
    Decryption,

    /// Encryption failed
    #[error("Encryption failed")]
    Encryption,

    /// Decrypted bytes are not valid UTF-8
    #[error("Decrypted value is not valid UTF-8")]
    Utf8,
}

/// Errors from encrypting or decrypting a profile's fields
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A single field failed to transform
    #[error("Failed to {action} {field} of profile '{profile}': {source}")]
    Field {
        profile: String,
        action: &'static str,
        field: &'static str,
        #[source]
        source: CipherError,
    },
}

/// Password store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Nothing stored in the requested slot
    #[error("Entry not found")]
    NotFound,

    /// Backend (OS credential manager) failure
    #[error("Credential store error: {0}")]
    Backend(String),

    /// File store I/O error
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is the distinguishable "nothing stored" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Master password errors
#[derive(Error, Debug)]
pub enum MasterKeyError {
    /// No master password hash has been stored yet
    #[error("Master password not set")]
    NotSet,

    /// A master password already exists
    #[error("Master password already set")]
    AlreadySet,

    /// Entered password does not match the stored hash
    #[error("Invalid password")]
    InvalidPassword,

    /// Reading the password from the terminal failed
    #[error("Failed to read password: {0}")]
    Prompt(#[source] std::io::Error),

    /// Hashing or verification failed
    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// Underlying store failed
    #[error("Password store error: {0}")]
    Store(#[from] StoreError),
}
