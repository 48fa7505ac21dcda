//! sw-core: Profiles, credential encryption and the master password gate
//!
//! This crate holds everything about a host profile that does not need a
//! network connection: the on-disk profile tree, per-field encryption of its
//! secrets, the master password that unlocks them, and the user settings.

pub mod cipher;
pub mod config;
pub mod error;
pub mod masterkey;
pub mod profile;
pub mod prompt;
pub mod traits;

pub use cipher::CredentialCipher;
pub use profile::{CallbackShell, EncryptionStatus, Profile, ProfileTree};
