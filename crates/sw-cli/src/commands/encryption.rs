//! Encrypt, decrypt and check the profile store

use std::path::Path;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use sw_core::{CredentialCipher, EncryptionStatus, ProfileTree};

use crate::output::{print_info, print_success, print_warning};

/// Report line for `--check`
pub fn status_message(status: EncryptionStatus) -> &'static str {
    match status {
        EncryptionStatus::Encrypted => "All configurations are encrypted",
        EncryptionStatus::Plaintext => "All configurations are not encrypted",
        EncryptionStatus::Partial => "Configuration is partially encrypted",
    }
}

fn load(path: Option<&Path>) -> Result<Option<ProfileTree>> {
    let tree = ProfileTree::load(path).context("Failed to load config")?;
    if tree.is_empty() {
        print_warning("No configuration found");
        return Ok(None);
    }
    Ok(Some(tree))
}

fn save(tree: &ProfileTree) -> Result<()> {
    let path = tree.save(tree.source()).context("Failed to save config")?;
    tracing::info!("Wrote {:?}", path);
    Ok(())
}

pub fn check_command(path: Option<&Path>) -> Result<()> {
    let Some(tree) = load(path)? else {
        return Ok(());
    };
    print_info(status_message(tree.encryption_status()));
    Ok(())
}

/// Encrypt every profile, unlocking with `unlock` only when needed
///
/// Nodes already encrypted are decrypted first so the whole tree ends up
/// under the current master password.
pub fn encrypt_command<F>(path: Option<&Path>, unlock: F) -> Result<()>
where
    F: FnOnce() -> Result<Zeroizing<Vec<u8>>>,
{
    let Some(tree) = load(path)? else {
        return Ok(());
    };
    if !tree.has_plaintext_secrets() {
        print_info("All configurations are already encrypted");
        if tree.has_nested_plaintext_secrets() {
            print_warning("Nested profiles still hold plaintext secrets and were left unchanged");
        }
        return Ok(());
    }

    let cipher = CredentialCipher::new(unlock()?.as_slice());
    let encrypted = tree
        .decrypted(&cipher)
        .and_then(|plain| plain.encrypted(&cipher))
        .context("Failed to encrypt config")?;
    save(&encrypted)?;
    print_success("Configuration encrypted successfully");
    Ok(())
}

/// Decrypt every profile, unlocking with `unlock` only when needed
pub fn decrypt_command<F>(path: Option<&Path>, unlock: F) -> Result<()>
where
    F: FnOnce() -> Result<Zeroizing<Vec<u8>>>,
{
    let Some(tree) = load(path)? else {
        return Ok(());
    };
    if tree.encryption_status() == EncryptionStatus::Plaintext {
        print_info("All configurations are already decrypted");
        return Ok(());
    }

    let cipher = CredentialCipher::new(unlock()?.as_slice());
    let decrypted = tree
        .decrypted(&cipher)
        .context("Failed to decrypt config")?;
    save(&decrypted)?;
    print_success("Configuration decrypted successfully");
    Ok(())
}
