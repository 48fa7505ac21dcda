//! Load the profile tree and log in to a host

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use sw_core::config::Settings;
use sw_core::profile::{is_tree_encrypted, read_store};
use sw_core::prompt::TerminalPrompter;
use sw_core::{CredentialCipher, Profile, ProfileTree};
use sw_session::{
    ConnectOptions, InteractiveSession, Route, SessionEstablisher, SessionOptions,
};

use crate::output::print_info;
use crate::picker;
use crate::ssh_config;

/// Resolve the tree to log in from
///
/// With `use_ssh_config` the hosts come from `~/.ssh/config`. Otherwise the
/// profile store is read and, when encrypted, decrypted with the key from
/// `unlock`.
pub fn load_tree<F>(path: Option<&Path>, use_ssh_config: bool, unlock: F) -> Result<ProfileTree>
where
    F: FnOnce() -> Result<Zeroizing<Vec<u8>>>,
{
    if use_ssh_config {
        return ssh_config::load_default().context("Failed to load ssh config");
    }

    let (bytes, source) = read_store(path).context("Failed to load config")?;
    let tree = ProfileTree::from_slice(&bytes)
        .context("Failed to load config")?
        .with_source(source);

    if !is_tree_encrypted(&bytes).context("Failed to check config encryption status")? {
        return Ok(tree);
    }
    let cipher = CredentialCipher::new(unlock()?.as_slice());
    tree.decrypted(&cipher).context("Failed to decrypt config")
}

/// The profile named by `alias`, or one picked interactively
pub fn pick_profile<'a>(tree: &'a ProfileTree, alias: Option<&str>) -> Result<Option<&'a Profile>> {
    if let Some(alias) = alias {
        if let Some(profile) = tree.find_by_alias(alias) {
            return Ok(Some(profile));
        }
        tracing::debug!("No profile with alias '{}', opening picker", alias);
    }
    picker::choose(tree.profiles(), &TerminalPrompter).context("Host picker failed")
}

/// Connect to `profile` and run an interactive shell
pub async fn login_command(profile: &Profile, settings: &Settings) -> Result<()> {
    let establisher = SessionEstablisher::new(
        ConnectOptions::from(settings),
        Arc::new(TerminalPrompter),
    );

    print_info(&format!("connect server ssh -p {} {}@{}", profile.port(), profile.user(), profile.host));
    let connection = establisher
        .establish(profile)
        .await
        .with_context(|| format!("Failed to connect to '{}'", profile.name))?;
    if let Route::Jumped { via } = connection.route() {
        tracing::info!("Tunneled through {}", via);
    }

    let options = SessionOptions::from_settings(settings, env!("CARGO_PKG_VERSION"));
    let outcome = InteractiveSession::new(connection, options)
        .run(profile)
        .await
        .context("Session failed")?;
    tracing::debug!("Session ended with status {:?}", outcome.exit_status);
    Ok(())
}
