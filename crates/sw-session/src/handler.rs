//! russh client handler

use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;

/// Client handler shared by jump and target connections
///
/// Host keys are not pinned: every key is accepted and its fingerprint is
/// logged.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    addr: String,
}

impl ClientHandler {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            "Host key for {}: {} {}",
            self.addr,
            server_public_key.name(),
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}
