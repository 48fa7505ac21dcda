//! Per-field credential encryption
//!
//! Each secret is encrypted on its own so the rest of the profile store stays
//! readable. A token is `base64(salt || nonce || ciphertext || tag)`: the key
//! is derived from the master password with PBKDF2-HMAC-SHA256 over a fresh
//! salt, and the payload is sealed with AES-256-GCM under a fresh nonce.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::prelude::{Engine, BASE64_STANDARD};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CipherError;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;
/// AES-GCM tag length in bytes
pub const TAG_LEN: usize = 16;
/// PBKDF2 iteration count
pub const ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;

/// Encrypt `plaintext` under the master password `key`
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<String, CipherError> {
    seal(plaintext, key, ITERATIONS)
}

/// Decrypt a token produced by [`encrypt`]
pub fn decrypt(token: &str, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    open(token, key, ITERATIONS)
}

fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut *key);
    key
}

fn seal(plaintext: &[u8], key: &[u8], iterations: u32) -> Result<String, CipherError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let derived = derive_key(key, &salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(&*derived).map_err(|_| CipherError::Encryption)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::Encryption)?;

    let mut token = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
    token.extend_from_slice(&salt);
    token.extend_from_slice(&nonce);
    token.extend(sealed);
    Ok(BASE64_STANDARD.encode(token))
}

fn open(token: &str, key: &[u8], iterations: u32) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let data = BASE64_STANDARD.decode(token.trim())?;
    if data.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(CipherError::TooShort { len: data.len() });
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let derived = derive_key(key, salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(&*derived).map_err(|_| CipherError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map(Zeroizing::new)
        .map_err(|_| CipherError::Decryption)
}

/// A credential cipher bound to one master password
///
/// Profiles are transformed through this type so the key is passed around
/// once instead of per field.
#[derive(Clone)]
pub struct CredentialCipher {
    key: Zeroizing<Vec<u8>>,
    iterations: u32,
}

impl CredentialCipher {
    /// Bind a cipher to the given master password
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: Zeroizing::new(key.as_ref().to_vec()),
            iterations: ITERATIONS,
        }
    }

    /// Override the PBKDF2 iteration count
    ///
    /// Tokens are only readable by a cipher using the same count. Intended
    /// for tests, where the production count makes every call slow.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Encrypt a string field into a token
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, CipherError> {
        seal(plaintext.as_bytes(), &self.key, self.iterations)
    }

    /// Decrypt a token back into a string field
    pub fn decrypt_str(&self, token: &str) -> Result<String, CipherError> {
        let bytes = open(token, &self.key, self.iterations)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CipherError::Utf8)
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}
