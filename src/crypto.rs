//! Symmetric encryption and secure random generation.
//!
//! API keys are encrypted with AES-256-GCM before they are persisted. The
//! stored form is `nonce(12) || ciphertext || tag(16)`, hex-encoded by the
//! caller.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use rand::{TryRngCore, rngs::OsRng};

/// Nonce size for AES-GCM (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Key size for AES-256 (32 bytes)
pub const KEY_SIZE: usize = 32;

/// Errors raised by the cryptographic primitives.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key must be {KEY_SIZE} bytes (got {0})")]
    InvalidKeyLength(usize),

    #[error("invalid hex encoding")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("random source failed: {0}")]
    RandomSource(String),

    #[error("encryption failed")]
    EncryptionFailed,

    /// Ciphertext was truncated, tampered with, or sealed under another key.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("ciphertext too short")]
    InvalidCiphertext,
}

/// 256-bit AES-GCM key.
///
/// Loaded once from configuration and passed explicitly to whatever needs it.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a key from 64 hex characters.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(value.trim())?;
        let len = bytes.len();
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(len))?;
        Ok(Self(key))
    }

    fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Fill `buf` from a fallible random source.
pub fn fill_random<R>(rng: &mut R, buf: &mut [u8]) -> Result<(), CryptoError>
where
    R: TryRngCore + ?Sized,
{
    rng.try_fill_bytes(buf)
        .map_err(|e| CryptoError::RandomSource(e.to_string()))
}

/// Draw `len` random bytes from `rng`.
pub fn random_bytes<R>(rng: &mut R, len: usize) -> Result<Vec<u8>, CryptoError>
where
    R: TryRngCore + ?Sized,
{
    let mut bytes = vec![0u8; len];
    fill_random(rng, &mut bytes)?;
    Ok(bytes)
}

/// Draw `len` random bytes from `rng` and return them URL-safe base64 encoded.
pub fn random_string<R>(rng: &mut R, len: usize) -> Result<String, CryptoError>
where
    R: TryRngCore + ?Sized,
{
    Ok(URL_SAFE.encode(random_bytes(rng, len)?))
}

/// Encrypt `plaintext` with a fresh random nonce.
///
/// Output format: `nonce(12) || ciphertext || tag(16)`.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::EncryptionFailed)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    fill_random(&mut OsRng, &mut nonce_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt output produced by [`encrypt`].
pub fn decrypt(key: &EncryptionKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidCiphertext);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::DecryptionFailed)?;

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}
