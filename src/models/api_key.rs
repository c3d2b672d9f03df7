//! API key value object.
//!
//! Application keys are stored encrypted (AES-256-GCM, hex-encoded) rather than
//! hashed, so the plaintext can be recovered with the service encryption key and
//! compared against the `X-API-KEY` header on each request.

use chrono::{DateTime, NaiveDate, Utc};
use rand::TryRngCore;
use subtle::ConstantTimeEq;

use crate::crypto::{self, CryptoError, EncryptionKey};

/// Number of random bytes in a generated key (128 bits).
pub const KEY_BYTES: usize = 16;

/// Errors raised while building or validating an [`ApiKey`].
#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("API key has no ciphertext")]
    MissingCiphertext,

    #[error("API key deactivated at {0}")]
    Expired(DateTime<Utc>),

    #[error("invalid deactivation date: {0}")]
    InvalidDeactivation(String),

    #[error("API key ciphertext could not be decrypted: {0}")]
    Crypto(#[from] CryptoError),

    #[error("API key plaintext is not valid UTF-8")]
    InvalidPlaintext,
}

/// An application API key.
///
/// `key` is the plaintext handed to the client and never persisted.
/// `ciphertext` is the hex form stored in `app_api_key.api_key`.
#[derive(Clone)]
pub struct ApiKey {
    key: String,
    ciphertext: String,
    deactivation: DateTime<Utc>,
}

impl ApiKey {
    /// Generate a new random key and encrypt it.
    ///
    /// # Process
    ///
    /// 1. Draw 16 random bytes from `rng`
    /// 2. Base64 (URL-safe) encode them as the plaintext key
    /// 3. Encrypt the plaintext under `encryption_key`
    pub fn generate<R>(
        rng: &mut R,
        encryption_key: &EncryptionKey,
        deactivation: DateTime<Utc>,
    ) -> Result<Self, ApiKeyError>
    where
        R: TryRngCore + ?Sized,
    {
        let key = crypto::random_string(rng, KEY_BYTES)?;
        let sealed = crypto::encrypt(encryption_key, key.as_bytes())?;

        Ok(Self {
            key,
            ciphertext: hex::encode(sealed),
            deactivation,
        })
    }

    /// Rebuild a key from its stored hex ciphertext.
    ///
    /// Fails if the hex is malformed or the authentication tag does not verify.
    pub fn from_ciphertext(
        hex_ciphertext: &str,
        encryption_key: &EncryptionKey,
        deactivation: DateTime<Utc>,
    ) -> Result<Self, ApiKeyError> {
        let sealed = hex::decode(hex_ciphertext).map_err(CryptoError::from)?;
        let plaintext = crypto::decrypt(encryption_key, &sealed)?;
        let key = String::from_utf8(plaintext).map_err(|_| ApiKeyError::InvalidPlaintext)?;

        Ok(Self {
            key,
            ciphertext: hex_ciphertext.to_string(),
            deactivation,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn deactivation(&self) -> DateTime<Utc> {
        self.deactivation
    }

    pub fn set_deactivation(&mut self, deactivation: DateTime<Utc>) {
        self.deactivation = deactivation;
    }

    /// Check the key is usable right now.
    pub fn validate(&self) -> Result<(), ApiKeyError> {
        self.validate_at(Utc::now())
    }

    /// Check the key is usable at `now`: ciphertext present and deactivation strictly later.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ApiKeyError> {
        if self.ciphertext.is_empty() {
            return Err(ApiKeyError::MissingCiphertext);
        }
        if self.deactivation <= now {
            return Err(ApiKeyError::Expired(self.deactivation));
        }
        Ok(())
    }

    /// Constant-time comparison of the plaintext against a submitted key.
    pub fn matches(&self, candidate: &str) -> bool {
        self.key.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"<redacted>")
            .field("deactivation", &self.deactivation)
            .finish()
    }
}

/// Parse an administrative deactivation date.
///
/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_deactivation(value: &str) -> Result<DateTime<Utc>, ApiKeyError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiKeyError::InvalidDeactivation(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::OsRng;

    fn ek() -> EncryptionKey {
        EncryptionKey::from_bytes([3u8; crypto::KEY_SIZE])
    }

    #[test]
    fn test_generated_key_is_valid_and_decryptable() {
        let deactivation = Utc::now() + Duration::days(365 * 100);
        let key = ApiKey::generate(&mut OsRng, &ek(), deactivation).unwrap();

        assert!(key.validate().is_ok());
        assert_eq!(key.key().len(), 24);

        let loaded = ApiKey::from_ciphertext(key.ciphertext(), &ek(), deactivation).unwrap();
        assert_eq!(loaded.key(), key.key());
        assert!(loaded.matches(key.key()));
    }

    #[test]
    fn test_past_deactivation_always_fails() {
        let past = Utc::now() - Duration::seconds(1);
        let key = ApiKey::generate(&mut OsRng, &ek(), past).unwrap();
        assert!(matches!(key.validate(), Err(ApiKeyError::Expired(_))));

        let loaded = ApiKey::from_ciphertext(key.ciphertext(), &ek(), past).unwrap();
        assert!(matches!(loaded.validate(), Err(ApiKeyError::Expired(_))));
    }

    #[test]
    fn test_deactivation_equal_to_now_is_expired() {
        let now = Utc::now();
        let key = ApiKey::generate(&mut OsRng, &ek(), now).unwrap();
        assert!(key.validate_at(now).is_err());
        assert!(key.validate_at(now - Duration::milliseconds(1)).is_ok());
    }

    #[test]
    fn test_deactivation_can_be_moved() {
        let mut key = ApiKey::generate(&mut OsRng, &ek(), Utc::now() + Duration::days(1)).unwrap();
        assert!(key.validate().is_ok());

        key.set_deactivation(Utc::now() - Duration::days(1));
        assert!(key.validate().is_err());
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let key = ApiKey::generate(&mut OsRng, &ek(), Utc::now() + Duration::days(1)).unwrap();
        let mut bytes = hex::decode(key.ciphertext()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let result = ApiKey::from_ciphertext(&hex::encode(bytes), &ek(), key.deactivation());
        assert!(matches!(
            result,
            Err(ApiKeyError::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[test]
    fn test_wrong_encryption_key_is_rejected() {
        let key = ApiKey::generate(&mut OsRng, &ek(), Utc::now() + Duration::days(1)).unwrap();
        let other = EncryptionKey::from_bytes([4u8; crypto::KEY_SIZE]);
        assert!(ApiKey::from_ciphertext(key.ciphertext(), &other, key.deactivation()).is_err());
    }

    #[test]
    fn test_malformed_hex_is_rejected() {
        let result = ApiKey::from_ciphertext("not-hex", &ek(), Utc::now());
        assert!(matches!(
            result,
            Err(ApiKeyError::Crypto(CryptoError::InvalidHex(_)))
        ));
    }

    #[test]
    fn test_debug_redacts_plaintext() {
        let key = ApiKey::generate(&mut OsRng, &ek(), Utc::now() + Duration::days(1)).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(key.key()));
    }

    #[test]
    fn test_parse_deactivation() {
        let date = parse_deactivation("2099-12-31").unwrap();
        assert_eq!(date.to_rfc3339(), "2099-12-31T00:00:00+00:00");

        let ts = parse_deactivation("2099-12-31T10:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2099-12-31T10:00:00+00:00");

        assert!(matches!(
            parse_deactivation("next tuesday"),
            Err(ApiKeyError::InvalidDeactivation(_))
        ));
    }
}
