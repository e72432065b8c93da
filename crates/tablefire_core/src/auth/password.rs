//! Salted password digests.
//!
//! # Invariants
//! - Plain-text passwords are never stored or logged.
//! - Each account gets its own random salt.
//! - Digests are PBKDF2-HMAC-SHA256 and compared in constant time.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;
const PBKDF2_ROUNDS: u32 = 10_000;
const KEY_LEN: usize = 32;

/// Stored credential material for one staff account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub salt: String,
    /// Hex-encoded derived key.
    pub digest: String,
}

impl PasswordHash {
    /// Derives a digest for `password` under a fresh random salt.
    pub fn derive(password: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = hex::encode(derive_key(&salt, password));
        Self { salt, digest }
    }

    /// Checks `password` against this stored digest.
    pub fn verify(&self, password: &str) -> bool {
        let Ok(stored) = hex::decode(&self.digest) else {
            return false;
        };
        let candidate = derive_key(&self.salt, password);
        bool::from(candidate.as_slice().ct_eq(stored.as_slice()))
    }
}

/// Returns whether `password` satisfies the length policy.
pub fn password_is_acceptable(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
}

fn derive_key(salt: &str, password: &str) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut key);
    key
}
