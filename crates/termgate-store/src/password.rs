//! Password hashing: PBKDF2-HMAC-SHA256 over a random per-user salt.
//!
//! Salt and hash are stored hex-encoded. The iteration count is stored
//! next to them, so raising it in the config only affects new accounts
//! and existing hashes keep verifying.

use rand::Rng;
use sha2::Sha256;

/// Salt length in bytes.
const SALT_BYTES: usize = 16;

/// Derived key length in bytes.
const HASH_BYTES: usize = 32;

/// Generates a fresh random salt.
pub(crate) fn generate_salt() -> [u8; SALT_BYTES] {
    rand::rng().random()
}

/// Derives the hex-encoded hash of `password` under `salt` (raw bytes).
pub(crate) fn hash_password(password: &str, salt: &[u8], iterations: u32) -> String {
    let mut out = [0u8; HASH_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    hex::encode(out)
}

/// Constant-time comparison of two byte slices.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
