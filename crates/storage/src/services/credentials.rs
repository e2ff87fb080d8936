use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{Result, StorageError};

/// Characters used for generated passwords. `0`, `O`, `o`, `1`, `I`, `l` and
/// `L` are left out so printed credentials cannot be misread.
pub const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";

pub const PASSWORD_LENGTH: usize = 8;

/// Used when a name has no ASCII letters or digits at all.
pub const FALLBACK_USERNAME: &str = "peserta";

/// Derives the base username for a participant from their full name.
///
/// The name is lowercased, every run of characters outside `[a-z0-9]` becomes
/// a single `.`, and leading/trailing dots are stripped:
///
/// ```
/// use storage::services::credentials::normalize_username;
///
/// assert_eq!(normalize_username("Ahmad Wijaya"), "ahmad.wijaya");
/// assert_eq!(normalize_username("  Siti  Nur-Haliza! "), "siti.nur.haliza");
/// ```
pub fn normalize_username(full_name: &str) -> String {
    let mut username = String::with_capacity(full_name.len());
    let mut pending_dot = false;

    for c in full_name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dot && !username.is_empty() {
                username.push('.');
            }
            pending_dot = false;
            username.push(c);
        } else {
            pending_dot = true;
        }
    }

    if username.is_empty() {
        FALLBACK_USERNAME.to_string()
    } else {
        username
    }
}

/// Username candidate for the given collision count: `base`, `base1`, `base2`, ...
pub fn username_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}{attempt}")
    }
}

/// Demo-grade credential: uniform over [`PASSWORD_ALPHABET`], not a secret
/// anyone should rely on beyond "not trivially guessable".
pub fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StorageError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 256-bit random bearer token, hex encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Tokens are only persisted as their SHA-256 fingerprint.
pub fn fingerprint_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
