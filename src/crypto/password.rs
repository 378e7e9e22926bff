//! Account password hashing.
//!
//! Hashes are stored as `pbkdf2_sha256$<iterations>$<salt>$<hash>` with
//! base64 salt and hash, so the work factor can be raised later without
//! invalidating existing accounts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

const ALGORITHM: &str = "pbkdf2_sha256";
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 600_000;
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

/// Length of passwords handed out by account generation.
pub const GENERATED_PASSWORD_LENGTH: usize = 10;

fn derive(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out[..]);
    out
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LENGTH] = rand::random();
    let hash = derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{ALGORITHM}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(&hash[..])
    )
}

/// Check `password` against a stored hash in constant time.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CryptoError> {
    let mut parts = encoded.split('$');
    let (Some(algorithm), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };
    if algorithm != ALGORITHM {
        return Err(CryptoError::MalformedHash);
    }
    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| CryptoError::MalformedHash)?;

    let actual = derive(password, &salt, iterations);
    Ok(actual[..].ct_eq(expected.as_slice()).into())
}

/// Random alphanumeric password, zeroed when dropped.
pub fn generate_password(length: usize) -> Zeroizing<String> {
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Zeroizing::new(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let encoded = hash_password("s3cret-pass");
        assert!(encoded.starts_with("pbkdf2_sha256$"));
        assert!(verify_password("s3cret-pass", &encoded).unwrap());
        assert!(!verify_password("wrong", &encoded).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(CryptoError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("x", "md5$1$abc$def"),
            Err(CryptoError::MalformedHash)
        ));
    }

    #[test]
    fn generated_password_is_alphanumeric() {
        let password = generate_password(GENERATED_PASSWORD_LENGTH);
        assert_eq!(password.len(), 10);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(*password, *generate_password(GENERATED_PASSWORD_LENGTH));
    }
}
