//! PBKDF2-HMAC-SHA256 password hashes stored as
//! `pbkdf2-sha256$<iterations>$<salt>$<digest>`.

use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Hashes new passwords with a fixed work factor.
///
/// Stored hashes carry their own iteration count, so raising the work factor
/// never invalidates existing accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    /// A count of zero is raised to one.
    #[must_use]
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    #[must_use]
    pub fn iterations(self) -> u32 {
        self.iterations
    }

    /// Hash `password` with a fresh random salt.
    #[must_use]
    pub fn hash(self, password: &str) -> String {
        let mut salt = [0_u8; SALT_LEN];
        rand::rng().fill(&mut salt);
        let digest = derive(password, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(digest)
        )
    }
}

/// Check `password` against a stored hash. Malformed hashes never verify.
#[must_use]
pub fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };

    derive(password, &salt, iterations)
        .as_slice()
        .ct_eq(&expected)
        .into()
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let mut digest = [0_u8; DIGEST_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut digest);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn verifies_matching_password_only() {
        let stored = hasher().hash("correct horse");
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password(&stored, "correct horse"));
        assert!(!verify_password(&stored, "correct horse "));
        assert!(!verify_password(&stored, ""));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hasher().hash("same"), hasher().hash("same"));
    }

    #[test]
    fn stored_iteration_count_is_used_for_verification() {
        let stored = PasswordHasher::new(2_000).hash("secret");
        assert!(verify_password(&stored, "secret"));

        let tampered = stored.replacen("$2000$", "$1000$", 1);
        assert!(!verify_password(&tampered, "secret"));
    }

    #[test]
    fn known_pbkdf2_vector() {
        // RFC 7914 section 11, first 32 bytes
        let digest = derive("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(digest),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn default_work_factor() {
        assert_eq!(PasswordHasher::default().iterations(), DEFAULT_ITERATIONS);
        assert_eq!(PasswordHasher::new(0).iterations(), 1);
    }

    #[test]
    fn malformed_hashes_never_verify() {
        for stored in [
            "",
            "pbkdf2-sha256",
            "pbkdf2-sha256$1000$zz$00",
            "pbkdf2-sha256$0$00$00",
            "pbkdf2-sha256$many$00$00",
            "sha256$1000$00$00",
            "pbkdf2-sha256$1000$00",
        ] {
            assert!(!verify_password(stored, "anything"), "{stored:?}");
        }
    }
}
