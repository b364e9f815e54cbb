//! Random identifiers and content hashing.

use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Length of the public form slug.
pub const SLUG_LENGTH: usize = 8;

/// Generates a random alphanumeric slug of [`SLUG_LENGTH`] characters.
///
/// Eight characters from a 62-symbol alphabet leave a small but real chance of
/// collision, so callers must rely on the unique index and retry.
pub fn generate_slug() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns true if `slug` has the shape produced by [`generate_slug`].
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() == SLUG_LENGTH && slug.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Computes SHA-256 of the input bytes and returns it as a hex string.
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_slug_length_and_alphabet() {
        let slug = generate_slug();
        assert_eq!(slug.len(), SLUG_LENGTH);
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_slug_varies() {
        let slugs: HashSet<String> = (0..200).map(|_| generate_slug()).collect();
        // 62^8 possibilities; 200 draws colliding would point at a broken RNG
        assert!(slugs.len() > 195);
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("aB3dE6gH"));
        assert!(is_valid_slug(&generate_slug()));
        assert!(!is_valid_slug("short"));
        assert!(!is_valid_slug("toolong123"));
        assert!(!is_valid_slug("abc-efgh"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex(b"test");
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty() {
        assert_eq!(
            sha256_hex(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
