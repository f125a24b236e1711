use rand::RngCore;
use sha2::{Digest, Sha256};

/// 32 random bytes, hex encoded. Sent to the user by email.
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest stored in place of the raw token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Check a raw token against its stored digest. Runs in time independent
/// of where the digests differ.
pub fn token_matches(token: &str, stored_digest: &str) -> bool {
    let candidate = hash_token(token);
    let (a, b) = (candidate.as_bytes(), stored_digest.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let a = generate_verification_token();
        let b = generate_verification_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_stable_and_distinct() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), "abc");
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_token_matches_digest() {
        let token = generate_verification_token();
        let digest = hash_token(&token);
        assert!(token_matches(&token, &digest));
        assert!(!token_matches("wrong", &digest));
        assert!(!token_matches(&token, ""));
        assert!(!token_matches(&token, &digest[..63]));
    }
}
