//! Activation token generation and hashing.
//!
//! Tokens are 32 random bytes rendered as unpadded RFC 4648 base32, which
//! survives being pasted into a URL query. Only the base32 SHA-256 digest of the
//! plaintext is stored.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::models::auth::ActivationToken;

const TOKEN_BYTES: usize = 32;
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Generate a fresh activation token with its hash.
pub fn generate() -> ActivationToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let plaintext = base32(&bytes);
    let hash = hash(&plaintext);
    ActivationToken { plaintext, hash }
}

/// One-way hash of a token plaintext, in the stored form.
pub fn hash(plaintext: &str) -> String {
    base32(&Sha256::digest(plaintext.as_bytes()))
}

fn base32(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base32_matches_rfc4648_vectors() {
        assert_eq!(base32(b""), "");
        assert_eq!(base32(b"f"), "MY");
        assert_eq!(base32(b"fo"), "MZXQ");
        assert_eq!(base32(b"foo"), "MZXW6");
        assert_eq!(base32(b"foob"), "MZXW6YQ");
        assert_eq!(base32(b"fooba"), "MZXW6YTB");
        assert_eq!(base32(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn generated_token_hash_matches_plaintext() {
        let token = generate();
        // 32 bytes → 52 base32 characters, no padding.
        assert_eq!(token.plaintext.len(), 52);
        assert!(!token.plaintext.contains('='));
        assert_eq!(hash(&token.plaintext), token.hash);
        assert_ne!(token.plaintext, token.hash);
    }

    #[test]
    fn tokens_are_random() {
        assert_ne!(generate().plaintext, generate().plaintext);
    }
}
