use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rand_core::OsError;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Verifier length in characters. RFC 7636 requires at least 43.
pub const VERIFIER_LEN: usize = 64;

/// Returns `len` random URL-safe characters from the OS entropy source.
pub fn random_url_safe(len: usize) -> Result<String, OsError> {
    let mut bytes = vec![0u8; len];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut bytes)?;
    let mut encoded = URL_SAFE_NO_PAD.encode(&bytes);
    encoded.truncate(len);
    Ok(encoded)
}

/// RFC 7636 S256 transform: SHA-256 of the verifier, base64url, no padding.
pub fn challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Combined PKCE verifier + challenge pair using the S256 method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a new verifier + challenge pair.
    pub fn generate() -> Result<Self, OsError> {
        let verifier = random_url_safe(VERIFIER_LEN)?;
        let challenge = challenge(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_strings_have_requested_length() {
        for len in [12, 43, 64] {
            let value = random_url_safe(len).expect("entropy");
            assert_eq!(value.len(), len);
            assert!(!value.contains('='));
            assert!(!value.contains('+'));
            assert!(!value.contains('/'));
        }
    }

    #[test]
    fn generated_pair_has_expected_length() {
        let pair = PkcePair::generate().expect("entropy");
        assert_eq!(pair.verifier.len(), VERIFIER_LEN);
        assert!(!pair.challenge.is_empty());
        assert!(!pair.challenge.contains('='));
    }

    #[test]
    fn challenge_is_deterministic() {
        let pair = PkcePair::generate().expect("entropy");
        assert_eq!(challenge(&pair.verifier), pair.challenge);
        assert_eq!(challenge(&pair.verifier), challenge(&pair.verifier));
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_vector() {
        // RFC 7636 appendix B reference verifier and its S256 challenge.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }
}
