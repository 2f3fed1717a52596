use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::Digest;

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

pub fn generate_pkce_pair() -> PkcePair {
    let verifier = random_url_safe(64);
    let digest = sha2::Sha256::digest(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(digest);
    PkcePair { verifier, challenge }
}

pub fn generate_state_token() -> String {
    random_url_safe(32)
}

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_is_deterministic_from_verifier() {
        let pair = generate_pkce_pair();
        let digest = sha2::Sha256::digest(pair.verifier.as_bytes());
        assert_eq!(pair.challenge, URL_SAFE_NO_PAD.encode(digest));
    }

    #[test]
    fn state_tokens_are_not_reused() {
        let a = generate_state_token();
        let b = generate_state_token();
        assert_ne!(a, b);
    }
}
