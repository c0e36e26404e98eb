use autumn_core::CoreError;
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SALT_LENGTH: usize = 32;

/// Random alphanumeric string of `length` characters
pub fn random_string(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Hex-encoded HMAC-SHA256 of `data` keyed by `key`
pub fn hmac_sha256(data: &str, key: &str) -> Result<String, CoreError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::validation(format!("invalid HMAC key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let digest = hmac_sha256("what do ya want for nothing?", "Jefe").unwrap();
        assert_eq!(
            digest,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_random_string() {
        let a = random_string(SALT_LENGTH);
        let b = random_string(SALT_LENGTH);

        assert_eq!(a.len(), SALT_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
