use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const MIN_KEY_LEN: usize = 32;

/// Raw key bytes as read from configuration. Never printed.
#[derive(Clone, Eq, PartialEq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|error| format!("Failed to decode base64 signing key: {error}"))?;

        if bytes.len() < MIN_KEY_LEN {
            return Err(format!(
                "Signing key too short: expected at least {MIN_KEY_LEN} bytes, got {}",
                bytes.len()
            ));
        }

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for KeyMaterial {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([redacted])")
    }
}

/// The process-wide HMAC-SHA256 key
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    pub fn new(material: &KeyMaterial) -> Result<Self> {
        if material.as_bytes().len() < MIN_KEY_LEN {
            return Err(anyhow!("Signing key must be at least {MIN_KEY_LEN} bytes"));
        }

        let mac = HmacSha256::new_from_slice(material.as_bytes())
            .map_err(|error| anyhow!("Invalid signing key: {error}"))?;
        Ok(Self { mac })
    }

    /// Random key for a single process lifetime
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; 32];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(&KeyMaterial::from(key))
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time comparison against an expected tag
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(signature).is_ok()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([redacted])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_material_from_base64() {
        let encoded = STANDARD.encode([7u8; 32]);
        let material = KeyMaterial::from_base64(&encoded).unwrap();
        assert_eq!(material.as_bytes(), &[7u8; 32]);

        let short = STANDARD.encode([7u8; 16]);
        let err = KeyMaterial::from_base64(&short).unwrap_err();
        assert!(err.contains("too short"));

        let err = KeyMaterial::from_base64("not base64!!").unwrap_err();
        assert!(err.contains("base64"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let material = KeyMaterial::from([9u8; 32]);
        assert_eq!(format!("{material:?}"), "KeyMaterial([redacted])");

        let key = SigningKey::new(&material).unwrap();
        assert_eq!(format!("{key:?}"), "SigningKey([redacted])");
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SigningKey::new(&KeyMaterial::from([1u8; 32])).unwrap();
        let tag = key.sign(b"header.claims");
        assert_eq!(tag.len(), 32);
        assert!(key.verify(b"header.claims", &tag));
        assert!(!key.verify(b"header.claimz", &tag));
        assert!(!key.verify(b"header.claims", &tag[..31]));

        let other = SigningKey::new(&KeyMaterial::from([2u8; 32])).unwrap();
        assert!(!other.verify(b"header.claims", &tag));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = SigningKey::generate().unwrap();
        let b = SigningKey::generate().unwrap();
        assert_ne!(a.sign(b"msg"), b.sign(b"msg"));
    }
}
