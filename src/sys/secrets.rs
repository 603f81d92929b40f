// src/sys/secrets.rs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use zeroize::Zeroizing;

// ==============================================================================
// 1. Key Material Wrapper
// ==============================================================================

/// KeyMaterial holds a decoded private key between the moment it leaves the
/// environment and the moment it lands in the owner-only key file.
///
/// 1. `Debug` never prints the bytes.
/// 2. The heap buffer is zeroized when the value is dropped.
pub struct KeyMaterial {
    bytes: Secret<Vec<u8>>,
}

impl KeyMaterial {
    pub fn new(raw: Vec<u8>) -> Self {
        Self {
            bytes: Secret::new(raw),
        }
    }

    /// Decodes standard base64. ASCII whitespace is ignored so that keys
    /// pasted across several lines still decode.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        // 🛡️ The encoded copy is as sensitive as the key; wipe it on drop too.
        let compact: Zeroizing<String> = Zeroizing::new(
            encoded
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect(),
        );
        let raw = STANDARD.decode(compact.as_bytes())?;
        Ok(Self::new(raw))
    }

    /// Lends the plaintext to `action`; the slice cannot outlive the call.
    pub fn use_secret<F, R>(&self, action: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        action(self.bytes.expose_secret())
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.expose_secret().is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        // "key-bytes" split over two lines
        let key = KeyMaterial::from_base64("a2V5LWJ5\ndGVz\n").unwrap();
        key.use_secret(|raw| assert_eq!(raw, b"key-bytes"));
    }

    #[test]
    fn ignores_every_kind_of_ascii_whitespace() {
        let key = KeyMaterial::from_base64(" a2V5\r\n\tLWJ5 dGVz ").unwrap();
        key.use_secret(|raw| assert_eq!(raw, b"key-bytes"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(KeyMaterial::from_base64("not base64 !!").is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let key = KeyMaterial::new(b"super secret".to_vec());
        let shown = format!("{:?}", key);
        assert!(!shown.contains("super"));
        assert!(shown.contains("REDACTED"));
    }
}
