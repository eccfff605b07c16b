//! HMAC-SHA256 tag over the derived key material.
//!
//! The vault file stores `HMAC(mac_key, cipher_key ++ iv ++ mac_key)`.
//! Re-deriving the material at unlock and recomputing this tag tells us
//! whether the password is right without decrypting any record.  A wrong
//! password and a tampered salt, iteration count or tag all look the same:
//! `AuthenticationFailure`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::keys::SecretMaterial;
use crate::errors::{Result, VaultError};

type HmacSha256 = Hmac<Sha256>;

/// Size of the HMAC-SHA256 tag in bytes.
pub const TAG_LEN: usize = 32;

/// Compute HMAC-SHA256 over `message`.
pub fn tag(mac_key: &[u8], message: &[u8]) -> Result<[u8; TAG_LEN]> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|e| VaultError::CryptoFailure(format!("invalid HMAC key: {e}")))?;
    mac.update(message);

    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Verify a tag using constant-time comparison.
pub fn verify(mac_key: &[u8], message: &[u8], expected: &[u8]) -> Result<()> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|e| VaultError::CryptoFailure(format!("invalid HMAC key: {e}")))?;
    mac.update(message);
    mac.verify_slice(expected)
        .map_err(|_| VaultError::AuthenticationFailure)
}

/// The tag stored in the vault header for this key material.
pub fn tag_material(material: &SecretMaterial) -> Result<[u8; TAG_LEN]> {
    tag(material.mac_key(), &material.secret_key()[..])
}

/// Check the stored header tag against freshly derived key material.
pub fn verify_material(material: &SecretMaterial, expected: &[u8]) -> Result<()> {
    verify(material.mac_key(), &material.secret_key()[..], expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{SALT_LEN, SECRET_KEY_LEN};

    #[test]
    fn tag_verifies() {
        let t = tag(b"key", b"message").unwrap();
        assert!(verify(b"key", b"message", &t).is_ok());
    }

    #[test]
    fn wrong_key_or_message_fails() {
        let t = tag(b"key", b"message").unwrap();
        assert!(matches!(
            verify(b"other", b"message", &t),
            Err(VaultError::AuthenticationFailure)
        ));
        assert!(matches!(
            verify(b"key", b"other", &t),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    #[test]
    fn truncated_tag_fails() {
        let t = tag(b"key", b"message").unwrap();
        assert!(verify(b"key", b"message", &t[..16]).is_err());
    }

    #[test]
    fn material_tag_is_keyed_by_trailing_bytes() {
        let mut raw = [0u8; SECRET_KEY_LEN];
        raw[40] = 1;
        let material = SecretMaterial::from_secret_key(&raw, [0u8; SALT_LEN], 1);

        let expected = tag(&raw[32..], &raw).unwrap();
        assert_eq!(tag_material(&material).unwrap(), expected);
        assert!(verify_material(&material, &expected).is_ok());
    }
}
