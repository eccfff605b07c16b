//! AES-128-CBC encryption with PKCS#7 padding under a fixed session key and IV.
//!
//! The key and IV never change for the lifetime of a `CipherEngine`, so
//! encryption is deterministic: the same plaintext always yields the same
//! ciphertext within one unlocked session.  The vault relies on this to
//! look records up by encrypting the requested key and matching it
//! against the stored ciphertext keys.
//!
//! The trade-off is that equal plaintexts (a repeated value, say) are
//! visible as equal ciphertexts to anyone who can read the vault file.

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::keys::{SecretMaterial, CIPHER_KEY_LEN, IV_LEN};
use crate::errors::{Result, VaultError};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Symmetric cipher bound to one session's key and IV.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherEngine {
    key: [u8; CIPHER_KEY_LEN],
    iv: [u8; IV_LEN],
}

impl CipherEngine {
    pub fn new(key: &[u8; CIPHER_KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        Self { key: *key, iv: *iv }
    }

    /// Build the engine for a session from its key material.
    pub fn from_material(material: &SecretMaterial) -> Self {
        Self::new(material.cipher_key(), material.iv())
    }

    /// Encrypt `plaintext`.  The output is padded to a whole number of
    /// 16-byte blocks, so it is always longer than the input.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        if plaintext.is_empty() {
            return Err(VaultError::CryptoFailure(
                "cannot encrypt empty input".into(),
            ));
        }

        let cipher = Aes128CbcEnc::new_from_slices(&self.key, &self.iv)
            .map_err(|e| VaultError::CryptoFailure(format!("invalid cipher key: {e}")))?;

        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    /// Decrypt data that was produced by `encrypt` under the same key and IV.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() {
            return Err(VaultError::CryptoFailure(
                "cannot decrypt empty input".into(),
            ));
        }

        let cipher = Aes128CbcDec::new_from_slices(&self.key, &self.iv)
            .map_err(|e| VaultError::CryptoFailure(format!("invalid cipher key: {e}")))?;

        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| VaultError::CryptoFailure("decryption failed: bad padding or length".into()))
    }
}
