//! Session key material derived from the vault password.
//!
//! One PBKDF2 run produces 64 bytes which are sliced at fixed offsets:
//!
//! ```text
//! [ 0..16)  AES-128 cipher key
//! [16..32)  CBC initialization vector
//! [32..64)  HMAC-SHA256 key
//! ```
//!
//! `SecretMaterial` keeps the three slices (plus the salt and iteration
//! count they were derived with) for as long as the vault is unlocked,
//! and overwrites all of it with zeros when the session ends.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::kdf::{self, KdfParams, SALT_LEN, SECRET_KEY_LEN};
use crate::errors::Result;

/// Length of the AES-128 cipher key.
pub const CIPHER_KEY_LEN: usize = 16;

/// Length of the CBC initialization vector (one AES block).
pub const IV_LEN: usize = 16;

/// Length of the HMAC-SHA256 key.
pub const MAC_KEY_LEN: usize = 32;

const IV_OFFSET: usize = CIPHER_KEY_LEN;
const MAC_KEY_OFFSET: usize = CIPHER_KEY_LEN + IV_LEN;

/// Key material for one unlocked session.
///
/// Not `Clone`: exactly one owner exists, and every buffer is zeroed on
/// `wipe()` and again on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial {
    cipher_key: [u8; CIPHER_KEY_LEN],
    iv: [u8; IV_LEN],
    mac_key: [u8; MAC_KEY_LEN],
    salt: [u8; SALT_LEN],
    iterations: u32,
}

impl SecretMaterial {
    /// Split a 64-byte derivation output into its three sub-keys.
    pub fn from_secret_key(
        secret_key: &[u8; SECRET_KEY_LEN],
        salt: [u8; SALT_LEN],
        iterations: u32,
    ) -> Self {
        let mut material = Self {
            cipher_key: [0u8; CIPHER_KEY_LEN],
            iv: [0u8; IV_LEN],
            mac_key: [0u8; MAC_KEY_LEN],
            salt,
            iterations,
        };
        material
            .cipher_key
            .copy_from_slice(&secret_key[..IV_OFFSET]);
        material
            .iv
            .copy_from_slice(&secret_key[IV_OFFSET..MAC_KEY_OFFSET]);
        material
            .mac_key
            .copy_from_slice(&secret_key[MAC_KEY_OFFSET..]);
        material
    }

    /// Re-derive the material for an existing vault from its stored
    /// salt and iteration count.
    pub fn derive(password: &[u8], salt: [u8; SALT_LEN], iterations: u32) -> Result<Self> {
        let secret_key = kdf::derive_secret_key(password, iterations, &salt)?;
        Ok(Self::from_secret_key(&secret_key, salt, iterations))
    }

    /// Generate brand-new material: a fresh random salt and an iteration
    /// count calibrated to this machine.
    ///
    /// Used when a vault is created and when its password changes.
    pub fn generate(password: &[u8], params: &KdfParams) -> Result<Self> {
        params.validate()?;
        let salt = kdf::generate_salt();
        let iterations = kdf::estimate_iterations_with_params(password, &salt, params);
        Self::derive(password, salt, iterations)
    }

    /// Rebuild `cipher_key ++ iv ++ mac_key`.
    ///
    /// The returned buffer zeroes itself on drop.
    pub fn secret_key(&self) -> Zeroizing<[u8; SECRET_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        out[..IV_OFFSET].copy_from_slice(&self.cipher_key);
        out[IV_OFFSET..MAC_KEY_OFFSET].copy_from_slice(&self.iv);
        out[MAC_KEY_OFFSET..].copy_from_slice(&self.mac_key);
        out
    }

    pub fn cipher_key(&self) -> &[u8; CIPHER_KEY_LEN] {
        &self.cipher_key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn mac_key(&self) -> &[u8; MAC_KEY_LEN] {
        &self.mac_key
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Overwrite every buffer with zeros and reset the iteration count.
    pub fn wipe(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}
