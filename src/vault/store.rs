//! High-level vault operations.
//!
//! `VaultStore` is a small state machine over one vault file:
//!
//! ```text
//!            unlock(password) ok
//!   Locked ───────────────────────▶ Unlocked
//!     ▲                                 │
//!     └──────────── lock() ─────────────┘
//! ```
//!
//! While `Locked` the handle holds nothing but the file path.  While
//! `Unlocked` it owns a `Session`: the key material, the cipher built from
//! it, and the encrypted record map.  Keys and values stay encrypted in
//! memory; a lookup encrypts the requested key and matches it against the
//! stored ciphertext, which works because the session cipher is
//! deterministic (see `crypto::encryption`).
//!
//! Every mutating operation rewrites the whole file before returning.  If
//! that write fails the in-memory state has already changed, so the
//! on-disk state should be treated as unknown (retry, or lock and unlock
//! again to reload).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::encryption::CipherEngine;
use crate::crypto::integrity;
use crate::crypto::kdf::KdfParams;
use crate::crypto::keys::SecretMaterial;
use crate::errors::{Result, VaultError};

use super::format::{self, Records, VaultHeader};
use super::value::Value;

/// Everything that exists only while the vault is unlocked.
struct Session {
    material: SecretMaterial,
    cipher: CipherEngine,
    records: Records,
}

impl Session {
    fn new(material: SecretMaterial, records: Records) -> Self {
        let cipher = CipherEngine::from_material(&material);
        Self {
            material,
            cipher,
            records,
        }
    }

    fn encrypt_key(&self, key: &str) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(VaultError::EmptyKey);
        }
        self.cipher.encrypt(key.as_bytes())
    }

    fn header(&self) -> Result<VaultHeader> {
        Ok(VaultHeader {
            salt: *self.material.salt(),
            iterations: self.material.iterations(),
            mac: integrity::tag_material(&self.material)?,
        })
    }

    /// Zero the key material before the session is dropped.  The cipher
    /// zeroes its own copy of the key on drop.
    fn close(mut self) {
        self.material.wipe();
        self.records.clear();
    }
}

enum VaultState {
    Locked,
    Unlocked(Session),
}

/// The main vault handle.  Create the file once with `VaultStore::create`,
/// then open a handle with `VaultStore::new` and `unlock` it.
pub struct VaultStore {
    /// Path to the vault file on disk.
    path: PathBuf,

    /// Calibration used when a password change derives new material.
    params: KdfParams,

    state: VaultState,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a brand-new vault file at `path` protected by `password`.
    ///
    /// Generates a random salt, calibrates the iteration count, derives the
    /// key material and writes a vault with no records.
    pub fn create(path: &Path, password: &[u8]) -> Result<()> {
        Self::create_with_params(path, password, &KdfParams::default())
    }

    /// Like `create`, with explicit calibration parameters.
    pub fn create_with_params(path: &Path, password: &[u8], params: &KdfParams) -> Result<()> {
        if path.exists() {
            return Err(VaultError::AlreadyExists(path.to_path_buf()));
        }
        if password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }

        let session = Session::new(SecretMaterial::generate(password, params)?, Records::new());
        let header = session.header()?;
        let iterations = header.iterations;

        format::create_vault(path, &header, &session.records)?;
        session.close();

        debug!(path = %path.display(), iterations, "created vault");
        Ok(())
    }

    /// Open a handle on an existing vault file.  No I/O happens here; the
    /// handle starts out locked.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_params(path, KdfParams::default())
    }

    /// Like `new`, with explicit calibration parameters for `change_password`.
    pub fn with_params(path: impl Into<PathBuf>, params: KdfParams) -> Self {
        Self {
            path: path.into(),
            params,
            state: VaultState::Locked,
        }
    }

    // ------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------

    /// Unlock the vault with `password`.
    ///
    /// Reads the file, re-derives the key material from the stored salt and
    /// iteration count, and checks it against the stored MAC before loading
    /// any record.  Already unlocked handles return `Ok` immediately.
    ///
    /// A wrong password and a corrupted header both yield
    /// `AuthenticationFailure`; the handle stays locked on every error.
    pub fn unlock(&mut self, password: &[u8]) -> Result<()> {
        if !self.is_locked() {
            return Ok(());
        }

        let file = format::read_vault(&self.path)?;
        let material =
            SecretMaterial::derive(password, file.header.salt, file.header.iterations)?;

        // `material` is zeroed on drop if verification fails.
        if let Err(e) = integrity::verify_material(&material, &file.header.mac) {
            warn!(path = %self.path.display(), "cannot unlock vault: check password and file integrity");
            return Err(e);
        }

        let record_count = file.records.len();
        self.state = VaultState::Unlocked(Session::new(material, file.records));

        debug!(path = %self.path.display(), record_count, "vault unlocked");
        Ok(())
    }

    /// Lock the vault: zero the key material, drop the cipher and forget
    /// all records.  Always succeeds.
    pub fn lock(&mut self) {
        if let VaultState::Unlocked(session) = std::mem::replace(&mut self.state, VaultState::Locked)
        {
            session.close();
            debug!(path = %self.path.display(), "vault locked");
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, VaultState::Locked)
    }

    /// Returns the path to the vault file.
    pub fn filepath(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Decrypt and return the value stored under `key`.
    pub fn get_value(&self, key: &str) -> Result<Value> {
        let session = self.session()?;
        let encrypted_key = session.encrypt_key(key)?;

        let encrypted_value = session
            .records
            .get(&encrypted_key)
            .ok_or_else(|| VaultError::KeyNotFound(key.to_string()))?;

        let plaintext = Zeroizing::new(session.cipher.decrypt(encrypted_value)?);
        Value::decode(&plaintext)
    }

    /// Returns `true` if a value is stored under `key`.  Nothing is decrypted.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        let session = self.session()?;
        let encrypted_key = session.encrypt_key(key)?;
        Ok(session.records.contains_key(&encrypted_key))
    }

    /// Add or replace the value under `key` and persist the vault.
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let session = self.session_mut()?;
        let encrypted_key = session.encrypt_key(key)?;

        let encoded = Zeroizing::new(value.into().encode()?);
        let encrypted_value = session.cipher.encrypt(&encoded)?;

        session.records.insert(encrypted_key, encrypted_value);
        self.save()
    }

    /// Remove the value under `key` and persist the vault.
    ///
    /// Removing a key that is not present succeeds without touching the file.
    pub fn remove_value(&mut self, key: &str) -> Result<()> {
        let session = self.session_mut()?;
        let encrypted_key = session.encrypt_key(key)?;

        if session.records.remove(&encrypted_key).is_none() {
            return Ok(());
        }
        self.save()
    }

    /// Remove every value and persist the empty vault.
    pub fn clear(&mut self) -> Result<()> {
        self.session_mut()?.records.clear();
        self.save()
    }

    /// Number of stored values.
    pub fn len(&self) -> Result<usize> {
        Ok(self.session()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.session()?.records.is_empty())
    }

    /// Decrypt and return all stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let session = self.session()?;
        let mut keys = Vec::with_capacity(session.records.len());

        for encrypted_key in session.records.keys() {
            let plaintext = session.cipher.decrypt(encrypted_key)?;
            let key = String::from_utf8(plaintext).map_err(|e| {
                let mut bad_bytes = e.into_bytes();
                bad_bytes.zeroize();
                VaultError::InvalidValue("stored key is not valid UTF-8".into())
            })?;
            keys.push(key);
        }

        keys.sort();
        Ok(keys)
    }

    // ------------------------------------------------------------------
    // Password change
    // ------------------------------------------------------------------

    /// Re-key the vault under `new_password`.
    ///
    /// Every record is decrypted with the current cipher first, then fresh
    /// key material (new salt, newly calibrated iterations) is derived and
    /// every record is re-encrypted under it before the file is rewritten.
    /// If decryption or derivation fails the current session is untouched.
    pub fn change_password(&mut self, new_password: &[u8]) -> Result<()> {
        if new_password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        let session = self.session()?;

        // 1. Decrypt everything under the outgoing cipher.
        let mut plaintext = Vec::with_capacity(session.records.len());
        for (encrypted_key, encrypted_value) in &session.records {
            let key = Zeroizing::new(session.cipher.decrypt(encrypted_key)?);
            let value = Zeroizing::new(session.cipher.decrypt(encrypted_value)?);
            plaintext.push((key, value));
        }

        // 2. Derive brand-new material and a cipher for it.
        let material = SecretMaterial::generate(new_password, &self.params)?;
        let iterations = material.iterations();
        let mut next = Session::new(material, Records::with_capacity(plaintext.len()));

        // 3. Re-encrypt under the new cipher.
        for (key, value) in &plaintext {
            let encrypted_key = next.cipher.encrypt(key)?;
            let encrypted_value = next.cipher.encrypt(value)?;
            next.records.insert(encrypted_key, encrypted_value);
        }
        drop(plaintext);

        // 4. Install the new session and wipe the old one.
        if let VaultState::Unlocked(old) =
            std::mem::replace(&mut self.state, VaultState::Unlocked(next))
        {
            old.close();
        }

        debug!(path = %self.path.display(), iterations, "vault password changed");
        self.save()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Rewrite the whole vault file from the current session.
    fn save(&self) -> Result<()> {
        let session = self.session()?;
        let header = session.header()?;

        format::write_vault(&self.path, &header, &session.records)?;

        debug!(
            path = %self.path.display(),
            record_count = session.records.len(),
            "vault saved"
        );
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        match &self.state {
            VaultState::Unlocked(session) => Ok(session),
            VaultState::Locked => Err(VaultError::LockedStateViolation),
        }
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        match &mut self.state {
            VaultState::Unlocked(session) => Ok(session),
            VaultState::Locked => Err(VaultError::LockedStateViolation),
        }
    }
}

impl Drop for VaultStore {
    fn drop(&mut self) {
        self.lock();
    }
}
