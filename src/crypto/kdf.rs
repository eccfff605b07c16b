//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is not a fixed constant: `estimate_iterations`
//! benchmarks the executing machine and picks a count that makes one
//! derivation take roughly `target_ms` milliseconds.  The chosen count is
//! stored in the vault file so every later unlock uses the same value.

use std::time::Instant;

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key material: cipher key + IV + MAC key.
pub const SECRET_KEY_LEN: usize = 64;

/// Upper bound for a calibrated iteration count.  The on-disk field is a
/// 32-bit integer and must stay readable as a signed value.
pub const MAX_ITERATIONS: u32 = i32::MAX as u32;

/// Calibration parameters for `estimate_iterations_with_params`.
///
/// These map 1:1 to the fields in `Settings` so the CLI can pass
/// whatever the user configured in `.qvault.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Desired wall-clock cost of one derivation, in milliseconds (default: 50).
    pub target_ms: u32,
    /// Iterations used for the timing run (default: 1000).
    pub benchmark_iterations: u32,
    /// Floor for the calibrated iteration count (default: 100).
    pub min_iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            target_ms: 50,
            benchmark_iterations: 1_000,
            min_iterations: 100,
        }
    }
}

impl KdfParams {
    /// Reject parameter sets that would make calibration meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.target_ms == 0 {
            return Err(VaultError::ConfigError(
                "target_ms must be at least 1".into(),
            ));
        }
        if self.benchmark_iterations == 0 {
            return Err(VaultError::ConfigError(
                "benchmark_iterations must be at least 1".into(),
            ));
        }
        if self.min_iterations == 0 || self.min_iterations > MAX_ITERATIONS {
            return Err(VaultError::ConfigError(format!(
                "min_iterations must be between 1 and {MAX_ITERATIONS}"
            )));
        }
        Ok(())
    }
}

/// Estimate an iteration count for this machine with the default params.
pub fn estimate_iterations(password: &[u8], salt: &[u8]) -> u32 {
    estimate_iterations_with_params(password, salt, &KdfParams::default())
}

/// Estimate an iteration count that makes one derivation cost about
/// `params.target_ms` on the executing hardware.
///
/// Runs a single derivation with `benchmark_iterations`, measures it,
/// and scales linearly.  Never returns less than `min_iterations`.
pub fn estimate_iterations_with_params(password: &[u8], salt: &[u8], params: &KdfParams) -> u32 {
    let mut scratch = Zeroizing::new([0u8; SECRET_KEY_LEN]);

    let started = Instant::now();
    if let Err(e) = pbkdf2::pbkdf2::<Hmac<Sha256>>(
        password,
        salt,
        params.benchmark_iterations,
        &mut scratch[..],
    ) {
        warn!(error = %e, "iteration benchmark failed, using minimum iteration count");
        return params.min_iterations;
    }
    let elapsed_us = started.elapsed().as_micros();

    let iterations = scale_iterations(elapsed_us, params);
    debug!(elapsed_us, iterations, "calibrated key derivation cost");
    iterations
}

/// `floor(target * benchmark / elapsed)`, clamped to
/// `[min_iterations, MAX_ITERATIONS]`.  A zero elapsed time yields the minimum.
pub(crate) fn scale_iterations(elapsed_us: u128, params: &KdfParams) -> u32 {
    if elapsed_us == 0 {
        return params.min_iterations;
    }

    let target_us = u128::from(params.target_ms) * 1_000;
    let scaled = target_us * u128::from(params.benchmark_iterations) / elapsed_us;
    let capped = u32::try_from(scaled)
        .unwrap_or(MAX_ITERATIONS)
        .min(MAX_ITERATIONS);

    capped.max(params.min_iterations)
}

/// Derive 64 bytes of key material from a password and salt.
///
/// The same password + salt + iterations always produce the same bytes.
/// The output is wrapped in `Zeroizing` so it is wiped when dropped.
pub fn derive_secret_key(
    password: &[u8],
    iterations: u32,
    salt: &[u8],
) -> Result<Zeroizing<[u8; SECRET_KEY_LEN]>> {
    if iterations == 0 {
        return Err(VaultError::CryptoFailure(
            "PBKDF2 iterations must be at least 1".into(),
        ));
    }

    let mut key = Zeroizing::new([0u8; SECRET_KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut key[..])
        .map_err(|e| VaultError::CryptoFailure(format!("PBKDF2 derivation failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
