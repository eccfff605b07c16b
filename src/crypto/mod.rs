//! Cryptographic primitives for QVault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation with iteration calibration (`kdf`)
//! - The per-session `SecretMaterial` key container (`keys`)
//! - Deterministic AES-128-CBC encryption (`encryption`)
//! - HMAC-SHA256 integrity tags over the key material (`integrity`)

pub mod encryption;
pub mod integrity;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{CipherEngine, SecretMaterial, ...};
pub use encryption::CipherEngine;
pub use kdf::{derive_secret_key, estimate_iterations, generate_salt, KdfParams};
pub use keys::SecretMaterial;
