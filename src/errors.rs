use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in QVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Vault lifecycle errors ---
    #[error("Vault already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Vault is locked: unlock it before reading or writing values")]
    LockedStateViolation,

    #[error("Cannot unlock vault: wrong password or corrupted file")]
    AuthenticationFailure,

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    // --- Record errors ---
    #[error("Key must not be empty")]
    EmptyKey,

    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Invalid value encoding: {0}")]
    InvalidValue(String),

    // --- Crypto errors ---
    #[error("Cryptographic operation failed: {0}")]
    CryptoFailure(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for QVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
