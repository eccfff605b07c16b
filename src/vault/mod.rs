//! Vault module: encrypted key-value storage.
//!
//! This module provides:
//! - The typed `Value` codec (`value`)
//! - Binary vault file format (`format`)
//! - The locked/unlocked `VaultStore` state machine (`store`)

pub mod format;
pub mod store;
pub mod value;

// Re-export the most commonly used items.
pub use format::{Records, VaultFile, VaultHeader};
pub use store::VaultStore;
pub use value::{Value, ValueKind};
