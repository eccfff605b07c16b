//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultStore;

/// Minimum password length accepted for new vault passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding the current vault password.
pub const PASSWORD_ENV: &str = "QVAULT_PASSWORD";

/// Environment variable holding the new password for `passwd`.
pub const NEW_PASSWORD_ENV: &str = "QVAULT_NEW_PASSWORD";

/// QVault CLI: password-protected encrypted key-value vault.
#[derive(Parser)]
#[command(
    name = "qvault",
    about = "Password-protected encrypted key-value vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: `vault_path` from .qvault.toml, else vault.qvault)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Store a value (add or replace)
    Set {
        /// Key to store the value under
        key: String,
        /// Value (omit for interactive prompt)
        value: Option<String>,
        /// How to interpret the value
        #[arg(short = 't', long = "type", value_enum, default_value_t = ValueType::Text)]
        value_type: ValueType,
    },

    /// Print a stored value
    Get {
        /// Key to look up
        key: String,
    },

    /// Remove a stored value
    Remove {
        /// Key to remove
        key: String,
    },

    /// List all keys and the kind of value stored under each
    List,

    /// Remove every stored value
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the vault password (re-encrypts every value)
    Passwd,
}

/// Value kinds accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ValueType {
    Text,
    Int,
    Float,
    /// Standard base64
    Bytes,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault password, trying in order:
/// 1. `QVAULT_PASSWORD` env var (scripts/CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation.
///
/// Checks `env_var` first for scripted usage.  Enforces a minimum length.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSWORD_LEN {
                return Err(VaultError::CommandFailed(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose vault password")
            .with_confirmation(
                "Confirm vault password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Resolve the vault file from `--vault` or the project settings.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    if let Some(path) = &cli.vault {
        return Ok(path.clone());
    }
    let cwd = std::env::current_dir()?;
    Ok(settings.vault_path(&cwd))
}

/// Load settings, prompt for the password and return an unlocked store.
pub fn open_vault(cli: &Cli) -> Result<VaultStore> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = vault_path(cli, &settings)?;

    if !path.exists() {
        output::tip("Run `qvault init` to create a vault.");
        return Err(VaultError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no vault at {}", path.display()),
        )));
    }

    let password = prompt_password()?;
    let mut store = VaultStore::with_params(path, settings.kdf_params());
    store.unlock(password.as_bytes())?;
    Ok(store)
}
