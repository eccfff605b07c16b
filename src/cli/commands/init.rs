//! `qvault init`: create a new, empty vault.

use std::fs;

use crate::cli::output;
use crate::cli::{prompt_new_password, vault_path, Cli, PASSWORD_ENV};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultStore;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = vault_path(cli, &settings)?;

    // 1. Refuse to overwrite an existing vault.
    if path.exists() {
        output::tip("Use `qvault set` to add values to the existing vault.");
        return Err(VaultError::AlreadyExists(path));
    }

    // 2. Create the parent directory if it doesn't exist.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            output::info(&format!("Created directory: {}", parent.display()));
        }
    }

    // 3. Prompt for a new password (with confirmation), then create the file.
    let password = prompt_new_password(PASSWORD_ENV)?;
    VaultStore::create_with_params(&path, password.as_bytes(), &settings.kdf_params())?;

    output::success(&format!("Vault created at {}", path.display()));
    output::tip("Run `qvault set <KEY> <VALUE>` to store a value.");

    Ok(())
}
