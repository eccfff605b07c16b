//! `qvault passwd`: change the vault password.
//!
//! Unlocks with the current password, then lets the store decrypt every
//! value, derive new key material (fresh salt, recalibrated iterations)
//! and re-encrypt everything before rewriting the file.

use crate::cli::output;
use crate::cli::{open_vault, prompt_new_password, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    // 1. Open the vault with the current password.
    output::info("Enter your current vault password.");
    let mut store = open_vault(cli)?;

    // 2. Prompt for the new password.
    output::info("Choose your new vault password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;

    // 3. Re-key and save.
    store.change_password(new_password.as_bytes())?;

    output::success(&format!(
        "Password changed for {} ({} value(s) re-encrypted)",
        store.filepath().display(),
        store.len()?
    ));

    Ok(())
}
