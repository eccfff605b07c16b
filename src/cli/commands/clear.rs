//! `qvault clear`: remove every stored value.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `clear` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation first.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Remove every value from the vault?")
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let mut store = open_vault(cli)?;
    let removed = store.len()?;
    store.clear()?;

    output::success(&format!("Removed {removed} value(s)"));

    Ok(())
}
