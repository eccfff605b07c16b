//! `qvault remove`: delete a stored value.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, key: &str) -> Result<()> {
    let mut store = open_vault(cli)?;

    if !store.contains_key(key)? {
        output::info(&format!("No value stored under '{key}', nothing to remove."));
        return Ok(());
    }

    store.remove_value(key)?;
    output::success(&format!("Removed '{key}' ({} left)", store.len()?));

    Ok(())
}
