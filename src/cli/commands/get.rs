//! `qvault get`: print a single stored value.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, key: &str) -> Result<()> {
    let store = open_vault(cli)?;

    // Decrypt and print the value to stdout.
    let value = store.get_value(key)?;
    println!("{}", output::format_value(&value));

    Ok(())
}
