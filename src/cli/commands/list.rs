//! `qvault list`: display all keys in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let store = open_vault(cli)?;

    let mut entries = Vec::new();
    for key in store.keys()? {
        let kind = store.get_value(&key)?.kind();
        entries.push((key, kind));
    }

    output::info(&format!(
        "{}: {} value(s)",
        store.filepath().display(),
        entries.len()
    ));
    output::print_keys_table(&entries);

    Ok(())
}
