//! `qvault set`: add or replace a value in the vault.

use std::io::{self, IsTerminal, Read};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cli::output;
use crate::cli::{open_vault, Cli, ValueType};
use crate::errors::{Result, VaultError};
use crate::vault::Value;

/// Execute the `set` command.
pub fn execute(cli: &Cli, key: &str, value: Option<&str>, value_type: ValueType) -> Result<()> {
    // Determine the raw input from one of three sources.
    let raw = if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line, it may appear in shell history.");
        v.to_string()
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        // Source 3: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?
    };

    // Parse before unlocking so a typo doesn't cost a KDF run.
    let parsed = parse_value(&raw, value_type)?;

    let mut store = open_vault(cli)?;
    let existed = store.contains_key(key)?;
    store.set_value(key, parsed)?;

    let op = if existed { "updated" } else { "added" };
    output::success(&format!(
        "'{key}' ({value_type:?}) {op} ({} total)",
        store.len()?
    ));

    Ok(())
}

/// Interpret command-line input according to `--type`.
pub fn parse_value(raw: &str, value_type: ValueType) -> Result<Value> {
    match value_type {
        ValueType::Text => Ok(Value::Text(raw.to_string())),
        ValueType::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| VaultError::InvalidValue(format!("'{raw}' is not an integer: {e}"))),
        ValueType::Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| VaultError::InvalidValue(format!("'{raw}' is not a float: {e}"))),
        ValueType::Bytes => BASE64
            .decode(raw.trim())
            .map(Value::Bytes)
            .map_err(|e| VaultError::InvalidValue(format!("invalid base64: {e}"))),
    }
}
