//! Project-level configuration (`.qvault.toml`).

pub mod settings;

pub use settings::Settings;
