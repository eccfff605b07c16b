use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::KdfParams;
use crate::errors::{Result, VaultError};

/// Project-level configuration, loaded from `.qvault.toml`.
///
/// Every field has a sensible default so QVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault file used when `--vault` is not given (relative to the project dir).
    #[serde(default = "default_vault_path")]
    pub vault_path: String,

    /// Target unlock latency in milliseconds used to calibrate PBKDF2.
    #[serde(default = "default_target_unlock_ms")]
    pub target_unlock_ms: u32,

    /// Iterations used for the calibration benchmark.
    #[serde(default = "default_benchmark_iterations")]
    pub benchmark_iterations: u32,

    /// Lower bound for the calibrated iteration count.
    #[serde(default = "default_min_iterations")]
    pub min_iterations: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_path() -> String {
    "vault.qvault".to_string()
}

fn default_target_unlock_ms() -> u32 {
    50
}

fn default_benchmark_iterations() -> u32 {
    1_000
}

fn default_min_iterations() -> u32 {
    100
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            target_unlock_ms: default_target_unlock_ms(),
            benchmark_iterations: default_benchmark_iterations(),
            min_iterations: default_min_iterations(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".qvault.toml";

    /// Load settings from `<project_dir>/.qvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If it exists but
    /// cannot be parsed, or the KDF values are unusable, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;
        settings.kdf_params().validate()?;

        Ok(settings)
    }

    /// Resolve the default vault file against the project directory.
    ///
    /// Absolute `vault_path` values are returned unchanged.
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_path)
    }

    /// Convert the calibration settings into crypto-layer params.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            target_ms: self.target_unlock_ms,
            benchmark_iterations: self.benchmark_iterations,
            min_iterations: self.min_iterations,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_path, "vault.qvault");
        assert_eq!(s.kdf_params(), KdfParams::default());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.target_unlock_ms, 50);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_path = "secrets/app.qvault"
target_unlock_ms = 200
benchmark_iterations = 5000
min_iterations = 10000
"#;
        fs::write(tmp.path().join(".qvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_path, "secrets/app.qvault");
        assert_eq!(settings.target_unlock_ms, 200);
        assert_eq!(settings.benchmark_iterations, 5_000);
        assert_eq!(settings.min_iterations, 10_000);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".qvault.toml"), "target_unlock_ms = 10\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.target_unlock_ms, 10);
        assert_eq!(settings.vault_path, "vault.qvault");
        assert_eq!(settings.min_iterations, 100);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".qvault.toml"), "not valid {{toml").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_errors_on_zero_kdf_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".qvault.toml"), "min_iterations = 0\n").unwrap();

        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn vault_path_is_relative_to_project() {
        let s = Settings::default();
        let project = Path::new("/home/user/myproject");
        assert_eq!(
            s.vault_path(project),
            PathBuf::from("/home/user/myproject/vault.qvault")
        );
    }
}
