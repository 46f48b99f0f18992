use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{validate_iterations, DEFAULT_ITERATIONS};
use crate::errors::{Result, SecureBoxError};

/// User-level configuration, loaded from `<config_dir>/securebox.toml`.
///
/// Every field has a sensible default so SecureBox works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the vault file.
    #[serde(default = "default_save_folder")]
    pub save_folder: PathBuf,

    /// File name of the vault inside `save_folder`.
    #[serde(default = "default_save_file")]
    pub save_file: String,

    /// Upload a backup after every command that changes the vault.
    #[serde(default)]
    pub auto_upload: bool,

    /// PBKDF2 rounds for newly generated key material (default: 500 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_save_folder() -> PathBuf {
    data_dir_from(|key| std::env::var(key).ok()).unwrap_or_else(|| PathBuf::from("."))
}

fn default_save_file() -> String {
    "securebox.json".to_string()
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

// ── Directory resolution ─────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn config_dir_from(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(dir) = non_empty(env("SECUREBOX_CONFIG_DIR")) {
        return Some(dir);
    }
    if let Some(xdg) = non_empty(env("XDG_CONFIG_HOME")) {
        return Some(xdg.join("securebox"));
    }
    non_empty(env("HOME")).map(|home| home.join(".config").join("securebox"))
}

fn data_dir_from(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(xdg) = non_empty(env("XDG_DATA_HOME")) {
        return Some(xdg.join("securebox"));
    }
    non_empty(env("HOME")).map(|home| home.join(".local").join("share").join("securebox"))
}

/// Directory searched for `securebox.toml`.
///
/// `$SECUREBOX_CONFIG_DIR`, else `$XDG_CONFIG_HOME/securebox`, else
/// `$HOME/.config/securebox`.
pub fn config_dir() -> Result<PathBuf> {
    config_dir_from(|key| std::env::var(key).ok()).ok_or_else(|| {
        SecureBoxError::ConfigError(
            "cannot locate a config directory — set SECUREBOX_CONFIG_DIR or HOME".into(),
        )
    })
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_folder: default_save_folder(),
            save_file: default_save_file(),
            auto_upload: false,
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config directory.
    pub const FILE_NAME: &'static str = "securebox.toml";

    /// Load settings from `<config_dir>/securebox.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            SecureBoxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        validate_iterations(settings.pbkdf2_iterations).map_err(|e| {
            SecureBoxError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path of the vault file.
    ///
    /// Example: `~/.local/share/securebox/securebox.json`
    pub fn vault_path(&self) -> PathBuf {
        self.save_folder.join(&self.save_file)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.save_file, "securebox.json");
        assert!(!s.auto_upload);
        assert_eq!(s.pbkdf2_iterations, 500_000);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
save_folder = "/srv/vaults"
save_file = "team.json"
auto_upload = true
pbkdf2_iterations = 200000
"#;
        fs::write(tmp.path().join("securebox.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.save_folder, PathBuf::from("/srv/vaults"));
        assert_eq!(settings.save_file, "team.json");
        assert!(settings.auto_upload);
        assert_eq!(settings.pbkdf2_iterations, 200_000);
        assert_eq!(settings.vault_path(), PathBuf::from("/srv/vaults/team.json"));
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("securebox.toml"), "auto_upload = true\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert!(settings.auto_upload);
        assert_eq!(settings.save_file, "securebox.json");
        assert_eq!(settings.pbkdf2_iterations, 500_000);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("securebox.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(SecureBoxError::ConfigError(_))));
    }

    #[test]
    fn load_rejects_weak_iterations() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("securebox.toml"), "pbkdf2_iterations = 10\n").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(SecureBoxError::ConfigError(_))));
    }

    #[test]
    fn load_rejects_excessive_iterations() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("securebox.toml"), "pbkdf2_iterations = 4000000000\n").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(SecureBoxError::ConfigError(_))));
    }

    #[test]
    fn config_dir_precedence() {
        let all = env(&[
            ("SECUREBOX_CONFIG_DIR", "/explicit"),
            ("XDG_CONFIG_HOME", "/xdg"),
            ("HOME", "/home/u"),
        ]);
        assert_eq!(config_dir_from(all), Some(PathBuf::from("/explicit")));

        let xdg = env(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]);
        assert_eq!(config_dir_from(xdg), Some(PathBuf::from("/xdg/securebox")));

        let home = env(&[("XDG_CONFIG_HOME", ""), ("HOME", "/home/u")]);
        assert_eq!(
            config_dir_from(home),
            Some(PathBuf::from("/home/u/.config/securebox"))
        );

        assert_eq!(config_dir_from(env(&[])), None);
    }

    #[test]
    fn data_dir_precedence() {
        let xdg = env(&[("XDG_DATA_HOME", "/data"), ("HOME", "/home/u")]);
        assert_eq!(data_dir_from(xdg), Some(PathBuf::from("/data/securebox")));

        let home = env(&[("HOME", "/home/u")]);
        assert_eq!(
            data_dir_from(home),
            Some(PathBuf::from("/home/u/.local/share/securebox"))
        );
    }
}
