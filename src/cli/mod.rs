//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::{settings, Settings};
use crate::errors::{Result, SecureBoxError};
use crate::vault::{ContainerId, Vault};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Interactive password attempts before `login` gives up.
const LOGIN_ATTEMPTS: u32 = 3;

/// Environment variable holding the master password (CI / scripting).
pub const PASSWORD_ENV: &str = "SECUREBOX_PASSWORD";

/// Environment variable holding the new password for `change-password`.
pub const NEW_PASSWORD_ENV: &str = "SECUREBOX_NEW_PASSWORD";

/// SecureBox CLI: password-protected local secrets vault.
#[derive(Parser)]
#[command(
    name = "securebox",
    about = "Password-protected local secrets vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: <save_folder>/<save_file> from the config)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Directory holding securebox.toml
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Add a new container
    Create {
        /// Container name (default: "Container <id>")
        #[arg(short, long, default_value = "")]
        name: String,
        /// Container text (omit for interactive prompt)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Show one container (checks only that container's MAC)
    View {
        /// Container id
        #[arg(allow_negative_numbers = true)]
        id: ContainerId,
    },

    /// List all containers
    List,

    /// Change a container's name and/or text
    Edit {
        /// Container id
        id: ContainerId,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New text
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Delete a container
    Delete {
        /// Container id
        id: ContainerId,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Verify the whole vault (every container MAC and the vault MAC)
    Verify,

    /// Change the master password (regenerates all key material)
    ChangePassword,

    /// Re-encrypt everything under fresh salts and IVs
    RegenerateKeys,

    /// Store backup credentials from a JSON file
    SetCredentials {
        /// JSON file, e.g. {"kind": "directory", "path": "/mnt/backup"}
        file: PathBuf,
    },

    /// Forget the stored backup session token
    SignOut,

    /// Upload a backup of the vault file
    Upload,

    /// Replace the vault file with its backup
    Download,

    /// Show the config and vault file locations
    Paths,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Save the vault password to the OS keyring (auto-unlock)
    Keyring {
        /// Remove password from keyring instead of saving
        #[arg(long)]
        delete: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault password, trying in order:
/// 1. `SECUREBOX_PASSWORD` env var (CI/CD)
/// 2. OS keyring (if compiled with `keyring-store` feature)
/// 3. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password_for_vault(vault_id: Option<&str>) -> Result<Zeroizing<String>> {
    match stored_password(vault_id) {
        Some(pw) => Ok(pw),
        None => prompt_password(),
    }
}

/// The master password from the environment or the OS keyring, if either
/// holds one.
fn stored_password(vault_id: Option<&str>) -> Option<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Some(Zeroizing::new(pw));
        }
    }

    #[cfg(feature = "keyring-store")]
    if let Some(id) = vault_id {
        match crate::keyring::get_password(id) {
            Ok(Some(pw)) => return Some(Zeroizing::new(pw)),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "keyring unavailable"),
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    let _ = vault_id;

    None
}

/// Ask for the master password on the terminal.
fn prompt_password() -> Result<Zeroizing<String>> {
    let pw = dialoguer::Password::new()
        .with_prompt("Enter master password")
        .interact()
        .map_err(|e| SecureBoxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Call `open` with passwords from `next_password` until it succeeds.
///
/// Only integrity failures are retried, at most `attempts` tries in total.
fn unlock_with_retries<T>(
    attempts: u32,
    mut next_password: impl FnMut() -> Result<Zeroizing<String>>,
    mut open: impl FnMut(&str) -> Result<T>,
) -> Result<T> {
    let mut attempt = 1;
    loop {
        let password = next_password()?;
        match open(&password) {
            Err(e) if e.is_integrity_failure() && attempt < attempts => {
                output::warning("Wrong password or damaged vault. Try again.");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Prompt for a new password with confirmation.
///
/// `env_var` is checked first for scripted/CI usage.
/// Enforces a minimum password length.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSWORD_LEN {
                return Err(SecureBoxError::CommandFailed(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose master password")
            .with_confirmation(
                "Confirm master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| SecureBoxError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Directory holding `securebox.toml` for this invocation.
pub fn config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => settings::config_dir(),
    }
}

/// Load settings, falling back to defaults when no config dir exists.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    match config_dir(cli) {
        Ok(dir) => Settings::load(&dir),
        Err(_) => Ok(Settings::default()),
    }
}

/// Path of the vault file: `--vault`, else the configured save location.
pub fn vault_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.vault.clone().unwrap_or_else(|| settings.vault_path())
}

/// Keyring / display identifier for a vault path.
pub fn vault_id(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Write `contents` to `path` **atomically**.
///
/// The temp file is in the same directory so the rename stays on one
/// filesystem and readers never see a half-written vault.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| {
            SecureBoxError::CommandFailed(format!("'{}' is not a file path", path.display()))
        })?
        .to_string_lossy();
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// An unlocked vault together with where it lives and how it is configured.
pub struct Session {
    pub vault: Vault,
    pub path: PathBuf,
    pub settings: Settings,
}

impl Session {
    /// Open the configured vault, creating and saving a new one if the
    /// vault file does not exist yet.
    pub fn login(cli: &Cli) -> Result<Self> {
        let settings = load_settings(cli)?;
        let path = vault_path(cli, &settings);

        if !path.exists() {
            output::info(&format!("No vault at {}, creating one.", path.display()));
            let password = prompt_new_password(PASSWORD_ENV)?;
            let vault = Vault::with_iterations(&password, settings.pbkdf2_iterations)?;
            let mut session = Self {
                vault,
                path,
                settings,
            };
            session.save()?;
            output::success(&format!("Vault created at {}", session.path.display()));
            return Ok(session);
        }

        let mut vault = match stored_password(Some(&vault_id(&path))) {
            Some(password) => Vault::open_file(&path, &password)?,
            None => unlock_with_retries(LOGIN_ATTEMPTS, prompt_password, |password| {
                Vault::open_file(&path, password)
            })?,
        };
        vault.set_iterations(settings.pbkdf2_iterations)?;

        Ok(Self {
            vault,
            path,
            settings,
        })
    }

    /// Encrypt and write the vault.
    pub fn save(&mut self) -> Result<()> {
        let json = self.vault.to_json()?;
        write_atomic(&self.path, &json)
    }

    /// Save, then upload a backup when `auto_upload` is enabled.
    ///
    /// A failed upload only prints a warning.
    pub fn commit(&mut self) -> Result<()> {
        self.save()?;
        if self.settings.auto_upload && !self.vault.upload_backup(&self.path) {
            output::warning("Automatic backup upload failed.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_id_for_view() {
        let cli = Cli::try_parse_from(["securebox", "view", "-1"]).unwrap();
        assert!(matches!(cli.command, Commands::View { id: -1 }));
    }

    #[test]
    fn vault_flag_overrides_settings() {
        let cli = Cli::try_parse_from(["securebox", "--vault", "/tmp/x.json", "list"]).unwrap();
        let path = vault_path(&cli, &Settings::default());
        assert_eq!(path, PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn unlock_retries_wrong_passwords() {
        let mut typed = vec!["third", "second", "first"];
        let mut tried = Vec::new();
        let unlocked = unlock_with_retries(
            LOGIN_ATTEMPTS,
            || Ok(Zeroizing::new(typed.pop().unwrap().to_string())),
            |pw| {
                tried.push(pw.to_string());
                if pw == "second" {
                    Ok(42)
                } else {
                    Err(SecureBoxError::VaultIntegrity)
                }
            },
        )
        .unwrap();

        assert_eq!(unlocked, 42);
        assert_eq!(tried, ["first", "second"]);
    }

    #[test]
    fn unlock_gives_up_after_the_last_attempt() {
        let mut calls = 0;
        let err = unlock_with_retries(
            LOGIN_ATTEMPTS,
            || Ok(Zeroizing::new("wrong".to_string())),
            |_| -> Result<()> {
                calls += 1;
                Err(SecureBoxError::VaultIntegrity)
            },
        )
        .unwrap_err();

        assert!(matches!(err, SecureBoxError::VaultIntegrity));
        assert_eq!(calls, LOGIN_ATTEMPTS);
    }

    #[test]
    fn unlock_does_not_retry_other_errors() {
        let mut calls = 0;
        let err = unlock_with_retries(
            LOGIN_ATTEMPTS,
            || Ok(Zeroizing::new("pw".to_string())),
            |_| -> Result<()> {
                calls += 1;
                Err(SecureBoxError::Format("bad json".into()))
            },
        )
        .unwrap_err();

        assert!(matches!(err, SecureBoxError::Format(_)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn write_atomic_replaces_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("vault.json");
        write_atomic(&path, "one").unwrap();
        write_atomic(&path, "two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!tmp.path().join("nested").join(".vault.json.tmp").exists());
    }
}
