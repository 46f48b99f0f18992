//! Backup commands: `set-credentials`, `sign-out`, `upload`, `download`.
//!
//! Credentials and the session token live in the vault's reserved
//! containers, so they are encrypted like everything else and travel
//! with the backup.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::output;
use crate::cli::{load_settings, prompt_password_for_vault, vault_id, vault_path, Cli, Session};
use crate::cloud::BackupCredentials;
use crate::errors::{Result, SecureBoxError};
use crate::vault::{Vault, CREDENTIALS_ID, TOKEN_ID};

/// Execute the `set-credentials` command.
pub fn execute_set_credentials(cli: &Cli, file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)?;
    let credentials = BackupCredentials::parse(text.as_bytes())?.ok_or_else(|| {
        SecureBoxError::Cloud(format!("{} contains no credentials", file.display()))
    })?;

    let mut session = Session::login(cli)?;
    // A token issued for the previous backend is useless for the new one.
    session.vault.set_cloud_credentials(Some(text.trim()), Some(""));
    session.commit()?;

    let kind = match credentials {
        BackupCredentials::Directory { .. } => "directory",
        BackupCredentials::Http { .. } => "http",
    };
    output::success(&format!("Stored {kind} backup credentials"));
    Ok(())
}

/// Execute the `sign-out` command.
pub fn execute_sign_out(cli: &Cli) -> Result<()> {
    let mut session = Session::login(cli)?;
    session.vault.set_cloud_credentials(None, Some(""));
    session.save()?;

    output::success("Signed out of the backup service");
    Ok(())
}

/// Execute the `upload` command.
pub fn execute_upload(cli: &Cli) -> Result<()> {
    let mut session = Session::login(cli)?;
    if !session.vault.upload_backup(&session.path) {
        return Err(SecureBoxError::Cloud(
            "upload failed — check the stored credentials with `securebox set-credentials`".into(),
        ));
    }
    // Connecting may have refreshed the session token.
    session.save()?;

    output::success("Backup uploaded");
    Ok(())
}

/// Execute the `download` command.
///
/// The current vault file is moved to `<file>.old` first and put back if
/// the download fails.  When the local vault no longer opens (for example
/// because it is corrupted), the credentials are read from their reserved
/// containers alone, which only requires those containers to verify.
pub fn execute_download(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let path = vault_path(cli, &settings);
    if !path.exists() {
        return Err(SecureBoxError::VaultNotFound(path));
    }

    let password = prompt_password_for_vault(Some(&vault_id(&path)))?;
    let mut vault = match Vault::open_file(&path, &password) {
        Ok(vault) => vault,
        Err(e) => {
            output::warning(&format!("{e}"));
            output::info("Reading backup credentials from the reserved containers only.");
            credentials_only(&path, &password, settings.pbkdf2_iterations)?
        }
    };

    let old = old_path(&path);
    fs::rename(&path, &old)?;

    if !vault.download_backup(&path) {
        fs::rename(&old, &path)?;
        return Err(SecureBoxError::Cloud("download failed — vault left unchanged".into()));
    }

    output::success(&format!(
        "Backup downloaded; previous file kept at {}",
        old.display()
    ));

    if let Err(e) = Vault::open_file(&path, &password) {
        output::warning(&format!("The downloaded vault does not verify: {e}"));
    }
    Ok(())
}

/// A throwaway vault holding only the stored credentials and token.
fn credentials_only(path: &Path, password: &str, iterations: u32) -> Result<Vault> {
    let credentials = Vault::fetch_one_from_file(CREDENTIALS_ID, password, path)?;
    let token = Vault::fetch_one_from_file(TOKEN_ID, password, path).ok();

    let mut vault = Vault::with_iterations(password, iterations)?;
    vault.set_cloud_credentials(
        credentials.text(),
        token.as_ref().and_then(|t| t.text()),
    );
    Ok(vault)
}

fn old_path(path: &Path) -> PathBuf {
    let mut old = path.as_os_str().to_owned();
    old.push(".old");
    PathBuf::from(old)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_path_appends_suffix() {
        assert_eq!(
            old_path(Path::new("/data/securebox.json")),
            PathBuf::from("/data/securebox.json.old")
        );
    }
}
