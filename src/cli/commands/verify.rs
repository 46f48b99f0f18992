//! `securebox verify`: full integrity check of the vault file.

use crate::cli::output;
use crate::cli::{load_settings, prompt_password_for_vault, vault_id, vault_path, Cli};
use crate::errors::{Result, SecureBoxError};
use crate::vault::Vault;

/// Execute the `verify` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let path = vault_path(cli, &settings);
    if !path.exists() {
        return Err(SecureBoxError::VaultNotFound(path));
    }

    let password = prompt_password_for_vault(Some(&vault_id(&path)))?;
    let vault = Vault::open_file(&path, &password)?;

    output::success(&format!(
        "Vault verified: {} container(s), all MACs valid",
        vault.len()
    ));
    Ok(())
}
