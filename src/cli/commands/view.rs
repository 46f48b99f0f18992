//! `securebox view`: decrypt and print a single container.
//!
//! Goes through `Vault::fetch_one`, so only that container's own MAC is
//! checked.  `securebox verify` checks the whole vault.

use crate::cli::output;
use crate::cli::{load_settings, prompt_password_for_vault, vault_id, vault_path, Cli};
use crate::errors::{Result, SecureBoxError};
use crate::vault::{ContainerId, Vault};

/// Execute the `view` command.
pub fn execute(cli: &Cli, id: ContainerId) -> Result<()> {
    let settings = load_settings(cli)?;
    let path = vault_path(cli, &settings);
    if !path.exists() {
        return Err(SecureBoxError::VaultNotFound(path));
    }

    let password = prompt_password_for_vault(Some(&vault_id(&path)))?;
    let container = Vault::fetch_one_from_file(id, &password, &path)?;

    output::print_container(&container);
    Ok(())
}
