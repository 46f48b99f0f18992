//! `securebox change-password` and `securebox regenerate-keys`.
//!
//! Both give the vault and every container fresh salts and IVs, so the
//! next save re-encrypts everything and no old ciphertext is reused.

use crate::cli::output;
use crate::cli::{prompt_new_password, Cli, Session, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `change-password` command.
pub fn execute_change(cli: &Cli) -> Result<()> {
    // 1. Open the vault with the current password.
    output::info("Enter your current master password.");
    let mut session = Session::login(cli)?;

    // 2. Prompt for the new password.
    output::info("Choose your new master password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;

    // 3. Swap the password, regenerate key material, save.
    session.vault.set_master_password(&new_password);
    session.commit()?;

    #[cfg(feature = "keyring-store")]
    {
        let id = crate::cli::vault_id(&session.path);
        if let Ok(Some(_)) = crate::keyring::get_password(&id) {
            crate::keyring::store_password(&id, &new_password)?;
            output::info("Updated the password stored in the OS keyring.");
        }
    }

    output::success(&format!(
        "Master password changed ({} container(s) re-encrypted)",
        session.vault.len()
    ));
    Ok(())
}

/// Execute the `regenerate-keys` command.
pub fn execute_regenerate(cli: &Cli) -> Result<()> {
    let mut session = Session::login(cli)?;
    session.vault.regenerate_keys();
    session.commit()?;

    output::success(&format!(
        "Key material regenerated ({} container(s) re-encrypted)",
        session.vault.len()
    ));
    Ok(())
}
