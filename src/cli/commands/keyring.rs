//! `securebox keyring`: save or remove the master password in the OS keyring.
//!
//! When the keyring feature is not compiled in, the command returns a
//! helpful error message.

use crate::cli::Cli;
use crate::errors::Result;

/// Execute `securebox keyring [--delete]`.
pub fn execute(cli: &Cli, delete: bool) -> Result<()> {
    #[cfg(feature = "keyring-store")]
    {
        use crate::cli::output;

        let settings = crate::cli::load_settings(cli)?;
        let path = crate::cli::vault_path(cli, &settings);
        let id = crate::cli::vault_id(&path);

        if delete {
            crate::keyring::delete_password(&id)?;
            output::success("Password removed from OS keyring.");
        } else {
            // Verify the password opens the vault before storing it.
            let password = crate::cli::prompt_password_for_vault(None)?;
            crate::vault::Vault::open_file(&path, &password)?;

            crate::keyring::store_password(&id, &password)?;
            output::success("Password saved to OS keyring. Future opens will be automatic.");
        }

        Ok(())
    }

    #[cfg(not(feature = "keyring-store"))]
    {
        let _ = (cli, delete);
        Err(crate::errors::SecureBoxError::KeyringError(
            "keyring support not compiled — rebuild with `cargo build --features keyring-store`"
                .into(),
        ))
    }
}
