//! `securebox delete`: remove a container from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::{Result, SecureBoxError};
use crate::vault::ContainerId;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, id: ContainerId, force: bool) -> Result<()> {
    let mut session = Session::login(cli)?;
    let name = session.vault.get(id)?.name().to_string();

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete container {id} '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| SecureBoxError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    session.vault.remove(id)?;
    session.commit()?;

    output::success(&format!("Deleted container {id} '{name}'"));
    Ok(())
}
