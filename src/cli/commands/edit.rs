//! `securebox edit`: change a container's name and/or text.

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::{Result, SecureBoxError};
use crate::vault::ContainerId;

/// Execute the `edit` command.
pub fn execute(cli: &Cli, id: ContainerId, name: Option<&str>, text: Option<&str>) -> Result<()> {
    if name.is_none() && text.is_none() {
        return Err(SecureBoxError::CommandFailed(
            "nothing to change — pass --name and/or --text".into(),
        ));
    }

    let mut session = Session::login(cli)?;
    // Visible containers only; reserved ones are managed by the cloud commands.
    session.vault.get(id)?;
    session
        .vault
        .update(id, name, text.map(str::as_bytes))?;
    session.commit()?;

    output::success(&format!("Updated container {id}"));
    Ok(())
}
