//! `securebox create`: add a new container.

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::{Result, SecureBoxError};

/// Execute the `create` command.
pub fn execute(cli: &Cli, name: &str, text: Option<&str>) -> Result<()> {
    let text = match text {
        Some(t) => t.to_string(),
        None => dialoguer::Input::<String>::new()
            .with_prompt("Text")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| SecureBoxError::CommandFailed(format!("text prompt: {e}")))?,
    };

    let mut session = Session::login(cli)?;
    let (id, name) = {
        let container = session.vault.add(name, text);
        (container.id(), container.name().to_string())
    };
    session.commit()?;

    output::success(&format!("Created container {id} '{name}'"));
    Ok(())
}
