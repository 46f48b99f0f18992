//! `securebox list`: display all containers in a table.

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let session = Session::login(cli)?;
    let containers = session.vault.list();

    output::info(&format!(
        "{} — {} container(s)",
        session.path.display(),
        containers.len()
    ));

    output::print_containers_table(&containers);

    Ok(())
}
