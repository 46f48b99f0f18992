//! `securebox paths`: show where config and vault live.

use crate::cli::{config_dir, load_settings, vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `paths` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;

    match config_dir(cli) {
        Ok(dir) => println!("config: {}", dir.join(Settings::FILE_NAME).display()),
        Err(_) => println!("config: (none)"),
    }
    println!("vault:  {}", vault_path(cli, &settings).display());
    Ok(())
}
