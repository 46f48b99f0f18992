use clap::Parser;
use securebox::cli::commands;
use securebox::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter (e.g. `debug`).
const LOG_ENV: &str = "SECUREBOX_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Create { ref name, ref text } => {
            commands::create::execute(&cli, name, text.as_deref())
        }
        Commands::View { id } => commands::view::execute(&cli, id),
        Commands::List => commands::list::execute(&cli),
        Commands::Edit {
            id,
            ref name,
            ref text,
        } => commands::edit::execute(&cli, id, name.as_deref(), text.as_deref()),
        Commands::Delete { id, force } => commands::delete::execute(&cli, id, force),
        Commands::Verify => commands::verify::execute(&cli),
        Commands::ChangePassword => commands::password::execute_change(&cli),
        Commands::RegenerateKeys => commands::password::execute_regenerate(&cli),
        Commands::SetCredentials { ref file } => {
            commands::cloud::execute_set_credentials(&cli, file)
        }
        Commands::SignOut => commands::cloud::execute_sign_out(&cli),
        Commands::Upload => commands::cloud::execute_upload(&cli),
        Commands::Download => commands::cloud::execute_download(&cli),
        Commands::Paths => commands::paths::execute(&cli),
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Keyring { delete } => commands::keyring::execute(&cli, delete),
    };

    if let Err(e) = result {
        securebox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
