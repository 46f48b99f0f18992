//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::Container;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Human-readable payload: the text itself, or a byte count for binary data.
pub fn payload(container: &Container) -> String {
    match container.text() {
        Some(text) => text.to_string(),
        None => format!("<{} bytes of binary data>", container.data().len()),
    }
}

/// Print a table of containers (ID, Name, Size).
pub fn print_containers_table(containers: &[&Container]) {
    if containers.is_empty() {
        info("No containers in this vault yet.");
        tip("Run `securebox create --name <NAME> --text <TEXT>` to add your first one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Name", "Size"]);

    for c in containers {
        table.add_row(vec![
            c.id().to_string(),
            c.name().to_string(),
            format!("{} B", c.data().len()),
        ]);
    }

    println!("{table}");
}

/// Print one container's name and payload.
pub fn print_container(container: &Container) {
    println!("{} {}", style(container.id()).dim(), style(container.name()).bold());
    println!("{}", payload(container));
}
