/// The commands module, which handles the interpreter's subcommands, `run` and `repl`.
pub mod commands;

use colored::Colorize as _;

use crate::diagnostic::Diagnostic;

/// Prints the startup banner for a subcommand, honoring `--quiet`. Grounded on the teacher's `cli::commands::start`, stripped of the project-name lookup
/// this dialect has no equivalent of (there's no project manifest).
pub fn start(action: &str, quiet: bool) {
	if !quiet {
		println!("{} {}...", action.bold().green(), "noot".bold());
	}
}

/// Prints a diagnostic to stderr, colored by category.
pub fn print_diagnostic(error: &anyhow::Error) {
	let rendered = match error.downcast_ref::<Diagnostic>() {
		Some(diagnostic) => diagnostic.to_string(),
		None => error.to_string(),
	};
	eprintln!("{}", rendered.red().bold());
}
