use std::io::{stdin, stdout, BufRead as _, BufReader, Write as _};

use colored::Colorize as _;

use crate::{
	cli::{print_diagnostic, start},
	interpreter::{interpret, new_environment},
	stdlib::register_core_library,
};

use super::NootCommand;

/// Starts an interactive read-eval-print loop: one environment persists for the whole session, and a diagnostic on one line is printed and swallowed so
/// the next line can still be tried, per the host's freedom to "catch the returned diagnostic and continue with the next top-level input".
#[derive(clap::Parser)]
pub struct ReplCommand {
	/// Suppresses the startup banner.
	#[arg(short, long)]
	pub quiet: bool,
}

impl NootCommand for ReplCommand {
	fn execute(self) -> anyhow::Result<()> {
		start("Starting", self.quiet);

		let mut input = BufReader::new(stdin());
		let mut output = stdout();
		let mut diagnostic = std::io::stderr();
		let mut environment = new_environment(&mut output, &mut diagnostic, &mut input, &[register_core_library]);

		let mut line = String::new();
		loop {
			print!("{} ", ">".bold().cyan());
			std::io::stdout().flush()?;

			line.clear();
			if environment.input.read_line(&mut line)? == 0 {
				break;
			}

			if let Err(error) = interpret(&mut environment, &line) {
				print_diagnostic(&error);
			}
		}

		Ok(())
	}
}
