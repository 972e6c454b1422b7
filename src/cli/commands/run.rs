use std::io::{stdin, stdout, BufReader};

use crate::{
	cli::{print_diagnostic, start},
	interpreter::{interpret, new_environment},
	stdlib::register_core_library,
};

use super::NootCommand;

/// Runs a Noot source file to completion.
#[derive(clap::Parser)]
pub struct RunCommand {
	/// The path to the `.noot` source file to run.
	pub filename: String,

	/// Suppresses the startup banner.
	#[arg(short, long)]
	pub quiet: bool,
}

impl NootCommand for RunCommand {
	fn execute(self) -> anyhow::Result<()> {
		start("Running", self.quiet);

		let source = std::fs::read_to_string(&self.filename)?;

		let mut input = BufReader::new(stdin());
		let mut output = stdout();
		let mut diagnostic = std::io::stderr();
		let mut environment = new_environment(&mut output, &mut diagnostic, &mut input, &[register_core_library]);

		if let Err(error) = interpret(&mut environment, &source) {
			print_diagnostic(&error);
			std::process::exit(1);
		}

		Ok(())
	}
}
