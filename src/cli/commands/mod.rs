use repl::ReplCommand;
use run::RunCommand;

pub mod repl;
pub mod run;

#[enum_dispatch::enum_dispatch]
pub trait NootCommand {
	/// Executes this subcommand.
	fn execute(self) -> anyhow::Result<()>;
}

#[derive(clap::Subcommand)]
#[enum_dispatch::enum_dispatch(NootCommand)]
pub enum SubCommand {
	/// Runs a Noot source file.
	Run(RunCommand),
	/// Starts an interactive read-eval-print loop.
	Repl(ReplCommand),
}
