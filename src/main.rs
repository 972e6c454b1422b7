//! Thin binary wrapper around the `noot` library crate: parses CLI arguments and dispatches to a subcommand.

// Most of this package's dependencies (`phf`, `strum`, `regex-macro`, `convert_case`, `enum_dispatch`, ...) are used inside `noot::lib`'s module tree,
// not directly from this translation unit, so this binary target alone would otherwise trip the crate-wide `unused_crate_dependencies` lint.
#![allow(unused_crate_dependencies)]

use clap::Parser as _;
use noot::cli::commands::{NootCommand as _, SubCommand};

/// The command-line arguments for the interpreter.
#[derive(clap::Parser)]
pub struct NootArguments {
	/// The command to run, `run` or `repl`.
	#[command(subcommand)]
	pub command: SubCommand,
}

/// The main entry point. Parses the arguments passed at the command line and runs the given subcommand.
fn main() -> anyhow::Result<()> {
	NootArguments::parse().command.execute()
}
