//! The host-facing entry point (`spec.md` §6): tokenizes, parses, and evaluates one program against an already-registered [`Environment`].
//!
//! This is the sole place the tokenize → parse → evaluate pipeline is assembled; `src/cli/commands/run.rs` and `src/cli/commands/repl.rs` both call
//! through here rather than each reimplementing it.
//!
//! Spec.md's entry point takes the environment's raw I/O handles and its registrars in one call, building a fresh environment internally on every
//! call. That shape fits a host that runs exactly one program per call — the `run` subcommand does exactly that. A REPL session, though, must keep
//! one environment alive across many separate top-level inputs so that declarations on one line are visible to the next; rebuilding the environment
//! inside every call would lose that state. [`new_environment`] and [`interpret`] below split the spec's single call into those two concerns: build
//! the environment and run its registrars once, then call [`interpret`] once per program (a whole file, or a single REPL line) against it. Running
//! the registrars again on a later call would simply reinstall the same native bindings, so this is a strict generalization of the one-shot case,
//! not a different contract.

use std::io::{BufRead, Write};

use crate::{evaluator, lexer, parser, runtime::Environment};

/// A function that installs native functions and/or methods into a fresh [`Environment`] before evaluation begins. `stdlib::register_core_library`
/// is the canonical one; a host extends the language by appending more to the slice passed to [`new_environment`], never by touching the evaluator.
pub type Registrar = fn(&mut Environment);

/// Builds a fresh [`Environment`] over the given I/O handles and runs every registrar over it, in order.
pub fn new_environment<'io>(
	out: &'io mut dyn Write,
	err: &'io mut dyn Write,
	input: &'io mut dyn BufRead,
	registrars: &[Registrar],
) -> Environment<'io> {
	let mut environment = Environment::new(out, err, input);
	for registrar in registrars {
		registrar(&mut environment);
	}
	environment
}

/// Tokenizes, parses, and evaluates `source` as one complete program against `environment`.
///
/// # Errors
/// Returns the first [`crate::diagnostic::Diagnostic`] raised by lexing, parsing, or evaluation.
pub fn interpret(environment: &mut Environment, source: &str) -> anyhow::Result<()> {
	let mut tokens = lexer::tokenize(source)?;
	let program = parser::parse(&mut tokens)?;
	evaluator::execute_block(environment, &program.statements)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stdlib::register_core_library;

	#[test]
	fn interpret_runs_registrars_once_and_evaluates_against_the_given_environment() {
		let mut output = Vec::new();
		let mut diagnostic = Vec::new();
		let mut input = std::io::empty();
		let mut environment = new_environment(&mut output, &mut diagnostic, &mut input, &[register_core_library]);

		interpret(&mut environment, "x := 1").unwrap();
		interpret(&mut environment, "noot!(x + 1)").unwrap();

		assert_eq!(String::from_utf8(output).unwrap(), "2\n");
	}

	#[test]
	fn interpret_propagates_the_first_diagnostic() {
		let mut output = Vec::new();
		let mut diagnostic = Vec::new();
		let mut input = std::io::empty();
		let mut environment = new_environment(&mut output, &mut diagnostic, &mut input, &[register_core_library]);

		assert!(interpret(&mut environment, "noot!(undefined_variable)").is_err());
	}
}
