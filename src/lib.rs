//! # Noot
//!
//! A small, dynamically-typed scripting language with a tree-walking interpreter.
//!
//! Noot programs are plain text: variables via `:=`, `def` for functions, `if`/`elsif`/`else` and `while` for control flow, and a handful of core-library
//! functions and methods (`noot!`, `string.concat`, `sequence.len`, ...) registered before evaluation begins.
//!
//! [`interpreter::interpret`] is the embeddable entry point: build an [`runtime::Environment`] with [`interpreter::new_environment`] (passing whichever
//! registrars the host wants — [`stdlib::register_core_library`] plus any extensions) and call [`interpreter::interpret`] against it once per program.
//! `src/main.rs` is a thin binary built on top of this crate; it adds nothing the library doesn't already expose.

/// Diagnostics produced by any stage of interpretation, tagged by category (`LEX`, `PARSE`, `RUNTIME`, `INTERPRETER`).
pub mod diagnostic;

/// The lexer module, which tokenizes source code into a stream of tokens.
pub mod lexer;

/// The parser module, which parses a stream of tokens into an abstract syntax tree.
pub mod parser;

/// The runtime module, which holds scoped variable bindings, function bindings, method tables, and the I/O handles native functions use.
pub mod runtime;

/// The evaluator module, which walks the abstract syntax tree against a runtime environment.
pub mod evaluator;

/// The core library: the native functions and methods registered into a fresh environment before evaluation.
pub mod stdlib;

/// The host-facing entry point: build an environment, run registrars over it, interpret source text against it.
pub mod interpreter;

/// The CLI module, which handles subcommands (`run`, `repl`) and diagnostic presentation.
pub mod cli;

pub use interpreter::{interpret, new_environment, Registrar};
