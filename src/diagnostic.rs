//! Diagnostics produced by any stage of interpretation.
//!
//! Noot doesn't pull in a structured logging crate; like its teacher, its "logging" is category-tagged, human-readable diagnostics that propagate through
//! `anyhow::Result` and get printed with `colored` at the host boundary (see `cli::commands`).

/// The four diagnostic categories a Noot program can fail with. `Semantic` covers both binding errors (undeclared variable, redeclaration) and type errors
/// (operator applied to incompatible operands); the source text already distinguishes them in its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
	/// No pattern matched at the lexer's cursor.
	Lex,
	/// Missing delimiter, unexpected token, malformed literal or expression.
	Parse,
	/// Undeclared binding, bad operand types, division by zero, and other failures discovered while walking the AST.
	Runtime,
	/// A failure in the host/CLI layer itself rather than in the interpreted program (I/O failure from a native function, for example).
	Interpreter,
}

impl std::fmt::Display for Category {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let label = match self {
			Self::Lex => "LEX",
			Self::Parse => "PARSE",
			Self::Runtime => "RUNTIME",
			Self::Interpreter => "INTERPRETER",
		};
		write!(f, "{label}")
	}
}

/// A single diagnostic: a category, a message, and the source line it occurred on, if known.
#[derive(Debug, Clone)]
pub struct Diagnostic {
	pub category: Category,
	pub message: String,
	pub line: Option<usize>,
}

impl Diagnostic {
	#[must_use]
	pub fn lex(message: impl Into<String>, line: Option<usize>) -> Self {
		Self { category: Category::Lex, message: message.into(), line }
	}

	#[must_use]
	pub fn parse(message: impl Into<String>, line: Option<usize>) -> Self {
		Self { category: Category::Parse, message: message.into(), line }
	}

	#[must_use]
	pub fn runtime(message: impl Into<String>) -> Self {
		Self { category: Category::Runtime, message: message.into(), line: None }
	}

	#[must_use]
	pub fn interpreter(message: impl Into<String>) -> Self {
		Self { category: Category::Interpreter, message: message.into(), line: None }
	}
}

impl std::fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.line {
			Some(line) => write!(f, "{}: {} (line {line})", self.category, self.message),
			None => write!(f, "{}: {}", self.category, self.message),
		}
	}
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn displays_category_label_and_line() {
		let diagnostic = Diagnostic::parse("unexpected token", Some(4));
		assert_eq!(diagnostic.to_string(), "PARSE: unexpected token (line 4)");
	}

	#[test]
	fn displays_without_line_when_absent() {
		let diagnostic = Diagnostic::runtime("division by zero");
		assert_eq!(diagnostic.to_string(), "RUNTIME: division by zero");
	}
}
