/// The `expression` module, which parses expressions honoring operator precedence, method chains, and literals.
pub mod expression;
/// The `statement` module, which parses top-level and block-level statement forms.
pub mod statement;

use std::collections::VecDeque;

use crate::{
	diagnostic::Diagnostic,
	lexer::{Token, TokenKind},
};

use statement::Statement;

/// A parsed program: a flat sequence of top-level statements.
#[derive(Debug, Clone)]
pub struct Program {
	pub statements: Vec<Statement>,
}

impl Parse for Program {
	type Output = Self;

	fn parse(tokens: &mut VecDeque<Token>) -> anyhow::Result<Self::Output> {
		Ok(Self { statements: statement::parse_statement_sequence(tokens)? })
	}
}

/// Parses a token stream into a program.
///
/// # Errors
/// Returns a [`Diagnostic::parse`] on the first malformed statement.
pub fn parse(tokens: &mut VecDeque<Token>) -> anyhow::Result<Program> {
	Program::parse(tokens)
}

/// A rule for parsing a token stream into a specific kind of AST node.
pub trait Parse {
	type Output;

	fn parse(tokens: &mut VecDeque<Token>) -> anyhow::Result<Self::Output>;
}

/// Treats a token collection as a queue that can be inspected and consumed while parsing. Implemented directly on `VecDeque<Token>`.
pub trait TokenQueue {
	/// Removes and returns the next token's lexeme if it matches `kind`.
	///
	/// # Errors
	/// Returns a [`Diagnostic::parse`] if the next token (or end-of-input) doesn't match `kind`.
	fn pop(&mut self, kind: TokenKind) -> anyhow::Result<String>;

	/// Returns a reference to the next token without consuming it.
	fn peek(&self) -> Option<&Token>;

	/// Returns a reference to the token `offset` positions ahead without consuming anything. `peek_nth(0)` is equivalent to [`TokenQueue::peek`].
	fn peek_nth(&self, offset: usize) -> Option<&Token>;

	/// Whether the next token matches `kind`.
	fn next_is(&self, kind: TokenKind) -> bool;

	/// Whether the next token matches one of `kinds`.
	fn next_is_one_of(&self, kinds: &[TokenKind]) -> bool {
		self.peek().is_some_and(|token| kinds.contains(&token.kind))
	}

	/// The line the next token starts on, or the line after the last token if the stream is empty.
	fn current_line(&self) -> usize;
}

impl TokenQueue for VecDeque<Token> {
	fn peek(&self) -> Option<&Token> {
		self.front()
	}

	fn peek_nth(&self, offset: usize) -> Option<&Token> {
		self.get(offset)
	}

	fn pop(&mut self, kind: TokenKind) -> anyhow::Result<String> {
		match self.pop_front() {
			Some(token) if token.kind == kind => Ok(token.lexeme),
			Some(token) => Err(Diagnostic::parse(format!("expected {kind} but found {}", token.kind), Some(token.line)).into()),
			None => Err(Diagnostic::parse(format!("expected {kind} but found end of input"), None).into()),
		}
	}

	fn next_is(&self, kind: TokenKind) -> bool {
		self.peek().is_some_and(|token| token.kind == kind)
	}

	fn current_line(&self) -> usize {
		self.peek().map_or(0, |token| token.line)
	}
}

/// Splits a token slice of the form `a, b, c` into one slice per comma-separated item, respecting nested `( ) { } [ ]` depth. Used for argument lists and
/// array literals, which share this exact grammar.
#[must_use]
pub fn split_on_top_level_commas(tokens: &[Token]) -> Vec<Vec<Token>> {
	let mut groups = Vec::new();
	let mut current = Vec::new();
	let mut depth = 0_i32;

	for token in tokens {
		match token.kind {
			TokenKind::LeftParen | TokenKind::LeftBrace | TokenKind::LeftBracket => depth += 1,
			TokenKind::RightParen | TokenKind::RightBrace | TokenKind::RightBracket => depth -= 1,
			TokenKind::Comma if depth == 0 => {
				groups.push(std::mem::take(&mut current));
				continue;
			},
			_ => {},
		}
		current.push(token.clone());
	}

	if !current.is_empty() || !groups.is_empty() {
		groups.push(current);
	}

	groups
}
