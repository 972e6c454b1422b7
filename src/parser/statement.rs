use std::collections::VecDeque;

use crate::{
	diagnostic::Diagnostic,
	lexer::{Token, TokenKind},
};

use super::{
	expression::Expression,
	Parse, TokenQueue,
};

/// The operator on a reassignment statement (`x = ...`, `x += ...`, and so on). Declaration (`:=`) is its own statement kind, not a variant here, since it
/// binds a fresh name rather than rewriting an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOperator {
	Assign,
	AddAssign,
	SubtractAssign,
	MultiplyAssign,
	DivideAssign,
}

/// A statement node.
#[derive(Debug, Clone)]
pub enum Statement {
	VariableDeclaration {
		name: String,
		value: Expression,
	},
	VariableAssignment {
		name: String,
		operator: AssignOperator,
		value: Expression,
	},
	IndexAssignment {
		name: String,
		index: Expression,
		value: Expression,
	},
	FunctionDeclaration {
		name: String,
		parameters: Vec<String>,
		body: Vec<Self>,
	},
	Return(Expression),
	If {
		condition: Expression,
		body: Vec<Self>,
		else_branch: Option<Box<Self>>,
	},
	Else {
		body: Vec<Self>,
	},
	While {
		condition: Expression,
		body: Vec<Self>,
	},
	Expression(Expression),
}

/// Parses every statement in `tokens` until the stream is exhausted. Used both for a whole program and, recursively, for a block body that's already been
/// isolated to its own token queue by [`take_balanced_braces`].
///
/// # Errors
/// Returns a [`Diagnostic::parse`] on the first malformed statement.
pub fn parse_statement_sequence(tokens: &mut VecDeque<Token>) -> anyhow::Result<Vec<Statement>> {
	let mut statements = Vec::new();
	skip_statement_separators(tokens);
	while tokens.peek().is_some() {
		statements.push(parse_statement(tokens)?);
		skip_statement_separators(tokens);
	}
	Ok(statements)
}

fn skip_statement_separators(tokens: &mut VecDeque<Token>) {
	while tokens.next_is_one_of(&[TokenKind::Newline, TokenKind::Semicolon]) {
		tokens.pop_front();
	}
}

fn parse_statement(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	match tokens.peek().map(|token| token.kind) {
		Some(TokenKind::KeywordDef) => parse_function_declaration(tokens),
		Some(TokenKind::KeywordReturn) => parse_return(tokens),
		Some(TokenKind::KeywordIf) => parse_if_chain(tokens),
		Some(TokenKind::KeywordWhile) => parse_while_loop(tokens),
		Some(TokenKind::Identifier) => match tokens.peek_nth(1).map(|token| token.kind) {
			Some(TokenKind::Declare) => parse_variable_declaration(tokens),
			Some(TokenKind::Equal | TokenKind::PlusEqual | TokenKind::MinusEqual | TokenKind::StarEqual | TokenKind::SlashEqual) => {
				parse_variable_assignment(tokens)
			},
			Some(TokenKind::LeftBracket) if looks_like_index_assignment(tokens) => parse_index_assignment(tokens),
			_ => parse_expression_statement(tokens),
		},
		_ => parse_expression_statement(tokens),
	}
}

/// Looks ahead, without consuming anything, past a balanced `[ ... ]` starting at offset 1 (right after the leading identifier) to see whether it's
/// immediately followed by `=` — the one thing that distinguishes an index *assignment* statement from an index *read* used inside a larger expression.
fn looks_like_index_assignment(tokens: &VecDeque<Token>) -> bool {
	let mut depth = 0_i32;
	let mut offset = 1;
	loop {
		let Some(token) = tokens.peek_nth(offset) else { return false };
		match token.kind {
			TokenKind::LeftBracket => depth += 1,
			TokenKind::RightBracket => {
				depth -= 1;
				if depth == 0 {
					break;
				}
			},
			_ => {},
		}
		offset += 1;
	}
	tokens.peek_nth(offset + 1).is_some_and(|token| token.kind == TokenKind::Equal)
}

/// Pops tokens up to (not including) the end of the current statement: the first `Newline`/`Semicolon` at bracket-depth zero, the first `RightBrace` at
/// bracket-depth zero (the enclosing block's end), or the end of input. Depth tracks only `( )` and `[ ]`, since expressions never contain `{ }`.
fn take_until_end_of_statement(tokens: &mut VecDeque<Token>) -> Vec<Token> {
	let mut depth = 0_i32;
	let mut collected = Vec::new();
	while let Some(token) = tokens.front() {
		match token.kind {
			TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
			TokenKind::RightParen | TokenKind::RightBracket => depth -= 1,
			_ if depth == 0 && (token.kind.is_end_of_statement() || token.kind == TokenKind::RightBrace) => break,
			_ => {},
		}
		collected.push(tokens.pop_front().expect("just peeked"));
	}
	collected
}

/// Pops tokens up to (not including) the `{` that opens a block, tracking `( )` and `[ ]` depth so a condition containing a call or index expression
/// doesn't trip on its own parens.
fn take_until_left_brace(tokens: &mut VecDeque<Token>) -> Vec<Token> {
	let mut depth = 0_i32;
	let mut collected = Vec::new();
	while let Some(token) = tokens.front() {
		match token.kind {
			TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
			TokenKind::RightParen | TokenKind::RightBracket => depth -= 1,
			TokenKind::LeftBrace if depth == 0 => break,
			_ => {},
		}
		collected.push(tokens.pop_front().expect("just peeked"));
	}
	collected
}

/// Having already positioned the queue at a `{`, consumes the whole balanced block and returns its interior tokens as their own queue.
fn take_balanced_braces(tokens: &mut VecDeque<Token>) -> anyhow::Result<VecDeque<Token>> {
	tokens.pop(TokenKind::LeftBrace)?;
	let mut depth = 1_i32;
	let mut collected = VecDeque::new();
	loop {
		let token = tokens
			.pop_front()
			.ok_or_else(|| Diagnostic::parse("unterminated block, expected `}`", None))?;
		match token.kind {
			TokenKind::LeftBrace => depth += 1,
			TokenKind::RightBrace => {
				depth -= 1;
				if depth == 0 {
					return Ok(collected);
				}
			},
			_ => {},
		}
		collected.push_back(token);
	}
}

fn parse_block(tokens: &mut VecDeque<Token>) -> anyhow::Result<Vec<Statement>> {
	let mut body = take_balanced_braces(tokens)?;
	parse_statement_sequence(&mut body)
}

fn parse_variable_declaration(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	let name = tokens.pop(TokenKind::Identifier)?;
	tokens.pop(TokenKind::Declare)?;
	let value = Expression::parse(&mut VecDeque::from(take_until_end_of_statement(tokens)))?;
	Ok(Statement::VariableDeclaration { name, value })
}

fn parse_variable_assignment(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	let name = tokens.pop(TokenKind::Identifier)?;
	let line = tokens.current_line();
	let operator = match tokens.pop_front().map(|token| token.kind) {
		Some(TokenKind::Equal) => AssignOperator::Assign,
		Some(TokenKind::PlusEqual) => AssignOperator::AddAssign,
		Some(TokenKind::MinusEqual) => AssignOperator::SubtractAssign,
		Some(TokenKind::StarEqual) => AssignOperator::MultiplyAssign,
		Some(TokenKind::SlashEqual) => AssignOperator::DivideAssign,
		_ => return Err(Diagnostic::parse("expected an assignment operator", Some(line)).into()),
	};
	let value = Expression::parse(&mut VecDeque::from(take_until_end_of_statement(tokens)))?;
	Ok(Statement::VariableAssignment { name, operator, value })
}

fn parse_index_assignment(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	let name = tokens.pop(TokenKind::Identifier)?;
	tokens.pop(TokenKind::LeftBracket)?;
	let index = Expression::parse(tokens)?;
	tokens.pop(TokenKind::RightBracket)?;
	tokens.pop(TokenKind::Equal)?;
	let value = Expression::parse(&mut VecDeque::from(take_until_end_of_statement(tokens)))?;
	Ok(Statement::IndexAssignment { name, index, value })
}

fn parse_expression_statement(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	let slice = take_until_end_of_statement(tokens);
	if slice.is_empty() {
		let line = tokens.current_line();
		return Err(Diagnostic::parse("expected a statement", Some(line)).into());
	}
	Ok(Statement::Expression(Expression::parse(&mut VecDeque::from(slice))?))
}

fn parse_function_declaration(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	tokens.pop(TokenKind::KeywordDef)?;
	let name = tokens.pop(TokenKind::Identifier)?;
	tokens.pop(TokenKind::LeftParen)?;
	let mut parameters = Vec::new();
	while !tokens.next_is(TokenKind::RightParen) {
		parameters.push(tokens.pop(TokenKind::Identifier)?);
		if tokens.next_is(TokenKind::Comma) {
			tokens.pop(TokenKind::Comma)?;
		}
	}
	tokens.pop(TokenKind::RightParen)?;
	let body = parse_block(tokens)?;
	Ok(Statement::FunctionDeclaration { name, parameters, body })
}

fn parse_return(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	tokens.pop(TokenKind::KeywordReturn)?;
	let slice = take_until_end_of_statement(tokens);
	let expression = if slice.is_empty() {
		Expression::Nil
	} else {
		Expression::parse(&mut VecDeque::from(slice))?
	};
	Ok(Statement::Return(expression))
}

fn parse_while_loop(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	tokens.pop(TokenKind::KeywordWhile)?;
	let condition = Expression::parse(&mut VecDeque::from(take_until_left_brace(tokens)))?;
	let body = parse_block(tokens)?;
	Ok(Statement::While { condition, body })
}

/// Parses an `if` together with every `elsif`/`else` that follows it, folding the chain into nested [`Statement::If`]/[`Statement::Else`] `else_branch`es.
fn parse_if_chain(tokens: &mut VecDeque<Token>) -> anyhow::Result<Statement> {
	tokens.pop(TokenKind::KeywordIf)?;
	let condition = Expression::parse(&mut VecDeque::from(take_until_left_brace(tokens)))?;
	let body = parse_block(tokens)?;
	let else_branch = parse_else_chain(tokens)?;
	Ok(Statement::If { condition, body, else_branch: else_branch.map(Box::new) })
}

fn parse_else_chain(tokens: &mut VecDeque<Token>) -> anyhow::Result<Option<Statement>> {
	skip_statement_separators_if_followed_by_elsif_or_else(tokens);
	match tokens.peek().map(|token| token.kind) {
		Some(TokenKind::KeywordElsif) => {
			tokens.pop(TokenKind::KeywordElsif)?;
			let condition = Expression::parse(&mut VecDeque::from(take_until_left_brace(tokens)))?;
			let body = parse_block(tokens)?;
			let else_branch = parse_else_chain(tokens)?;
			Ok(Some(Statement::If { condition, body, else_branch: else_branch.map(Box::new) }))
		},
		Some(TokenKind::KeywordElse) => {
			tokens.pop(TokenKind::KeywordElse)?;
			Ok(Some(Statement::Else { body: parse_block(tokens)? }))
		},
		_ => Ok(None),
	}
}

/// `elsif`/`else` may appear on the line right after a block's closing `}`, so a single run of statement separators between them doesn't end the chain.
/// Only consumes the separators if an `elsif`/`else` keyword is actually waiting after them; otherwise leaves the queue untouched so the outer
/// [`parse_statement_sequence`] still sees them.
fn skip_statement_separators_if_followed_by_elsif_or_else(tokens: &mut VecDeque<Token>) {
	let mut offset = 0;
	while tokens.peek_nth(offset).is_some_and(|token| token.kind.is_end_of_statement()) {
		offset += 1;
	}
	if offset > 0 && tokens.peek_nth(offset).is_some_and(|token| matches!(token.kind, TokenKind::KeywordElsif | TokenKind::KeywordElse)) {
		for _ in 0..offset {
			tokens.pop_front();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	fn parse_all(source: &str) -> Vec<Statement> {
		parse_statement_sequence(&mut tokenize(source).unwrap()).unwrap()
	}

	#[test]
	fn declaration_followed_by_call_statement() {
		let statements = parse_all("x := 1\nnoot!(x)");
		assert!(matches!(statements[0], Statement::VariableDeclaration { .. }));
		assert!(matches!(statements[1], Statement::Expression(Expression::Call { .. })));
	}

	#[test]
	fn index_assignment_is_distinguished_from_index_read() {
		let statements = parse_all("a[0] = 1\nnoot!(a[0])");
		assert!(matches!(statements[0], Statement::IndexAssignment { .. }));
		assert!(matches!(statements[1], Statement::Expression(Expression::Call { .. })));
	}

	#[test]
	fn compound_assignment_operator_is_captured() {
		let statements = parse_all("x += 1");
		assert!(matches!(statements[0], Statement::VariableAssignment { operator: AssignOperator::AddAssign, .. }));
	}

	#[test]
	fn if_elsif_else_folds_into_nested_else_branches() {
		let statements = parse_all("if x { a() } elsif y { b() } else { c() }");
		let Statement::If { else_branch: Some(elsif), .. } = &statements[0] else {
			panic!("expected an if statement with an else branch");
		};
		let Statement::If { else_branch: Some(else_branch), .. } = elsif.as_ref() else {
			panic!("expected the elsif to carry its own else branch");
		};
		assert!(matches!(else_branch.as_ref(), Statement::Else { .. }));
	}

	#[test]
	fn while_loop_parses_condition_and_body() {
		let statements = parse_all("while x < 10 {\n  x += 1\n}");
		assert!(matches!(statements[0], Statement::While { .. }));
	}

	#[test]
	fn function_declaration_parses_parameters_and_body() {
		let statements = parse_all("def add(a, b) {\n  return a + b\n}");
		let Statement::FunctionDeclaration { name, parameters, body } = &statements[0] else {
			panic!("expected a function declaration");
		};
		assert_eq!(name, "add");
		assert_eq!(parameters, &["a".to_owned(), "b".to_owned()]);
		assert!(matches!(body[0], Statement::Return(_)));
	}
}
