use std::collections::VecDeque;

use crate::{
	diagnostic::Diagnostic,
	lexer::{Token, TokenKind},
};

use super::{split_on_top_level_commas, Parse, TokenQueue};

/// A binary operator tag. Carried on [`Expression::Binary`] rather than split into per-operator node kinds, so the evaluator's binary-operator coercion
/// lattice (see `crate::evaluator`) can dispatch on it uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
	Or,
	And,
	Equal,
	NotEqual,
	Less,
	Greater,
	LessEqual,
	GreaterEqual,
	Add,
	Subtract,
	Multiply,
	Divide,
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expression {
	Integer(i64),
	Float(f64),
	String(String),
	Boolean(bool),
	Nil,
	Array(Vec<Self>),
	Variable(String),
	Binary {
		left: Box<Self>,
		operator: BinaryOperator,
		right: Box<Self>,
	},
	Not(Box<Self>),
	Call {
		name: String,
		arguments: Vec<Self>,
	},
	MethodCall {
		receiver: Box<Self>,
		name: String,
		arguments: Vec<Self>,
	},
	Index {
		array: Box<Self>,
		index: Box<Self>,
	},
}

impl Parse for Expression {
	type Output = Self;

	fn parse(tokens: &mut VecDeque<Token>) -> anyhow::Result<Self::Output> {
		parse_binary_expression(&OR, tokens)
	}
}

/// One precedence level in the climb: the token kinds that belong to it, their matching [`BinaryOperator`]s, and the next-tighter level to defer to for
/// operands. This linked-list-of-levels shape is the idiomatic recursive-descent encoding of the "flatten at paren-depth zero, then reduce ascending
/// precedence, left-associating" two-phase algorithm: each level's `while` loop over same-precedence operators *is* one ascending-precedence reduction
/// pass, and recursing into `precedent` for operands *is* the flattening step, just done lazily instead of as an explicit array split.
struct BinaryOperation {
	precedent: Option<&'static BinaryOperation>,
	operators: &'static [(TokenKind, BinaryOperator)],
}

static MULTIPLICATIVE: BinaryOperation = BinaryOperation {
	precedent: None,
	operators: &[(TokenKind::Star, BinaryOperator::Multiply), (TokenKind::Slash, BinaryOperator::Divide)],
};

static ADDITIVE: BinaryOperation = BinaryOperation {
	precedent: Some(&MULTIPLICATIVE),
	operators: &[(TokenKind::Plus, BinaryOperator::Add), (TokenKind::Minus, BinaryOperator::Subtract)],
};

static COMPARISON: BinaryOperation = BinaryOperation {
	precedent: Some(&ADDITIVE),
	operators: &[
		(TokenKind::EqualEqual, BinaryOperator::Equal),
		(TokenKind::BangEqual, BinaryOperator::NotEqual),
		(TokenKind::Less, BinaryOperator::Less),
		(TokenKind::Greater, BinaryOperator::Greater),
		(TokenKind::LessEqual, BinaryOperator::LessEqual),
		(TokenKind::GreaterEqual, BinaryOperator::GreaterEqual),
	],
};

static AND: BinaryOperation = BinaryOperation {
	precedent: Some(&COMPARISON),
	operators: &[(TokenKind::AndAnd, BinaryOperator::And)],
};

static OR: BinaryOperation = BinaryOperation {
	precedent: Some(&AND),
	operators: &[(TokenKind::OrOr, BinaryOperator::Or)],
};

impl BinaryOperation {
	fn parse_precedent(&self, tokens: &mut VecDeque<Token>) -> anyhow::Result<Expression> {
		self.precedent.map_or_else(|| parse_primary(tokens), |precedent| parse_binary_expression(precedent, tokens))
	}

	fn matching_operator(&self, kind: TokenKind) -> Option<BinaryOperator> {
		self.operators.iter().find(|(token_kind, _)| *token_kind == kind).map(|(_, operator)| *operator)
	}
}

fn parse_binary_expression(level: &BinaryOperation, tokens: &mut VecDeque<Token>) -> anyhow::Result<Expression> {
	let mut expression = level.parse_precedent(tokens)?;
	while let Some(operator) = tokens.peek().and_then(|token| level.matching_operator(token.kind)) {
		tokens.pop_front();
		let right = level.parse_precedent(tokens)?;
		expression = Expression::Binary {
			left: Box::new(expression),
			operator,
			right: Box::new(right),
		};
	}
	Ok(expression)
}

/// Consumes a `(`-delimited, comma-separated list of expressions, leaving the closing `)` consumed. Shared by function calls and method-call arguments.
fn parse_parenthesized_arguments(tokens: &mut VecDeque<Token>) -> anyhow::Result<Vec<Expression>> {
	tokens.pop(TokenKind::LeftParen)?;
	let inner = take_balanced(tokens, TokenKind::LeftParen, TokenKind::RightParen)?;
	split_on_top_level_commas(&inner)
		.into_iter()
		.filter(|group| !group.is_empty())
		.map(|group| Expression::parse(&mut VecDeque::from(group)))
		.collect()
}

fn parse_array_literal(tokens: &mut VecDeque<Token>) -> anyhow::Result<Expression> {
	tokens.pop(TokenKind::LeftBracket)?;
	let inner = take_balanced(tokens, TokenKind::LeftBracket, TokenKind::RightBracket)?;
	let elements = split_on_top_level_commas(&inner)
		.into_iter()
		.filter(|group| !group.is_empty())
		.map(|group| Expression::parse(&mut VecDeque::from(group)))
		.collect::<anyhow::Result<Vec<_>>>()?;
	Ok(Expression::Array(elements))
}

/// Having already consumed the opening delimiter, collects tokens up to (and including, though not returned) its matching closing delimiter, tracking
/// nested depth of the same delimiter pair.
fn take_balanced(tokens: &mut VecDeque<Token>, open: TokenKind, close: TokenKind) -> anyhow::Result<Vec<Token>> {
	let mut depth = 1_i32;
	let mut collected = Vec::new();
	loop {
		let token = tokens
			.pop_front()
			.ok_or_else(|| Diagnostic::parse(format!("expected {close} but found end of input"), None))?;
		if token.kind == open {
			depth += 1;
		} else if token.kind == close {
			depth -= 1;
			if depth == 0 {
				return Ok(collected);
			}
		}
		collected.push(token);
	}
}

fn parse_primary(tokens: &mut VecDeque<Token>) -> anyhow::Result<Expression> {
	let line = tokens.current_line();
	let Some(token) = tokens.peek() else {
		return Err(Diagnostic::parse("expected an expression but found end of input", None).into());
	};

	let mut base = match token.kind {
		TokenKind::LeftParen => {
			tokens.pop(TokenKind::LeftParen)?;
			let inner = Expression::parse(tokens)?;
			tokens.pop(TokenKind::RightParen)?;
			inner
		},
		TokenKind::Bang => {
			tokens.pop(TokenKind::Bang)?;
			return Ok(Expression::Not(Box::new(parse_primary(tokens)?)));
		},
		TokenKind::LeftBracket => parse_array_literal(tokens)?,
		TokenKind::Integer => {
			let lexeme = tokens.pop(TokenKind::Integer)?;
			Expression::Integer(
				lexeme
					.parse()
					.map_err(|_| Diagnostic::parse(format!("malformed integer literal \"{lexeme}\""), Some(line)))?,
			)
		},
		TokenKind::Float => {
			let lexeme = tokens.pop(TokenKind::Float)?;
			Expression::Float(
				lexeme
					.parse()
					.map_err(|_| Diagnostic::parse(format!("malformed float literal \"{lexeme}\""), Some(line)))?,
			)
		},
		TokenKind::String => Expression::String(unescape(&tokens.pop(TokenKind::String)?, line)?),
		TokenKind::KeywordTrue => {
			tokens.pop(TokenKind::KeywordTrue)?;
			Expression::Boolean(true)
		},
		TokenKind::KeywordFalse => {
			tokens.pop(TokenKind::KeywordFalse)?;
			Expression::Boolean(false)
		},
		TokenKind::KeywordNil => {
			tokens.pop(TokenKind::KeywordNil)?;
			Expression::Nil
		},
		TokenKind::Identifier => {
			let name = tokens.pop(TokenKind::Identifier)?;
			if tokens.next_is(TokenKind::LeftParen) {
				Expression::Call { name, arguments: parse_parenthesized_arguments(tokens)? }
			} else {
				let mut expression = Expression::Variable(name);
				while tokens.next_is(TokenKind::LeftBracket) {
					tokens.pop(TokenKind::LeftBracket)?;
					let index = Expression::parse(tokens)?;
					tokens.pop(TokenKind::RightBracket)?;
					expression = Expression::Index { array: Box::new(expression), index: Box::new(index) };
				}
				expression
			}
		},
		other => return Err(Diagnostic::parse(format!("expected an expression but found {other}"), Some(line)).into()),
	};

	while tokens.next_is(TokenKind::Dot) {
		tokens.pop(TokenKind::Dot)?;
		let name = tokens.pop(TokenKind::Identifier)?;
		let arguments = parse_parenthesized_arguments(tokens)?;
		base = Expression::MethodCall { receiver: Box::new(base), name, arguments };
	}

	Ok(base)
}

/// Strips the surrounding quotes from a string-literal lexeme and substitutes `\\ \" \n \r \t \a \b \f \v` escapes.
fn unescape(lexeme: &str, line: usize) -> anyhow::Result<String> {
	let inner = lexeme
		.strip_prefix('"')
		.and_then(|rest| rest.strip_suffix('"'))
		.ok_or_else(|| Diagnostic::parse("malformed string literal", Some(line)))?;

	let mut result = String::with_capacity(inner.len());
	let mut chars = inner.chars();
	while let Some(character) = chars.next() {
		if character != '\\' {
			result.push(character);
			continue;
		}
		let escaped = chars
			.next()
			.ok_or_else(|| Diagnostic::parse("dangling escape at end of string literal", Some(line)))?;
		result.push(match escaped {
			'\\' => '\\',
			'"' => '"',
			'n' => '\n',
			'r' => '\r',
			't' => '\t',
			'a' => '\u{7}',
			'b' => '\u{8}',
			'f' => '\u{C}',
			'v' => '\u{B}',
			other => return Err(Diagnostic::parse(format!("unknown string escape \"\\{other}\""), Some(line)).into()),
		});
	}
	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	fn parse_expr(source: &str) -> Expression {
		Expression::parse(&mut tokenize(source).unwrap()).unwrap()
	}

	#[test]
	fn multiplication_binds_tighter_than_addition() {
		let expression = parse_expr("1 + 2 * 3");
		let Expression::Binary { operator: BinaryOperator::Add, right, .. } = expression else {
			panic!("expected a top-level addition");
		};
		assert!(matches!(*right, Expression::Binary { operator: BinaryOperator::Multiply, .. }));
	}

	#[test]
	fn same_precedence_is_left_associative() {
		let expression = parse_expr("1 - 2 - 3");
		let Expression::Binary { operator: BinaryOperator::Subtract, left, .. } = expression else {
			panic!("expected a top-level subtraction");
		};
		assert!(matches!(*left, Expression::Binary { operator: BinaryOperator::Subtract, .. }));
	}

	#[test]
	fn method_chain_parses_as_nested_method_calls() {
		let expression = parse_expr(r#""hello".concat("!").len()"#);
		let Expression::MethodCall { name, receiver, .. } = expression else {
			panic!("expected a method call");
		};
		assert_eq!(name, "len");
		assert!(matches!(*receiver, Expression::MethodCall { .. }));
	}

	#[test]
	fn string_literal_unescapes_quotes_and_newlines() {
		let expression = parse_expr(r#""a\"b\nc""#);
		assert!(matches!(expression, Expression::String(value) if value == "a\"b\nc"));
	}
}
