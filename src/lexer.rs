use std::collections::VecDeque;

// Bring the `Casing` trait into scope, which allows us to use `.to_case()` on strings. This is used to convert `TokenKind` enum variant names into Title Case,
// which is useful for outputting human-readable diagnostics. We assign this to `as _` to indicate clearly that the trait is not referenced directly and only
// used to bring its methods into scope to be called.
use convert_case::Casing as _;
// Bring the `IntoEnumIterator` trait into scope, which allows us to use `::iter()` on enums that `#[derive(strum_macros::EnumIter)]`. This is used on
// `TokenKind` to iterate over the values of the enum to test which one matches a specific position in the source text. We assign this to `as _` to indicate
// clearly that the trait is not referenced directly and only used to bring its methods into scope to be called.
use strum::IntoEnumIterator as _;

use crate::diagnostic::Diagnostic;

/// A kind of token in Noot source code. Tokenization is the first step of interpretation: it splits a raw `&str` of source text into a flat sequence of
/// tokens, each carrying a `kind` (this enum) and the `lexeme` that produced it.
///
/// # Conventions
///
/// Variants are named after what the token *looks like*, not how the parser will eventually use it — the `Dot` variant doesn't know it will sometimes
/// introduce a method chain. This keeps the lexer fully ignorant of grammar.
///
/// # Ordering
///
/// Variant declaration order is also match-priority order: [`TokenKind::lex`] tries every variant's pattern in `iter()` order and takes the first match at
/// the cursor. Several patterns overlap as prefixes of one another (`:=` starts with nothing shorter in this language, but `==` starts with `=`, `+=` starts
/// with `+`, and so on), so the longer / more specific pattern **must** be declared first. Moving a variant without checking this comment is a bug.
#[derive(strum_macros::EnumIter, PartialEq, Eq, Debug, Clone, Copy)]
pub enum TokenKind {
	/// `:=`, declares a new variable in the innermost scope.
	Declare,
	/// `==`
	EqualEqual,
	/// `+=`
	PlusEqual,
	/// `-=`
	MinusEqual,
	/// `*=`
	StarEqual,
	/// `/=`
	SlashEqual,
	/// `<=`
	LessEqual,
	/// `>=`
	GreaterEqual,
	/// `!=`
	BangEqual,
	/// `&&`
	AndAnd,
	/// `||`
	OrOr,

	/// A line comment, starting with `#` or `//` and running to the end of the line. Comments are lexed so that a malformed comment still produces a
	/// clean error, but they are filtered out of the token stream the parser sees (see [`tokenize`]).
	///
	/// This must be declared before [`TokenKind::Slash`], otherwise `//` would be lexed as two [`TokenKind::Slash`] tokens before this pattern ever gets a
	/// chance to match.
	LineComment,

	/// `=`
	Equal,
	/// `+`
	Plus,
	/// `-`
	Minus,
	/// `*`
	Star,
	/// `/`
	Slash,
	/// `<`
	Less,
	/// `>`
	Greater,
	/// `!`, the only unary operator in this dialect (see the parser's precedence climb).
	Bang,

	/// A floating-point literal. Requires at least one digit on both sides of the dot (`\d+\.\d+`) so that `5.len()` lexes as `Integer(5) Dot Identifier(len)
	/// ...` instead of swallowing the dot into a malformed float.
	Float,
	/// An integer literal, 64-bit signed.
	Integer,
	/// A double-quoted string literal, lexeme includes the surrounding quotes; escape substitution happens in the parser.
	String,

	// Reserved words. All of these must be declared before `Identifier`, or they'd be lexed as identifiers instead.
	KeywordTrue,
	KeywordFalse,
	KeywordDef,
	KeywordReturn,
	KeywordNil,
	KeywordIf,
	KeywordElsif,
	KeywordElse,
	KeywordWhile,

	/// A newline, significant as an end-of-statement marker (alongside [`TokenKind::Semicolon`]). Unlike spaces and tabs, newlines are never silently
	/// stripped by the lexer.
	Newline,
	/// `;`, an explicit end-of-statement marker.
	Semicolon,

	LeftParen,
	RightParen,
	LeftBrace,
	RightBrace,
	LeftBracket,
	RightBracket,
	Comma,
	Dot,

	/// An identifier. Must be declared after every reserved word above. Identifiers may end in `!` or `?`, since several core-library names do
	/// (e.g. `noot!`).
	Identifier,
}

impl TokenKind {
	/// Returns a regular expression that matches this token kind at the *start* of a string. The returned value is a lazily-evaluated static, so there's no
	/// cost to calling this repeatedly.
	fn pattern(self) -> &'static regex_macro::Regex {
		match self {
			Self::Declare => regex_macro::regex!("^:="),
			Self::EqualEqual => regex_macro::regex!("^=="),
			Self::PlusEqual => regex_macro::regex!(r"^\+="),
			Self::MinusEqual => regex_macro::regex!("^-="),
			Self::StarEqual => regex_macro::regex!(r"^\*="),
			Self::SlashEqual => regex_macro::regex!("^/="),
			Self::LessEqual => regex_macro::regex!("^<="),
			Self::GreaterEqual => regex_macro::regex!("^>="),
			Self::BangEqual => regex_macro::regex!("^!="),
			Self::AndAnd => regex_macro::regex!("^&&"),
			Self::OrOr => regex_macro::regex!(r"^\|\|"),

			Self::LineComment => regex_macro::regex!(r"^(#|//)[^\n\r]*"),

			Self::Equal => regex_macro::regex!("^="),
			Self::Plus => regex_macro::regex!(r"^\+"),
			Self::Minus => regex_macro::regex!("^-"),
			Self::Star => regex_macro::regex!(r"^\*"),
			Self::Slash => regex_macro::regex!("^/"),
			Self::Less => regex_macro::regex!("^<"),
			Self::Greater => regex_macro::regex!("^>"),
			Self::Bang => regex_macro::regex!("^!"),

			Self::Float => regex_macro::regex!(r"^\d+\.\d+"),
			Self::Integer => regex_macro::regex!(r"^\d+"),
			Self::String => regex_macro::regex!(r#"(?s)^"(\\.|[^"\\])*""#),

			Self::KeywordTrue => regex_macro::regex!(r"^true\b"),
			Self::KeywordFalse => regex_macro::regex!(r"^false\b"),
			Self::KeywordDef => regex_macro::regex!(r"^def\b"),
			Self::KeywordReturn => regex_macro::regex!(r"^return\b"),
			Self::KeywordNil => regex_macro::regex!(r"^nil\b"),
			Self::KeywordIf => regex_macro::regex!(r"^if\b"),
			Self::KeywordElsif => regex_macro::regex!(r"^elsif\b"),
			Self::KeywordElse => regex_macro::regex!(r"^else\b"),
			Self::KeywordWhile => regex_macro::regex!(r"^while\b"),

			Self::Newline => regex_macro::regex!("^\n"),
			Self::Semicolon => regex_macro::regex!("^;"),

			Self::LeftParen => regex_macro::regex!(r"^\("),
			Self::RightParen => regex_macro::regex!(r"^\)"),
			Self::LeftBrace => regex_macro::regex!(r"^\{"),
			Self::RightBrace => regex_macro::regex!(r"^\}"),
			Self::LeftBracket => regex_macro::regex!(r"^\["),
			Self::RightBracket => regex_macro::regex!(r"^\]"),
			Self::Comma => regex_macro::regex!("^,"),
			Self::Dot => regex_macro::regex!(r"^\."),

			Self::Identifier => regex_macro::regex!(r"^[A-Za-z_]\w*[!?]?"),
		}
	}

	/// Returns the matched text at the start of `code` for this token kind, or `None` if it doesn't match there.
	#[must_use]
	fn get_match(self, code: &str) -> Option<&str> {
		self.pattern().find(code).map(|matched| matched.as_str())
	}

	/// Finds the first token kind (in declaration order) that matches the start of `code`, along with its matched text.
	#[must_use]
	fn find_match(code: &str) -> Option<(Self, &str)> {
		Self::iter().find_map(|kind| kind.get_match(code).map(|matched| (kind, matched)))
	}

	/// Whether this token kind ends a statement on its own (a newline or semicolon).
	#[must_use]
	pub const fn is_end_of_statement(self) -> bool {
		matches!(self, Self::Newline | Self::Semicolon)
	}
}

impl std::fmt::Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", format!("{self:?}").to_case(convert_case::Case::Title))
	}
}

/// A single token in Noot source code.
#[derive(Debug, Clone)]
pub struct Token {
	/// The kind of the token.
	pub kind: TokenKind,
	/// The exact source text that produced this token. Preserved verbatim (quotes included for strings) so later stages can re-derive literal values
	/// without consulting the original source.
	pub lexeme: String,
	/// The 1-indexed line this token started on.
	pub line: usize,
	/// The 1-indexed column this token started on.
	pub column: usize,
}

/// Tokenizes a string of Noot source code into a flat sequence of tokens.
///
/// Leading spaces and tabs are stripped before each token attempt (newlines are not — they're meaningful end-of-statement markers); comments are lexed so
/// that a malformed one still produces a clean diagnostic, but are then filtered out, just as whitespace is.
///
/// # Errors
///
/// Returns a [`Diagnostic::lex`] if the remaining input doesn't match any known token kind at the cursor.
pub fn tokenize(source: &str) -> anyhow::Result<VecDeque<Token>> {
	let mut remaining = source;
	let mut tokens = VecDeque::new();
	let mut line = 1;
	let mut column = 1;

	while !remaining.is_empty() {
		let stripped = remaining.trim_start_matches([' ', '\t']);
		column += remaining.len() - stripped.len();
		remaining = stripped;

		if remaining.is_empty() {
			break;
		}

		let Some((kind, matched)) = TokenKind::find_match(remaining) else {
			let offending = remaining.split(['\n', '\r']).next().unwrap_or(remaining);
			return Err(Diagnostic::lex(format!("cannot lex at `{offending}`"), Some(line)).into());
		};

		let length = matched.len();
		let lexeme = matched.to_owned();

		if kind != TokenKind::LineComment {
			tokens.push_back(Token { kind, lexeme, line, column });
		}

		if kind == TokenKind::Newline {
			line += 1;
			column = 1;
		} else {
			column += length;
		}

		remaining = remaining.get(length..).unwrap_or_default();
	}

	Ok(tokens)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(source: &str) -> Vec<TokenKind> {
		tokenize(source).unwrap().into_iter().map(|token| token.kind).collect()
	}

	#[test]
	fn lexes_compound_assign_before_plain_operators() {
		assert_eq!(kinds("x += 1"), vec![TokenKind::Identifier, TokenKind::PlusEqual, TokenKind::Integer]);
	}

	#[test]
	fn lexes_declare_not_colon_then_equal() {
		assert_eq!(kinds("x := 1"), vec![TokenKind::Identifier, TokenKind::Declare, TokenKind::Integer]);
	}

	#[test]
	fn float_requires_digits_on_both_sides_of_dot() {
		assert_eq!(kinds("5.len()"), vec![
			TokenKind::Integer,
			TokenKind::Dot,
			TokenKind::Identifier,
			TokenKind::LeftParen,
			TokenKind::RightParen,
		]);
		assert_eq!(kinds("5.2"), vec![TokenKind::Float]);
	}

	#[test]
	fn line_comments_are_skipped_but_newlines_are_kept() {
		assert_eq!(kinds("x := 1 # hello\ny := 2"), vec![
			TokenKind::Identifier,
			TokenKind::Declare,
			TokenKind::Integer,
			TokenKind::Newline,
			TokenKind::Identifier,
			TokenKind::Declare,
			TokenKind::Integer,
		]);
	}

	#[test]
	fn unrecognized_character_is_a_lex_error() {
		assert!(tokenize("x := @").is_err());
	}

	#[test]
	fn string_literal_keeps_quotes_and_supports_escapes() {
		let tokens = tokenize(r#"x := "a\"b""#).unwrap();
		assert_eq!(tokens[2].lexeme, r#""a\"b""#);
	}
}
