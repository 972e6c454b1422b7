//! The core library: the native functions and methods a host registers into a fresh [`Environment`] before evaluation begins. The evaluator itself knows
//! no builtins — see `crate::runtime::Environment::register_native`/`register_method`, which this module is the sole caller of in this embedding.

use std::{cell::RefCell, io::Write as _, rc::Rc};

use crate::{
	diagnostic::Diagnostic,
	evaluator,
	runtime::{
		value::{TypeTag, Value},
		Environment,
	},
};

/// A native function keyed by its registered name, grounded on the teacher's `BUILTINS` map shape (`phf::Map<&str, _>` of function pointers looked up by
/// name), minus the compile-time evaluation machinery this dialect has no use for.
type NativeFn = fn(&mut Environment, &[Value]) -> anyhow::Result<Value>;

static GLOBAL_FUNCTIONS: phf::Map<&'static str, NativeFn> = phf::phf_map! {
	"noot!" => noot,
	"input!" => input,
};

static STRING_METHODS: phf::Map<&'static str, NativeFn> = phf::phf_map! {
	"concat" => string_concat,
	"split" => string_split,
	"len" => string_len,
};

static SEQUENCE_METHODS: phf::Map<&'static str, NativeFn> = phf::phf_map! {
	"len" => sequence_len,
};

/// Registers every native function and method this embedding provides. Called once by the host before evaluation (see `cli::commands::run`).
pub fn register_core_library(environment: &mut Environment) {
	for (&name, &native) in &GLOBAL_FUNCTIONS {
		environment.register_native(name, crate::runtime::value::NativeFunction(native));
	}
	for (&name, &native) in &STRING_METHODS {
		environment.register_method(TypeTag::String, name, crate::runtime::value::NativeFunction(native));
	}
	for (&name, &native) in &SEQUENCE_METHODS {
		environment.register_method(TypeTag::Sequence, name, crate::runtime::value::NativeFunction(native));
	}
}

/// `noot!(a, b, ...)`: prints every argument space-separated followed by a trailing newline. Requires at least one argument.
fn noot(environment: &mut Environment, arguments: &[Value]) -> anyhow::Result<Value> {
	if arguments.is_empty() {
		return Err(Diagnostic::runtime("noot! requires at least one argument").into());
	}
	let rendered = arguments.iter().map(Value::to_display_string).collect::<Vec<_>>().join(" ");
	writeln!(environment.output, "{rendered}").map_err(|error| Diagnostic::interpreter(format!("failed to write output: {error}")))?;
	Ok(Value::Nil)
}

/// `input!()`: reads a single line from the host's input handle, trimming the trailing newline.
fn input(environment: &mut Environment, _arguments: &[Value]) -> anyhow::Result<Value> {
	Ok(Value::String(Rc::from(evaluator::read_line(environment)?.as_str())))
}

fn receiver_string(arguments: &[Value]) -> anyhow::Result<Rc<str>> {
	match arguments.first() {
		Some(Value::String(value)) => Ok(Rc::clone(value)),
		_ => Err(Diagnostic::runtime("expected a string receiver").into()),
	}
}

fn receiver_sequence(arguments: &[Value]) -> anyhow::Result<Rc<RefCell<Vec<Value>>>> {
	match arguments.first() {
		Some(Value::Sequence(value)) => Ok(Rc::clone(value)),
		_ => Err(Diagnostic::runtime("expected a sequence receiver").into()),
	}
}

/// `string.concat(other)`: concatenates `other`'s display text onto the receiver.
fn string_concat(_environment: &mut Environment, arguments: &[Value]) -> anyhow::Result<Value> {
	let receiver = receiver_string(arguments)?;
	let other = arguments.get(1).ok_or_else(|| Diagnostic::runtime("concat requires one argument"))?;
	Ok(Value::String(Rc::from(format!("{receiver}{}", other.to_display_string()).as_str())))
}

/// `string.split(separator)`: splits the receiver on a literal separator string, yielding a sequence of strings.
fn string_split(_environment: &mut Environment, arguments: &[Value]) -> anyhow::Result<Value> {
	let receiver = receiver_string(arguments)?;
	let Some(Value::String(separator)) = arguments.get(1) else {
		return Err(Diagnostic::runtime("split requires a string separator").into());
	};
	let pieces = if separator.is_empty() {
		receiver.chars().map(|character| Value::String(Rc::from(character.to_string().as_str()))).collect()
	} else {
		receiver.split(&**separator).map(|piece| Value::String(Rc::from(piece))).collect()
	};
	Ok(Value::Sequence(Rc::new(RefCell::new(pieces))))
}

/// `string.len()`: the receiver's length in characters.
fn string_len(_environment: &mut Environment, arguments: &[Value]) -> anyhow::Result<Value> {
	let receiver = receiver_string(arguments)?;
	Ok(Value::Integer(receiver.chars().count() as i64))
}

/// `sequence.len()`: the receiver's element count.
fn sequence_len(_environment: &mut Environment, arguments: &[Value]) -> anyhow::Result<Value> {
	let receiver = receiver_sequence(arguments)?;
	Ok(Value::Integer(receiver.borrow().len() as i64))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::tokenize, parser};

	fn run(source: &str) -> (String, Environment<'static>) {
		let program = parser::parse(&mut tokenize(source).unwrap()).unwrap();
		let output: &'static mut Vec<u8> = Box::leak(Box::new(Vec::new()));
		let mut environment = Environment::new(output, Box::leak(Box::new(std::io::sink())), Box::leak(Box::new(std::io::empty())));
		register_core_library(&mut environment);
		evaluator::execute_block(&mut environment, &program.statements).unwrap();
		(String::from_utf8(output.clone()).unwrap(), environment)
	}

	#[test]
	fn noot_prints_space_separated_with_trailing_newline() {
		let (output, _) = run(r#"noot!("a", 1, true)"#);
		assert_eq!(output, "a 1 true\n");
	}

	#[test]
	fn noot_with_no_arguments_is_a_runtime_error() {
		let program = parser::parse(&mut tokenize("noot!()").unwrap()).unwrap();
		let mut environment = Environment::new(
			Box::leak(Box::new(std::io::sink())),
			Box::leak(Box::new(std::io::sink())),
			Box::leak(Box::new(std::io::empty())),
		);
		register_core_library(&mut environment);
		assert!(evaluator::execute_block(&mut environment, &program.statements).is_err());
	}

	#[test]
	fn string_concat_and_len() {
		let (output, _) = run(r#"a := "hello world"
b := a.concat("!")
noot!(a)
noot!(b)
noot!(b.len())"#);
		assert_eq!(output, "hello world\nhello world!\n12\n");
	}

	#[test]
	fn string_split_yields_a_sequence_of_strings() {
		let (_, environment) = run(r#"parts := "a,b,c".split(",")"#);
		let Some(Value::Sequence(parts)) = environment.get_variable("parts") else {
			panic!("expected a sequence");
		};
		let rendered: Vec<String> = parts.borrow().iter().map(Value::to_display_string).collect();
		assert_eq!(rendered, vec!["a", "b", "c"]);
	}

	#[test]
	fn sequence_len_counts_elements() {
		let (output, _) = run("noot!([1, 2, 3].len())");
		assert_eq!(output, "3\n");
	}
}
