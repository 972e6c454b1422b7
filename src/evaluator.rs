//! Walks the AST produced by [`crate::parser`] against a [`crate::runtime::Environment`], producing [`Value`]s and performing their side effects.

use std::{cell::RefCell, io::BufRead as _, rc::Rc};

use crate::{
	diagnostic::Diagnostic,
	parser::{
		expression::{BinaryOperator, Expression},
		statement::{AssignOperator, Statement},
	},
	runtime::{
		value::{Closure, TypeTag, Value},
		Environment,
	},
};

/// How a statement (or statement sequence) finished: either it ran through normally, or it hit a `return` that should unwind straight back to the
/// enclosing function call without running any more of the current body (and without unwinding past it — there are no labeled loops or `break`/`continue`
/// to propagate further).
pub enum ControlFlow {
	Normal,
	Returned(Value),
}

/// Executes every statement in `body` in order, short-circuiting the moment one of them returns.
///
/// # Errors
/// Propagates the first [`Diagnostic::runtime`] raised by any statement.
pub fn execute_block(environment: &mut Environment, body: &[Statement]) -> anyhow::Result<ControlFlow> {
	for statement in body {
		match execute_statement(environment, statement)? {
			ControlFlow::Normal => {},
			returned @ ControlFlow::Returned(_) => return Ok(returned),
		}
	}
	Ok(ControlFlow::Normal)
}

fn execute_statement(environment: &mut Environment, statement: &Statement) -> anyhow::Result<ControlFlow> {
	match statement {
		Statement::VariableDeclaration { name, value } => {
			let evaluated = evaluate(environment, value)?;
			environment.declare_variable(name, evaluated)?;
			Ok(ControlFlow::Normal)
		},
		Statement::VariableAssignment { name, operator, value } => {
			let rhs = evaluate(environment, value)?;
			// `+=` on a sequence appends in place rather than invoking `+` (which isn't defined for sequences at all).
			if matches!(operator, AssignOperator::AddAssign) {
				if let Value::Sequence(elements) = current_value(environment, name)? {
					elements.borrow_mut().push(rhs);
					return Ok(ControlFlow::Normal);
				}
			}
			let next = match operator {
				AssignOperator::Assign => rhs,
				AssignOperator::AddAssign => apply_binary(BinaryOperator::Add, current_value(environment, name)?, rhs)?,
				AssignOperator::SubtractAssign => apply_binary(BinaryOperator::Subtract, current_value(environment, name)?, rhs)?,
				AssignOperator::MultiplyAssign => apply_binary(BinaryOperator::Multiply, current_value(environment, name)?, rhs)?,
				AssignOperator::DivideAssign => apply_binary(BinaryOperator::Divide, current_value(environment, name)?, rhs)?,
			};
			environment.assign_variable(name, next)?;
			Ok(ControlFlow::Normal)
		},
		Statement::IndexAssignment { name, index, value } => {
			let index = evaluate_index(environment, index)?;
			let evaluated = evaluate(environment, value)?;
			environment.set_array_index(name, index, evaluated)?;
			Ok(ControlFlow::Normal)
		},
		Statement::FunctionDeclaration { name, parameters, body } => {
			let closure = Value::Function(Rc::new(Closure {
				parameters: parameters.clone(),
				body: body.clone(),
				declaring_scope: environment.current_frame(),
			}));
			environment.declare_function(name, closure);
			Ok(ControlFlow::Normal)
		},
		Statement::Return(expression) => Ok(ControlFlow::Returned(evaluate(environment, expression)?)),
		Statement::If { condition, body, else_branch } => {
			if is_truthy(environment, condition)? {
				execute_block(environment, body)
			} else if let Some(else_branch) = else_branch {
				execute_statement(environment, else_branch)
			} else {
				Ok(ControlFlow::Normal)
			}
		},
		Statement::Else { body } => execute_block(environment, body),
		Statement::While { condition, body } => {
			while is_truthy(environment, condition)? {
				match execute_block(environment, body)? {
					ControlFlow::Normal => {},
					returned @ ControlFlow::Returned(_) => return Ok(returned),
				}
			}
			Ok(ControlFlow::Normal)
		},
		Statement::Expression(expression) => {
			evaluate(environment, expression)?;
			Ok(ControlFlow::Normal)
		},
	}
}

fn current_value(environment: &Environment, name: &str) -> anyhow::Result<Value> {
	environment.get_variable(name).ok_or_else(|| Diagnostic::runtime(format!("variable \"{name}\" is not defined")).into())
}

fn is_truthy(environment: &mut Environment, condition: &Expression) -> anyhow::Result<bool> {
	match evaluate(environment, condition)? {
		Value::Boolean(value) => Ok(value),
		other => Err(Diagnostic::runtime(format!("condition must be a boolean, found {}", other.type_tag_name())).into()),
	}
}

fn evaluate_index(environment: &mut Environment, expression: &Expression) -> anyhow::Result<usize> {
	match evaluate(environment, expression)? {
		Value::Integer(value) if value >= 0 => Ok(value as usize),
		Value::Integer(value) => Err(Diagnostic::runtime(format!("index must not be negative, found {value}")).into()),
		other => Err(Diagnostic::runtime(format!("index must be an integer, found {}", other.type_tag_name())).into()),
	}
}

/// Evaluates an expression to a [`Value`].
///
/// # Errors
/// Returns a [`Diagnostic::runtime`] for an undefined name, a non-callable call target, an out-of-range index, or operands the relevant operator rejects.
pub fn evaluate(environment: &mut Environment, expression: &Expression) -> anyhow::Result<Value> {
	match expression {
		Expression::Integer(value) => Ok(Value::Integer(*value)),
		Expression::Float(value) => Ok(Value::Float(*value)),
		Expression::String(value) => Ok(Value::String(Rc::from(value.as_str()))),
		Expression::Boolean(value) => Ok(Value::Boolean(*value)),
		Expression::Nil => Ok(Value::Nil),
		Expression::Array(elements) => {
			let values = elements.iter().map(|element| evaluate(environment, element)).collect::<anyhow::Result<Vec<_>>>()?;
			Ok(Value::Sequence(Rc::new(RefCell::new(values))))
		},
		Expression::Variable(name) => {
			environment.get_variable(name).ok_or_else(|| Diagnostic::runtime(format!("variable \"{name}\" is not defined")).into())
		},
		Expression::Binary { left, operator, right } => {
			if matches!(operator, BinaryOperator::Or | BinaryOperator::And) {
				// `||`/`&&` short-circuit: the left operand is evaluated exactly once. Re-evaluating it a second time to check truthiness
				// (instead of reusing this value) would run its side effects twice when it doesn't already decide the result.
				let left = evaluate(environment, left)?;
				let Value::Boolean(left) = left else {
					return Err(Diagnostic::runtime(format!("condition must be a boolean, found {}", left.type_tag_name())).into());
				};
				if matches!(operator, BinaryOperator::Or) && left {
					return Ok(Value::Boolean(true));
				}
				if matches!(operator, BinaryOperator::And) && !left {
					return Ok(Value::Boolean(false));
				}
				let right = evaluate(environment, right)?;
				return apply_binary(*operator, Value::Boolean(left), right);
			}
			let left = evaluate(environment, left)?;
			let right = evaluate(environment, right)?;
			apply_binary(*operator, left, right)
		},
		Expression::Not(operand) => Ok(Value::Boolean(!is_truthy(environment, operand)?)),
		Expression::Call { name, arguments } => {
			let callee = environment.lookup_function(name).ok_or_else(|| Diagnostic::runtime(format!("\"{name}\" is not defined")))?;
			let arguments = arguments.iter().map(|argument| evaluate(environment, argument)).collect::<anyhow::Result<Vec<_>>>()?;
			call(environment, &callee, &arguments)
		},
		Expression::MethodCall { receiver, name, arguments } => {
			let receiver = evaluate(environment, receiver)?;
			let method = environment
				.lookup_method(receiver.type_tag(), name)
				.ok_or_else(|| Diagnostic::runtime(format!("no method \"{name}\" on {}", receiver.type_tag_name())))?;
			let mut call_arguments = vec![receiver];
			for argument in arguments {
				call_arguments.push(evaluate(environment, argument)?);
			}
			method.0(environment, &call_arguments)
		},
		Expression::Index { array, index } => {
			let array = evaluate(environment, array)?;
			let Value::Sequence(sequence) = array else {
				return Err(Diagnostic::runtime("only a sequence can be indexed").into());
			};
			let index = evaluate_index(environment, index)?;
			sequence
				.borrow()
				.get(index)
				.cloned()
				.ok_or_else(|| Diagnostic::runtime(format!("index {index} out of range")).into())
		},
	}
}

/// Invokes a callable [`Value`] (native or user-defined) with already-evaluated arguments.
pub fn call(environment: &mut Environment, callee: &Value, arguments: &[Value]) -> anyhow::Result<Value> {
	match callee {
		Value::Native(native) => native.0(environment, arguments),
		Value::Function(closure) => {
			let call_frame = environment.new_call_frame(closure.declaring_scope, &closure.parameters, arguments);
			let previous = environment.set_current(call_frame);
			let outcome = execute_block(environment, &closure.body);
			environment.set_current(previous);
			match outcome? {
				ControlFlow::Returned(value) => Ok(value),
				ControlFlow::Normal => Ok(Value::Nil),
			}
		},
		other => Err(Diagnostic::runtime(format!("{} is not callable", other.type_tag_name())).into()),
	}
}

/// The binary-operator coercion lattice, dispatched on the *left* operand's type:
///
/// - left integer/float: the right operand may be a number directly, or a string parsed as one (an integer left parses the string as an integer, a
///   float left as a float; a parse failure is a runtime error). A number paired with a float widens the integer side. Float division by zero is
///   left to IEEE semantics (inf/NaN); integer division by zero is a runtime error.
/// - left string: only `+` is defined, concatenating the right operand's [`Value::to_display_string`]; every other operator, including `==`/`!=`
///   and ordering, is rejected with a runtime diagnostic.
/// - left boolean: only `==`/`!=` against another boolean; there is no implicit "zero means true" coercion from numbers.
/// - anything else: `==`/`!=` compare structurally against a value of the same kind, every other operator is rejected.
fn apply_binary(operator: BinaryOperator, left: Value, right: Value) -> anyhow::Result<Value> {
	use BinaryOperator::{Add, And, Divide, Equal, Greater, GreaterEqual, Less, LessEqual, Multiply, NotEqual, Or, Subtract};

	if matches!(operator, And | Or) {
		let (Value::Boolean(left), Value::Boolean(right)) = (&left, &right) else {
			return Err(Diagnostic::runtime(format!(
				"operator {operator:?} requires boolean operands, found {} and {}",
				left.type_tag_name(),
				right.type_tag_name()
			))
			.into());
		};
		return Ok(Value::Boolean(if matches!(operator, And) { *left && *right } else { *left || *right }));
	}

	if let Value::String(left) = &left {
		return match operator {
			Add => Ok(Value::String(Rc::from(format!("{left}{}", right.to_display_string())))),
			_ => Err(Diagnostic::runtime(format!("operator {operator:?} not applicable to string")).into()),
		};
	}

	if let Value::Boolean(left) = left {
		return match (operator, right) {
			(Equal, Value::Boolean(right)) => Ok(Value::Boolean(left == right)),
			(NotEqual, Value::Boolean(right)) => Ok(Value::Boolean(left != right)),
			(_, right) => Err(Diagnostic::runtime(format!("operator {operator:?} not applicable to boolean and {}", right.type_tag_name())).into()),
		};
	}

	if let left @ (Value::Integer(_) | Value::Float(_)) = left {
		let right = coerce_numeric_operand(&left, right)?;
		if matches!(left, Value::Float(_)) || matches!(right, Value::Float(_)) {
			let left = as_float(&left);
			let right = as_float(&right);
			return Ok(match operator {
				Add => Value::Float(left + right),
				Subtract => Value::Float(left - right),
				Multiply => Value::Float(left * right),
				Divide => Value::Float(left / right),
				Less => Value::Boolean(left < right),
				Greater => Value::Boolean(left > right),
				LessEqual => Value::Boolean(left <= right),
				GreaterEqual => Value::Boolean(left >= right),
				Equal => Value::Boolean(left == right),
				NotEqual => Value::Boolean(left != right),
				And | Or => unreachable!("handled above"),
			});
		}
		let (Value::Integer(left), Value::Integer(right)) = (left, right) else {
			unreachable!("neither side is a float, so both matched Integer above");
		};
		return match operator {
			Add => Ok(Value::Integer(left + right)),
			Subtract => Ok(Value::Integer(left - right)),
			Multiply => Ok(Value::Integer(left * right)),
			Divide if right == 0 => Err(Diagnostic::runtime("integer division by zero").into()),
			Divide => Ok(Value::Integer(left / right)),
			Less => Ok(Value::Boolean(left < right)),
			Greater => Ok(Value::Boolean(left > right)),
			LessEqual => Ok(Value::Boolean(left <= right)),
			GreaterEqual => Ok(Value::Boolean(left >= right)),
			Equal => Ok(Value::Boolean(left == right)),
			NotEqual => Ok(Value::Boolean(left != right)),
			And | Or => unreachable!("handled above"),
		};
	}

	match operator {
		Equal => Ok(Value::Boolean(values_equal(&left, &right))),
		NotEqual => Ok(Value::Boolean(!values_equal(&left, &right))),
		_ => Err(Diagnostic::runtime(format!("operator {operator:?} not defined for {} and {}", left.type_tag_name(), right.type_tag_name())).into()),
	}
}

/// Coerces `value` against `anchor`'s numeric type so it can be combined with it: numbers pass through unchanged, a string is parsed as an integer
/// or a float depending on which `anchor` is (a parse failure is a runtime error), and anything else is rejected outright.
fn coerce_numeric_operand(anchor: &Value, value: Value) -> anyhow::Result<Value> {
	match value {
		number @ (Value::Integer(_) | Value::Float(_)) => Ok(number),
		Value::String(text) if matches!(anchor, Value::Integer(_)) => match text.parse::<i64>() {
			Ok(value) => Ok(Value::Integer(value)),
			Err(_) => Err(Diagnostic::runtime(format!("could not parse \"{text}\" as an integer")).into()),
		},
		Value::String(text) if matches!(anchor, Value::Float(_)) => match text.parse::<f64>() {
			Ok(value) => Ok(Value::Float(value)),
			Err(_) => Err(Diagnostic::runtime(format!("could not parse \"{text}\" as a float")).into()),
		},
		other => Err(Diagnostic::runtime(format!("operator not defined for {} and {}", anchor.type_tag_name(), other.type_tag_name())).into()),
	}
}

fn as_float(value: &Value) -> f64 {
	match value {
		Value::Integer(value) => *value as f64,
		Value::Float(value) => *value,
		_ => unreachable!("caller already matched on Integer/Float"),
	}
}

fn values_equal(left: &Value, right: &Value) -> bool {
	match (left, right) {
		(Value::Integer(left), Value::Integer(right)) => left == right,
		(Value::Float(left), Value::Float(right)) => left == right,
		(Value::Integer(left), Value::Float(right)) | (Value::Float(right), Value::Integer(left)) => (*left as f64) == *right,
		(Value::String(left), Value::String(right)) => left == right,
		(Value::Boolean(left), Value::Boolean(right)) => left == right,
		(Value::Nil, Value::Nil) => true,
		(Value::Sequence(left), Value::Sequence(right)) => Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow(),
		_ => false,
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		values_equal(self, other)
	}
}

impl Value {
	/// A lowercase type name for error messages (`"integer"`, `"sequence"`, and so on); distinct from [`TypeTag`]'s `Debug` form.
	#[must_use]
	pub fn type_tag_name(&self) -> &'static str {
		match self.type_tag() {
			TypeTag::Integer => "integer",
			TypeTag::Float => "float",
			TypeTag::String => "string",
			TypeTag::Boolean => "boolean",
			TypeTag::Nil => "nil",
			TypeTag::Sequence => "sequence",
			TypeTag::Function => "function",
		}
	}
}

/// Reads a single line from the environment's input handle, trimming the trailing newline. Used by the `input!` native function; lives here rather than in
/// `stdlib` since it needs `BufRead::read_line`, which isn't otherwise pulled into scope.
pub fn read_line(environment: &mut Environment) -> anyhow::Result<String> {
	let mut line = String::new();
	environment
		.input
		.read_line(&mut line)
		.map_err(|error| Diagnostic::interpreter(format!("failed to read input: {error}")))?;
	while line.ends_with(['\n', '\r']) {
		line.pop();
	}
	Ok(line)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{parser, runtime::Environment};

	fn run(source: &str) -> anyhow::Result<Environment<'static>> {
		let program = parser::parse(&mut crate::lexer::tokenize(source)?)?;
		let mut environment = Environment::new(
			Box::leak(Box::new(std::io::sink())),
			Box::leak(Box::new(std::io::sink())),
			Box::leak(Box::new(std::io::empty())),
		);
		crate::stdlib::register_core_library(&mut environment);
		execute_block(&mut environment, &program.statements)?;
		Ok(environment)
	}

	#[test]
	fn integer_and_float_arithmetic_widens_to_float() {
		let environment = run("x := 6.5 + 4 - 0.5").unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::Float(value)) if (value - 10.0).abs() < f64::EPSILON));
	}

	#[test]
	fn integer_division_by_zero_is_a_runtime_error() {
		assert!(run("x := 1 / 0").is_err());
	}

	#[test]
	fn float_division_by_zero_produces_infinity() {
		let environment = run("x := 1.0 / 0.0").unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::Float(value)) if value.is_infinite()));
	}

	#[test]
	fn string_concatenation_coerces_the_other_operand() {
		let environment = run(r#"x := "n=" + 5"#).unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::String(value)) if &*value == "n=5"));
	}

	#[test]
	fn and_short_circuits_without_evaluating_the_right_operand() {
		let environment = run("x := false && (1 / 0 == 0)").unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::Boolean(false))));
	}

	#[test]
	fn or_evaluates_its_left_operand_exactly_once_when_it_does_not_short_circuit() {
		let environment = run(
			"log := []\n\
			 def mark() {\n\
			 \tlog += 1\n\
			 \treturn false\n\
			 }\n\
			 x := mark() || true",
		)
		.unwrap();
		let Some(Value::Sequence(log)) = environment.get_variable("log") else {
			panic!("expected a sequence");
		};
		assert_eq!(log.borrow().len(), 1);
		assert!(matches!(environment.get_variable("x"), Some(Value::Boolean(true))));
	}

	#[test]
	fn and_and_or_combine_two_booleans_when_neither_side_short_circuits() {
		let environment = run("a := true && false\nb := false || true").unwrap();
		assert!(matches!(environment.get_variable("a"), Some(Value::Boolean(false))));
		assert!(matches!(environment.get_variable("b"), Some(Value::Boolean(true))));
	}

	#[test]
	fn integer_left_operand_parses_a_string_right_operand_as_a_number() {
		let environment = run(r#"x := 5 + "3""#).unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::Integer(8))));
	}

	#[test]
	fn string_left_operand_concatenates_rather_than_parsing_a_number_on_the_right() {
		let environment = run(r#"x := "3" + 5"#).unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::String(value)) if &*value == "35"));
	}

	#[test]
	fn integer_plus_an_unparseable_string_is_a_runtime_error() {
		assert!(run(r#"x := 5 + "not a number""#).is_err());
	}

	#[test]
	fn string_ordering_and_arithmetic_other_than_concatenation_are_rejected() {
		assert!(run(r#"x := "a" < "b""#).is_err());
		assert!(run(r#"x := "a" - "b""#).is_err());
	}

	#[test]
	fn string_equality_and_inequality_are_also_rejected() {
		assert!(run(r#"x := "a" == "a""#).is_err());
		assert!(run(r#"x := "a" != "b""#).is_err());
	}

	#[test]
	fn boolean_compared_against_a_non_boolean_is_a_runtime_error() {
		assert!(run("x := true == 1").is_err());
	}

	#[test]
	fn function_call_sees_its_declaring_scope_not_the_caller() {
		let environment = run(
			"x := 1\n\
			 def f() { return x }\n\
			 def g() {\n\
			 \tx := 99\n\
			 \treturn f()\n\
			 }\n\
			 result := g()",
		)
		.unwrap();
		assert!(matches!(environment.get_variable("result"), Some(Value::Integer(1))));
	}

	#[test]
	fn while_loop_accumulates_and_stops_on_false_condition() {
		let environment = run(
			"i := 0\n\
			 total := 0\n\
			 while i < 5 {\n\
			 \ttotal += i\n\
			 \ti += 1\n\
			 }",
		)
		.unwrap();
		assert!(matches!(environment.get_variable("total"), Some(Value::Integer(10))));
	}

	#[test]
	fn if_elsif_else_picks_the_first_truthy_branch() {
		let environment = run(
			"x := 2\n\
			 if x == 1 {\n\
			 \tresult := \"one\"\n\
			 } elsif x == 2 {\n\
			 \tresult := \"two\"\n\
			 } else {\n\
			 \tresult := \"other\"\n\
			 }",
		)
		.unwrap();
		assert!(matches!(environment.get_variable("result"), Some(Value::String(value)) if &*value == "two"));
	}

	#[test]
	fn compound_add_assign_on_a_sequence_appends_in_place() {
		let environment = run("a := [6]\na += 7").unwrap();
		let Some(Value::Sequence(sequence)) = environment.get_variable("a") else {
			panic!("expected a sequence");
		};
		assert_eq!(*sequence.borrow(), vec![Value::Integer(6), Value::Integer(7)]);
	}

	#[test]
	fn array_index_assignment_mutates_in_place() {
		let environment = run("a := [1, 2, 3]\na[1] = 9").unwrap();
		let Some(Value::Sequence(sequence)) = environment.get_variable("a") else {
			panic!("expected a sequence");
		};
		assert_eq!(*sequence.borrow(), vec![Value::Integer(1), Value::Integer(9), Value::Integer(3)]);
	}
}
