/// The `value` module, which defines runtime values, closures, and the type-tag used for method dispatch.
pub mod value;

use std::{
	collections::HashMap,
	io::{BufRead, Write},
};

use crate::diagnostic::Diagnostic;

use value::{NativeFunction, TypeTag, Value};

/// One entry on the scope stack. Holds its own variable and function bindings, plus the index of its parent frame in the arena. Frames are never removed
/// from the arena — see the module-level docs on [`Environment`] for why that's the simplest faithful design for closures.
#[derive(Debug, Default)]
struct Frame {
	parent: Option<usize>,
	variables: HashMap<String, Value>,
	functions: HashMap<String, Value>,
}

/// The runtime environment: an arena of scope frames addressed by index, a method-dispatch table keyed by runtime type, and the three I/O handles native
/// functions write to and read from.
///
/// # Why an arena, not a `Vec` that's pushed and popped
///
/// A function declared inside some scope `S` must, when later called from anywhere, resolve its free variables against `S` — not against whatever scope
/// happens to be active at the call site. If frames were freed on return, a closure that outlives its declaring call (returned from a function, stored in
/// a sequence, etc.) would dangle. Frames here are addressed by a stable index into `frames` and are never removed; "pushing"/"popping" a frame is
/// simulated by [`Environment::set_current`], which swaps `current` and hands back the previous value so the caller can restore it.
pub struct Environment<'io> {
	frames: Vec<Frame>,
	current: usize,
	methods: HashMap<TypeTag, HashMap<&'static str, NativeFunction>>,
	pub output: &'io mut dyn Write,
	pub diagnostic: &'io mut dyn Write,
	pub input: &'io mut dyn BufRead,
}

/// The index of the always-present global frame.
pub const GLOBAL: usize = 0;

impl<'io> Environment<'io> {
	#[must_use]
	pub fn new(output: &'io mut dyn Write, diagnostic: &'io mut dyn Write, input: &'io mut dyn BufRead) -> Self {
		Self {
			frames: vec![Frame::default()],
			current: GLOBAL,
			methods: HashMap::new(),
			output,
			diagnostic,
			input,
		}
	}

	/// The frame the evaluator is currently executing in.
	#[must_use]
	pub const fn current_frame(&self) -> usize {
		self.current
	}

	fn frame(&self, id: usize) -> &Frame {
		self.frames.get(id).expect("frame id handed out by Environment always stays valid")
	}

	fn frame_mut(&mut self, id: usize) -> &mut Frame {
		self.frames.get_mut(id).expect("frame id handed out by Environment always stays valid")
	}

	/// Walks scopes innermost-first looking for `name`, falling back to the function table (so a user function can be read as a first-class value).
	#[must_use]
	pub fn get_variable(&self, name: &str) -> Option<Value> {
		let mut cursor = Some(self.current);
		while let Some(id) = cursor {
			let frame = self.frame(id);
			if let Some(value) = frame.variables.get(name) {
				return Some(value.clone());
			}
			if let Some(value) = frame.functions.get(name) {
				return Some(value.clone());
			}
			cursor = frame.parent;
		}
		None
	}

	/// Binds a fresh variable in the innermost frame. Fails if `name` already exists *in that same frame* — collisions in an outer frame are fine,
	/// because Noot supports shadowing (unlike the stricter teacher language this interpreter is adapted from, which forbids redeclaration anywhere up
	/// the parent chain; Noot's testable shadowing scenario requires the inner declaration to succeed).
	pub fn declare_variable(&mut self, name: &str, value: Value) -> anyhow::Result<()> {
		let current = self.current;
		let frame = self.frame_mut(current);
		if frame.variables.contains_key(name) {
			return Err(Diagnostic::runtime(format!("variable \"{name}\" is already declared in this scope")).into());
		}
		frame.variables.insert(name.to_owned(), value);
		Ok(())
	}

	/// Rebinds an existing variable in whichever frame it was found in (the write-through rule: this is what makes closures over outer variables and
	/// in-place array mutation work).
	pub fn assign_variable(&mut self, name: &str, value: Value) -> anyhow::Result<()> {
		let mut cursor = Some(self.current);
		while let Some(id) = cursor {
			if self.frame(id).variables.contains_key(name) {
				self.frame_mut(id).variables.insert(name.to_owned(), value);
				return Ok(());
			}
			cursor = self.frame(id).parent;
		}
		Err(Diagnostic::runtime(format!("variable \"{name}\" is not defined")).into())
	}

	/// Resolves `name` to a sequence and mutates it in place at `index`. Fails if `name` isn't a sequence or `index` is out of range.
	pub fn set_array_index(&self, name: &str, index: usize, value: Value) -> anyhow::Result<()> {
		let Some(Value::Sequence(sequence)) = self.get_variable(name) else {
			return Err(Diagnostic::runtime(format!("\"{name}\" is not a sequence")).into());
		};
		let mut elements = sequence.borrow_mut();
		let slot = elements
			.get_mut(index)
			.ok_or_else(|| Diagnostic::runtime(format!("index {index} out of range for \"{name}\"")))?;
		*slot = value;
		Ok(())
	}

	/// Binds a callable into the innermost frame's function table.
	pub fn declare_function(&mut self, name: &str, callable: Value) {
		let current = self.current;
		self.frame_mut(current).functions.insert(name.to_owned(), callable);
	}

	/// Walks scopes looking for a callable named `name`, checking each frame's function table first and then falling back to a variable binding whose
	/// value is callable.
	#[must_use]
	pub fn lookup_function(&self, name: &str) -> Option<Value> {
		let mut cursor = Some(self.current);
		while let Some(id) = cursor {
			let frame = self.frame(id);
			if let Some(value) = frame.functions.get(name) {
				return Some(value.clone());
			}
			if let Some(value) = frame.variables.get(name) {
				if value.is_callable() {
					return Some(value.clone());
				}
			}
			cursor = frame.parent;
		}
		None
	}

	/// Allocates a fresh frame parented to `declaring_scope` (the closure anchor captured at function-declaration time, not the caller's current frame)
	/// and returns its id. Binds `parameters` positionally against `arguments`; missing arguments bind to `nil`, extra arguments are ignored.
	pub fn new_call_frame(&mut self, declaring_scope: usize, parameters: &[String], arguments: &[Value]) -> usize {
		let mut frame = Frame {
			parent: Some(declaring_scope),
			..Frame::default()
		};
		for (index, parameter) in parameters.iter().enumerate() {
			let value = arguments.get(index).cloned().unwrap_or(Value::Nil);
			frame.variables.insert(parameter.clone(), value);
		}
		self.frames.push(frame);
		self.frames.len() - 1
	}

	/// Sets the current frame and returns the previously current one, so a caller can restore it when the call returns (on any exit path, including a
	/// propagated error).
	pub fn set_current(&mut self, id: usize) -> usize {
		let previous = self.current;
		self.current = id;
		previous
	}

	/// Looks up a method by the receiver's type tag and name.
	#[must_use]
	pub fn lookup_method(&self, type_tag: TypeTag, name: &str) -> Option<NativeFunction> {
		self.methods.get(&type_tag).and_then(|table| table.get(name)).copied()
	}

	/// Registers a native method on a type tag. Used during core-library registration.
	pub fn register_method(&mut self, type_tag: TypeTag, name: &'static str, native: NativeFunction) {
		self.methods.entry(type_tag).or_default().insert(name, native);
	}

	/// Registers a native function into the global frame's function table. Used during core-library registration.
	pub fn register_native(&mut self, name: &'static str, native: NativeFunction) {
		self.frame_mut(GLOBAL).functions.insert(name.to_owned(), Value::Native(native));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_environment() -> Environment<'static> {
		Environment::new(Box::leak(Box::new(std::io::sink())), Box::leak(Box::new(std::io::sink())), Box::leak(Box::new(std::io::empty())))
	}

	#[test]
	fn shadowing_in_an_inner_frame_succeeds_and_is_restored_on_return() {
		let mut environment = test_environment();
		environment.declare_variable("x", Value::Integer(1)).unwrap();

		let inner = environment.new_call_frame(GLOBAL, &[], &[]);
		let previous = environment.set_current(inner);
		environment.declare_variable("x", Value::Integer(2)).unwrap();
		assert!(matches!(environment.get_variable("x"), Some(Value::Integer(2))));
		environment.set_current(previous);

		assert!(matches!(environment.get_variable("x"), Some(Value::Integer(1))));
	}

	#[test]
	fn assigning_an_outer_variable_from_an_inner_frame_writes_through() {
		let mut environment = test_environment();
		environment.declare_variable("x", Value::Integer(1)).unwrap();

		let inner = environment.new_call_frame(GLOBAL, &[], &[]);
		let previous = environment.set_current(inner);
		environment.assign_variable("x", Value::Integer(2)).unwrap();
		environment.set_current(previous);

		assert!(matches!(environment.get_variable("x"), Some(Value::Integer(2))));
	}

	#[test]
	fn redeclaring_in_the_same_frame_is_an_error() {
		let mut environment = test_environment();
		environment.declare_variable("x", Value::Integer(1)).unwrap();
		assert!(environment.declare_variable("x", Value::Integer(2)).is_err());
	}

	#[test]
	fn closure_call_frame_is_parented_to_the_declaring_scope_not_the_caller() {
		let mut environment = test_environment();
		environment.declare_variable("x", Value::Integer(1)).unwrap();
		let declaring_scope = environment.current_frame();

		let caller_frame = environment.new_call_frame(GLOBAL, &[], &[]);
		let previous = environment.set_current(caller_frame);
		environment.declare_variable("x", Value::Integer(99)).unwrap();

		let call_frame = environment.new_call_frame(declaring_scope, &["y".to_owned()], &[Value::Integer(5)]);
		let previous_caller = environment.set_current(call_frame);
		assert!(matches!(environment.get_variable("x"), Some(Value::Integer(1))));
		environment.set_current(previous_caller);

		environment.set_current(previous);
	}
}
