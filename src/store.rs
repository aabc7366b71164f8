//! Application state: commands, the command queue and reducers.

use crate::{
	error::CommandConflictError,
	value::{deep_equal, Value},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::{hash_map::Entry, HashMap};
use std::{borrow::Cow, collections::VecDeque, rc::Rc};
use tracing::{error, instrument, trace, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
	pub name: String,
	pub args: Value,
}
impl Command {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			args: Value::Null,
		}
	}

	#[must_use]
	pub fn with_args(mut self, args: impl Into<Value>) -> Self {
		self.args = args.into();
		self
	}
}

/// A single-threaded command queue, shared by the root of a render tree and everything rendered into it.
///
/// Dispatching only enqueues. The [`App`](`crate::app::App`) drains the queue one command at a time, each command's
/// render pass completing before the next command is reduced.
#[derive(Clone, Default)]
pub struct CommandSink(Rc<RefCell<VecDeque<Command>>>);
impl CommandSink {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn dispatch(&self, command: Command) {
		trace!(command = %command.name, "Queued command");
		self.0.borrow_mut().push_back(command);
	}

	pub fn pop(&self) -> Option<Command> {
		self.0.borrow_mut().pop_front()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}
}

impl Debug for CommandSink {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CommandSink").field("pending", &self.len()).finish()
	}
}

pub type Handler = Rc<dyn Fn(&Value, &Value) -> Value>;

/// A named set of command handlers. Each handler maps `(state, args)` to the next state.
pub struct Reducer {
	name: Cow<'static, str>,
	commands: HashMap<String, Handler>,
}
impl Reducer {
	pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
		Self {
			name: name.into(),
			commands: HashMap::new(),
		}
	}

	#[must_use]
	pub fn on(mut self, command: impl Into<String>, handler: impl Fn(&Value, &Value) -> Value + 'static) -> Self {
		let command = command.into();
		if self.commands.contains_key(&command) {
			warn!(reducer = %self.name, %command, "Command handler redefined within the same reducer. The later definition wins.");
		}
		self.commands.insert(command, Rc::new(handler));
		self
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Debug for Reducer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reducer").field("name", &self.name).field("commands", &self.commands.keys().collect::<Vec<_>>()).finish()
	}
}

/// Merges reducers into one command table.
///
/// # Errors
///
/// Fails with [`CommandConflictError`] if two reducers define the same command name.
#[instrument(skip(reducers))]
pub fn combine(reducers: impl IntoIterator<Item = Reducer>) -> Result<CombinedReducer, CommandConflictError> {
	let mut handlers = HashMap::<String, (Cow<'static, str>, Handler)>::new();
	for reducer in reducers {
		for (command, handler) in reducer.commands {
			match handlers.entry(command) {
				Entry::Occupied(occupied) => {
					error!(command = %occupied.key(), first = %occupied.get().0, second = %reducer.name, "Conflicting command definitions");
					return Err(CommandConflictError { command: occupied.key().clone() });
				}
				Entry::Vacant(vacant) => {
					vacant.insert((reducer.name.clone(), handler));
				}
			}
		}
	}
	Ok(CombinedReducer { handlers })
}

#[derive(Default)]
pub struct CombinedReducer {
	handlers: HashMap<String, (Cow<'static, str>, Handler)>,
}
impl CombinedReducer {
	/// Returns the next state, or [`None`] if no reducer handles `command`.
	#[must_use]
	pub fn reduce(&self, state: &Value, command: &Command) -> Option<Value> {
		let (_, handler) = self.handlers.get(&command.name)?;
		Some(handler(state, &command.args))
	}

	#[must_use]
	pub fn handles(&self, command: &str) -> bool {
		self.handlers.contains_key(command)
	}
}

impl Debug for CombinedReducer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.handlers.iter().map(|(command, (reducer, _))| (command, reducer))).finish()
	}
}

#[derive(Debug)]
pub struct Store {
	state: Value,
	reducer: CombinedReducer,
}
impl Store {
	#[must_use]
	pub fn new(reducer: CombinedReducer, initial_state: Value) -> Self {
		Self {
			state: initial_state,
			reducer,
		}
	}

	#[must_use]
	pub fn state(&self) -> &Value {
		&self.state
	}

	/// Reduces `command` into the state. Returns whether the state changed.
	///
	/// Commands no reducer handles are logged and otherwise ignored.
	#[instrument(skip(self), fields(command = %command.name))]
	pub fn apply(&mut self, command: &Command) -> bool {
		if cfg!(feature = "dangerous-logging") {
			trace!(args = ?command.args, "Reducing");
		}
		match self.reducer.reduce(&self.state, command) {
			None => {
				warn!("No reducer handles this command. Ignoring it.");
				false
			}
			Some(next) if deep_equal(&next, &self.state) => {
				trace!("State unchanged");
				false
			}
			Some(next) => {
				self.state = next;
				true
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{combine, Command, Reducer, Store};
	use crate::value::{Object, Value};

	fn counter() -> Reducer {
		Reducer::new("counter")
			.on("increment", |state, _| {
				let count = state.as_object().and_then(|o| o.get("count")).and_then(Value::as_f64).unwrap_or(0.0);
				Object::from([("count", count + 1.0)]).into()
			})
			.on("reset", |_, _| Object::from([("count", 0)]).into())
	}

	#[test]
	fn conflicting_commands_fail_at_combination() {
		let other = Reducer::new("other").on("reset", |state, _| state.clone());
		let error = combine([counter(), other]).unwrap_err();
		assert_eq!(error.command, "reset");
	}

	#[test]
	fn store_reduces_known_commands_only() {
		let mut store = Store::new(combine([counter()]).unwrap(), Object::from([("count", 0)]).into());
		assert!(store.apply(&Command::new("increment")));
		assert!(store.apply(&Command::new("increment")));
		assert_eq!(store.state(), &Value::from(Object::from([("count", 2)])));

		assert!(!store.apply(&Command::new("unknown")));
		assert!(store.apply(&Command::new("reset")));
		assert!(!store.apply(&Command::new("reset")), "Unchanged state is not a change.");
	}
}
