//! Dynamically typed template values.
//!
//! Templates are nested [`Value::Array`]s. Their props are [`Object`]s, which keep insertion order so that composite
//! encodings (`name(value) name2(value2)`) come out the same way every time.

use crate::component::ComponentRef;
use core::fmt::{self, Debug, Formatter};
use indexmap::IndexMap;
use std::{borrow::Cow, rc::Rc};

#[derive(Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Array(Vec<Value>),
	Object(Object),
	Function(Callback),
	/// A component class reference, valid as the first item of a template.
	Component(ComponentRef),
	/// A component identifier that is resolved through a [`Resolver`](`crate::resolver::Resolver`).
	Symbol(String),
}

impl Value {
	#[must_use]
	pub fn symbol(id: impl Into<String>) -> Self {
		Self::Symbol(id.into())
	}

	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(string) => Some(string),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			Self::Number(number) => Some(number),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match *self {
			Self::Bool(bool) => Some(bool),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Self::Array(array) => Some(array),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_object(&self) -> Option<&Object> {
		match self {
			Self::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Truthiness as used by class name flattening.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Self::Null => false,
			Self::Bool(bool) => *bool,
			Self::Number(number) => *number != 0.0 && !number.is_nan(),
			Self::String(string) => !string.is_empty(),
			Self::Array(_) | Self::Object(_) | Self::Function(_) | Self::Component(_) | Self::Symbol(_) => true,
		}
	}

	#[must_use]
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "boolean",
			Self::Number(_) => "number",
			Self::String(_) => "string",
			Self::Array(_) => "array",
			Self::Object(_) => "object",
			Self::Function(_) => "function",
			Self::Component(_) => "component",
			Self::Symbol(_) => "symbol",
		}
	}

	/// Plain string conversion, used where no more specific coercion applies.
	#[must_use]
	pub fn stringify(&self) -> String {
		match self {
			Self::Null => "null".to_string(),
			Self::Bool(bool) => bool.to_string(),
			Self::Number(number) => format_number(*number),
			Self::String(string) => string.clone(),
			Self::Array(array) => array.iter().map(Self::stringify).collect::<Vec<_>>().join(","),
			Self::Object(_) => "[object Object]".to_string(),
			Self::Function(callback) => callback.name().to_string(),
			Self::Component(component) => component.name().to_string(),
			Self::Symbol(id) => id.clone(),
		}
	}
}

#[must_use]
pub fn format_number(number: f64) -> String {
	if number == 0.0 {
		"0".to_string()
	} else if number.is_nan() {
		"NaN".to_string()
	} else if number.is_infinite() {
		if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
	} else if number.fract() == 0.0 && number.abs() < 1e15 {
		format!("{:.0}", number)
	} else {
		number.to_string()
	}
}

/// Type-sensitive structural equality.
///
/// Object entries compare regardless of order, arrays element by element. Functions compare as [`Callback`]s do,
/// component classes and symbols by identity. Values of different types are never equal, so `0` and `"0"` differ.
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Bool(a), Value::Bool(b)) => a == b,
		#[allow(clippy::float_cmp)]
		(Value::Number(a), Value::Number(b)) => a == b,
		(Value::String(a), Value::String(b)) => a == b,
		(Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(a, b)| deep_equal(a, b)),
		(Value::Object(a), Value::Object(b)) => a == b,
		(Value::Function(a), Value::Function(b)) => a == b,
		(Value::Component(a), Value::Component(b)) => a == b,
		(Value::Symbol(a), Value::Symbol(b)) => a == b,
		_ => false,
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		deep_equal(self, other)
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("null"),
			Self::Bool(bool) => Debug::fmt(bool, f),
			Self::Number(number) => f.write_str(&format_number(*number)),
			Self::String(string) => Debug::fmt(string, f),
			Self::Array(array) => f.debug_list().entries(array).finish(),
			Self::Object(object) => Debug::fmt(object, f),
			Self::Function(callback) => Debug::fmt(callback, f),
			Self::Component(component) => Debug::fmt(component, f),
			Self::Symbol(id) => write!(f, "Symbol({:?})", id),
		}
	}
}

impl From<()> for Value {
	fn from((): ()) -> Self {
		Self::Null
	}
}

impl From<bool> for Value {
	fn from(bool: bool) -> Self {
		Self::Bool(bool)
	}
}

impl From<f64> for Value {
	fn from(number: f64) -> Self {
		Self::Number(number)
	}
}

impl From<f32> for Value {
	fn from(number: f32) -> Self {
		Self::Number(number.into())
	}
}

impl From<i32> for Value {
	fn from(number: i32) -> Self {
		Self::Number(number.into())
	}
}

impl From<u32> for Value {
	fn from(number: u32) -> Self {
		Self::Number(number.into())
	}
}

impl From<i64> for Value {
	#[allow(clippy::cast_precision_loss)]
	fn from(number: i64) -> Self {
		Self::Number(number as f64)
	}
}

impl From<usize> for Value {
	#[allow(clippy::cast_precision_loss)]
	fn from(number: usize) -> Self {
		Self::Number(number as f64)
	}
}

impl From<&str> for Value {
	fn from(string: &str) -> Self {
		Self::String(string.to_string())
	}
}

impl From<String> for Value {
	fn from(string: String) -> Self {
		Self::String(string)
	}
}

impl From<&String> for Value {
	fn from(string: &String) -> Self {
		Self::String(string.clone())
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(array: Vec<T>) -> Self {
		Self::Array(array.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(option: Option<T>) -> Self {
		option.map_or(Self::Null, Into::into)
	}
}

impl From<Object> for Value {
	fn from(object: Object) -> Self {
		Self::Object(object)
	}
}

impl From<Callback> for Value {
	fn from(callback: Callback) -> Self {
		Self::Function(callback)
	}
}

impl From<ComponentRef> for Value {
	fn from(component: ComponentRef) -> Self {
		Self::Component(component)
	}
}

impl From<&ComponentRef> for Value {
	fn from(component: &ComponentRef) -> Self {
		Self::Component(component.clone())
	}
}

/// An insertion-ordered string-keyed map. Keys are unique; inserting an existing key replaces its value in place.
///
/// Equality ignores entry order and compares values with [`deep_equal`].
#[derive(Clone, Default, PartialEq)]
pub struct Object(IndexMap<String, Value>);
impl Object {
	#[must_use]
	pub fn new() -> Self {
		Self(IndexMap::new())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	#[must_use]
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(key.into(), value.into())
	}

	/// Removes `key`, keeping the order of the remaining entries.
	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.0.shift_remove(key)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
		self.0.keys().map(String::as_str)
	}
}

impl Debug for Object {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
	}
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Object {
	fn from(entries: [(K, V); N]) -> Self {
		entries.into_iter().collect()
	}
}

impl IntoIterator for Object {
	type Item = (String, Value);
	type IntoIter = indexmap::map::IntoIter<String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

/// What a [`Callback`] is called with.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	pub name: String,
	pub detail: Value,
}
impl Event {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			detail: Value::Null,
		}
	}

	#[must_use]
	pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
		self.detail = detail.into();
		self
	}
}

/// A shared event handler.
///
/// Two callbacks are equal if they share the same handler allocation, or if both are named and the names match, so
/// props holding recreated named callbacks still compare equal. Bound listeners are tracked by
/// [`identity`](`Callback::identity`) instead, and are rebound whenever the handler changes.
#[derive(Clone)]
pub struct Callback {
	name: Cow<'static, str>,
	handler: Rc<dyn Fn(&Event)>,
}
impl Callback {
	pub fn new(name: impl Into<Cow<'static, str>>, handler: impl Fn(&Event) + 'static) -> Self {
		Self {
			name: name.into(),
			handler: Rc::new(handler),
		}
	}

	/// A callback that only ever equals its own clones.
	pub fn anonymous(handler: impl Fn(&Event) + 'static) -> Self {
		Self::new("", handler)
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn call(&self, event: &Event) {
		(self.handler)(event);
	}

	/// Address of the shared handler, stable across clones.
	#[must_use]
	pub fn identity(&self) -> usize {
		Rc::as_ptr(&self.handler).cast::<()>() as usize
	}
}

impl PartialEq for Callback {
	fn eq(&self, other: &Self) -> bool {
		self.identity() == other.identity() || (!self.name.is_empty() && self.name == other.name)
	}
}

impl Debug for Callback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback").field("name", &self.name).field("identity", &self.identity()).finish()
	}
}
