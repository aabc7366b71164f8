//! Canonical, comparable descriptions of template nodes.
//!
//! Descriptions are produced fresh on every render pass by [`describe`](`crate::template::describe`) and never
//! mutated afterwards.

use crate::{
	allow_list::listener_prop,
	component::ComponentRef,
	value::{Callback, Object, Value},
};
use hashbrown::HashMap;

/// Identity of a description within a keyed children list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Text(String),
	Integer(i64),
}
impl Key {
	/// Strings and integral numbers are valid keys.
	#[must_use]
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::String(text) => Some(Self::Text(text.clone())),
			#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
			Value::Number(number) if number.fract() == 0.0 && number.abs() < 9.0e15 => Some(Self::Integer(*number as i64)),
			_ => None,
		}
	}

	#[must_use]
	pub fn to_value(&self) -> Value {
		match self {
			Self::Text(text) => Value::String(text.clone()),
			Self::Integer(integer) => Value::from(*integer),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Description {
	Component(ComponentDescription),
	Element(ElementDescription),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDescription {
	pub component: ComponentRef,
	/// Props without `key`.
	pub props: Object,
	pub children: Vec<Description>,
	pub key: Option<Key>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementDescription {
	pub name: String,
	/// Mutually exclusive with non-empty `children`.
	pub text: Option<String>,
	pub children: Vec<Description>,
	pub props: ElementProps,
	pub key: Option<Key>,
}

/// Normalized element props. Every map only holds entries that survived normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementProps {
	/// By event name, not by prop name.
	pub listeners: HashMap<String, Callback>,
	pub attrs: HashMap<String, String>,
	pub dataset: HashMap<String, String>,
	pub class_name: Option<String>,
	pub style: HashMap<String, String>,
	/// Passed through to the document as properties, without coercion.
	pub metadata: HashMap<String, Value>,
}
impl ElementProps {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.listeners.is_empty()
			&& self.attrs.is_empty()
			&& self.dataset.is_empty()
			&& self.class_name.is_none()
			&& self.style.is_empty()
			&& self.metadata.is_empty()
	}
}

impl Description {
	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			Self::Component(component) => component.key.as_ref(),
			Self::Element(element) => element.key.as_ref(),
		}
	}

	#[must_use]
	pub fn is_component(&self) -> bool {
		matches!(self, Self::Component(_))
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		matches!(self, Self::Element(_))
	}

	/// Whether a node rendered from `self` can be updated in place to `other`.
	///
	/// Same variant and same component class or element name. Keys don't matter here.
	#[must_use]
	pub fn is_compatible(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Component(a), Self::Component(b)) => a.component == b.component,
			(Self::Element(a), Self::Element(b)) => a.name == b.name,
			_ => false,
		}
	}

	/// Serializes this description back into a template that describes to an equal description.
	#[must_use]
	pub fn as_template(&self) -> Value {
		match self {
			Self::Component(component) => component.as_template(),
			Self::Element(element) => element.as_template(),
		}
	}
}

impl ComponentDescription {
	#[must_use]
	pub fn as_template(&self) -> Value {
		let mut template = vec![Value::Component(self.component.clone())];
		let mut props = self.props.clone();
		if let Some(key) = &self.key {
			props.insert("key", key.to_value());
		}
		if !props.is_empty() {
			template.push(props.into());
		}
		template.extend(self.children.iter().map(Description::as_template));
		Value::Array(template)
	}
}

impl ElementDescription {
	#[must_use]
	pub fn as_template(&self) -> Value {
		let mut template = vec![Value::String(self.name.clone())];

		let mut props = Object::new();
		if let Some(key) = &self.key {
			props.insert("key", key.to_value());
		}
		for (event, listener) in sorted(&self.props.listeners) {
			if let Some(prop) = listener_prop(event) {
				props.insert(prop, listener.clone());
			}
		}
		for (name, value) in sorted(&self.props.attrs) {
			props.insert(name.as_str(), value.as_str());
		}
		if !self.props.dataset.is_empty() {
			props.insert("dataset", sorted(&self.props.dataset).map(|(k, v)| (k.as_str(), v.as_str())).collect::<Object>());
		}
		if let Some(class_name) = &self.props.class_name {
			props.insert("class", class_name.as_str());
		}
		if !self.props.style.is_empty() {
			props.insert("style", sorted(&self.props.style).map(|(k, v)| (k.as_str(), v.as_str())).collect::<Object>());
		}
		if !self.props.metadata.is_empty() {
			props.insert("metadata", sorted(&self.props.metadata).map(|(k, v)| (k.as_str(), v.clone())).collect::<Object>());
		}
		if !props.is_empty() {
			template.push(props.into());
		}

		match &self.text {
			Some(text) => template.push(Value::String(text.clone())),
			None => template.extend(self.children.iter().map(Description::as_template)),
		}
		Value::Array(template)
	}
}

fn sorted<V>(map: &HashMap<String, V>) -> impl Iterator<Item = (&String, &V)> {
	let mut entries = map.iter().collect::<Vec<_>>();
	entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
	entries.into_iter()
}
