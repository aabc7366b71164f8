//! Template normalization.
//!
//! A template is `[type, props?, text | ...children]`:
//!
//! - `type` is a component class ([`Value::Component`]), a component id resolved through a
//!   [`Resolver`] ([`Value::Symbol`]) or an element name ([`Value::String`]).
//! - `props` is an optional [`Value::Object`].
//! - What follows is either a single text string (elements only) or any number of child templates.
//!   `null` and `false` children are skipped.
//!
//! `null` and `false` describe to nothing.

use crate::{
	allow_list::{allows_empty_attribute, dash_case, is_attribute, is_style_property, listener_event, FILTER_FUNCTIONS, TRANSFORM_FUNCTIONS},
	component::ComponentRef,
	description::{ComponentDescription, Description, ElementDescription, ElementProps, Key},
	error::{ComponentResolutionError, Error, InvalidTemplateError},
	resolver::Resolver,
	value::{Object, Value},
};
use tracing::trace;

/// Builds a template array, converting each item with [`Value::from`].
#[macro_export]
macro_rules! template {
	[$($item:expr),* $(,)?] => {
		$crate::Value::Array(::std::vec![$($crate::Value::from($item)),*])
	};
}

/// Builds a props [`Object`](`crate::Object`) value.
#[macro_export]
macro_rules! props {
	{$($key:expr => $value:expr),* $(,)?} => {{
		#[allow(unused_mut)]
		let mut object = $crate::Object::new();
		$(object.insert($key, $value);)*
		$crate::Value::Object(object)
	}};
}

/// Describes a template that doesn't reference components by id.
///
/// # Errors
///
/// [`Error::InvalidTemplate`] for malformed templates, [`Error::ComponentResolution`] if a [`Value::Symbol`] is
/// encountered.
pub fn describe(template: &Value) -> Result<Option<Description>, Error> {
	describe_template(template, None)
}

/// Describes a template, looking up [`Value::Symbol`] component ids in `resolver`'s cache.
///
/// # Errors
///
/// [`Error::InvalidTemplate`] for malformed templates.
/// [`ComponentResolutionError::NotLoaded`] for ids that `resolver` hasn't resolved yet.
pub fn describe_with(template: &Value, resolver: &Resolver) -> Result<Option<Description>, Error> {
	describe_template(template, Some(resolver))
}

pub(crate) fn describe_template(template: &Value, resolver: Option<&Resolver>) -> Result<Option<Description>, Error> {
	match template {
		Value::Null | Value::Bool(false) => Ok(None),
		Value::Array(items) => describe_items(items, resolver).map(Some),
		other => Err(invalid(0, "template array, null or false", other.type_name())),
	}
}

fn describe_items(items: &[Value], resolver: Option<&Resolver>) -> Result<Description, Error> {
	let first = items.first().ok_or_else(|| invalid(0, "component class or element name", "empty template"))?;

	let (props, content_start) = match items.get(1) {
		Some(Value::Object(props)) => (Some(props), 2),
		_ => (None, 1),
	};
	let content = &items[content_start..];

	match first {
		Value::Component(component) => describe_component(component.clone(), props, content, content_start, resolver),
		Value::Symbol(id) => {
			let component = resolver.and_then(|resolver| resolver.get(id)).ok_or_else(|| ComponentResolutionError::NotLoaded(id.clone()))?;
			describe_component(component, props, content, content_start, resolver)
		}
		Value::String(name) if !name.is_empty() => describe_element(name, props, content, content_start, resolver),
		other => Err(invalid(0, "component class or element name", other.type_name())),
	}
}

fn describe_component(component: ComponentRef, props: Option<&Object>, content: &[Value], content_start: usize, resolver: Option<&Resolver>) -> Result<Description, Error> {
	if let [Value::String(_)] = content {
		return Err(invalid(content_start, "child template (components can't have text content)", "string"));
	}

	let mut props = props.cloned().unwrap_or_default();
	let key = props.remove("key").map(|key| parse_key(&key)).transpose()?;
	let children = describe_children(content, content_start, resolver)?;

	Ok(Description::Component(ComponentDescription { component, props, children, key }))
}

fn describe_element(name: &str, props: Option<&Object>, content: &[Value], content_start: usize, resolver: Option<&Resolver>) -> Result<Description, Error> {
	let (props, key) = match props {
		Some(props) => normalize_element_props(props)?,
		None => (ElementProps::default(), None),
	};

	let (text, children) = match content {
		[Value::String(text)] => (Some(text.clone()), Vec::new()),
		content => (None, describe_children(content, content_start, resolver)?),
	};

	Ok(Description::Element(ElementDescription {
		name: name.to_string(),
		text,
		children,
		props,
		key,
	}))
}

fn describe_children(content: &[Value], content_start: usize, resolver: Option<&Resolver>) -> Result<Vec<Description>, Error> {
	let mut children = Vec::with_capacity(content.len());
	for (offset, item) in content.iter().enumerate() {
		match item {
			Value::Null | Value::Bool(false) => (),
			Value::Array(items) => children.push(describe_items(items, resolver)?),
			other => return Err(invalid(content_start + offset, "child template", other.type_name())),
		}
	}
	Ok(children)
}

fn parse_key(key: &Value) -> Result<Key, Error> {
	Key::from_value(key).ok_or_else(|| invalid(1, "string or integer key", key.type_name()))
}

fn normalize_element_props(props: &Object) -> Result<(ElementProps, Option<Key>), Error> {
	let mut normalized = ElementProps::default();
	let mut key = None;

	for (name, value) in props.iter() {
		match name {
			"key" => key = Some(parse_key(value)?),
			"class" => normalized.class_name = Some(flatten_class_name(value)).filter(|class_name| !class_name.is_empty()),
			"dataset" => {
				if let Value::Object(dataset) = value {
					normalized.dataset = dataset.iter().filter_map(|(k, v)| Some((k.to_string(), coerce_attribute(v, true)?))).collect();
				}
			}
			"style" => {
				if let Value::Object(style) = value {
					normalized.style = style.iter().filter_map(|(k, v)| Some((k.to_string(), coerce_style(k, v)?))).collect();
				}
			}
			"metadata" => {
				if let Value::Object(metadata) = value {
					normalized.metadata = metadata.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
				}
			}
			name => {
				if let Some(event) = listener_event(name) {
					if let Value::Function(listener) = value {
						normalized.listeners.insert(event.to_string(), listener.clone());
					}
				} else if is_attribute(name) {
					if let Some(value) = coerce_attribute(value, allows_empty_attribute(name)) {
						normalized.attrs.insert(name.to_string(), value);
					}
				} else {
					trace!(prop = name, "Dropping prop that is neither attribute nor listener");
				}
			}
		}
	}

	Ok((normalized, key))
}

/// Attribute value coercion.
///
/// `null`, functions and component references are omitted. Arrays are concatenated, objects encoded as
/// `name(value) name2(value2)`. Empty results are omitted unless `allow_empty` is set.
#[must_use]
pub fn coerce_attribute(value: &Value, allow_empty: bool) -> Option<String> {
	let coerced = match value {
		Value::Null | Value::Function(_) | Value::Component(_) | Value::Symbol(_) => return None,
		Value::Array(items) => items.iter().filter_map(|item| coerce_attribute(item, true)).collect::<String>(),
		Value::Object(object) => object
			.iter()
			.filter_map(|(name, value)| Some(format!("{}({})", name, coerce_attribute(value, true)?)))
			.collect::<Vec<_>>()
			.join(" "),
		Value::Bool(_) | Value::Number(_) | Value::String(_) => value.stringify(),
	};
	Some(coerced).filter(|coerced| allow_empty || !coerced.is_empty())
}

/// Class name flattening: strings are trimmed, arrays flattened and space-joined without falsy entries, objects
/// reduced to their keys with truthy values.
#[must_use]
pub fn flatten_class_name(value: &Value) -> String {
	match value {
		Value::String(string) => string.trim().to_string(),
		Value::Array(items) => items
			.iter()
			.filter(|item| item.is_truthy())
			.map(flatten_class_name)
			.filter(|class_name| !class_name.is_empty())
			.collect::<Vec<_>>()
			.join(" "),
		Value::Object(object) => object.iter().filter(|(_, value)| value.is_truthy()).map(|(key, _)| key).collect::<Vec<_>>().join(" "),
		Value::Number(_) if value.is_truthy() => value.stringify(),
		_ => String::new(),
	}
}

fn coerce_style(name: &str, value: &Value) -> Option<String> {
	if !is_style_property(name) {
		trace!(property = name, "Dropping unknown style property");
		return None;
	}
	match name {
		"filter" => encode_functions(value, FILTER_FUNCTIONS, true),
		"transform" => encode_functions(value, TRANSFORM_FUNCTIONS, false),
		_ => coerce_attribute(value, false),
	}
}

/// Composite `name(value) ...` encoding over an allow-list of function names, for `filter` and `transform`.
fn encode_functions(value: &Value, functions: &[&str], dash_names: bool) -> Option<String> {
	let object = match value {
		Value::Object(object) => object,
		other => return coerce_attribute(other, false),
	};
	let encoded = object
		.iter()
		.filter(|(name, _)| functions.contains(name))
		.filter_map(|(name, value)| {
			let argument = coerce_attribute(value, true)?;
			Some(if dash_names { format!("{}({})", dash_case(name), argument) } else { format!("{}({})", name, argument) })
		})
		.collect::<Vec<_>>()
		.join(" ");
	Some(encoded).filter(|encoded| !encoded.is_empty())
}

fn invalid(index: usize, expected: &'static str, found: &'static str) -> Error {
	InvalidTemplateError { index, expected, found }.into()
}
