//! A [`Document`] over the browser DOM.

use crate::{
	allow_list::dash_case,
	document::Document,
	error::DocumentError,
	listener_bindings::ListenerBindings,
	value::{Callback, Event, Value},
};
use js_sys::Reflect;
use tracing::{trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Projects the render tree into a [`web_sys::Document`].
///
/// Each [`Callback`] is wrapped into a single JS closure no matter how many elements it is bound to. Closures are
/// dropped once the last binding is removed, so listeners that are still bound when this instance is dropped start
/// throwing into JavaScript.
#[derive(Debug)]
pub struct WebDocument {
	document: web_sys::Document,
	closures: ListenerBindings<Closure<dyn Fn(web_sys::Event)>>,
}
impl WebDocument {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			closures: ListenerBindings::new(),
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// The document's `body`, as mount container.
	#[must_use]
	pub fn body(&self) -> Option<web_sys::Node> {
		self.document.body().map(Into::into)
	}

	/// Number of distinct callbacks that currently have a JS closure.
	#[must_use]
	pub fn closure_count(&self) -> usize {
		self.closures.len()
	}
}

fn js_error(operation: &'static str) -> impl FnOnce(JsValue) -> DocumentError {
	move |error| DocumentError::new(operation, format!("{:?}", error))
}

fn element<'a>(node: &'a web_sys::Node, operation: &'static str) -> Result<&'a web_sys::Element, DocumentError> {
	node.dyn_ref::<web_sys::Element>().ok_or_else(|| DocumentError::new(operation, "Not an element"))
}

fn html_element<'a>(node: &'a web_sys::Node, operation: &'static str) -> Result<&'a web_sys::HtmlElement, DocumentError> {
	node.dyn_ref::<web_sys::HtmlElement>().ok_or_else(|| DocumentError::new(operation, "Not an HTML element"))
}

fn to_js(value: &Value) -> JsValue {
	match value {
		Value::Null => JsValue::NULL,
		Value::Bool(bool) => JsValue::from_bool(*bool),
		Value::Number(number) => JsValue::from_f64(*number),
		Value::String(string) => JsValue::from_str(string),
		other => JsValue::from_str(&other.stringify()),
	}
}

impl Document for WebDocument {
	type Handle = web_sys::Node;

	fn create_element(&mut self, name: &str) -> Result<Self::Handle, DocumentError> {
		self.document.create_element(name).map(Into::into).map_err(js_error("create_element"))
	}

	fn create_comment(&mut self, text: &str) -> Result<Self::Handle, DocumentError> {
		Ok(self.document.create_comment(text).into())
	}

	fn set_text_content(&mut self, node: &Self::Handle, text: Option<&str>) -> Result<(), DocumentError> {
		node.set_text_content(text);
		Ok(())
	}

	fn set_attribute(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError> {
		element(node, "set_attribute")?.set_attribute(name, value).map_err(js_error("set_attribute"))
	}

	fn remove_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		element(node, "remove_attribute")?.remove_attribute(name).map_err(js_error("remove_attribute"))
	}

	fn set_data_attribute(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError> {
		element(node, "set_data_attribute")?
			.set_attribute(&format!("data-{}", dash_case(name)), value)
			.map_err(js_error("set_data_attribute"))
	}

	fn remove_data_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		element(node, "remove_data_attribute")?
			.remove_attribute(&format!("data-{}", dash_case(name)))
			.map_err(js_error("remove_data_attribute"))
	}

	fn add_class_name(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		element(node, "add_class_name")?.class_list().add_1(name).map_err(js_error("add_class_name"))
	}

	fn remove_class_name(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		element(node, "remove_class_name")?.class_list().remove_1(name).map_err(js_error("remove_class_name"))
	}

	fn set_style_property(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError> {
		html_element(node, "set_style_property")?
			.style()
			.set_property(&dash_case(name), value)
			.map_err(js_error("set_style_property"))
	}

	fn remove_style_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		html_element(node, "remove_style_property")?
			.style()
			.remove_property(&dash_case(name))
			.map(drop)
			.map_err(js_error("remove_style_property"))
	}

	fn set_property(&mut self, node: &Self::Handle, name: &str, value: &Value) -> Result<(), DocumentError> {
		Reflect::set(node.as_ref(), &JsValue::from_str(name), &to_js(value)).map(drop).map_err(js_error("set_property"))
	}

	fn remove_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		Reflect::delete_property::<JsValue>(node.unchecked_ref(), &JsValue::from_str(name)).map(drop).map_err(js_error("remove_property"))
	}

	fn add_event_listener(&mut self, node: &Self::Handle, event: &str, listener: &Callback) -> Result<(), DocumentError> {
		let closure = self.closures.bind(listener, || {
			let listener = listener.clone();
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let span = trace_span!("listener", name = listener.name());
				let _enter = span.enter();
				listener.call(&Event::new(event.type_()));
			}) as Box<dyn Fn(web_sys::Event)>)
		})?;
		node.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
			.map_err(js_error("add_event_listener"))
	}

	fn remove_event_listener(&mut self, node: &Self::Handle, event: &str, listener: &Callback) -> Result<(), DocumentError> {
		match self.closures.get(listener) {
			Some(closure) => node
				.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
				.map_err(js_error("remove_event_listener"))?,
			None => {
				warn!(event, listener = listener.name(), "Tried to remove an event listener without closure. Ignoring.");
				return Ok(());
			}
		}
		if let Some(closure) = self.closures.unbind(listener) {
			trace!(listener = listener.name(), "Dropping event listener closure");
			drop(closure);
		}
		Ok(())
	}

	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, reference: Option<&Self::Handle>) -> Result<(), DocumentError> {
		parent.insert_before(child, reference).map(drop).map_err(js_error("insert_before"))
	}

	fn remove(&mut self, node: &Self::Handle) -> Result<(), DocumentError> {
		match node.parent_node() {
			Some(parent) => parent.remove_child(node).map(drop).map_err(js_error("remove")),
			None => Ok(()),
		}
	}
}
