//! The abstract display tree that patches are applied to.

use crate::{
	allow_list::dash_case,
	error::DocumentError,
	listener_bindings::ListenerBindings,
	value::{Callback, Event, Value},
};
use core::fmt::{self, Debug, Formatter, Write as _};
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// A display tree the render tree is projected into.
///
/// Handles are created by [`create_element`](`Document::create_element`) and
/// [`create_comment`](`Document::create_comment`), and are owned by the render tree node they were created for.
/// All calls are synchronous. There is no rollback: if a call fails, earlier calls stay in effect.
pub trait Document {
	type Handle: Clone + Debug;

	fn create_element(&mut self, name: &str) -> Result<Self::Handle, DocumentError>;
	fn create_comment(&mut self, text: &str) -> Result<Self::Handle, DocumentError>;

	fn set_text_content(&mut self, node: &Self::Handle, text: Option<&str>) -> Result<(), DocumentError>;

	fn set_attribute(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError>;
	fn remove_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError>;

	fn set_data_attribute(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError>;
	fn remove_data_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError>;

	fn add_class_name(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError>;
	fn remove_class_name(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError>;

	fn set_style_property(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError>;
	fn remove_style_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError>;

	/// Sets a non-attribute property, e.g. a boolean `muted`.
	fn set_property(&mut self, node: &Self::Handle, name: &str, value: &Value) -> Result<(), DocumentError>;
	fn remove_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError>;

	fn add_event_listener(&mut self, node: &Self::Handle, event: &str, listener: &Callback) -> Result<(), DocumentError>;
	fn remove_event_listener(&mut self, node: &Self::Handle, event: &str, listener: &Callback) -> Result<(), DocumentError>;

	/// Inserts `child` into `parent` before `reference`, or last if `reference` is [`None`].
	///
	/// If `child` is already in the tree, it is moved.
	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, reference: Option<&Self::Handle>) -> Result<(), DocumentError>;

	fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Result<(), DocumentError> {
		self.insert_before(parent, child, None)
	}

	/// Removes `node` from its parent, if any.
	fn remove(&mut self, node: &Self::Handle) -> Result<(), DocumentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(usize);

#[derive(Debug)]
enum MemoryNodeKind {
	Element(MemoryElement),
	Comment(String),
}

#[derive(Debug, Default)]
struct MemoryElement {
	name: String,
	attributes: BTreeMap<String, String>,
	dataset: BTreeMap<String, String>,
	class_names: Vec<String>,
	style: BTreeMap<String, String>,
	properties: BTreeMap<String, Value>,
	listeners: Vec<(String, Callback)>,
	text: Option<String>,
	children: Vec<MemoryHandle>,
}

#[derive(Debug)]
struct MemoryNode {
	kind: MemoryNodeKind,
	parent: Option<MemoryHandle>,
}

/// An in-memory [`Document`] for headless rendering and tests.
///
/// Nodes are never freed. Removed nodes simply become parentless.
pub struct MemoryDocument {
	nodes: Vec<MemoryNode>,
	body: MemoryHandle,
	listener_registrations: ListenerBindings<Callback>,
}
impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}
impl MemoryDocument {
	/// Creates a document with an empty `body` element.
	#[must_use]
	pub fn new() -> Self {
		Self {
			nodes: vec![MemoryNode {
				kind: MemoryNodeKind::Element(MemoryElement {
					name: "body".to_string(),
					..MemoryElement::default()
				}),
				parent: None,
			}],
			body: MemoryHandle(0),
			listener_registrations: ListenerBindings::new(),
		}
	}

	#[must_use]
	pub fn body(&self) -> MemoryHandle {
		self.body
	}

	fn node(&self, handle: MemoryHandle) -> Result<&MemoryNode, DocumentError> {
		self.nodes.get(handle.0).ok_or_else(|| DocumentError::new("lookup", format!("No node {:?}", handle)))
	}

	fn element(&self, handle: MemoryHandle) -> Option<&MemoryElement> {
		match &self.nodes.get(handle.0)?.kind {
			MemoryNodeKind::Element(element) => Some(element),
			MemoryNodeKind::Comment(_) => None,
		}
	}

	fn element_mut(&mut self, handle: MemoryHandle, operation: &'static str) -> Result<&mut MemoryElement, DocumentError> {
		match self.nodes.get_mut(handle.0).map(|node| &mut node.kind) {
			Some(MemoryNodeKind::Element(element)) => Ok(element),
			Some(MemoryNodeKind::Comment(_)) => Err(DocumentError::new(operation, format!("{:?} is a comment", handle))),
			None => Err(DocumentError::new(operation, format!("No node {:?}", handle))),
		}
	}

	fn detach(&mut self, child: MemoryHandle) -> Result<(), DocumentError> {
		if let Some(parent) = self.node(child)?.parent {
			let siblings = &mut self.element_mut(parent, "detach")?.children;
			siblings.retain(|sibling| *sibling != child);
			self.nodes[child.0].parent = None;
		}
		Ok(())
	}

	#[must_use]
	pub fn parent(&self, handle: MemoryHandle) -> Option<MemoryHandle> {
		self.nodes.get(handle.0)?.parent
	}

	#[must_use]
	pub fn children(&self, handle: MemoryHandle) -> &[MemoryHandle] {
		self.element(handle).map_or(&[], |element| &element.children)
	}

	#[must_use]
	pub fn name(&self, handle: MemoryHandle) -> Option<&str> {
		self.element(handle).map(|element| element.name.as_str())
	}

	#[must_use]
	pub fn is_comment(&self, handle: MemoryHandle) -> bool {
		matches!(self.nodes.get(handle.0).map(|node| &node.kind), Some(MemoryNodeKind::Comment(_)))
	}

	/// Element text content or comment data.
	#[must_use]
	pub fn text(&self, handle: MemoryHandle) -> Option<&str> {
		match &self.nodes.get(handle.0)?.kind {
			MemoryNodeKind::Element(element) => element.text.as_deref(),
			MemoryNodeKind::Comment(text) => Some(text),
		}
	}

	#[must_use]
	pub fn attribute(&self, handle: MemoryHandle, name: &str) -> Option<&str> {
		self.element(handle)?.attributes.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn attribute_count(&self, handle: MemoryHandle) -> usize {
		self.element(handle).map_or(0, |element| element.attributes.len())
	}

	#[must_use]
	pub fn data_attribute(&self, handle: MemoryHandle, name: &str) -> Option<&str> {
		self.element(handle)?.dataset.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn class_names(&self, handle: MemoryHandle) -> &[String] {
		self.element(handle).map_or(&[], |element| &element.class_names)
	}

	#[must_use]
	pub fn style_property(&self, handle: MemoryHandle, name: &str) -> Option<&str> {
		self.element(handle)?.style.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn property(&self, handle: MemoryHandle, name: &str) -> Option<&Value> {
		self.element(handle)?.properties.get(name)
	}

	#[must_use]
	pub fn listener_count(&self, handle: MemoryHandle, event: &str) -> usize {
		self.element(handle).map_or(0, |element| element.listeners.iter().filter(|(name, _)| name == event).count())
	}

	/// Distinct callbacks currently bound anywhere in the document.
	#[must_use]
	pub fn registered_listener_count(&self) -> usize {
		self.listener_registrations.len()
	}

	/// Calls every listener bound to `event` on `handle`, in binding order. Returns how many were called.
	pub fn dispatch_event(&self, handle: MemoryHandle, event: &Event) -> usize {
		let listeners = match self.element(handle) {
			Some(element) => element.listeners.iter().filter(|(name, _)| *name == event.name).map(|(_, listener)| listener.clone()).collect::<Vec<_>>(),
			None => return 0,
		};
		trace!(?handle, event = %event.name, count = listeners.len(), "Dispatching event");
		for listener in &listeners {
			listener.call(event);
		}
		listeners.len()
	}

	/// Serializes the subtree at `handle`. Attributes are written in name order. Listeners and properties are omitted.
	#[must_use]
	pub fn to_html(&self, handle: MemoryHandle) -> String {
		let mut html = String::new();
		self.write_html(handle, &mut html);
		html
	}

	fn write_html(&self, handle: MemoryHandle, html: &mut String) {
		let node = match self.nodes.get(handle.0) {
			Some(node) => node,
			None => return,
		};
		match &node.kind {
			MemoryNodeKind::Comment(text) => {
				let _ = write!(html, "<!--{}-->", escape(text));
			}
			MemoryNodeKind::Element(element) => {
				html.push('<');
				html.push_str(&element.name);
				for (name, value) in &element.attributes {
					let _ = write!(html, " {}=\"{}\"", name, escape(value));
				}
				for (name, value) in &element.dataset {
					let _ = write!(html, " data-{}=\"{}\"", dash_case(name), escape(value));
				}
				if !element.class_names.is_empty() {
					let _ = write!(html, " class=\"{}\"", escape(&element.class_names.join(" ")));
				}
				if !element.style.is_empty() {
					let style = element.style.iter().map(|(name, value)| format!("{}: {};", dash_case(name), value)).collect::<Vec<_>>().join(" ");
					let _ = write!(html, " style=\"{}\"", escape(&style));
				}
				html.push('>');
				if let Some(text) = &element.text {
					html.push_str(&escape(text));
				}
				for child in &element.children {
					self.write_html(*child, html);
				}
				let _ = write!(html, "</{}>", element.name);
			}
		}
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

impl Debug for MemoryDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDocument")
			.field("nodes", &self.nodes.len())
			.field("body", &self.to_html(self.body))
			.field("registered_listeners", &self.listener_registrations.len())
			.finish()
	}
}

impl Document for MemoryDocument {
	type Handle = MemoryHandle;

	fn create_element(&mut self, name: &str) -> Result<Self::Handle, DocumentError> {
		self.nodes.push(MemoryNode {
			kind: MemoryNodeKind::Element(MemoryElement {
				name: name.to_string(),
				..MemoryElement::default()
			}),
			parent: None,
		});
		Ok(MemoryHandle(self.nodes.len() - 1))
	}

	fn create_comment(&mut self, text: &str) -> Result<Self::Handle, DocumentError> {
		self.nodes.push(MemoryNode {
			kind: MemoryNodeKind::Comment(text.to_string()),
			parent: None,
		});
		Ok(MemoryHandle(self.nodes.len() - 1))
	}

	fn set_text_content(&mut self, node: &Self::Handle, text: Option<&str>) -> Result<(), DocumentError> {
		let children = {
			let element = self.element_mut(*node, "set_text_content")?;
			element.text = text.map(str::to_string);
			core::mem::take(&mut element.children)
		};
		for child in children {
			self.nodes[child.0].parent = None;
		}
		Ok(())
	}

	fn set_attribute(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "set_attribute")?.attributes.insert(name.to_string(), value.to_string());
		Ok(())
	}

	fn remove_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "remove_attribute")?.attributes.remove(name);
		Ok(())
	}

	fn set_data_attribute(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "set_data_attribute")?.dataset.insert(name.to_string(), value.to_string());
		Ok(())
	}

	fn remove_data_attribute(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "remove_data_attribute")?.dataset.remove(name);
		Ok(())
	}

	fn add_class_name(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		let class_names = &mut self.element_mut(*node, "add_class_name")?.class_names;
		if !class_names.iter().any(|class_name| class_name == name) {
			class_names.push(name.to_string());
		}
		Ok(())
	}

	fn remove_class_name(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "remove_class_name")?.class_names.retain(|class_name| class_name != name);
		Ok(())
	}

	fn set_style_property(&mut self, node: &Self::Handle, name: &str, value: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "set_style_property")?.style.insert(name.to_string(), value.to_string());
		Ok(())
	}

	fn remove_style_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "remove_style_property")?.style.remove(name);
		Ok(())
	}

	fn set_property(&mut self, node: &Self::Handle, name: &str, value: &Value) -> Result<(), DocumentError> {
		self.element_mut(*node, "set_property")?.properties.insert(name.to_string(), value.clone());
		Ok(())
	}

	fn remove_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), DocumentError> {
		self.element_mut(*node, "remove_property")?.properties.remove(name);
		Ok(())
	}

	fn add_event_listener(&mut self, node: &Self::Handle, event: &str, listener: &Callback) -> Result<(), DocumentError> {
		self.element_mut(*node, "add_event_listener")?.listeners.push((event.to_string(), listener.clone()));
		self.listener_registrations.bind(listener, || listener.clone())?;
		Ok(())
	}

	fn remove_event_listener(&mut self, node: &Self::Handle, event: &str, listener: &Callback) -> Result<(), DocumentError> {
		let identity = listener.identity();
		let listeners = &mut self.element_mut(*node, "remove_event_listener")?.listeners;
		match listeners.iter().position(|(name, bound)| name == event && bound.identity() == identity) {
			Some(index) => {
				listeners.remove(index);
			}
			None => {
				warn!(?node, event, "Tried to remove an event listener that isn't bound. Ignoring.");
				return Ok(());
			}
		}
		if self.listener_registrations.unbind(listener).is_some() {
			trace!(listener = listener.name(), "Freed listener registration");
		}
		Ok(())
	}

	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, reference: Option<&Self::Handle>) -> Result<(), DocumentError> {
		if parent == child {
			return Err(DocumentError::new("insert_before", "Can't insert a node into itself"));
		}
		self.element_mut(*parent, "insert_before")?;
		self.node(*child)?;
		self.detach(*child)?;

		let children = &mut self.element_mut(*parent, "insert_before")?.children;
		let index = match reference {
			None => children.len(),
			Some(reference) => children
				.iter()
				.position(|sibling| sibling == reference)
				.ok_or_else(|| DocumentError::new("insert_before", format!("{:?} is not a child of {:?}", reference, parent)))?,
		};
		children.insert(index, *child);
		self.nodes[child.0].parent = Some(*parent);
		Ok(())
	}

	fn remove(&mut self, node: &Self::Handle) -> Result<(), DocumentError> {
		self.node(*node)?;
		self.detach(*node)
	}
}

#[cfg(test)]
mod tests {
	use super::{Document, MemoryDocument};
	use crate::value::{Callback, Event};
	use core::cell::Cell;
	use std::rc::Rc;

	#[test]
	fn insert_before_moves_existing_nodes() {
		let mut document = MemoryDocument::new();
		let body = document.body();
		let a = document.create_element("a").unwrap();
		let b = document.create_comment("b").unwrap();
		document.append_child(&body, &a).unwrap();
		document.append_child(&body, &b).unwrap();
		document.insert_before(&body, &b, Some(&a)).unwrap();
		assert_eq!(document.children(body), [b, a]);
		assert_eq!(document.to_html(body), "<body><!--b--><a></a></body>");

		document.remove(&b).unwrap();
		assert_eq!(document.children(body), [a]);
		assert_eq!(document.parent(b), None);
	}

	#[test]
	fn serialization_escapes_markup() {
		let mut document = MemoryDocument::new();
		let body = document.body();
		let p = document.create_element("p").unwrap();
		document.set_attribute(&p, "title", "\"quoted\" <b>").unwrap();
		document.set_text_content(&p, Some("a > b & c")).unwrap();
		let comment = document.create_comment("Broken-->Name").unwrap();
		document.append_child(&body, &p).unwrap();
		document.append_child(&body, &comment).unwrap();
		assert_eq!(
			document.to_html(body),
			"<body><p title=\"&quot;quoted&quot; &lt;b&gt;\">a &gt; b &amp; c</p><!--Broken--&gt;Name--></body>"
		);
	}

	#[test]
	fn listeners_are_shared_and_released() {
		let mut document = MemoryDocument::new();
		let a = document.create_element("button").unwrap();
		let b = document.create_element("button").unwrap();

		let clicks = Rc::new(Cell::new(0));
		let listener = {
			let clicks = Rc::clone(&clicks);
			Callback::anonymous(move |_| clicks.set(clicks.get() + 1))
		};
		document.add_event_listener(&a, "click", &listener).unwrap();
		document.add_event_listener(&b, "click", &listener).unwrap();
		assert_eq!(document.registered_listener_count(), 1);

		assert_eq!(document.dispatch_event(a, &Event::new("click")), 1);
		assert_eq!(document.dispatch_event(a, &Event::new("keydown")), 0);
		assert_eq!(clicks.get(), 1);

		document.remove_event_listener(&a, "click", &listener).unwrap();
		assert_eq!(document.registered_listener_count(), 1);
		document.remove_event_listener(&b, "click", &listener).unwrap();
		assert_eq!(document.registered_listener_count(), 0);
	}
}
