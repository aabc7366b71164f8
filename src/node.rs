//! The persistent render tree.
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other by [`NodeId`]. Parent links are plain ids and
//! never keep anything alive. Only [`Patch`](`crate::patch::Patch`) application mutates a mounted tree.

use crate::{
	component::{Component, ComponentRef, Context},
	description::{Description, Key},
	document::Document,
	error::Error,
	store::CommandSink,
	value::{Callback, Object, Value},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use tracing::trace;

/// Identifier for a node in a [`Tree`]: a slot index and a generation.
///
/// Ids of released nodes go stale. They never alias a node that later reuses the slot, since the generation is
/// incremented on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32, u32);
impl NodeId {
	fn index(self) -> usize {
		self.0 as usize
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
	Root,
	Component,
	Element,
	Comment,
}

#[derive(Debug)]
pub struct Node<H> {
	pub parent: Option<NodeId>,
	pub kind: NodeKind<H>,
}

#[derive(Debug)]
pub enum NodeKind<H> {
	Root(RootNode<H>),
	Component(ComponentNode),
	Element(ElementNode<H>),
	Comment(CommentNode<H>),
}

/// The top-level component, attached to a container in the document.
#[derive(Debug)]
pub struct RootNode<H> {
	pub component: ComponentNode,
	pub container: H,
}

/// A component instance. Exactly one of `child` and `comment` is set while the node is part of a tree.
pub struct ComponentNode {
	pub class: ComponentRef,
	pub instance: Box<dyn Component>,
	pub props: Object,
	pub children: Vec<Description>,
	pub key: Option<Key>,
	pub sink: CommandSink,
	pub child: Option<NodeId>,
	pub comment: Option<NodeId>,
}
impl ComponentNode {
	#[must_use]
	pub fn context(&self) -> Context<'_> {
		Context::new(&self.props, &self.children, &self.sink)
	}

	/// Runs `hook` against the instance, with a [`Context`] over this node's current props.
	pub(crate) fn notify(&mut self, hook: impl FnOnce(&mut dyn Component, &Context<'_>)) {
		let Self { instance, props, children, sink, .. } = self;
		hook(&mut **instance, &Context::new(props, children, sink));
	}

	/// The child slot: either the rendered child or the placeholder.
	#[must_use]
	pub fn slot(&self) -> Option<NodeId> {
		self.child.or(self.comment)
	}
}
impl Debug for ComponentNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentNode")
			.field("class", &self.class)
			.field("props", &self.props)
			.field("children", &self.children.len())
			.field("key", &self.key)
			.field("child", &self.child)
			.field("comment", &self.comment)
			.finish_non_exhaustive()
	}
}

#[derive(Debug)]
pub struct ElementNode<H> {
	pub name: String,
	pub key: Option<Key>,
	pub attrs: HashMap<String, String>,
	pub dataset: HashMap<String, String>,
	pub class_names: Vec<String>,
	pub style: HashMap<String, String>,
	/// By event name.
	pub listeners: HashMap<String, Callback>,
	pub metadata: HashMap<String, Value>,
	pub text: Option<String>,
	pub children: Vec<NodeId>,
	/// Set while the element is projected into the document.
	pub handle: Option<H>,
}

#[derive(Debug)]
pub struct CommentNode<H> {
	pub text: String,
	pub handle: Option<H>,
}

impl<H> Node<H> {
	#[must_use]
	pub fn node_type(&self) -> NodeType {
		match &self.kind {
			NodeKind::Root(_) => NodeType::Root,
			NodeKind::Component(_) => NodeType::Component,
			NodeKind::Element(_) => NodeType::Element,
			NodeKind::Comment(_) => NodeType::Comment,
		}
	}

	/// `true` for roots too.
	#[must_use]
	pub fn is_component(&self) -> bool {
		matches!(self.kind, NodeKind::Root(_) | NodeKind::Component(_))
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		matches!(self.kind, NodeKind::Element(_))
	}

	#[must_use]
	pub fn is_comment(&self) -> bool {
		matches!(self.kind, NodeKind::Comment(_))
	}

	#[must_use]
	pub fn as_component(&self) -> Option<&ComponentNode> {
		match &self.kind {
			NodeKind::Root(root) => Some(&root.component),
			NodeKind::Component(component) => Some(component),
			NodeKind::Element(_) | NodeKind::Comment(_) => None,
		}
	}

	pub fn as_component_mut(&mut self) -> Option<&mut ComponentNode> {
		match &mut self.kind {
			NodeKind::Root(root) => Some(&mut root.component),
			NodeKind::Component(component) => Some(component),
			NodeKind::Element(_) | NodeKind::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&ElementNode<H>> {
		match &self.kind {
			NodeKind::Element(element) => Some(element),
			_ => None,
		}
	}

	pub fn as_element_mut(&mut self) -> Option<&mut ElementNode<H>> {
		match &mut self.kind {
			NodeKind::Element(element) => Some(element),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_comment(&self) -> Option<&CommentNode<H>> {
		match &self.kind {
			NodeKind::Comment(comment) => Some(comment),
			_ => None,
		}
	}

	/// The key this node was matched by in its parent's children, if any.
	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match &self.kind {
			NodeKind::Root(root) => root.component.key.as_ref(),
			NodeKind::Component(component) => component.key.as_ref(),
			NodeKind::Element(element) => element.key.as_ref(),
			NodeKind::Comment(_) => None,
		}
	}

	pub(crate) fn key_mut(&mut self) -> Option<&mut Option<Key>> {
		match &mut self.kind {
			NodeKind::Root(root) => Some(&mut root.component.key),
			NodeKind::Component(component) => Some(&mut component.key),
			NodeKind::Element(element) => Some(&mut element.key),
			NodeKind::Comment(_) => None,
		}
	}

	/// Direct children: an element's child list or a component's slot.
	#[must_use]
	pub fn child_ids(&self) -> Vec<NodeId> {
		match &self.kind {
			NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component) => component.slot().into_iter().collect(),
			NodeKind::Element(element) => element.children.clone(),
			NodeKind::Comment(_) => Vec::new(),
		}
	}
}

/// The nearest enclosing document node of a render tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentElement {
	Element(NodeId),
	/// The container of this root.
	Container(NodeId),
}

#[derive(Debug)]
struct Slot<H> {
	generation: u32,
	node: Option<Node<H>>,
}

/// An arena of render tree nodes, projected into a [`Document`].
pub struct Tree<D: Document> {
	slots: Vec<Slot<D::Handle>>,
	free: Vec<u32>,
	root: Option<NodeId>,
	document: D,
}

impl<D: Document> Debug for Tree<D>
where
	D: Debug,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tree").field("len", &self.len()).field("root", &self.root).field("document", &self.document).finish()
	}
}

impl<D: Document> Tree<D> {
	#[must_use]
	pub fn new(document: D) -> Self {
		Self {
			slots: Vec::new(),
			free: Vec::new(),
			root: None,
			document,
		}
	}

	#[must_use]
	pub fn document(&self) -> &D {
		&self.document
	}

	/// Document access for event dispatch and similar. Changing nodes the tree projected desynchronizes it.
	pub fn document_mut(&mut self) -> &mut D {
		&mut self.document
	}

	pub fn into_document(self) -> D {
		self.document
	}

	/// The mounted root, if any.
	#[must_use]
	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
		self.root = root;
	}

	/// Number of live nodes, mounted or not.
	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.len() - self.free.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	#[must_use]
	pub fn is_alive(&self, id: NodeId) -> bool {
		self.get(id).is_some()
	}

	#[must_use]
	pub fn get(&self, id: NodeId) -> Option<&Node<D::Handle>> {
		self.slots.get(id.index()).filter(|slot| slot.generation == id.1).and_then(|slot| slot.node.as_ref())
	}

	/// # Errors
	///
	/// [`Error::UnknownNode`] if `id` is stale.
	pub fn node(&self, id: NodeId) -> Result<&Node<D::Handle>, Error> {
		self.get(id).ok_or(Error::UnknownNode(id))
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<D::Handle>, Error> {
		self.slots
			.get_mut(id.index())
			.filter(|slot| slot.generation == id.1)
			.and_then(|slot| slot.node.as_mut())
			.ok_or(Error::UnknownNode(id))
	}

	/// # Errors
	///
	/// [`Error::UnknownNode`] if `id` is stale or not a component or root.
	pub fn component(&self, id: NodeId) -> Result<&ComponentNode, Error> {
		self.node(id)?.as_component().ok_or(Error::UnknownNode(id))
	}

	pub(crate) fn component_mut(&mut self, id: NodeId) -> Result<&mut ComponentNode, Error> {
		self.node_mut(id)?.as_component_mut().ok_or(Error::UnknownNode(id))
	}

	/// # Errors
	///
	/// [`Error::UnknownNode`] if `id` is stale or not an element.
	pub fn element(&self, id: NodeId) -> Result<&ElementNode<D::Handle>, Error> {
		self.node(id)?.as_element().ok_or(Error::UnknownNode(id))
	}

	pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementNode<D::Handle>, Error> {
		self.node_mut(id)?.as_element_mut().ok_or(Error::UnknownNode(id))
	}

	pub(crate) fn insert(&mut self, node: Node<D::Handle>) -> NodeId {
		match self.free.pop() {
			Some(index) => {
				let slot = &mut self.slots[index as usize];
				slot.node = Some(node);
				NodeId(index, slot.generation)
			}
			None => {
				#[allow(clippy::cast_possible_truncation)]
				let index = self.slots.len() as u32;
				self.slots.push(Slot { generation: 0, node: Some(node) });
				NodeId(index, 0)
			}
		}
	}

	/// Frees a single slot. Does nothing for stale ids.
	pub(crate) fn free(&mut self, id: NodeId) {
		if let Some(slot) = self.slots.get_mut(id.index()).filter(|slot| slot.generation == id.1 && slot.node.is_some()) {
			slot.node = None;
			slot.generation = slot.generation.wrapping_add(1);
			self.free.push(id.0);
		}
	}

	/// Frees `id` and everything below it.
	pub(crate) fn release(&mut self, id: NodeId) {
		let released = self.pre_order(id);
		trace!(count = released.len(), "Releasing nodes");
		for id in released {
			self.free(id);
		}
	}

	/// `id` and its descendants, parents first. Empty for stale ids.
	#[must_use]
	pub fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
		let mut order = Vec::new();
		let mut stack = vec![id];
		while let Some(id) = stack.pop() {
			if let Some(node) = self.get(id) {
				order.push(id);
				stack.extend(node.child_ids().into_iter().rev());
			}
		}
		order
	}

	/// `id` and its descendants, children first and left to right.
	#[must_use]
	pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
		let mut order = Vec::new();
		self.collect_post_order(id, &mut order);
		order
	}

	fn collect_post_order(&self, id: NodeId, order: &mut Vec<NodeId>) {
		if let Some(node) = self.get(id) {
			for child in node.child_ids() {
				self.collect_post_order(child, order);
			}
			order.push(id);
		}
	}

	/// The nearest ancestor element, or the container if only components lie between `id` and the root.
	///
	/// [`None`] for detached nodes.
	#[must_use]
	pub fn parent_element(&self, id: NodeId) -> Option<ParentElement> {
		let mut current = id;
		loop {
			let node = self.get(current)?;
			if let NodeKind::Root(_) = node.kind {
				return Some(ParentElement::Container(current));
			}
			let parent = node.parent?;
			if self.get(parent)?.is_element() {
				return Some(ParentElement::Element(parent));
			}
			current = parent;
		}
	}

	/// The element that `id` projects as, following component children. [`None`] if a placeholder is reached first.
	#[must_use]
	pub fn child_element(&self, id: NodeId) -> Option<NodeId> {
		let mut current = id;
		loop {
			match &self.get(current)?.kind {
				NodeKind::Element(_) => return Some(current),
				NodeKind::Comment(_) => return None,
				NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component) => current = component.child?,
			}
		}
	}

	/// The single document node that `id` is projected as.
	pub(crate) fn representation(&self, id: NodeId) -> Result<D::Handle, Error> {
		let mut current = id;
		loop {
			match &self.node(current)?.kind {
				NodeKind::Element(ElementNode { handle, .. }) | NodeKind::Comment(CommentNode { handle, .. }) => {
					return handle.clone().ok_or_else(|| Error::PatchMismatch {
						patch: "representation",
						reason: format!("{:?} is not projected into the document", current),
					})
				}
				NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component) => {
					current = component.slot().ok_or_else(|| Error::PatchMismatch {
						patch: "representation",
						reason: format!("{:?} has neither child nor placeholder", current),
					})?;
				}
			}
		}
	}

	/// The document node that `id`'s representation is a child of.
	pub(crate) fn document_parent(&self, id: NodeId) -> Result<D::Handle, Error> {
		match self.parent_element(id) {
			Some(ParentElement::Element(element)) => self.element(element)?.handle.clone().ok_or_else(|| Error::PatchMismatch {
				patch: "document_parent",
				reason: format!("{:?} is not projected into the document", element),
			}),
			Some(ParentElement::Container(root)) => match &self.node(root)?.kind {
				NodeKind::Root(root) => Ok(root.container.clone()),
				_ => Err(Error::UnknownNode(root)),
			},
			None => Err(Error::PatchMismatch {
				patch: "document_parent",
				reason: format!("{:?} is not attached", id),
			}),
		}
	}

	/// Creates document nodes for `id` and its descendants that don't have any yet. Returns `id`'s representation.
	pub(crate) fn materialize(&mut self, id: NodeId) -> Result<D::Handle, Error> {
		let children = match &self.node(id)?.kind {
			NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component) => {
				let slot = component.slot().ok_or_else(|| Error::PatchMismatch {
					patch: "materialize",
					reason: format!("{:?} has neither child nor placeholder", id),
				})?;
				return self.materialize(slot);
			}
			NodeKind::Comment(CommentNode { handle: Some(handle), .. }) | NodeKind::Element(ElementNode { handle: Some(handle), .. }) => return Ok(handle.clone()),
			NodeKind::Comment(CommentNode { text, handle: None }) => {
				let text = text.clone();
				let handle = self.document.create_comment(&text)?;
				if let NodeKind::Comment(comment) = &mut self.node_mut(id)?.kind {
					comment.handle = Some(handle.clone());
				}
				return Ok(handle);
			}
			NodeKind::Element(element) => element.children.clone(),
		};

		let handle = {
			let element = match self.slots.get(id.index()).and_then(|slot| slot.node.as_ref()).map(|node| &node.kind) {
				Some(NodeKind::Element(element)) => element,
				_ => return Err(Error::UnknownNode(id)),
			};
			let document = &mut self.document;
			let handle = document.create_element(&element.name)?;
			for (name, value) in &element.attrs {
				document.set_attribute(&handle, name, value)?;
			}
			for (name, value) in &element.dataset {
				document.set_data_attribute(&handle, name, value)?;
			}
			for class_name in &element.class_names {
				document.add_class_name(&handle, class_name)?;
			}
			for (name, value) in &element.style {
				document.set_style_property(&handle, name, value)?;
			}
			for (name, value) in &element.metadata {
				document.set_property(&handle, name, value)?;
			}
			for (event, listener) in &element.listeners {
				document.add_event_listener(&handle, event, listener)?;
			}
			if let Some(text) = &element.text {
				document.set_text_content(&handle, Some(text))?;
			}
			handle
		};
		self.element_mut(id)?.handle = Some(handle.clone());

		for child in children {
			let child = self.materialize(child)?;
			self.document.append_child(&handle, &child)?;
		}
		Ok(handle)
	}

	/// Unbinds listeners below `id` and forgets its document handles. The document nodes themselves are left alone.
	pub(crate) fn unproject(&mut self, id: NodeId) -> Result<(), Error> {
		for id in self.pre_order(id) {
			let Self { slots, document, .. } = &mut *self;
			match slots.get_mut(id.index()).and_then(|slot| slot.node.as_mut()).map(|node| &mut node.kind) {
				Some(NodeKind::Element(element)) => {
					if let Some(handle) = element.handle.take() {
						for (event, listener) in &element.listeners {
							document.remove_event_listener(&handle, event, listener)?;
						}
					}
				}
				Some(NodeKind::Comment(comment)) => comment.handle = None,
				Some(NodeKind::Root(_) | NodeKind::Component(_)) | None => (),
			}
		}
		Ok(())
	}

	/// Replaces `component`'s placeholder with `child`, in the tree and the document.
	pub(crate) fn fill_slot(&mut self, component: NodeId, child: NodeId) -> Result<(), Error> {
		let comment = self.component(component)?.comment.ok_or_else(|| Error::PatchMismatch {
			patch: "fill_slot",
			reason: format!("{:?} already has a child", component),
		})?;
		let placeholder = self.representation(comment)?;
		let parent = self.document_parent(component)?;

		self.node_mut(child)?.parent = Some(component);
		{
			let node = self.component_mut(component)?;
			node.child = Some(child);
			node.comment = None;
		}
		let representation = self.materialize(child)?;
		self.document.insert_before(&parent, &representation, Some(&placeholder))?;
		self.document.remove(&placeholder)?;
		self.free(comment);
		Ok(())
	}

	/// Replaces `component`'s child with a fresh placeholder, in the tree and the document. The child stays allocated.
	pub(crate) fn empty_slot(&mut self, component: NodeId, child: NodeId) -> Result<(), Error> {
		let (current, text) = {
			let node = self.component(component)?;
			(node.child, node.class.name().to_string())
		};
		if current != Some(child) {
			return Err(Error::PatchMismatch {
				patch: "empty_slot",
				reason: format!("{:?} is not the child of {:?}", child, component),
			});
		}
		let representation = self.representation(child)?;
		let parent = self.document_parent(component)?;

		let comment = self.insert(Node {
			parent: Some(component),
			kind: NodeKind::Comment(CommentNode { text, handle: None }),
		});
		{
			let node = self.component_mut(component)?;
			node.child = None;
			node.comment = Some(comment);
		}
		let placeholder = self.materialize(comment)?;
		self.document.insert_before(&parent, &placeholder, Some(&representation))?;
		self.document.remove(&representation)?;
		self.unproject(child)?;
		self.node_mut(child)?.parent = None;
		Ok(())
	}

	/// Inserts `child` into `parent`'s child list at `at`, in the tree and the document.
	pub(crate) fn insert_child(&mut self, parent: NodeId, child: NodeId, at: usize) -> Result<(), Error> {
		let length = self.element(parent)?.children.len();
		if at > length {
			return Err(Error::PatchMismatch {
				patch: "INSERT_CHILD_NODE",
				reason: format!("Index {} out of bounds for {} children", at, length),
			});
		}
		self.node_mut(child)?.parent = Some(parent);
		self.element_mut(parent)?.children.insert(at, child);
		let representation = self.materialize(child)?;
		self.place(parent, at, &representation)
	}

	/// Removes the child at `at` from `parent`, which must be `child`.
	pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId, at: usize) -> Result<(), Error> {
		self.expect_child_at(parent, child, at, "REMOVE_CHILD_NODE")?;
		let representation = self.representation(child)?;
		self.element_mut(parent)?.children.remove(at);
		self.document.remove(&representation)?;
		self.unproject(child)?;
		self.node_mut(child)?.parent = None;
		Ok(())
	}

	/// Moves `child` from `from` to `to` within `parent`. `to` is the index after the removal.
	pub(crate) fn move_child(&mut self, parent: NodeId, child: NodeId, from: usize, to: usize) -> Result<(), Error> {
		self.expect_child_at(parent, child, from, "MOVE_CHILD_NODE")?;
		let children = &mut self.element_mut(parent)?.children;
		children.remove(from);
		if to > children.len() {
			return Err(Error::PatchMismatch {
				patch: "MOVE_CHILD_NODE",
				reason: format!("Index {} out of bounds for {} remaining children", to, children.len()),
			});
		}
		children.insert(to, child);
		let representation = self.representation(child)?;
		self.place(parent, to, &representation)
	}

	fn place(&mut self, parent: NodeId, at: usize, representation: &D::Handle) -> Result<(), Error> {
		let (handle, next) = {
			let element = self.element(parent)?;
			(element.handle.clone(), element.children.get(at + 1).copied())
		};
		let handle = handle.ok_or_else(|| Error::PatchMismatch {
			patch: "place",
			reason: format!("{:?} is not projected into the document", parent),
		})?;
		let reference = next.map(|next| self.representation(next)).transpose()?;
		self.document.insert_before(&handle, representation, reference.as_ref())?;
		Ok(())
	}

	fn expect_child_at(&self, parent: NodeId, child: NodeId, at: usize, patch: &'static str) -> Result<(), Error> {
		match self.element(parent)?.children.get(at) {
			Some(found) if *found == child => Ok(()),
			found => Err(Error::PatchMismatch {
				patch,
				reason: format!("Expected {:?} at index {}, found {:?}", child, at, found),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{CommentNode, Node, NodeKind, Tree};
	use crate::document::MemoryDocument;

	fn comment(text: &str) -> Node<crate::document::MemoryHandle> {
		Node {
			parent: None,
			kind: NodeKind::Comment(CommentNode { text: text.to_string(), handle: None }),
		}
	}

	#[test]
	fn stale_ids_do_not_alias_reused_slots() {
		let mut tree = Tree::new(MemoryDocument::new());
		let a = tree.insert(comment("a"));
		tree.free(a);
		assert!(!tree.is_alive(a));

		let b = tree.insert(comment("b"));
		assert_ne!(a, b);
		assert!(tree.is_alive(b));
		assert!(tree.node(a).is_err());
		assert_eq!(tree.len(), 1);

		tree.free(a);
		assert!(tree.is_alive(b), "Freeing a stale id must not free its successor.");
	}
}
