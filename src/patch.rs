//! The closed set of render tree mutations.

use crate::{
	description::{Description, Key},
	document::Document,
	error::Error,
	node::{NodeId, Tree},
	value::{Callback, Object, Value},
};
use tracing::{instrument, trace};

/// A single mutation of the render tree and its document projection, as calculated by [`diff`](`crate::diff`).
///
/// Patches of one pass must be applied in order, since later patches refer to nodes earlier ones attached.
/// Nodes that a patch attaches are allocated by the diff, detached, and become part of the tree on application.
#[derive(Debug, Clone)]
pub enum Patch {
	/// Attaches a new root under its container.
	CreateRootComponent { root: NodeId },
	/// Detaches the current root from its container.
	RemoveRootComponent { root: NodeId },

	/// Replaces `parent`'s placeholder with the component `node`.
	AddComponent { parent: NodeId, node: NodeId },
	/// Replaces `parent`'s placeholder with the element `node`.
	AddElement { parent: NodeId, node: NodeId },
	/// Replaces `parent`'s child component `node` with a fresh placeholder.
	RemoveComponent { parent: NodeId, node: NodeId },
	/// Replaces `parent`'s child element `node` with a fresh placeholder.
	RemoveElement { parent: NodeId, node: NodeId },

	InsertChildNode { parent: NodeId, node: NodeId, at: usize },
	RemoveChildNode { parent: NodeId, node: NodeId, at: usize },
	/// Relocates an existing child without recreating it. `to` is the index after removal from `from`.
	MoveChildNode { parent: NodeId, node: NodeId, from: usize, to: usize },

	UpdateComponent { component: NodeId, props: Object, children: Vec<Description> },

	AddAttribute { element: NodeId, name: String, value: String },
	ReplaceAttribute { element: NodeId, name: String, value: String },
	RemoveAttribute { element: NodeId, name: String },

	AddDataAttribute { element: NodeId, name: String, value: String },
	ReplaceDataAttribute { element: NodeId, name: String, value: String },
	RemoveDataAttribute { element: NodeId, name: String },

	AddStyleProperty { element: NodeId, name: String, value: String },
	ReplaceStyleProperty { element: NodeId, name: String, value: String },
	RemoveStyleProperty { element: NodeId, name: String },

	AddClassName { element: NodeId, name: String },
	RemoveClassName { element: NodeId, name: String },

	AddListener { element: NodeId, event: String, listener: Callback },
	ReplaceListener { element: NodeId, event: String, listener: Callback },
	RemoveListener { element: NodeId, event: String },

	AddMetadata { element: NodeId, name: String, value: Value },
	ReplaceMetadata { element: NodeId, name: String, value: Value },
	RemoveMetadata { element: NodeId, name: String },

	SetTextContent { element: NodeId, text: Option<String> },

	/// Rekeys a child that a positional diff reused for a differently keyed description.
	SetKey { node: NodeId, key: Option<Key> },
}

impl Patch {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			Self::CreateRootComponent { .. } => "CREATE_ROOT_COMPONENT",
			Self::RemoveRootComponent { .. } => "REMOVE_ROOT_COMPONENT",
			Self::AddComponent { .. } => "ADD_COMPONENT",
			Self::AddElement { .. } => "ADD_ELEMENT",
			Self::RemoveComponent { .. } => "REMOVE_COMPONENT",
			Self::RemoveElement { .. } => "REMOVE_ELEMENT",
			Self::InsertChildNode { .. } => "INSERT_CHILD_NODE",
			Self::RemoveChildNode { .. } => "REMOVE_CHILD_NODE",
			Self::MoveChildNode { .. } => "MOVE_CHILD_NODE",
			Self::UpdateComponent { .. } => "UPDATE_COMPONENT",
			Self::AddAttribute { .. } => "ADD_ATTRIBUTE",
			Self::ReplaceAttribute { .. } => "REPLACE_ATTRIBUTE",
			Self::RemoveAttribute { .. } => "REMOVE_ATTRIBUTE",
			Self::AddDataAttribute { .. } => "ADD_DATA_ATTRIBUTE",
			Self::ReplaceDataAttribute { .. } => "REPLACE_DATA_ATTRIBUTE",
			Self::RemoveDataAttribute { .. } => "REMOVE_DATA_ATTRIBUTE",
			Self::AddStyleProperty { .. } => "ADD_STYLE_PROPERTY",
			Self::ReplaceStyleProperty { .. } => "REPLACE_STYLE_PROPERTY",
			Self::RemoveStyleProperty { .. } => "REMOVE_STYLE_PROPERTY",
			Self::AddClassName { .. } => "ADD_CLASS_NAME",
			Self::RemoveClassName { .. } => "REMOVE_CLASS_NAME",
			Self::AddListener { .. } => "ADD_LISTENER",
			Self::ReplaceListener { .. } => "REPLACE_LISTENER",
			Self::RemoveListener { .. } => "REMOVE_LISTENER",
			Self::AddMetadata { .. } => "ADD_METADATA",
			Self::ReplaceMetadata { .. } => "REPLACE_METADATA",
			Self::RemoveMetadata { .. } => "REMOVE_METADATA",
			Self::SetTextContent { .. } => "SET_TEXT_CONTENT",
			Self::SetKey { .. } => "SET_KEY",
		}
	}

	/// The subtree this patch attaches, if any.
	#[must_use]
	pub fn created(&self) -> Option<NodeId> {
		match *self {
			Self::CreateRootComponent { root } => Some(root),
			Self::AddComponent { node, .. } | Self::AddElement { node, .. } | Self::InsertChildNode { node, .. } => Some(node),
			_ => None,
		}
	}

	/// The subtree this patch detaches, if any.
	#[must_use]
	pub fn removed(&self) -> Option<NodeId> {
		match *self {
			Self::RemoveRootComponent { root } => Some(root),
			Self::RemoveComponent { node, .. } | Self::RemoveElement { node, .. } | Self::RemoveChildNode { node, .. } => Some(node),
			_ => None,
		}
	}

	/// Applies this patch to `tree` and its document.
	///
	/// # Errors
	///
	/// [`Error::UnknownNode`] for stale targets, [`Error::PatchMismatch`] if the tree doesn't look the way the patch
	/// was calculated against, and [`Error::Document`] for failed document calls.
	/// Nothing is rolled back: the tree may be partially patched afterwards.
	#[instrument(skip(self, tree), fields(patch = self.name()))]
	pub fn apply<D: Document>(&self, tree: &mut Tree<D>) -> Result<(), Error> {
		trace!(patch = ?self, "Applying");
		match self {
			Self::CreateRootComponent { root } => {
				if let Some(current) = tree.root() {
					return Err(self.mismatch(format!("{:?} is still mounted", current)));
				}
				let container = tree.document_parent(*root)?;
				let representation = tree.materialize(*root)?;
				tree.document_mut().append_child(&container, &representation)?;
				tree.set_root(Some(*root));
			}
			Self::RemoveRootComponent { root } => {
				if tree.root() != Some(*root) {
					return Err(self.mismatch(format!("{:?} is not the mounted root", root)));
				}
				let representation = tree.representation(*root)?;
				tree.document_mut().remove(&representation)?;
				tree.unproject(*root)?;
				tree.set_root(None);
			}

			Self::AddComponent { parent, node } | Self::AddElement { parent, node } => tree.fill_slot(*parent, *node)?,
			Self::RemoveComponent { parent, node } | Self::RemoveElement { parent, node } => tree.empty_slot(*parent, *node)?,

			Self::InsertChildNode { parent, node, at } => tree.insert_child(*parent, *node, *at)?,
			Self::RemoveChildNode { parent, node, at } => tree.remove_child(*parent, *node, *at)?,
			Self::MoveChildNode { parent, node, from, to } => tree.move_child(*parent, *node, *from, *to)?,

			Self::UpdateComponent { component, props, children } => {
				let component = tree.component_mut(*component)?;
				component.props = props.clone();
				component.children = children.clone();
			}

			Self::AddAttribute { element, name, value } | Self::ReplaceAttribute { element, name, value } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.attrs.insert(name.clone(), value.clone());
				tree.document_mut().set_attribute(&handle, name, value)?;
			}
			Self::RemoveAttribute { element, name } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.attrs.remove(name);
				tree.document_mut().remove_attribute(&handle, name)?;
			}

			Self::AddDataAttribute { element, name, value } | Self::ReplaceDataAttribute { element, name, value } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.dataset.insert(name.clone(), value.clone());
				tree.document_mut().set_data_attribute(&handle, name, value)?;
			}
			Self::RemoveDataAttribute { element, name } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.dataset.remove(name);
				tree.document_mut().remove_data_attribute(&handle, name)?;
			}

			Self::AddStyleProperty { element, name, value } | Self::ReplaceStyleProperty { element, name, value } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.style.insert(name.clone(), value.clone());
				tree.document_mut().set_style_property(&handle, name, value)?;
			}
			Self::RemoveStyleProperty { element, name } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.style.remove(name);
				tree.document_mut().remove_style_property(&handle, name)?;
			}

			Self::AddClassName { element, name } => {
				let handle = self.projected(tree, *element)?;
				let class_names = &mut tree.element_mut(*element)?.class_names;
				if !class_names.contains(name) {
					class_names.push(name.clone());
				}
				tree.document_mut().add_class_name(&handle, name)?;
			}
			Self::RemoveClassName { element, name } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.class_names.retain(|class_name| class_name != name);
				tree.document_mut().remove_class_name(&handle, name)?;
			}

			Self::AddListener { element, event, listener } => {
				let handle = self.projected(tree, *element)?;
				if let Some(previous) = tree.element_mut(*element)?.listeners.insert(event.clone(), listener.clone()) {
					return Err(self.mismatch(format!("{:?} already listens to `{}` with {:?}", element, event, previous)));
				}
				tree.document_mut().add_event_listener(&handle, event, listener)?;
			}
			Self::ReplaceListener { element, event, listener } => {
				let handle = self.projected(tree, *element)?;
				let previous = tree
					.element_mut(*element)?
					.listeners
					.insert(event.clone(), listener.clone())
					.ok_or_else(|| self.mismatch(format!("{:?} has no `{}` listener to replace", element, event)))?;
				tree.document_mut().remove_event_listener(&handle, event, &previous)?;
				tree.document_mut().add_event_listener(&handle, event, listener)?;
			}
			Self::RemoveListener { element, event } => {
				let handle = self.projected(tree, *element)?;
				if let Some(previous) = tree.element_mut(*element)?.listeners.remove(event) {
					tree.document_mut().remove_event_listener(&handle, event, &previous)?;
				}
			}

			Self::AddMetadata { element, name, value } | Self::ReplaceMetadata { element, name, value } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.metadata.insert(name.clone(), value.clone());
				tree.document_mut().set_property(&handle, name, value)?;
			}
			Self::RemoveMetadata { element, name } => {
				let handle = self.projected(tree, *element)?;
				tree.element_mut(*element)?.metadata.remove(name);
				tree.document_mut().remove_property(&handle, name)?;
			}

			Self::SetTextContent { element, text } => {
				let handle = self.projected(tree, *element)?;
				let node = tree.element_mut(*element)?;
				if text.is_some() && !node.children.is_empty() {
					return Err(self.mismatch(format!("{:?} still has children", element)));
				}
				node.text = text.clone();
				tree.document_mut().set_text_content(&handle, text.as_deref())?;
			}

			Self::SetKey { node, key } => match tree.node_mut(*node)?.key_mut() {
				Some(current) => *current = key.clone(),
				None => return Err(self.mismatch(format!("{:?} can't be keyed", node))),
			},
		}
		Ok(())
	}

	fn projected<D: Document>(&self, tree: &Tree<D>, element: NodeId) -> Result<D::Handle, Error> {
		tree.element(element)?.handle.clone().ok_or_else(|| self.mismatch(format!("{:?} is not projected into the document", element)))
	}

	fn mismatch(&self, reason: String) -> Error {
		Error::PatchMismatch { patch: self.name(), reason }
	}
}
