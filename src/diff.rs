//! Render tree vs. description diffing.
//!
//! [`calculate`] compares the mounted tree against a new description and returns the [`Patch`]es that bring the
//! former in line with the latter. Components are re-rendered during the diff. Subtrees that need to be created are
//! allocated in the tree right away but stay detached until their patch is applied.

use crate::{
	component::Context,
	description::{ComponentDescription, Description, ElementDescription, Key},
	document::Document,
	error::Error,
	node::{CommentNode, ComponentNode, ElementNode, Node, NodeId, NodeKind, RootNode, Tree},
	patch::Patch,
	reconciler::{calculate_moves, Move},
	resolver::Resolver,
	store::CommandSink,
	template::describe_template,
	value::Object,
};
use core::hash::Hash;
use hashbrown::{HashMap, HashSet};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// What every node rendered below one root shares.
#[derive(Debug)]
pub struct RootContext<'a, H> {
	/// Where the root is attached in the document.
	pub container: H,
	pub sink: CommandSink,
	/// Resolves [`Value::Symbol`](`crate::Value::Symbol`) component ids. Without one, templates must reference classes directly.
	pub resolver: Option<&'a Resolver>,
	/// How deeply nodes may nest. Guards against components that render themselves unconditionally.
	pub depth_limit: usize,
}

/// Calculates the patches that turn the tree at `current` into `description`.
///
/// - No current root: the root is built and a single [`Patch::CreateRootComponent`] returned.
/// - No description: a single [`Patch::RemoveRootComponent`].
/// - A root of the same component class is updated in place, otherwise it is replaced.
///
/// # Errors
///
/// [`Error::InvalidRoot`] if `description` isn't a component description, and anything rendering or describing
/// raises. Nodes allocated by a failed call are released before returning.
#[instrument(skip(tree, description, context))]
pub fn calculate<D: Document>(tree: &mut Tree<D>, current: Option<NodeId>, description: Option<&Description>, context: &RootContext<'_, D::Handle>) -> Result<Vec<Patch>, Error> {
	let mut differ = Differ {
		tree,
		context,
		patches: Vec::new(),
		allocated: Vec::new(),
	};
	match differ.diff_root(current, description) {
		Ok(()) => {
			let Differ { patches, allocated, .. } = differ;
			info!(patches = patches.len(), allocated = allocated.len(), "Calculated patches");
			if STATIC_MAX_LEVEL >= Level::TRACE {
				for patch in &patches {
					trace!(patch = patch.name());
				}
			}
			Ok(patches)
		}
		Err(error) => {
			error!(%error, allocated = differ.allocated.len(), "Diff failed. Releasing allocated nodes.");
			for id in differ.allocated {
				differ.tree.free(id);
			}
			Err(error)
		}
	}
}

struct Differ<'a, 'b, D: Document> {
	tree: &'a mut Tree<D>,
	context: &'a RootContext<'b, D::Handle>,
	patches: Vec<Patch>,
	allocated: Vec<NodeId>,
}

impl<'a, 'b, D: Document> Differ<'a, 'b, D> {
	fn diff_root(&mut self, current: Option<NodeId>, description: Option<&Description>) -> Result<(), Error> {
		let description = match (current, description) {
			(None, None) => return Ok(()),
			(Some(root), None) => {
				self.patches.push(Patch::RemoveRootComponent { root });
				return Ok(());
			}
			(_, Some(Description::Element(_))) => return Err(Error::InvalidRoot),
			(_, Some(Description::Component(description))) => description,
		};

		match current {
			Some(root) if self.tree.component(root)?.class == description.component => self.diff_component(root, description, 0),
			Some(root) => {
				trace!(class = description.component.name(), "Root class changed. Replacing the root.");
				self.patches.push(Patch::RemoveRootComponent { root });
				let root = self.build_root(description)?;
				self.patches.push(Patch::CreateRootComponent { root });
				Ok(())
			}
			None => {
				let root = self.build_root(description)?;
				self.patches.push(Patch::CreateRootComponent { root });
				Ok(())
			}
		}
	}

	fn check_depth(&self, depth: usize) -> Result<(), Error> {
		if depth > self.context.depth_limit {
			error!(depth_limit = self.context.depth_limit, "Depth limit reached");
			return Err(Error::DepthLimit(self.context.depth_limit));
		}
		Ok(())
	}

	fn allocate(&mut self, node: Node<D::Handle>) -> NodeId {
		let id = self.tree.insert(node);
		self.allocated.push(id);
		id
	}

	fn component_node(&self, description: &ComponentDescription) -> ComponentNode {
		ComponentNode {
			class: description.component.clone(),
			instance: description.component.instantiate(),
			props: description.props.clone(),
			children: description.children.clone(),
			key: description.key.clone(),
			sink: self.context.sink.clone(),
			child: None,
			comment: None,
		}
	}

	fn build_root(&mut self, description: &ComponentDescription) -> Result<NodeId, Error> {
		let component = self.component_node(description);
		let root = self.allocate(Node {
			parent: None,
			kind: NodeKind::Root(RootNode {
				component,
				container: self.context.container.clone(),
			}),
		});
		self.build_slot(root, 0)?;
		Ok(root)
	}

	/// Builds a detached subtree for `description`.
	fn build(&mut self, description: &Description, parent: NodeId, depth: usize) -> Result<NodeId, Error> {
		self.check_depth(depth)?;
		match description {
			Description::Component(description) => {
				let span = trace_span!("build_component", class = description.component.name());
				let _enter = span.enter();

				let component = self.component_node(description);
				let id = self.allocate(Node {
					parent: Some(parent),
					kind: NodeKind::Component(component),
				});
				self.build_slot(id, depth)?;
				Ok(id)
			}
			Description::Element(description) => {
				let span = trace_span!("build_element", name = %description.name);
				let _enter = span.enter();

				let id = self.allocate(Node {
					parent: Some(parent),
					kind: NodeKind::Element(element_node(description)),
				});
				let mut children = Vec::with_capacity(description.children.len());
				for child in &description.children {
					children.push(self.build(child, id, depth + 1)?);
				}
				self.tree.element_mut(id)?.children = children;
				Ok(id)
			}
		}
	}

	/// Renders the freshly created component `id` and builds its child or placeholder.
	fn build_slot(&mut self, id: NodeId, depth: usize) -> Result<(), Error> {
		let rendered = {
			let component = self.tree.component(id)?;
			self.render(component, &component.props, &component.children)?
		};
		match rendered {
			Some(description) => {
				let child = self.build(&description, id, depth + 1)?;
				self.tree.component_mut(id)?.child = Some(child);
			}
			None => {
				let text = self.tree.component(id)?.class.name().to_string();
				let comment = self.allocate(Node {
					parent: Some(id),
					kind: NodeKind::Comment(CommentNode { text, handle: None }),
				});
				self.tree.component_mut(id)?.comment = Some(comment);
			}
		}
		Ok(())
	}

	fn render(&self, component: &ComponentNode, props: &Object, children: &[Description]) -> Result<Option<Description>, Error> {
		let template = component.instance.render(&Context::new(props, children, &component.sink));
		describe_template(&template, self.context.resolver)
	}

	fn is_compatible(&self, id: NodeId, description: &Description) -> Result<bool, Error> {
		Ok(match (&self.tree.node(id)?.kind, description) {
			(NodeKind::Root(RootNode { component, .. }) | NodeKind::Component(component), Description::Component(description)) => component.class == description.component,
			(NodeKind::Element(element), Description::Element(description)) => element.name == description.name,
			_ => false,
		})
	}

	/// Diffs a node against a compatible description.
	fn diff_node(&mut self, id: NodeId, description: &Description, depth: usize) -> Result<(), Error> {
		match description {
			Description::Component(description) => self.diff_component(id, description, depth),
			Description::Element(description) => self.diff_element(id, description, depth),
		}
	}

	fn diff_component(&mut self, id: NodeId, description: &ComponentDescription, depth: usize) -> Result<(), Error> {
		self.check_depth(depth)?;
		let span = trace_span!("diff_component", ?id, class = description.component.name());
		let _enter = span.enter();

		let rendered = {
			let component = self.tree.component(id)?;
			if component.props != description.props || component.children != description.children {
				self.patches.push(Patch::UpdateComponent {
					component: id,
					props: description.props.clone(),
					children: description.children.clone(),
				});
			} else {
				trace!("Props unchanged. Re-rendering anyway.");
			}
			self.render(component, &description.props, &description.children)?
		};
		self.diff_slot(id, rendered.as_ref(), depth + 1)
	}

	/// Diffs the single child slot of the component `id`.
	fn diff_slot(&mut self, id: NodeId, description: Option<&Description>, depth: usize) -> Result<(), Error> {
		let current = self.tree.component(id)?.child;
		match (current, description) {
			(None, None) => (),
			(Some(child), None) => self.remove_from_slot(id, child)?,
			(None, Some(description)) => self.add_to_slot(id, description, depth)?,
			(Some(child), Some(description)) => {
				if self.is_compatible(child, description)? {
					self.diff_node(child, description, depth)?;
				} else {
					self.remove_from_slot(id, child)?;
					self.add_to_slot(id, description, depth)?;
				}
			}
		}
		Ok(())
	}

	fn remove_from_slot(&mut self, parent: NodeId, node: NodeId) -> Result<(), Error> {
		self.patches.push(if self.tree.node(node)?.is_element() {
			Patch::RemoveElement { parent, node }
		} else {
			Patch::RemoveComponent { parent, node }
		});
		Ok(())
	}

	fn add_to_slot(&mut self, parent: NodeId, description: &Description, depth: usize) -> Result<(), Error> {
		let node = self.build(description, parent, depth)?;
		self.patches.push(match description {
			Description::Component(_) => Patch::AddComponent { parent, node },
			Description::Element(_) => Patch::AddElement { parent, node },
		});
		Ok(())
	}

	fn diff_element(&mut self, id: NodeId, description: &ElementDescription, depth: usize) -> Result<(), Error> {
		self.check_depth(depth)?;
		let span = trace_span!("diff_element", ?id, name = %description.name);
		let _enter = span.enter();

		let (old_text, old_children) = {
			let element = self.tree.element(id)?;
			let props = &description.props;
			let patches = &mut self.patches;

			diff_map(
				patches,
				&element.attrs,
				&props.attrs,
				|a, b| a == b,
				|name, value| Patch::AddAttribute { element: id, name, value },
				|name, value| Patch::ReplaceAttribute { element: id, name, value },
				|name| Patch::RemoveAttribute { element: id, name },
			);
			diff_map(
				patches,
				&element.dataset,
				&props.dataset,
				|a, b| a == b,
				|name, value| Patch::AddDataAttribute { element: id, name, value },
				|name, value| Patch::ReplaceDataAttribute { element: id, name, value },
				|name| Patch::RemoveDataAttribute { element: id, name },
			);

			let class_names = class_names(props.class_name.as_deref());
			for name in element.class_names.iter().filter(|name| !class_names.contains(*name)) {
				patches.push(Patch::RemoveClassName { element: id, name: name.clone() });
			}
			for name in class_names.iter().filter(|name| !element.class_names.contains(*name)) {
				patches.push(Patch::AddClassName { element: id, name: name.clone() });
			}

			diff_map(
				patches,
				&element.style,
				&props.style,
				|a, b| a == b,
				|name, value| Patch::AddStyleProperty { element: id, name, value },
				|name, value| Patch::ReplaceStyleProperty { element: id, name, value },
				|name| Patch::RemoveStyleProperty { element: id, name },
			);
			diff_map(
				patches,
				&element.listeners,
				&props.listeners,
				// Equally named callbacks may capture different data.
				|a, b| a.identity() == b.identity(),
				|event, listener| Patch::AddListener { element: id, event, listener },
				|event, listener| Patch::ReplaceListener { element: id, event, listener },
				|event| Patch::RemoveListener { element: id, event },
			);
			diff_map(
				patches,
				&element.metadata,
				&props.metadata,
				|a, b| a == b,
				|name, value| Patch::AddMetadata { element: id, name, value },
				|name, value| Patch::ReplaceMetadata { element: id, name, value },
				|name| Patch::RemoveMetadata { element: id, name },
			);

			(element.text.clone(), element.children.clone())
		};

		// Text and children are exclusive: clear text before children appear, set it after they are gone.
		if old_text.is_some() && description.text.is_none() {
			self.patches.push(Patch::SetTextContent { element: id, text: None });
		}
		self.diff_children(id, &old_children, &description.children, depth)?;
		if description.text.is_some() && description.text != old_text {
			if cfg!(feature = "dangerous-logging") {
				trace!(text = ?description.text, "Text changed");
			}
			self.patches.push(Patch::SetTextContent {
				element: id,
				text: description.text.clone(),
			});
		}
		Ok(())
	}

	fn diff_children(&mut self, parent: NodeId, old: &[NodeId], new: &[Description], depth: usize) -> Result<(), Error> {
		if old.is_empty() && new.is_empty() {
			return Ok(());
		}

		let old_keys = old.iter().map(|id| -> Result<Option<Key>, Error> { Ok(self.tree.node(*id)?.key().cloned()) }).collect::<Result<Option<Vec<Key>>, Error>>()?;
		let new_keys = new.iter().map(|description| description.key().cloned()).collect::<Option<Vec<Key>>>();
		match (old_keys, new_keys) {
			(Some(old_keys), Some(new_keys)) if is_unique(&old_keys) && is_unique(&new_keys) => {
				self.diff_keyed_children(parent, old, &old_keys, new, &new_keys, depth)
			}
			(Some(_), Some(_)) => {
				warn!(?parent, "Duplicate keys among children. Falling back to positional diff.");
				self.diff_positional_children(parent, old, new, depth)
			}
			_ => self.diff_positional_children(parent, old, new, depth),
		}
	}

	fn diff_positional_children(&mut self, parent: NodeId, old: &[NodeId], new: &[Description], depth: usize) -> Result<(), Error> {
		for (at, (node, description)) in old.iter().zip(new).enumerate() {
			if self.is_compatible(*node, description)? {
				if self.tree.node(*node)?.key() != description.key() {
					self.patches.push(Patch::SetKey {
						node: *node,
						key: description.key().cloned(),
					});
				}
				self.diff_node(*node, description, depth + 1)?;
			} else {
				self.replace_child(parent, *node, description, at, depth)?;
			}
		}
		for (at, node) in old.iter().enumerate().skip(new.len()).rev() {
			self.patches.push(Patch::RemoveChildNode { parent, node: *node, at });
		}
		for (at, description) in new.iter().enumerate().skip(old.len()) {
			let node = self.build(description, parent, depth + 1)?;
			self.patches.push(Patch::InsertChildNode { parent, node, at });
		}
		Ok(())
	}

	fn diff_keyed_children(&mut self, parent: NodeId, old: &[NodeId], old_keys: &[Key], new: &[Description], new_keys: &[Key], depth: usize) -> Result<(), Error> {
		let old_by_key: HashMap<&Key, NodeId> = old_keys.iter().zip(old.iter().copied()).collect();
		let new_by_key: HashMap<&Key, &Description> = new_keys.iter().zip(new).collect();

		for step in calculate_moves(old_keys, new_keys) {
			match step {
				Move::Remove { item, at } => self.patches.push(Patch::RemoveChildNode { parent, node: old_by_key[&item], at }),
				Move::Move { item, from, to } => self.patches.push(Patch::MoveChildNode {
					parent,
					node: old_by_key[&item],
					from,
					to,
				}),
				Move::Insert { item, at } => {
					let node = self.build(new_by_key[&item], parent, depth + 1)?;
					self.patches.push(Patch::InsertChildNode { parent, node, at });
				}
			}
		}

		for (at, (key, description)) in new_keys.iter().zip(new).enumerate() {
			if let Some(node) = old_by_key.get(key).copied() {
				if self.is_compatible(node, description)? {
					self.diff_node(node, description, depth + 1)?;
				} else {
					trace!(?key, "Keyed child changed type. Replacing it.");
					self.replace_child(parent, node, description, at, depth)?;
				}
			}
		}
		Ok(())
	}

	fn replace_child(&mut self, parent: NodeId, node: NodeId, description: &Description, at: usize, depth: usize) -> Result<(), Error> {
		self.patches.push(Patch::RemoveChildNode { parent, node, at });
		let node = self.build(description, parent, depth + 1)?;
		self.patches.push(Patch::InsertChildNode { parent, node, at });
		Ok(())
	}
}

fn element_node<H>(description: &ElementDescription) -> ElementNode<H> {
	let props = &description.props;
	ElementNode {
		name: description.name.clone(),
		key: description.key.clone(),
		attrs: props.attrs.clone(),
		dataset: props.dataset.clone(),
		class_names: class_names(props.class_name.as_deref()),
		style: props.style.clone(),
		listeners: props.listeners.clone(),
		metadata: props.metadata.clone(),
		text: description.text.clone(),
		children: Vec::new(),
		handle: None,
	}
}

/// Splits a class name into its distinct parts, in order.
fn class_names(class_name: Option<&str>) -> Vec<String> {
	let mut class_names: Vec<String> = Vec::new();
	for name in class_name.unwrap_or_default().split_whitespace() {
		if !class_names.iter().any(|existing| existing == name) {
			class_names.push(name.to_string());
		}
	}
	class_names
}

fn is_unique<K: Eq + Hash>(keys: &[K]) -> bool {
	let mut seen = HashSet::with_capacity(keys.len());
	keys.iter().all(|key| seen.insert(key))
}

/// Emits removals, then additions and replacements, each in key order. Values are replaced unless `same` holds.
fn diff_map<V: Clone>(
	patches: &mut Vec<Patch>,
	old: &HashMap<String, V>,
	new: &HashMap<String, V>,
	same: impl Fn(&V, &V) -> bool,
	add: impl Fn(String, V) -> Patch,
	replace: impl Fn(String, V) -> Patch,
	remove: impl Fn(String) -> Patch,
) {
	let mut removed = old.keys().filter(|key| !new.contains_key(*key)).collect::<Vec<_>>();
	removed.sort_unstable();
	patches.extend(removed.into_iter().map(|key| remove(key.clone())));

	let mut changed = new.iter().collect::<Vec<_>>();
	changed.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
	for (key, value) in changed {
		match old.get(key) {
			None => patches.push(add(key.clone(), value.clone())),
			Some(previous) if !same(previous, value) => patches.push(replace(key.clone(), value.clone())),
			Some(_) => (),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::class_names;

	#[test]
	fn class_names_are_split_and_deduplicated() {
		assert_eq!(class_names(Some(" a  b a c ")), ["a", "b", "c"]);
		assert!(class_names(None).is_empty());
	}
}
