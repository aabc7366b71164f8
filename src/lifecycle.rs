//! Lifecycle notification around patch application.
//!
//! For one batch of patches, [`before_update`] runs before the first patch is applied and [`after_update`] after the
//! last one:
//!
//! | Patch | before | after |
//! |---|---|---|
//! | creating a subtree | `on_created`, parents first | `on_attached`, children first |
//! | `UPDATE_COMPONENT` | `on_props_received` | `on_updated` |
//! | removing a subtree | `on_destroyed`, parents first | `on_detached`, children first |
//!
//! Only component nodes (roots included) are notified. Updates don't propagate to descendants by themselves.

use crate::{
	component::{Component, Context},
	document::Document,
	error::Error,
	node::{NodeId, Tree},
	patch::Patch,
};
use tracing::{instrument, trace};

/// # Errors
///
/// [`Error::UnknownNode`] if a patch refers to a node that doesn't exist (anymore).
#[instrument(skip(tree, patches), fields(patches = patches.len()))]
pub fn before_update<D: Document>(tree: &mut Tree<D>, patches: &[Patch]) -> Result<(), Error> {
	for patch in patches {
		if let Some(created) = patch.created() {
			for id in subtree(tree, created, Order::Pre)? {
				notify(tree, id, "on_created", |component, context| component.on_created(context))?;
			}
		}
		if let Patch::UpdateComponent { component, props, .. } = patch {
			notify(tree, *component, "on_props_received", |instance, context| instance.on_props_received(context, props))?;
		}
		if let Some(removed) = patch.removed() {
			for id in subtree(tree, removed, Order::Pre)? {
				notify(tree, id, "on_destroyed", |component, context| component.on_destroyed(context))?;
			}
		}
	}
	Ok(())
}

/// Also releases the subtrees the batch removed, once they were notified.
///
/// # Errors
///
/// [`Error::UnknownNode`] if a patch refers to a node that doesn't exist (anymore).
#[instrument(skip(tree, patches), fields(patches = patches.len()))]
pub fn after_update<D: Document>(tree: &mut Tree<D>, patches: &[Patch]) -> Result<(), Error> {
	let mut released = Vec::new();
	for patch in patches {
		if let Some(created) = patch.created() {
			for id in subtree(tree, created, Order::Post)? {
				notify(tree, id, "on_attached", |component, context| component.on_attached(context))?;
			}
		}
		if let Patch::UpdateComponent { component, .. } = patch {
			notify(tree, *component, "on_updated", |component, context| component.on_updated(context))?;
		}
		if let Some(removed) = patch.removed() {
			for id in subtree(tree, removed, Order::Post)? {
				notify(tree, id, "on_detached", |component, context| component.on_detached(context))?;
			}
			released.push(removed);
		}
	}
	for id in released {
		tree.release(id);
	}
	Ok(())
}

enum Order {
	Pre,
	Post,
}

fn subtree<D: Document>(tree: &Tree<D>, id: NodeId, order: Order) -> Result<Vec<NodeId>, Error> {
	tree.node(id)?;
	Ok(match order {
		Order::Pre => tree.pre_order(id),
		Order::Post => tree.post_order(id),
	})
}

fn notify<D: Document>(tree: &mut Tree<D>, id: NodeId, hook: &'static str, call: impl FnOnce(&mut dyn Component, &Context<'_>)) -> Result<(), Error> {
	let node = tree.node_mut(id)?;
	if let Some(component) = node.as_component_mut() {
		trace!(?id, class = component.class.name(), hook);
		component.notify(call);
	}
	Ok(())
}
